//! # Paper Configuration
//!
//! Receipt printers take either 58mm or 80mm rolls. Text is hard-wrapped at
//! a fixed column count derived from the configured paper width.
//!
//! ## Column Widths
//!
//! | Paper | Printable | Columns (Font A, 12 dots) |
//! |-------|-----------|---------------------------|
//! | 58mm  | 48mm (384 dots) | 32 |
//! | 80mm  | 72mm (576 dots) | 48 |
//!
//! Anything 72mm or wider is treated as the wide roll.
//!
//! ## Usage
//!
//! ```
//! use kds_relay::printer::PaperWidth;
//!
//! let paper = PaperWidth::from_mm(80);
//! assert_eq!(paper.columns(), 48);
//! ```

/// Paper width at or above which the wide column count applies.
pub const WIDE_PAPER_MIN_MM: u16 = 72;

/// Columns per line on narrow (58mm) paper.
pub const NARROW_COLUMNS: usize = 32;

/// Columns per line on wide (80mm) paper.
pub const WIDE_COLUMNS: usize = 48;

/// Default roll width in millimeters.
pub const DEFAULT_PAPER_MM: u16 = 58;

/// # Paper Width
///
/// Configured roll width, in millimeters.
///
/// ## Calculations
///
/// ```text
/// columns         = 48 if width_mm >= 72 else 32
/// printable_dots  = columns * 12
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaperWidth(u16);

impl PaperWidth {
    pub const NARROW: Self = Self(58);
    pub const WIDE: Self = Self(80);

    #[inline]
    pub fn from_mm(mm: u16) -> Self {
        Self(mm)
    }

    #[inline]
    pub fn mm(&self) -> u16 {
        self.0
    }

    /// Characters per printed line.
    #[inline]
    pub fn columns(&self) -> usize {
        if self.0 >= WIDE_PAPER_MIN_MM {
            WIDE_COLUMNS
        } else {
            NARROW_COLUMNS
        }
    }

    /// Printable width in dots (Font A glyphs are 12 dots wide).
    #[inline]
    pub fn printable_dots(&self) -> u16 {
        (self.columns() * 12) as u16
    }
}

impl Default for PaperWidth {
    fn default() -> Self {
        Self(DEFAULT_PAPER_MM)
    }
}

// ============================================================================
// TESTS
// ============================================================================

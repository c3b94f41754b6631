//! # ESC/POS Printer Commands
//!
//! Basic control sequences understood by standard thermal receipt printer
//! firmware: initialization, code page selection, paper feed and cutting.
//!
//! ## Escape Sequence Structure
//!
//! Commands follow these patterns:
//! - Single byte: `LF`
//! - Two bytes: `ESC @`
//! - Multi-byte with parameters: `ESC d n`, `GS V m`
//!
//! ## Receipt Framing
//!
//! Every receipt the relay prints is framed the same way:
//!
//! ```text
//! ESC @        initialize
//! ESC a 0      left alignment
//! ESC t 0      code page 0 (PC437)
//! ...text...
//! ESC d 3      feed three lines
//! GS V 1       partial cut
//! ```

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - Command prefix byte
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Extended command prefix, used by the cutter
pub const GS: u8 = 0x1D;

/// LF (Line Feed) - Print the line buffer and advance one line
pub const LF: u8 = 0x0A;

// ============================================================================
// INITIALIZATION COMMANDS
// ============================================================================

/// # Initialize Printer (ESC @)
///
/// Resets the printer to its power-on default state. Sent at the start of
/// every receipt so styling left over from a previous job cannot leak in.
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC @ |
/// | Hex     | 1B 40 |
/// | Decimal | 27 64 |
///
/// ## Example
///
/// ```
/// use kds_relay::protocol::commands;
///
/// assert_eq!(commands::init(), vec![0x1B, 0x40]);
/// ```
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// # Select Character Code Page (ESC t n)
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | ASCII   | ESC t n  |
/// | Hex     | 1B 74 n  |
///
/// Page 0 is PC437 (USA, standard Europe) on virtually every printer.
#[inline]
pub fn codepage(page: u8) -> Vec<u8> {
    vec![ESC, b't', page]
}

// ============================================================================
// PAPER FEED
// ============================================================================

/// # Print and Feed n Lines (ESC d n)
///
/// Prints the line buffer, then feeds `n` lines so the last printed line
/// clears the cutter.
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | ASCII   | ESC d n  |
/// | Hex     | 1B 64 n  |
#[inline]
pub fn feed_lines(n: u8) -> Vec<u8> {
    vec![ESC, b'd', n]
}

// ============================================================================
// CUTTER CONTROL COMMANDS
// ============================================================================

/// # Partial Cut (GS V 1)
///
/// Leaves a small hinge connecting the receipt to the roll, so tickets can
/// be torn off without falling on the floor.
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | ASCII   | GS V 1   |
/// | Hex     | 1D 56 01 |
#[inline]
pub fn cut_partial() -> Vec<u8> {
    vec![GS, b'V', 1]
}

// ============================================================================
// TESTS
// ============================================================================

//! # ESC/POS Text Commands
//!
//! Alignment and emphasis, plus fixed-column wrapping of text payloads.
//!
//! ## Text Alignment
//!
//! ```text
//! Left aligned (default)    |LEFT TEXT
//! Center aligned            |  CENTER TEXT
//! ```

use super::commands::ESC;

// ============================================================================
// TEXT ALIGNMENT
// ============================================================================

/// Text alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// # Select Justification (ESC a n)
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | ASCII   | ESC a n  |
/// | Hex     | 1B 61 n  |
///
/// - `n = 0`: Left alignment (default)
/// - `n = 1`: Center alignment
/// - `n = 2`: Right alignment
///
/// ## Example
///
/// ```
/// use kds_relay::protocol::text::{align, Alignment};
///
/// assert_eq!(align(Alignment::Center), vec![0x1B, 0x61, 0x01]);
/// ```
pub fn align(alignment: Alignment) -> Vec<u8> {
    vec![ESC, b'a', alignment as u8]
}

/// Convenience function for left alignment
#[inline]
pub fn align_left() -> Vec<u8> {
    align(Alignment::Left)
}

/// Convenience function for center alignment
#[inline]
pub fn align_center() -> Vec<u8> {
    align(Alignment::Center)
}

// ============================================================================
// EMPHASIS
// ============================================================================

/// # Emphasized Mode (ESC E n)
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | ASCII   | ESC E n  |
/// | Hex     | 1B 45 n  |
pub fn bold(on: bool) -> Vec<u8> {
    vec![ESC, b'E', u8::from(on)]
}

#[inline]
pub fn bold_on() -> Vec<u8> {
    bold(true)
}

#[inline]
pub fn bold_off() -> Vec<u8> {
    bold(false)
}

// ============================================================================
// WRAPPING
// ============================================================================

/// Hard-wrap text into fixed-width chunks, each followed by a newline.
///
/// This is plain chunking of the raw string, counted in characters: words
/// are split mid-way and embedded newlines count as ordinary characters.
///
/// ```
/// use kds_relay::protocol::text::wrap_columns;
///
/// assert_eq!(wrap_columns("abcdef", 4), "abcd\nef\n");
/// ```
pub fn wrap_columns(text: &str, columns: usize) -> String {
    let columns = columns.max(1);
    let mut wrapped = String::with_capacity(text.len() + text.len() / columns + 1);
    let chars: Vec<char> = text.chars().collect();
    for chunk in chars.chunks(columns) {
        wrapped.extend(chunk);
        wrapped.push('\n');
    }
    wrapped
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_bytes() {
        assert_eq!(align_left(), vec![0x1B, 0x61, 0x00]);
        assert_eq!(align_center(), vec![0x1B, 0x61, 0x01]);
        assert_eq!(align(Alignment::Right), vec![0x1B, 0x61, 0x02]);
    }

    #[test]
    fn test_bold_bytes() {
        assert_eq!(bold_on(), vec![0x1B, 0x45, 0x01]);
        assert_eq!(bold_off(), vec![0x1B, 0x45, 0x00]);
    }

    #[test]
    fn test_wrap_narrow_paper() {
        let text = "x".repeat(70);
        let wrapped = wrap_columns(&text, 32);
        let lines: Vec<&str> = wrapped.lines().collect();
        assert_eq!(
            lines.iter().map(|l| l.len()).collect::<Vec<_>>(),
            vec![32, 32, 6]
        );
    }

    #[test]
    fn test_wrap_wide_paper() {
        let text = "y".repeat(70);
        let wrapped = wrap_columns(&text, 48);
        let lines: Vec<&str> = wrapped.lines().collect();
        assert_eq!(lines[0].len(), 48);
        assert_eq!(lines[1].len(), 22);
    }

    #[test]
    fn test_wrap_counts_characters_not_bytes() {
        let wrapped = wrap_columns("ééééé", 2);
        assert_eq!(wrapped, "éé\néé\né\n");
    }

    #[test]
    fn test_wrap_empty() {
        assert_eq!(wrap_columns("", 32), "");
    }
}

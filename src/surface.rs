//! # System Print Surface
//!
//! Renders a title and body onto a single fixed-size page and submits it to
//! the host's print service.
//!
//! ## Page Layout
//!
//! ```text
//! ┌──────────────── 384 ────────────────┐
//! │            CENTERED TITLE           │  bold, top margin 8
//! │                                     │
//! │ body text, word-wrapped greedily on │  8px side margins
//! │ spaces to the page width            │
//! │ ...                                 │  600 tall, overflow dropped
//! └─────────────────────────────────────┘
//! ```
//!
//! Text is drawn with the Spleen 12×24 bitmap font. Bold is faked by
//! drawing the title twice, one pixel apart.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::{GrayImage, Luma};
use parking_lot::Mutex;
use spleen_font::{PSF2Font, FONT_12X24};

use crate::error::RelayError;

pub const PAGE_WIDTH: u32 = 384;
pub const PAGE_HEIGHT: u32 = 600;
pub const MARGIN: u32 = 8;

const GLYPH_WIDTH: u32 = 12;
const GLYPH_HEIGHT: u32 = 24;
const LINE_GAP: u32 = 4;
const TITLE_GAP: u32 = 16;

/// Accepts a title and body for printing on the host.
#[async_trait]
pub trait PrintSurface: Send + Sync {
    async fn submit(&self, title: &str, body: &str) -> Result<(), RelayError>;
}

// ============================================================================
// LAYOUT
// ============================================================================

/// Rendered width of `text` in pixels.
pub fn text_width(text: &str) -> u32 {
    text.chars().count() as u32 * GLYPH_WIDTH
}

/// Greedy word wrap to a pixel width.
///
/// Explicit newlines are kept as paragraph breaks. Lines are filled with
/// whole words split on single spaces, so runs of spaces survive. A single
/// word wider than the line is split.
///
/// ```
/// use kds_relay::surface::wrap_words;
///
/// // 60px fits five 12px glyphs
/// assert_eq!(wrap_words("ab cd efgh", 60), vec!["ab cd", "efgh"]);
/// ```
pub fn wrap_words(text: &str, max_width: u32) -> Vec<String> {
    let max_chars = (max_width / GLYPH_WIDTH).max(1) as usize;
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        // Whether `current` has taken a word yet; empty words count.
        let mut open = false;
        for word in paragraph.split(' ') {
            let candidate_width = if open {
                text_width(&current) + GLYPH_WIDTH + text_width(word)
            } else {
                text_width(word)
            };

            if candidate_width <= max_width {
                if open {
                    current.push(' ');
                }
                current.push_str(word);
                open = true;
                continue;
            }

            if open {
                lines.push(std::mem::take(&mut current));
                open = false;
            }

            let chars: Vec<char> = word.chars().collect();
            let mut pieces = chars.chunks(max_chars).peekable();
            while let Some(piece) = pieces.next() {
                let piece: String = piece.iter().collect();
                if pieces.peek().is_some() {
                    lines.push(piece);
                } else {
                    current = piece;
                    open = true;
                }
            }
        }
        lines.push(current);
    }

    lines
}

fn draw_text(page: &mut GrayImage, text: &str, x: u32, y: u32) -> Result<(), RelayError> {
    let mut font = PSF2Font::new(FONT_12X24)
        .map_err(|_| RelayError::Surface("failed to load font".to_string()))?;
    let mut cursor_x = x;
    for ch in text.chars() {
        let utf8 = ch.to_string();
        if let Some(glyph) = font.glyph_for_utf8(utf8.as_bytes()) {
            for (row_y, row) in glyph.enumerate() {
                for (col_x, on) in row.enumerate() {
                    let (px, py) = (cursor_x + col_x as u32, y + row_y as u32);
                    if on && px < page.width() && py < page.height() {
                        page.put_pixel(px, py, Luma([0]));
                    }
                }
            }
        }
        cursor_x += GLYPH_WIDTH;
    }
    Ok(())
}

/// Render the page.
pub fn render_page(title: &str, body: &str) -> Result<GrayImage, RelayError> {
    let mut page = GrayImage::from_pixel(PAGE_WIDTH, PAGE_HEIGHT, Luma([255]));
    let content_width = PAGE_WIDTH - 2 * MARGIN;

    let mut y = MARGIN;
    for line in wrap_words(title, content_width) {
        let x = (PAGE_WIDTH.saturating_sub(text_width(&line))) / 2;
        draw_text(&mut page, &line, x, y)?;
        draw_text(&mut page, &line, x + 1, y)?;
        y += GLYPH_HEIGHT + LINE_GAP;
    }
    y += TITLE_GAP;

    let lines = wrap_words(body, content_width);
    let total = lines.len();
    for (drawn, line) in lines.iter().enumerate() {
        if y + GLYPH_HEIGHT > PAGE_HEIGHT - MARGIN {
            tracing::debug!(dropped = total - drawn, "page full, dropping body lines");
            break;
        }
        draw_text(&mut page, line, MARGIN, y)?;
        y += GLYPH_HEIGHT + LINE_GAP;
    }

    Ok(page)
}

fn encode_png(page: &GrayImage) -> Result<Vec<u8>, RelayError> {
    use image::ImageEncoder;

    let mut png_bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png_bytes)
        .write_image(
            page.as_raw(),
            page.width(),
            page.height(),
            image::ExtendedColorType::L8,
        )
        .map_err(|e: image::ImageError| RelayError::Surface(e.to_string()))?;
    Ok(png_bytes)
}

// ============================================================================
// SURFACES
// ============================================================================

/// Writes each page as a PNG into a spool directory watched by the host's
/// print service.
#[derive(Debug, Clone)]
pub struct SpoolSurface {
    dir: PathBuf,
}

impl SpoolSurface {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_page(dir: &Path, title: &str, body: &str) -> Result<PathBuf, RelayError> {
        let png = encode_png(&render_page(title, body)?)?;
        std::fs::create_dir_all(dir)?;
        let name = format!(
            "{}-{}.png",
            chrono::Local::now().format("%Y%m%d-%H%M%S"),
            uuid::Uuid::new_v4().simple()
        );
        let path = dir.join(name);
        std::fs::write(&path, png)?;
        Ok(path)
    }
}

#[async_trait]
impl PrintSurface for SpoolSurface {
    async fn submit(&self, title: &str, body: &str) -> Result<(), RelayError> {
        let dir = self.dir.clone();
        let (title, body) = (title.to_string(), body.to_string());
        let path = tokio::task::spawn_blocking(move || Self::write_page(&dir, &title, &body))
            .await
            .map_err(|e| RelayError::Surface(format!("render task failed: {}", e)))??;
        tracing::info!(path = %path.display(), "page spooled");
        Ok(())
    }
}

/// Surface that records submissions in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySurface {
    pages: Arc<Mutex<Vec<(String, String)>>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submitted `(title, body)` pairs, oldest first.
    pub fn pages(&self) -> Vec<(String, String)> {
        self.pages.lock().clone()
    }
}

#[async_trait]
impl PrintSurface for MemorySurface {
    async fn submit(&self, title: &str, body: &str) -> Result<(), RelayError> {
        self.pages.lock().push((title.to_string(), body.to_string()));
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wrap_fills_greedily() {
        // 120px = 10 glyphs
        assert_eq!(
            wrap_words("one two three four", 120),
            vec!["one two", "three four"]
        );
    }

    #[test]
    fn test_wrap_keeps_paragraphs() {
        assert_eq!(
            wrap_words("Main\nOrder: 1\n\nBurger x2", 368),
            vec!["Main", "Order: 1", "", "Burger x2"]
        );
    }

    #[test]
    fn test_wrap_splits_long_words() {
        assert_eq!(
            wrap_words("abcdefghijkl xy", 60),
            vec!["abcde", "fghij", "kl xy"]
        );
    }

    #[test]
    fn test_wrap_keeps_repeated_spaces() {
        assert_eq!(
            wrap_words("Order: SO1   Seq: 12   Disp: D1", 384),
            vec!["Order: SO1   Seq: 12   Disp: D1"]
        );
        assert_eq!(wrap_words("  indented", 368), vec!["  indented"]);
    }

    #[test]
    fn test_render_page_dimensions() {
        let page = render_page("Main", "Burger x2").unwrap();
        assert_eq!(page.dimensions(), (PAGE_WIDTH, PAGE_HEIGHT));
        assert!(page.pixels().any(|p| p.0[0] == 0));
    }

    #[test]
    fn test_title_is_centered() {
        let page = render_page("II", "").unwrap();
        let inked: Vec<u32> = (0..PAGE_WIDTH)
            .filter(|&x| (MARGIN..MARGIN + GLYPH_HEIGHT).any(|y| page.get_pixel(x, y).0[0] == 0))
            .collect();
        let (left, right) = (inked[0], inked[inked.len() - 1]);
        let left_gap = left as i64;
        let right_gap = (PAGE_WIDTH - 1 - right) as i64;
        assert!((left_gap - right_gap).abs() <= GLYPH_WIDTH as i64);
    }

    #[test]
    fn test_overflowing_body_is_cut() {
        let body = "line\n".repeat(100);
        assert!(render_page("T", &body).is_ok());
    }

    #[tokio::test]
    async fn test_spool_surface_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let surface = SpoolSurface::new(dir.path().join("spool"));
        surface.submit("Main", "Burger x2").await.unwrap();

        let files: Vec<_> = std::fs::read_dir(surface.dir()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let bytes = std::fs::read(files[0].as_ref().unwrap().path()).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }
}

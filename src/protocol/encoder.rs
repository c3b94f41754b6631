//! # Receipt Encoder
//!
//! Builds the complete byte stream for one receipt in direct protocol mode.
//!
//! ## Plain Text
//!
//! ```text
//! 1B 40            initialize
//! 1B 61 00         left alignment
//! 1B 74 00         code page 0
//! <wrapped text>   each chunk terminated by 0A
//! 0A
//! 1B 64 03         feed 3 lines
//! 1D 56 01         partial cut
//! ```
//!
//! ## Orders
//!
//! Structured jobs get a styled layout between the same header and footer:
//! the branch centered and bold, then the order line and time left-aligned,
//! a blank line, and each item in bold followed by its description and
//! optional products.

use super::commands::{self, LF};
use super::text;
use crate::job::{Job, LineItem, NormalizedJob};
use crate::printer::PaperWidth;
use crate::receipt::{display_time, item_line, summary_line};

/// Trailing feed before the cut.
const FEED_BEFORE_CUT: u8 = 3;

/// Byte builder for one receipt.
struct ReceiptBuilder {
    data: Vec<u8>,
    columns: usize,
}

impl ReceiptBuilder {
    fn new(paper: PaperWidth) -> Self {
        let mut data = Vec::with_capacity(256);
        data.extend(commands::init());
        data.extend(text::align_left());
        data.extend(commands::codepage(0));
        Self {
            data,
            columns: paper.columns(),
        }
    }

    fn raw(&mut self, bytes: Vec<u8>) -> &mut Self {
        self.data.extend(bytes);
        self
    }

    /// Wrapped text, every chunk newline-terminated.
    fn text(&mut self, s: &str) -> &mut Self {
        self.data
            .extend_from_slice(text::wrap_columns(s, self.columns).as_bytes());
        self
    }

    fn line_feed(&mut self) -> &mut Self {
        self.data.push(LF);
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.data.extend(commands::feed_lines(FEED_BEFORE_CUT));
        self.data.extend(commands::cut_partial());
        self.data
    }
}

/// Encode plain text as a complete receipt.
///
/// ## Example
///
/// ```
/// use kds_relay::printer::PaperWidth;
/// use kds_relay::protocol::encoder::encode_text;
///
/// let bytes = encode_text("Hi", PaperWidth::NARROW);
/// assert_eq!(&bytes[..8], &[0x1B, 0x40, 0x1B, 0x61, 0x00, 0x1B, 0x74, 0x00]);
/// assert_eq!(&bytes[bytes.len() - 6..], &[0x1B, 0x64, 0x03, 0x1D, 0x56, 0x01]);
/// ```
pub fn encode_text(payload: &str, paper: PaperWidth) -> Vec<u8> {
    let mut receipt = ReceiptBuilder::new(paper);
    receipt.text(payload).line_feed();
    receipt.finish()
}

/// Encode a structured job as a styled receipt.
pub fn encode_order(job: &NormalizedJob, paper: PaperWidth) -> Vec<u8> {
    let mut receipt = ReceiptBuilder::new(paper);

    // The branch styling is sent even when there is no branch to print.
    let branch = job.branch_name.as_deref().map(str::trim).unwrap_or_default();
    receipt
        .raw(text::align_center())
        .raw(text::bold_on())
        .text(branch)
        .raw(text::bold_off())
        .raw(text::align_left());

    receipt.text(&summary_line(job));

    if let Some(time) = job.added_time.as_deref().map(display_time)
        && !time.trim().is_empty()
    {
        receipt.text(&format!("Time: {}", time));
    }

    receipt.line_feed();

    for item in &job.items {
        encode_item(&mut receipt, item);
    }

    receipt.finish()
}

fn encode_item(receipt: &mut ReceiptBuilder, item: &LineItem) {
    let Some(line) = item_line(item) else {
        return;
    };
    receipt
        .raw(text::bold_on())
        .text(&line)
        .raw(text::bold_off());

    let description = item
        .product_description
        .as_deref()
        .or(item.description.as_deref())
        .map(str::trim)
        .filter(|d| !d.is_empty());
    if let Some(description) = description {
        receipt.text(description);
    }

    if let Some(options) = item
        .optional_products
        .as_deref()
        .map(str::trim)
        .filter(|o| !o.is_empty())
    {
        receipt.text(options);
    }
}

/// Encode any job: orders get the styled layout, raw jobs print verbatim.
pub fn encode_job(job: &Job, paper: PaperWidth) -> Vec<u8> {
    match job {
        Job::Order(order) => encode_order(order, paper),
        Job::Raw(raw) => encode_text(&raw.content, paper),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobId, RawMinimalJob};
    use pretty_assertions::assert_eq;

    const HEADER: [u8; 8] = [0x1B, 0x40, 0x1B, 0x61, 0x00, 0x1B, 0x74, 0x00];
    const FOOTER: [u8; 6] = [0x1B, 0x64, 0x03, 0x1D, 0x56, 0x01];

    #[test]
    fn test_encode_text_byte_exact() {
        let mut expected = HEADER.to_vec();
        expected.extend(b"Hello\n");
        expected.push(0x0A);
        expected.extend(FOOTER);

        assert_eq!(encode_text("Hello", PaperWidth::NARROW), expected);
    }

    #[test]
    fn test_encode_text_wraps_at_paper_columns() {
        let payload = "z".repeat(70);

        let narrow = encode_text(&payload, PaperWidth::NARROW);
        let body = &narrow[HEADER.len()..narrow.len() - FOOTER.len()];
        let expected = format!("{}\n{}\n{}\n\n", "z".repeat(32), "z".repeat(32), "z".repeat(6));
        assert_eq!(body, expected.as_bytes());

        let wide = encode_text(&payload, PaperWidth::WIDE);
        let body = &wide[HEADER.len()..wide.len() - FOOTER.len()];
        let expected = format!("{}\n{}\n\n", "z".repeat(48), "z".repeat(22));
        assert_eq!(body, expected.as_bytes());
    }

    #[test]
    fn test_encode_text_utf8_payload() {
        let bytes = encode_text("Café", PaperWidth::NARROW);
        let body = &bytes[HEADER.len()..bytes.len() - FOOTER.len()];
        assert_eq!(body, "Café\n\n".as_bytes());
    }

    fn order() -> NormalizedJob {
        NormalizedJob {
            id: JobId::new("D1").unwrap(),
            sales_order_serial: Some("SO1".into()),
            internal_dispatch_serial: Some("D1".into()),
            sequence_number: Some("7".into()),
            personnel_name: None,
            branch_name: Some("Main".into()),
            added_time: Some("2024-05-01T12:30:45.5".into()),
            items: vec![LineItem {
                product_name: "Burger".into(),
                quantity: Some(2),
                product_description: Some("No onions".into()),
                optional_products: Some(" ".into()),
                ..Default::default()
            }],
            items_count: 1,
        }
    }

    #[test]
    fn test_encode_order_layout() {
        let mut expected = HEADER.to_vec();
        expected.extend([0x1B, 0x61, 0x01, 0x1B, 0x45, 0x01]);
        expected.extend(b"Main\n");
        expected.extend([0x1B, 0x45, 0x00, 0x1B, 0x61, 0x00]);
        expected.extend(b"Order: SO1   Seq: 7   Disp: D1\n");
        expected.extend(b"Time: 2024-05-01 12:30:45\n");
        expected.push(0x0A);
        expected.extend([0x1B, 0x45, 0x01]);
        expected.extend(b"Burger x2\n");
        expected.extend([0x1B, 0x45, 0x00]);
        expected.extend(b"No onions\n");
        expected.extend(FOOTER);

        assert_eq!(encode_order(&order(), PaperWidth::NARROW), expected);
    }

    #[test]
    fn test_encode_order_without_branch_or_time() {
        let mut job = order();
        job.branch_name = None;
        job.added_time = Some(String::new());
        job.items.clear();

        let mut expected = HEADER.to_vec();
        expected.extend([0x1B, 0x61, 0x01, 0x1B, 0x45, 0x01]);
        expected.extend([0x1B, 0x45, 0x00, 0x1B, 0x61, 0x00]);
        expected.extend(b"Order: SO1   Seq: 7   Disp: D1\n");
        expected.push(0x0A);
        expected.extend(FOOTER);

        assert_eq!(encode_order(&job, PaperWidth::NARROW), expected);
    }

    #[test]
    fn test_encode_order_blank_branch_keeps_styling() {
        let mut job = order();
        job.branch_name = Some("   ".into());
        job.items.clear();

        let bytes = encode_order(&job, PaperWidth::NARROW);
        let styling = [
            0x1B, 0x61, 0x01, 0x1B, 0x45, 0x01, 0x1B, 0x45, 0x00, 0x1B, 0x61, 0x00,
        ];
        assert_eq!(&bytes[HEADER.len()..HEADER.len() + styling.len()], &styling);
    }

    #[test]
    fn test_encode_raw_job_verbatim() {
        let job = Job::Raw(RawMinimalJob {
            id: JobId::new("X").unwrap(),
            content: "Table 4".into(),
        });
        assert_eq!(
            encode_job(&job, PaperWidth::WIDE),
            encode_text("Table 4", PaperWidth::WIDE)
        );
    }
}

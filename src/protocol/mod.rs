//! # ESC/POS Protocol Implementation
//!
//! Low-level command builders for thermal receipt printers speaking the
//! common ESC/POS command set, plus the receipt encoder built on top.
//!
//! ## Module Structure
//!
//! - [`commands`]: Basic printer commands (init, code page, feed, cut)
//! - [`text`]: Alignment, emphasis and fixed-column wrapping
//! - [`encoder`]: Complete receipts for plain text and structured orders
//!
//! ## Usage Example
//!
//! ```
//! use kds_relay::protocol::{commands, text};
//!
//! let mut data = Vec::new();
//! data.extend(commands::init());
//! data.extend(text::align_center());
//! data.extend(text::bold_on());
//! data.extend(b"KITCHEN\n");
//! data.extend(text::bold_off());
//! data.extend(text::align_left());
//! data.extend(commands::feed_lines(3));
//! data.extend(commands::cut_partial());
//!
//! assert_eq!(&data[..2], &[0x1B, 0x40]);
//! ```

pub mod commands;
pub mod encoder;
pub mod text;

pub use encoder::{encode_job, encode_order, encode_text};

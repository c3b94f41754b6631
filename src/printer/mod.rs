//! # Printer Module
//!
//! Printer-side configuration and the vendor print path.
//!
//! ## Modules
//!
//! - [`config`]: Paper width and column counts
//! - [`vendor`]: Hand-off to an external print integration

pub mod config;
pub mod vendor;

pub use config::PaperWidth;
pub use vendor::{CommandIntegration, VendorIntegration};

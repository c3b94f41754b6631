//! # kds-relay - Kitchen Print Job Relay
//!
//! kds-relay polls a kitchen server for pending print jobs and gets each one
//! onto paper exactly once, acknowledging it back to the server. It provides:
//!
//! - **Schema decoding**: four wire shapes, tried in priority order
//! - **Dedup store**: bounded, persisted printed/acknowledged sets
//! - **Receipts**: plain-text formatting and ESC/POS encoding
//! - **Printing**: vendor integration, Bluetooth RFCOMM, or a page spool
//! - **Polling**: single-flight schedule with failure-streak resync
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use kds_relay::{
//!     Engine, Preferences,
//!     client::build_http_client,
//!     dispatch::Printer,
//!     notify::LogNotifier,
//!     surface::SpoolSurface,
//!     transport::RfcommConnector,
//! };
//!
//! # async fn example() -> Result<(), kds_relay::RelayError> {
//! let prefs = Arc::new(Preferences::open("/etc/kds-relay/prefs.json")?);
//! let engine = Arc::new(Engine::new(
//!     prefs,
//!     build_http_client(false)?,
//!     Arc::new(LogNotifier),
//!     Printer::new(Arc::new(RfcommConnector)),
//!     Arc::new(SpoolSurface::new("/var/spool/kds-relay")),
//! ));
//!
//! let handle = engine.spawn(None);
//! tokio::signal::ctrl_c().await?;
//! handle.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`job`] | Job identifiers and normalized jobs |
//! | [`decode`] | Response body decoding |
//! | [`seen`] | Dedup store |
//! | [`prefs`] | Persisted preferences file |
//! | [`settings`] | Typed configuration |
//! | [`client`] | Poll and acknowledgment HTTP requests |
//! | [`ack`] | Acknowledgment sender |
//! | [`receipt`] | Receipt text formatting |
//! | [`protocol`] | ESC/POS command builders and encoder |
//! | [`printer`] | Paper width, vendor integration |
//! | [`transport`] | Printer connections |
//! | [`surface`] | System print page rendering |
//! | [`notify`] | Job alerts |
//! | [`dispatch`] | Per-job print orchestration |
//! | [`poller`] | Polling schedule |
//! | [`engine`] | Composition root |
//! | [`error`] | Error types |

pub mod ack;
pub mod client;
pub mod decode;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod job;
pub mod notify;
pub mod poller;
pub mod prefs;
pub mod printer;
pub mod protocol;
pub mod receipt;
pub mod seen;
pub mod settings;
pub mod surface;
pub mod transport;

// Re-exports for convenience
pub use engine::{Engine, EngineHandle, PollCycleOutcome};
pub use error::RelayError;
pub use job::{Job, JobId};
pub use prefs::Preferences;
pub use printer::PaperWidth;

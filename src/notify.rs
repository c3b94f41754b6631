//! # Notifications
//!
//! Alerts for newly discovered jobs.
//!
//! Each new job gets one alert titled with its branch (or the app name) and
//! a one-line receipt summary as body. Alerts carry the job identifier so
//! that acting on one can print that job through the print surface. After
//! each cycle with new jobs a rolling "N new print job(s)" summary follows.
//!
//! | Notifier              | Backend |
//! |-----------------------|---------|
//! | [`LogNotifier`]       | `tracing` events only |
//! | `DesktopNotifier`     | desktop notifications (`desktop-notify` feature) |
//! | [`RecordingNotifier`] | in-memory, for tests |

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::RelayError;
use crate::job::JobId;

/// Fallback title for jobs without a branch.
pub const APP_NAME: &str = "KDS Relay";

/// One new-job alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobAlert {
    pub id: JobId,
    pub title: String,
    pub body: String,
    /// Sound to play, `None` for a silent alert.
    pub sound: Option<String>,
}

/// Text of the rolling summary notification.
pub fn summary_text(count: usize) -> String {
    format!("{} new print job(s)", count)
}

/// Notification collaborator.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Alert about one newly seen job.
    async fn job(&self, alert: &JobAlert) -> Result<(), RelayError>;

    /// Rolling summary after a cycle that found `count` new jobs.
    async fn summary(&self, count: usize, sound: Option<&str>) -> Result<(), RelayError>;
}

/// Logs alerts instead of showing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn job(&self, alert: &JobAlert) -> Result<(), RelayError> {
        tracing::info!(serial = %alert.id, title = %alert.title, body = %alert.body, "new print job");
        Ok(())
    }

    async fn summary(&self, count: usize, _sound: Option<&str>) -> Result<(), RelayError> {
        tracing::info!(count, "{}", summary_text(count));
        Ok(())
    }
}

// ============================================================================
// DESKTOP
// ============================================================================

#[cfg(feature = "desktop-notify")]
mod desktop {
    use super::{summary_text, JobAlert, Notifier, APP_NAME};
    use crate::error::RelayError;
    use crate::job::JobId;
    use async_trait::async_trait;
    use tokio::sync::mpsc::UnboundedSender;

    const PRINT_ACTION: &str = "print";

    /// Desktop notifications via notify-rust.
    ///
    /// When built with a print-request channel, job alerts carry a "Print"
    /// action; invoking it sends the job identifier down the channel.
    #[derive(Clone, Default)]
    pub struct DesktopNotifier {
        print_requests: Option<UnboundedSender<JobId>>,
    }

    impl DesktopNotifier {
        pub fn new(print_requests: Option<UnboundedSender<JobId>>) -> Self {
            Self { print_requests }
        }
    }

    fn build(summary: &str, body: &str, sound: Option<&str>) -> notify_rust::Notification {
        let mut notification = notify_rust::Notification::new();
        notification.appname(APP_NAME).summary(summary).body(body);
        if let Some(sound) = sound.filter(|s| *s != "default") {
            notification.sound_name(sound);
        }
        notification
    }

    #[async_trait]
    impl Notifier for DesktopNotifier {
        async fn job(&self, alert: &JobAlert) -> Result<(), RelayError> {
            let mut notification = build(
                &alert.title,
                &format!("Tap to print: {}", alert.body),
                alert.sound.as_deref(),
            );
            let requests = self.print_requests.clone();
            if requests.is_some() {
                notification.action(PRINT_ACTION, "Print");
            }
            let id = alert.id.clone();

            // show() and wait_for_action() block; keep them off the runtime
            tokio::task::spawn_blocking(move || match notification.show() {
                Ok(handle) => {
                    #[cfg(all(unix, not(target_os = "macos")))]
                    {
                        if let Some(requests) = requests {
                            handle.wait_for_action(|action| {
                                if action == PRINT_ACTION || action == "default" {
                                    let _ = requests.send(id.clone());
                                }
                            });
                        }
                    }
                    #[cfg(not(all(unix, not(target_os = "macos"))))]
                    let _ = (handle, requests, id);
                }
                Err(e) => {
                    tracing::warn!(serial = %id, error = %e, "desktop notification failed");
                }
            });
            Ok(())
        }

        async fn summary(&self, count: usize, sound: Option<&str>) -> Result<(), RelayError> {
            let notification = build(APP_NAME, &summary_text(count), sound);
            tokio::task::spawn_blocking(move || {
                if let Err(e) = notification.show() {
                    tracing::warn!(error = %e, "desktop notification failed");
                }
            });
            Ok(())
        }
    }
}

#[cfg(feature = "desktop-notify")]
pub use desktop::DesktopNotifier;

// ============================================================================
// RECORDING
// ============================================================================

/// A recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyCall {
    Job(JobAlert),
    Summary { count: usize, sound: Option<String> },
}

/// Notifier that records every call.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    calls: Arc<Mutex<Vec<NotifyCall>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<NotifyCall> {
        self.calls.lock().clone()
    }

    /// Job alerts only, in order.
    pub fn job_alerts(&self) -> Vec<JobAlert> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                NotifyCall::Job(alert) => Some(alert.clone()),
                NotifyCall::Summary { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn job(&self, alert: &JobAlert) -> Result<(), RelayError> {
        self.calls.lock().push(NotifyCall::Job(alert.clone()));
        Ok(())
    }

    async fn summary(&self, count: usize, sound: Option<&str>) -> Result<(), RelayError> {
        self.calls.lock().push(NotifyCall::Summary {
            count,
            sound: sound.map(str::to_string),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_text() {
        assert_eq!(summary_text(1), "1 new print job(s)");
        assert_eq!(summary_text(3), "3 new print job(s)");
    }

    #[tokio::test]
    async fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        let alert = JobAlert {
            id: JobId::new("D1").unwrap(),
            title: "Main".into(),
            body: "Order: SO1".into(),
            sound: None,
        };
        notifier.job(&alert).await.unwrap();
        notifier.summary(1, Some("default")).await.unwrap();

        assert_eq!(notifier.job_alerts(), vec![alert]);
        assert_eq!(
            notifier.calls()[1],
            NotifyCall::Summary {
                count: 1,
                sound: Some("default".into())
            }
        );
    }
}

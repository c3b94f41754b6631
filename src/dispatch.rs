//! # Print Dispatcher
//!
//! Drives each decoded job through its lifecycle:
//!
//! ```text
//! reserve ──► notify (first attempt only) ──► emit ──► mark printed ──► acknowledge
//!    │                                          │
//!    └─ already printed or in flight: skip      └─ failed: release, retry next cycle
//! ```
//!
//! ## Emission
//!
//! The persisted vendor flag picks the path for every dispatch:
//!
//! | Mode   | What happens |
//! |--------|--------------|
//! | Vendor | receipt text handed to the vendor integration, success = accepted |
//! | Direct | ESC/POS bytes written to the printer over a fresh connection |
//!
//! ## Failed Emission
//!
//! A job is marked printed only after emission succeeds. A failure releases
//! the reservation so the next cycle retries it. After [`MAX_ATTEMPTS`]
//! failures the job is marked printed anyway and logged as abandoned.
//!
//! ## Acknowledgment
//!
//! Every decoded job that is printed but not yet acknowledged is
//! acknowledged, including jobs printed in an earlier cycle whose ack
//! failed.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ack::AckSender;
use crate::error::RelayError;
use crate::job::{Job, JobId};
use crate::notify::{JobAlert, Notifier, APP_NAME};
use crate::printer::{CommandIntegration, VendorIntegration};
use crate::protocol::encode_job;
use crate::receipt;
use crate::seen::{SeenStore, MAX_SEEN};
use crate::settings::Settings;
use crate::transport::DeviceConnector;

/// Emission attempts before a job is abandoned.
pub const MAX_ATTEMPTS: u32 = 3;

/// Title and body of a job as shown on the print surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintPage {
    pub title: String,
    pub body: String,
}

/// Bounded cache of recently alerted jobs, oldest evicted first.
#[derive(Debug)]
struct RecentJobs {
    order: VecDeque<JobId>,
    pages: HashMap<JobId, PrintPage>,
    capacity: usize,
}

impl RecentJobs {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            pages: HashMap::new(),
            capacity,
        }
    }

    fn insert(&mut self, id: JobId, page: PrintPage) {
        if self.pages.insert(id.clone(), page).is_none() {
            self.order.push_back(id);
        }
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.pages.remove(&evicted);
            }
        }
    }

    fn get(&self, id: &JobId) -> Option<PrintPage> {
        self.pages.get(id).cloned()
    }
}

/// Counts from one dispatch pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Jobs alerted for the first time.
    pub discovered: usize,
    /// Jobs emitted successfully.
    pub printed: usize,
    /// Acknowledgments the server accepted.
    pub acknowledged: usize,
}

/// Emits receipts through the vendor integration or the printer.
#[derive(Clone)]
pub struct Printer {
    connector: Arc<dyn DeviceConnector>,
    vendor: Option<Arc<dyn VendorIntegration>>,
}

impl Printer {
    pub fn new(connector: Arc<dyn DeviceConnector>) -> Self {
        Self {
            connector,
            vendor: None,
        }
    }

    /// Use a fixed vendor integration instead of the configured command.
    pub fn with_vendor(mut self, vendor: Arc<dyn VendorIntegration>) -> Self {
        self.vendor = Some(vendor);
        self
    }

    /// Emit one job using the mode and device in `settings`.
    pub async fn emit(&self, job: &Job, settings: &Settings) -> Result<(), RelayError> {
        if settings.vendor_mode {
            self.emit_vendor(job, settings).await
        } else {
            self.emit_direct(job, settings).await
        }
    }

    async fn emit_vendor(&self, job: &Job, settings: &Settings) -> Result<(), RelayError> {
        let vendor: Arc<dyn VendorIntegration> = match &self.vendor {
            Some(vendor) => Arc::clone(vendor),
            None => Arc::new(CommandIntegration::from_command_line(
                &settings.vendor_integration,
            )?),
        };
        tracing::debug!(serial = %job.id(), integration = vendor.name(), "vendor print");
        vendor.submit(&receipt::format_job(job)).await
    }

    async fn emit_direct(&self, job: &Job, settings: &Settings) -> Result<(), RelayError> {
        let bytes = encode_job(job, settings.paper_width);
        let connector = Arc::clone(&self.connector);
        let device = settings.printer_device.clone();
        tracing::debug!(serial = %job.id(), bytes = bytes.len(), "direct print");

        tokio::task::spawn_blocking(move || {
            let mut connection = connector.connect(device.as_deref())?;
            connection
                .write_all(&bytes)
                .and_then(|()| connection.flush())
                .map_err(|e| RelayError::Device(format!("Write failed: {}", e)))
        })
        .await
        .map_err(|e| RelayError::Device(format!("print task failed: {}", e)))?
    }
}

/// Per-job orchestration shared by every poll cycle.
pub struct Dispatcher {
    seen: SeenStore,
    acks: AckSender,
    notifier: Arc<dyn Notifier>,
    printer: Printer,
    attempts: Mutex<HashMap<JobId, u32>>,
    recent: Mutex<RecentJobs>,
}

impl Dispatcher {
    pub fn new(
        seen: SeenStore,
        acks: AckSender,
        notifier: Arc<dyn Notifier>,
        printer: Printer,
    ) -> Self {
        Self {
            seen,
            acks,
            notifier,
            printer,
            attempts: Mutex::new(HashMap::new()),
            recent: Mutex::new(RecentJobs::new(MAX_SEEN)),
        }
    }

    pub fn printer(&self) -> &Printer {
        &self.printer
    }

    /// Page for a recently alerted job, if still cached.
    pub fn recent_page(&self, id: &JobId) -> Option<PrintPage> {
        self.recent.lock().get(id)
    }

    /// Dispatch every job in order, then send the rolling summary.
    pub async fn dispatch_all(
        &self,
        jobs: &[Job],
        settings: &Settings,
        base_url: &str,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        for job in jobs {
            self.dispatch(job, settings, base_url, &mut report).await;
        }

        // Jobs the server stopped listing will not be retried.
        let pending: HashSet<&JobId> = jobs.iter().map(Job::id).collect();
        self.attempts.lock().retain(|id, _| pending.contains(id));

        if report.discovered > 0
            && let Err(e) = self
                .notifier
                .summary(report.discovered, settings.alert_sound())
                .await
        {
            tracing::warn!(error = %e, "summary notification failed");
        }

        report
    }

    async fn dispatch(
        &self,
        job: &Job,
        settings: &Settings,
        base_url: &str,
        report: &mut DispatchReport,
    ) {
        let id = job.id();

        if self.seen.try_reserve(id) {
            let attempt = {
                let mut attempts = self.attempts.lock();
                let count = attempts.entry(id.clone()).or_insert(0);
                *count += 1;
                *count
            };

            if attempt == 1 {
                self.alert(job, settings).await;
                report.discovered += 1;
            }

            match self.printer.emit(job, settings).await {
                Ok(()) => {
                    tracing::info!(serial = %id, attempt, "printed");
                    self.finish(id);
                    report.printed += 1;
                }
                Err(e) if attempt >= MAX_ATTEMPTS => {
                    tracing::error!(serial = %id, attempt, error = %e, "print failed, giving up");
                    self.finish(id);
                }
                Err(e) => {
                    tracing::error!(serial = %id, attempt, error = %e, "print failed, will retry");
                    self.seen.release(id);
                }
            }
        }

        if self.seen.is_printed(id)
            && !self.seen.is_acknowledged(id)
            && self.acks.send(base_url, id).await
        {
            report.acknowledged += 1;
        }
    }

    /// Mark printed and forget the attempt count.
    fn finish(&self, id: &JobId) {
        self.attempts.lock().remove(id);
        if let Err(e) = self.seen.mark_printed(id) {
            tracing::warn!(serial = %id, error = %e, "failed to persist printed state");
        }
    }

    async fn alert(&self, job: &Job, settings: &Settings) {
        let title = receipt::title(job, APP_NAME).to_string();
        let alert = JobAlert {
            id: job.id().clone(),
            title: title.clone(),
            body: receipt::one_line_summary(job),
            sound: settings.alert_sound().map(str::to_string),
        };
        self.recent.lock().insert(
            alert.id.clone(),
            PrintPage {
                title,
                body: receipt::format_job(job),
            },
        );
        if let Err(e) = self.notifier.job(&alert).await {
            tracing::warn!(serial = %alert.id, error = %e, "notification failed");
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

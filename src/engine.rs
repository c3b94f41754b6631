//! # Engine
//!
//! Composition root: owns the preferences, the HTTP client, the dedup store
//! and the dispatcher, and runs one poll cycle at a time.
//!
//! ## One Cycle
//!
//! ```text
//! settings ──► fetch ──► decode ──► dispatch (reserve, notify, emit, mark, ack)
//!    │            │          │
//!    │            │          └─ undecodable: logged, zero jobs
//!    │            └─ network error / non-2xx: Failure
//!    └─ no base URL: Skipped
//! ```
//!
//! Settings are re-read from the preferences at the start of every cycle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ack::AckSender;
use crate::client::ApiClient;
use crate::decode::{decode_body, Shape};
use crate::dispatch::{Dispatcher, Printer};
use crate::error::RelayError;
use crate::job::{Job, JobId, LineItem, NormalizedJob};
use crate::notify::Notifier;
use crate::poller::{self, CycleStatus, PollTarget, PollerStats};
use crate::prefs::Preferences;
use crate::seen::SeenStore;
use crate::settings::Settings;
use crate::surface::PrintSurface;

/// What happened in one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollCycleOutcome {
    pub status: CycleStatus,
    /// Shape the body decoded as, if any jobs were found.
    pub shape: Option<Shape>,
    /// Jobs in the response body.
    pub received: usize,
    /// Jobs seen for the first time this cycle.
    pub discovered: usize,
    /// Jobs emitted this cycle.
    pub dispatched: usize,
    /// Acknowledgments accepted this cycle.
    pub acknowledged: usize,
    pub finished_at: DateTime<Local>,
}

impl PollCycleOutcome {
    fn empty(status: CycleStatus) -> Self {
        Self {
            status,
            shape: None,
            received: 0,
            discovered: 0,
            dispatched: 0,
            acknowledged: 0,
            finished_at: Local::now(),
        }
    }
}

pub struct Engine {
    prefs: Arc<Preferences>,
    client: ApiClient,
    seen: SeenStore,
    dispatcher: Dispatcher,
    surface: Arc<dyn PrintSurface>,
    last: Mutex<Option<PollCycleOutcome>>,
}

impl Engine {
    /// Wire up an engine. `http` is shared by the poll and ack requests.
    pub fn new(
        prefs: Arc<Preferences>,
        http: reqwest::Client,
        notifier: Arc<dyn Notifier>,
        printer: Printer,
        surface: Arc<dyn PrintSurface>,
    ) -> Self {
        let client = ApiClient::new(http);
        let seen = SeenStore::load(Arc::clone(&prefs));
        let acks = AckSender::new(client.clone(), seen.clone());
        let dispatcher = Dispatcher::new(seen.clone(), acks, notifier, printer);
        Self {
            prefs,
            client,
            seen,
            dispatcher,
            surface,
            last: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> Settings {
        Settings::load(&self.prefs)
    }

    pub fn seen(&self) -> &SeenStore {
        &self.seen
    }

    /// Outcome of the most recent cycle.
    pub fn last_outcome(&self) -> Option<PollCycleOutcome> {
        self.last.lock().clone()
    }

    /// Run one poll cycle. Never fails; problems end up in the outcome.
    pub async fn run_cycle(&self) -> PollCycleOutcome {
        let outcome = self.cycle().await;
        *self.last.lock() = Some(outcome.clone());
        outcome
    }

    async fn cycle(&self) -> PollCycleOutcome {
        let settings = self.settings();
        let Some(base_url) = settings.base_url.as_deref() else {
            tracing::debug!("no base URL configured, skipping poll");
            return PollCycleOutcome::empty(CycleStatus::Skipped);
        };

        let body = match self.client.fetch_pending(base_url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "poll failed");
                return PollCycleOutcome::empty(CycleStatus::Failure);
            }
        };
        tracing::info!(bytes = body.len(), "poll succeeded");

        let decoded = match decode_body(&body) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(error = %e, "could not decode pending jobs");
                return PollCycleOutcome::empty(CycleStatus::Success);
            }
        };
        if let Some(shape) = decoded.shape {
            tracing::debug!(shape = shape.name(), jobs = decoded.jobs.len(), "decoded");
        }

        let report = self
            .dispatcher
            .dispatch_all(&decoded.jobs, &settings, base_url)
            .await;

        PollCycleOutcome {
            status: CycleStatus::Success,
            shape: decoded.shape,
            received: decoded.jobs.len(),
            discovered: report.discovered,
            dispatched: report.printed,
            acknowledged: report.acknowledged,
            finished_at: Local::now(),
        }
    }

    /// Print a recently alerted job through the print surface.
    ///
    /// Returns `Ok(false)` when the job is no longer in the recent cache.
    pub async fn print_from_notification(&self, id: &JobId) -> Result<bool, RelayError> {
        let Some(page) = self.dispatcher.recent_page(id) else {
            tracing::warn!(serial = %id, "print requested for unknown job");
            return Ok(false);
        };
        self.surface.submit(&page.title, &page.body).await?;
        tracing::info!(serial = %id, "sent to print surface");
        Ok(true)
    }

    /// Emit a sample receipt through the configured print mode.
    ///
    /// Nothing is recorded in the dedup store.
    pub async fn test_print(&self) -> Result<(), RelayError> {
        let id = JobId::new(SAMPLE_SERIAL)
            .ok_or_else(|| RelayError::Config("blank sample serial".to_string()))?;
        self.dispatcher
            .printer()
            .emit(&sample_job(id), &self.settings())
            .await
    }

    /// Start polling in the background.
    ///
    /// When `print_requests` is given, job identifiers received on it are
    /// printed through the print surface until the engine stops.
    pub fn spawn(
        self: Arc<Self>,
        print_requests: Option<UnboundedReceiver<JobId>>,
    ) -> EngineHandle {
        let cancel = CancellationToken::new();

        if let Some(mut requests) = print_requests {
            let engine = Arc::clone(&self);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                loop {
                    let id = tokio::select! {
                        _ = cancel.cancelled() => break,
                        id = requests.recv() => match id {
                            Some(id) => id,
                            None => break,
                        },
                    };
                    if let Err(e) = engine.print_from_notification(&id).await {
                        tracing::error!(serial = %id, error = %e, "print from notification failed");
                    }
                }
            });
        }

        let poll_cancel = cancel.clone();
        let task = tokio::spawn(async move { poller::run(self.as_ref(), poll_cancel).await });

        EngineHandle { cancel, task }
    }
}

#[async_trait]
impl PollTarget for Engine {
    fn interval(&self) -> Duration {
        self.settings().polling_interval
    }

    async fn poll_once(&self) -> CycleStatus {
        self.run_cycle().await.status
    }
}

/// Handle to a running engine.
pub struct EngineHandle {
    cancel: CancellationToken,
    task: JoinHandle<PollerStats>,
}

impl EngineHandle {
    /// Stop scheduling cycles and wait for the in-flight one to finish.
    pub async fn stop(self) -> PollerStats {
        self.cancel.cancel();
        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "poller task failed");
                PollerStats::default()
            }
        }
    }
}

const SAMPLE_SERIAL: &str = "TEST";

/// Receipt used by [`Engine::test_print`].
pub fn sample_job(id: JobId) -> Job {
    Job::Order(NormalizedJob {
        sales_order_serial: Some(id.to_string()),
        internal_dispatch_serial: Some(id.to_string()),
        id,
        sequence_number: Some("0".into()),
        personnel_name: None,
        branch_name: Some("Test Print".into()),
        added_time: Some(Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()),
        items: vec![LineItem {
            product_name: "Printer check".into(),
            quantity: Some(1),
            description: Some("If you can read this, printing works.".into()),
            ..Default::default()
        }],
        items_count: 1,
    })
}

// ============================================================================
// TESTS
// ============================================================================

//! # Poller
//!
//! Runs poll cycles on a fixed interval until cancelled.
//!
//! ## Single Flight
//!
//! A cycle is awaited to completion before the next tick is taken, so two
//! cycles never overlap. Ticks missed while a slow cycle runs are not
//! replayed; the schedule simply resumes one interval later.
//!
//! ## Failure Streak
//!
//! | Outcome   | Streak |
//! |-----------|--------|
//! | Success   | reset to 0 |
//! | Failure   | +1; every 5th consecutive failure resyncs the schedule |
//! | Skipped   | unchanged (no base URL, malformed body) |
//!
//! A resync rebuilds the interval timer from the current configuration.
//! The interval is also re-read after every cycle, so configuration edits
//! take effect without a restart.
//!
//! ## Cancellation
//!
//! Cancelling the token stops the schedule. A cycle already in flight is
//! allowed to finish.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Consecutive failures between resyncs.
pub const RESYNC_EVERY: u32 = 5;

/// How a cycle went, as far as the schedule is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    /// The poll request completed with a 2xx response.
    Success,
    /// Network failure or non-2xx response.
    Failure,
    /// Nothing that should move the streak.
    Skipped,
}

/// Count of consecutive transport failures.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FailureStreak(u32);

impl FailureStreak {
    pub fn count(&self) -> u32 {
        self.0
    }

    /// Record a failure; returns `true` when the schedule should resync.
    pub fn record_failure(&mut self) -> bool {
        self.0 = self.0.saturating_add(1);
        self.0 % RESYNC_EVERY == 0
    }

    pub fn record_success(&mut self) {
        self.0 = 0;
    }
}

/// Something the poller drives.
#[async_trait]
pub trait PollTarget: Send + Sync {
    /// Current polling interval.
    fn interval(&self) -> Duration;

    /// Run one cycle.
    async fn poll_once(&self) -> CycleStatus;
}

/// Counters reported when the poller stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollerStats {
    pub cycles: u64,
    pub resyncs: u64,
    pub streak: FailureStreak,
}

fn schedule(period: Duration, immediate: bool) -> Interval {
    let start = if immediate {
        Instant::now()
    } else {
        Instant::now() + period
    };
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Poll `target` until `cancel` fires. The first cycle runs immediately.
pub async fn run<T: PollTarget + ?Sized>(target: &T, cancel: CancellationToken) -> PollerStats {
    let mut stats = PollerStats::default();
    let mut period = target.interval();
    let mut ticker = schedule(period, true);

    tracing::info!(interval_secs = period.as_secs(), "poller started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let status = target.poll_once().await;
        stats.cycles += 1;

        let mut resync = false;
        match status {
            CycleStatus::Success => stats.streak.record_success(),
            CycleStatus::Failure => resync = stats.streak.record_failure(),
            CycleStatus::Skipped => {}
        }

        let configured = target.interval();
        if resync {
            stats.resyncs += 1;
            tracing::warn!(
                failures = stats.streak.count(),
                "repeated poll failures, resyncing schedule"
            );
        }
        if resync || configured != period {
            if configured != period {
                tracing::info!(interval_secs = configured.as_secs(), "polling interval changed");
            }
            period = configured;
            ticker = schedule(period, false);
        }
    }

    tracing::info!(cycles = stats.cycles, "poller stopped");
    stats
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_streak_resyncs_every_fifth_failure() {
        let mut streak = FailureStreak::default();
        let resyncs: Vec<bool> = (0..10).map(|_| streak.record_failure()).collect();
        assert_eq!(
            resyncs,
            vec![false, false, false, false, true, false, false, false, false, true]
        );
        assert_eq!(streak.count(), 10);

        streak.record_success();
        assert_eq!(streak.count(), 0);
        assert!(!streak.record_failure());
    }

    /// Replays scripted statuses, then keeps returning the last one.
    struct Scripted {
        statuses: Mutex<Vec<CycleStatus>>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        stop_after: usize,
        cancel: CancellationToken,
    }

    impl Scripted {
        fn new(statuses: Vec<CycleStatus>, stop_after: usize, cancel: CancellationToken) -> Self {
            Self {
                statuses: Mutex::new(statuses),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                stop_after,
                cancel,
            }
        }
    }

    #[async_trait]
    impl PollTarget for Scripted {
        fn interval(&self) -> Duration {
            Duration::from_millis(5)
        }

        async fn poll_once(&self) -> CycleStatus {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            // slower than the interval
            tokio::time::sleep(Duration::from_millis(12)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.stop_after {
                self.cancel.cancel();
            }
            let mut statuses = self.statuses.lock();
            if statuses.len() > 1 {
                statuses.remove(0)
            } else {
                statuses[0]
            }
        }
    }

    #[tokio::test]
    async fn test_cycles_never_overlap() {
        let cancel = CancellationToken::new();
        let target = Arc::new(Scripted::new(vec![CycleStatus::Success], 4, cancel.clone()));

        let stats = run(target.as_ref(), cancel).await;

        assert_eq!(stats.cycles, 4);
        assert_eq!(target.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_resync_and_success_resets() {
        let cancel = CancellationToken::new();
        let mut script = vec![CycleStatus::Failure; 5];
        script.push(CycleStatus::Skipped);
        script.push(CycleStatus::Success);
        let target = Scripted::new(script, 7, cancel.clone());

        let stats = run(&target, cancel).await;

        assert_eq!(stats.cycles, 7);
        assert_eq!(stats.resyncs, 1);
        assert_eq!(stats.streak.count(), 0);
    }

    #[tokio::test]
    async fn test_skipped_cycles_leave_streak() {
        let cancel = CancellationToken::new();
        let target = Scripted::new(
            vec![CycleStatus::Failure, CycleStatus::Skipped, CycleStatus::Skipped],
            3,
            cancel.clone(),
        );

        let stats = run(&target, cancel).await;
        assert_eq!(stats.streak.count(), 1);
        assert_eq!(stats.resyncs, 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let target = Scripted::new(vec![CycleStatus::Success], 100, cancel.clone());

        let stats = run(&target, cancel).await;
        assert_eq!(stats.cycles, 0);
    }
}

//! Bounded-concurrency probe scheduler.
//!
//! A single task owns the pending queue and the set of in-flight probes.
//! Work is admitted in FIFO order whenever a slot is free; outcomes come
//! back in whatever order the probes finish. Two time bounds apply: each
//! probe is bounded by the per-probe timeout, and the run as a whole by an
//! optional overall deadline after which no new work is admitted.

use crate::scanner::rate_limiter::RateLimiter;
use crate::scanner::traits::{ProbeOutcome, ProbeStatus, Prober, WorkItem};
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Hard ceiling on simultaneously open probe connections.
pub const MAX_CONCURRENCY: usize = 500;

/// Default per-probe connect timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Slack granted to a probe beyond its time budget before the scheduler
/// gives up on it.
const PROBE_GRACE: Duration = Duration::from_millis(500);

/// Knobs for a single scheduler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Concurrency cap. `None` scales with the work size.
    pub max_concurrency: Option<usize>,
    /// Bound on each individual probe.
    pub per_probe_timeout: Duration,
    /// Bound on the whole run. `None` means unbounded.
    pub overall_deadline: Option<Duration>,
    /// Probes started per second, 0 for unlimited.
    pub rate_limit: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            per_probe_timeout: DEFAULT_PROBE_TIMEOUT,
            overall_deadline: None,
            rate_limit: 0,
        }
    }
}

impl ScanOptions {
    /// Number of probe slots to use for `work_size` items.
    ///
    /// Always within `1..=MAX_CONCURRENCY`.
    pub fn effective_concurrency(&self, work_size: usize) -> usize {
        self.max_concurrency
            .unwrap_or(work_size)
            .clamp(1, MAX_CONCURRENCY)
    }
}

/// What a scheduler run produced.
#[derive(Debug, Clone)]
pub struct ScheduleResult {
    /// Completed outcomes in completion order.
    pub outcomes: Vec<ProbeOutcome>,
    /// Number of work items handed to the run.
    pub requested: usize,
    /// Set when some work items were never probed.
    pub truncated: bool,
    /// Wall time of the run.
    pub elapsed: Duration,
}

/// Callback invoked with every outcome as it completes.
pub type Observer = Arc<dyn Fn(&ProbeOutcome) + Send + Sync>;

/// Drives a [`Prober`] over a work set under a concurrency cap.
pub struct Scheduler<P> {
    prober: Arc<P>,
    options: ScanOptions,
    observer: Option<Observer>,
}

impl<P> fmt::Debug for Scheduler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("options", &self.options)
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl<P: Prober> Scheduler<P> {
    /// Create a scheduler for `prober`.
    pub fn new(prober: Arc<P>, options: ScanOptions) -> Self {
        Self {
            prober,
            options,
            observer: None,
        }
    }

    /// Call `observer` with every outcome as it completes.
    pub fn with_observer(
        self,
        observer: impl Fn(&ProbeOutcome) + Send + Sync + 'static,
    ) -> Self {
        self.with_shared_observer(Arc::new(observer))
    }

    /// Like [`Scheduler::with_observer`], for an observer that is already shared.
    pub fn with_shared_observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The options this scheduler runs with.
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Probe every item, honoring the concurrency cap, the overall deadline
    /// and `cancel`.
    ///
    /// Never fails: probe errors are outcomes, and deadline expiry or
    /// cancellation yield the outcomes completed so far with
    /// `truncated` set.
    pub async fn run<I>(&self, items: I, cancel: &CancellationToken) -> ScheduleResult
    where
        I: IntoIterator<Item = WorkItem>,
        I::IntoIter: ExactSizeIterator,
    {
        let start = Instant::now();
        let pending = items.into_iter();
        let requested = pending.len();
        let mut pending = pending.peekable();

        let slots = self.options.effective_concurrency(requested);
        let deadline = self.options.overall_deadline.map(|d| start + d);
        let limiter = RateLimiter::new(self.options.rate_limit);

        let expiry = expire_at(deadline);
        tokio::pin!(expiry);

        let mut in_flight: JoinSet<ProbeOutcome> = JoinSet::new();
        let mut outcomes = Vec::new();
        let mut admitting = true;
        let mut cancelled = false;

        debug!(requested, slots, ?deadline, "scheduler started");

        loop {
            // Admission: fill free slots in FIFO order.
            while admitting && in_flight.len() < slots && pending.peek().is_some() {
                if let Some(limiter) = &limiter {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            cancelled = true;
                            break;
                        }
                        _ = &mut expiry => {
                            admitting = false;
                            break;
                        }
                        _ = limiter.wait() => {}
                    }
                }
                if cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    admitting = false;
                    break;
                }
                let Some(item) = pending.next() else {
                    break;
                };
                self.spawn_probe(&mut in_flight, item);
            }

            if cancelled || in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                _ = &mut expiry, if admitting => {
                    debug!(
                        in_flight = in_flight.len(),
                        "deadline reached, draining in-flight probes"
                    );
                    admitting = false;
                }
                joined = in_flight.join_next() => {
                    if let Some(joined) = joined {
                        match joined {
                            Ok(outcome) => self.record(outcome, &mut outcomes),
                            Err(e) => warn!(error = %e, "probe task failed to join"),
                        }
                    }
                }
            }
        }

        if cancelled {
            debug!(in_flight = in_flight.len(), "scan cancelled, releasing in-flight probes");
            in_flight.abort_all();
            while let Some(joined) = in_flight.join_next().await {
                if let Ok(outcome) = joined {
                    self.record(outcome, &mut outcomes);
                }
            }
        }

        let truncated = outcomes.len() < requested;
        ScheduleResult {
            outcomes,
            requested,
            truncated,
            elapsed: start.elapsed(),
        }
    }

    fn spawn_probe(&self, in_flight: &mut JoinSet<ProbeOutcome>, item: WorkItem) {
        let prober = Arc::clone(&self.prober);
        let limit = self.options.per_probe_timeout;
        let backstop = prober.time_budget(&item, limit) + PROBE_GRACE;

        in_flight.spawn(async move {
            let start = Instant::now();
            let probe = AssertUnwindSafe(prober.probe(&item, limit)).catch_unwind();
            match tokio::time::timeout(backstop, probe).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(_)) => {
                    warn!(%item, "probe panicked");
                    ProbeOutcome::error(&item, start.elapsed(), "probe panicked")
                }
                Err(_) => ProbeOutcome::new(&item, ProbeStatus::Filtered, start.elapsed())
                    .with_detail("probe overran its timeout"),
            }
        });
    }

    fn record(&self, outcome: ProbeOutcome, outcomes: &mut Vec<ProbeOutcome>) {
        if let Some(observer) = &self.observer {
            observer(&outcome);
        }
        outcomes.push(outcome);
    }
}

/// Resolves at `deadline`, or never when there is none.
fn expire_at(deadline: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(at) => sleep_until(at).await,
            None => futures::future::pending::<()>().await,
        }
    }
}

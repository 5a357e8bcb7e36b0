//! Cancellable periodic tasks.
//!
//! Each task runs its job on a fixed interval until the scheduler is stopped.
//! Progress is observable through [`Scheduler::status`]; [`Scheduler::stop`]
//! cancels every task and waits for in-flight ticks to finish.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Snapshot of one scheduled task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub name: String,
    pub period_secs: f64,
    pub ticks: u64,
    /// Ticks that panicked; the task keeps its schedule regardless.
    pub failures: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub running: bool,
    pub failed: bool,
}

struct TaskState {
    name: String,
    period: Duration,
    ticks: AtomicU64,
    failures: AtomicU64,
    last_tick_at: Mutex<Option<DateTime<Utc>>>,
    running: AtomicBool,
    failed: AtomicBool,
}

impl TaskState {
    fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        *self.last_tick_at.lock() = Some(Utc::now());
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        self.failed.store(true, Ordering::SeqCst);
    }

    fn status(&self) -> TaskStatus {
        TaskStatus {
            name: self.name.clone(),
            period_secs: self.period.as_secs_f64(),
            ticks: self.ticks.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            last_tick_at: *self.last_tick_at.lock(),
            running: self.running.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

pub struct Scheduler {
    root: CancellationToken,
    states: Mutex<Vec<Arc<TaskState>>>,
    handles: Mutex<Vec<(Arc<TaskState>, JoinHandle<()>)>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            states: Mutex::new(Vec::new()),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawns `job` on a fixed `period`.
    ///
    /// With `run_immediately` the first tick fires right away, otherwise after
    /// one full period. Missed ticks are skipped rather than bursted. Must be
    /// called from within a Tokio runtime.
    pub fn spawn_periodic<F, Fut>(&self, name: &str, period: Duration, run_immediately: bool, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let state = Arc::new(TaskState {
            name: name.to_string(),
            period,
            ticks: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            last_tick_at: Mutex::new(None),
            running: AtomicBool::new(true),
            failed: AtomicBool::new(false),
        });
        let token = self.root.child_token();
        let task_state = Arc::clone(&state);

        let handle = tokio::spawn(async move {
            let start = if run_immediately {
                Instant::now()
            } else {
                Instant::now() + period
            };
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!(task = %task_state.name, period_secs = period.as_secs_f64(), "scheduled task started");

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        // Own task per tick so a panic is caught at the join.
                        match tokio::spawn(job()).await {
                            Ok(()) => task_state.record_tick(),
                            Err(e) => {
                                task_state.record_failure();
                                tracing::warn!(task = %task_state.name, "scheduled tick failed: {}", e);
                            }
                        }
                    }
                }
            }

            task_state.running.store(false, Ordering::SeqCst);
            tracing::info!(
                task = %task_state.name,
                ticks = task_state.ticks.load(Ordering::SeqCst),
                "scheduled task stopped"
            );
        });

        self.states.lock().push(Arc::clone(&state));
        self.handles.lock().push((state, handle));
    }

    pub fn status(&self) -> Vec<TaskStatus> {
        self.states.lock().iter().map(|s| s.status()).collect()
    }

    pub fn is_stopped(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Cancels every task and waits for them to finish.
    ///
    /// Safe to call more than once. A stopped scheduler stays stopped: tasks
    /// spawned afterwards exit before their first tick.
    pub async fn stop(&self) -> Vec<TaskStatus> {
        self.root.cancel();

        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for (state, handle) in handles {
            if let Err(e) = handle.await {
                tracing::error!(task = %state.name, "scheduled task failed: {}", e);
                state.failed.store(true, Ordering::SeqCst);
                state.running.store(false, Ordering::SeqCst);
            }
        }

        self.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_periodic_task_ticks_until_stopped() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(AtomicU64::new(0));
        let job_counter = Arc::clone(&counter);

        scheduler.spawn_periodic("counter", Duration::from_millis(10), true, move || {
            let counter = Arc::clone(&job_counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(80)).await;
        let statuses = scheduler.stop().await;

        assert_eq!(statuses.len(), 1);
        let status = &statuses[0];
        assert!(!status.running);
        assert!(!status.failed);
        assert!(status.ticks >= 2);
        assert_eq!(status.ticks, counter.load(Ordering::SeqCst));
        assert!(status.last_tick_at.is_some());

        // No more ticks after stop.
        let after = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after);
    }

    #[tokio::test]
    async fn test_delayed_task_does_not_tick_before_period() {
        let scheduler = Scheduler::new();
        scheduler.spawn_periodic("slow", Duration::from_secs(3600), false, || async {});

        tokio::time::sleep(Duration::from_millis(20)).await;
        let statuses = scheduler.stop().await;
        assert_eq!(statuses[0].ticks, 0);
        assert!(statuses[0].last_tick_at.is_none());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let scheduler = Scheduler::new();
        scheduler.spawn_periodic("noop", Duration::from_millis(5), true, || async {});

        let first = scheduler.stop().await;
        let second = scheduler.stop().await;
        assert!(scheduler.is_stopped());
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].ticks, second[0].ticks);
        assert!(!second[0].running);
    }

    #[tokio::test]
    async fn test_panicking_tick_is_reported_and_task_keeps_running() {
        let scheduler = Scheduler::new();
        scheduler.spawn_periodic("boom", Duration::from_millis(5), true, || async {
            panic!("tick exploded");
        });
        scheduler.spawn_periodic("steady", Duration::from_millis(5), true, || async {});

        tokio::time::sleep(Duration::from_millis(50)).await;

        let live = scheduler.status();
        let boom = live.iter().find(|s| s.name == "boom").unwrap();
        assert!(boom.failed);
        assert!(boom.running);
        assert!(boom.failures >= 2);
        assert_eq!(boom.ticks, 0);

        let statuses = scheduler.stop().await;
        let boom = statuses.iter().find(|s| s.name == "boom").unwrap();
        let steady = statuses.iter().find(|s| s.name == "steady").unwrap();
        assert!(boom.failed);
        assert!(!boom.running);
        assert!(!steady.failed);
        assert_eq!(steady.failures, 0);
        assert!(!steady.running);
    }
}

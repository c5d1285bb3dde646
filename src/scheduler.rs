//! Poll scheduler background task
//!
//! Every tick takes the current project list, fetches and classifies one
//! snapshot per project concurrently, and publishes the whole tick at once.

use chrono::Utc;
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::classify::{classify, DEFAULT_THRESHOLD_W};
use crate::egauge::SnapshotSource;
use crate::models::{PollResult, PollState, Project, TickReport};
use crate::registry::ProjectRegistry;

/// Shortest interval the scheduler accepts.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for the poll scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between tick starts (default: 60 seconds)
    pub interval: Duration,
    /// Readings at or below this many watts are flagged LOW
    pub threshold_w: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            threshold_w: DEFAULT_THRESHOLD_W,
        }
    }
}

/// Poll state of each project taken into the current tick.
#[derive(Debug, Clone, Default)]
pub struct PollStates {
    inner: Arc<RwLock<Vec<(String, PollState)>>>,
}

impl PollStates {
    fn reset<'a>(&self, names: impl Iterator<Item = &'a str>) {
        let mut states = self.inner.write().unwrap_or_else(|p| p.into_inner());
        *states = names.map(|n| (n.to_string(), PollState::Pending)).collect();
    }

    fn set(&self, name: &str, state: PollState) {
        let mut states = self.inner.write().unwrap_or_else(|p| p.into_inner());
        if let Some(entry) = states.iter_mut().find(|(n, _)| n == name) {
            entry.1 = state;
        }
    }

    pub fn get(&self, name: &str) -> Option<PollState> {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| *s)
    }
}

pub struct PollScheduler {
    registry: ProjectRegistry,
    source: Arc<dyn SnapshotSource>,
    config: SchedulerConfig,
    tick: AtomicU64,
    states: PollStates,
    latest: watch::Sender<Arc<TickReport>>,
}

impl PollScheduler {
    pub fn new(
        registry: ProjectRegistry,
        source: Arc<dyn SnapshotSource>,
        mut config: SchedulerConfig,
    ) -> Self {
        if config.interval < MIN_INTERVAL {
            warn!(
                interval_ms = config.interval.as_millis() as u64,
                "poll interval below minimum, using {}s",
                MIN_INTERVAL.as_secs()
            );
            config.interval = MIN_INTERVAL;
        }

        let (latest, _) = watch::channel(Arc::new(TickReport::default()));
        Self {
            registry,
            source,
            config,
            tick: AtomicU64::new(0),
            states: PollStates::default(),
            latest,
        }
    }

    /// Receiver of published ticks. Holds the empty tick 0 until the first
    /// tick completes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<TickReport>> {
        self.latest.subscribe()
    }

    pub fn latest(&self) -> Arc<TickReport> {
        self.latest.borrow().clone()
    }

    pub fn states(&self) -> PollStates {
        self.states.clone()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run the poll loop forever.
    ///
    /// The first tick starts immediately. A tick that outlasts the interval
    /// delays the next one instead of overlapping with it.
    pub async fn run(&self) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            threshold_w = self.config.threshold_w,
            "poll scheduler started"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    /// Poll every registered project once and publish the tick.
    pub async fn poll_once(&self) -> Arc<TickReport> {
        let tick = self.tick.fetch_add(1, Ordering::Relaxed) + 1;
        let started_at = Utc::now();
        let projects = self.registry.list();
        self.states.reset(projects.iter().map(|p| p.name.as_str()));

        debug!(tick, projects = projects.len(), "tick started");

        let results = join_all(projects.into_iter().map(|p| self.poll_project(p))).await;

        let finished_at = Utc::now();
        let failed = results
            .iter()
            .filter(|r| r.state == PollState::Failed)
            .count();
        info!(
            tick,
            projects = results.len(),
            failed,
            elapsed_ms = (finished_at - started_at).num_milliseconds(),
            "tick complete"
        );

        let report = Arc::new(TickReport {
            tick,
            started_at: Some(started_at),
            finished_at: Some(finished_at),
            results,
        });
        self.latest.send_replace(report.clone());
        report
    }

    async fn poll_project(&self, project: Arc<Project>) -> PollResult {
        self.states.set(&project.name, PollState::Fetching);

        match self.source.fetch(project.clone()).await {
            Ok(snapshot) => {
                let statuses = classify(&snapshot, self.config.threshold_w);
                debug!(
                    project = %project.name,
                    channels = statuses.len(),
                    ts = %snapshot.timestamp,
                    "snapshot parsed"
                );
                self.states.set(&project.name, PollState::Parsed);
                PollResult::parsed((*project).clone(), snapshot, statuses)
            }
            Err(e) => {
                warn!(
                    project = %project.name,
                    kind = ?e.kind(),
                    error = %e,
                    "snapshot fetch failed"
                );
                self.states.set(&project.name, PollState::Failed);
                PollResult::failed((*project).clone(), &e)
            }
        }
    }
}

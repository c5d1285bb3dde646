use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{FailureKind, FetchError};
use crate::models::{Project, Snapshot, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlarmStatus {
    Ok,
    Low,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelStatus {
    pub channel: String,
    pub value: Option<f64>,
    pub status: AlarmStatus,
    pub observed_at: Timestamp,
}

/// Progress of one project within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollState {
    Pending,
    Fetching,
    Parsed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&FetchError> for PollFailure {
    fn from(err: &FetchError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of polling one project during one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollResult {
    pub project: Project,
    pub state: PollState,
    pub snapshot: Option<Snapshot>,
    pub statuses: Vec<ChannelStatus>,
    pub failure: Option<PollFailure>,
}

impl PollResult {
    pub fn parsed(project: Project, snapshot: Snapshot, statuses: Vec<ChannelStatus>) -> Self {
        Self {
            project,
            state: PollState::Parsed,
            snapshot: Some(snapshot),
            statuses,
            failure: None,
        }
    }

    pub fn failed(project: Project, err: &FetchError) -> Self {
        Self {
            project,
            state: PollState::Failed,
            snapshot: None,
            statuses: Vec::new(),
            failure: Some(err.into()),
        }
    }

    pub fn has_alarm(&self) -> bool {
        self.statuses.iter().any(|s| s.status != AlarmStatus::Ok)
    }

    fn count(&self, status: AlarmStatus) -> usize {
        self.statuses.iter().filter(|s| s.status == status).count()
    }
}

/// Everything published for one tick. Replaced as a whole on every tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub results: Vec<PollResult>,
}

impl TickReport {
    pub fn result_for(&self, project_name: &str) -> Option<&PollResult> {
        self.results.iter().find(|r| r.project.name == project_name)
    }

    pub fn overview(&self) -> Vec<ProjectOverview> {
        self.results.iter().map(ProjectOverview::from).collect()
    }
}

/// Per-project summary used for map markers and project cards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectOverview {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub has_alarm: bool,
    pub no_data: bool,
    pub ok: usize,
    pub low: usize,
    pub missing: usize,
    pub observed_at: Option<Timestamp>,
}

impl From<&PollResult> for ProjectOverview {
    fn from(result: &PollResult) -> Self {
        Self {
            name: result.project.name.clone(),
            latitude: result.project.latitude,
            longitude: result.project.longitude,
            has_alarm: result.has_alarm(),
            no_data: result.snapshot.is_none(),
            ok: result.count(AlarmStatus::Ok),
            low: result.count(AlarmStatus::Low),
            missing: result.count(AlarmStatus::Missing),
            observed_at: result.snapshot.as_ref().map(|s| s.timestamp),
        }
    }
}

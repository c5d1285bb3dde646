pub mod health;
pub mod projects;
pub mod status;

use std::sync::Arc;
use tokio::sync::watch;

use crate::models::TickReport;
use crate::registry::ProjectRegistry;
use crate::scheduler::{PollScheduler, PollStates};

#[derive(Clone)]
pub struct AppState {
    pub registry: ProjectRegistry,
    pub latest: watch::Receiver<Arc<TickReport>>,
    pub states: PollStates,
}

impl AppState {
    pub fn new(registry: ProjectRegistry, scheduler: &PollScheduler) -> Self {
        Self {
            registry,
            latest: scheduler.subscribe(),
            states: scheduler.states(),
        }
    }

    /// The most recently published tick.
    pub fn latest(&self) -> Arc<TickReport> {
        self.latest.borrow().clone()
    }
}

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;

use crate::api::handlers::AppState;
use crate::error::{AppError, Result};
use crate::models::{PollResult, PollState, ProjectOverview, TickReport};

#[derive(Debug, Serialize)]
pub struct ProjectState {
    pub name: String,
    pub state: PollState,
}

/// GET /api/v1/status
/// Latest published tick; tick 0 with no results until the first tick completes
pub async fn get_status(State(state): State<AppState>) -> Json<TickReport> {
    Json((*state.latest()).clone())
}

/// GET /api/v1/projects/{name}/status
pub async fn get_project_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<PollResult>> {
    if state.registry.get(&name).is_none() {
        return Err(AppError::NotFound(format!("project '{}'", name)));
    }

    let latest = state.latest();
    latest
        .result_for(&name)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no poll result yet for project '{}'", name)))
}

/// GET /api/v1/overview
/// One entry per project of the latest tick, for map markers and cards
pub async fn get_overview(State(state): State<AppState>) -> Json<Vec<ProjectOverview>> {
    Json(state.latest().overview())
}

/// GET /api/v1/states
/// Poll state of every registered project; projects not yet taken into a
/// tick report as pending
pub async fn get_states(State(state): State<AppState>) -> Json<Vec<ProjectState>> {
    let states = state
        .registry
        .list()
        .iter()
        .map(|p| ProjectState {
            name: p.name.clone(),
            state: state.states.get(&p.name).unwrap_or(PollState::Pending),
        })
        .collect();
    Json(states)
}

use axum::{extract::State, http::StatusCode, response::Json};

use crate::api::handlers::AppState;
use crate::error::Result;
use crate::models::{NewProject, Project};

/// GET /api/v1/projects
/// Registered projects in display order, without passwords
pub async fn list_projects(State(state): State<AppState>) -> Json<Vec<Project>> {
    let projects = state
        .registry
        .list()
        .iter()
        .map(|p| (**p).clone())
        .collect();
    Json(projects)
}

/// POST /api/v1/projects
/// Register a project; it is polled from the next tick on
pub async fn add_project(
    State(state): State<AppState>,
    Json(input): Json<NewProject>,
) -> Result<(StatusCode, Json<Project>)> {
    let project = state.registry.add(input)?;
    Ok((StatusCode::CREATED, Json((*project).clone())))
}

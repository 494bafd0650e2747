use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use console_persist::{NewProject, Project, ProjectPatch};

use super::ApiResponse;
use crate::{error::ApiResult, state::AppState};

/// List all projects, ordered by name
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiResponse<Vec<Project>>>> {
    let projects = state.console.list_projects().await?;
    Ok(ApiResponse::ok(projects))
}

/// Create a project
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewProject>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Project>>)> {
    let Json(req) = payload?;
    let project = state.console.create_project(req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(project)))
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Project>>> {
    let project = state.console.get_project(&project_id).await?;
    Ok(ApiResponse::ok(project))
}

/// Update display metadata of a project
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    payload: Result<Json<ProjectPatch>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Project>>> {
    let Json(patch) = payload?;
    let project = state.console.update_project(&project_id, patch).await?;
    Ok(ApiResponse::ok(project))
}

/// Delete a project together with its threads and messages
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.console.delete_project(&project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

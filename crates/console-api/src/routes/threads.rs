use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use console_persist::{NewThread, Thread, ThreadPatch};

use super::ApiResponse;
use crate::{error::ApiResult, state::AppState};

/// Threads of a project, most recently active first
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<Thread>>>> {
    let threads = state.console.list_threads(&project_id).await?;
    Ok(ApiResponse::ok(threads))
}

/// Create a thread in an existing project
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewThread>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Thread>>)> {
    let Json(req) = payload?;
    let thread = state.console.create_thread(req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(thread)))
}

pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Thread>>> {
    let thread = state.console.get_thread(&thread_id).await?;
    Ok(ApiResponse::ok(thread))
}

/// Look a thread up by the reference the memory service knows it by
pub async fn find_by_external_ref(
    State(state): State<Arc<AppState>>,
    Path(external_ref): Path<String>,
) -> ApiResult<Json<ApiResponse<Thread>>> {
    let thread = state.console.find_thread_by_external_ref(&external_ref).await?;
    Ok(ApiResponse::ok(thread))
}

pub async fn update_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    payload: Result<Json<ThreadPatch>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Thread>>> {
    let Json(patch) = payload?;
    let thread = state.console.update_thread(&thread_id, patch).await?;
    Ok(ApiResponse::ok(thread))
}

/// Delete a thread and its messages
pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.console.delete_thread(&thread_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

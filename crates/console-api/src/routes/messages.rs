use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use console_persist::{Message, NewMessage};

use super::ApiResponse;
use crate::{error::ApiResult, state::AppState};

/// Messages of a thread in chronological order
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<Message>>>> {
    let messages = state.console.list_messages(&thread_id).await?;
    Ok(ApiResponse::ok(messages))
}

/// Append a message; the thread's recency marker moves with it
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewMessage>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Message>>)> {
    let Json(req) = payload?;
    let message = state.console.create_message(req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(message)))
}

//! Presence REST handlers.

use axum::Json;
use axum::extract::{Path, State};

use huddle_core::traits::presence::PresenceRecord;
use huddle_core::types::UserId;

use crate::dto::{ApiResponse, OnlineUsersResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/presence/online
pub async fn online_users(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<OnlineUsersResponse>>, ApiError> {
    let users = state.presence.online_users().await?;
    let count = users.len();

    Ok(Json(ApiResponse::ok(OnlineUsersResponse { users, count })))
}

/// GET /api/presence/{user_id}
pub async fn user_presence(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiResponse<PresenceRecord>>, ApiError> {
    let record = state.presence.get(user_id).await?;
    Ok(Json(ApiResponse::ok(record)))
}

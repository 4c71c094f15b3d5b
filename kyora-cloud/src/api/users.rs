//! Current user

use axum::{Extension, Json, extract::State};
use shared::error::{AppError, ErrorCode};
use shared::models::User;

use crate::auth::Actor;
use crate::db;
use crate::state::AppState;

use super::ApiResult;

/// GET /v1/users/me
pub async fn me(State(state): State<AppState>, Extension(actor): Extension<Actor>) -> ApiResult<User> {
    let user = db::accounts::find_by_id(&state.pool, &actor.user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    Ok(Json(user))
}

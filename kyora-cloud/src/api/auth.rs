//! Authentication endpoints: register, login, refresh, logout

use axum::http::StatusCode;
use axum::{Extension, Json, extract::State};
use shared::error::{AppError, ErrorCode};
use shared::models::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, User};

use crate::auth::Actor;
use crate::auth::jwt::{JWT_EXPIRY_HOURS, create_token};
use crate::db;
use crate::db::accounts::NewUser;
use crate::error::{ServiceResult, is_unique_violation};
use crate::state::AppState;
use crate::util::{hash_password, normalize_email, verify_password};

use super::{ApiJson, ApiResult, CreatedResult, EmptyResult, created, validate};

fn access_token(state: &AppState, user: &User) -> Result<String, AppError> {
    create_token(&user.id, &user.workspace_id, user.role, &state.jwt_secret).map_err(|e| {
        tracing::error!("JWT creation failed: {e}");
        AppError::new(ErrorCode::InternalError)
    })
}

/// Issue an access token plus a fresh refresh token for `user`
async fn issue_tokens(state: &AppState, user: User) -> ServiceResult<AuthResponse> {
    let access_token = access_token(state, &user)?;
    let refresh_token = db::refresh_tokens::create(&state.pool, &user.id).await?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        expires_in: JWT_EXPIRY_HOURS * 3600,
        user,
    })
}

/// POST /v1/auth/register
///
/// Creates a new workspace whose first user is its admin.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> CreatedResult<AuthResponse> {
    validate(&req)?;
    let email = normalize_email(&req.email);
    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!("Password hashing failed: {e}");
        AppError::new(ErrorCode::InternalError)
    })?;

    let new_user = NewUser {
        first_name: req.first_name.trim(),
        last_name: req.last_name.trim(),
        email: &email,
        password_hash: &password_hash,
    };

    let mut tx = state.pool.begin().await?;
    let user = match db::accounts::create_workspace_with_owner(&mut tx, &new_user).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e, db::accounts::EMAIL_CONSTRAINT) => {
            return Err(AppError::new(ErrorCode::EmailAlreadyRegistered).into());
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit().await?;

    tracing::info!(user_id = %user.id, workspace_id = %user.workspace_id, "Workspace registered");
    created(issue_tokens(&state, user).await?)
}

/// POST /v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<AuthResponse> {
    validate(&req)?;
    let email = normalize_email(&req.email);
    let row = db::accounts::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::InvalidCredentials))?;

    if !verify_password(&req.password, &row.password_hash) {
        return Err(AppError::new(ErrorCode::InvalidCredentials).into());
    }

    let user = User::try_from(row)?;
    Ok(Json(issue_tokens(&state, user).await?))
}

/// POST /v1/auth/refresh
///
/// Rotates the refresh token; the presented one cannot be reused.
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<AuthResponse> {
    validate(&req)?;
    let (user_id, refresh_token) = db::refresh_tokens::rotate(&state.pool, &req.refresh_token)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::RefreshTokenInvalid))?;

    let user = db::accounts::find_by_id(&state.pool, &user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::RefreshTokenInvalid))?;

    Ok(Json(AuthResponse {
        access_token: access_token(&state, &user)?,
        refresh_token,
        expires_in: JWT_EXPIRY_HOURS * 3600,
        user,
    }))
}

/// POST /v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> EmptyResult {
    validate(&req)?;
    db::refresh_tokens::revoke(&state.pool, &req.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/auth/logout-all
pub async fn logout_all(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> EmptyResult {
    db::refresh_tokens::revoke_all(&state.pool, &actor.user_id).await?;
    tracing::info!(user_id = %actor.user_id, "All sessions revoked");
    Ok(StatusCode::NO_CONTENT)
}

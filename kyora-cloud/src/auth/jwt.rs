//! Access token (JWT) issuing and verification

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Action, Resource, Role};

use crate::state::AppState;

/// JWT claims for a workspace user
#[derive(Debug, Serialize, Deserialize)]
pub struct UserClaims {
    /// User ID
    pub sub: String,
    /// Workspace the user belongs to
    pub wid: String,
    /// Role name (`admin` | `user`)
    pub role: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated caller, inserted as a request extension by [`require_auth`]
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
    pub workspace_id: String,
    pub role: Role,
}

impl Actor {
    /// Permission check performed by handlers before touching data.
    pub fn require(&self, action: Action, resource: Resource) -> AppResult<()> {
        if self.role.can(action, resource) {
            return Ok(());
        }
        Err(AppError::new(ErrorCode::PermissionDenied)
            .with_detail("action", action.as_db())
            .with_detail("resource", resource.as_db()))
    }
}

pub const JWT_EXPIRY_HOURS: i64 = 24;

/// Create an access token for a user
pub fn create_token(
    user_id: &str,
    workspace_id: &str,
    role: Role,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = UserClaims {
        sub: user_id.to_string(),
        wid: workspace_id.to_string(),
        role: role.as_db().to_string(),
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify a token and turn its claims into an [`Actor`]
pub fn verify_token(token: &str, secret: &str) -> AppResult<Actor> {
    let token_data = jsonwebtoken::decode::<UserClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::new(ErrorCode::TokenExpired)
            }
            _ => AppError::new(ErrorCode::TokenInvalid),
        }
    })?;

    let claims = token_data.claims;
    let role = Role::from_db(&claims.role).ok_or_else(|| AppError::new(ErrorCode::TokenInvalid))?;
    Ok(Actor {
        user_id: claims.sub,
        workspace_id: claims.wid,
        role,
    })
}

/// Middleware that extracts and verifies the Bearer token from the Authorization header
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized().into_response())?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::with_message(ErrorCode::TokenInvalid, "Invalid Authorization format")
            .into_response()
    })?;

    let actor = verify_token(token, &state.jwt_secret).map_err(IntoResponse::into_response)?;
    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_roundtrip() {
        let token = create_token("usr_1", "wrk_1", Role::Admin, SECRET).unwrap();
        let actor = verify_token(&token, SECRET).unwrap();
        assert_eq!(actor.user_id, "usr_1");
        assert_eq!(actor.workspace_id, "wrk_1");
        assert_eq!(actor.role, Role::Admin);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token("usr_1", "wrk_1", Role::User, SECRET).unwrap();
        let err = verify_token(&token, "other").unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn test_expired_token_rejected() {
        let past = (chrono::Utc::now() - chrono::Duration::hours(2)).timestamp() as usize;
        let claims = UserClaims {
            sub: "usr_1".into(),
            wid: "wrk_1".into(),
            role: "user".into(),
            exp: past,
            iat: past - 60,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(verify_token(&token, SECRET).unwrap_err().code, ErrorCode::TokenExpired);
    }

    #[test]
    fn test_actor_permissions() {
        let viewer = Actor {
            user_id: "usr_1".into(),
            workspace_id: "wrk_1".into(),
            role: Role::User,
        };
        assert!(viewer.require(Action::View, Resource::Order).is_ok());
        let err = viewer.require(Action::Manage, Resource::Order).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        let admin = Actor {
            role: Role::Admin,
            ..viewer
        };
        assert!(admin.require(Action::Manage, Resource::Expense).is_ok());
    }
}

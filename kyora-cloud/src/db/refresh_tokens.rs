//! Refresh token storage
//!
//! Tokens are opaque random strings, single-use: refreshing revokes the presented
//! token and issues a new one.

use shared::util::now_millis;
use sqlx::PgPool;

use crate::util::generate_token;

const REFRESH_TOKEN_TTL_MS: i64 = 30 * 24 * 60 * 60 * 1000; // 30 days

/// Issue a new refresh token for a user
pub async fn create(pool: &PgPool, user_id: &str) -> Result<String, sqlx::Error> {
    let token = generate_token();
    let now = now_millis();

    sqlx::query(
        "INSERT INTO refresh_tokens (token, user_id, expires_at, created_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(&token)
    .bind(user_id)
    .bind(now + REFRESH_TOKEN_TTL_MS)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(token)
}

/// Validate and rotate a refresh token. Returns (user_id, new_refresh_token).
pub async fn rotate(
    pool: &PgPool,
    refresh_token: &str,
) -> Result<Option<(String, String)>, sqlx::Error> {
    // Revoke-and-return in one statement so a token can only be used once
    let row: Option<RefreshTokenRow> = sqlx::query_as(
        "UPDATE refresh_tokens SET revoked = TRUE
         WHERE token = $1 AND NOT revoked
         RETURNING user_id, expires_at",
    )
    .bind(refresh_token)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    if row.expires_at < now_millis() {
        return Ok(None);
    }

    let new_token = create(pool, &row.user_id).await?;
    Ok(Some((row.user_id, new_token)))
}

/// Revoke a single token (logout)
pub async fn revoke(pool: &PgPool, refresh_token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE token = $1 AND NOT revoked")
        .bind(refresh_token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Revoke all refresh tokens of a user
pub async fn revoke_all(pool: &PgPool, user_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND NOT revoked")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    user_id: String,
    expires_at: i64,
}

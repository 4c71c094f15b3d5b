//! Workspaces and users

use shared::models::{Role, User};
use shared::util::{now_millis, prefixed_id};
use sqlx::{PgConnection, PgExecutor};

use super::enum_col;

pub const EMAIL_CONSTRAINT: &str = "users_email_key";

#[derive(sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub workspace_id: String,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<UserRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            workspace_id: row.workspace_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            role: enum_col(&row.role)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_COLUMNS: &str =
    "id, workspace_id, role, first_name, last_name, email, password_hash, created_at, updated_at";

pub struct NewUser<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

/// Create a workspace with its first (admin) user
pub async fn create_workspace_with_owner(
    conn: &mut PgConnection,
    user: &NewUser<'_>,
) -> Result<User, sqlx::Error> {
    let now = now_millis();
    let workspace_id = prefixed_id("wrk");
    let user_id = prefixed_id("usr");

    sqlx::query("INSERT INTO workspaces (id, created_at, updated_at) VALUES ($1, $2, $2)")
        .bind(&workspace_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    let row: UserRow = sqlx::query_as(&format!(
        "INSERT INTO users (id, workspace_id, role, first_name, last_name, email, password_hash, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(&user_id)
    .bind(&workspace_id)
    .bind(Role::Admin.as_db())
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("UPDATE workspaces SET owner_id = $1 WHERE id = $2")
        .bind(&user_id)
        .bind(&workspace_id)
        .execute(&mut *conn)
        .await?;

    row.try_into()
}

pub async fn find_by_email(
    db: impl PgExecutor<'_>,
    email: &str,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
    ))
    .bind(email)
    .fetch_optional(db)
    .await
}

pub async fn find_by_id(db: impl PgExecutor<'_>, id: &str) -> Result<Option<User>, sqlx::Error> {
    let row: Option<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    row.map(User::try_from).transpose()
}

/// `true` when `user_id` is an active member of `workspace_id`
pub async fn is_workspace_member(
    db: impl PgExecutor<'_>,
    workspace_id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND workspace_id = $2 AND deleted_at IS NULL)",
    )
    .bind(user_id)
    .bind(workspace_id)
    .fetch_one(db)
    .await
}

//! Account models: users, roles and auth payloads

use serde::{Deserialize, Serialize};
use validator::Validate;

pub const MIN_PASSWORD_LEN: u64 = 8;

text_enum! {
    /// Workspace role of a user
    pub enum Role {
        Admin => "admin",
        User => "user",
    }
}

text_enum! {
    pub enum Action {
        View => "view",
        Manage => "manage",
    }
}

text_enum! {
    /// Permission-guarded resource families
    pub enum Resource {
        Account => "account",
        Business => "business",
        Customer => "customer",
        Order => "order",
        Inventory => "inventory",
        Expense => "expense",
        Accounting => "accounting",
    }
}

impl Role {
    /// Static permission table: `user` may view everything, `admin` may also manage.
    pub fn can(&self, action: Action, _resource: Resource) -> bool {
        match self {
            Role::Admin => true,
            Role::User => action == Action::View,
        }
    }
}

/// User as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub workspace_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: i64,
    pub updated_at: i64,
}

/// POST /v1/auth/register
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// POST /v1/auth/login
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// POST /v1/auth/refresh and /v1/auth/logout
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permissions() {
        for resource in Resource::ALL {
            assert!(Role::Admin.can(Action::View, *resource));
            assert!(Role::Admin.can(Action::Manage, *resource));
            assert!(Role::User.can(Action::View, *resource));
            assert!(!Role::User.can(Action::Manage, *resource));
        }
    }

    #[test]
    fn test_role_db_mapping() {
        assert_eq!(Role::from_db("admin"), Some(Role::Admin));
        assert_eq!(Role::User.as_db(), "user");
        assert_eq!(Role::from_db("owner"), None);
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn test_register_validation() {
        let req = RegisterRequest {
            first_name: "Sam".into(),
            last_name: "Lee".into(),
            email: "not-an-email".into(),
            password: "short".into(),
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_user_serializes_camel_case() {
        let user = User {
            id: "usr_1".into(),
            workspace_id: "wrk_1".into(),
            first_name: "Sam".into(),
            last_name: "Lee".into(),
            email: "sam@example.com".into(),
            role: Role::Admin,
            created_at: 1,
            updated_at: 2,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["workspaceId"], "wrk_1");
        assert_eq!(json["firstName"], "Sam");
        assert!(json.get("passwordHash").is_none());
    }
}

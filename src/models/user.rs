//! User model
//!
//! Admin/editor accounts with role-based access control. Passwords are
//! stored as argon2id hashes only; see `services::password`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity for admin/editor access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2id PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// User role
    pub role: UserRole,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last successful login
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new User.
    ///
    /// The password must already be hashed; use
    /// `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String, role: UserRole) -> Self {
        Self {
            id: 0, // Set by the database
            username,
            email,
            password_hash,
            role,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    /// The sole authorization predicate consumed by the access control layer.
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// User role for authorization.
///
/// - Admin: full access, including contact and user management
/// - Editor: blog post and upload management only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Administrator - full access
    Admin,
    /// Editor - content management only
    #[default]
    Editor,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Editor => write!(f, "editor"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "editor" => Ok(UserRole::Editor),
            other => Err(format!("Unknown user role: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(role: UserRole) -> User {
        User::new(
            "tester".to_string(),
            "tester@example.com".to_string(),
            "$argon2id$fake".to_string(),
            role,
        )
    }

    #[test]
    fn only_admin_role_is_admin() {
        assert!(user_with_role(UserRole::Admin).is_admin());
        assert!(!user_with_role(UserRole::Editor).is_admin());
    }

    #[test]
    fn role_round_trips_through_string() {
        for role in [UserRole::Admin, UserRole::Editor] {
            assert_eq!(role.to_string().parse::<UserRole>().unwrap(), role);
        }
        assert!("superuser".parse::<UserRole>().is_err());
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let user = user_with_role(UserRole::Editor);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
    }
}

//! User service
//!
//! Account management and session authentication. Sessions are opaque
//! random tokens stored server side; expiry is checked on every
//! validation and expired rows are deleted on sight.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::repositories::{is_unique_violation, SessionRepository, UserRepository};
use crate::models::{Session, User, UserRole};
use crate::services::password::{hash_password, verify_password};
use crate::services::rate_limiter::RateLimiter;

/// Session lifetime in days.
const SESSION_EXPIRATION_DAYS: i64 = 7;

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Invalid username or password")]
    AuthenticationFailed,

    #[error("Too many failed login attempts, try again later")]
    RateLimited,

    #[error("{0}")]
    Validation(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    rate_limiter: Arc<RateLimiter>,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            rate_limiter,
        }
    }

    /// Create a new user account.
    ///
    /// The duplicate pre-checks give a precise error message; the
    /// database unique constraints remain the actual guarantee, so a
    /// racing insert still surfaces as `UserExists`.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<User, UserServiceError> {
        validate_username(username)?;
        validate_email(email)?;
        validate_password(password)?;

        if self
            .user_repo
            .get_by_username(username)
            .await
            .context("duplicate username check failed")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "username '{}' is taken",
                username
            )));
        }
        if self
            .user_repo
            .get_by_email(email)
            .await
            .context("duplicate email check failed")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "email '{}' is already registered",
                email
            )));
        }

        let hash = hash_password(password).context("password hashing failed")?;
        let user = User::new(username.to_string(), email.to_string(), hash, role);

        match self.user_repo.create(&user).await {
            Ok(created) => {
                info!(username = %created.username, role = %created.role, "created user");
                Ok(created)
            }
            Err(e) if is_unique_violation(&e) => Err(UserServiceError::UserExists(
                "username or email already registered".to_string(),
            )),
            Err(e) => Err(e.context("user insert failed").into()),
        }
    }

    /// Authenticate a user and open a session.
    ///
    /// Failed attempts count against the per-username rate limit. The
    /// same error is returned for unknown usernames and wrong passwords.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(User, Session), UserServiceError> {
        if self.rate_limiter.is_login_limited(username).await {
            return Err(UserServiceError::RateLimited);
        }

        let user = match self
            .user_repo
            .get_by_username(username)
            .await
            .context("user lookup failed")?
        {
            Some(user) => user,
            None => {
                self.rate_limiter.record_failed_login(username).await;
                return Err(UserServiceError::AuthenticationFailed);
            }
        };

        let valid = verify_password(password, &user.password_hash)
            .context("password verification failed")?;
        if !valid {
            self.rate_limiter.record_failed_login(username).await;
            return Err(UserServiceError::AuthenticationFailed);
        }

        self.rate_limiter.clear_login_attempts(username).await;

        let now = Utc::now();
        self.user_repo
            .touch_last_login(user.id, now)
            .await
            .context("last_login update failed")?;

        let session = Session {
            id: Uuid::new_v4().simple().to_string(),
            user_id: user.id,
            expires_at: now + Duration::days(SESSION_EXPIRATION_DAYS),
            created_at: now,
        };
        let session = self
            .session_repo
            .create(&session)
            .await
            .context("session insert failed")?;

        info!(username = %user.username, "user logged in");
        let mut user = user;
        user.last_login = Some(now);
        Ok((user, session))
    }

    /// Resolve a session token to its user.
    ///
    /// Expired or unknown tokens yield `None`; expired rows are removed
    /// as a side effect.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get(token)
            .await
            .context("session lookup failed")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.session_repo
                .delete(token)
                .await
                .context("expired session delete failed")?;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("session user lookup failed")?;
        Ok(user)
    }

    /// End a session. Unknown tokens are a no-op.
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("session delete failed")?;
        Ok(())
    }

    /// Reset a user's password and invalidate all their sessions.
    pub async fn reset_password(
        &self,
        username: &str,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        validate_password(new_password)?;

        let mut user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("user lookup failed")?
            .ok_or(UserServiceError::UserNotFound)?;

        user.password_hash = hash_password(new_password).context("password hashing failed")?;
        self.user_repo
            .update(&user)
            .await
            .context("password update failed")?;
        self.session_repo
            .delete_for_user(user.id)
            .await
            .context("session invalidation failed")?;

        info!(username = %username, "password reset");
        Ok(())
    }

    /// Change a user's role.
    pub async fn set_role(&self, username: &str, role: UserRole) -> Result<User, UserServiceError> {
        let mut user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("user lookup failed")?
            .ok_or(UserServiceError::UserNotFound)?;

        if user.role == role {
            return Ok(user);
        }

        // A site must keep at least one admin
        if user.role == UserRole::Admin && self.admin_count().await? <= 1 {
            return Err(UserServiceError::Validation(
                "cannot demote the last admin".to_string(),
            ));
        }

        user.role = role;
        let user = self
            .user_repo
            .update(&user)
            .await
            .context("role update failed")?;
        info!(username = %user.username, role = %user.role, "changed user role");
        Ok(user)
    }

    /// Delete a user account and their sessions.
    pub async fn delete_user(&self, username: &str) -> Result<(), UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("user lookup failed")?
            .ok_or(UserServiceError::UserNotFound)?;

        if user.is_admin() && self.admin_count().await? <= 1 {
            return Err(UserServiceError::Validation(
                "cannot delete the last admin".to_string(),
            ));
        }

        self.session_repo
            .delete_for_user(user.id)
            .await
            .context("session cleanup failed")?;
        self.user_repo
            .delete(user.id)
            .await
            .context("user delete failed")?;

        info!(username = %username, "deleted user");
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .user_repo
            .get_by_id(id)
            .await
            .context("user lookup failed")?)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .user_repo
            .get_by_username(username)
            .await
            .context("user lookup failed")?)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self.user_repo.list().await.context("user list failed")?)
    }

    /// Remove expired session rows. Called from a background task.
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let removed = self
            .session_repo
            .delete_expired()
            .await
            .context("session cleanup failed")?;
        if removed > 0 {
            info!(removed, "removed expired sessions");
        }
        Ok(removed)
    }

    async fn admin_count(&self) -> Result<i64, UserServiceError> {
        let users = self.user_repo.list().await.context("user list failed")?;
        Ok(users.iter().filter(|u| u.is_admin()).count() as i64)
    }
}

fn validate_username(username: &str) -> Result<(), UserServiceError> {
    let len = username.chars().count();
    if !(3..=80).contains(&len) {
        return Err(UserServiceError::Validation(
            "username must be between 3 and 80 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), UserServiceError> {
    if email.chars().count() > 120 || !is_valid_email(email) {
        return Err(UserServiceError::Validation(
            "please enter a valid email address".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), UserServiceError> {
    if password.chars().count() < 8 {
        return Err(UserServiceError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

/// Minimal structural email check: one `@`, non-empty local part, and a
/// domain containing a dot.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || email.contains(char::is_whitespace) {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && tld.len() >= 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::session::SqlxSessionRepository;
    use crate::db::repositories::user::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations::run_migrations};

    async fn setup() -> UserService {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            Arc::new(RateLimiter::new()),
        )
    }

    #[tokio::test]
    async fn create_login_and_validate_session() {
        let service = setup().await;
        service
            .create_user("alice", "alice@example.com", "password123", UserRole::Editor)
            .await
            .unwrap();

        let (user, session) = service.login("alice", "password123").await.unwrap();
        assert_eq!(user.username, "alice");
        assert!(user.last_login.is_some());

        let resolved = service.validate_session(&session.id).await.unwrap();
        assert_eq!(resolved.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_and_unknown_user_identically() {
        let service = setup().await;
        service
            .create_user("alice", "alice@example.com", "password123", UserRole::Editor)
            .await
            .unwrap();

        let wrong = service.login("alice", "not-it-at-all").await.unwrap_err();
        let unknown = service.login("nobody", "password123").await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn repeated_failures_trip_the_rate_limit() {
        let service = setup().await;
        service
            .create_user("alice", "alice@example.com", "password123", UserRole::Editor)
            .await
            .unwrap();

        for _ in 0..5 {
            let _ = service.login("alice", "wrong-password").await;
        }
        let err = service.login("alice", "password123").await.unwrap_err();
        assert!(matches!(err, UserServiceError::RateLimited));
    }

    #[tokio::test]
    async fn logout_invalidates_session() {
        let service = setup().await;
        service
            .create_user("alice", "alice@example.com", "password123", UserRole::Editor)
            .await
            .unwrap();
        let (_, session) = service.login("alice", "password123").await.unwrap();

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let service = setup().await;
        service
            .create_user("alice", "alice@example.com", "password123", UserRole::Editor)
            .await
            .unwrap();

        let err = service
            .create_user("alice", "other@example.com", "password123", UserRole::Editor)
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::UserExists(_)));
    }

    #[tokio::test]
    async fn weak_passwords_are_rejected() {
        let service = setup().await;
        let err = service
            .create_user("alice", "alice@example.com", "short", UserRole::Editor)
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn reset_password_invalidates_sessions() {
        let service = setup().await;
        service
            .create_user("alice", "alice@example.com", "password123", UserRole::Editor)
            .await
            .unwrap();
        let (_, session) = service.login("alice", "password123").await.unwrap();

        service.reset_password("alice", "fresh-password").await.unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        let (user, _) = service.login("alice", "fresh-password").await.unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn last_admin_cannot_be_demoted_or_deleted() {
        let service = setup().await;
        service
            .create_user("root", "root@example.com", "password123", UserRole::Admin)
            .await
            .unwrap();

        let demote = service.set_role("root", UserRole::Editor).await.unwrap_err();
        assert!(matches!(demote, UserServiceError::Validation(_)));

        let delete = service.delete_user("root").await.unwrap_err();
        assert!(matches!(delete, UserServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn promote_then_demote_round_trips() {
        let service = setup().await;
        service
            .create_user("root", "root@example.com", "password123", UserRole::Admin)
            .await
            .unwrap();
        service
            .create_user("bob", "bob@example.com", "password123", UserRole::Editor)
            .await
            .unwrap();

        let promoted = service.set_role("bob", UserRole::Admin).await.unwrap();
        assert!(promoted.is_admin());
        let demoted = service.set_role("bob", UserRole::Editor).await.unwrap();
        assert!(!demoted.is_admin());
    }

    #[test]
    fn email_validation_accepts_and_rejects() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("user.name+tag@sub.domain.example"));
        assert!(!is_valid_email("plainaddress"));
        assert!(!is_valid_email("@no-local.example"));
        assert!(!is_valid_email("user@nodomain"));
        assert!(!is_valid_email("user name@example.com"));
    }
}

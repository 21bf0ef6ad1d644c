//! Repository layer
//!
//! Trait-based data access. Services depend on the traits so tests can run
//! against in-memory SQLite without touching the HTTP layer.

pub mod contact;
pub mod post;
pub mod session;
pub mod upload;
pub mod user;

pub use contact::{ContactRepository, SqlxContactRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use upload::{SqlxUploadRepository, UploadRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// Check whether an error chain contains a database uniqueness violation.
///
/// The unique constraint is the source of truth for slug/username/email
/// uniqueness; callers catch this after an insert and surface it as a
/// user-facing conflict.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_unique_violation())
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn unique_violation_is_detected() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let insert = "INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)";
        sqlx::query(insert)
            .bind("dupe")
            .bind("dupe@example.com")
            .bind("hash")
            .execute(&pool)
            .await
            .unwrap();

        let err = sqlx::query(insert)
            .bind("dupe")
            .bind("other@example.com")
            .bind("hash")
            .execute(&pool)
            .await
            .expect_err("duplicate username must be rejected");
        let err = anyhow::Error::from(err).context("insert failed");
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn other_errors_are_not_unique_violations() {
        let err = anyhow::anyhow!("disk on fire");
        assert!(!is_unique_violation(&err));
    }
}

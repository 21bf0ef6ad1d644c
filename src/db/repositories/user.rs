//! User repository
//!
//! Database operations for users.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

use crate::models::{User, UserRole};

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user; fails with a unique violation on duplicate
    /// username or email
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Update a user (role, password hash)
    async fn update(&self, user: &User) -> Result<User>;

    /// Record a successful login
    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<()>;

    /// Delete a user
    async fn delete(&self, id: i64) -> Result<()>;

    /// List all users, newest first
    async fn list(&self) -> Result<Vec<User>>;

    /// Count total users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: SqlitePool,
}

impl SqlxUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create user")?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            created_at: now,
            last_login: None,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by ID")?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by username")?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by email")?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn update(&self, user: &User) -> Result<User> {
        sqlx::query(
            r#"
            UPDATE users
            SET username = ?, email = ?, password_hash = ?, role = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .bind(user.id)
        .execute(&self.pool)
        .await
        .context("Failed to update user")?;

        self.get_by_id(user.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after update"))
    }

    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update last login")?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")?;
        rows.iter().map(row_to_user).collect()
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;
        Ok(count)
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .map_err(|e| anyhow::anyhow!("Invalid role in database: {}", e))?;

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role,
        created_at: row.get("created_at"),
        last_login: row.try_get::<Option<DateTime<Utc>>, _>("last_login")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::is_unique_violation;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxUserRepository {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SqlxUserRepository::new(pool)
    }

    fn sample_user(username: &str, email: &str) -> User {
        User::new(
            username.to_string(),
            email.to_string(),
            "$argon2id$fake".to_string(),
            UserRole::Editor,
        )
    }

    #[tokio::test]
    async fn create_and_fetch_user() {
        let repo = setup().await;
        let created = repo.create(&sample_user("alice", "alice@example.com")).await.unwrap();
        assert!(created.id > 0);

        let by_name = repo.get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert_eq!(by_name.role, UserRole::Editor);
        assert!(by_name.last_login.is_none());

        let by_email = repo.get_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
    }

    #[tokio::test]
    async fn duplicate_username_is_unique_violation() {
        let repo = setup().await;
        repo.create(&sample_user("bob", "bob@example.com")).await.unwrap();

        let err = repo
            .create(&sample_user("bob", "bob2@example.com"))
            .await
            .expect_err("duplicate username must fail");
        assert!(is_unique_violation(&err));

        let err = repo
            .create(&sample_user("bob2", "bob@example.com"))
            .await
            .expect_err("duplicate email must fail");
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn touch_last_login_persists() {
        let repo = setup().await;
        let user = repo.create(&sample_user("carol", "carol@example.com")).await.unwrap();

        let at = Utc::now();
        repo.touch_last_login(user.id, at).await.unwrap();

        let reloaded = repo.get_by_id(user.id).await.unwrap().unwrap();
        let stored = reloaded.last_login.expect("last_login set");
        assert!((stored - at).num_seconds().abs() < 2);
    }

    #[tokio::test]
    async fn update_changes_role() {
        let repo = setup().await;
        let mut user = repo.create(&sample_user("dave", "dave@example.com")).await.unwrap();

        user.role = UserRole::Admin;
        let updated = repo.update(&user).await.unwrap();
        assert_eq!(updated.role, UserRole::Admin);
        assert!(updated.is_admin());
    }

    #[tokio::test]
    async fn delete_removes_user() {
        let repo = setup().await;
        let user = repo.create(&sample_user("eve", "eve@example.com")).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);

        repo.delete(user.id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(repo.get_by_id(user.id).await.unwrap().is_none());
    }
}

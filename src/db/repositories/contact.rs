//! Contact submission repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

use crate::models::{ContactStatus, ContactSubmission};

/// Contact submission repository trait
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Create a new submission
    async fn create(&self, submission: &ContactSubmission) -> Result<ContactSubmission>;

    /// Get submission by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<ContactSubmission>>;

    /// Update status and notes
    async fn update(&self, submission: &ContactSubmission) -> Result<ContactSubmission>;

    /// Delete a submission
    async fn delete(&self, id: i64) -> Result<()>;

    /// List submissions newest-first, optionally filtered by status
    async fn list(
        &self,
        status: Option<ContactStatus>,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<ContactSubmission>, i64)>;
}

/// SQLx-based contact repository implementation
pub struct SqlxContactRepository {
    pool: SqlitePool,
}

impl SqlxContactRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn ContactRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ContactRepository for SqlxContactRepository {
    async fn create(&self, submission: &ContactSubmission) -> Result<ContactSubmission> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO contact_submissions (name, email, phone, message, submitted_at, status, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&submission.name)
        .bind(&submission.email)
        .bind(&submission.phone)
        .bind(&submission.message)
        .bind(now)
        .bind(submission.status.to_string())
        .bind(&submission.notes)
        .execute(&self.pool)
        .await
        .context("Failed to create contact submission")?;

        Ok(ContactSubmission {
            id: result.last_insert_rowid(),
            name: submission.name.clone(),
            email: submission.email.clone(),
            phone: submission.phone.clone(),
            message: submission.message.clone(),
            submitted_at: now,
            status: submission.status,
            notes: submission.notes.clone(),
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ContactSubmission>> {
        let row = sqlx::query("SELECT * FROM contact_submissions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get contact submission")?;
        row.as_ref().map(row_to_submission).transpose()
    }

    async fn update(&self, submission: &ContactSubmission) -> Result<ContactSubmission> {
        sqlx::query(
            r#"
            UPDATE contact_submissions
            SET status = ?, notes = ?
            WHERE id = ?
            "#,
        )
        .bind(submission.status.to_string())
        .bind(&submission.notes)
        .bind(submission.id)
        .execute(&self.pool)
        .await
        .context("Failed to update contact submission")?;

        self.get_by_id(submission.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Contact submission not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM contact_submissions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete contact submission")?;
        Ok(())
    }

    async fn list(
        &self,
        status: Option<ContactStatus>,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<ContactSubmission>, i64)> {
        let limit = per_page as i64;
        let skip = (page.max(1).saturating_sub(1) as i64) * limit;

        let (total, rows) = match status {
            Some(status) => {
                let total: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM contact_submissions WHERE status = ?",
                )
                .bind(status.to_string())
                .fetch_one(&self.pool)
                .await
                .context("Failed to count contact submissions")?;

                let rows = sqlx::query(
                    r#"
                    SELECT * FROM contact_submissions
                    WHERE status = ?
                    ORDER BY submitted_at DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(status.to_string())
                .bind(limit)
                .bind(skip)
                .fetch_all(&self.pool)
                .await
                .context("Failed to list contact submissions")?;
                (total, rows)
            }
            None => {
                let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_submissions")
                    .fetch_one(&self.pool)
                    .await
                    .context("Failed to count contact submissions")?;

                let rows = sqlx::query(
                    r#"
                    SELECT * FROM contact_submissions
                    ORDER BY submitted_at DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(limit)
                .bind(skip)
                .fetch_all(&self.pool)
                .await
                .context("Failed to list contact submissions")?;
                (total, rows)
            }
        };

        let submissions = rows
            .iter()
            .map(row_to_submission)
            .collect::<Result<Vec<_>>>()?;
        Ok((submissions, total))
    }
}

fn row_to_submission(row: &sqlx::sqlite::SqliteRow) -> Result<ContactSubmission> {
    let status_str: String = row.get("status");
    let status = ContactStatus::from_str(&status_str)
        .map_err(|e| anyhow::anyhow!("Invalid status in database: {}", e))?;

    Ok(ContactSubmission {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.try_get::<Option<String>, _>("phone")?,
        message: row.get("message"),
        submitted_at: row.get("submitted_at"),
        status,
        notes: row.try_get::<Option<String>, _>("notes")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxContactRepository {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SqlxContactRepository::new(pool)
    }

    fn submission(name: &str) -> ContactSubmission {
        ContactSubmission::new(
            name.to_string(),
            format!("{}@example.com", name),
            Some("555-0100".to_string()),
            "Please call me back about a project.".to_string(),
        )
    }

    #[tokio::test]
    async fn create_starts_as_new() {
        let repo = setup().await;
        let created = repo.create(&submission("ada")).await.unwrap();
        assert!(created.id > 0);
        assert_eq!(created.status, ContactStatus::New);

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.phone.as_deref(), Some("555-0100"));
        assert!(found.notes.is_none());
    }

    #[tokio::test]
    async fn null_phone_and_notes_read_back_as_none() {
        let repo = setup().await;
        let mut sub = submission("cy");
        sub.phone = None;
        let created = repo.create(&sub).await.unwrap();

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert!(found.phone.is_none());
        assert!(found.notes.is_none());
    }

    #[tokio::test]
    async fn status_and_notes_update_round_trip() {
        let repo = setup().await;
        let mut sub = repo.create(&submission("bo")).await.unwrap();

        sub.mark_as_read();
        sub.notes = Some("Quoted $400".to_string());
        let updated = repo.update(&sub).await.unwrap();
        assert_eq!(updated.status, ContactStatus::Read);
        assert_eq!(updated.notes.as_deref(), Some("Quoted $400"));
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let repo = setup().await;
        let mut first = repo.create(&submission("one")).await.unwrap();
        repo.create(&submission("two")).await.unwrap();

        first.mark_as_responded();
        repo.update(&first).await.unwrap();

        let (new_only, total_new) = repo.list(Some(ContactStatus::New), 1, 10).await.unwrap();
        assert_eq!(total_new, 1);
        assert_eq!(new_only[0].name, "two");

        let (all, total) = repo.list(None, 1, 10).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(all.len(), 2);
    }
}

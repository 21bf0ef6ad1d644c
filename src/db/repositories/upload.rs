//! Uploaded file repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use crate::models::UploadedFile;

/// Uploaded file repository trait
#[async_trait]
pub trait UploadRepository: Send + Sync {
    /// Record a stored asset
    async fn create(&self, file: &UploadedFile) -> Result<UploadedFile>;

    /// Get record by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<UploadedFile>>;

    /// Delete a record
    async fn delete(&self, id: i64) -> Result<()>;

    /// List records newest-first with pagination
    async fn list(&self, page: u32, per_page: u32) -> Result<(Vec<UploadedFile>, i64)>;
}

/// SQLx-based uploaded file repository implementation
pub struct SqlxUploadRepository {
    pool: SqlitePool,
}

impl SqlxUploadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn UploadRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UploadRepository for SqlxUploadRepository {
    async fn create(&self, file: &UploadedFile) -> Result<UploadedFile> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO uploaded_files (filename, original_filename, filepath, file_size, mime_type, uploaded_by, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&file.filename)
        .bind(&file.original_filename)
        .bind(&file.filepath)
        .bind(file.file_size)
        .bind(&file.mime_type)
        .bind(file.uploaded_by)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to record uploaded file")?;

        Ok(UploadedFile {
            id: result.last_insert_rowid(),
            uploaded_at: now,
            ..file.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<UploadedFile>> {
        let row = sqlx::query("SELECT * FROM uploaded_files WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get uploaded file")?;
        row.as_ref().map(row_to_file).transpose()
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM uploaded_files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete uploaded file record")?;
        Ok(())
    }

    async fn list(&self, page: u32, per_page: u32) -> Result<(Vec<UploadedFile>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM uploaded_files")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count uploaded files")?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM uploaded_files
            ORDER BY uploaded_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(per_page as i64)
        .bind((page.max(1).saturating_sub(1) as i64) * per_page as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list uploaded files")?;

        let files = rows.iter().map(row_to_file).collect::<Result<Vec<_>>>()?;
        Ok((files, total))
    }
}

fn row_to_file(row: &sqlx::sqlite::SqliteRow) -> Result<UploadedFile> {
    Ok(UploadedFile {
        id: row.get("id"),
        filename: row.get("filename"),
        original_filename: row.try_get::<Option<String>, _>("original_filename")?,
        filepath: row.get("filepath"),
        file_size: row.try_get::<Option<i64>, _>("file_size")?,
        mime_type: row.try_get::<Option<String>, _>("mime_type")?,
        uploaded_by: row.try_get::<Option<i64>, _>("uploaded_by")?,
        uploaded_at: row.get("uploaded_at"),
    })
}

//! Blog post repository
//!
//! Database operations for blog posts. The UNIQUE constraint on `slug` is
//! the source of truth for slug uniqueness; `create` surfaces the raw
//! violation so the service layer can present a conflict.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use crate::models::BlogPost;

/// Blog post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post; fails with a unique violation on a duplicate slug
    async fn create(&self, post: &BlogPost) -> Result<BlogPost>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<BlogPost>>;

    /// Get post by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>>;

    /// Update a post (sets `updated_at`)
    async fn update(&self, post: &BlogPost) -> Result<BlogPost>;

    /// Delete a post
    async fn delete(&self, id: i64) -> Result<()>;

    /// List published, visible posts newest-first with pagination
    async fn list_published(&self, page: u32, per_page: u32) -> Result<(Vec<BlogPost>, i64)>;

    /// List all posts (drafts included) newest-first with pagination
    async fn list_all(&self, page: u32, per_page: u32) -> Result<(Vec<BlogPost>, i64)>;
}

/// SQLx-based blog post repository implementation
pub struct SqlxPostRepository {
    pool: SqlitePool,
}

impl SqlxPostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

fn offset(page: u32, per_page: u32) -> i64 {
    (page.max(1).saturating_sub(1) as i64) * per_page as i64
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &BlogPost) -> Result<BlogPost> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO blog_posts (title, slug, content, author_id, published_at, created_at, updated_at, visible)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content)
        .bind(post.author_id)
        .bind(post.published_at)
        .bind(now)
        .bind(now)
        .bind(post.visible)
        .execute(&self.pool)
        .await
        .context("Failed to create blog post")?;

        Ok(BlogPost {
            id: result.last_insert_rowid(),
            title: post.title.clone(),
            slug: post.slug.clone(),
            content: post.content.clone(),
            author_id: post.author_id,
            published_at: post.published_at,
            created_at: now,
            updated_at: now,
            visible: post.visible,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<BlogPost>> {
        let row = sqlx::query("SELECT * FROM blog_posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get post by ID")?;
        row.as_ref().map(row_to_post).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>> {
        let row = sqlx::query("SELECT * FROM blog_posts WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get post by slug")?;
        row.as_ref().map(row_to_post).transpose()
    }

    async fn update(&self, post: &BlogPost) -> Result<BlogPost> {
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE blog_posts
            SET title = ?, slug = ?, content = ?, published_at = ?, visible = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content)
        .bind(post.published_at)
        .bind(post.visible)
        .bind(now)
        .bind(post.id)
        .execute(&self.pool)
        .await
        .context("Failed to update blog post")?;

        self.get_by_id(post.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Blog post not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM blog_posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete blog post")?;
        Ok(())
    }

    async fn list_published(&self, page: u32, per_page: u32) -> Result<(Vec<BlogPost>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM blog_posts WHERE visible = 1 AND published_at IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count published posts")?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM blog_posts
            WHERE visible = 1 AND published_at IS NOT NULL
            ORDER BY published_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(per_page as i64)
        .bind(offset(page, per_page))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list published posts")?;

        let posts = rows.iter().map(row_to_post).collect::<Result<Vec<_>>>()?;
        Ok((posts, total))
    }

    async fn list_all(&self, page: u32, per_page: u32) -> Result<(Vec<BlogPost>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blog_posts")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count posts")?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM blog_posts
            ORDER BY updated_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(per_page as i64)
        .bind(offset(page, per_page))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list posts")?;

        let posts = rows.iter().map(row_to_post).collect::<Result<Vec<_>>>()?;
        Ok((posts, total))
    }
}

fn row_to_post(row: &sqlx::sqlite::SqliteRow) -> Result<BlogPost> {
    Ok(BlogPost {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        content: row.get("content"),
        author_id: row.try_get::<Option<i64>, _>("author_id")?,
        published_at: row.try_get::<Option<chrono::DateTime<Utc>>, _>("published_at")?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        visible: row.get("visible"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::is_unique_violation;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxPostRepository {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SqlxPostRepository::new(pool)
    }

    fn draft(title: &str, slug: &str) -> BlogPost {
        BlogPost::new(
            title.to_string(),
            slug.to_string(),
            "<p>content</p>".to_string(),
            None,
        )
    }

    #[tokio::test]
    async fn create_and_fetch_by_slug() {
        let repo = setup().await;
        let created = repo.create(&draft("First", "first")).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_slug("first").await.unwrap().unwrap();
        assert_eq!(found.title, "First");
        assert!(!found.visible);
        // NULL columns must come back as None, not zero values
        assert!(found.author_id.is_none());
        assert!(found.published_at.is_none());
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected_with_no_row_written() {
        let repo = setup().await;
        repo.create(&draft("One", "same-slug")).await.unwrap();

        let err = repo
            .create(&draft("Two", "same-slug"))
            .await
            .expect_err("duplicate slug must fail");
        assert!(is_unique_violation(&err));

        let (_, total) = repo.list_all(1, 10).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn published_listing_excludes_drafts_and_hidden() {
        let repo = setup().await;

        let mut published = draft("Published", "published");
        published.publish();
        repo.create(&published).await.unwrap();

        repo.create(&draft("Draft", "draft")).await.unwrap();

        // Unpublished after being published: timestamp set but not visible
        let mut hidden = draft("Hidden", "hidden");
        hidden.publish();
        hidden.unpublish();
        repo.create(&hidden).await.unwrap();

        let (posts, total) = repo.list_published(1, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].slug, "published");

        let (_, all_total) = repo.list_all(1, 10).await.unwrap();
        assert_eq!(all_total, 3);
    }

    #[tokio::test]
    async fn update_persists_publish_state() {
        let repo = setup().await;
        let mut post = repo.create(&draft("Lifecycle", "lifecycle")).await.unwrap();

        post.publish();
        let updated = repo.update(&post).await.unwrap();
        assert!(updated.is_published());
        let first_published = updated.published_at.unwrap();

        let mut reloaded = repo.get_by_id(post.id).await.unwrap().unwrap();
        reloaded.unpublish();
        let updated = repo.update(&reloaded).await.unwrap();
        assert!(!updated.is_published());
        assert_eq!(updated.published_at.unwrap(), first_published);
    }
}

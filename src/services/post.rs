//! Blog post service
//!
//! Sanitization happens here, on every write. Content stored by this
//! service is already clean HTML, so read paths serve it untouched.

use anyhow::{Context, Result};
use chrono::Utc;
use slug::slugify;
use std::sync::Arc;
use tracing::info;

use crate::db::repositories::{is_unique_violation, PostRepository};
use crate::models::BlogPost;
use crate::services::sanitizer::sanitize_html;

#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("a post with slug '{0}' already exists")]
    SlugExists(String),

    #[error("Post not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Fields accepted when creating or updating a post.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub title: String,
    /// Explicit slug; generated from the title when absent.
    pub slug: Option<String>,
    pub content: String,
}

pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
}

impl PostService {
    pub fn new(post_repo: Arc<dyn PostRepository>) -> Self {
        Self { post_repo }
    }

    /// Create a draft post.
    ///
    /// The slug pre-check gives a friendly error; the UNIQUE constraint
    /// is what actually prevents duplicates, so a race on insert still
    /// maps to `SlugExists` rather than a second row.
    pub async fn create_post(
        &self,
        input: PostInput,
        author_id: Option<i64>,
    ) -> Result<BlogPost, PostServiceError> {
        validate_title(&input.title)?;
        validate_content(&input.content)?;

        let slug = resolve_slug(&input)?;
        if self
            .post_repo
            .get_by_slug(&slug)
            .await
            .context("slug lookup failed")?
            .is_some()
        {
            return Err(PostServiceError::SlugExists(slug));
        }

        let content = sanitize_html(&input.content);
        let post = BlogPost::new(input.title, slug, content, author_id);

        match self.post_repo.create(&post).await {
            Ok(created) => {
                info!(slug = %created.slug, "created post");
                Ok(created)
            }
            Err(e) if is_unique_violation(&e) => Err(PostServiceError::SlugExists(post.slug)),
            Err(e) => Err(e.context("post insert failed").into()),
        }
    }

    /// Update a post's title, slug and content. Publish state is not
    /// touched here.
    pub async fn update_post(
        &self,
        id: i64,
        input: PostInput,
    ) -> Result<BlogPost, PostServiceError> {
        validate_title(&input.title)?;
        validate_content(&input.content)?;

        let mut post = self
            .post_repo
            .get_by_id(id)
            .await
            .context("post lookup failed")?
            .ok_or(PostServiceError::NotFound)?;

        let slug = resolve_slug(&input)?;
        if slug != post.slug
            && self
                .post_repo
                .get_by_slug(&slug)
                .await
                .context("slug lookup failed")?
                .is_some()
        {
            return Err(PostServiceError::SlugExists(slug));
        }

        post.title = input.title;
        post.slug = slug;
        post.content = sanitize_html(&input.content);
        post.updated_at = Utc::now();

        match self.post_repo.update(&post).await {
            Ok(updated) => Ok(updated),
            Err(e) if is_unique_violation(&e) => Err(PostServiceError::SlugExists(post.slug)),
            Err(e) => Err(e.context("post update failed").into()),
        }
    }

    /// Publish a post. The first publish stamps `published_at`; later
    /// publishes only flip visibility so the original date survives.
    pub async fn publish_post(&self, id: i64) -> Result<BlogPost, PostServiceError> {
        let mut post = self
            .post_repo
            .get_by_id(id)
            .await
            .context("post lookup failed")?
            .ok_or(PostServiceError::NotFound)?;

        post.publish();
        post.updated_at = Utc::now();
        let post = self
            .post_repo
            .update(&post)
            .await
            .context("publish update failed")?;
        info!(slug = %post.slug, "published post");
        Ok(post)
    }

    /// Hide a post from the public listing without losing its publication
    /// date.
    pub async fn unpublish_post(&self, id: i64) -> Result<BlogPost, PostServiceError> {
        let mut post = self
            .post_repo
            .get_by_id(id)
            .await
            .context("post lookup failed")?
            .ok_or(PostServiceError::NotFound)?;

        post.unpublish();
        post.updated_at = Utc::now();
        let post = self
            .post_repo
            .update(&post)
            .await
            .context("unpublish update failed")?;
        info!(slug = %post.slug, "unpublished post");
        Ok(post)
    }

    pub async fn delete_post(&self, id: i64) -> Result<(), PostServiceError> {
        let post = self
            .post_repo
            .get_by_id(id)
            .await
            .context("post lookup failed")?
            .ok_or(PostServiceError::NotFound)?;

        self.post_repo
            .delete(post.id)
            .await
            .context("post delete failed")?;
        info!(slug = %post.slug, "deleted post");
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<BlogPost>, PostServiceError> {
        Ok(self
            .post_repo
            .get_by_id(id)
            .await
            .context("post lookup failed")?)
    }

    /// Fetch a post by slug for public display. Drafts and hidden posts
    /// read as absent.
    pub async fn get_published_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<BlogPost>, PostServiceError> {
        let post = self
            .post_repo
            .get_by_slug(slug)
            .await
            .context("post lookup failed")?;
        Ok(post.filter(|p| p.is_published()))
    }

    pub async fn list_published(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<BlogPost>, i64), PostServiceError> {
        Ok(self
            .post_repo
            .list_published(page, per_page)
            .await
            .context("post listing failed")?)
    }

    /// Every post including drafts, for the editor dashboard.
    pub async fn list_all(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<BlogPost>, i64), PostServiceError> {
        Ok(self
            .post_repo
            .list_all(page, per_page)
            .await
            .context("post listing failed")?)
    }
}

fn resolve_slug(input: &PostInput) -> Result<String, PostServiceError> {
    let source = match &input.slug {
        Some(explicit) if !explicit.trim().is_empty() => explicit.as_str(),
        _ => input.title.as_str(),
    };
    let slug = slugify(source);
    if slug.is_empty() {
        return Err(PostServiceError::Validation(
            "slug cannot be empty".to_string(),
        ));
    }
    if slug.chars().count() > 200 {
        return Err(PostServiceError::Validation(
            "slug must be at most 200 characters".to_string(),
        ));
    }
    Ok(slug)
}

fn validate_title(title: &str) -> Result<(), PostServiceError> {
    let len = title.trim().chars().count();
    if !(5..=200).contains(&len) {
        return Err(PostServiceError::Validation(
            "title must be between 5 and 200 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), PostServiceError> {
    if content.trim().is_empty() {
        return Err(PostServiceError::Validation(
            "content is required".to_string(),
        ));
    }
    Ok(())
}

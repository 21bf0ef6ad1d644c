//! Blog post model
//!
//! Posts carry pre-sanitized HTML content; sanitization happens on every
//! write path (see `services::post`), never on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Blog post entity.
///
/// Lifecycle: created as a draft (`visible = false`, `published_at = None`).
/// `publish()` sets the publish timestamp once and makes the post visible;
/// `unpublish()` hides it again without touching the timestamp, so a
/// republished post keeps its original publish date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    /// Unique identifier
    pub id: i64,
    /// Post title
    pub title: String,
    /// URL-safe slug (globally unique)
    pub slug: String,
    /// Sanitized HTML content
    pub content: String,
    /// Author user ID
    pub author_id: Option<i64>,
    /// First-publish timestamp; never reset once set
    pub published_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Public visibility flag
    pub visible: bool,
}

impl BlogPost {
    /// Create a new draft post.
    pub fn new(title: String, slug: String, content: String, author_id: Option<i64>) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Set by the database
            title,
            slug,
            content,
            author_id,
            published_at: None,
            created_at: now,
            updated_at: now,
            visible: false,
        }
    }

    /// Publish the post.
    ///
    /// The publish timestamp is set only on the first publish; calling this
    /// on an already-published post is a no-op for the timestamp.
    pub fn publish(&mut self) {
        if self.published_at.is_none() {
            self.published_at = Some(Utc::now());
        }
        self.visible = true;
    }

    /// Hide the post from the public site.
    ///
    /// `published_at` is preserved so republishing keeps the original date.
    pub fn unpublish(&mut self) {
        self.visible = false;
    }

    /// A post is published iff it is visible and has a publish timestamp.
    pub fn is_published(&self) -> bool {
        self.visible && self.published_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> BlogPost {
        BlogPost::new(
            "Spring Garden Tips".to_string(),
            "spring-garden-tips".to_string(),
            "<p>Plant early.</p>".to_string(),
            Some(1),
        )
    }

    #[test]
    fn new_post_is_draft() {
        let post = draft();
        assert!(!post.visible);
        assert!(post.published_at.is_none());
        assert!(!post.is_published());
    }

    #[test]
    fn publish_sets_timestamp_once() {
        let mut post = draft();
        post.publish();
        let first = post.published_at.expect("publish sets timestamp");
        assert!(post.is_published());

        post.publish();
        assert_eq!(post.published_at, Some(first));
    }

    #[test]
    fn unpublish_preserves_publish_date() {
        let mut post = draft();
        post.publish();
        let first = post.published_at.unwrap();

        post.unpublish();
        assert!(!post.is_published());
        assert_eq!(post.published_at, Some(first));

        // Republishing keeps the original date
        post.publish();
        assert_eq!(post.published_at, Some(first));
        assert!(post.is_published());
    }

    #[test]
    fn visible_without_timestamp_is_not_published() {
        let mut post = draft();
        post.visible = true;
        assert!(!post.is_published());
    }
}

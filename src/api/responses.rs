//! Shared API response types
//!
//! Common response structures used across endpoints so list and detail
//! views stay consistent.

use serde::{Deserialize, Serialize};

use crate::models::{BlogPost, ContactSubmission, User};
use crate::services::create_excerpt;

/// Characters of plain text in a list-view excerpt.
const EXCERPT_LENGTH: usize = 200;

/// Full post response for detail endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub author_id: Option<i64>,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub visible: bool,
}

impl From<&BlogPost> for PostResponse {
    fn from(post: &BlogPost) -> Self {
        Self {
            id: post.id,
            slug: post.slug.clone(),
            title: post.title.clone(),
            content: post.content.clone(),
            author_id: post.author_id,
            published_at: post.published_at.map(|t| t.to_rfc3339()),
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
            visible: post.visible,
        }
    }
}

/// Post summary for list views, with a plain-text excerpt instead of the
/// full content
#[derive(Debug, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub published_at: Option<String>,
    pub visible: bool,
}

impl From<&BlogPost> for PostSummary {
    fn from(post: &BlogPost) -> Self {
        Self {
            id: post.id,
            slug: post.slug.clone(),
            title: post.title.clone(),
            excerpt: create_excerpt(&post.content, EXCERPT_LENGTH),
            published_at: post.published_at.map(|t| t.to_rfc3339()),
            visible: post.visible,
        }
    }
}

/// Paginated list envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

/// User response without credential fields
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.to_string(),
            created_at: user.created_at.to_rfc3339(),
            last_login: user.last_login.map(|t| t.to_rfc3339()),
        }
    }
}

/// Contact submission response for admin views
#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub submitted_at: String,
    pub status: String,
    pub notes: Option<String>,
}

impl From<&ContactSubmission> for ContactResponse {
    fn from(submission: &ContactSubmission) -> Self {
        Self {
            id: submission.id,
            name: submission.name.clone(),
            email: submission.email.clone(),
            phone: submission.phone.clone(),
            message: submission.message.clone(),
            submitted_at: submission.submitted_at.to_rfc3339(),
            status: submission.status.to_string(),
            notes: submission.notes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_carries_excerpt_not_content() {
        let post = BlogPost {
            content: format!("<p>{}</p>", "word ".repeat(100)),
            ..BlogPost::new(
                "A Title Here".to_string(),
                "a-title-here".to_string(),
                String::new(),
                None,
            )
        };
        let summary = PostSummary::from(&post);
        assert!(summary.excerpt.chars().count() <= EXCERPT_LENGTH + 3);
        assert!(!summary.excerpt.contains('<'));
    }

    #[test]
    fn user_response_has_no_password_hash() {
        let user = User::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "$argon2id$secret".to_string(),
            crate::models::UserRole::Editor,
        );
        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "editor");
    }
}

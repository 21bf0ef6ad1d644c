//! Blog post API endpoints
//!
//! Public read paths serve published posts only; the editor routes behind
//! `require_auth` see drafts too.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{PaginatedResponse, PostResponse, PostSummary};
use crate::services::post::PostInput;

const DEFAULT_PER_PAGE: u32 = 10;
const MAX_PER_PAGE: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListParams {
    fn normalize(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        (page, per_page)
    }
}

/// Request body for creating or updating a post
#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub title: String,
    pub slug: Option<String>,
    pub content: String,
}

impl From<PostRequest> for PostInput {
    fn from(body: PostRequest) -> Self {
        PostInput {
            title: body.title,
            slug: body.slug,
            content: body.content,
        }
    }
}

/// Public post routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_published))
        .route("/{slug}", get(get_published))
}

/// Editor post routes (behind `require_auth`)
pub fn editor_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all).post(create_post))
        .route("/{id}", put(update_post).delete(delete_post))
        .route("/{id}/publish", post(publish_post))
        .route("/{id}/unpublish", post(unpublish_post))
}

/// GET /api/v1/posts
async fn list_published(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<PostSummary>>, ApiError> {
    let (page, per_page) = params.normalize();
    let (posts, total) = state.post_service.list_published(page, per_page).await?;

    Ok(Json(PaginatedResponse {
        items: posts.iter().map(PostSummary::from).collect(),
        total,
        page,
        per_page,
    }))
}

/// GET /api/v1/posts/{slug}
///
/// Drafts and hidden posts answer 404 just like missing ones.
async fn get_published(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state
        .post_service
        .get_published_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    Ok(Json(PostResponse::from(&post)))
}

/// GET /api/v1/editor/posts
async fn list_all(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<PostSummary>>, ApiError> {
    let (page, per_page) = params.normalize();
    let (posts, total) = state.post_service.list_all(page, per_page).await?;

    Ok(Json(PaginatedResponse {
        items: posts.iter().map(PostSummary::from).collect(),
        total,
        page,
        per_page,
    }))
}

/// POST /api/v1/editor/posts
async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<PostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .post_service
        .create_post(body.into(), Some(user.0.id))
        .await?;
    Ok((StatusCode::CREATED, Json(PostResponse::from(&post))))
}

/// PUT /api/v1/editor/posts/{id}
async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.update_post(id, body.into()).await?;
    Ok(Json(PostResponse::from(&post)))
}

/// DELETE /api/v1/editor/posts/{id}
async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete_post(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/editor/posts/{id}/publish
async fn publish_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.publish_post(id).await?;
    Ok(Json(PostResponse::from(&post)))
}

/// POST /api/v1/editor/posts/{id}/unpublish
async fn unpublish_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.unpublish_post(id).await?;
    Ok(Json(PostResponse::from(&post)))
}

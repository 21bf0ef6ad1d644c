//! API layer - HTTP handlers and routing
//!
//! All HTTP endpoints live here, grouped by audience: public site and
//! blog reads, the session auth routes, editor content management and
//! admin triage/user management.

pub mod admin;
pub mod auth;
pub mod contact;
pub mod middleware;
pub mod posts;
pub mod responses;
pub mod site;
pub mod upload;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::warn;

pub use middleware::{ApiError, AppState};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/admin/contacts", contact::admin_router())
        .nest("/admin/users", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Editor routes (need auth but not admin)
    let editor_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/editor/posts", posts::editor_router())
        .nest("/editor/upload", upload::editor_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/site", site::router())
        .nest("/posts", posts::public_router())
        .nest("/contact", contact::public_router())
        .nest("/auth", auth::public_router())
        .merge(admin_routes)
        .merge(editor_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let cors_origin = state.config.server.cors_origin.clone();
    let upload_dir = state.config.upload.dir.clone();

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => warn!(origin = %cors_origin, "invalid cors_origin, cross-origin requests disabled"),
    }

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use std::sync::Arc;

    use crate::config::Config;
    use crate::db::repositories::{
        SqlxContactRepository, SqlxPostRepository, SqlxSessionRepository, SqlxUploadRepository,
        SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations::run_migrations};
    use crate::models::UserRole;
    use crate::services::{ContactService, Mailer, PostService, RateLimiter, UserService};

    async fn test_server() -> (TestServer, AppState) {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();

        let config = Config::default();
        let rate_limiter = Arc::new(RateLimiter::new());
        let user_service = Arc::new(UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            rate_limiter.clone(),
        ));
        let state = AppState {
            mailer: Arc::new(Mailer::new(config.mail.clone(), config.site.clone())),
            config: Arc::new(config),
            user_service,
            post_service: Arc::new(PostService::new(SqlxPostRepository::boxed(pool.clone()))),
            contact_service: Arc::new(ContactService::new(SqlxContactRepository::boxed(
                pool.clone(),
            ))),
            upload_repo: SqlxUploadRepository::boxed(pool),
            rate_limiter,
        };

        let server = TestServer::new(build_router(state.clone())).unwrap();
        (server, state)
    }

    async fn login_token(server: &TestServer, state: &AppState, role: UserRole) -> String {
        let username = match role {
            UserRole::Admin => "admin",
            UserRole::Editor => "editor",
        };
        state
            .user_service
            .create_user(
                username,
                &format!("{}@example.com", username),
                "password123",
                role,
            )
            .await
            .unwrap();

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({"username": username, "password": "password123"}))
            .await;
        response.json::<Value>()["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn site_info_is_public() {
        let (server, _) = test_server().await;
        let response = server.get("/api/v1/site").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["name"], "WebGarden");
    }

    #[tokio::test]
    async fn editor_routes_require_auth() {
        let (server, _) = test_server().await;
        let response = server
            .post("/api/v1/editor/posts")
            .json(&json!({"title": "No Token Here", "content": "<p>x</p>"}))
            .await;
        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn admin_routes_reject_editors() {
        let (server, state) = test_server().await;
        let token = login_token(&server, &state, UserRole::Editor).await;

        let response = server
            .get("/api/v1/admin/contacts")
            .authorization_bearer(&token)
            .await;
        response.assert_status_forbidden();
    }

    #[tokio::test]
    async fn post_lifecycle_over_http() {
        let (server, state) = test_server().await;
        let token = login_token(&server, &state, UserRole::Editor).await;

        // Drafts are invisible to the public
        let created = server
            .post("/api/v1/editor/posts")
            .authorization_bearer(&token)
            .json(&json!({"title": "Launch Announcement", "content": "<p>soon</p>"}))
            .await;
        created.assert_status(axum::http::StatusCode::CREATED);
        let post = created.json::<Value>();
        let id = post["id"].as_i64().unwrap();
        assert_eq!(post["slug"], "launch-announcement");

        let public = server.get("/api/v1/posts/launch-announcement").await;
        public.assert_status_not_found();

        // Publish, then it appears
        server
            .post(&format!("/api/v1/editor/posts/{}/publish", id))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        let public = server.get("/api/v1/posts/launch-announcement").await;
        public.assert_status_ok();
        assert_eq!(public.json::<Value>()["content"], "<p>soon</p>");

        let listing = server.get("/api/v1/posts").await.json::<Value>();
        assert_eq!(listing["total"], 1);

        // Duplicate slug conflicts
        let duplicate = server
            .post("/api/v1/editor/posts")
            .authorization_bearer(&token)
            .json(&json!({"title": "Launch Announcement", "content": "<p>again</p>"}))
            .await;
        duplicate.assert_status(axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn contact_flow_from_submission_to_triage() {
        let (server, state) = test_server().await;

        let submitted = server
            .post("/api/v1/contact")
            .json(&json!({
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "message": "I'd like to discuss a project with you."
            }))
            .await;
        submitted.assert_status(axum::http::StatusCode::CREATED);
        assert_eq!(submitted.json::<Value>()["success"], true);

        let token = login_token(&server, &state, UserRole::Admin).await;

        let listing = server
            .get("/api/v1/admin/contacts")
            .authorization_bearer(&token)
            .await
            .json::<Value>();
        assert_eq!(listing["total"], 1);
        let id = listing["items"][0]["id"].as_i64().unwrap();
        assert_eq!(listing["items"][0]["status"], "new");

        // Viewing marks it read
        let detail = server
            .get(&format!("/api/v1/admin/contacts/{}", id))
            .authorization_bearer(&token)
            .await;
        detail.assert_status_ok();
        assert_eq!(detail.json::<Value>()["status"], "read");

        let status = server
            .put(&format!("/api/v1/admin/contacts/{}/status", id))
            .authorization_bearer(&token)
            .json(&json!({"status": "responded"}))
            .await;
        status.assert_status_ok();
        assert_eq!(status.json::<Value>()["success"], true);
    }

    #[tokio::test]
    async fn invalid_contact_submission_is_rejected() {
        let (server, _) = test_server().await;
        let response = server
            .post("/api/v1/contact")
            .json(&json!({
                "name": "A",
                "email": "ada@example.com",
                "message": "Long enough message body."
            }))
            .await;
        response.assert_status_bad_request();
        assert_eq!(
            response.json::<Value>()["error"]["code"],
            "VALIDATION_ERROR"
        );
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let (server, state) = test_server().await;
        let token = login_token(&server, &state, UserRole::Editor).await;

        server
            .get("/api/v1/auth/me")
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        server
            .post("/api/v1/auth/logout")
            .authorization_bearer(&token)
            .await
            .assert_status(axum::http::StatusCode::NO_CONTENT);

        server
            .get("/api/v1/auth/me")
            .authorization_bearer(&token)
            .await
            .assert_status_unauthorized();
    }
}

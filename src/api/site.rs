//! Public site information API
//!
//! Static site identity for the frontend, straight from configuration.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::AppState;

/// Response for public site info
#[derive(Debug, Serialize)]
pub struct SiteInfoResponse {
    pub version: String,
    pub name: String,
    pub tagline: String,
    pub contact_email: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_site_info))
}

/// GET /api/v1/site
async fn get_site_info(State(state): State<AppState>) -> Json<SiteInfoResponse> {
    let site = &state.config.site;
    Json(SiteInfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: site.name.clone(),
        tagline: site.tagline.clone(),
        contact_email: site.admin_email.clone(),
    })
}

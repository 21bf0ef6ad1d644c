//! WebGarden - multi-tenant marketing/blog site backend
//!
//! Shared core reused by every deployed site: HTML sanitization, image
//! ingestion, content models, access control, and the JSON API.

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

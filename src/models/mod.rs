//! Data models
//!
//! Persisted entities shared across all WebGarden sites.

pub mod contact;
pub mod post;
pub mod session;
pub mod upload;
pub mod user;

pub use contact::{ContactStatus, ContactSubmission};
pub use post::BlogPost;
pub use session::Session;
pub use upload::UploadedFile;
pub use user::{User, UserRole};

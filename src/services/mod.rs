//! Services layer - Business logic
//!
//! Business rules live here, between the HTTP handlers and the
//! repositories. Services validate input, apply the content pipeline
//! (sanitization, image processing) and map storage errors into
//! domain errors.

pub mod contact;
pub mod email;
pub mod image;
pub mod password;
pub mod post;
pub mod rate_limiter;
pub mod sanitizer;
pub mod user;

pub use contact::{ContactInput, ContactService, ContactServiceError};
pub use email::{notify_contact_best_effort, Mailer};
pub use image::{delete_image, save_image, validate_upload, ImageError, SavedImage};
pub use password::{hash_password, verify_password};
pub use post::{PostInput, PostService, PostServiceError};
pub use rate_limiter::RateLimiter;
pub use sanitizer::{create_excerpt, sanitize_html, strip_html};
pub use user::{UserService, UserServiceError};

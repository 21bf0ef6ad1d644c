//! Configuration management
//!
//! Each deployed site runs one WebGarden binary with its own config file.
//! Configuration is loaded from a YAML file; secrets can be overridden by
//! environment variables. Missing optional values fall back to defaults so
//! a minimal config only needs the site section.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Site identity (name, tagline, notification address)
    #[serde(default)]
    pub site: SiteConfig,
    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
    /// Outgoing mail configuration
    #[serde(default)]
    pub mail: MailConfig,
}

impl Config {
    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// A missing file is not an error; defaults are used so a fresh checkout
    /// can start without any setup.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            tracing::warn!("Config file {:?} not found, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment variables take precedence over file values.
    ///
    /// Secrets (database URL, SMTP password) should come from the
    /// environment in production deployments.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("WEBGARDEN_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(dir) = std::env::var("WEBGARDEN_UPLOAD_DIR") {
            self.upload.dir = PathBuf::from(dir);
        }
        if let Ok(password) = std::env::var("WEBGARDEN_SMTP_PASSWORD") {
            self.mail.smtp_password = password;
        }
        if let Ok(username) = std::env::var("WEBGARDEN_SMTP_USERNAME") {
            self.mail.smtp_username = username;
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/webgarden.db".to_string()
}

/// Site identity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Display name of the site (e.g. "Keystone Therapy")
    #[serde(default = "default_site_name")]
    pub name: String,
    /// Short tagline shown by the frontend
    #[serde(default)]
    pub tagline: String,
    /// Address that receives contact-form notifications
    #[serde(default)]
    pub admin_email: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            tagline: String::new(),
            admin_email: String::new(),
        }
    }
}

fn default_site_name() -> String {
    "WebGarden".to_string()
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory where processed images are stored
    #[serde(default = "default_upload_dir")]
    pub dir: PathBuf,
    /// Maximum accepted upload size in megabytes
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_size_mb: default_max_size_mb(),
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("data/uploads")
}

fn default_max_size_mb() -> u64 {
    5
}

/// Outgoing mail configuration
///
/// When `enabled` is false the contact form still works; notification and
/// confirmation emails are simply skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Whether to send emails at all
    #[serde(default)]
    pub enabled: bool,
    /// SMTP relay host
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// SMTP port
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username
    #[serde(default)]
    pub smtp_username: String,
    /// SMTP password
    #[serde(default)]
    pub smtp_password: String,
    /// From address, e.g. "WebGarden <noreply@example.com>"
    #[serde(default)]
    pub from: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from: String::new(),
        }
    }
}

fn default_smtp_host() -> String {
    "smtp.mailgun.org".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

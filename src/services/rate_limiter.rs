//! Rate limiter for login attempts and contact submissions
//!
//! Protects against brute force and form spam by:
//! - Limiting failed login attempts per username (5 per 15 minutes)
//! - Limiting contact submissions per IP address (5 per hour)

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

const LOGIN_MAX_ATTEMPTS: usize = 5;
const LOGIN_WINDOW_MINUTES: i64 = 15;
const CONTACT_MAX_SUBMISSIONS: usize = 5;
const CONTACT_WINDOW_MINUTES: i64 = 60;

/// In-memory sliding-window rate limiter.
pub struct RateLimiter {
    /// Failed login attempts by username
    username_attempts: Arc<RwLock<HashMap<String, Vec<DateTime<Utc>>>>>,
    /// Contact submissions by IP address
    contact_submissions: Arc<RwLock<HashMap<IpAddr, Vec<DateTime<Utc>>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            username_attempts: Arc::new(RwLock::new(HashMap::new())),
            contact_submissions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check if a username has exhausted its failed-login budget.
    pub async fn is_login_limited(&self, username: &str) -> bool {
        let mut attempts = self.username_attempts.write().await;
        let cutoff = Utc::now() - Duration::minutes(LOGIN_WINDOW_MINUTES);

        let list = attempts.entry(username.to_lowercase()).or_default();
        list.retain(|time| *time > cutoff);
        list.len() >= LOGIN_MAX_ATTEMPTS
    }

    /// Record a failed login attempt for a username.
    pub async fn record_failed_login(&self, username: &str) {
        let mut attempts = self.username_attempts.write().await;
        attempts
            .entry(username.to_lowercase())
            .or_default()
            .push(Utc::now());
    }

    /// Clear failed attempts after a successful login.
    pub async fn clear_login_attempts(&self, username: &str) {
        let mut attempts = self.username_attempts.write().await;
        attempts.remove(&username.to_lowercase());
    }

    /// Check if an IP has exhausted its contact submission budget.
    pub async fn is_contact_limited(&self, ip: IpAddr) -> bool {
        let mut submissions = self.contact_submissions.write().await;
        let cutoff = Utc::now() - Duration::minutes(CONTACT_WINDOW_MINUTES);

        let list = submissions.entry(ip).or_default();
        list.retain(|time| *time > cutoff);
        list.len() >= CONTACT_MAX_SUBMISSIONS
    }

    /// Record a contact submission from an IP.
    pub async fn record_contact_submission(&self, ip: IpAddr) {
        let mut submissions = self.contact_submissions.write().await;
        submissions.entry(ip).or_default().push(Utc::now());
    }

    /// Drop expired entries. Called periodically from a background task.
    pub async fn cleanup(&self) {
        let login_cutoff = Utc::now() - Duration::minutes(LOGIN_WINDOW_MINUTES);
        let contact_cutoff = Utc::now() - Duration::minutes(CONTACT_WINDOW_MINUTES);

        {
            let mut attempts = self.username_attempts.write().await;
            attempts.retain(|_, times| {
                times.retain(|time| *time > login_cutoff);
                !times.is_empty()
            });
        }
        {
            let mut submissions = self.contact_submissions.write().await;
            submissions.retain(|_, times| {
                times.retain(|time| *time > contact_cutoff);
                !times.is_empty()
            });
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn login_limit_kicks_in_after_five_failures() {
        let limiter = RateLimiter::new();

        for _ in 0..4 {
            assert!(!limiter.is_login_limited("testuser").await);
            limiter.record_failed_login("testuser").await;
        }
        assert!(!limiter.is_login_limited("testuser").await);
        limiter.record_failed_login("testuser").await;

        assert!(limiter.is_login_limited("testuser").await);
    }

    #[tokio::test]
    async fn login_limit_is_case_insensitive() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            limiter.record_failed_login("Admin").await;
        }
        assert!(limiter.is_login_limited("admin").await);
    }

    #[tokio::test]
    async fn successful_login_clears_attempts() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            limiter.record_failed_login("testuser").await;
        }
        assert!(limiter.is_login_limited("testuser").await);

        limiter.clear_login_attempts("testuser").await;
        assert!(!limiter.is_login_limited("testuser").await);
    }

    #[tokio::test]
    async fn contact_limit_is_per_ip() {
        let limiter = RateLimiter::new();
        let first = IpAddr::from_str("10.0.0.1").unwrap();
        let second = IpAddr::from_str("10.0.0.2").unwrap();

        for _ in 0..5 {
            limiter.record_contact_submission(first).await;
        }
        assert!(limiter.is_contact_limited(first).await);
        assert!(!limiter.is_contact_limited(second).await);
    }

    #[tokio::test]
    async fn cleanup_removes_nothing_recent() {
        let limiter = RateLimiter::new();
        limiter.record_failed_login("testuser").await;
        limiter.cleanup().await;

        limiter.record_failed_login("testuser").await;
        let attempts = limiter.username_attempts.read().await;
        assert_eq!(attempts.get("testuser").unwrap().len(), 2);
    }
}

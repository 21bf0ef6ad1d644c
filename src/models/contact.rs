//! Contact submission model
//!
//! Inquiries from website visitors, created by the public contact form and
//! worked through by admins (new -> read -> responded).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Contact form submission entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactSubmission {
    /// Unique identifier
    pub id: i64,
    /// Visitor name
    pub name: String,
    /// Visitor email
    pub email: String,
    /// Optional phone number
    pub phone: Option<String>,
    /// Inquiry text
    pub message: String,
    /// Submission timestamp
    pub submitted_at: DateTime<Utc>,
    /// Workflow status
    pub status: ContactStatus,
    /// Free-form admin notes
    pub notes: Option<String>,
}

impl ContactSubmission {
    /// Create a new submission in the `new` state.
    pub fn new(name: String, email: String, phone: Option<String>, message: String) -> Self {
        Self {
            id: 0, // Set by the database
            name,
            email,
            phone,
            message,
            submitted_at: Utc::now(),
            status: ContactStatus::New,
            notes: None,
        }
    }

    /// Mark the submission as read.
    ///
    /// Only fires from `new`; a submission already read or responded is
    /// left unchanged.
    pub fn mark_as_read(&mut self) {
        if self.status == ContactStatus::New {
            self.status = ContactStatus::Read;
        }
    }

    /// Mark the submission as responded. Always forces the state.
    pub fn mark_as_responded(&mut self) {
        self.status = ContactStatus::Responded;
    }
}

/// Contact submission workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    /// Unseen submission
    #[default]
    New,
    /// Seen but not yet answered
    Read,
    /// Answered
    Responded,
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactStatus::New => write!(f, "new"),
            ContactStatus::Read => write!(f, "read"),
            ContactStatus::Responded => write!(f, "responded"),
        }
    }
}

impl FromStr for ContactStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(ContactStatus::New),
            "read" => Ok(ContactStatus::Read),
            "responded" => Ok(ContactStatus::Responded),
            other => Err(format!("Unknown contact status: {}", other)),
        }
    }
}

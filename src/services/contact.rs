//! Contact submission service
//!
//! Validates visitor submissions and manages the admin triage workflow.
//! Submissions are stored before any notification email is attempted, so
//! mail trouble never loses a message.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::db::repositories::ContactRepository;
use crate::models::{ContactStatus, ContactSubmission};
use crate::services::user::is_valid_email;

#[derive(Debug, thiserror::Error)]
pub enum ContactServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("Submission not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Fields accepted from the public contact form.
#[derive(Debug, Clone, Default)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}

pub struct ContactService {
    contact_repo: Arc<dyn ContactRepository>,
}

impl ContactService {
    pub fn new(contact_repo: Arc<dyn ContactRepository>) -> Self {
        Self { contact_repo }
    }

    /// Store a new visitor submission.
    pub async fn submit(&self, input: ContactInput) -> Result<ContactSubmission, ContactServiceError> {
        let input = validate_submission(input)?;

        let submission = ContactSubmission::new(input.name, input.email, input.phone, input.message);
        let submission = self
            .contact_repo
            .create(&submission)
            .await
            .context("submission insert failed")?;

        info!(id = submission.id, "stored contact submission");
        Ok(submission)
    }

    /// Fetch a submission for the admin detail view, flipping `new` to
    /// `read` as a side effect.
    pub async fn get_and_mark_read(
        &self,
        id: i64,
    ) -> Result<ContactSubmission, ContactServiceError> {
        let mut submission = self
            .contact_repo
            .get_by_id(id)
            .await
            .context("submission lookup failed")?
            .ok_or(ContactServiceError::NotFound)?;

        if submission.status == ContactStatus::New {
            submission.mark_as_read();
            submission = self
                .contact_repo
                .update(&submission)
                .await
                .context("status update failed")?;
        }
        Ok(submission)
    }

    /// Assign any status directly. Unlike the model transitions this is
    /// unconditional, so an admin can move a submission backwards.
    pub async fn set_status(
        &self,
        id: i64,
        status: ContactStatus,
    ) -> Result<ContactSubmission, ContactServiceError> {
        let mut submission = self
            .contact_repo
            .get_by_id(id)
            .await
            .context("submission lookup failed")?
            .ok_or(ContactServiceError::NotFound)?;

        submission.status = status;
        let submission = self
            .contact_repo
            .update(&submission)
            .await
            .context("status update failed")?;
        Ok(submission)
    }

    /// Replace the admin notes on a submission.
    pub async fn set_notes(
        &self,
        id: i64,
        notes: Option<String>,
    ) -> Result<ContactSubmission, ContactServiceError> {
        let mut submission = self
            .contact_repo
            .get_by_id(id)
            .await
            .context("submission lookup failed")?
            .ok_or(ContactServiceError::NotFound)?;

        submission.notes = notes;
        let submission = self
            .contact_repo
            .update(&submission)
            .await
            .context("notes update failed")?;
        Ok(submission)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContactServiceError> {
        self.contact_repo
            .get_by_id(id)
            .await
            .context("submission lookup failed")?
            .ok_or(ContactServiceError::NotFound)?;
        self.contact_repo
            .delete(id)
            .await
            .context("submission delete failed")?;
        Ok(())
    }

    pub async fn list(
        &self,
        status: Option<ContactStatus>,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<ContactSubmission>, i64), ContactServiceError> {
        Ok(self
            .contact_repo
            .list(status, page, per_page)
            .await
            .context("submission listing failed")?)
    }
}

fn validate_submission(mut input: ContactInput) -> Result<ContactInput, ContactServiceError> {
    input.name = input.name.trim().to_string();
    input.email = input.email.trim().to_string();
    input.message = input.message.trim().to_string();
    input.phone = input
        .phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());

    let name_len = input.name.chars().count();
    if !(2..=100).contains(&name_len) {
        return Err(ContactServiceError::Validation(
            "name must be between 2 and 100 characters".to_string(),
        ));
    }
    if input.email.chars().count() > 120 || !is_valid_email(&input.email) {
        return Err(ContactServiceError::Validation(
            "please enter a valid email address".to_string(),
        ));
    }
    if let Some(phone) = &input.phone {
        if phone.chars().count() > 20 {
            return Err(ContactServiceError::Validation(
                "phone number too long".to_string(),
            ));
        }
    }
    let message_len = input.message.chars().count();
    if !(10..=5000).contains(&message_len) {
        return Err(ContactServiceError::Validation(
            "message must be between 10 and 5000 characters".to_string(),
        ));
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::contact::SqlxContactRepository;
    use crate::db::{create_test_pool, migrations::run_migrations};

    async fn setup() -> ContactService {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        ContactService::new(SqlxContactRepository::boxed(pool))
    }

    fn valid_input() -> ContactInput {
        ContactInput {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: Some("+1 555 0100".to_string()),
            message: "I would like to ask about your services.".to_string(),
        }
    }

    #[tokio::test]
    async fn submit_stores_as_new() {
        let service = setup().await;
        let submission = service.submit(valid_input()).await.unwrap();
        assert_eq!(submission.status, ContactStatus::New);
        assert_eq!(submission.name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn message_length_bounds_are_enforced() {
        let service = setup().await;

        let mut too_short = valid_input();
        too_short.message = "123456789".to_string();
        assert!(matches!(
            service.submit(too_short).await.unwrap_err(),
            ContactServiceError::Validation(_)
        ));

        let mut exactly_max = valid_input();
        exactly_max.message = "m".repeat(5000);
        assert!(service.submit(exactly_max).await.is_ok());

        let mut too_long = valid_input();
        too_long.message = "m".repeat(5001);
        assert!(matches!(
            service.submit(too_long).await.unwrap_err(),
            ContactServiceError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn invalid_email_is_rejected() {
        let service = setup().await;
        let mut input = valid_input();
        input.email = "not-an-email".to_string();
        assert!(matches!(
            service.submit(input).await.unwrap_err(),
            ContactServiceError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn blank_phone_is_stored_as_none() {
        let service = setup().await;
        let mut input = valid_input();
        input.phone = Some("   ".to_string());
        let submission = service.submit(input).await.unwrap();
        assert!(submission.phone.is_none());
    }

    #[tokio::test]
    async fn admin_view_marks_new_as_read() {
        let service = setup().await;
        let submission = service.submit(valid_input()).await.unwrap();

        let viewed = service.get_and_mark_read(submission.id).await.unwrap();
        assert_eq!(viewed.status, ContactStatus::Read);

        // A second view does not change anything further
        let again = service.get_and_mark_read(submission.id).await.unwrap();
        assert_eq!(again.status, ContactStatus::Read);
    }

    #[tokio::test]
    async fn status_can_be_reassigned_backwards() {
        let service = setup().await;
        let submission = service.submit(valid_input()).await.unwrap();

        service
            .set_status(submission.id, ContactStatus::Responded)
            .await
            .unwrap();
        let reverted = service
            .set_status(submission.id, ContactStatus::New)
            .await
            .unwrap();
        assert_eq!(reverted.status, ContactStatus::New);
    }

    #[tokio::test]
    async fn notes_round_trip() {
        let service = setup().await;
        let submission = service.submit(valid_input()).await.unwrap();

        let noted = service
            .set_notes(submission.id, Some("called back on Monday".to_string()))
            .await
            .unwrap();
        assert_eq!(noted.notes.as_deref(), Some("called back on Monday"));

        let cleared = service.set_notes(submission.id, None).await.unwrap();
        assert!(cleared.notes.is_none());
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let service = setup().await;
        let first = service.submit(valid_input()).await.unwrap();
        service.submit(valid_input()).await.unwrap();
        service
            .set_status(first.id, ContactStatus::Responded)
            .await
            .unwrap();

        let (new_only, total) = service
            .list(Some(ContactStatus::New), 1, 10)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert!(new_only.iter().all(|s| s.status == ContactStatus::New));
    }

    #[tokio::test]
    async fn missing_submission_is_not_found() {
        let service = setup().await;
        assert!(matches!(
            service.get_and_mark_read(999).await.unwrap_err(),
            ContactServiceError::NotFound
        ));
    }
}

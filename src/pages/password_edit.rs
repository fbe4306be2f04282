use std::sync::Arc;

use amumal_client::{detail, ForumClient, PasswordUpdateRequest, SubmitOutcome};
use amumal_core::{
    FieldError, FieldStatus, FormGate, PasswordStrength, Required, SessionRecord, ValidationField,
};

use crate::pages::{Route, SubmitResult};
use crate::session::{require_session, SessionStore};

const WRONG_CURRENT_PASSWORD: &str = "Current password is incorrect.";

pub struct PasswordEditPage {
    client: ForumClient,
    session: SessionRecord,
    pub current: Arc<ValidationField>,
    pub new_password: Arc<ValidationField>,
    pub confirm: Arc<ValidationField>,
    gate: FormGate,
}

impl PasswordEditPage {
    pub fn mount(client: ForumClient, store: Arc<dyn SessionStore>) -> Result<Self, Route> {
        let session = require_session(store.as_ref())?;

        let current = Arc::new(ValidationField::new("current_password", Required));
        let new_password = Arc::new(ValidationField::new("new_password", PasswordStrength));
        let confirm = ValidationField::confirming("password_confirm", &new_password);
        let gate = FormGate::new([current.clone(), new_password.clone(), confirm.clone()]);

        Ok(Self {
            client,
            session,
            current,
            new_password,
            confirm,
            gate,
        })
    }

    pub fn gate(&self) -> &FormGate {
        &self.gate
    }

    /// Commit the new password and re-evaluate its confirmation.
    pub async fn commit_new_password(&self) -> FieldStatus {
        let status = self.new_password.commit().await;
        self.confirm.commit().await;
        status
    }

    pub async fn submit(&self) -> SubmitResult {
        if !self.gate.can_submit() {
            return SubmitResult::Blocked;
        }

        let request = PasswordUpdateRequest {
            current_password: self.current.value(),
            new_password: self.new_password.value(),
        };

        match self
            .client
            .update_password(self.session.user_id, &request)
            .await
        {
            Ok(SubmitOutcome::Succeeded(())) => {
                tracing::info!(user_id = self.session.user_id, "password changed");
                SubmitResult::Done {
                    next: Route::Posts,
                    notice: Some("Password changed."),
                }
            }
            Ok(outcome) if outcome.failed_with(400, detail::INVALID_PASSWORD) => {
                self.current
                    .reject(FieldError::Rejected(WRONG_CURRENT_PASSWORD.to_string()));
                SubmitResult::Failed(WRONG_CURRENT_PASSWORD)
            }
            Ok(SubmitOutcome::Failed { status, detail }) => {
                tracing::debug!(status, ?detail, "password update rejected");
                SubmitResult::Failed("Failed to change the password.")
            }
            Err(e) => {
                tracing::warn!(error = %e, "password update request failed");
                SubmitResult::Failed("An error occurred while changing the password.")
            }
        }
    }
}

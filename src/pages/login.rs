use std::sync::Arc;

use amumal_client::{ForumClient, LoginRequest, SubmitOutcome};
use amumal_core::{EmailFormat, FormGate, PasswordStrength, SessionRecord, ValidationField};

use crate::pages::{Route, SubmitResult};
use crate::session::SessionStore;

const LOGIN_FAILED: &str = "Please check your email or password.";

pub struct LoginPage {
    client: ForumClient,
    store: Arc<dyn SessionStore>,
    pub email: Arc<ValidationField>,
    pub password: Arc<ValidationField>,
    gate: FormGate,
}

impl LoginPage {
    pub fn new(client: ForumClient, store: Arc<dyn SessionStore>) -> Self {
        let email = Arc::new(ValidationField::new("email", EmailFormat));
        let password = Arc::new(ValidationField::new("password", PasswordStrength));
        let gate = FormGate::new([email.clone(), password.clone()]);
        Self {
            client,
            store,
            email,
            password,
            gate,
        }
    }

    pub fn gate(&self) -> &FormGate {
        &self.gate
    }

    /// Log in and remember the session.
    pub async fn submit(&self) -> SubmitResult {
        if !self.gate.can_submit() {
            return SubmitResult::Blocked;
        }

        let request = LoginRequest {
            email: self.email.normalized_value(),
            password: self.password.value(),
        };

        match self.client.login(&request).await {
            Ok(SubmitOutcome::Succeeded(data)) => {
                let record = SessionRecord {
                    user_id: data.user_id,
                    nickname: data.profile_nickname,
                    profile_image: data.profile_img_url,
                    email: request.email,
                };
                if let Err(e) = self.store.save(&record) {
                    tracing::error!(error = %e, "failed to save session");
                    return SubmitResult::Failed(LOGIN_FAILED);
                }
                tracing::info!(user_id = record.user_id, "logged in");
                SubmitResult::Done {
                    next: Route::Posts,
                    notice: None,
                }
            }
            Ok(SubmitOutcome::Failed { status, detail }) => {
                tracing::debug!(status, ?detail, "login rejected");
                SubmitResult::Failed(LOGIN_FAILED)
            }
            Err(e) => {
                tracing::warn!(error = %e, "login request failed");
                SubmitResult::Failed(LOGIN_FAILED)
            }
        }
    }

    pub fn go_signup(&self) -> Route {
        Route::Signup
    }
}

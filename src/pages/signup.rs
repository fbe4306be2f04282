use std::sync::{Arc, Mutex, PoisonError};

use amumal_client::{
    redacted, EmailAvailability, ForumClient, NicknameAvailability, SignupRequest, SubmitOutcome,
};
use amumal_core::{
    EmailFormat, FieldStatus, FormGate, NicknameFormat, PasswordStrength, ValidationField,
};

use crate::pages::{Route, SubmitResult};

pub struct SignupPage {
    client: ForumClient,
    pub email: Arc<ValidationField>,
    pub password: Arc<ValidationField>,
    pub password_confirm: Arc<ValidationField>,
    pub nickname: Arc<ValidationField>,
    profile_image: Mutex<Option<String>>,
    gate: FormGate,
}

impl SignupPage {
    pub fn new(client: ForumClient) -> Self {
        let email = Arc::new(ValidationField::with_checker(
            "email",
            EmailFormat,
            Arc::new(EmailAvailability(client.clone())),
        ));
        let password = Arc::new(ValidationField::new("password", PasswordStrength));
        let password_confirm = ValidationField::confirming("password_confirm", &password);
        let nickname = Arc::new(ValidationField::with_checker(
            "nickname",
            NicknameFormat,
            Arc::new(NicknameAvailability(client.clone())),
        ));
        let gate = FormGate::new([
            email.clone(),
            password.clone(),
            password_confirm.clone(),
            nickname.clone(),
        ]);

        Self {
            client,
            email,
            password,
            password_confirm,
            nickname,
            profile_image: Mutex::new(None),
            gate,
        }
    }

    pub fn gate(&self) -> &FormGate {
        &self.gate
    }

    /// Commit the password and re-evaluate its confirmation.
    pub async fn commit_password(&self) -> FieldStatus {
        let status = self.password.commit().await;
        self.password_confirm.commit().await;
        status
    }

    /// Path of an already uploaded profile image, or `None` to remove it.
    pub fn set_profile_image(&self, path: Option<String>) {
        *self
            .profile_image
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = path;
    }

    pub fn profile_image(&self) -> Option<String> {
        self.profile_image
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn submit(&self) -> SubmitResult {
        if !self.gate.can_submit() {
            return SubmitResult::Blocked;
        }

        let request = SignupRequest {
            email: self.email.normalized_value(),
            password: self.password.value(),
            nickname: self.nickname.normalized_value(),
            profile_image: self.profile_image(),
        };
        tracing::debug!(body = %redacted(&request), "submitting signup");

        match self.client.signup(&request).await {
            Ok(SubmitOutcome::Succeeded(())) => {
                tracing::info!(email = %request.email, "account created");
                SubmitResult::Done {
                    next: Route::Login,
                    notice: Some("Sign-up complete."),
                }
            }
            Ok(SubmitOutcome::Failed { status, detail }) => {
                tracing::debug!(status, ?detail, "signup rejected");
                SubmitResult::Failed("Sign-up failed. Please check your input.")
            }
            Err(e) => {
                tracing::warn!(error = %e, "signup request failed");
                SubmitResult::Failed("An error occurred during sign-up.")
            }
        }
    }

    pub fn go_login(&self) -> Route {
        Route::Login
    }
}

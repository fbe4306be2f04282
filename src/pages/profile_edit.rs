use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use amumal_client::{ForumClient, NicknameAvailability, ProfileUpdateRequest, SubmitOutcome};
use amumal_core::{
    FieldValidator, FormGate, NicknameFormat, SessionRecord, ValidationField,
};

use crate::pages::{Route, SubmitResult};
use crate::session::{require_session, SessionStore};

/// Edit nickname and profile image, or delete the account.
pub struct ProfileEditPage {
    client: ForumClient,
    store: Arc<dyn SessionStore>,
    session: Mutex<SessionRecord>,
    pub nickname: Arc<ValidationField>,
    profile_image: Mutex<Option<String>>,
    gate: FormGate,
}

impl ProfileEditPage {
    /// Mount for the logged-in user, or redirect to login.
    pub fn mount(client: ForumClient, store: Arc<dyn SessionStore>) -> Result<Self, Route> {
        let session = require_session(store.as_ref())?;

        let nickname = ValidationField::with_checker(
            "nickname",
            NicknameFormat,
            Arc::new(NicknameAvailability(client.clone())),
        );
        // The current nickname is ours already; only prefill it when it is usable.
        let nickname = if NicknameFormat.validate(&session.nickname).is_ok() {
            nickname.with_known_good(session.nickname.clone())
        } else {
            nickname
        };
        let nickname = Arc::new(nickname);
        let gate = FormGate::new([nickname.clone()]);

        Ok(Self {
            client,
            store,
            profile_image: Mutex::new(session.profile_image.clone()),
            session: Mutex::new(session),
            nickname,
            gate,
        })
    }

    pub fn gate(&self) -> &FormGate {
        &self.gate
    }

    /// Read-only email shown on the page.
    pub fn email(&self) -> String {
        self.session().email.clone()
    }

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

        let user_id = self.session().user_id;
        let request = ProfileUpdateRequest {
            nickname: self.nickname.normalized_value(),
            profile_image: self.profile_image(),
        };

        match self.client.update_profile(user_id, &request).await {
            Ok(SubmitOutcome::Succeeded(data)) => {
                let updated = {
                    let mut session = self.session();
                    session.nickname = data.nickname;
                    session.profile_image = data.profile_image;
                    session.clone()
                };
                if let Err(e) = self.store.save(&updated) {
                    tracing::error!(error = %e, "failed to save session");
                }
                self.nickname.set_known_good(Some(updated.nickname.clone()));
                tracing::info!(user_id, nickname = %updated.nickname, "profile updated");
                SubmitResult::Done {
                    next: Route::Posts,
                    notice: Some("Profile updated."),
                }
            }
            Ok(SubmitOutcome::Failed { status, detail }) => {
                tracing::debug!(status, ?detail, "profile update rejected");
                SubmitResult::Failed("Failed to update your profile.")
            }
            Err(e) => {
                tracing::warn!(error = %e, "profile update request failed");
                SubmitResult::Failed("An error occurred while updating your profile.")
            }
        }
    }

    /// Delete the account after the user confirmed it.
    pub async fn delete_account(&self) -> SubmitResult {
        let user_id = self.session().user_id;
        match self.client.delete_account(user_id).await {
            Ok(SubmitOutcome::Succeeded(())) => {
                if let Err(e) = self.store.clear() {
                    tracing::error!(error = %e, "failed to clear session");
                }
                tracing::info!(user_id, "account deleted");
                SubmitResult::Done {
                    next: Route::Login,
                    notice: None,
                }
            }
            Ok(SubmitOutcome::Failed { status, detail }) => {
                tracing::debug!(status, ?detail, "account deletion rejected");
                SubmitResult::Failed("Failed to delete your account.")
            }
            Err(e) => {
                tracing::warn!(error = %e, "account deletion request failed");
                SubmitResult::Failed("An error occurred while deleting your account.")
            }
        }
    }

    fn session(&self) -> MutexGuard<'_, SessionRecord> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

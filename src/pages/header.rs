use std::str::FromStr;
use std::sync::Arc;

use amumal_client::{ForumClient, SubmitOutcome};
use amumal_core::SessionRecord;

use crate::pages::Route;
use crate::session::SessionStore;

/// Entries of the header profile menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAction {
    EditProfile,
    EditPassword,
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown header action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for HeaderAction {
    type Err = UnknownAction;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "edit-profile" => Ok(HeaderAction::EditProfile),
            "edit-password" => Ok(HeaderAction::EditPassword),
            "logout" => Ok(HeaderAction::Logout),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// What the header shows for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Avatar {
    Image(String),
    Initial(String),
}

pub struct HeaderMenu {
    client: ForumClient,
    store: Arc<dyn SessionStore>,
    session: SessionRecord,
}

impl HeaderMenu {
    pub fn new(client: ForumClient, store: Arc<dyn SessionStore>, session: SessionRecord) -> Self {
        Self {
            client,
            store,
            session,
        }
    }

    pub fn avatar(&self) -> Avatar {
        match &self.session.profile_image {
            Some(url) if !url.is_empty() => Avatar::Image(url.clone()),
            _ => Avatar::Initial(self.session.initial()),
        }
    }

    pub async fn dispatch(&self, action: HeaderAction) -> Route {
        match action {
            HeaderAction::EditProfile => Route::ProfileEdit,
            HeaderAction::EditPassword => Route::PasswordEdit,
            HeaderAction::Logout => self.logout().await,
        }
    }

    /// Ends the server session when possible; the local session is cleared
    /// either way.
    async fn logout(&self) -> Route {
        let user_id = self.session.user_id;
        match self.client.logout(user_id).await {
            Ok(SubmitOutcome::Succeeded(())) => tracing::info!(user_id, "logged out"),
            Ok(SubmitOutcome::Failed { status, detail }) => {
                tracing::warn!(user_id, status, ?detail, "server logout rejected")
            }
            Err(e) => tracing::warn!(user_id, error = %e, "server logout failed"),
        }
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "failed to clear session");
        }
        Route::Login
    }
}

use serde::{Deserialize, Serialize};

use amumal_core::PostSummary;

/// Success tags the server puts in `detail`.
pub mod detail {
    pub const LOGIN_SUCCESS: &str = "login_success";
    pub const REGISTER_SUCCESS: &str = "register_success";
    pub const PROFILE_UPDATE_SUCCESS: &str = "profile_update_success";
    pub const PASSWORD_UPDATE_SUCCESS: &str = "password_update_success";
    pub const LOGOUT_SUCCESS: &str = "logout_success";
    pub const USER_DELETE_SUCCESS: &str = "user_delete_success";
    /// Wrong current password on a password update.
    pub const INVALID_PASSWORD: &str = "invalid_password";
}

/// Every response body: a discriminant plus an optional payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub detail: Option<String>,
    pub data: Option<T>,
}

/// Payload of the email/nickname availability endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckData {
    #[serde(default)]
    pub possible: bool,
}

/// Payload of the post listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PostListData {
    pub post_list: Vec<PostSummary>,
    #[serde(default)]
    pub next_cursor: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginData {
    pub user_id: u64,
    pub profile_nickname: String,
    #[serde(default)]
    pub profile_img_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub nickname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdateRequest {
    pub nickname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProfileData {
    pub nickname: String,
    #[serde(default)]
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordUpdateRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Result of a submit action that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome<T> {
    Succeeded(T),
    /// Wrong status or discriminant; one uniform failure per action.
    Failed { status: u16, detail: Option<String> },
}

impl<T> SubmitOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Succeeded(_))
    }

    /// True for a failure with the given status and discriminant.
    pub fn failed_with(&self, status: u16, tag: &str) -> bool {
        match self {
            SubmitOutcome::Failed {
                status: s,
                detail: Some(d),
            } => *s == status && d == tag,
            _ => false,
        }
    }
}

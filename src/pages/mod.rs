//! Per-mount page controllers.
//!
//! Each page owns its fields, its gate and any loader, and is dropped when
//! the view leaves the page. The view reads derived state and issues
//! commands; it never mutates page state directly.

pub mod header;
pub mod login;
pub mod password_edit;
pub mod posts;
pub mod profile_edit;
pub mod signup;

pub use header::{Avatar, HeaderAction, HeaderMenu, UnknownAction};
pub use login::LoginPage;
pub use password_edit::PasswordEditPage;
pub use posts::PostsPage;
pub use profile_edit::ProfileEditPage;
pub use signup::SignupPage;

/// Pages the view can be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Signup,
    Posts,
    PostDetail(u64),
    PostWrite,
    ProfileEdit,
    PasswordEdit,
}

/// Result of a submit action as the view sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitResult {
    /// The gate was closed; nothing was sent.
    Blocked,
    /// The action succeeded; show `notice` if any and go to `next`.
    Done {
        next: Route,
        notice: Option<&'static str>,
    },
    /// The action failed; page state is unchanged apart from field
    /// overrides the server asked for.
    Failed(&'static str),
}

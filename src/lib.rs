pub mod config;
pub mod pages;
pub mod session;

pub use config::{Config, ConfigError};
pub use pages::{
    Avatar, HeaderAction, HeaderMenu, LoginPage, PasswordEditPage, PostsPage, ProfileEditPage,
    Route, SignupPage, SubmitResult,
};
pub use session::{
    require_session, FileSessionStore, MemorySessionStore, SessionError, SessionStore,
};

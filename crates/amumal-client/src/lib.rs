//! Amumal Client - HTTP access to the forum backend.
//!
//! Implements the core's [`AvailabilityChecker`](amumal_core::AvailabilityChecker)
//! and [`PageSource`](amumal_core::PageSource) seams, plus the account
//! actions each page submits.

pub mod http;
pub mod protocol;

pub use http::{
    redacted, ClientError, EmailAvailability, ForumClient, NicknameAvailability, PostFeed,
};
pub use protocol::{
    detail, LoginData, LoginRequest, PasswordUpdateRequest, ProfileData, ProfileUpdateRequest,
    SignupRequest, SubmitOutcome,
};

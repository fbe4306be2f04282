//! Amumal Core - Field validation, submission gating and cursor pagination.
//!
//! This crate holds the client-side logic shared by every page of the
//! forum client. It performs no I/O itself: availability checks and page
//! fetches go through the [`AvailabilityChecker`] and [`PageSource`] seams.

pub mod error;
pub mod field;
pub mod gate;
pub mod pagination;
pub mod post;
pub mod session;
pub mod validation;

// Re-exports for convenience
pub use error::{CheckError, FetchError, FieldError};
pub use field::{
    AvailabilityChecker, CheckOutcome, FieldObserver, FieldStatus, ValidationField, Verdict,
};
pub use gate::FormGate;
pub use pagination::{
    should_load_more, CursorPaginationLoader, Exhaustion, LoadOutcome, LoaderPhase, LoaderStatus,
    Page, PageSource, ScrollMetrics, SkipReason, SCROLL_THRESHOLD,
};
pub use post::{format_count, truncate_title, Count, PostSummary};
pub use session::SessionRecord;
pub use validation::{EmailFormat, FieldValidator, NicknameFormat, PasswordStrength, Required};

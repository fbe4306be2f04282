use thiserror::Error;

/// Reason a field failed validation. The `Display` text is what the view
/// layer shows next to the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Please enter a valid email address.")]
    InvalidEmail,

    #[error("Please enter a password.")]
    EmptyPassword,

    #[error(
        "Password must be 8 to 20 characters and include an uppercase letter, \
         a lowercase letter, a digit and a special character."
    )]
    WeakPassword,

    #[error("Please enter a nickname.")]
    EmptyNickname,

    #[error("Nickname must be at most 10 characters with no spaces.")]
    InvalidNickname,

    #[error("Passwords do not match.")]
    PasswordMismatch,

    #[error("This field is required.")]
    Required,

    /// Server-side override of a value that passed the local rule.
    #[error("{0}")]
    Rejected(String),
}

/// Failure of an availability check that is not an answer about the value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("Availability check transport error: {0}")]
    Transport(String),

    #[error("Availability check returned HTTP {0}")]
    Status(u16),

    #[error("Availability check response could not be decoded: {0}")]
    Decode(String),
}

/// Failure to fetch a page of items.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Page fetch transport error: {0}")]
    Transport(String),

    #[error("Page fetch returned HTTP {0}")]
    Status(u16),

    #[error("Page response could not be decoded: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_shows_server_reason() {
        let err = FieldError::Rejected("Current password is incorrect.".to_string());
        assert_eq!(err.to_string(), "Current password is incorrect.");
    }

    #[test]
    fn test_fetch_error_status_display() {
        assert_eq!(
            FetchError::Status(500).to_string(),
            "Page fetch returned HTTP 500"
        );
    }
}

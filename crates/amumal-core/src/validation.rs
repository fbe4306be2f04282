use crate::error::FieldError;

/// Synchronous format rule for one kind of input.
pub trait FieldValidator: Send + Sync {
    /// Check an already-normalized value.
    fn validate(&self, value: &str) -> Result<(), FieldError>;

    /// Canonical form of the raw input that is validated, checked and submitted.
    fn normalize<'a>(&self, raw: &'a str) -> &'a str {
        raw
    }
}

/// `local@domain.tld` shape with no embedded whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailFormat;

/// 8 to 20 characters with lowercase, uppercase, digit and special.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordStrength;

/// Non-empty, at most 10 characters, no whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct NicknameFormat;

/// Any non-empty value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

pub const PASSWORD_MIN_CHARS: usize = 8;
pub const PASSWORD_MAX_CHARS: usize = 20;
pub const NICKNAME_MAX_CHARS: usize = 10;

impl FieldValidator for EmailFormat {
    fn validate(&self, value: &str) -> Result<(), FieldError> {
        if value.chars().any(char::is_whitespace) {
            return Err(FieldError::InvalidEmail);
        }
        let Some((local, domain)) = value.split_once('@') else {
            return Err(FieldError::InvalidEmail);
        };
        if local.is_empty() || domain.contains('@') {
            return Err(FieldError::InvalidEmail);
        }
        // Needs a dot with at least one character on each side.
        let inner: Vec<char> = domain.chars().collect();
        if inner.len() < 3 || !inner[1..inner.len() - 1].contains(&'.') {
            return Err(FieldError::InvalidEmail);
        }
        Ok(())
    }

    fn normalize<'a>(&self, raw: &'a str) -> &'a str {
        raw.trim()
    }
}

impl FieldValidator for PasswordStrength {
    fn validate(&self, value: &str) -> Result<(), FieldError> {
        if value.is_empty() {
            return Err(FieldError::EmptyPassword);
        }
        let len = value.chars().count();
        if !(PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&len) {
            return Err(FieldError::WeakPassword);
        }
        if value.contains(['\n', '\r']) {
            return Err(FieldError::WeakPassword);
        }

        let has_lower = value.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = value.chars().any(|c| c.is_ascii_uppercase());
        let has_digit = value.chars().any(|c| c.is_ascii_digit());
        let has_special = value
            .chars()
            .any(|c| !c.is_alphanumeric() && !c.is_whitespace());

        if has_lower && has_upper && has_digit && has_special {
            Ok(())
        } else {
            Err(FieldError::WeakPassword)
        }
    }
}

impl FieldValidator for NicknameFormat {
    fn validate(&self, value: &str) -> Result<(), FieldError> {
        if value.is_empty() {
            return Err(FieldError::EmptyNickname);
        }
        if value.chars().count() > NICKNAME_MAX_CHARS {
            return Err(FieldError::InvalidNickname);
        }
        if value.chars().any(char::is_whitespace) {
            return Err(FieldError::InvalidNickname);
        }
        Ok(())
    }

    fn normalize<'a>(&self, raw: &'a str) -> &'a str {
        raw.trim()
    }
}

impl FieldValidator for Required {
    fn validate(&self, value: &str) -> Result<(), FieldError> {
        if value.is_empty() {
            Err(FieldError::Required)
        } else {
            Ok(())
        }
    }
}

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::MIN_PASSWORD_LENGTH;
use crate::utils::{CannonError, CannonResult};

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Email and password for signing in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> CannonResult<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(CannonError::Validation(
                "Please fill in all fields".to_string(),
            ));
        }
        Ok(())
    }

    /// Email as it is sent to the API
    pub fn email(&self) -> &str {
        self.email.trim()
    }
}

/// Fields of the account creation screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }

    /// Checks run in the order the screen reports them
    pub fn validate(&self) -> CannonResult<()> {
        if self.email.trim().is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
        {
            return Err(CannonError::Validation(
                "Please fill in all fields".to_string(),
            ));
        }

        if self.password != self.confirm_password {
            return Err(CannonError::Validation(
                "Passwords do not match".to_string(),
            ));
        }

        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(CannonError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        if !EMAIL_PATTERN.is_match(self.email.trim()) {
            return Err(CannonError::Validation(
                "Please enter a valid email address".to_string(),
            ));
        }

        Ok(())
    }

    pub fn email(&self) -> &str {
        self.email.trim()
    }
}

/// Trim a chat or channel message, rejecting blank ones
pub fn validate_message(text: &str) -> CannonResult<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CannonError::Validation("Message cannot be empty".to_string()));
    }
    Ok(trimmed)
}

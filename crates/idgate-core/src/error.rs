//! # Validation Errors
//!
//! Shape checks on caller-supplied input, raised before anything is sent to
//! the identity provider. Each variant names the offending field so the API
//! layer can return a field-level message.

use thiserror::Error;

/// Validation failure for a credential or token request field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent or blank.
    #[error("{field}: must not be empty")]
    Empty {
        /// The wire name of the field.
        field: &'static str,
    },

    /// The email address is not syntactically valid.
    #[error("email: must be a valid email address")]
    InvalidEmail,

    /// The password does not satisfy the registration policy.
    #[error("password: {0}")]
    WeakPassword(String),
}

impl ValidationError {
    /// The wire name of the field this error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Empty { field } => field,
            Self::InvalidEmail => "email",
            Self::WeakPassword(_) => "password",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_field_prefixed() {
        let err = ValidationError::Empty {
            field: "refreshToken",
        };
        assert_eq!(err.to_string(), "refreshToken: must not be empty");
        assert_eq!(err.field(), "refreshToken");
        assert!(ValidationError::InvalidEmail
            .to_string()
            .starts_with("email:"));
        assert_eq!(
            ValidationError::WeakPassword("too short".into()).field(),
            "password"
        );
    }
}

//! # Credentials
//!
//! An email/password pair submitted for sign-in or sign-up. Validated for
//! shape only: whether the pair is *correct* is the identity provider's call.

use zeroize::Zeroizing;

use crate::error::ValidationError;

/// Maximum length of an email address (RFC 5321 path limit).
const MAX_EMAIL_LEN: usize = 254;

/// Maximum length of the local part of an email address.
const MAX_LOCAL_LEN: usize = 64;

/// An email/password pair on its way to the identity provider.
///
/// Never persisted. The password lives in zeroizing memory and the custom
/// `Debug` implementation redacts it.
#[derive(Clone)]
pub struct Credential {
    email: String,
    password: Zeroizing<String>,
}

impl Credential {
    /// Build a credential after checking that the email is syntactically
    /// valid and the password is non-empty.
    pub fn new(email: &str, password: &str) -> Result<Self, ValidationError> {
        let email = email.trim();
        validate_email(email)?;
        if password.is_empty() {
            return Err(ValidationError::Empty { field: "password" });
        }
        Ok(Self {
            email: email.to_string(),
            password: Zeroizing::new(password.to_string()),
        })
    }

    /// The (trimmed) email address.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// The password. Callers must not log this value.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Check that `email` is a syntactically valid address.
///
/// Requires one `@`, a non-empty local part, and a dotted
/// domain with no empty labels. No whitespace anywhere.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::Empty { field: "email" });
    }
    if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or(ValidationError::InvalidEmail)?;
    if local.is_empty() || local.len() > MAX_LOCAL_LEN || domain.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    if !domain.contains('.') || domain.split('.').any(str::is_empty) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// Password strength rules applied at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Minimum number of characters.
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

impl PasswordPolicy {
    /// Check `password` against the policy: minimum length plus at least one
    /// uppercase letter, one lowercase letter, one digit, and one special
    /// character.
    pub fn check(&self, password: &str) -> Result<(), ValidationError> {
        if password.is_empty() {
            return Err(ValidationError::Empty { field: "password" });
        }
        if password.chars().count() < self.min_length {
            return Err(ValidationError::WeakPassword(format!(
                "must be at least {} characters",
                self.min_length
            )));
        }

        let mut missing = Vec::new();
        if !password.chars().any(char::is_uppercase) {
            missing.push("an uppercase letter");
        }
        if !password.chars().any(char::is_lowercase) {
            missing.push("a lowercase letter");
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            missing.push("a digit");
        }
        if !password
            .chars()
            .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
        {
            missing.push("a special character");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::WeakPassword(format!(
                "must contain {}",
                missing.join(", ")
            )))
        }
    }
}

//! Wire types for the identity provider's REST endpoints.
//!
//! The password-grant endpoints speak camelCase; the token endpoint speaks
//! snake_case. `expiresIn` arrives as a JSON number on some responses and as
//! a numeric string on others, so both are accepted.
//!
//! Response fields are all optional here. Which ones are required is
//! decided by [`crate::exchange`], so a missing field becomes a
//! malformed-response failure rather than a deserialization error.

use serde::{Deserialize, Deserializer, Serialize};

/// Body of `accounts:signInWithPassword` and `accounts:signUp`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PasswordGrantRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub return_secure_token: bool,
}

/// Response of `accounts:signInWithPassword` and `accounts:signUp`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PasswordGrantResponse {
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub local_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Response of the token endpoint's `refresh_token` grant.
#[derive(Debug, Deserialize)]
pub(crate) struct RefreshGrantResponse {
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Error envelope: `{"error": {"code": 400, "message": "INVALID_PASSWORD"}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ProviderErrorBody {
    pub error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProviderErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    Text(String),
}

fn number_or_string<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

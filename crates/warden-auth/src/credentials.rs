//! Per-request credential material.

use std::fmt;

/// Credential material extracted from one request.
///
/// Empty strings are normalized to `None` at construction.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub bearer: Option<String>,
}

impl Credentials {
    /// Builds credentials from the raw API-key header and `Authorization`
    /// header values.
    pub fn from_headers(api_key: Option<&str>, authorization: Option<&str>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()).map(str::to_string),
            bearer: authorization
                .and_then(parse_authorization_header)
                .map(str::to_string),
        }
    }

    /// No credentials at all.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self::from_headers(Some(&key.into()), None)
    }

    pub fn with_bearer(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            api_key: None,
            bearer: Some(token).filter(|t| !t.is_empty()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Extracts the token from an `Authorization` header value.
///
/// The value is split on single spaces and the second segment is the
/// token; the scheme is not checked. A value without a second segment
/// carries no token.
pub fn parse_authorization_header(value: &str) -> Option<&str> {
    value.split(' ').nth(1).filter(|token| !token.is_empty())
}

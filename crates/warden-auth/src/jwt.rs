//! Bearer token signing and verification.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};
use warden_types::Principal;

use crate::{AuthError, Result};

/// Parses an HMAC algorithm name (`HS256`, `HS384`, `HS512`).
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] for unknown names and for
/// asymmetric algorithms, which cannot be used with a shared secret.
pub fn parse_algorithm(name: &str) -> Result<Algorithm> {
    match Algorithm::from_str(name) {
        Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Ok(alg),
        _ => Err(AuthError::UnsupportedAlgorithm(name.to_string())),
    }
}

/// Token configuration.
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing/verifying tokens.
    secret: String,
    pub algorithm: Algorithm,
    /// Lifetime of issued tokens.
    pub expiration: Duration,
    /// Issuer written into tokens this service issues.
    pub local_issuer: String,
    /// Accepted audiences. Empty disables audience validation.
    pub audience: Vec<String>,
}

impl JwtConfig {
    /// HS512, one hour lifetime, local issuer `db`, no audience check.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Algorithm::HS512,
            expiration: Duration::from_secs(3600),
            local_issuer: "db".to_string(),
            audience: Vec::new(),
        }
    }

    /// Sets the HMAC signing algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the lifetime of issued tokens.
    #[must_use]
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Sets the issuer written into issued tokens. Tokens from this issuer
    /// resolve by principal id.
    #[must_use]
    pub fn with_local_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.local_issuer = issuer.into();
        self
    }

    /// Adds an accepted audience and turns on audience validation.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience.push(audience.into());
        self
    }

    /// Signs a token for `principal` under the local issuer.
    ///
    /// Both `sub` and `jti` carry the principal id; `exp` is now plus the
    /// configured lifetime.
    pub fn issue_token(&self, principal: &Principal) -> Result<String> {
        let now = get_current_timestamp();
        let id = principal.id.to_string();
        let claims = Claims {
            email: Some(principal.email.clone()),
            sub: Some(id.clone()),
            jti: Some(id),
            iss: Some(self.local_issuer.clone()),
            exp: Some(now + self.expiration.as_secs()),
            iat: Some(now),
            nbf: Some(now),
        };
        self.sign(&claims)
    }

    /// Signs arbitrary claims with the configured key and algorithm.
    pub fn sign(&self, claims: &Claims) -> Result<String> {
        Ok(encode(
            &Header::new(self.algorithm),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }

    /// Verifies signature, algorithm and (when present) expiry and
    /// not-before. A missing `exp` is not an error here; callers inspect
    /// [`Claims::exp`] themselves.
    pub fn verify(&self, token: &str) -> std::result::Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &self.validation(),
        )
        .map(|data| data.claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        if self.audience.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&self.audience);
        }
        validation
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("expiration", &self.expiration)
            .field("local_issuer", &self.local_issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

/// Claims read from and written to bearer tokens.
///
/// Every field is optional so that a token lacking one can still be
/// decoded and reported precisely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// External user id at the issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Identity-provider name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Expiry, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
}

impl Claims {
    /// The external subject: `sub`, or `jti` for tokens that only carry that.
    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref().or(self.jti.as_deref())
    }
}

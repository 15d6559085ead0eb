//! # warden-auth: credential resolution for `Warden`
//!
//! Turns the credential material of one request into an [`AuthOutcome`]:
//!
//! ```text
//! Start ── API key present? ──yes──▶ TryApiKey ── found ──▶ Authenticated
//!   │                                    └─ unknown/error ─▶ Rejected(Forbidden)
//!   no
//!   ▼
//! TryBearer ── no token ──▶ Anonymous
//!   ├─ bad signature/algorithm/expired ──▶ Rejected(Forbidden)
//!   ├─ no `exp` claim ──▶ Rejected(MissingExpiry)
//!   └─ (email, issuer, subject) lookup ── found ──▶ Authenticated
//!                                   └─ unknown/error ─▶ Rejected(Forbidden)
//! ```
//!
//! A supplied but invalid API key never falls through to the bearer path.

use thiserror::Error;

mod credentials;
mod jwt;
mod resolver;

pub use credentials::{Credentials, parse_authorization_header};
pub use jwt::{Claims, JwtConfig, parse_algorithm};
pub use resolver::{AuthMethod, AuthOutcome, AuthRejection, CredentialResolver};

/// Errors raised while configuring or issuing tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The configured algorithm is unknown or cannot be used with a shared secret.
    #[error("unsupported JWT algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Signing failed.
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Result type for token configuration and issuance.
pub type Result<T> = std::result::Result<T, AuthError>;

//! The credential resolver state machine.

use std::fmt::{self, Display};

use tracing::{debug, warn};
use warden_store::{IdentityRef, PrincipalLookup};
use warden_types::Principal;

use crate::credentials::Credentials;
use crate::jwt::JwtConfig;

/// How a principal was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    ApiKey,
    Jwt,
}

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// Unknown API key, bad token, or no matching principal.
    Forbidden,
    /// A verified token without an `exp` claim.
    MissingExpiry,
}

impl AuthRejection {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthRejection::Forbidden => "forbidden",
            AuthRejection::MissingExpiry => "missing_expiry",
        }
    }
}

impl Display for AuthRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthRejection::Forbidden => f.write_str("forbidden"),
            AuthRejection::MissingExpiry => f.write_str("token is missing the exp claim"),
        }
    }
}

/// Terminal state of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated {
        principal: Principal,
        method: AuthMethod,
    },
    /// No credentials were supplied.
    Anonymous,
    Rejected(AuthRejection),
}

impl AuthOutcome {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthOutcome::Authenticated { principal, .. } => Some(principal),
            _ => None,
        }
    }
}

/// Resolves request credentials to a principal. Stateless apart from its
/// configuration, so one instance serves any number of concurrent requests.
#[derive(Debug)]
pub struct CredentialResolver<L> {
    lookup: L,
    jwt: JwtConfig,
}

impl<L: PrincipalLookup> CredentialResolver<L> {
    /// Creates a resolver that verifies tokens with `jwt` and finds
    /// principals through `lookup`.
    pub fn new(lookup: L, jwt: JwtConfig) -> Self {
        Self { lookup, jwt }
    }

    /// Returns the token configuration.
    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Runs one pass of the state machine. Never retries.
    pub fn resolve(&self, credentials: &Credentials) -> AuthOutcome {
        match credentials.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => self.try_api_key(key),
            None => self.try_bearer(credentials.bearer.as_deref()),
        }
    }

    fn try_api_key(&self, key: &str) -> AuthOutcome {
        match self.lookup.find_by_api_key(key) {
            Ok(Some(principal)) => {
                debug!(principal = %principal.id, "authenticated by API key");
                AuthOutcome::Authenticated {
                    principal,
                    method: AuthMethod::ApiKey,
                }
            }
            Ok(None) => {
                warn!("unknown API key");
                AuthOutcome::Rejected(AuthRejection::Forbidden)
            }
            Err(e) => {
                warn!(error = %e, "API key lookup failed");
                AuthOutcome::Rejected(AuthRejection::Forbidden)
            }
        }
    }

    fn try_bearer(&self, token: Option<&str>) -> AuthOutcome {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return AuthOutcome::Anonymous;
        };

        let claims = match self.jwt.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "bearer token rejected");
                return AuthOutcome::Rejected(AuthRejection::Forbidden);
            }
        };

        if claims.exp.is_none() {
            warn!("bearer token has no exp claim");
            return AuthOutcome::Rejected(AuthRejection::MissingExpiry);
        }

        let (Some(email), Some(issuer), Some(subject)) =
            (claims.email.as_deref(), claims.iss.as_deref(), claims.subject())
        else {
            warn!("bearer token lacks email, issuer or subject");
            return AuthOutcome::Rejected(AuthRejection::Forbidden);
        };

        let identity = IdentityRef {
            email,
            issuer,
            subject,
            local: issuer == self.jwt.local_issuer,
        };
        match self.lookup.find_by_identity(&identity) {
            Ok(Some(principal)) => {
                debug!(principal = %principal.id, issuer, "authenticated by bearer token");
                AuthOutcome::Authenticated {
                    principal,
                    method: AuthMethod::Jwt,
                }
            }
            Ok(None) => {
                warn!(issuer, "no principal for token identity");
                AuthOutcome::Rejected(AuthRejection::Forbidden)
            }
            Err(e) => {
                warn!(issuer, error = %e, "identity lookup failed");
                AuthOutcome::Rejected(AuthRejection::Forbidden)
            }
        }
    }
}

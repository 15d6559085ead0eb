//! Error taxonomy surfaced to callers.

use std::fmt::{self, Display};

use thiserror::Error;
use tracing::error;
use warden_auth::{AuthError, AuthRejection};
use warden_config::ConfigError;
use warden_filter::FilterError;
use warden_rbac::{Action, RbacError};
use warden_types::PrincipalId;

/// Result type for Warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;

/// Why a request could not be authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationKind {
    /// No credentials were supplied.
    Unauthenticated,
    /// Credentials were supplied but did not identify a principal.
    Forbidden,
    /// A verified bearer token without an `exp` claim.
    MissingExpiry,
}

impl AuthenticationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthenticationKind::Unauthenticated => "unauthenticated",
            AuthenticationKind::Forbidden => "forbidden",
            AuthenticationKind::MissingExpiry => "missing_expiry",
        }
    }
}

impl Display for AuthenticationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AuthRejection> for AuthenticationKind {
    fn from(rejection: AuthRejection) -> Self {
        match rejection {
            AuthRejection::Forbidden => AuthenticationKind::Forbidden,
            AuthRejection::MissingExpiry => AuthenticationKind::MissingExpiry,
        }
    }
}

/// Stable kind tag of a [`WardenError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Authorization,
    Conflict,
    System,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::Authentication => "authentication_error",
            ErrorKind::Authorization => "authorization_error",
            ErrorKind::Conflict => "conflict_error",
            ErrorKind::System => "system_error",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while authorizing a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WardenError {
    /// Malformed caller input (filter clause, unknown role name).
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication error: {0}")]
    Authentication(AuthenticationKind),

    /// An authenticated principal lacks the required permission.
    #[error("principal {principal} may not {action} {entity}")]
    Authorization {
        principal: PrincipalId,
        action: Action,
        entity: String,
    },

    /// A unique key would be duplicated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage, lookup or signing failure. The detail is never shown to
    /// callers; use [`WardenError::public_message`].
    #[error("system error: {0}")]
    System(String),
}

impl WardenError {
    /// Builds a [`WardenError::System`] and logs its detail.
    pub fn system(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        error!(detail = %detail, "system error");
        WardenError::System(detail)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WardenError::Validation(_) => ErrorKind::Validation,
            WardenError::Authentication(_) => ErrorKind::Authentication,
            WardenError::Authorization { .. } => ErrorKind::Authorization,
            WardenError::Conflict(_) => ErrorKind::Conflict,
            WardenError::System(_) => ErrorKind::System,
        }
    }

    /// HTTP status the transport layer should report.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Authentication => 401,
            ErrorKind::Authorization => 403,
            ErrorKind::Conflict => 409,
            ErrorKind::System => 500,
        }
    }

    /// Caller-visible message.
    pub fn public_message(&self) -> String {
        match self {
            WardenError::System(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<FilterError> for WardenError {
    fn from(error: FilterError) -> Self {
        WardenError::Validation(error.to_string())
    }
}

impl From<RbacError> for WardenError {
    fn from(error: RbacError) -> Self {
        match error {
            RbacError::Conflict(detail) => WardenError::Conflict(detail),
            RbacError::NotFound(what) => WardenError::Validation(format!("unknown {what}")),
            RbacError::Store(e) => WardenError::system(e.to_string()),
        }
    }
}

impl From<AuthError> for WardenError {
    fn from(error: AuthError) -> Self {
        WardenError::system(error.to_string())
    }
}

impl From<ConfigError> for WardenError {
    fn from(error: ConfigError) -> Self {
        WardenError::system(error.to_string())
    }
}

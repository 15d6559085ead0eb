//! Authorization gate: credentials in, authorized principal out.

use tracing::{debug, warn};
use warden_auth::{AuthOutcome, CredentialResolver, Credentials};
use warden_filter::{CompiledQuery, FilterClause, FilterCompiler, ListOptions};
use warden_rbac::{Action, CascadeEngine, PermissionCheck};
use warden_store::{PrincipalLookup, RbacStore};
use warden_types::Principal;

use crate::error::{AuthenticationKind, Result, WardenError};

/// The permission an operation requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub action: Action,
    /// Entity name in either convention (`UserRoles` or `user_roles`).
    pub entity: String,
}

impl Requirement {
    pub fn new(action: Action, entity: impl Into<String>) -> Self {
        Self {
            action,
            entity: entity.into(),
        }
    }
}

/// Composes the credential resolver, the cascade engine and the filter
/// compiler for one request. Borrows its parts; cheap to build per call.
#[derive(Debug)]
pub struct AuthorizationGate<'a, L, S> {
    resolver: &'a CredentialResolver<L>,
    engine: &'a CascadeEngine<S>,
    compiler: &'a FilterCompiler,
}

impl<'a, L: PrincipalLookup, S: RbacStore> AuthorizationGate<'a, L, S> {
    pub fn new(
        resolver: &'a CredentialResolver<L>,
        engine: &'a CascadeEngine<S>,
        compiler: &'a FilterCompiler,
    ) -> Self {
        Self {
            resolver,
            engine,
            compiler,
        }
    }

    /// Resolves `credentials` and checks `requirement` against the
    /// principal's effective permission set.
    ///
    /// # Errors
    ///
    /// - `Authentication(Unauthenticated)` when no credentials were supplied
    /// - `Authentication(Forbidden | MissingExpiry)` when they were rejected
    /// - `Authorization` when the permission is not granted
    /// - `System` when the check could not be carried out
    pub fn authorize(&self, credentials: &Credentials, requirement: &Requirement) -> Result<Principal> {
        let principal = match self.resolver.resolve(credentials) {
            AuthOutcome::Authenticated { principal, .. } => principal,
            AuthOutcome::Anonymous => {
                warn!(action = %requirement.action, entity = %requirement.entity, "anonymous request to gated operation");
                return Err(WardenError::Authentication(AuthenticationKind::Unauthenticated));
            }
            AuthOutcome::Rejected(rejection) => {
                return Err(WardenError::Authentication(rejection.into()));
            }
        };

        match self
            .engine
            .has_permission(&principal, requirement.action, &requirement.entity)
        {
            PermissionCheck::Granted => {
                debug!(principal = %principal.id, action = %requirement.action, entity = %requirement.entity, "request authorized");
                Ok(principal)
            }
            PermissionCheck::Denied => Err(WardenError::Authorization {
                principal: principal.id,
                action: requirement.action,
                entity: requirement.entity.clone(),
            }),
            PermissionCheck::SystemError(detail) => Err(WardenError::system(detail)),
        }
    }

    /// Authorizes a list operation and compiles its filters.
    ///
    /// Filters are only compiled once the request is authorized, so an
    /// unauthorized caller never learns whether its filters were valid.
    pub fn authorize_list(
        &self,
        credentials: &Credentials,
        requirement: &Requirement,
        filters: &[FilterClause],
        options: ListOptions,
    ) -> Result<(Principal, CompiledQuery)> {
        let principal = self.authorize(credentials, requirement)?;
        let query = self.compiler.compile_query(filters, options)?;
        Ok((principal, query))
    }
}

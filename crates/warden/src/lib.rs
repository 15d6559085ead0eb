//! # Warden
//!
//! Authorization and query-filter core for CRUD services.
//!
//! Warden sits between a transport layer (GraphQL, REST) and a persistence
//! layer and makes three decisions per request:
//!
//! - **Who is calling** - API key or bearer token → [`Principal`]
//! - **May they do it** - the principal's effective permission set,
//!   maintained by the role cascade, is checked against the operation
//! - **What to fetch** - list filters are compiled into a parameterized
//!   predicate for the storage engine
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             Warden                               │
//! │  ┌─────────────┐   ┌───────────────┐   ┌───────────────────────┐ │
//! │  │ Credential  │ → │ Authorization │ → │   Filter Compiler     │ │
//! │  │  Resolver   │   │     Gate      │   │ (clauses → predicate) │ │
//! │  └──────┬──────┘   └───────┬───────┘   └───────────────────────┘ │
//! │         │                  │                                     │
//! │         ▼                  ▼                                     │
//! │  ┌─────────────────────────────────┐                             │
//! │  │  Store (principals, roles, ...) │ ← Cascade Engine            │
//! │  └─────────────────────────────────┘                             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use warden::{Action, Credentials, MemoryStore, Requirement, Warden, WardenConfig};
//!
//! let store = Arc::new(MemoryStore::new());
//! let warden = Warden::from_config(&WardenConfig::development("s3cret"), Arc::clone(&store))?;
//! warden.seed()?;
//!
//! let alice = store.insert_principal("alice@example.com", None)?;
//! warden.engine().assign_default_role(alice)?;
//! let (_, key) = store.issue_api_key(alice, "laptop")?;
//!
//! let principal = warden.gate().authorize(
//!     &Credentials::with_api_key(key.as_str()),
//!     &Requirement::new(Action::Read, "Products"),
//! );
//! // The default role carries no permissions until an admin grants some.
//! assert!(principal.is_err());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod gate;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

pub use error::{AuthenticationKind, ErrorKind, Result, WardenError};
pub use gate::{AuthorizationGate, Requirement};

// Re-export core types
pub use warden_types::{
    ApiKeyId, Permission, PermissionId, PermissionSet, PermissionTag, Principal, PrincipalId,
    Role, RoleId,
};

// Re-export the persistence seam and the in-memory collaborator
pub use warden_store::{
    ApiKey, IdentityProfile, IdentityRef, MemoryStore, PrincipalLookup, RbacStore,
    RbacTransaction, StoreError,
};

// Re-export RBAC
pub use warden_rbac::{
    Action, CascadeEngine, PermissionCatalog, PermissionCheck, RbacError, RbacSettings,
    RoleSeed, SeedSummary,
};

// Re-export credential resolution
pub use warden_auth::{
    AuthError, AuthMethod, AuthOutcome, AuthRejection, Claims, CredentialResolver, Credentials,
    JwtConfig,
};

// Re-export the filter compiler
pub use warden_filter::{
    CompiledQuery, FilterClause, FilterCompiler, FilterError, FilterOp, FilterSettings, LinkOp,
    ListOptions, Placeholder, Predicate, RenderedPredicate, Scalar, SortDirection,
};

// Re-export configuration
pub use warden_config::{ConfigError, ConfigLoader, PlaceholderStyle, WardenConfig};

/// The assembled authorization core.
///
/// Built once from an immutable [`WardenConfig`] and shared by every
/// request. `S` is the persistence collaborator; it backs both the cascade
/// engine and the credential resolver.
#[derive(Debug)]
pub struct Warden<S> {
    engine: CascadeEngine<Arc<S>>,
    resolver: CredentialResolver<Arc<S>>,
    compiler: FilterCompiler,
    catalog: PermissionCatalog,
    roles: Vec<RoleSeed>,
    api_key_header: String,
}

impl<S: RbacStore + PrincipalLookup> Warden<S> {
    /// Validates `config` and builds every component from it.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::System`] if the configuration is invalid.
    pub fn from_config(config: &WardenConfig, store: Arc<S>) -> Result<Self> {
        config.validate()?;

        let auth = &config.auth;
        let mut jwt = JwtConfig::new(auth.jwt_secret.clone())
            .with_algorithm(warden_auth::parse_algorithm(&auth.jwt_algorithm)?)
            .with_expiration(Duration::from_secs(auth.token_lifetime_secs))
            .with_local_issuer(auth.local_issuer.clone());
        for audience in &auth.audience {
            jwt = jwt.with_audience(audience.clone());
        }

        let settings = RbacSettings {
            admin_role: config.rbac.admin_role.clone(),
            default_role: config.rbac.default_role.clone(),
        };
        let roles = config
            .rbac
            .roles
            .iter()
            .map(|r| RoleSeed::new(r.name.clone(), r.description.clone()))
            .collect();

        let placeholder = match config.filter.placeholder {
            PlaceholderStyle::Question => Placeholder::Question,
            PlaceholderStyle::Numbered => Placeholder::Numbered,
        };

        info!(
            algorithm = %auth.jwt_algorithm,
            local_issuer = %auth.local_issuer,
            admin_role = %settings.admin_role,
            default_role = %settings.default_role,
            "warden configured"
        );

        Ok(Self {
            engine: CascadeEngine::new(Arc::clone(&store), settings),
            resolver: CredentialResolver::new(store, jwt),
            compiler: FilterCompiler::new(FilterSettings { placeholder }),
            catalog: PermissionCatalog::standard(),
            roles,
            api_key_header: auth.api_key_header.clone(),
        })
    }

    /// Replaces the permission catalog used by [`Warden::seed`].
    #[must_use]
    pub fn with_catalog(mut self, catalog: PermissionCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Inserts the catalog permissions and configured roles, granting
    /// every permission to the admin role. Runs in one transaction.
    pub fn seed(&self) -> Result<SeedSummary> {
        Ok(self.engine.seed(&self.catalog, &self.roles)?)
    }

    /// Returns the role cascade engine.
    pub fn engine(&self) -> &CascadeEngine<Arc<S>> {
        &self.engine
    }

    /// Returns the credential resolver.
    pub fn resolver(&self) -> &CredentialResolver<Arc<S>> {
        &self.resolver
    }

    /// Returns the list-filter compiler.
    pub fn compiler(&self) -> &FilterCompiler {
        &self.compiler
    }

    /// Returns the catalog [`Warden::seed`] inserts.
    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    /// Name of the request header carrying an API key.
    pub fn api_key_header(&self) -> &str {
        &self.api_key_header
    }

    /// Returns a gate borrowing this instance's components.
    pub fn gate(&self) -> AuthorizationGate<'_, Arc<S>, Arc<S>> {
        AuthorizationGate::new(&self.resolver, &self.engine, &self.compiler)
    }

    /// Signs a bearer token for `principal` under the local issuer.
    pub fn issue_token(&self, principal: &Principal) -> Result<String> {
        Ok(self.resolver.jwt().issue_token(principal)?)
    }
}

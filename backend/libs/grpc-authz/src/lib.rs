//! Relationship-based Authorization for gRPC Servers
//!
//! Every inbound RPC runs through an ordered chain of links before its
//! handler executes. The first link to reject the call ends evaluation and
//! its status is returned to the client. The final link asks an external
//! permission service (SpiceDB, or Ory Keto) whether the calling peer may
//! invoke the method.
//!
//! ## Core Components
//!
//! - **InterceptorChain**: fail-fast composition of links
//! - **LoggingLink**: records the method path of every call
//! - **AuthenticationGate**: rejects peers without a verified identity
//! - **AuthorizationCheck**: checks `rpcs:<method>#call@users:<peer>` against
//!   the permission service
//! - **AuthzLayer**: tower middleware that runs the chain in front of a
//!   tonic server; approved calls carry the permission service revision as
//!   a [`CheckedAt`] request extension
//!
//! ## Decisions
//!
//! | Situation | Status |
//! |---|---|
//! | every link approves | call proceeds |
//! | no verified peer identity | `Unauthenticated` |
//! | method path missing from metadata | `Internal` |
//! | permission service answers "no" | `PermissionDenied` |
//! | permission service unreachable or too slow | call proceeds (fail-open), logged at ERROR |
//!
//! Fail-open can be switched to fail-closed (`Unavailable`) with
//! `AUTHZ_FAIL_OPEN=false`.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use grpc_authz::{AuthzConfig, AuthzLayer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthzConfig::from_env()?;
//!
//! // One channel to the permission service for the life of the process
//! let chain = grpc_authz::build_chain(&config)?;
//!
//! let _server = tonic::transport::Server::builder().layer(AuthzLayer::new(chain));
//! // .add_service(MyServiceServer::new(MyService)).serve(addr).await?;
//! # Ok(())
//! # }
//! ```

pub mod authn;
pub mod authz;
pub mod backend;
pub mod chain;
pub mod config;
pub mod consistency;
pub mod error;
pub mod layer;
pub mod link;
pub mod logging;
pub mod metadata;
pub mod metrics;
pub mod peer;
pub mod proto;
pub mod query;

pub use authn::AuthenticationGate;
pub use authz::{normalize_method_path, AuthorizationCheck, FailurePolicy};
pub use backend::{
    BackendError, BearerToken, CheckResult, KetoBackend, PermissionBackend, SpiceDbBackend,
};
pub use chain::{ChainBuilder, InterceptorChain};
pub use config::{AuthzConfig, BackendKind};
pub use consistency::CheckedAt;
pub use error::{AuthzError, Result};
pub use layer::{AuthzLayer, AuthzService};
pub use link::{Decision, Link};
pub use logging::LoggingLink;
pub use metadata::{CallMetadata, PATH_KEY};
pub use peer::PeerContext;
pub use query::{ObjectRef, PermissionQuery, PermissionRule, Permissionship};

use std::sync::Arc;
use tracing::info;

/// Connect the configured permission service backend
///
/// The returned backend owns one long-lived channel that every check shares.
/// Must be called from within a Tokio runtime.
pub fn connect_backend(config: &AuthzConfig) -> Result<Arc<dyn PermissionBackend>> {
    let channel = config.connect_channel()?;
    let token = config
        .preshared_key
        .as_deref()
        .map(BearerToken::new)
        .transpose()?;

    let backend: Arc<dyn PermissionBackend> = match config.backend {
        BackendKind::SpiceDb => {
            let mut backend = SpiceDbBackend::new(channel);
            if let Some(token) = token {
                backend = backend.with_preshared_key(token);
            }
            Arc::new(backend)
        }
        BackendKind::Keto => {
            let mut backend = KetoBackend::new(channel);
            if let Some(token) = token {
                backend = backend.with_bearer_token(token);
            }
            Arc::new(backend)
        }
    };

    info!(
        backend = backend.name(),
        url = %config.service_url,
        "Permission service backend configured"
    );

    Ok(backend)
}

/// Build the standard chain: logging, authentication, then authorization
pub fn build_chain(config: &AuthzConfig) -> Result<InterceptorChain> {
    let backend = connect_backend(config)?;
    build_chain_with_backend(config, backend)
}

/// Build the standard chain around an already-connected backend
pub fn build_chain_with_backend(
    config: &AuthzConfig,
    backend: Arc<dyn PermissionBackend>,
) -> Result<InterceptorChain> {
    let authorization = AuthorizationCheck::builder(backend)
        .default_rule(PermissionRule::new(
            config.resource_type.clone(),
            config.permission.clone(),
        ))
        .subject_type(config.subject_type.clone())
        .timeout(config.check_timeout())
        .failure_policy(config.failure_policy())
        .build();

    InterceptorChain::builder()
        .link(LoggingLink::new())
        .link(AuthenticationGate::new())
        .link(authorization)
        .build()
}

//! Permission service adapters
//!
//! The authorization check talks to a [`PermissionBackend`]. Each adapter maps
//! the backend-neutral [`PermissionQuery`] onto one service's wire schema, so
//! swapping the permission service never touches chain or decision logic.

pub mod keto;
pub mod spicedb;

use crate::consistency::CheckedAt;
use crate::error::{AuthzError, Result};
use crate::query::{PermissionQuery, Permissionship};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tonic::metadata::AsciiMetadataValue;
use tonic::Request;

pub use keto::KetoBackend;
pub use spicedb::SpiceDbBackend;

/// The permission service could not produce an answer
#[derive(Debug, Error)]
pub enum BackendError {
    /// The RPC failed at the transport or server level
    #[error("Permission service call failed: {0}")]
    Transport(#[from] tonic::Status),

    /// No answer arrived within the configured deadline
    #[error("Permission service did not answer within {0:?}")]
    Timeout(Duration),
}

/// A permission service answer together with the revision it was evaluated at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub permissionship: Permissionship,
    pub checked_at: Option<CheckedAt>,
}

impl From<Permissionship> for CheckResult {
    fn from(permissionship: Permissionship) -> Self {
        Self {
            permissionship,
            checked_at: None,
        }
    }
}

/// A relationship-based permission service
///
/// Implementations are shared across all concurrent calls and must not hold
/// per-call mutable state.
#[async_trait]
pub trait PermissionBackend: Send + Sync {
    /// Stable name used in logs
    fn name(&self) -> &'static str;

    /// Ask whether the query's subject holds the permission on the resource
    async fn check(&self, query: &PermissionQuery) -> std::result::Result<Permissionship, BackendError>;

    /// Same as [`check`](Self::check), also reporting the revision the
    /// service evaluated the answer at, for backends that expose one
    async fn check_with_revision(
        &self,
        query: &PermissionQuery,
    ) -> std::result::Result<CheckResult, BackendError> {
        self.check(query).await.map(CheckResult::from)
    }
}

/// Pre-shared bearer token attached to every backend request
#[derive(Clone, Debug)]
pub struct BearerToken {
    header: AsciiMetadataValue,
}

impl BearerToken {
    /// Format `token` as an `authorization: Bearer <token>` value
    ///
    /// ## Errors
    ///
    /// Returns `AuthzError::InvalidMetadata` if the token is not valid ASCII
    /// metadata.
    pub fn new(token: &str) -> Result<Self> {
        let header = AsciiMetadataValue::try_from(format!("Bearer {}", token))
            .map_err(|_| AuthzError::InvalidMetadata("authorization".to_string()))?;

        Ok(Self { header })
    }

    pub(crate) fn apply<T>(&self, request: &mut Request<T>) {
        request
            .metadata_mut()
            .insert("authorization", self.header.clone());
    }
}

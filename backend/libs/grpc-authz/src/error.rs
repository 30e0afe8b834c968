//! Error types for building the authorization chain
//!
//! Per-call outcomes are always `tonic::Status` values. The errors here only
//! surface while a chain or its backend connection is being assembled.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for chain construction
pub type Result<T> = std::result::Result<T, AuthzError>;

/// Errors that can occur while assembling an interceptor chain
#[derive(Debug, Error)]
pub enum AuthzError {
    /// A chain with no links was requested through a non-explicit constructor
    #[error("Interceptor chain has no links; use InterceptorChain::allow_all() to approve every call")]
    EmptyChain,

    /// An environment variable held a value that could not be parsed
    #[error("Invalid value for {var}: {value:?}")]
    InvalidConfig { var: String, value: String },

    /// The permission service endpoint could not be built
    #[error("Invalid permission service endpoint: {0}")]
    InvalidEndpoint(#[from] tonic::transport::Error),

    /// TLS material for the permission service channel could not be read
    #[error("Failed to read TLS material from {path:?}: {source}")]
    TlsMaterial {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be encoded as gRPC metadata
    #[error("Invalid metadata value for {0}")]
    InvalidMetadata(String),
}

impl AuthzError {
    /// Create an invalid configuration error
    pub fn invalid_config(var: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidConfig {
            var: var.into(),
            value: value.into(),
        }
    }
}

//! Authorization configuration
//!
//! Loads the permission service endpoint, check timeout, failure policy and
//! relationship naming from environment variables.

use crate::authz::{FailurePolicy, DEFAULT_CHECK_TIMEOUT};
use crate::error::{AuthzError, Result};
use crate::query::{DEFAULT_PERMISSION, DEFAULT_RESOURCE_TYPE, DEFAULT_SUBJECT_TYPE};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};

/// Which permission service schema to speak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Authzed SpiceDB (`authzed.api.v1`)
    #[default]
    SpiceDb,
    /// Ory Keto (`ory.keto.acl.v1alpha1`)
    Keto,
}

impl FromStr for BackendKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spicedb" => Ok(BackendKind::SpiceDb),
            "keto" => Ok(BackendKind::Keto),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthzConfig {
    /// Permission service endpoint
    pub service_url: String,

    /// Permission service schema
    pub backend: BackendKind,

    /// Deadline for one permission check in milliseconds
    pub check_timeout_ms: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Approve authenticated callers when the permission service is unreachable
    pub fail_open: bool,

    /// Bearer token presented to the permission service
    #[serde(skip_serializing)]
    pub preshared_key: Option<String>,

    /// Permission checked for methods without a registered rule
    pub permission: String,

    /// Resource type for methods without a registered rule
    pub resource_type: String,

    /// Object type of the calling subject
    pub subject_type: String,

    /// Enable TLS/mTLS on the permission service channel
    pub tls_enabled: bool,
    /// Optional custom domain name for TLS SNI/verification
    pub tls_domain_name: Option<String>,
    /// Path to CA certificate (PEM)
    pub tls_ca_cert_path: Option<String>,
    /// Path to client certificate (PEM) for mTLS
    pub tls_client_cert_path: Option<String>,
    /// Path to client private key (PEM) for mTLS
    pub tls_client_key_path: Option<String>,
}

impl AuthzConfig {
    /// Load configuration from environment variables
    ///
    /// **Environment Variables**:
    /// - `AUTHZ_SERVICE_URL` (default: `http://spicedb:50051`)
    /// - `AUTHZ_BACKEND`: `spicedb` or `keto` (default: `spicedb`)
    /// - `AUTHZ_CHECK_TIMEOUT_MS` (default: 500, must be non-zero)
    /// - `AUTHZ_CONNECT_TIMEOUT_SECS` (default: 5)
    /// - `AUTHZ_FAIL_OPEN` (default: true)
    /// - `AUTHZ_PRESHARED_KEY` (optional)
    /// - `AUTHZ_PERMISSION`, `AUTHZ_RESOURCE_TYPE`, `AUTHZ_SUBJECT_TYPE`
    /// - `AUTHZ_TLS_ENABLED`, `AUTHZ_TLS_DOMAIN_NAME`, `AUTHZ_TLS_CA_CERT_PATH`,
    ///   `AUTHZ_TLS_CLIENT_CERT_PATH`, `AUTHZ_TLS_CLIENT_KEY_PATH`
    ///
    /// Values that are present but unparseable are errors rather than
    /// falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::development();

        Ok(Self {
            service_url: env::var("AUTHZ_SERVICE_URL")
                .unwrap_or_else(|_| "http://spicedb:50051".to_string()),
            backend: parse_var("AUTHZ_BACKEND", defaults.backend)?,
            check_timeout_ms: parse_nonzero_var(
                "AUTHZ_CHECK_TIMEOUT_MS",
                defaults.check_timeout_ms,
            )?,
            connect_timeout_secs: parse_var(
                "AUTHZ_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            )?,
            fail_open: parse_bool_var("AUTHZ_FAIL_OPEN", defaults.fail_open)?,
            preshared_key: env::var("AUTHZ_PRESHARED_KEY").ok().filter(|k| !k.is_empty()),
            permission: env::var("AUTHZ_PERMISSION").unwrap_or(defaults.permission),
            resource_type: env::var("AUTHZ_RESOURCE_TYPE").unwrap_or(defaults.resource_type),
            subject_type: env::var("AUTHZ_SUBJECT_TYPE").unwrap_or(defaults.subject_type),

            // TLS/mTLS
            tls_enabled: parse_bool_var("AUTHZ_TLS_ENABLED", false)?,
            tls_domain_name: env::var("AUTHZ_TLS_DOMAIN_NAME").ok(),
            tls_ca_cert_path: env::var("AUTHZ_TLS_CA_CERT_PATH").ok(),
            tls_client_cert_path: env::var("AUTHZ_TLS_CLIENT_CERT_PATH").ok(),
            tls_client_key_path: env::var("AUTHZ_TLS_CLIENT_KEY_PATH").ok(),
        })
    }

    /// Configuration for development/testing
    pub fn development() -> Self {
        Self {
            service_url: "http://localhost:50051".to_string(),
            backend: BackendKind::SpiceDb,
            check_timeout_ms: DEFAULT_CHECK_TIMEOUT.as_millis() as u64,
            connect_timeout_secs: 5,
            fail_open: true,
            preshared_key: None,
            permission: DEFAULT_PERMISSION.to_string(),
            resource_type: DEFAULT_RESOURCE_TYPE.to_string(),
            subject_type: DEFAULT_SUBJECT_TYPE.to_string(),

            tls_enabled: false,
            tls_domain_name: None,
            tls_ca_cert_path: None,
            tls_client_cert_path: None,
            tls_client_key_path: None,
        }
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        if self.fail_open {
            FailurePolicy::FailOpen
        } else {
            FailurePolicy::FailClosed
        }
    }

    /// Build a tonic Endpoint for the permission service with optional TLS/mTLS
    pub fn make_endpoint(&self) -> Result<Endpoint> {
        let mut ep = Endpoint::from_shared(self.service_url.clone())?
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .timeout(self.check_timeout())
            .tcp_nodelay(true);

        if self.tls_enabled {
            let mut tls = ClientTlsConfig::new();

            if let Some(ca_path) = &self.tls_ca_cert_path {
                tls = tls.ca_certificate(Certificate::from_pem(read_pem(ca_path)?));
            }

            if let Some(domain) = &self.tls_domain_name {
                tls = tls.domain_name(domain);
            }

            if let (Some(cert_path), Some(key_path)) =
                (&self.tls_client_cert_path, &self.tls_client_key_path)
            {
                let identity = Identity::from_pem(read_pem(cert_path)?, read_pem(key_path)?);
                tls = tls.identity(identity);
            }

            ep = ep.tls_config(tls)?;
        }

        Ok(ep)
    }

    /// Channel to the permission service, connected on first use
    ///
    /// Connection errors surface on each check and go through the failure
    /// policy. Must be called from within a Tokio runtime.
    pub fn connect_channel(&self) -> Result<Channel> {
        Ok(self.make_endpoint()?.connect_lazy())
    }
}

fn read_pem(path: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| AuthzError::TlsMaterial {
        path: Path::new(path).to_path_buf(),
        source,
    })
}

fn parse_var<T: FromStr>(var: &str, default: T) -> Result<T> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|_| AuthzError::invalid_config(var, value)),
        Err(_) => Ok(default),
    }
}

fn parse_nonzero_var(var: &str, default: u64) -> Result<u64> {
    match parse_var(var, default)? {
        0 => Err(AuthzError::invalid_config(var, "0")),
        value => Ok(value),
    }
}

fn parse_bool_var(var: &str, default: bool) -> Result<bool> {
    match env::var(var) {
        Ok(value) => match value.as_str() {
            "1" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "false" | "FALSE" | "False" => Ok(false),
            _ => Err(AuthzError::invalid_config(var, value)),
        },
        Err(_) => Ok(default),
    }
}

//! Peer identity for the calling principal
//!
//! The transport establishes who is calling. Links only read the result:
//! whether the peer is authenticated, and the ordered list of identity
//! strings. The first identity is the subject of permission checks.

use std::sync::Arc;
use tonic::transport::server::{TcpConnectInfo, TlsConnectInfo};
use tracing::{debug, warn};
use x509_parser::prelude::*;

/// Verified identity of the peer making a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerContext {
    identities: Arc<[String]>,
}

impl PeerContext {
    /// A peer the transport could not authenticate
    pub fn unauthenticated() -> Self {
        Self {
            identities: Arc::from(Vec::new()),
        }
    }

    /// A peer authenticated under a single identity
    pub fn authenticated(identity: impl Into<String>) -> Self {
        Self::from_identities(vec![identity.into()])
    }

    /// A peer with the given identities, in transport order
    ///
    /// An empty list yields an unauthenticated peer.
    pub fn from_identities(identities: Vec<String>) -> Self {
        Self {
            identities: Arc::from(identities),
        }
    }

    /// Whether the transport established an identity for this peer
    pub fn is_authenticated(&self) -> bool {
        !self.identities.is_empty()
    }

    /// All identities, in the order the transport reported them
    pub fn identities(&self) -> &[String] {
        &self.identities
    }

    /// The identity used as the subject of permission checks
    pub fn primary_identity(&self) -> Option<&str> {
        self.identities.first().map(String::as_str)
    }

    /// Resolve the peer of an incoming request
    ///
    /// Order of precedence:
    /// 1. a `PeerContext` inserted by an upstream authentication layer
    /// 2. the client certificate presented over mTLS
    /// 3. unauthenticated
    pub fn from_extensions(extensions: &http::Extensions) -> Self {
        if let Some(peer) = extensions.get::<PeerContext>() {
            return peer.clone();
        }

        let certs = extensions
            .get::<TlsConnectInfo<TcpConnectInfo>>()
            .and_then(|info| info.peer_certs());

        match certs.as_ref().and_then(|certs| certs.first()) {
            Some(leaf) => Self::from_certificate_der(leaf.as_ref()),
            None => Self::unauthenticated(),
        }
    }

    /// Derive identities from a DER-encoded leaf certificate
    ///
    /// Subject alternative names (DNS, URI, email) are used in certificate
    /// order; the subject common name is the fallback when none are present.
    /// A certificate that cannot be parsed yields an unauthenticated peer.
    pub fn from_certificate_der(der: &[u8]) -> Self {
        let (_, cert) = match X509Certificate::from_der(der) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Failed to parse peer certificate");
                return Self::unauthenticated();
            }
        };

        let mut identities = Vec::new();

        if let Ok(Some(san)) = cert.subject_alternative_name() {
            for name in &san.value.general_names {
                match name {
                    GeneralName::DNSName(dns) => identities.push(dns.to_string()),
                    GeneralName::URI(uri) => identities.push(uri.to_string()),
                    GeneralName::RFC822Name(email) => identities.push(email.to_string()),
                    _ => {}
                }
            }
        }

        if identities.is_empty() {
            if let Some(cn) = cert
                .subject()
                .iter_common_name()
                .next()
                .and_then(|cn| cn.as_str().ok())
            {
                identities.push(cn.to_string());
            }
        }

        debug!(identities = ?identities, "Resolved peer identity from certificate");

        Self::from_identities(identities)
    }
}

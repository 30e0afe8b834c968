//! Authentication gate
//!
//! Rejects peers the transport could not authenticate. Placed ahead of any
//! link that needs a subject identity.

use crate::link::{Decision, Link};
use crate::metadata::CallMetadata;
use crate::peer::PeerContext;
use async_trait::async_trait;
use tonic::Status;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticationGate;

impl AuthenticationGate {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Link for AuthenticationGate {
    fn name(&self) -> &'static str {
        "authentication_gate"
    }

    async fn process(&self, metadata: &CallMetadata, peer: &PeerContext) -> Decision {
        if !peer.is_authenticated() {
            info!(path = ?metadata.path(), "Unauthenticated peer");
            return Err(Status::unauthenticated("Unauthenticated"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_unauthenticated_peer() {
        let gate = AuthenticationGate::new();
        let metadata = CallMetadata::for_path("/pkg.Service/Method");

        let status = gate
            .process(&metadata, &PeerContext::unauthenticated())
            .await
            .unwrap_err();

        assert_eq!(status.code(), tonic::Code::Unauthenticated);
    }

    #[tokio::test]
    async fn test_admits_authenticated_peer() {
        let gate = AuthenticationGate::new();
        let metadata = CallMetadata::for_path("/pkg.Service/Method");

        assert!(gate
            .process(&metadata, &PeerContext::authenticated("alice"))
            .await
            .is_ok());
    }
}

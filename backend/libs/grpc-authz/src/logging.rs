//! Request logging link
//!
//! Observability only: records the method path of every call and approves
//! it. A call without a method path is rejected with `Internal`, since the
//! transport integration handed the chain malformed metadata.

use crate::link::{Decision, Link};
use crate::metadata::CallMetadata;
use crate::peer::PeerContext;
use async_trait::async_trait;
use tonic::Status;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLink;

impl LoggingLink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Link for LoggingLink {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn process(&self, metadata: &CallMetadata, _peer: &PeerContext) -> Decision {
        let Some(path) = metadata.path() else {
            error!("Call metadata is missing the method path");
            return Err(Status::internal("Internal Error"));
        };

        info!(path = %path, "Request path: {}", path);

        Ok(())
    }
}

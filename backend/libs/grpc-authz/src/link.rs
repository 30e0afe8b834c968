//! The capability shared by every stage of the interceptor chain

use crate::metadata::CallMetadata;
use crate::peer::PeerContext;
use async_trait::async_trait;
use tonic::Status;

/// Outcome of running a link or a chain against one call
///
/// `Ok(())` approves the call. `Err(status)` rejects it, and the status is
/// returned to the client verbatim.
pub type Decision = Result<(), Status>;

/// One stage of the interceptor chain
///
/// A link inspects the call metadata and the peer identity and either
/// approves or rejects the call. Links never mutate either input. A link whose
/// own dependency fails decides locally whether that approves or rejects;
/// the chain imposes no policy of its own.
#[async_trait]
pub trait Link: Send + Sync {
    /// Stable name used in logs
    fn name(&self) -> &'static str;

    /// Decide whether the call may proceed
    async fn process(&self, metadata: &CallMetadata, peer: &PeerContext) -> Decision;
}

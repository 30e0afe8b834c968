//! Interceptor chain
//!
//! Runs a fixed, ordered sequence of links on every call. The chain approves
//! a call if and only if every link approves it. Otherwise it fails fast and
//! returns the first rejecting link's status untouched; later links are not
//! invoked.

use crate::error::{AuthzError, Result};
use crate::link::{Decision, Link};
use crate::metadata::CallMetadata;
use crate::peer::PeerContext;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Ordered, immutable composition of links
#[derive(Clone)]
pub struct InterceptorChain {
    links: Arc<[Arc<dyn Link>]>,
}

impl InterceptorChain {
    /// Build a chain from links in evaluation order
    ///
    /// ## Errors
    ///
    /// Returns `AuthzError::EmptyChain` when `links` is empty. A chain that
    /// approves everything must be requested with [`InterceptorChain::allow_all`].
    pub fn new(links: Vec<Arc<dyn Link>>) -> Result<Self> {
        if links.is_empty() {
            return Err(AuthzError::EmptyChain);
        }

        Ok(Self {
            links: Arc::from(links),
        })
    }

    /// A chain with no links, approving every call
    pub fn allow_all() -> Self {
        warn!("Interceptor chain constructed with no links; every call will be approved");

        Self {
            links: Arc::from(Vec::new()),
        }
    }

    /// Start building a chain link by link
    pub fn builder() -> ChainBuilder {
        ChainBuilder { links: Vec::new() }
    }

    /// Run every link in order, stopping at the first rejection
    pub async fn process(&self, metadata: &CallMetadata, peer: &PeerContext) -> Decision {
        for link in self.links.iter() {
            if let Err(status) = link.process(metadata, peer).await {
                debug!(
                    link = link.name(),
                    code = ?status.code(),
                    "Interceptor chain rejected call"
                );
                return Err(status);
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Link names in evaluation order
    pub fn link_names(&self) -> Vec<&'static str> {
        self.links.iter().map(|link| link.name()).collect()
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("links", &self.link_names())
            .finish()
    }
}

#[async_trait]
impl Link for InterceptorChain {
    fn name(&self) -> &'static str {
        "interceptor_chain"
    }

    async fn process(&self, metadata: &CallMetadata, peer: &PeerContext) -> Decision {
        InterceptorChain::process(self, metadata, peer).await
    }
}

/// Incremental construction of an [`InterceptorChain`]
#[derive(Default)]
pub struct ChainBuilder {
    links: Vec<Arc<dyn Link>>,
}

impl ChainBuilder {
    /// Append a link; links run in the order they are added
    pub fn link<L: Link + 'static>(mut self, link: L) -> Self {
        self.links.push(Arc::new(link));
        self
    }

    /// Append a link that is shared with other owners
    pub fn shared_link(mut self, link: Arc<dyn Link>) -> Self {
        self.links.push(link);
        self
    }

    /// Finish the chain; fails with `AuthzError::EmptyChain` if no links were added
    pub fn build(self) -> Result<InterceptorChain> {
        InterceptorChain::new(self.links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tonic::{Code, Status};

    struct CountingLink {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        outcome: Option<Status>,
    }

    impl CountingLink {
        fn approve(name: &'static str) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let link = Self {
                name,
                calls: calls.clone(),
                outcome: None,
            };
            (link, calls)
        }

        fn deny(name: &'static str, status: Status) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let link = Self {
                name,
                calls: calls.clone(),
                outcome: Some(status),
            };
            (link, calls)
        }
    }

    #[async_trait]
    impl Link for CountingLink {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn process(&self, _metadata: &CallMetadata, _peer: &PeerContext) -> Decision {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Some(status) => Err(status.clone()),
                None => Ok(()),
            }
        }
    }

    fn call() -> (CallMetadata, PeerContext) {
        (
            CallMetadata::for_path("/pkg.Service/Method"),
            PeerContext::authenticated("alice"),
        )
    }

    #[tokio::test]
    async fn test_all_links_approve() {
        let (first, first_calls) = CountingLink::approve("first");
        let (second, second_calls) = CountingLink::approve("second");
        let (third, third_calls) = CountingLink::approve("third");

        let chain = InterceptorChain::builder()
            .link(first)
            .link(second)
            .link(third)
            .build()
            .unwrap();

        let (metadata, peer) = call();
        assert!(chain.process(&metadata, &peer).await.is_ok());

        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_denial_short_circuits() {
        let (first, first_calls) = CountingLink::approve("first");
        let (second, second_calls) =
            CountingLink::deny("second", Status::permission_denied("Permission Denied"));
        let (third, third_calls) = CountingLink::deny("third", Status::internal("Internal Error"));

        let chain = InterceptorChain::builder()
            .link(first)
            .link(second)
            .link(third)
            .build()
            .unwrap();

        let (metadata, peer) = call();
        let status = chain.process(&metadata, &peer).await.unwrap_err();

        assert_eq!(status.code(), Code::PermissionDenied);
        assert_eq!(status.message(), "Permission Denied");
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_denial_in_first_position() {
        let (first, _) = CountingLink::deny("first", Status::unauthenticated("Unauthenticated"));
        let (second, second_calls) = CountingLink::approve("second");

        let chain = InterceptorChain::builder()
            .link(first)
            .link(second)
            .build()
            .unwrap();

        let (metadata, peer) = call();
        let status = chain.process(&metadata, &peer).await.unwrap_err();

        assert_eq!(status.code(), Code::Unauthenticated);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_links_rejected() {
        let result = InterceptorChain::new(Vec::new());
        assert!(matches!(result, Err(AuthzError::EmptyChain)));

        let result = InterceptorChain::builder().build();
        assert!(matches!(result, Err(AuthzError::EmptyChain)));
    }

    #[tokio::test]
    async fn test_explicit_allow_all_approves_everything() {
        let chain = InterceptorChain::allow_all();
        assert!(chain.is_empty());

        let (metadata, peer) = call();
        assert!(chain.process(&metadata, &peer).await.is_ok());

        let metadata = CallMetadata::without_path(Default::default());
        let peer = PeerContext::unauthenticated();
        assert!(chain.process(&metadata, &peer).await.is_ok());
    }

    #[tokio::test]
    async fn test_shared_link_used_by_two_chains() {
        let (gate, gate_calls) = CountingLink::approve("gate");
        let gate: Arc<dyn Link> = Arc::new(gate);
        let (audit, _) = CountingLink::approve("audit");

        let public = InterceptorChain::builder()
            .shared_link(gate.clone())
            .build()
            .unwrap();
        let internal = InterceptorChain::builder()
            .shared_link(gate)
            .link(audit)
            .build()
            .unwrap();

        let (metadata, peer) = call();
        assert!(public.process(&metadata, &peer).await.is_ok());
        assert!(internal.process(&metadata, &peer).await.is_ok());

        assert_eq!(gate_calls.load(Ordering::SeqCst), 2);
        assert_eq!(internal.link_names(), vec!["gate", "audit"]);
    }

    #[tokio::test]
    async fn test_nested_chain_propagates_denial() {
        let (inner_deny, _) = CountingLink::deny("inner", Status::permission_denied("nope"));
        let inner = InterceptorChain::builder().link(inner_deny).build().unwrap();
        let (after, after_calls) = CountingLink::approve("after");

        let outer = InterceptorChain::builder()
            .link(inner)
            .link(after)
            .build()
            .unwrap();

        let (metadata, peer) = call();
        let status = outer.process(&metadata, &peer).await.unwrap_err();

        assert_eq!(status.code(), Code::PermissionDenied);
        assert_eq!(after_calls.load(Ordering::SeqCst), 0);
        assert_eq!(outer.link_names(), vec!["interceptor_chain", "after"]);
    }
}

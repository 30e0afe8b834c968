//! Tower middleware running the interceptor chain in front of a tonic server
//!
//! Every inbound call is admitted or rejected before it reaches the service
//! implementation. A rejected call is answered with a trailers-only gRPC
//! response carrying the chain's status; the inner service is never invoked.
//! An approved call carries the permission service revision, when one was
//! reported, as a [`CheckedAt`] request extension.

use crate::chain::InterceptorChain;
use crate::consistency::{self, CheckedAt};
use crate::metadata::CallMetadata;
use crate::peer::PeerContext;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tonic::body::BoxBody;
use tower::{Layer, Service};

/// Layer applying an [`InterceptorChain`] to every call
///
/// ```rust,no_run
/// use grpc_authz::{AuthzConfig, AuthzLayer};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AuthzConfig::from_env()?;
/// let chain = grpc_authz::build_chain(&config)?;
///
/// let server = tonic::transport::Server::builder().layer(AuthzLayer::new(chain));
/// // server.add_service(MyServiceServer::new(MyService)).serve(addr).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct AuthzLayer {
    chain: InterceptorChain,
}

impl AuthzLayer {
    pub fn new(chain: InterceptorChain) -> Self {
        Self { chain }
    }
}

impl<S> Layer<S> for AuthzLayer {
    type Service = AuthzService<S>;

    fn layer(&self, service: S) -> Self::Service {
        AuthzService {
            inner: service,
            chain: self.chain.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthzService<S> {
    inner: S,
    chain: InterceptorChain,
}

impl<S, B> Service<http::Request<B>> for AuthzService<S>
where
    S: Service<http::Request<B>, Response = http::Response<BoxBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        // Keep the instance that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let chain = self.chain.clone();

        Box::pin(async move {
            let metadata = CallMetadata::from_http(&req);
            let peer = PeerContext::from_extensions(req.extensions());

            let (decision, checked_at) =
                consistency::capture(chain.process(&metadata, &peer)).await;
            if let Err(status) = decision {
                return Ok(status.into_http());
            }

            if let Some(checked_at) = checked_at {
                req.extensions_mut().insert::<CheckedAt>(checked_at);
            }

            inner.call(req).await
        })
    }
}

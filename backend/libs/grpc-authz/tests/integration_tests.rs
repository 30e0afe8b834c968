//! Integration Tests for the Authorization Chain
//!
//! These tests verify the complete flow:
//! Inbound request -> AuthzLayer -> chain (logging, authn, authz) -> handler

use async_trait::async_trait;
use grpc_authz::{
    build_chain, build_chain_with_backend, AuthzConfig, AuthzLayer, BackendError, CallMetadata,
    PeerContext, PermissionBackend, PermissionQuery, Permissionship,
};
use std::collections::HashSet;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tonic::body::BoxBody;
use tonic::Code;
use tower::{Layer, Service, ServiceExt};

/// Permission service with a fixed set of `resource#permission@subject` grants
struct StaticPermissions {
    grants: HashSet<String>,
    calls: AtomicUsize,
}

impl StaticPermissions {
    fn new(grants: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            grants: grants.iter().map(|g| g.to_string()).collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PermissionBackend for StaticPermissions {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn check(&self, query: &PermissionQuery) -> Result<Permissionship, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.grants.contains(&query.to_string()) {
            Ok(Permissionship::HasPermission)
        } else {
            Ok(Permissionship::NoPermission)
        }
    }
}

/// Handler standing in for a tonic service
#[derive(Clone, Default)]
struct EchoHandler {
    calls: Arc<AtomicUsize>,
}

impl Service<http::Request<()>> for EchoHandler {
    type Response = http::Response<BoxBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: http::Request<()>) -> Self::Future {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(http::Response::new(tonic::body::empty_body())) })
    }
}

fn request(path: &str, peer: PeerContext) -> http::Request<()> {
    let mut req = http::Request::builder().uri(path).body(()).unwrap();
    req.extensions_mut().insert(peer);
    req
}

fn grpc_status(response: &http::Response<BoxBody>) -> Option<String> {
    response
        .headers()
        .get("grpc-status")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

const GRANT: &str = "rpcs:nova_content_service_v2_ContentService/GetPost#call@users:alice";

#[tokio::test]
async fn test_granted_call_reaches_handler() {
    let backend = StaticPermissions::new(&[GRANT]);
    let chain = build_chain_with_backend(&AuthzConfig::development(), backend.clone()).unwrap();
    let handler = EchoHandler::default();
    let service = AuthzLayer::new(chain).layer(handler.clone());

    let response = service
        .oneshot(request(
            "/nova.content_service.v2.ContentService/GetPost",
            PeerContext::authenticated("alice"),
        ))
        .await
        .unwrap();

    assert!(grpc_status(&response).is_none());
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ungranted_call_is_permission_denied() {
    let backend = StaticPermissions::new(&[GRANT]);
    let chain = build_chain_with_backend(&AuthzConfig::development(), backend).unwrap();
    let handler = EchoHandler::default();
    let service = AuthzLayer::new(chain).layer(handler.clone());

    let response = service
        .oneshot(request(
            "/nova.content_service.v2.ContentService/DeletePost",
            PeerContext::authenticated("alice"),
        ))
        .await
        .unwrap();

    assert_eq!(grpc_status(&response), Some((Code::PermissionDenied as i32).to_string()));
    assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unauthenticated_call_never_reaches_backend() {
    let backend = StaticPermissions::new(&[GRANT]);
    let chain = build_chain_with_backend(&AuthzConfig::development(), backend.clone()).unwrap();
    let handler = EchoHandler::default();
    let service = AuthzLayer::new(chain).layer(handler.clone());

    let response = service
        .oneshot(request(
            "/nova.content_service.v2.ContentService/GetPost",
            PeerContext::unauthenticated(),
        ))
        .await
        .unwrap();

    assert_eq!(grpc_status(&response), Some((Code::Unauthenticated as i32).to_string()));
    assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_standard_chain_order() {
    let backend = StaticPermissions::new(&[]);
    let chain = build_chain_with_backend(&AuthzConfig::development(), backend).unwrap();

    assert_eq!(
        chain.link_names(),
        vec!["logging", "authentication_gate", "authorization_check"]
    );
}

#[tokio::test]
async fn test_configured_relationship_names() -> anyhow::Result<()> {
    let backend = StaticPermissions::new(&["methods:pkg_Service/Method#invoke@services:feed"]);
    let config = AuthzConfig {
        permission: "invoke".to_string(),
        resource_type: "methods".to_string(),
        subject_type: "services".to_string(),
        ..AuthzConfig::development()
    };
    let chain = build_chain_with_backend(&config, backend)?;

    chain
        .process(
            &CallMetadata::for_path("/pkg.Service/Method"),
            &PeerContext::authenticated("feed"),
        )
        .await?;

    Ok(())
}

#[tokio::test]
async fn test_unreachable_spicedb_fails_open() {
    let config = AuthzConfig {
        service_url: "http://127.0.0.1:1".to_string(),
        check_timeout_ms: 1_000,
        connect_timeout_secs: 1,
        ..AuthzConfig::development()
    };
    let chain = build_chain(&config).unwrap();

    let decision = chain
        .process(
            &CallMetadata::for_path("/pkg.Service/Method"),
            &PeerContext::authenticated("alice"),
        )
        .await;

    tokio_test::assert_ok!(decision);
}

#[tokio::test]
async fn test_unreachable_spicedb_fail_closed() {
    let config = AuthzConfig {
        service_url: "http://127.0.0.1:1".to_string(),
        check_timeout_ms: 1_000,
        connect_timeout_secs: 1,
        fail_open: false,
        ..AuthzConfig::development()
    };
    let chain = build_chain(&config).unwrap();

    let status = chain
        .process(
            &CallMetadata::for_path("/pkg.Service/Method"),
            &PeerContext::authenticated("alice"),
        )
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::Unavailable);
}

/// Concurrent calls share one chain and one backend without interference
#[tokio::test]
async fn test_concurrent_calls_are_independent() {
    let backend = StaticPermissions::new(&[
        "rpcs:pkg_Service/Method#call@users:alice",
        "rpcs:pkg_Service/Method#call@users:carol",
    ]);
    let chain = build_chain_with_backend(&AuthzConfig::development(), backend.clone()).unwrap();

    let mut handles = Vec::new();
    for user in ["alice", "bob", "carol", "dave"] {
        let chain = chain.clone();
        handles.push(tokio::spawn(async move {
            let decision = chain
                .process(
                    &CallMetadata::for_path("/pkg.Service/Method"),
                    &PeerContext::authenticated(user),
                )
                .await;
            (user, decision.is_ok())
        }));
    }

    for handle in handles {
        let (user, allowed) = handle.await.unwrap();
        assert_eq!(allowed, user == "alice" || user == "carol", "user {}", user);
    }
    assert_eq!(backend.calls.load(Ordering::SeqCst), 4);
}

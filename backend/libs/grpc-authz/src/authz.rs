//! Relationship-based authorization check
//!
//! Asks the permission service whether the calling peer may invoke the
//! requested method, i.e. whether the relationship
//! `rpcs:<normalized method>#call@users:<peer identity>` holds.
//!
//! ## Failure policy
//!
//! A well-formed "no" from the permission service always rejects the call
//! with `PermissionDenied`. When the service cannot be reached, times out, or
//! the call is otherwise not answered, the default policy is **fail-open**:
//! the already-authenticated caller is approved as if no policy were
//! enforced. This trades strict enforcement for availability while the
//! authorization backend is degraded. Every fail-open approval is logged at
//! ERROR and counted under the `fail_open` outcome so operators can audit it.
//! [`FailurePolicy::FailClosed`] rejects with `Unavailable` instead.

use crate::backend::{BackendError, CheckResult, PermissionBackend};
use crate::consistency;
use crate::link::{Decision, Link};
use crate::metadata::CallMetadata;
use crate::metrics::{AuthzMetrics, Outcome};
use crate::peer::PeerContext;
use crate::query::{ObjectRef, PermissionQuery, PermissionRule, DEFAULT_SUBJECT_TYPE};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tonic::Status;
use tracing::{debug, error, info, warn};

/// Default deadline for one permission service round-trip
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_millis(500);

/// What to do when the permission service cannot answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Approve the authenticated caller
    #[default]
    FailOpen,
    /// Reject the call with `Unavailable`
    FailClosed,
}

/// Map a method path onto a resource id for the permission service
///
/// `/package.Service/Method` becomes `package_Service/Method`: one leading
/// `/` is stripped and every `.` is replaced with `_`. The mapping is total
/// and deterministic but not injective; `/a.b_c/M` and `/a_b.c/M` both map to
/// `a_b_c/M`. Method names are defined by the application's service
/// definitions, not by callers, so such collisions are a schema concern.
pub fn normalize_method_path(path: &str) -> String {
    path.strip_prefix('/').unwrap_or(path).replace('.', "_")
}

/// Link that delegates the allow/deny decision to a permission service
pub struct AuthorizationCheck {
    backend: Arc<dyn PermissionBackend>,
    rules: HashMap<String, PermissionRule>,
    default_rule: PermissionRule,
    subject_type: String,
    timeout: Duration,
    failure_policy: FailurePolicy,
}

impl AuthorizationCheck {
    /// Check every method against `rpcs`/`call` with default settings
    pub fn new(backend: Arc<dyn PermissionBackend>) -> Self {
        Self::builder(backend).build()
    }

    pub fn builder(backend: Arc<dyn PermissionBackend>) -> AuthorizationCheckBuilder {
        AuthorizationCheckBuilder {
            backend,
            rules: HashMap::new(),
            default_rule: PermissionRule::default(),
            subject_type: DEFAULT_SUBJECT_TYPE.to_string(),
            timeout: DEFAULT_CHECK_TIMEOUT,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The query issued for a call to `path` by `subject_id`
    pub fn build_query(&self, path: &str, subject_id: &str) -> PermissionQuery {
        let rule = self.rules.get(path).unwrap_or(&self.default_rule);

        PermissionQuery::new(
            rule.permission.clone(),
            ObjectRef::new(rule.resource_type.clone(), normalize_method_path(path)),
            ObjectRef::new(self.subject_type.clone(), subject_id),
        )
    }

    async fn query_backend(&self, query: &PermissionQuery) -> Result<CheckResult, BackendError> {
        let started = Instant::now();
        let result =
            tokio::time::timeout(self.timeout, self.backend.check_with_revision(query)).await;
        AuthzMetrics::record_check_duration(started.elapsed().as_secs_f64());

        match result {
            Ok(answer) => answer,
            Err(_) => Err(BackendError::Timeout(self.timeout)),
        }
    }

    fn on_backend_failure(&self, query: &PermissionQuery, err: &BackendError) -> Decision {
        match self.failure_policy {
            FailurePolicy::FailOpen => {
                error!(
                    backend = self.backend.name(),
                    relationship = %query,
                    error = %err,
                    "Permission check failed, allowing authenticated caller (fail-open)"
                );
                AuthzMetrics::record_decision(Outcome::FailOpen);
                Ok(())
            }
            FailurePolicy::FailClosed => {
                error!(
                    backend = self.backend.name(),
                    relationship = %query,
                    error = %err,
                    "Permission check failed, rejecting call (fail-closed)"
                );
                AuthzMetrics::record_decision(Outcome::FailClosed);
                Err(Status::unavailable("Permission check could not be processed."))
            }
        }
    }
}

#[async_trait]
impl Link for AuthorizationCheck {
    fn name(&self) -> &'static str {
        "authorization_check"
    }

    async fn process(&self, metadata: &CallMetadata, peer: &PeerContext) -> Decision {
        let Some(subject_id) = peer.primary_identity() else {
            info!("Unauthenticated peer");
            AuthzMetrics::record_decision(Outcome::Unauthenticated);
            return Err(Status::unauthenticated("Unauthenticated"));
        };

        let Some(path) = metadata.path() else {
            error!("Call metadata is missing the method path");
            AuthzMetrics::record_decision(Outcome::Internal);
            return Err(Status::internal("Internal Error"));
        };

        let query = self.build_query(path, subject_id);
        info!("Evaluating relationship: {}", query);

        let answer = match self.query_backend(&query).await {
            Ok(answer) => answer,
            Err(e) => return self.on_backend_failure(&query, &e),
        };

        if !answer.permissionship.is_granted() {
            warn!(
                relationship = %query,
                permissionship = ?answer.permissionship,
                "Permission denied"
            );
            AuthzMetrics::record_decision(Outcome::Denied);
            return Err(Status::permission_denied("Permission Denied"));
        }

        debug!(relationship = %query, "Permission granted");
        AuthzMetrics::record_decision(Outcome::Allowed);

        if let Some(checked_at) = answer.checked_at {
            consistency::record(checked_at);
        }

        Ok(())
    }
}

/// Configuration of an [`AuthorizationCheck`] before it starts serving
pub struct AuthorizationCheckBuilder {
    backend: Arc<dyn PermissionBackend>,
    rules: HashMap<String, PermissionRule>,
    default_rule: PermissionRule,
    subject_type: String,
    timeout: Duration,
    failure_policy: FailurePolicy,
}

impl AuthorizationCheckBuilder {
    /// Require `rule` for calls to `method` (`/package.Service/Method`)
    ///
    /// May be repeated; the last registration for a method wins.
    pub fn register_permission(mut self, method: impl Into<String>, rule: PermissionRule) -> Self {
        self.rules.insert(method.into(), rule);
        self
    }

    /// Rule for methods without a registration
    pub fn default_rule(mut self, rule: PermissionRule) -> Self {
        self.default_rule = rule;
        self
    }

    pub fn subject_type(mut self, subject_type: impl Into<String>) -> Self {
        self.subject_type = subject_type.into();
        self
    }

    /// Deadline for one permission service round-trip
    ///
    /// A zero deadline would send every check down the failure path, so it is
    /// ignored and the current deadline kept.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        if timeout.is_zero() {
            warn!(
                kept_ms = self.timeout.as_millis() as u64,
                "Ignoring zero permission check timeout"
            );
            return self;
        }

        self.timeout = timeout;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn build(self) -> AuthorizationCheck {
        info!(
            backend = self.backend.name(),
            failure_policy = ?self.failure_policy,
            timeout_ms = self.timeout.as_millis() as u64,
            registered_rules = self.rules.len(),
            "Authorization check configured"
        );

        AuthorizationCheck {
            backend: self.backend,
            rules: self.rules,
            default_rule: self.default_rule,
            subject_type: self.subject_type,
            timeout: self.timeout,
            failure_policy: self.failure_policy,
        }
    }
}

//! Prometheus metrics for authorization decisions

#[cfg(feature = "metrics")]
use prometheus::{register_histogram, register_int_counter_vec, Histogram, IntCounterVec};

#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;

#[cfg(feature = "metrics")]
static AUTHZ_DECISIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "grpc_authz_decisions_total",
        "Total number of authorization decisions by outcome",
        &["outcome"]
    )
    .expect("Failed to register authorization decisions metric")
});

#[cfg(feature = "metrics")]
static AUTHZ_CHECK_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "grpc_authz_check_duration_seconds",
        "Duration of permission service round-trips"
    )
    .expect("Failed to register authorization check duration metric")
});

/// Outcome label for a single authorization decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Allowed,
    Denied,
    Unauthenticated,
    Internal,
    /// Backend unreachable, call approved
    FailOpen,
    /// Backend unreachable, call rejected
    FailClosed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Allowed => "allowed",
            Outcome::Denied => "denied",
            Outcome::Unauthenticated => "unauthenticated",
            Outcome::Internal => "internal",
            Outcome::FailOpen => "fail_open",
            Outcome::FailClosed => "fail_closed",
        }
    }
}

/// Metrics collector for the authorization check
pub struct AuthzMetrics;

#[cfg(feature = "metrics")]
impl AuthzMetrics {
    pub fn record_decision(outcome: Outcome) {
        AUTHZ_DECISIONS.with_label_values(&[outcome.as_str()]).inc();
    }

    pub fn record_check_duration(duration_secs: f64) {
        AUTHZ_CHECK_DURATION.observe(duration_secs);
    }

    /// Current count for an outcome
    pub fn decision_count(outcome: Outcome) -> u64 {
        AUTHZ_DECISIONS.with_label_values(&[outcome.as_str()]).get()
    }
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
impl AuthzMetrics {
    pub fn record_decision(_outcome: Outcome) {}
    pub fn record_check_duration(_duration_secs: f64) {}
    pub fn decision_count(_outcome: Outcome) -> u64 {
        0
    }
}

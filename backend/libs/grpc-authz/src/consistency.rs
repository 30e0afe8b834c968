//! Permission service revision handed to request handlers
//!
//! SpiceDB reports the revision (ZedToken) each check was evaluated at. When
//! a call is approved, [`AuthzService`](crate::layer::AuthzService) inserts
//! that revision into the request extensions as [`CheckedAt`], so a handler
//! can issue follow-up reads at least as fresh as the authorization decision:
//!
//! ```rust,ignore
//! if let Some(checked_at) = request.extensions().get::<CheckedAt>() {
//!     read_relationships_at(checked_at.token()).await?;
//! }
//! ```

use std::cell::RefCell;
use std::future::Future;

tokio::task_local! {
    static CHECKED_AT: RefCell<Option<CheckedAt>>;
}

/// Revision token the permission service evaluated a check at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckedAt(String);

impl CheckedAt {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

/// Remember `checked_at` for the call currently being authorized
///
/// Outside [`capture`] this is a no-op.
pub(crate) fn record(checked_at: CheckedAt) {
    let _ = CHECKED_AT.try_with(|slot| *slot.borrow_mut() = Some(checked_at));
}

/// Run `future`, returning its output and the last revision recorded while it ran
pub(crate) async fn capture<F: Future>(future: F) -> (F::Output, Option<CheckedAt>) {
    CHECKED_AT
        .scope(RefCell::new(None), async move {
            let output = future.await;
            let checked_at = CHECKED_AT.with(|slot| slot.borrow_mut().take());
            (output, checked_at)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capture_returns_recorded_revision() {
        let (output, checked_at) = capture(async {
            record(CheckedAt::new("GhUKEzE2OTk"));
            7
        })
        .await;

        assert_eq!(output, 7);
        assert_eq!(checked_at.as_ref().map(CheckedAt::token), Some("GhUKEzE2OTk"));
    }

    #[tokio::test]
    async fn test_capture_without_record_is_none() {
        let (_, checked_at) = capture(async {}).await;
        assert!(checked_at.is_none());
    }

    #[test]
    fn test_record_outside_capture_is_ignored() {
        record(CheckedAt::new("orphan"));
    }
}

//! The seam between the retry core and whatever drives the upstream site.

use std::sync::Arc;

use async_trait::async_trait;

use crate::identifier::Identifier;
use crate::types::AttemptOutcome;

/// Performs one lookup attempt against the upstream site.
///
/// Implementations must report ordinary network, timeout and rendering
/// failures as [`AttemptOutcome::Transient`] rather than panicking; the
/// orchestrator decides whether to try again. Resources such as pooled
/// browser sessions are checked out and released inside a single call.
#[async_trait]
pub trait PageInteraction: Send + Sync {
    /// Runs a single attempt for `id`.
    async fn attempt_lookup(&self, id: &Identifier) -> AttemptOutcome;
}

#[async_trait]
impl<T: PageInteraction + ?Sized> PageInteraction for Arc<T> {
    async fn attempt_lookup(&self, id: &Identifier) -> AttemptOutcome {
        (**self).attempt_lookup(id).await
    }
}

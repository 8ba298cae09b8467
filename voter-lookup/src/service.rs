//! Validation plus orchestration behind one entry point.

use std::sync::Arc;

use crate::error::ValidationError;
use crate::identifier::validate;
use crate::interaction::PageInteraction;
use crate::orchestrator::{LookupResult, RetryingLookupOrchestrator};
use crate::response::LookupResponse;

/// High-level lookup client.
///
/// Owns the orchestrator and a shared handle to the collaborator. Cloning is
/// cheap and clones share the same collaborator.
#[derive(Clone)]
pub struct VoterLookup {
    orchestrator: RetryingLookupOrchestrator,
    page: Arc<dyn PageInteraction>,
}

impl std::fmt::Debug for VoterLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoterLookup")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

impl VoterLookup {
    /// Creates a client from an orchestrator and a collaborator.
    #[must_use]
    pub fn new(orchestrator: RetryingLookupOrchestrator, page: Arc<dyn PageInteraction>) -> Self {
        Self { orchestrator, page }
    }

    /// The orchestrator in use.
    #[must_use]
    pub const fn orchestrator(&self) -> &RetryingLookupOrchestrator {
        &self.orchestrator
    }

    /// Validates `raw` and, if it is well formed, runs the retry loop.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] without contacting the collaborator
    /// when `raw` is malformed.
    pub async fn lookup(&self, raw: &str) -> Result<LookupResult, ValidationError> {
        let id = validate(raw)?;
        Ok(self.orchestrator.lookup(&id, self.page.as_ref()).await)
    }

    /// Like [`VoterLookup::lookup`] but always produces a response envelope.
    pub async fn respond(&self, raw: &str) -> LookupResponse {
        match validate(raw) {
            Ok(id) => {
                let result = self.orchestrator.lookup(&id, self.page.as_ref()).await;
                LookupResponse::from_result(id.as_str(), &result)
            }
            Err(err) => {
                tracing::info!(input = %err.input, error = %err.message, "Rejected national ID");
                LookupResponse::from_validation(&err)
            }
        }
    }
}

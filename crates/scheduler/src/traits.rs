use std::sync::Arc;

use async_trait::async_trait;
use siebwerk_core::WorkerId;

use crate::error::SchedulerError;

/// Delivers an operation to a specific remote worker.
///
/// The matching engine is transport-agnostic: dispatch is fire-and-forget
/// from its perspective, and the eventual result comes back through
/// [`crate::engine::MatchingEngine::complete`] tagged with the worker id.
/// Serialization is the implementor's concern.
#[async_trait]
pub trait WorkDispatcher<O>: Send + Sync {
    /// Hand `op` to the transport for delivery to `worker`.
    async fn dispatch(&self, worker: &WorkerId, op: O) -> Result<(), SchedulerError>;
}

/// Blanket implementation so `Arc<dyn WorkDispatcher<O>>` can be used directly.
#[async_trait]
impl<O: Send + 'static, T: WorkDispatcher<O> + ?Sized> WorkDispatcher<O> for Arc<T> {
    async fn dispatch(&self, worker: &WorkerId, op: O) -> Result<(), SchedulerError> {
        (**self).dispatch(worker, op).await
    }
}

use siebwerk_core::WorkerId;

/// Worker lifecycle and result events delivered by a resource broker.
///
/// Transport bindings translate whatever their broker reports into this
/// enum and feed it through
/// [`crate::engine::MatchingEngine::handle_event`] — a single transition
/// entry point instead of per-event callback overrides.
#[derive(Debug)]
pub enum BrokerEvent<R> {
    /// A worker announced itself and is ready for work.
    WorkerRegistered(WorkerId),

    /// A worker left (graceful goodbye or reported unreachable).
    WorkerDeregistered(WorkerId),

    /// A result arrived tagged with the worker that produced it.
    ResultReady { worker: WorkerId, result: R },
}

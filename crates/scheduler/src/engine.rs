use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use siebwerk_core::WorkerId;
use tracing::{debug, info, warn};

use crate::completion::{completion_pair, CompletionHandle, WorkError};
use crate::events::BrokerEvent;
use crate::metrics::EngineMetrics;
use crate::state::{SchedulerState, WorkUnit};
use crate::traits::WorkDispatcher;

/// Handle returned by [`MatchingEngine::submit`].
pub type WorkHandle<R> = CompletionHandle<Result<R, WorkError>>;

/// Generic work-queue / worker-pool matching engine.
///
/// Pairs a FIFO queue of work units with a pool of idle remote workers.
/// Every operation is one linearizable transition over the owned
/// [`SchedulerState`] behind a single mutex; dispatch to the transport
/// happens outside the lock, fire-and-forget, on a spawned task.
///
/// A unit is always in exactly one place: the queue, attached to one busy
/// worker, or fulfilled. There is no timeout on a busy worker — an
/// unresponsive worker starves its attached unit until it deregisters,
/// at which point the unit fails with [`WorkError::WorkerLost`].
pub struct MatchingEngine<O, R> {
    state: Mutex<SchedulerState<O, R>>,
    dispatcher: Arc<dyn WorkDispatcher<O>>,
    submitted: AtomicU64,
    dispatched: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl<O, R> MatchingEngine<O, R>
where
    O: Send + 'static,
    R: Send + 'static,
{
    pub fn new(dispatcher: Arc<dyn WorkDispatcher<O>>) -> Self {
        Self {
            state: Mutex::new(SchedulerState::new()),
            dispatcher,
            submitted: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue one operation and return its completion handle.
    ///
    /// Never blocks on worker availability — blocking happens only when the
    /// caller awaits the handle. Must run inside a Tokio runtime (dispatch
    /// is spawned).
    pub fn submit(&self, op: O) -> WorkHandle<R> {
        let (setter, handle) = completion_pair();
        {
            let mut state = self.state.lock().unwrap();
            state.queue.push_back(WorkUnit { op, setter });
        }
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.pump();
        handle
    }

    /// Add a worker in the idle state and immediately try to match it.
    pub fn register_worker(&self, id: WorkerId) {
        {
            let mut state = self.state.lock().unwrap();
            if !state.register(id.clone()) {
                warn!(worker = %id, "duplicate worker registration ignored");
                return;
            }
        }
        info!(worker = %id, "worker registered");
        self.pump();
    }

    /// Remove a worker.
    ///
    /// If the worker still held a unit in flight, that unit's handle fails
    /// with [`WorkError::WorkerLost`] — partial sieve progress in a lost
    /// worker cannot be recovered, so the submitter chooses whether to
    /// resubmit.
    pub fn deregister_worker(&self, id: &WorkerId) {
        let slot = {
            let mut state = self.state.lock().unwrap();
            state.deregister(id)
        };
        match slot {
            None => warn!(worker = %id, "deregistration of unknown worker ignored"),
            Some(slot) => match slot.pending {
                Some(setter) => {
                    warn!(worker = %id, "worker lost with a unit in flight");
                    setter.fulfill(Err(WorkError::WorkerLost { worker: id.clone() }));
                    self.failed.fetch_add(1, Ordering::Relaxed);
                }
                None => info!(worker = %id, "worker deregistered"),
            },
        }
    }

    /// Pair queued work with idle workers until one side runs dry.
    ///
    /// Idempotent and safe to invoke speculatively: with an empty queue or
    /// no idle worker this is a no-op. Each pairing pops the queue head and
    /// picks an arbitrary idle worker — no fairness guarantee beyond "some
    /// idle worker".
    pub fn pump(&self) {
        loop {
            let matched = {
                let mut state = self.state.lock().unwrap();
                state.take_match()
            };
            let Some((worker, op)) = matched else {
                break;
            };
            self.dispatched.fetch_add(1, Ordering::Relaxed);
            debug!(worker = %worker, "dispatching unit");

            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move {
                if let Err(e) = dispatcher.dispatch(&worker, op).await {
                    // The unit stays attached to the worker; without a
                    // result it surfaces as WorkerLost when the worker
                    // eventually deregisters.
                    warn!(worker = %worker, error = %e, "dispatch failed");
                }
            });
        }
    }

    /// Record a result tagged with `worker`, fulfill the attached handle,
    /// return the worker to idle, and re-pump.
    ///
    /// Results tagged with an unknown or already-idle worker are logged and
    /// dropped — a malformed result never aborts unrelated units.
    pub fn complete(&self, worker: &WorkerId, result: R) {
        let setter = {
            let mut state = self.state.lock().unwrap();
            state.finish(worker)
        };
        match setter {
            Some(setter) => {
                setter.fulfill(Ok(result));
                self.completed.fetch_add(1, Ordering::Relaxed);
                debug!(worker = %worker, "unit completed, worker idle again");
                self.pump();
            }
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(worker = %worker, "result from unknown or idle worker dropped");
            }
        }
    }

    /// Single entry point for broker-reported events.
    pub fn handle_event(&self, event: BrokerEvent<R>) {
        match event {
            BrokerEvent::WorkerRegistered(id) => self.register_worker(id),
            BrokerEvent::WorkerDeregistered(id) => self.deregister_worker(&id),
            BrokerEvent::ResultReady { worker, result } => self.complete(&worker, result),
        }
    }

    /// Snapshot of current engine activity.
    pub fn metrics(&self) -> EngineMetrics {
        let state = self.state.lock().unwrap();
        EngineMetrics {
            units_submitted: self.submitted.load(Ordering::Relaxed),
            units_dispatched: self.dispatched.load(Ordering::Relaxed),
            units_completed: self.completed.load(Ordering::Relaxed),
            units_failed: self.failed.load(Ordering::Relaxed),
            results_dropped: self.dropped.load(Ordering::Relaxed),
            queue_depth: state.queue_depth(),
            idle_workers: state.idle.len(),
            busy_workers: state.busy.len(),
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        self.state.lock().unwrap().check_invariants();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::mpsc;

    use crate::error::SchedulerError;

    /// Dispatcher that forwards every (worker, op) pair into a channel so
    /// tests can await dispatches deterministically.
    struct RecordingDispatcher {
        tx: mpsc::UnboundedSender<(WorkerId, u32)>,
    }

    #[async_trait]
    impl WorkDispatcher<u32> for RecordingDispatcher {
        async fn dispatch(&self, worker: &WorkerId, op: u32) -> Result<(), SchedulerError> {
            self.tx
                .send((worker.clone(), op))
                .map_err(|e| SchedulerError::Transport(e.to_string()))
        }
    }

    fn engine_with_recorder() -> (
        MatchingEngine<u32, u32>,
        mpsc::UnboundedReceiver<(WorkerId, u32)>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MatchingEngine::new(Arc::new(RecordingDispatcher { tx })), rx)
    }

    async fn no_dispatch_within(rx: &mut mpsc::UnboundedReceiver<(WorkerId, u32)>, ms: u64) {
        let outcome = tokio::time::timeout(Duration::from_millis(ms), rx.recv()).await;
        assert!(outcome.is_err(), "unexpected dispatch: {:?}", outcome);
    }

    #[tokio::test]
    async fn submit_without_workers_stays_queued() {
        let (engine, mut rx) = engine_with_recorder();
        let handle = engine.submit(1);

        no_dispatch_within(&mut rx, 50).await;
        assert!(!handle.is_fulfilled());
        assert_eq!(engine.metrics().queue_depth, 1);
        engine.assert_invariants();
    }

    #[tokio::test]
    async fn registration_releases_queued_unit() {
        let (engine, mut rx) = engine_with_recorder();
        let handle = engine.submit(7);

        engine.register_worker(WorkerId::from("w1"));
        let (worker, op) = rx.recv().await.unwrap();
        assert_eq!(worker, WorkerId::from("w1"));
        assert_eq!(op, 7);

        engine.complete(&worker, 70);
        assert_eq!(handle.wait().await, Ok(70));

        let m = engine.metrics();
        assert_eq!(m.idle_workers, 1);
        assert_eq!(m.busy_workers, 0);
        engine.assert_invariants();
    }

    #[tokio::test]
    async fn fifo_dispatch_with_one_worker() {
        let (engine, mut rx) = engine_with_recorder();
        engine.register_worker(WorkerId::from("w1"));

        let a = engine.submit(1);
        let b = engine.submit(2);

        let (w, op) = rx.recv().await.unwrap();
        assert_eq!(op, 1, "A dispatches first");

        // At-most-once: B must not dispatch while W is busy.
        no_dispatch_within(&mut rx, 50).await;
        assert!(!b.is_fulfilled());

        engine.complete(&w, 10);
        assert_eq!(a.wait().await, Ok(10));

        let (w2, op2) = rx.recv().await.unwrap();
        assert_eq!(w2, w, "freed worker picks up B");
        assert_eq!(op2, 2);
        engine.assert_invariants();
    }

    #[tokio::test]
    async fn pump_is_idempotent() {
        let (engine, mut rx) = engine_with_recorder();
        engine.register_worker(WorkerId::from("w1"));

        for _ in 0..5 {
            engine.pump();
        }
        no_dispatch_within(&mut rx, 50).await;

        let m = engine.metrics();
        assert_eq!(m.units_dispatched, 0);
        assert_eq!(m.idle_workers, 1);
        engine.assert_invariants();
    }

    #[tokio::test]
    async fn two_workers_drain_the_queue_concurrently() {
        let (engine, mut rx) = engine_with_recorder();
        for op in 1..=4 {
            engine.submit(op);
        }
        engine.register_worker(WorkerId::from("w1"));
        engine.register_worker(WorkerId::from("w2"));

        // Delivery order across the two spawned dispatch tasks is not
        // guaranteed, only which units leave the queue first.
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_ne!(first.0, second.0, "both workers must be matched");
        let mut ops = [first.1, second.1];
        ops.sort_unstable();
        assert_eq!(ops, [1, 2], "queue head dispatches before the tail");

        engine.complete(&first.0, 0);
        engine.complete(&second.0, 0);
        let mut rest = [rx.recv().await.unwrap().1, rx.recv().await.unwrap().1];
        rest.sort_unstable();
        assert_eq!(rest, [3, 4]);
        engine.assert_invariants();
    }

    #[tokio::test]
    async fn unknown_result_is_dropped_not_fatal() {
        let (engine, mut rx) = engine_with_recorder();
        engine.register_worker(WorkerId::from("w1"));

        engine.complete(&WorkerId::from("ghost"), 99);
        engine.complete(&WorkerId::from("w1"), 99); // idle, no unit attached

        let m = engine.metrics();
        assert_eq!(m.results_dropped, 2);
        assert_eq!(m.units_completed, 0);

        // Engine still functions.
        let handle = engine.submit(5);
        let (w, _) = rx.recv().await.unwrap();
        engine.complete(&w, 50);
        assert_eq!(handle.wait().await, Ok(50));
    }

    #[tokio::test]
    async fn lost_worker_fails_its_unit() {
        let (engine, mut rx) = engine_with_recorder();
        let w = WorkerId::from("w1");
        engine.register_worker(w.clone());
        let handle = engine.submit(1);
        rx.recv().await.unwrap();

        engine.deregister_worker(&w);
        assert_eq!(
            handle.wait().await,
            Err(WorkError::WorkerLost { worker: w })
        );
        assert_eq!(engine.metrics().units_failed, 1);
        engine.assert_invariants();
    }

    #[tokio::test]
    async fn idle_deregistration_is_clean() {
        let (engine, _rx) = engine_with_recorder();
        let w = WorkerId::from("w1");
        engine.register_worker(w.clone());
        engine.deregister_worker(&w);

        let m = engine.metrics();
        assert_eq!(m.worker_count(), 0);
        assert_eq!(m.units_failed, 0);
        engine.assert_invariants();
    }

    #[tokio::test]
    async fn events_route_through_the_same_transitions() {
        let (engine, mut rx) = engine_with_recorder();
        let handle = engine.submit(3);

        engine.handle_event(BrokerEvent::WorkerRegistered(WorkerId::from("w1")));
        let (w, _) = rx.recv().await.unwrap();

        engine.handle_event(BrokerEvent::ResultReady {
            worker: w.clone(),
            result: 30,
        });
        assert_eq!(handle.wait().await, Ok(30));

        engine.handle_event(BrokerEvent::WorkerDeregistered(w));
        assert_eq!(engine.metrics().worker_count(), 0);
        engine.assert_invariants();
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use siebwerk_core::{Transport, WorkerId};
use tokio::sync::Mutex;
use zeromq::{PullSocket, PushSocket, Socket, SocketRecv, SocketSend};

use crate::engine::MatchingEngine;
use crate::error::SchedulerError;
use crate::events::BrokerEvent;
use crate::message::Message;
use crate::protocol::{topics, SieveOutcome, SieveTask, WorkerGoodbye, WorkerHello};
use crate::traits::WorkDispatcher;

/// The matching engine specialized to sieve partitions.
pub type ClusterEngine = MatchingEngine<SieveTask, Vec<u64>>;

/// Coordinator-side ZeroMQ binding of the abstract resource broker.
///
/// Topology: the coordinator binds one PULL socket that every worker
/// pushes to (hello, results, goodbye). Each worker binds its own PULL
/// task socket and announces its endpoint in the hello; the broker opens
/// a dedicated PUSH socket per worker for targeted dispatch.
///
/// The broker translates incoming envelopes into [`BrokerEvent`]s and
/// feeds them through the engine's single transition entry point. Payloads
/// stay opaque bytes until the topic picks a decoder.
pub struct ZmqBroker {
    results: Mutex<PullSocket>,
    workers: Mutex<HashMap<WorkerId, PushSocket>>,
    shutdown: Arc<AtomicBool>,
}

impl ZmqBroker {
    /// Bind the result socket workers push to.
    pub async fn bind(results: &Transport) -> Result<Self, SchedulerError> {
        results
            .ensure_ipc_dir()
            .map_err(|e| SchedulerError::Transport(e.to_string()))?;
        results
            .remove_stale_socket()
            .map_err(|e| SchedulerError::Transport(e.to_string()))?;

        let mut socket = PullSocket::new();
        socket.bind(&results.endpoint()).await?;
        tracing::info!(endpoint = %results.endpoint(), "result socket bound — workers push here");

        Ok(Self {
            results: Mutex::new(socket),
            workers: Mutex::new(HashMap::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Signal the event loop to stop after its current poll.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Open a dedicated PUSH route to a worker's task socket.
    async fn connect_worker(&self, id: &WorkerId, endpoint: &str) -> Result<(), SchedulerError> {
        let mut socket = PushSocket::new();
        socket.connect(endpoint).await?;
        tracing::info!(worker = %id, endpoint, "task route connected");
        self.workers.lock().await.insert(id.clone(), socket);
        Ok(())
    }

    async fn disconnect_worker(&self, id: &WorkerId) {
        if self.workers.lock().await.remove(id).is_some() {
            tracing::info!(worker = %id, "task route dropped");
        }
    }

    /// Run the event loop: translate worker envelopes into engine events.
    ///
    /// Returns when [`ZmqBroker::shutdown`] is called. Malformed envelopes
    /// are logged and dropped; they never stop the loop.
    pub async fn run_events(&self, engine: Arc<ClusterEngine>) -> Result<(), SchedulerError> {
        let mut results = self.results.lock().await;
        tracing::info!("broker event loop started");

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::info!("broker event loop stopping");
                break;
            }

            // Poll with a timeout so the shutdown flag is checked regularly.
            let recv_result =
                tokio::time::timeout(std::time::Duration::from_millis(100), results.recv()).await;

            let raw = match recv_result {
                Ok(Ok(raw)) => raw,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "result socket recv error");
                    continue;
                }
                Err(_) => continue, // timeout, re-check shutdown
            };

            let Some(bytes) = raw.get(0) else {
                tracing::warn!("empty ZMQ frame dropped");
                continue;
            };
            let envelope = match Message::from_bytes(bytes.as_ref()) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(error = %e, "undecodable envelope dropped");
                    continue;
                }
            };

            self.handle_envelope(&engine, envelope).await;
        }

        Ok(())
    }

    async fn handle_envelope(&self, engine: &ClusterEngine, envelope: Message) {
        match envelope.topic.as_str() {
            topics::WORKER_HELLO => match envelope.decode::<WorkerHello>() {
                Ok(hello) => {
                    if let Err(e) = self.connect_worker(&hello.worker, &hello.endpoint).await {
                        tracing::warn!(
                            worker = %hello.worker,
                            error = %e,
                            "could not reach announced task endpoint, registration skipped"
                        );
                        return;
                    }
                    engine.handle_event(BrokerEvent::WorkerRegistered(hello.worker));
                }
                Err(e) => tracing::warn!(error = %e, "malformed hello dropped"),
            },
            topics::TASK_RESULT => match envelope.decode::<SieveOutcome>() {
                Ok(outcome) => engine.handle_event(BrokerEvent::ResultReady {
                    worker: outcome.worker,
                    result: outcome.primes,
                }),
                Err(e) => tracing::warn!(error = %e, "malformed result dropped"),
            },
            topics::WORKER_GOODBYE => match envelope.decode::<WorkerGoodbye>() {
                Ok(goodbye) => {
                    self.disconnect_worker(&goodbye.worker).await;
                    engine.handle_event(BrokerEvent::WorkerDeregistered(goodbye.worker));
                }
                Err(e) => tracing::warn!(error = %e, "malformed goodbye dropped"),
            },
            other => tracing::warn!(topic = %other, "envelope with unknown topic dropped"),
        }
    }
}

#[async_trait]
impl WorkDispatcher<SieveTask> for ZmqBroker {
    async fn dispatch(&self, worker: &WorkerId, op: SieveTask) -> Result<(), SchedulerError> {
        let bytes = Message::new(topics::TASK_ASSIGN, &op)?.to_bytes()?;
        let mut workers = self.workers.lock().await;
        let socket = workers
            .get_mut(worker)
            .ok_or_else(|| SchedulerError::UnknownWorker(worker.clone()))?;
        socket.send(bytes.into()).await?;
        tracing::debug!(worker = %worker, bounds = %op.bounds, "task dispatched");
        Ok(())
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use siebwerk_core::{Transport, WorkerId};
use siebwerk_sieve::sieve_partition;
use tokio::sync::Mutex;
use uuid::Uuid;
use zeromq::{PullSocket, PushSocket, Socket, SocketRecv, SocketSend};

use crate::error::SchedulerError;
use crate::message::Message;
use crate::protocol::{topics, SieveOutcome, SieveTask, WorkerGoodbye, WorkerHello};

/// Remote sieve worker: binds its own task socket, announces itself to
/// the coordinator, then sieves assigned partitions until told to stop.
///
/// The worker is stateless between tasks. Every assignment carries the
/// full seed prime list, so a worker can join or leave at any point
/// without the coordinator replaying history for it.
pub struct SieveWorker {
    id: WorkerId,
    tasks: Mutex<PullSocket>,
    results: Mutex<PushSocket>,
    task_endpoint: String,
    shutdown: AtomicBool,
}

impl SieveWorker {
    /// Bind the task socket and connect to the coordinator's result socket.
    pub async fn connect(
        id: WorkerId,
        task_transport: &Transport,
        results_transport: &Transport,
    ) -> Result<Self, SchedulerError> {
        task_transport
            .ensure_ipc_dir()
            .map_err(|e| SchedulerError::Transport(e.to_string()))?;
        task_transport
            .remove_stale_socket()
            .map_err(|e| SchedulerError::Transport(e.to_string()))?;

        let task_endpoint = task_transport.endpoint();
        let mut tasks = PullSocket::new();
        tasks.bind(&task_endpoint).await?;

        let mut results = PushSocket::new();
        results.connect(&results_transport.endpoint()).await?;

        tracing::info!(
            worker = %id,
            task_endpoint = %task_endpoint,
            results = %results_transport.endpoint(),
            "worker sockets ready"
        );

        Ok(Self {
            id,
            tasks: Mutex::new(tasks),
            results: Mutex::new(results),
            task_endpoint,
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    /// Signal the task loop to stop after its current poll.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    async fn push(&self, msg: Message) -> Result<(), SchedulerError> {
        let bytes = msg.to_bytes()?;
        self.results.lock().await.send(bytes.into()).await?;
        Ok(())
    }

    /// Announce this worker and its task endpoint to the coordinator.
    pub async fn hello(&self) -> Result<(), SchedulerError> {
        let hello = WorkerHello {
            worker: self.id.clone(),
            endpoint: self.task_endpoint.clone(),
        };
        self.push(Message::new(topics::WORKER_HELLO, &hello)?).await?;
        tracing::info!(worker = %self.id, "hello sent");
        Ok(())
    }

    /// Deregister gracefully.
    pub async fn goodbye(&self) -> Result<(), SchedulerError> {
        let goodbye = WorkerGoodbye {
            worker: self.id.clone(),
        };
        self.push(Message::new(topics::WORKER_GOODBYE, &goodbye)?)
            .await?;
        tracing::info!(worker = %self.id, "goodbye sent");
        Ok(())
    }

    /// Run the task loop: sieve every assigned partition and push the
    /// primes back, tagged with this worker's id.
    ///
    /// Returns when [`SieveWorker::shutdown`] is called.
    pub async fn run(&self) -> Result<(), SchedulerError> {
        let mut tasks = self.tasks.lock().await;
        tracing::info!(worker = %self.id, "task loop started");

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::info!(worker = %self.id, "task loop stopping");
                break;
            }

            let recv_result =
                tokio::time::timeout(Duration::from_millis(100), tasks.recv()).await;
            let raw = match recv_result {
                Ok(Ok(raw)) => raw,
                Ok(Err(e)) => {
                    tracing::warn!(worker = %self.id, error = %e, "task socket recv error");
                    continue;
                }
                Err(_) => continue,
            };

            let Some(bytes) = raw.get(0) else {
                tracing::warn!(worker = %self.id, "empty ZMQ frame dropped");
                continue;
            };
            let envelope = match Message::from_bytes(bytes.as_ref()) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(worker = %self.id, error = %e, "undecodable envelope dropped");
                    continue;
                }
            };

            if envelope.topic != topics::TASK_ASSIGN {
                tracing::warn!(worker = %self.id, topic = %envelope.topic, "unexpected topic dropped");
                continue;
            }
            let task: SieveTask = match envelope.decode() {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(worker = %self.id, error = %e, "malformed task dropped");
                    continue;
                }
            };

            let reply = outcome_envelope(&self.id, task, envelope.correlation_id).await?;
            self.push(reply).await?;
        }

        Ok(())
    }
}

/// Sieve one partition off the async runtime and wrap the outcome in a
/// result envelope carrying the task's correlation id, so logs can pair
/// each task with the reply it produced.
async fn outcome_envelope(
    worker: &WorkerId,
    task: SieveTask,
    correlation_id: Uuid,
) -> Result<Message, SchedulerError> {
    let bounds = task.bounds;
    tracing::debug!(worker = %worker, bounds = %bounds, seeds = task.seed_primes.len(), "sieving partition");

    let primes = tokio::task::spawn_blocking(move || sieve_partition(bounds, &task.seed_primes))
        .await
        .map_err(|e| SchedulerError::Transport(format!("sieve task panicked: {e}")))?;
    tracing::debug!(worker = %worker, bounds = %bounds, primes = primes.len(), "partition sieved");

    let outcome = SieveOutcome {
        worker: worker.clone(),
        primes,
    };
    Ok(Message::with_correlation(
        topics::TASK_RESULT,
        &outcome,
        correlation_id,
    )?)
}

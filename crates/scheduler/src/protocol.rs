use serde::{Deserialize, Serialize};
use siebwerk_core::{CandidateRange, WorkerId};

/// Envelope topics for coordinator/worker traffic.
pub mod topics {
    /// Worker announces itself and its task endpoint.
    pub const WORKER_HELLO: &str = "siebwerk.worker.hello";
    /// Worker leaves the pool.
    pub const WORKER_GOODBYE: &str = "siebwerk.worker.goodbye";
    /// Coordinator assigns one partition to a worker.
    pub const TASK_ASSIGN: &str = "siebwerk.task.assign";
    /// Worker returns the primes of its partition.
    pub const TASK_RESULT: &str = "siebwerk.task.result";
}

/// One partition of the candidate space, ready to sieve remotely.
///
/// `seed_primes` carries the full controller prime list in discovery
/// order — the coordinator buffers the (small) controller result once and
/// snapshots it into every task rather than streaming it per worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SieveTask {
    pub bounds: CandidateRange,
    pub seed_primes: Vec<u64>,
}

/// Primes found in one partition, tagged with the worker that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SieveOutcome {
    pub worker: WorkerId,
    pub primes: Vec<u64>,
}

/// Registration announcement: where the coordinator can reach this worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerHello {
    pub worker: WorkerId,
    /// ZeroMQ endpoint of the worker's task socket.
    pub endpoint: String,
}

/// Graceful deregistration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerGoodbye {
    pub worker: WorkerId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn task_roundtrips_through_an_envelope() {
        let task = SieveTask {
            bounds: CandidateRange::new(97, 200),
            seed_primes: vec![3, 5, 7, 11, 13],
        };
        let msg = Message::new(topics::TASK_ASSIGN, &task).unwrap();
        let decoded: SieveTask = msg.decode().unwrap();
        assert_eq!(decoded.bounds, task.bounds);
        assert_eq!(decoded.seed_primes, task.seed_primes);
    }

    #[test]
    fn outcome_keeps_worker_tag() {
        let outcome = SieveOutcome {
            worker: WorkerId::from("w-3"),
            primes: vec![97, 101, 103],
        };
        let msg = Message::new(topics::TASK_RESULT, &outcome).unwrap();
        let decoded: SieveOutcome = msg.decode().unwrap();
        assert_eq!(decoded.worker, WorkerId::from("w-3"));
        assert_eq!(decoded.primes, vec![97, 101, 103]);
    }
}

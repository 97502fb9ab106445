use std::sync::Arc;

use siebwerk_sieve::{controller_primes, first_odd_after, isqrt, partition_ranges};

use crate::broker::ClusterEngine;
use crate::completion::WorkError;
use crate::engine::WorkHandle;
use crate::protocol::SieveTask;

/// Drives a full prime discovery over the worker pool.
///
/// The coordinator computes the controller primes locally (the prefix up
/// to `isqrt(limit)` is tiny next to the tail), cuts the tail into fixed
/// partitions, submits every partition up front and then collects the
/// completion handles in submission order. Ordering therefore never
/// depends on which worker finished first.
pub struct ClusterCoordinator {
    engine: Arc<ClusterEngine>,
}

impl ClusterCoordinator {
    pub fn new(engine: Arc<ClusterEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<ClusterEngine> {
        &self.engine
    }

    /// All primes below `limit`, ascending, sieved across the pool.
    ///
    /// `partition_size` is the number of odd candidates per task. Fails
    /// with [`WorkError::WorkerLost`] if any partition's worker leaves
    /// before reporting, in which case the whole run is abandoned.
    pub async fn distribute(
        &self,
        limit: u64,
        partition_size: u64,
    ) -> Result<Vec<u64>, WorkError> {
        if limit <= 2 {
            return Ok(Vec::new());
        }

        let seeds = controller_primes(limit);
        let tail_start = first_odd_after(isqrt(limit));
        let parts = partition_ranges(tail_start, limit, partition_size);
        tracing::info!(
            limit,
            partition_size,
            seeds = seeds.len(),
            partitions = parts.len(),
            "distributing sieve"
        );

        // Submit everything before awaiting anything, so the queue is
        // full and idle workers are matched as fast as they appear.
        let handles: Vec<WorkHandle<Vec<u64>>> = parts
            .iter()
            .map(|&bounds| {
                self.engine.submit(SieveTask {
                    bounds,
                    seed_primes: seeds.clone(),
                })
            })
            .collect();

        let metrics = self.engine.metrics();
        tracing::debug!(
            in_flight = metrics.in_flight(),
            queue_depth = metrics.queue_depth,
            "partitions submitted"
        );

        let mut primes = Vec::with_capacity(seeds.len() + 1);
        primes.push(2);
        primes.extend_from_slice(&seeds);
        for handle in &handles {
            primes.extend(handle.wait().await?);
        }

        tracing::info!(limit, primes = primes.len(), "distribution complete");
        Ok(primes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siebwerk_core::WorkerId;
    use siebwerk_sieve::{sieve, sieve_partition};
    use tokio::sync::mpsc;

    use crate::channel::ChannelDispatcher;
    use crate::engine::MatchingEngine;
    use crate::events::BrokerEvent;

    // In-process stand-in for a remote worker: pull tasks off the channel
    // route, sieve them, report back through the engine's event entry point.
    fn spawn_local_worker(
        id: WorkerId,
        mut route: mpsc::UnboundedReceiver<SieveTask>,
        engine: Arc<ClusterEngine>,
    ) {
        tokio::spawn(async move {
            while let Some(task) = route.recv().await {
                let primes = sieve_partition(task.bounds, &task.seed_primes);
                engine.handle_event(BrokerEvent::ResultReady {
                    worker: id.clone(),
                    result: primes,
                });
            }
        });
    }

    fn pool_of(n: usize) -> (Arc<ClusterEngine>, ClusterCoordinator) {
        let dispatcher = Arc::new(ChannelDispatcher::new());
        let engine = Arc::new(MatchingEngine::new(dispatcher.clone()));
        for i in 0..n {
            let id = WorkerId::new(format!("worker-{i}"));
            let route = dispatcher.add_route(id.clone());
            spawn_local_worker(id.clone(), route, engine.clone());
            engine.register_worker(id);
        }
        (engine.clone(), ClusterCoordinator::new(engine))
    }

    #[tokio::test]
    async fn distributed_matches_sequential() {
        let (_, coordinator) = pool_of(3);
        for limit in [100, 1_000, 10_000] {
            let distributed = coordinator.distribute(limit, 64).await.unwrap();
            assert_eq!(distributed, sieve(limit), "limit {limit}");
        }
    }

    #[tokio::test]
    async fn single_worker_still_completes_everything() {
        let (engine, coordinator) = pool_of(1);
        let primes = coordinator.distribute(5_000, 32).await.unwrap();
        assert_eq!(primes, sieve(5_000));
        let m = engine.metrics();
        assert_eq!(m.units_completed, m.units_submitted);
        assert_eq!(m.queue_depth, 0);
    }

    #[tokio::test]
    async fn empty_limits_need_no_workers() {
        let dispatcher = Arc::new(ChannelDispatcher::<SieveTask>::new());
        let engine: Arc<ClusterEngine> = Arc::new(MatchingEngine::new(dispatcher));
        let coordinator = ClusterCoordinator::new(engine);
        assert!(coordinator.distribute(0, 64).await.unwrap().is_empty());
        assert!(coordinator.distribute(2, 64).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn partition_size_one_is_exact() {
        let (_, coordinator) = pool_of(2);
        let primes = coordinator.distribute(200, 1).await.unwrap();
        assert_eq!(primes, sieve(200));
    }
}

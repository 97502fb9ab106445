use serde::Serialize;

/// Snapshot of matching engine activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineMetrics {
    /// Units accepted by `submit`.
    pub units_submitted: u64,
    /// Units handed to the dispatcher.
    pub units_dispatched: u64,
    /// Units fulfilled with a result.
    pub units_completed: u64,
    /// Units failed (worker lost with work in flight).
    pub units_failed: u64,
    /// Results dropped because no busy worker matched their tag.
    pub results_dropped: u64,
    /// Units currently waiting for a worker.
    pub queue_depth: usize,
    /// Registered workers without work.
    pub idle_workers: usize,
    /// Registered workers with one unit in flight.
    pub busy_workers: usize,
}

impl EngineMetrics {
    /// Units somewhere between submit and completion.
    pub fn in_flight(&self) -> u64 {
        self.units_submitted - self.units_completed - self.units_failed
    }

    pub fn worker_count(&self) -> usize {
        self.idle_workers + self.busy_workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_flight_accounting() {
        let m = EngineMetrics {
            units_submitted: 10,
            units_completed: 6,
            units_failed: 1,
            ..Default::default()
        };
        assert_eq!(m.in_flight(), 3);
    }

    #[test]
    fn worker_count_sums_both_sets() {
        let m = EngineMetrics {
            idle_workers: 2,
            busy_workers: 3,
            ..Default::default()
        };
        assert_eq!(m.worker_count(), 5);
    }
}

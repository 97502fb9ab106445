use std::collections::{HashMap, HashSet, VecDeque};

use siebwerk_core::WorkerId;

use crate::completion::{CompletionSetter, WorkError};

/// One queued operation together with its completion setter.
///
/// Exclusively owned by the matching engine from enqueue until the setter
/// is either attached to a worker slot or fulfilled.
pub(crate) struct WorkUnit<O, R> {
    pub op: O,
    pub setter: CompletionSetter<Result<R, WorkError>>,
}

/// One addressable remote execution context.
pub(crate) struct WorkerSlot<R> {
    /// Setter of the unit currently in flight. `Some` iff the slot is busy.
    pub pending: Option<CompletionSetter<Result<R, WorkError>>>,
}

/// The single mutable aggregate behind the matching engine.
///
/// All transitions happen under one lock in [`crate::engine::MatchingEngine`];
/// nothing here is reachable from outside the crate.
///
/// Invariants: `idle` and `busy` are disjoint and together cover exactly
/// the keys of `workers`; a slot is in `busy` iff its `pending` is `Some`.
pub(crate) struct SchedulerState<O, R> {
    pub queue: VecDeque<WorkUnit<O, R>>,
    pub workers: HashMap<WorkerId, WorkerSlot<R>>,
    pub idle: HashSet<WorkerId>,
    pub busy: HashSet<WorkerId>,
}

impl<O, R> SchedulerState<O, R> {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            workers: HashMap::new(),
            idle: HashSet::new(),
            busy: HashSet::new(),
        }
    }

    /// Add an idle slot. Returns false if the id is already registered.
    pub fn register(&mut self, id: WorkerId) -> bool {
        if self.workers.contains_key(&id) {
            return false;
        }
        self.workers.insert(id.clone(), WorkerSlot { pending: None });
        self.idle.insert(id);
        true
    }

    /// Remove a slot entirely, returning it so the caller can inspect any
    /// in-flight work. Returns `None` for unknown ids.
    pub fn deregister(&mut self, id: &WorkerId) -> Option<WorkerSlot<R>> {
        let slot = self.workers.remove(id)?;
        self.idle.remove(id);
        self.busy.remove(id);
        Some(slot)
    }

    /// Atomically pair the queue head with some idle worker.
    ///
    /// Pops the head, marks an arbitrary idle worker busy, attaches the
    /// unit's setter to the slot, and hands back the operation for
    /// dispatch. `None` when the queue is empty or no worker is idle.
    pub fn take_match(&mut self) -> Option<(WorkerId, O)> {
        if self.queue.is_empty() || self.idle.is_empty() {
            return None;
        }
        let id = self.idle.iter().next().cloned()?;
        self.idle.remove(&id);
        self.busy.insert(id.clone());

        let unit = self.queue.pop_front().expect("queue checked non-empty");
        let slot = self.workers.get_mut(&id).expect("idle worker has a slot");
        slot.pending = Some(unit.setter);
        Some((id, unit.op))
    }

    /// Return a busy worker to idle, detaching its pending setter.
    /// `None` when the id is unknown or the worker was not busy.
    pub fn finish(&mut self, id: &WorkerId) -> Option<CompletionSetter<Result<R, WorkError>>> {
        if !self.busy.contains(id) {
            return None;
        }
        let slot = self.workers.get_mut(id)?;
        let setter = slot.pending.take();
        self.busy.remove(id);
        self.idle.insert(id.clone());
        setter
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    #[cfg(test)]
    pub fn check_invariants(&self) {
        assert!(
            self.idle.is_disjoint(&self.busy),
            "idle and busy overlap: {:?}",
            self.idle.intersection(&self.busy).collect::<Vec<_>>()
        );
        let all: HashSet<_> = self.idle.union(&self.busy).cloned().collect();
        let keys: HashSet<_> = self.workers.keys().cloned().collect();
        assert_eq!(all, keys, "idle ∪ busy must equal registered workers");
        for (id, slot) in &self.workers {
            if self.busy.contains(id) {
                assert!(slot.pending.is_some(), "busy worker {id} has no pending unit");
            } else {
                assert!(slot.pending.is_none(), "idle worker {id} holds a pending unit");
            }
        }
    }
}

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use siebwerk_core::WorkerId;
use tokio::sync::mpsc;

use crate::error::SchedulerError;
use crate::traits::WorkDispatcher;

/// In-process dispatcher backed by one mpsc channel per worker.
///
/// Used by tests and single-host runs where "remote" workers are plain
/// Tokio tasks. No serialization — operations cross the channel as values.
pub struct ChannelDispatcher<O> {
    routes: Mutex<HashMap<WorkerId, mpsc::UnboundedSender<O>>>,
}

impl<O> ChannelDispatcher<O> {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
        }
    }

    /// Open a route to a worker, returning the receiving end its task loop
    /// should drain. Replaces any previous route for the same id.
    pub fn add_route(&self, id: WorkerId) -> mpsc::UnboundedReceiver<O> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.lock().unwrap().insert(id, tx);
        rx
    }

    /// Drop the route for a worker. Its task loop sees channel close.
    pub fn remove_route(&self, id: &WorkerId) {
        self.routes.lock().unwrap().remove(id);
    }
}

impl<O> Default for ChannelDispatcher<O> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<O: Send + 'static> WorkDispatcher<O> for ChannelDispatcher<O> {
    async fn dispatch(&self, worker: &WorkerId, op: O) -> Result<(), SchedulerError> {
        let sender = {
            let routes = self.routes.lock().unwrap();
            routes
                .get(worker)
                .cloned()
                .ok_or_else(|| SchedulerError::UnknownWorker(worker.clone()))?
        };
        sender
            .send(op)
            .map_err(|_| SchedulerError::Transport(format!("route to {worker} closed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatch_reaches_the_routed_worker() {
        let dispatcher = ChannelDispatcher::new();
        let mut rx = dispatcher.add_route(WorkerId::from("w1"));

        dispatcher.dispatch(&WorkerId::from("w1"), 42u32).await.unwrap();
        assert_eq!(rx.recv().await, Some(42));
    }

    #[tokio::test]
    async fn dispatch_to_unrouted_worker_errors() {
        let dispatcher: ChannelDispatcher<u32> = ChannelDispatcher::new();
        let err = dispatcher
            .dispatch(&WorkerId::from("nowhere"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownWorker(_)));
    }

    #[tokio::test]
    async fn removed_route_closes_the_receiver() {
        let dispatcher: ChannelDispatcher<u32> = ChannelDispatcher::new();
        let mut rx = dispatcher.add_route(WorkerId::from("w1"));
        dispatcher.remove_route(&WorkerId::from("w1"));
        assert_eq!(rx.recv().await, None);
    }
}

use std::sync::{Arc, OnceLock};

use siebwerk_core::WorkerId;
use tokio::sync::Notify;

/// Failure delivered through a completion handle instead of a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkError {
    /// The worker holding this unit deregistered or became unreachable
    /// before returning a result. Partial progress in a lost worker is
    /// unrecoverable, so the submitter decides whether to resubmit.
    #[error("worker {worker} was lost before returning a result")]
    WorkerLost { worker: WorkerId },
}

struct Shared<T> {
    cell: OnceLock<T>,
    notify: Notify,
}

/// Create a linked setter/handle pair for one unit of work.
pub fn completion_pair<T>() -> (CompletionSetter<T>, CompletionHandle<T>) {
    let shared = Arc::new(Shared {
        cell: OnceLock::new(),
        notify: Notify::new(),
    });
    (
        CompletionSetter {
            shared: Arc::clone(&shared),
        },
        CompletionHandle { shared },
    )
}

/// Write side of a single-assignment future. Consumed by [`fulfill`],
/// so the value can be written at most once.
///
/// [`fulfill`]: CompletionSetter::fulfill
pub struct CompletionSetter<T> {
    shared: Arc<Shared<T>>,
}

impl<T> CompletionSetter<T> {
    /// Store the value and wake every waiter.
    pub fn fulfill(self, value: T) {
        let stored = self.shared.cell.set(value).is_ok();
        debug_assert!(stored, "completion cell written twice");
        self.shared.notify.notify_waiters();
    }
}

/// Read side of a single-assignment future.
///
/// Cloneable; any number of tasks may await the same handle, and the value
/// can be read repeatedly once set. Awaiting parks only the calling task —
/// never the scheduler that will eventually fulfill it. There is no
/// cancellation: a handle whose unit never completes waits forever.
pub struct CompletionHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for CompletionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone> CompletionHandle<T> {
    /// Wait until the value is set, then return a copy of it.
    pub async fn wait(&self) -> T {
        loop {
            // Register interest before checking, so a concurrent fulfill
            // between the check and the await cannot be missed.
            let notified = self.shared.notify.notified();
            if let Some(value) = self.shared.cell.get() {
                return value.clone();
            }
            notified.await;
        }
    }
}

impl<T> CompletionHandle<T> {
    /// Non-blocking read of the value, if already set.
    pub fn try_get(&self) -> Option<&T> {
        self.shared.cell.get()
    }

    pub fn is_fulfilled(&self) -> bool {
        self.shared.cell.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn fulfill_before_wait() {
        let (setter, handle) = completion_pair();
        setter.fulfill(42u64);
        assert_eq!(handle.wait().await, 42);
        assert_eq!(handle.try_get(), Some(&42));
    }

    #[tokio::test]
    async fn wait_before_fulfill() {
        let (setter, handle) = completion_pair::<u64>();
        let waiter = tokio::spawn({
            let handle = handle.clone();
            async move { handle.wait().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_fulfilled());
        setter.fulfill(7);

        assert_eq!(waiter.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn many_waiters_all_wake() {
        let (setter, handle) = completion_pair::<String>();
        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                tokio::spawn(async move { handle.wait().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(10)).await;
        setter.fulfill("done".to_string());

        for w in waiters {
            assert_eq!(w.await.unwrap(), "done");
        }
    }

    #[tokio::test]
    async fn value_is_readable_repeatedly() {
        let (setter, handle) = completion_pair();
        setter.fulfill(vec![2u64, 3, 5]);
        assert_eq!(handle.wait().await, vec![2, 3, 5]);
        assert_eq!(handle.wait().await, vec![2, 3, 5]);
    }

    #[tokio::test]
    async fn try_get_is_none_until_fulfilled() {
        let (_setter, handle) = completion_pair::<u64>();
        assert!(handle.try_get().is_none());
        assert!(!handle.is_fulfilled());
    }
}

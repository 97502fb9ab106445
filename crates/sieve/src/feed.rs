use std::sync::{Arc, Condvar, Mutex};

/// Single-producer, multi-consumer broadcast of controller primes.
///
/// Every published prime is appended to an in-memory log, so a reader
/// created at any point replays the full history in discovery order before
/// blocking for new items. The producer calls [`PrimeFeed::close`] exactly
/// once; readers then drain whatever remains and see end-of-feed.
#[derive(Clone)]
pub struct PrimeFeed {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    shared: Mutex<FeedShared>,
    cond: Condvar,
}

#[derive(Default)]
struct FeedShared {
    log: Vec<u64>,
    closed: bool,
}

impl PrimeFeed {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FeedInner {
                shared: Mutex::new(FeedShared::default()),
                cond: Condvar::new(),
            }),
        }
    }

    /// Append one prime and wake all blocked readers.
    pub fn publish(&self, prime: u64) {
        let mut shared = self.inner.shared.lock().unwrap();
        debug_assert!(!shared.closed, "publish after close");
        shared.log.push(prime);
        self.inner.cond.notify_all();
    }

    /// Mark the feed complete. Idempotent.
    pub fn close(&self) {
        let mut shared = self.inner.shared.lock().unwrap();
        shared.closed = true;
        self.inner.cond.notify_all();
    }

    /// New reader positioned at the start of the log.
    pub fn reader(&self) -> FeedReader {
        FeedReader {
            inner: Arc::clone(&self.inner),
            pos: 0,
        }
    }

}

impl Default for PrimeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// One consumer's cursor into a [`PrimeFeed`].
///
/// `next()` blocks the calling thread until a new prime is published or the
/// feed closes. Each reader independently sees every prime exactly once.
pub struct FeedReader {
    inner: Arc<FeedInner>,
    pos: usize,
}

impl Iterator for FeedReader {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let mut shared = self.inner.shared.lock().unwrap();
        loop {
            if self.pos < shared.log.len() {
                let prime = shared.log[self.pos];
                self.pos += 1;
                return Some(prime);
            }
            if shared.closed {
                return None;
            }
            shared = self.inner.cond.wait(shared).unwrap();
        }
    }
}

use serde::{Deserialize, Serialize};

/// Half-open interval of odd prime candidates `[start, end)`.
///
/// Only odd numbers inside the interval are candidates: `start`, `start + 2`,
/// `start + 4`, … below `end`. The interval is fixed at construction; there
/// is no resizing anywhere in the sieve pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRange {
    /// First candidate. Must be odd and at least 3.
    pub start: u64,
    /// Exclusive upper bound. May be even.
    pub end: u64,
}

impl CandidateRange {
    /// Create a range. Panics if `start` is even or below 3, or if the
    /// interval is inverted — these are programming errors in the caller's
    /// partitioning logic, never runtime conditions.
    pub fn new(start: u64, end: u64) -> Self {
        assert!(start >= 3, "candidate range must start at 3 or above, got {start}");
        assert!(start % 2 == 1, "candidate range must start on an odd number, got {start}");
        assert!(start <= end, "inverted candidate range [{start}, {end})");
        Self { start, end }
    }

    /// Number of odd candidates inside the interval.
    pub fn candidate_count(&self) -> usize {
        ((self.end - self.start).div_ceil(2)) as usize
    }

    /// Whether `n` is an odd number inside `[start, end)`.
    pub fn contains(&self, n: u64) -> bool {
        n % 2 == 1 && n >= self.start && n < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl std::fmt::Display for CandidateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Identity of one addressable remote execution context.
///
/// Workers pick their own id (typically hostname + index); the scheduler
/// treats it as an opaque key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorkerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

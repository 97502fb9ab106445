use siebwerk_core::CandidateRange;

use crate::bitsieve::BitSieve;

/// Split `[start, end)` into consecutive ranges of `size` odd candidates.
///
/// `start` must be odd; every partition after the first then starts on an
/// odd number automatically. The final partition may be shorter.
pub fn partition_ranges(start: u64, end: u64, size: u64) -> Vec<CandidateRange> {
    let size = size.max(1);
    let mut parts = Vec::new();
    let mut lo = start;
    while lo < end {
        let hi = lo.saturating_add(2 * size).min(end);
        parts.push(CandidateRange::new(lo, hi));
        lo = hi;
    }
    parts
}

/// Sieve one partition with a pre-computed controller prime list.
///
/// Allocates a local [`BitSieve`] over `bounds`, clears the multiples of
/// every seed prime, and returns the survivors in ascending order. Correct
/// whenever the seeds cover every prime up to `isqrt(bounds.end)`.
pub fn sieve_partition(bounds: CandidateRange, seed_primes: &[u64]) -> Vec<u64> {
    let mut sieve = BitSieve::new(bounds);
    for &p in seed_primes {
        sieve.clear_multiples(p, bounds.end);
    }
    sieve.surviving().collect()
}

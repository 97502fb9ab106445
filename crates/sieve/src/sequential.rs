use siebwerk_core::CandidateRange;

use crate::bitsieve::BitSieve;

/// Integer square root (largest `x` with `x² ≤ n`).
pub fn isqrt(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut x = (n as f64).sqrt() as u64;
    while x.saturating_mul(x) > n {
        x -= 1;
    }
    while (x + 1).saturating_mul(x + 1) <= n {
        x += 1;
    }
    x
}

/// First odd number strictly greater than `n`, at least 3.
pub fn first_odd_after(n: u64) -> u64 {
    let next = if n % 2 == 0 { n + 1 } else { n + 2 };
    next.max(3)
}

/// Odd primes up to and including `isqrt(limit)`, in ascending order.
///
/// These are the "controller" primes: clearing their multiples in any
/// sub-range of `[isqrt(limit), limit)` fully sieves that sub-range.
/// The prefix sieves itself — each discovered prime clears its own
/// multiples inside the prefix before the walk reaches them.
pub fn controller_primes(limit: u64) -> Vec<u64> {
    let s = isqrt(limit);
    let mut seed = Vec::new();
    if s >= 3 {
        let mut prefix = BitSieve::new(CandidateRange::new(3, s + 1));
        let mut n = 3;
        while n <= s {
            if prefix.is_prime(n) {
                seed.push(prefix.clear_multiples(n, s + 1));
            }
            n += 2;
        }
    }
    seed
}

/// All primes below `limit`, ascending, starting with 2.
///
/// Single-threaded two-stage sieve: a self-sieving prefix over
/// `[3, isqrt(limit)]` discovers the controller primes, then one tail
/// sieve over `[first odd > isqrt(limit), limit)` is cleared by every
/// controller prime before being filtered.
pub fn sieve(limit: u64) -> Vec<u64> {
    if limit <= 2 {
        return Vec::new();
    }

    let seed = controller_primes(limit);
    let mut primes = Vec::with_capacity(seed.len() + 1);
    primes.push(2);
    primes.extend_from_slice(&seed);

    let tail_start = first_odd_after(isqrt(limit));
    if tail_start < limit {
        let mut tail = BitSieve::new(CandidateRange::new(tail_start, limit));
        for &p in &seed {
            tail.clear_multiples(p, limit);
        }
        primes.extend(tail.surviving());
    }
    primes
}

use rayon::prelude::*;
use siebwerk_core::{CandidateRange, SieveSettings};
use tracing::debug;

use crate::bitsieve::BitSieve;
use crate::feed::PrimeFeed;
use crate::partition::{partition_ranges, sieve_partition};
use crate::sequential::{first_odd_after, isqrt};

/// All primes below `limit`, computed on a bounded thread pool.
///
/// A controller thread discovers the primes up to `isqrt(limit)` and
/// publishes each into a [`PrimeFeed`] as soon as it is found. The tail
/// `[first odd > isqrt(limit), limit)` is split into fixed-size partitions;
/// each partition worker drains its own feed reader, clears multiples
/// inside its local sub-range only, then filters. The parallel map is
/// ordered — results are joined first-started, not first-finished — so the
/// output is identical to [`crate::sequential::sieve`] for every `limit`
/// and partition size.
pub fn parallel_sieve(limit: u64, settings: &SieveSettings) -> Vec<u64> {
    if limit <= 2 {
        return Vec::new();
    }

    let s = isqrt(limit);
    let feed = PrimeFeed::new();

    // Controller runs off the pool so partition workers blocked on the feed
    // can never starve it.
    let controller = {
        let feed = feed.clone();
        std::thread::spawn(move || discover_controller_primes(s, &feed))
    };

    let tail_start = first_odd_after(s);
    let parts = partition_ranges(tail_start, limit, settings.partition_size.max(1));
    let threads = settings.resolved_threads();
    debug!(
        limit,
        partitions = parts.len(),
        threads,
        "parallel sieve starting"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .expect("failed to build sieve thread pool");

    let partition_lists: Vec<Vec<u64>> = pool.install(|| {
        parts
            .par_iter()
            .map(|&bounds| {
                let seeds: Vec<u64> = feed.reader().collect();
                sieve_partition(bounds, &seeds)
            })
            .collect()
    });

    let seed = controller
        .join()
        .expect("controller thread panicked");

    let mut primes = Vec::with_capacity(seed.len() + 1);
    primes.push(2);
    primes.extend(seed);
    for list in partition_lists {
        primes.extend(list);
    }
    primes
}

/// Self-sieving prefix walk over `[3, s]`, publishing each prime into the
/// feed the moment it is discovered. Closes the feed when done and returns
/// the full prefix for the caller's own output.
fn discover_controller_primes(s: u64, feed: &PrimeFeed) -> Vec<u64> {
    let mut seed = Vec::new();
    if s >= 3 {
        let mut prefix = BitSieve::new(CandidateRange::new(3, s + 1));
        let mut n = 3;
        while n <= s {
            if prefix.is_prime(n) {
                feed.publish(prefix.clear_multiples(n, s + 1));
                seed.push(n);
            }
            n += 2;
        }
    }
    feed.close();
    seed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequential::sieve;

    fn settings(threads: usize, partition_size: u64) -> SieveSettings {
        SieveSettings {
            threads,
            partition_size,
        }
    }

    #[test]
    fn matches_sequential_for_small_limits() {
        for limit in [0, 1, 2, 3, 4, 9, 10, 25, 100] {
            assert_eq!(
                parallel_sieve(limit, &settings(4, 8)),
                sieve(limit),
                "limit {limit}"
            );
        }
    }

    #[test]
    fn matches_sequential_across_partition_sizes() {
        let expected = sieve(10_000);
        for partition_size in [1, 7, 64, 4096, 100_000] {
            assert_eq!(
                parallel_sieve(10_000, &settings(4, partition_size)),
                expected,
                "partition size {partition_size}"
            );
        }
    }

    #[test]
    fn single_thread_pool_still_completes() {
        // One pool thread serializes the partitions; the controller runs on
        // its own thread so the feed always closes.
        assert_eq!(parallel_sieve(5_000, &settings(1, 100)), sieve(5_000));
    }

    #[test]
    fn larger_run_matches_pi() {
        assert_eq!(parallel_sieve(100_000, &settings(0, 1024)).len(), 9_592);
    }
}

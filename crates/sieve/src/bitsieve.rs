use siebwerk_core::CandidateRange;

const WORD_BITS: usize = 64;

/// Bit-packed primality table over the odd candidates of a [`CandidateRange`].
///
/// Bit `i` represents candidate `start + 2*i`. A set bit means "still
/// believed prime"; composites are cleared and never re-set. The table is
/// sized once at construction.
///
/// Caller precondition: `prime * prime` must not wrap for any prime handed
/// to [`BitSieve::clear_multiples`]. Limits near `u64::MAX` are not guarded.
pub struct BitSieve {
    range: CandidateRange,
    words: Vec<u64>,
    len: usize,
}

impl BitSieve {
    /// Allocate a sieve with every candidate flagged prime.
    pub fn new(range: CandidateRange) -> Self {
        let len = range.candidate_count();
        Self {
            range,
            words: vec![u64::MAX; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    pub fn range(&self) -> CandidateRange {
        self.range
    }

    /// Bit index of candidate `n`.
    ///
    /// Panics when `n` is even or outside the range — that is a bug in the
    /// caller's partitioning, not a runtime condition.
    pub fn index_of(&self, n: u64) -> usize {
        assert!(
            self.range.contains(n),
            "candidate {n} outside sieve range {}",
            self.range
        );
        ((n - self.range.start) / 2) as usize
    }

    /// Whether candidate `n` is still flagged prime.
    pub fn is_prime(&self, n: u64) -> bool {
        let i = self.index_of(n);
        self.words[i / WORD_BITS] & (1 << (i % WORD_BITS)) != 0
    }

    fn clear(&mut self, i: usize) {
        self.words[i / WORD_BITS] &= !(1 << (i % WORD_BITS));
    }

    /// Clear every odd multiple of `prime` below `limit`, starting at
    /// `max(prime², first odd multiple of prime inside the range)`.
    ///
    /// `prime` must be odd — the table holds no even candidates, and the
    /// odd-nudge below assumes an odd stride. 2 never reaches a sieve
    /// because even numbers are excluded by construction.
    ///
    /// Returns `prime` unchanged so discovery loops can emit and apply a
    /// prime in one expression.
    pub fn clear_multiples(&mut self, prime: u64, limit: u64) -> u64 {
        debug_assert!(prime % 2 == 1, "clear_multiples needs an odd prime, got {prime}");
        let limit = limit.min(self.range.end);

        // First multiple of `prime` at or above the range start, nudged to odd.
        let mut first = self.range.start.div_ceil(prime) * prime;
        if first % 2 == 0 {
            first += prime;
        }

        let mut n = first.max(prime * prime);
        while n < limit {
            let i = ((n - self.range.start) / 2) as usize;
            self.clear(i);
            n += 2 * prime;
        }
        prime
    }

    /// Candidates still flagged prime, in ascending order.
    pub fn surviving(&self) -> impl Iterator<Item = u64> + '_ {
        let start = self.range.start;
        (0..self.len)
            .filter(move |&i| self.words[i / WORD_BITS] & (1 << (i % WORD_BITS)) != 0)
            .map(move |i| start + 2 * i as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_sieve_flags_everything() {
        let s = BitSieve::new(CandidateRange::new(3, 20));
        for n in (3..20).step_by(2) {
            assert!(s.is_prime(n), "{n} should start flagged");
        }
    }

    #[test]
    fn clear_multiples_returns_its_prime() {
        let mut s = BitSieve::new(CandidateRange::new(3, 100));
        assert_eq!(s.clear_multiples(3, 100), 3);
    }

    #[test]
    fn small_primes_survive_their_own_pass() {
        // The stride starts at prime², so 3, 5, 7 keep their own flags.
        let mut s = BitSieve::new(CandidateRange::new(3, 100));
        for p in [3, 5, 7] {
            s.clear_multiples(p, 100);
        }
        let survivors: Vec<u64> = s.surviving().collect();
        let expected = vec![
            3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83,
            89, 97,
        ];
        assert_eq!(survivors, expected);
    }

    #[test]
    fn partition_respects_seed_squares() {
        // A tail partition seeded with controller primes must catch 11² and 13².
        let mut s = BitSieve::new(CandidateRange::new(97, 200));
        for p in [3, 5, 7, 11, 13] {
            s.clear_multiples(p, 200);
        }
        assert!(!s.is_prime(121), "121 = 11² must be composite");
        assert!(!s.is_prime(169), "169 = 13² must be composite");
        let survivors: Vec<u64> = s.surviving().collect();
        let expected = vec![
            97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179,
            181, 191, 193, 197, 199,
        ];
        assert_eq!(survivors, expected);
    }

    #[test]
    fn clear_multiples_honors_the_limit() {
        let mut s = BitSieve::new(CandidateRange::new(3, 100));
        s.clear_multiples(3, 20);
        assert!(!s.is_prime(9));
        assert!(!s.is_prime(15));
        // Beyond the limit nothing was touched.
        assert!(s.is_prime(21));
        assert!(s.is_prime(27));
    }

    #[test]
    #[should_panic(expected = "odd prime")]
    fn even_prime_is_rejected() {
        let mut s = BitSieve::new(CandidateRange::new(3, 100));
        s.clear_multiples(2, 100);
    }

    #[test]
    #[should_panic(expected = "outside sieve range")]
    fn even_candidate_panics() {
        let s = BitSieve::new(CandidateRange::new(3, 100));
        s.is_prime(10);
    }

    #[test]
    #[should_panic(expected = "outside sieve range")]
    fn out_of_range_candidate_panics() {
        let s = BitSieve::new(CandidateRange::new(3, 100));
        s.is_prime(101);
    }
}

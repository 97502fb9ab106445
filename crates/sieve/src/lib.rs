//! Partitionable Sieve of Eratosthenes over bit-packed odd candidates.
//!
//! The sieve runs in two stages: a small self-sieving prefix over
//! `[3, isqrt(limit)]` discovers the "controller" primes, and those primes
//! then clear composites in the tail `[isqrt(limit), limit)`. Because a
//! tail sub-range only needs the controller primes to sieve itself, the
//! tail partitions freely — across threads here, or across remote workers
//! via `siebwerk-scheduler`.

pub mod bitsieve;
pub mod feed;
pub mod parallel;
pub mod partition;
pub mod sequential;

pub use bitsieve::BitSieve;
pub use feed::{FeedReader, PrimeFeed};
pub use parallel::parallel_sieve;
pub use partition::{partition_ranges, sieve_partition};
pub use sequential::{controller_primes, first_odd_after, isqrt, sieve};

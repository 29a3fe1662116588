//! Fixed-memory latency histogram safe for concurrent recording.
//!
//! Log-linear bucketing: values are taken in microseconds; 0..=15 µs map to
//! exact buckets, and every power-of-two octave above that is split into 16
//! linear sub-buckets. A quantile estimate is the midpoint of the bucket it
//! lands in, so the relative error is bounded by half the sub-bucket width:
//! at most 1/32 (~3.2%) for any value of 16 µs or more. Everything above
//! ~19 hours clamps into the top bucket.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const SUB_BITS: u32 = 4;
const SUBS: usize = 1 << SUB_BITS;
const MAX_OCTAVE: u32 = 35;
const BUCKETS: usize = SUBS + (MAX_OCTAVE - SUB_BITS + 1) as usize * SUBS;

pub struct LatencyHistogram {
    buckets: Vec<AtomicU64>,
}

impl LatencyHistogram {
    pub fn new() -> Self {
        let mut buckets = Vec::with_capacity(BUCKETS);
        buckets.resize_with(BUCKETS, AtomicU64::default);
        Self { buckets }
    }

    pub fn record(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.buckets[bucket_index(micros)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Adds `other`'s counts into `self`.
    pub fn merge(&self, other: &LatencyHistogram) {
        for (mine, theirs) in self.buckets.iter().zip(other.buckets.iter()) {
            let n = theirs.load(Ordering::Relaxed);
            if n > 0 {
                mine.fetch_add(n, Ordering::Relaxed);
            }
        }
    }

    /// Approximate latency at quantile `q` in [0, 1]. `None` on an empty
    /// histogram. Non-decreasing in `q`.
    pub fn quantile(&self, q: f64) -> Option<Duration> {
        let counts: Vec<u64> = self
            .buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect();
        let total: u64 = counts.iter().sum();
        if total == 0 {
            return None;
        }

        let q = q.clamp(0., 1.);
        let target = ((q * total as f64).ceil() as u64).max(1);
        let mut seen = 0;
        for (idx, count) in counts.iter().enumerate() {
            seen += count;
            if seen >= target {
                return Some(Duration::from_micros(bucket_midpoint(idx)));
            }
        }
        // Unreachable while total > 0; the top bucket absorbs the remainder.
        Some(Duration::from_micros(bucket_midpoint(BUCKETS - 1)))
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

fn bucket_index(micros: u64) -> usize {
    if micros < SUBS as u64 {
        return micros as usize;
    }
    let octave = 63 - micros.leading_zeros();
    if octave > MAX_OCTAVE {
        return BUCKETS - 1;
    }
    let sub = ((micros >> (octave - SUB_BITS)) & (SUBS as u64 - 1)) as usize;
    SUBS + (octave - SUB_BITS) as usize * SUBS + sub
}

fn bucket_midpoint(index: usize) -> u64 {
    if index < SUBS {
        return index as u64;
    }
    let group = ((index - SUBS) / SUBS) as u32;
    let sub = ((index - SUBS) % SUBS) as u64;
    let width = 1u64 << group;
    let lower = (1u64 << (group + SUB_BITS)) + sub * width;
    lower + width / 2
}

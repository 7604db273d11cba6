//! Fallback seed sources.
//!
//! A seed is a millisecond count since the Unix epoch. The normalizer only asks
//! for one when a name normalizes to nothing, so the clock is off the hot path.

use std::sync::atomic::{AtomicU64, Ordering};

/// Milliseconds since the Unix epoch.
pub type FallbackSeed = u64;

/// Supplies fallback seeds for [`normalize_with`](crate::ident::normalize_with).
pub trait SeedSource: Send + Sync {
    fn next_seed(&self) -> FallbackSeed;
}

impl<S: SeedSource + ?Sized> SeedSource for &S {
    fn next_seed(&self) -> u64 {
        (**self).next_seed()
    }
}

/// Wall-clock milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SeedSource for SystemClock {
    fn next_seed(&self) -> u64 {
        // Clamp a pre-epoch clock to zero rather than wrapping.
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Always returns the same seed.
#[derive(Debug, Clone, Copy)]
pub struct FixedSeed(pub u64);

impl SeedSource for FixedSeed {
    fn next_seed(&self) -> u64 {
        self.0
    }
}

/// Strictly increasing seeds on top of any source.
///
/// Each call returns `max(source, previous + 1)`, so a batch that hits the
/// fallback many times within one millisecond still gets distinct identifiers.
#[derive(Debug, Default)]
pub struct MonotonicSeeds<S> {
    inner: S,
    last: AtomicU64,
}

impl<S: SeedSource> MonotonicSeeds<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            last: AtomicU64::new(0),
        }
    }
}

impl<S: SeedSource> SeedSource for MonotonicSeeds<S> {
    fn next_seed(&self) -> u64 {
        let candidate = self.inner.next_seed();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = candidate.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

//! Clocks used to stamp definition writes and cached decisions.

use std::sync::atomic::{AtomicU64, Ordering};

use tessera_types::Timestamp;

/// Source of logical timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Strictly increasing counter. Never yields the same value twice.
#[derive(Debug, Default)]
pub struct LogicalClock {
    last: AtomicU64,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts counting after `start`.
    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            last: AtomicU64::new(start.as_u64()),
        }
    }
}

impl Clock for LogicalClock {
    fn now(&self) -> Timestamp {
        let prev = self.last.fetch_add(1, Ordering::AcqRel);
        Timestamp::new(prev).next()
    }
}

/// Wall-clock nanoseconds, kept monotonic within the process.
#[derive(Debug, Default)]
pub struct WallClock {
    last: AtomicU64,
}

impl WallClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for WallClock {
    fn now(&self) -> Timestamp {
        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let next = Timestamp::now_monotonic(Some(Timestamp::new(last)));
            match self.last.compare_exchange_weak(
                last,
                next.as_u64(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Clock that only moves when told to. Lets tests produce equal stamps.
#[derive(Debug, Default)]
pub struct ManualClock {
    current: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: AtomicU64::new(start.as_u64()),
        }
    }

    pub fn set(&self, ts: Timestamp) {
        self.current.store(ts.as_u64(), Ordering::Release);
    }

    /// Moves the clock forward by one tick and returns the new value.
    pub fn advance(&self) -> Timestamp {
        let prev = self.current.fetch_add(1, Ordering::AcqRel);
        Timestamp::new(prev).next()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.current.load(Ordering::Acquire))
    }
}

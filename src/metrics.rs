use std::{
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
    time::Duration,
};

/// Statistics regarding the pool
#[derive(Debug, Default)]
pub struct PoolMetrics {
    total_leased: AtomicU64,
    total_waiting: AtomicU64,
    timeouts: AtomicUsize,
    contract_violations: AtomicUsize,
}

// 64bit microseconds is 580000 years - really not important
#[allow(clippy::cast_possible_truncation)]
impl PoolMetrics {
    pub(crate) fn record_waiting(&self, waited: Duration) {
        let waited = waited.as_micros() as u64;
        let _ = self.total_waiting.fetch_add(waited, Ordering::Relaxed);
    }

    pub(crate) fn record_leased(&self, held: Duration) {
        let held = held.as_micros() as u64;
        let _ = self.total_leased.fetch_add(held, Ordering::Relaxed);
    }

    pub(crate) fn record_timeout(&self) {
        let _ = self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_violation(&self) {
        let _ = self.contract_violations.fetch_add(1, Ordering::Relaxed);
    }
}

impl PoolMetrics {
    /// Get the total number of microseconds that slots were leased
    #[must_use]
    pub fn microseconds_leased(&self) -> u64 {
        self.total_leased.load(Ordering::Relaxed)
    }
    /// Get the total number of microseconds that callers were waiting for a slot
    #[must_use]
    pub fn microseconds_waiting(&self) -> u64 {
        self.total_waiting.load(Ordering::Relaxed)
    }
    /// Get the number of timed acquires that gave up without a slot
    #[must_use]
    pub fn timeout_count(&self) -> usize {
        self.timeouts.load(Ordering::Relaxed)
    }
    /// Get the number of releases rejected because the slot was not leased
    #[must_use]
    pub fn contract_violations(&self) -> usize {
        self.contract_violations.load(Ordering::Relaxed)
    }
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::timer::Timer;

/// Deterministic clock for tests. Time only moves when told to, and
/// `sleep` advances the clock instead of blocking, so session logic
/// driven by this timer runs instantly and reproducibly.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now_ns: Arc<AtomicU64>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    pub fn set_ns(&self, ns: u64) {
        self.now_ns.store(ns, Ordering::SeqCst);
    }
}

impl Timer for ManualTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_clock() {
        let timer = ManualTimer::new();
        let other = timer.clone();
        let ts = other.now();
        timer.advance_ms(250);
        assert_eq!(other.elapsed(ts), Duration::from_millis(250));
    }

    #[test]
    fn sleep_advances_instead_of_blocking() {
        let timer = ManualTimer::new();
        timer.sleep(Duration::from_secs(3600));
        assert_eq!(timer.now(), 3600 * 1_000_000_000);
    }
}

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;

/// Source of time for a token bucket
///
/// The accounting core only ever sees explicit instants; a clock is what the
/// convenience wrappers use to read "now" and to put the caller to sleep.
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;

    /// Suspend the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Real monotonic clock backed by `Instant::now` and `thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    #[inline(always)]
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

/// Virtual clock that only moves when told to
///
/// `sleep` advances the clock instead of blocking, so code built on the
/// blocking wrappers can be driven deterministically. Clones share the same
/// underlying time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Create a clock starting at the current real instant
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create a clock starting at `start`
    pub fn starting_at(start: Instant) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    /// Move the clock forward by `duration`
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock();
        *now += duration;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Signed nanoseconds from `start` to `now` (negative if `now` is earlier)
#[inline(always)]
pub(crate) fn signed_nanos_between(start: Instant, now: Instant) -> i128 {
    match now.checked_duration_since(start) {
        Some(elapsed) => elapsed.as_nanos() as i128,
        None => -(start.duration_since(now).as_nanos() as i128),
    }
}

/// Convert nanoseconds to a duration, clamping negatives to zero and
/// saturating at `Duration::MAX`
pub(crate) fn nanos_to_duration(nanos: i128) -> Duration {
    if nanos <= 0 {
        return Duration::ZERO;
    }
    let secs = nanos / 1_000_000_000;
    let subsec = (nanos % 1_000_000_000) as u32;
    match u64::try_from(secs) {
        Ok(secs) => Duration::new(secs, subsec),
        Err(_) => Duration::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock() {
        let clock = MonotonicClock;
        let t1 = clock.now();
        clock.sleep(Duration::from_millis(10));
        let t2 = clock.now();

        assert!(t2 - t1 >= Duration::from_millis(10));
    }

    #[test]
    fn test_manual_clock_sleep_advances() {
        let clock = ManualClock::new();
        let start = clock.now();

        clock.sleep(Duration::from_millis(250));
        assert_eq!(clock.now() - start, Duration::from_millis(250));

        // Clones share time
        let other = clock.clone();
        other.advance(Duration::from_secs(1));
        assert_eq!(clock.now() - start, Duration::from_millis(1250));
    }

    #[test]
    fn test_signed_nanos_between() {
        let start = Instant::now();
        let later = start + Duration::from_micros(3);

        assert_eq!(signed_nanos_between(start, later), 3_000);
        assert_eq!(signed_nanos_between(later, start), -3_000);
        assert_eq!(signed_nanos_between(start, start), 0);
    }

    #[test]
    fn test_nanos_to_duration() {
        assert_eq!(nanos_to_duration(-5), Duration::ZERO);
        assert_eq!(nanos_to_duration(1_500_000_001), Duration::new(1, 500_000_001));
        assert_eq!(nanos_to_duration(i128::MAX), Duration::MAX);
    }
}

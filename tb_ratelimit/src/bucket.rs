use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;

use crate::clock::Clock;
use crate::clock::MonotonicClock;
use crate::clock::nanos_to_duration;
use crate::clock::signed_nanos_between;
use crate::error::RateLimitError;
use crate::error::Result;
use crate::rate;

/// Wait budget meaning "wait as long as necessary"
pub const UNBOUNDED_WAIT: Duration = Duration::MAX;

/// Largest capacity or quantum a bucket accepts, so token counts fit an `i64`
pub const MAX_TOKENS: u64 = i64::MAX as u64;

/// Token bucket with lazy, tick-based replenishment
///
/// Every `fill_interval` the bucket gains `quantum` tokens, up to `capacity`.
/// Nothing runs in the background: the token count is brought up to date
/// from the elapsed tick count whenever the bucket is accessed.
///
/// Reservations may drive the count negative. The deficit is debt owed to
/// callers that were told how long to wait, and later reservations queue up
/// behind it.
#[derive(Debug)]
pub struct Bucket<C: Clock = MonotonicClock> {
    clock: C,

    /// Reference instant, all ticks are counted from here
    start_time: Instant,

    /// Maximum number of tokens the bucket holds
    capacity: u64,

    /// Tokens added per tick
    quantum: u64,

    /// Duration of one tick
    fill_interval: Duration,

    state: Mutex<TokenState>,
}

#[derive(Debug)]
struct TokenState {
    /// Tokens available as of `latest_tick`, negative while in debt
    available_tokens: i128,

    /// Tick at which `available_tokens` was last brought up to date
    latest_tick: i64,
}

impl TokenState {
    /// Bring the count up to date with `tick`
    ///
    /// A full bucket gains nothing, so idle time never banks tokens beyond
    /// capacity.
    #[inline]
    fn adjust(&mut self, tick: i64, capacity: u64, quantum: u64) {
        let last_tick = self.latest_tick;
        if tick <= last_tick {
            return;
        }
        self.latest_tick = tick;

        let capacity = capacity as i128;
        if self.available_tokens >= capacity {
            return;
        }

        let refill = ((tick - last_tick) as i128).saturating_mul(quantum as i128);
        self.available_tokens = self.available_tokens.saturating_add(refill).min(capacity);
    }
}

impl Bucket<MonotonicClock> {
    /// Bucket that fills one token every `fill_interval`, holding at most `capacity`
    ///
    /// # Panics
    /// Panics if `fill_interval` is zero, or if `capacity` is zero or above `i64::MAX`
    pub fn new(fill_interval: Duration, capacity: u64) -> Self {
        Self::new_with_clock(fill_interval, capacity, MonotonicClock)
    }

    /// Bucket that fills `quantum` tokens every `fill_interval`
    ///
    /// # Panics
    /// Panics if `fill_interval`, `quantum` or `capacity` is zero, or if
    /// `quantum` or `capacity` is above `i64::MAX`
    pub fn with_quantum(fill_interval: Duration, quantum: u64, capacity: u64) -> Self {
        Self::with_quantum_and_clock(fill_interval, quantum, capacity, MonotonicClock)
    }

    /// Bucket filling at approximately `rate` tokens per second
    ///
    /// The delivered rate is within [`rate::RATE_MARGIN`] of `rate`.
    ///
    /// # Panics
    /// Panics if `rate` is not a positive finite number, if no interval and
    /// quantum approximate it, or if `capacity` is zero or above `i64::MAX`
    pub fn with_rate(rate: f64, capacity: u64) -> Self {
        Self::with_rate_and_clock(rate, capacity, MonotonicClock)
    }
}

impl<C: Clock> Bucket<C> {
    /// [`Bucket::new`] on `clock`
    ///
    /// # Panics
    /// Panics if `fill_interval` is zero, or if `capacity` is zero or above `i64::MAX`
    pub fn new_with_clock(fill_interval: Duration, capacity: u64, clock: C) -> Self {
        Self::with_quantum_and_clock(fill_interval, 1, capacity, clock)
    }

    /// [`Bucket::with_quantum`] on `clock`
    ///
    /// # Panics
    /// Panics if `fill_interval`, `quantum` or `capacity` is zero, or if
    /// `quantum` or `capacity` is above `i64::MAX`
    pub fn with_quantum_and_clock(fill_interval: Duration, quantum: u64, capacity: u64, clock: C) -> Self {
        assert!(!fill_interval.is_zero(), "token bucket fill interval is not > 0");
        assert!(capacity > 0, "token bucket capacity is not > 0");
        assert!(quantum > 0, "token bucket quantum is not > 0");
        assert!(capacity <= MAX_TOKENS, "token bucket capacity is not <= i64::MAX");
        assert!(quantum <= MAX_TOKENS, "token bucket quantum is not <= i64::MAX");

        let start_time = clock.now();
        debug!(?fill_interval, quantum, capacity, "Created token bucket");

        Self {
            clock,
            start_time,
            capacity,
            quantum,
            fill_interval,
            state: Mutex::new(TokenState { available_tokens: capacity as i128, latest_tick: 0 }),
        }
    }

    /// [`Bucket::with_rate`] on `clock`
    ///
    /// # Panics
    /// Panics if `rate` is not a positive finite number, if no interval and
    /// quantum approximate it, or if `capacity` is zero or above `i64::MAX`
    pub fn with_rate_and_clock(rate: f64, capacity: u64, clock: C) -> Self {
        assert!(rate.is_finite() && rate > 0.0, "token bucket rate is not > 0");
        let Some((fill_interval, quantum)) = rate::solve(rate) else {
            panic!("cannot find suitable quantum for {rate}");
        };
        debug!(rate, ?fill_interval, quantum, "Solved token bucket rate");
        Self::with_quantum_and_clock(fill_interval, quantum, capacity, clock)
    }

    /// Maximum number of tokens the bucket holds
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Tokens added per fill interval
    pub fn quantum(&self) -> u64 {
        self.quantum
    }

    /// Time between refills
    pub fn fill_interval(&self) -> Duration {
        self.fill_interval
    }

    /// Instant the bucket's ticks are counted from
    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    /// Fill rate in tokens per second
    pub fn rate(&self) -> f64 {
        rate::effective_rate(self.fill_interval, self.quantum)
    }

    /// Number of whole fill intervals between the start time and `now`
    ///
    /// Negative if `now` precedes the start time.
    pub fn current_tick(&self, now: Instant) -> i64 {
        let elapsed = signed_nanos_between(self.start_time, now);
        let tick = elapsed.div_euclid(self.fill_interval.as_nanos() as i128);
        tick.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /// Reserve `count` tokens as of `now`
    ///
    /// Returns the time the caller must wait before the tokens may be used,
    /// or `None` if that wait would exceed `max_wait`. A `None` leaves the
    /// bucket exactly as if the call had not been made, apart from bringing
    /// the token count up to date with `now`.
    pub fn reserve(&self, now: Instant, count: u64, max_wait: Duration) -> Option<Duration> {
        self.reserve_within(now, count, max_wait).ok()
    }

    /// [`reserve`](Self::reserve), reporting the wait that was refused
    fn reserve_within(&self, now: Instant, count: u64, max_wait: Duration) -> std::result::Result<Duration, Duration> {
        if count == 0 {
            return Ok(Duration::ZERO);
        }

        let tick = self.current_tick(now);
        let mut state = self.state.lock();
        state.adjust(tick, self.capacity, self.quantum);

        let avail = state.available_tokens.saturating_sub(count as i128);
        if avail >= 0 {
            state.available_tokens = avail;
            return Ok(Duration::ZERO);
        }

        // Round the deficit up to whole ticks past the latest tick, which is
        // ahead of `tick` when a caller with a later `now` took the lock first
        let deficit = -avail;
        let quantum = self.quantum as i128;
        let needed_ticks = deficit / quantum + i128::from(deficit % quantum != 0);
        let end_tick = (state.latest_tick as i128).saturating_add(needed_ticks);

        let end_nanos = end_tick.saturating_mul(self.fill_interval.as_nanos() as i128);
        let wait = nanos_to_duration(end_nanos.saturating_sub(signed_nanos_between(self.start_time, now)));
        if wait > max_wait {
            drop(state);
            trace!(count, ?wait, ?max_wait, "Reservation exceeds wait budget");
            return Err(wait);
        }

        state.available_tokens = avail;
        drop(state);
        trace!(count, ?wait, debt = %deficit, "Reserved tokens on credit");
        Ok(wait)
    }

    /// Take up to `count` tokens that are available as of `now`
    ///
    /// Returns the number taken. Never waits and never goes into debt.
    pub fn consume_available(&self, now: Instant, count: u64) -> u64 {
        if count == 0 {
            return 0;
        }

        let tick = self.current_tick(now);
        let mut state = self.state.lock();
        state.adjust(tick, self.capacity, self.quantum);

        if state.available_tokens <= 0 {
            return 0;
        }
        let taken = state.available_tokens.min(count as i128);
        state.available_tokens -= taken;
        taken as u64
    }

    /// Token count as of `now`, negative while reservations are outstanding
    pub fn available_at(&self, now: Instant) -> i64 {
        let tick = self.current_tick(now);
        let mut state = self.state.lock();
        state.adjust(tick, self.capacity, self.quantum);
        state.available_tokens.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /// Current token count, negative while reservations are outstanding
    pub fn available(&self) -> i64 {
        self.available_at(self.clock.now())
    }

    /// Reserve `count` tokens, returning how long to wait before using them
    pub fn take(&self, count: u64) -> Duration {
        self.reserve(self.clock.now(), count, UNBOUNDED_WAIT).unwrap_or(UNBOUNDED_WAIT)
    }

    /// Reserve `count` tokens only if they become available within `max_wait`
    ///
    /// Returns the wait on success. On `None` nothing was reserved.
    pub fn take_max_duration(&self, count: u64, max_wait: Duration) -> Option<Duration> {
        self.reserve(self.clock.now(), count, max_wait)
    }

    /// Like [`take_max_duration`](Self::take_max_duration) but as a `Result`
    ///
    /// The error carries the wait the reservation would have needed.
    pub fn try_take(&self, count: u64, max_wait: Duration) -> Result<Duration> {
        self.reserve_within(self.clock.now(), count, max_wait).map_err(|required| RateLimitError::WaitExceeded { required, max_wait })
    }

    /// Take up to `count` immediately available tokens, returning the number taken
    pub fn take_available(&self, count: u64) -> u64 {
        self.consume_available(self.clock.now(), count)
    }

    /// Block until `count` tokens are available, then consume them
    pub fn wait(&self, count: u64) {
        let wait = self.take(count);
        if !wait.is_zero() {
            self.clock.sleep(wait);
        }
    }

    /// Block for at most `max_wait` to consume `count` tokens
    ///
    /// Returns `false` immediately, without sleeping or consuming, if the
    /// tokens would not be available in time.
    pub fn wait_max_duration(&self, count: u64, max_wait: Duration) -> bool {
        match self.take_max_duration(count, max_wait) {
            Some(wait) => {
                if !wait.is_zero() {
                    self.clock.sleep(wait);
                }
                true
            }
            None => false,
        }
    }

    /// Asynchronously wait until `count` tokens are available, then consume them
    ///
    /// The tokens are reserved before the first poll returns; dropping the
    /// future afterwards does not give them back.
    ///
    /// The wait is measured on the bucket's clock but slept on the tokio
    /// timer, so [`Clock::sleep`] is not called. A [`ManualClock`](crate::ManualClock)
    /// bucket has to be advanced by the caller; in tests pair it with a
    /// paused tokio runtime, or use the monotonic clock.
    pub async fn wait_async(&self, count: u64) {
        let wait = self.take(count);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    /// Asynchronous [`wait_max_duration`](Self::wait_max_duration)
    ///
    /// Sleeps on the tokio timer like [`wait_async`](Self::wait_async).
    pub async fn wait_max_duration_async(&self, count: u64, max_wait: Duration) -> bool {
        match self.take_max_duration(count, max_wait) {
            Some(wait) => {
                if !wait.is_zero() {
                    tokio::time::sleep(wait).await;
                }
                true
            }
            None => false,
        }
    }
}

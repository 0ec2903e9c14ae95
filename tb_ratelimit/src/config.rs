use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::bucket::Bucket;
use crate::bucket::MAX_TOKENS;
use crate::clock::Clock;
use crate::clock::MonotonicClock;
use crate::error::RateLimitError;
use crate::error::Result;
use crate::rate;

/// Declarative token bucket settings, e.g. loaded from a config file
///
/// Exactly one of `rate` or `fill_interval_ms` must be set. `quantum` may
/// only accompany `fill_interval_ms`; with `rate` it is solved for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Maximum burst size in tokens
    pub capacity: u64,

    /// Target rate in tokens per second
    #[serde(default)]
    pub rate: Option<f64>,

    /// Explicit fill interval in milliseconds
    #[serde(default)]
    pub fill_interval_ms: Option<u64>,

    /// Tokens added per fill interval (default: 1)
    #[serde(default)]
    pub quantum: Option<u64>,
}

/// Resolved bucket parameters
#[derive(Debug, Clone, Copy, PartialEq)]
struct Resolved {
    fill_interval: Duration,
    quantum: u64,
    capacity: u64,
}

impl BucketConfig {
    /// Settings for a bucket filling at `rate` tokens per second
    pub fn with_rate(rate: f64, capacity: u64) -> Self {
        Self { capacity, rate: Some(rate), fill_interval_ms: None, quantum: None }
    }

    /// Settings for a bucket adding `quantum` tokens every `fill_interval_ms`
    pub fn with_interval(fill_interval_ms: u64, quantum: u64, capacity: u64) -> Self {
        Self { capacity, rate: None, fill_interval_ms: Some(fill_interval_ms), quantum: Some(quantum) }
    }

    /// Check the settings without building a bucket
    pub fn validate(&self) -> Result<()> {
        self.resolve().map(|_| ())
    }

    /// Build a bucket on the real clock
    pub fn build(&self) -> Result<Bucket> {
        self.build_with_clock(MonotonicClock)
    }

    /// Build a bucket on `clock`
    pub fn build_with_clock<C: Clock>(&self, clock: C) -> Result<Bucket<C>> {
        let resolved = self.resolve()?;
        Ok(Bucket::with_quantum_and_clock(resolved.fill_interval, resolved.quantum, resolved.capacity, clock))
    }

    fn resolve(&self) -> Result<Resolved> {
        if self.capacity == 0 {
            return Err(RateLimitError::InvalidConfig("capacity must be greater than 0"));
        }
        if self.capacity > MAX_TOKENS {
            return Err(RateLimitError::InvalidConfig("capacity must not exceed i64::MAX"));
        }

        match (self.rate, self.fill_interval_ms) {
            (Some(_), Some(_)) => Err(RateLimitError::InvalidConfig("rate and fill_interval_ms are mutually exclusive")),
            (None, None) => Err(RateLimitError::InvalidConfig("one of rate or fill_interval_ms must be set")),
            (Some(rate), None) => {
                if self.quantum.is_some() {
                    return Err(RateLimitError::InvalidConfig("quantum cannot be set together with rate"));
                }
                if !rate.is_finite() || rate <= 0.0 {
                    return Err(RateLimitError::InvalidConfig("rate must be greater than 0"));
                }
                let (fill_interval, quantum) =
                    rate::solve(rate).ok_or(RateLimitError::InvalidConfig("rate cannot be approximated by a fill interval and quantum"))?;
                Ok(Resolved { fill_interval, quantum, capacity: self.capacity })
            }
            (None, Some(fill_interval_ms)) => {
                if fill_interval_ms == 0 {
                    return Err(RateLimitError::InvalidConfig("fill_interval_ms must be greater than 0"));
                }
                let quantum = self.quantum.unwrap_or(1);
                if quantum == 0 {
                    return Err(RateLimitError::InvalidConfig("quantum must be greater than 0"));
                }
                if quantum > MAX_TOKENS {
                    return Err(RateLimitError::InvalidConfig("quantum must not exceed i64::MAX"));
                }
                Ok(Resolved { fill_interval: Duration::from_millis(fill_interval_ms), quantum, capacity: self.capacity })
            }
        }
    }
}

use std::time::Duration;

/// Maximum relative error allowed between a requested rate and the rate a
/// solved `(fill_interval, quantum)` pair actually delivers
pub const RATE_MARGIN: f64 = 0.01;

/// Upper bound on the quantum search
const MAX_QUANTUM: u64 = 1 << 50;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Tokens per second delivered by adding `quantum` tokens every `fill_interval`
#[inline]
pub fn effective_rate(fill_interval: Duration, quantum: u64) -> f64 {
    quantum as f64 * NANOS_PER_SEC / fill_interval.as_nanos() as f64
}

/// Find a `(fill_interval, quantum)` pair approximating `rate` tokens/sec
///
/// Low rates are met with a quantum of one and a long interval. High rates
/// need larger quanta because the interval cannot go below one nanosecond,
/// so the quantum grows geometrically until the rounded interval gets the
/// delivered rate within [`RATE_MARGIN`].
///
/// Returns `None` for non-positive or non-finite rates and for rates whose
/// interval does not fit a `Duration` even at quantum one.
pub fn solve(rate: f64) -> Option<(Duration, u64)> {
    if !rate.is_finite() || rate <= 0.0 {
        return None;
    }

    let mut quantum = 1;
    while quantum < MAX_QUANTUM {
        let nanos = (NANOS_PER_SEC * quantum as f64 / rate).round();
        if nanos >= 1.0 && nanos < u64::MAX as f64 {
            let fill_interval = Duration::from_nanos(nanos as u64);
            let diff = (effective_rate(fill_interval, quantum) - rate).abs();
            if diff / rate <= RATE_MARGIN {
                return Some((fill_interval, quantum));
            }
        }
        quantum = next_quantum(quantum);
    }

    None
}

/// Grow by roughly 10%, always by at least one
#[inline]
fn next_quantum(quantum: u64) -> u64 {
    let next = quantum * 11 / 10;
    if next == quantum {
        next + 1
    } else {
        next
    }
}

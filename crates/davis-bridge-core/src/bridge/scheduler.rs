//! Poll scheduling
//!
//! Polls land on multiples of the interval (every hour on the hour for an
//! interval of 3600) instead of drifting from the moment the bridge
//! started.

/// Interval used when zero is configured
pub const DEFAULT_INTERVAL_SECS: u64 = 600;

/// Interval with zero coerced to [`DEFAULT_INTERVAL_SECS`]
pub fn effective_interval(interval: u64) -> u64 {
    if interval == 0 {
        DEFAULT_INTERVAL_SECS
    } else {
        interval
    }
}

/// Smallest multiple of `interval` strictly after `now` (Unix seconds)
pub fn next_due(now: u64, interval: u64) -> u64 {
    let interval = effective_interval(interval);
    (now / interval) * interval + interval
}

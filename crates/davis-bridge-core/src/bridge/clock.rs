//! Wall clock for scheduling
//!
//! Poll times are Unix seconds, but waits run on the tokio clock. The
//! system clock is read afresh on every call, so a stepped wall clock
//! (NTP after boot, manual correction) moves the next boundary with it.
//! The anchored clock advances with tokio time only and exists for paused
//! tests.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

/// Source of Unix time for the poll schedule
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    /// The operating system's wall clock
    System,
    /// A fixed Unix time advanced by the tokio clock
    Anchored {
        /// Unix time in milliseconds at `anchor`
        wall_ms: u64,
        /// Tokio instant matching `wall_ms`
        anchor: Instant,
    },
}

impl Clock {
    /// The operating system's wall clock
    pub fn system() -> Self {
        Clock::System
    }

    /// Anchor at a fixed Unix time in seconds
    pub fn starting_at(unix_secs: u64) -> Self {
        Clock::Anchored {
            wall_ms: unix_secs.saturating_mul(1000),
            anchor: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        match self {
            Clock::System => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
            Clock::Anchored { wall_ms, anchor } => wall_ms + anchor.elapsed().as_millis() as u64,
        }
    }

    /// Current Unix time in seconds
    pub fn now(&self) -> u64 {
        self.now_ms() / 1000
    }

    /// Instant at which Unix time `unix_secs` begins, measured from now.
    /// Times in the past resolve to now.
    pub fn instant_at(&self, unix_secs: u64) -> Instant {
        let target_ms = unix_secs.saturating_mul(1000);
        Instant::now() + Duration::from_millis(target_ms.saturating_sub(self.now_ms()))
    }
}

//! Connection state

use serde::{Deserialize, Serialize};

use super::scheduler::{effective_interval, next_due};

/// State shared by the bridge loop and the reconnection policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    /// The station answered the last poll
    pub online: bool,
    /// Unix time of the next scheduled poll
    pub next_poll_due: u64,
    /// Poll interval in seconds, never zero
    pub poll_interval: u64,
    /// Controller number for log lines
    pub controller_id: i32,
}

impl ConnectionState {
    /// State with the first poll due at `now`
    pub fn new(controller_id: i32, interval: u64, now: u64) -> Self {
        Self {
            online: true,
            next_poll_due: now,
            poll_interval: effective_interval(interval),
            controller_id,
        }
    }

    /// Whether a poll should run at `now`
    pub fn poll_due(&self, now: u64) -> bool {
        now >= self.next_poll_due
    }

    /// Schedule the poll after `now`
    pub fn schedule_next_poll(&mut self, now: u64) {
        self.next_poll_due = next_due(now, self.poll_interval);
    }

    /// Change the interval; an earlier boundary of the new interval pulls
    /// the next poll forward. Returns the interval in effect.
    pub fn set_interval(&mut self, interval: u64, now: u64) -> u64 {
        self.poll_interval = effective_interval(interval);
        self.next_poll_due = self.next_poll_due.min(next_due(now, self.poll_interval));
        self.poll_interval
    }
}

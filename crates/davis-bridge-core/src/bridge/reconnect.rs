//! Reconnection policy
//!
//! When a poll goes unanswered the port is closed and reopened until it
//! opens again. Only the first loss after a period of good data raises a
//! warning; the link stays offline until the station answers again.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use super::ConnectionState;
use crate::config::LinkTiming;
use crate::protocol::{DeviceLink, SerialTransport};

/// What happened during one reconnect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconnectReport {
    /// The offline warning was raised by this call
    pub warned: bool,
    /// Reopen attempts that failed before the port opened
    pub failed_reopens: u32,
}

/// Close/reopen schedule for a lost link
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Pause between closing and reopening
    reopen_delay: Duration,
    /// Extra pause after a failed reopen
    retry_delay: Duration,
}

impl ReconnectPolicy {
    /// Policy with explicit delays
    pub fn new(reopen_delay: Duration, retry_delay: Duration) -> Self {
        Self {
            reopen_delay,
            retry_delay,
        }
    }

    /// Policy from link timing
    pub fn from_timing(timing: &LinkTiming) -> Self {
        Self::new(timing.reopen_delay(), timing.reopen_retry())
    }

    /// The station did not answer a poll. Marks the link offline and
    /// reopens the port, retrying until it opens.
    pub async fn on_link_lost<T: SerialTransport>(
        &self,
        state: &mut ConnectionState,
        link: &mut DeviceLink<T>,
    ) -> ReconnectReport {
        let mut report = ReconnectReport::default();
        if state.online {
            warn!(
                controller = state.controller_id,
                "No data for last period .. reopening port"
            );
            state.online = false;
            report.warned = true;
        }

        loop {
            link.close();
            sleep(self.reopen_delay).await;
            match link.reopen().await {
                Ok(()) => break,
                Err(e) => {
                    error!(
                        controller = state.controller_id,
                        "Failed to re-open {}: {}",
                        link.transport().name(),
                        e
                    );
                    report.failed_reopens += 1;
                    sleep(self.retry_delay).await;
                }
            }
        }
        report
    }

    /// The station answered. Returns true on the transition back online.
    pub fn on_data(&self, state: &mut ConnectionState) -> bool {
        if state.online {
            return false;
        }
        state.online = true;
        info!(controller = state.controller_id, "Station back online");
        true
    }
}

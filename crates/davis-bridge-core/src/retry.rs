//! Bounded retries
//!
//! A [`RetryBudget`] is created for one blocking I/O operation and threaded
//! through it. Each failed attempt spends one unit and pauses before the
//! next; spending the last unit turns the failure into [`Exhausted`].

use std::time::Duration;

use thiserror::Error;

/// All attempts of a budget were used up
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("gave up after {attempts} attempts")]
pub struct Exhausted {
    /// Number of attempts made
    pub attempts: u32,
}

/// Attempts left for a single operation
#[derive(Debug, Clone)]
pub struct RetryBudget {
    attempts: u32,
    remaining: u32,
    pause: Duration,
}

impl RetryBudget {
    /// Budget of `attempts` tries (at least one) with `pause` between them
    pub fn new(attempts: u32, pause: Duration) -> Self {
        let attempts = attempts.max(1);
        Self {
            attempts,
            remaining: attempts,
            pause,
        }
    }

    /// Attempts not yet spent
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Total attempts this budget allows
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record a failed attempt. Pauses and returns `Ok` if another attempt
    /// is allowed.
    pub async fn spend(&mut self) -> Result<(), Exhausted> {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            return Err(Exhausted {
                attempts: self.attempts,
            });
        }
        tokio::time::sleep(self.pause).await;
        Ok(())
    }
}

//! Device link
//!
//! Owns the serial transport and the accumulation buffer for the current
//! poll or command cycle. Replies are collected one byte at a time under an
//! inter-byte timeout; a short read is an ordinary outcome that the caller
//! judges against the expected frame length.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, trace, warn};

use super::{LinkError, SerialTransport, MAX_PACKET_SIZE};
use crate::config::LinkTiming;
use crate::retry::RetryBudget;

/// Consecutive zero-byte reads tolerated within one tolerant read
const DEAD_READ_ATTEMPTS: u32 = 3;

/// Serial link to the station console
pub struct DeviceLink<T: SerialTransport> {
    /// Underlying transport
    transport: T,
    /// Bytes collected in the current cycle
    buffer: Vec<u8>,
    /// Link timing parameters
    timing: LinkTiming,
}

impl<T: SerialTransport> DeviceLink<T> {
    /// Wrap an open transport
    pub fn new(transport: T, timing: LinkTiming) -> Self {
        Self {
            transport,
            buffer: Vec::with_capacity(MAX_PACKET_SIZE),
            timing,
        }
    }

    /// Bytes collected so far in this cycle
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Start a new cycle with an empty buffer
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Link timing parameters
    pub fn timing(&self) -> &LinkTiming {
        &self.timing
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Wake the console: send a newline and wait for the 2-byte echo.
    ///
    /// Returns [`LinkError::Timeout`] once every attempt went unanswered.
    pub async fn wakeup(&mut self) -> Result<(), LinkError> {
        let wait = self.timing.wakeup_timeout();
        for attempt in 1..=self.timing.wakeup_attempts.max(1) {
            if let Err(e) = self.send_command("\n").await {
                debug!("Wakeup attempt {}: {}", attempt, e);
                continue;
            }

            let mut echo = [0u8; 2];
            let mut got = 0;
            let transport = &mut self.transport;
            let outcome = timeout(wait, async {
                while got < echo.len() {
                    match transport.read(&mut echo[got..]).await? {
                        0 => return Err(LinkError::Dead),
                        n => got += n,
                    }
                }
                Ok(())
            })
            .await;

            match outcome {
                Ok(Ok(())) => {
                    trace!("Wakeup echo {:02x?}", echo);
                    return Ok(());
                }
                Ok(Err(e)) => debug!("Wakeup attempt {}: {}", attempt, e),
                Err(_) if got == 1 => debug!(
                    "Wakeup attempt {}: only read 1 byte ({:#04x})",
                    attempt, echo[0]
                ),
                Err(_) => debug!("Wakeup attempt {}: no echo within {:?}", attempt, wait),
            }
        }
        Err(LinkError::Timeout(wait))
    }

    /// Write a command, retrying only the unwritten remainder of a short
    /// write until the write budget is spent.
    pub async fn send_command(&mut self, text: &str) -> Result<(), LinkError> {
        let mut budget = RetryBudget::new(
            self.timing.write_attempts,
            self.timing.write_retry_delay(),
        );
        let mut remaining = text.as_bytes();
        trace!("Sending {} bytes: {:?}", remaining.len(), text);

        loop {
            match self.transport.write(remaining).await {
                Ok(n) if n >= remaining.len() => return Ok(()),
                Ok(n) => {
                    debug!("Serial wrote {} of {} bytes", n, remaining.len());
                    remaining = &remaining[n..];
                }
                Err(e) => debug!("Serial write failed: {}", e),
            }
            if let Err(exhausted) = budget.spend().await {
                return Err(LinkError::WriteExhausted {
                    attempts: exhausted.attempts,
                });
            }
        }
    }

    /// Wait for the console to start answering. The first byte is kept in
    /// the cycle buffer.
    pub async fn await_response(&mut self, wait: Duration) -> Result<(), LinkError> {
        let mut byte = [0u8; 1];
        match timeout(wait, self.transport.read(&mut byte)).await {
            Err(_) => Err(LinkError::Timeout(wait)),
            Ok(Err(e)) => Err(LinkError::IoError(e)),
            Ok(Ok(0)) => {
                // Readable but empty: the port needs reopening, but the
                // console did signal readiness.
                self.revive().await;
                Ok(())
            }
            Ok(Ok(_)) => {
                self.buffer.push(byte[0]);
                Ok(())
            }
        }
    }

    /// Accumulate bytes until the buffer holds `max_bytes` or no byte
    /// arrives within `idle_timeout`. Returns the number of bytes held;
    /// a short count is not an error.
    pub async fn read_tolerant(&mut self, max_bytes: usize, idle_timeout: Duration) -> usize {
        let mut dead_budget = DEAD_READ_ATTEMPTS;
        let mut byte = [0u8; 1];

        while self.buffer.len() < max_bytes {
            match timeout(idle_timeout, self.transport.read(&mut byte)).await {
                Err(_) => {
                    trace!("Got {} bytes before timeout", self.buffer.len());
                    break;
                }
                Ok(Ok(0)) => {
                    dead_budget -= 1;
                    if dead_budget == 0 || !self.revive().await {
                        break;
                    }
                }
                Ok(Ok(_)) => {
                    dead_budget = DEAD_READ_ATTEMPTS;
                    self.buffer.push(byte[0]);
                }
                Ok(Err(e)) => {
                    warn!("Serial read failed on {}: {}", self.transport.name(), e);
                    break;
                }
            }
        }
        self.buffer.len().min(max_bytes)
    }

    /// Read and discard bytes the console sent outside a cycle
    pub async fn discard_stray(&mut self) -> std::io::Result<usize> {
        let mut scratch = [0u8; 64];
        let n = self.transport.read(&mut scratch).await?;
        if n > 0 {
            debug!("Discarded {} stray bytes: {:02x?}", n, &scratch[..n]);
        }
        Ok(n)
    }

    /// Close and reopen the port
    pub async fn reopen(&mut self) -> Result<(), LinkError> {
        self.transport.reopen().await
    }

    /// Close the port
    pub fn close(&mut self) {
        self.transport.close();
    }

    /// Reopen after a zero-byte read without touching the buffer
    async fn revive(&mut self) -> bool {
        warn!(
            "{} was ready but returned no data, reopening",
            self.transport.name()
        );
        match self.transport.reopen().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to reopen {}: {}", self.transport.name(), e);
                false
            }
        }
    }
}

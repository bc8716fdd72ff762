//! Frame reading and writing

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_util::codec::{Encoder, LengthDelimitedCodec};
use tracing::trace;

use super::ChannelError;
use crate::config::ChannelTiming;
use crate::retry::RetryBudget;

/// Tag that prefixes every real-time report, NUL included
pub const REALTIME_TAG: &[u8; 15] = b"davis realtime\0";

fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(2)
        .big_endian()
        .max_frame_length(u16::MAX as usize)
        .new_codec()
}

/// Encode `payload` as `[u16 BE length][payload]`
pub fn encode_frame(payload: &[u8]) -> Result<BytesMut, ChannelError> {
    let mut out = BytesMut::with_capacity(payload.len() + 2);
    codec()
        .encode(Bytes::copy_from_slice(payload), &mut out)
        .map_err(|_| ChannelError::TooLong(payload.len()))?;
    Ok(out)
}

/// Server connection carrying length-prefixed frames
pub struct CommandChannel<S> {
    /// Underlying stream
    stream: S,
    /// Length prefix collected so far
    header: [u8; 2],
    /// Bytes of `header` filled
    header_len: usize,
    /// Read retry parameters
    timing: ChannelTiming,
}

impl<S: AsyncRead + AsyncWrite + Unpin> CommandChannel<S> {
    /// Wrap a connected stream
    pub fn new(stream: S, timing: ChannelTiming) -> Self {
        Self {
            stream,
            header: [0; 2],
            header_len: 0,
            timing,
        }
    }

    /// Read towards the next length prefix.
    ///
    /// Returns the payload length once both prefix bytes are in. Safe to
    /// cancel: bytes already read are kept for the next call.
    pub async fn poll_header(&mut self) -> Result<Option<usize>, ChannelError> {
        let n = self.stream.read(&mut self.header[self.header_len..]).await?;
        if n == 0 {
            return Err(ChannelError::Closed);
        }
        self.header_len += n;
        if self.header_len < self.header.len() {
            return Ok(None);
        }
        self.header_len = 0;
        Ok(Some(u16::from_be_bytes(self.header) as usize))
    }

    /// Read exactly `len` payload bytes. Each read that leaves the payload
    /// short spends one attempt of the read budget.
    pub async fn read_payload(&mut self, len: usize) -> Result<Vec<u8>, ChannelError> {
        let wait = self.timing.read_retry_delay();
        let mut budget = RetryBudget::new(self.timing.read_attempts, wait);
        let mut payload = vec![0u8; len];
        let mut got = 0;

        while got < len {
            match timeout(wait, self.stream.read(&mut payload[got..])).await {
                Ok(Ok(n)) => got += n,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {}
            }
            if got < len {
                trace!("Got {} of {} bytes from server", got, len);
                if let Err(exhausted) = budget.spend().await {
                    return Err(ChannelError::ReadTimeout {
                        expected: len,
                        received: got,
                        attempts: exhausted.attempts,
                    });
                }
            }
        }
        Ok(payload)
    }

    /// Read one complete frame
    pub async fn read_frame(&mut self) -> Result<Vec<u8>, ChannelError> {
        loop {
            if let Some(len) = self.poll_header().await? {
                return self.read_payload(len).await;
            }
        }
    }

    /// Send one frame
    pub async fn send_frame(&mut self, payload: &[u8]) -> Result<(), ChannelError> {
        let frame = encode_frame(payload)?;
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Forward a validated real-time payload (CRC stripped)
    pub async fn send_realtime(&mut self, payload: &[u8]) -> Result<usize, ChannelError> {
        let mut body = Vec::with_capacity(REALTIME_TAG.len() + payload.len());
        body.extend_from_slice(REALTIME_TAG);
        body.extend_from_slice(payload);
        self.send_frame(&body).await?;
        Ok(body.len() + 2)
    }

    /// Send a text line such as an event report
    pub async fn send_text(&mut self, text: &str) -> Result<(), ChannelError> {
        self.send_frame(text.as_bytes()).await
    }
}

//! Fixed-size station frames
//!
//! A reply is pinned to the length its command mandates before anything
//! looks inside it. Replies to `LOOP` carry a leading ACK byte; the frame
//! handed on excludes it but keeps the trailing big-endian CRC.

use byteorder::{ByteOrder, LittleEndian};

use super::{crc16, DeviceCommand, FrameError, ACK};

/// A reply pinned to one of the known frame sizes (99, 436 or 4098 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    bytes: Vec<u8>,
}

impl RawFrame {
    /// Pin the bytes collected for `command` to its frame length
    pub fn from_reply(command: DeviceCommand, reply: &[u8]) -> Result<Self, FrameError> {
        let expected = command.reply_len();
        if reply.len() < expected {
            return Err(FrameError::Incomplete {
                expected,
                actual: reply.len(),
            });
        }

        let start = if command.expects_ack() {
            if reply[0] != ACK {
                return Err(FrameError::MissingAck(reply[0]));
            }
            1
        } else {
            0
        };

        Ok(Self {
            bytes: reply[start..start + command.frame_len()].to_vec(),
        })
    }

    /// Raw frame bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Frame length
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the frame is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Run the CRC self-check over the whole frame
    pub fn validate(self) -> ValidatedPacket {
        let remainder = crc16(&self.bytes);
        let verdict = if remainder == 0 {
            Verdict::Pass
        } else {
            Verdict::Fail { remainder }
        };
        ValidatedPacket {
            frame: self,
            verdict,
        }
    }
}

/// Outcome of the CRC check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Zero remainder
    Pass,
    /// Non-zero remainder
    Fail {
        /// Remainder left by the check
        remainder: u16,
    },
}

/// A frame together with its CRC verdict
#[derive(Debug, Clone)]
pub struct ValidatedPacket {
    frame: RawFrame,
    verdict: Verdict,
}

impl ValidatedPacket {
    /// CRC verdict
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Frame including the trailing CRC
    pub fn frame(&self) -> &RawFrame {
        &self.frame
    }

    /// Frame bytes without the trailing 2-byte CRC
    pub fn payload(&self) -> &[u8] {
        let bytes = self.frame.as_bytes();
        &bytes[..bytes.len().saturating_sub(2)]
    }

    /// Keep the packet only if it passed
    pub fn passed(self) -> Result<Self, FrameError> {
        match self.verdict {
            Verdict::Pass => Ok(self),
            Verdict::Fail { remainder } => Err(FrameError::CrcMismatch { remainder }),
        }
    }
}

fn check_range(span: &[u8], offset: usize, width: usize) -> Result<(), FrameError> {
    match offset.checked_add(width) {
        Some(end) if end <= span.len() => Ok(()),
        _ => Err(FrameError::OutOfRange {
            offset,
            width,
            len: span.len(),
        }),
    }
}

/// Read a little-endian `u16` (`lsb`, `msb`) at `offset`
pub fn read_u16_le(span: &[u8], offset: usize) -> Result<u16, FrameError> {
    check_range(span, offset, 2)?;
    Ok(LittleEndian::read_u16(&span[offset..offset + 2]))
}

/// Read a little-endian `u32` (`lsb`, `b1`, `b2`, `msb`) at `offset`
pub fn read_u32_le(span: &[u8], offset: usize) -> Result<u32, FrameError> {
    check_range(span, offset, 4)?;
    Ok(LittleEndian::read_u32(&span[offset..offset + 4]))
}

/// Read a single byte at `offset`
pub fn read_u8(span: &[u8], offset: usize) -> Result<u8, FrameError> {
    check_range(span, offset, 1)?;
    Ok(span[offset])
}

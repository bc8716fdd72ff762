//! Protocol errors

use thiserror::Error;

/// Errors raised by the serial side of the bridge
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("No response from station within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Serial port was readable but returned no data")]
    Dead,

    #[error("Timed out writing to serial port after {attempts} attempts")]
    WriteExhausted { attempts: u32 },

    #[error("Serial port is not open")]
    NotOpen,

    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<tokio_serial::Error> for LinkError {
    fn from(e: tokio_serial::Error) -> Self {
        LinkError::SerialError(e.to_string())
    }
}

/// Reasons a received frame is dropped without decoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Got {actual} bytes instead of {expected} - ignoring packet")]
    Incomplete { expected: usize, actual: usize },

    #[error("Byte[0] is {0:#04x} not ACK - ignoring packet")]
    MissingAck(u8),

    #[error("CRC mismatch: remainder {remainder:#06x}")]
    CrcMismatch { remainder: u16 },

    #[error("Field offset {offset}+{width} is outside a {len}-byte frame")]
    OutOfRange {
        offset: usize,
        width: usize,
        len: usize,
    },
}

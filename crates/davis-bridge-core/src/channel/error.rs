//! Command channel errors

use thiserror::Error;

/// Errors reading from or writing to the server
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error(
        "Timed out reading from server: {received} of {expected} bytes after {attempts} attempts"
    )]
    ReadTimeout {
        expected: usize,
        received: usize,
        attempts: u32,
    },

    #[error("Server closed the connection")]
    Closed,

    #[error("Frame of {0} bytes is too long to send")]
    TooLong(usize),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

//! Command channel
//!
//! Length-framed link to the collection server. Every frame is a 2-byte
//! big-endian length followed by that many bytes of ASCII text (commands
//! from the server) or tagged binary data (reports to the server).

mod command;
mod error;
mod frame;

pub use command::{parse_c_integer, ServerCommand, HELP_TEXT};
pub use error::ChannelError;
pub use frame::{encode_frame, CommandChannel, REALTIME_TAG};

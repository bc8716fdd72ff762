//! Real-time data
//!
//! Decoding of the 99-byte `LOOP` packet into a [`RealtimeSample`] and the
//! one-line text summary logged for operators.

mod sample;
mod storm;

pub use sample::{hhmm, RealtimeSample, LOOP_PAYLOAD_LEN};
pub use storm::{pack_storm_start, storm_start_days, NO_STORM};

//! Storm start date
//!
//! The console packs the date a rain storm began into 16 bits:
//!
//! ```text
//! M  M  M  M  D  D  D  D  D  Y  Y  Y  Y  Y  Y  Y
//! 15 14 13 12 11 10 9  8  7  6  5  4  3  2  1  0
//! ```
//!
//! with a 1-based month, the day of month and the year counted from 2000.

use chrono::{Duration, NaiveDate};

/// Value the console reports when no storm is in progress
pub const NO_STORM: u16 = 0xFFFF;

/// Convert a packed storm start to days since 2000-01-01.
///
/// Out-of-range months and days roll over into neighbouring months the way
/// calendar normalization does (month 13 is January of the next year,
/// day 0 is the last day of the previous month). Returns `None` for
/// [`NO_STORM`].
pub fn storm_start_days(packed: u16) -> Option<i64> {
    if packed == NO_STORM {
        return None;
    }

    let month = i32::from((packed & 0xF000) >> 12);
    let day = i64::from((packed & 0x0F80) >> 7);
    let year = 2000 + i32::from(packed & 0x007F);

    let months = year * 12 + (month - 1);
    let first =
        NaiveDate::from_ymd_opt(months.div_euclid(12), months.rem_euclid(12) as u32 + 1, 1)?;
    let date = first.checked_add_signed(Duration::days(day - 1))?;
    let epoch = NaiveDate::from_ymd_opt(2000, 1, 1)?;

    Some(date.signed_duration_since(epoch).num_days())
}

/// Pack a calendar date the way the console does
pub fn pack_storm_start(year: i32, month: u32, day: u32) -> u16 {
    let year = (year - 2000).clamp(0, 0x7F) as u16;
    ((month as u16 & 0x0F) << 12) | ((day as u16 & 0x1F) << 7) | year
}

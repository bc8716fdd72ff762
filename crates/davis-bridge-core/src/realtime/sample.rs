//! `LOOP` packet decoding

use serde::{Deserialize, Serialize};

use super::storm_start_days;
use crate::protocol::{read_u16_le, read_u32_le, read_u8, FrameError};

/// Length of the `LOOP` payload without ACK and CRC
pub const LOOP_PAYLOAD_LEN: usize = 97;

/// Raw values of one real-time packet.
///
/// Fixed-point fields keep the console's integer encoding; the accessor
/// methods apply the scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeSample {
    /// Packet signature, "LOO"
    pub signature: [u8; 3],
    /// Barometric trend code
    pub bar_trend: u8,
    /// Barometer, inHg × 1000
    pub barometer: u16,
    /// Inside temperature, °F × 10
    pub inside_temp: i16,
    /// Inside relative humidity, %
    pub inside_humidity: u8,
    /// Outside temperature, °F × 10
    pub outside_temp: i16,
    /// Wind speed, mph
    pub wind_speed: u8,
    /// 10-minute average wind speed, mph
    pub wind_avg: u8,
    /// Wind direction, degrees
    pub wind_dir: u16,
    /// Outside relative humidity, %
    pub outside_humidity: u8,
    /// Rain rate, in/h × 100
    pub rain_rate: u16,
    /// Solar radiation, W/m²
    pub solar_radiation: u16,
    /// Packed storm start date
    pub storm_start: u16,
    /// Rain today, in × 100
    pub day_rain: u16,
    /// Rain this month, in × 100
    pub month_rain: u16,
    /// Rain this year, in × 100
    pub year_rain: u16,
    /// Alarm bitmask
    pub alarms: u32,
    /// Console battery, raw ADC counts
    pub battery: u16,
    /// Sunrise, hour × 100 + minute (0xFFFF when unknown)
    pub sunrise: u16,
    /// Sunset, hour × 100 + minute (0xFFFF when unknown)
    pub sunset: u16,
}

impl RealtimeSample {
    /// Decode a validated payload (ACK and CRC already stripped)
    pub fn decode(payload: &[u8]) -> Result<Self, FrameError> {
        let signed = |offset| read_u16_le(payload, offset).map(|v| v as i16);
        Ok(Self {
            signature: [
                read_u8(payload, 0)?,
                read_u8(payload, 1)?,
                read_u8(payload, 2)?,
            ],
            bar_trend: read_u8(payload, 3)?,
            barometer: read_u16_le(payload, 7)?,
            inside_temp: signed(9)?,
            inside_humidity: read_u8(payload, 11)?,
            outside_temp: signed(12)?,
            wind_speed: read_u8(payload, 14)?,
            wind_avg: read_u8(payload, 15)?,
            wind_dir: read_u16_le(payload, 16)?,
            outside_humidity: read_u8(payload, 33)?,
            rain_rate: read_u16_le(payload, 41)?,
            solar_radiation: read_u16_le(payload, 44)?,
            storm_start: read_u16_le(payload, 48)?,
            day_rain: read_u16_le(payload, 50)?,
            month_rain: read_u16_le(payload, 52)?,
            year_rain: read_u16_le(payload, 54)?,
            alarms: read_u32_le(payload, 70)?,
            battery: read_u16_le(payload, 87)?,
            sunrise: read_u16_le(payload, 91)?,
            sunset: read_u16_le(payload, 93)?,
        })
    }

    /// Barometer in inHg
    pub fn barometer_inhg(&self) -> f64 {
        f64::from(self.barometer) / 1000.0
    }

    /// Inside temperature in °F
    pub fn inside_temp_f(&self) -> f64 {
        f64::from(self.inside_temp) / 10.0
    }

    /// Outside temperature in °F
    pub fn outside_temp_f(&self) -> f64 {
        f64::from(self.outside_temp) / 10.0
    }

    /// Rain rate in in/h
    pub fn rain_rate_in(&self) -> f64 {
        f64::from(self.rain_rate) / 100.0
    }

    /// Rain today in inches
    pub fn day_rain_in(&self) -> f64 {
        f64::from(self.day_rain) / 100.0
    }

    /// Rain this month in inches
    pub fn month_rain_in(&self) -> f64 {
        f64::from(self.month_rain) / 100.0
    }

    /// Rain this year in inches
    pub fn year_rain_in(&self) -> f64 {
        f64::from(self.year_rain) / 100.0
    }

    /// Console battery in volts
    pub fn battery_volts(&self) -> f64 {
        f64::from(self.battery) * 300.0 / 51200.0
    }

    /// Storm start as days since 2000-01-01, if a storm is in progress
    pub fn storm_start_days(&self) -> Option<i64> {
        storm_start_days(self.storm_start)
    }

    /// One-line operator summary
    pub fn summary(&self) -> String {
        format!(
            "Data {}{}{}0x{:02x} Hg{:.2} Int {:.1}F {}% Ext {:.1}F {}% Wind {} Avg {} Dir {} \
             Rain {:.2}\" Irr {} Day {:.2}\" Mon {:.2}\" Yr {:.2}\" Alrm {} Bat {:.2} [{}-{}]",
            self.signature[0] as char,
            self.signature[1] as char,
            self.signature[2] as char,
            self.bar_trend,
            self.barometer_inhg(),
            self.inside_temp_f(),
            self.inside_humidity,
            self.outside_temp_f(),
            self.outside_humidity,
            self.wind_speed,
            self.wind_avg,
            self.wind_dir,
            self.rain_rate_in(),
            self.solar_radiation,
            self.day_rain_in(),
            self.month_rain_in(),
            self.year_rain_in(),
            self.alarms,
            self.battery_volts(),
            hhmm(self.sunrise),
            hhmm(self.sunset),
        )
    }
}

/// Render an `hour × 100 + minute` time as `HH:MM`; 0xFFFF renders empty
pub fn hhmm(value: u16) -> String {
    if value == 0xFFFF {
        String::new()
    } else {
        format!("{:02}:{:02}", value / 100, value % 100)
    }
}

//! Parsed GPS and OO instrument readings.

use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use time::macros::format_description;

/// One row of the GPS parser's tabular output.
///
/// Latitude and longitude keep the parser's `ddmm.mmmm` magnitude text with
/// an explicit sign prepended from the hemisphere letter, so the stored value
/// is exactly what the logger produced, signed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GpsReading {
    pub sys_time: PrimitiveDateTime,
    /// GPS time-of-day as emitted by the receiver; opaque to the pipeline.
    pub gps_time: String,
    pub latitude: String,
    pub longitude: String,
    pub altitude: f64,
    pub ground_elevation: f64,
}

/// One per-sample reading from the OO parser's output directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OoReading {
    pub sys_time: PrimitiveDateTime,
    pub field_1: String,
    pub field_2: String,
}

/// Prepend the sign a hemisphere letter implies to a coordinate magnitude.
///
/// N and E are positive, S and W negative. Any other letter is a defect in
/// the input and is rejected, never defaulted.
pub fn signed_coordinate(magnitude: &str, hemisphere: char) -> crate::Result<String> {
    let sign = match hemisphere {
        'N' | 'E' => '+',
        'S' | 'W' => '-',
        other => return Err(crate::Error::InvalidHemisphere(other)),
    };
    Ok(format!("{sign}{magnitude}"))
}

/// Parse the `sys_time` column of the GPS parser output (`2020-03-03 10:15:30`).
pub fn parse_gps_sys_time(value: &str) -> crate::Result<PrimitiveDateTime> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    PrimitiveDateTime::parse(value.trim(), &format).map_err(|e| crate::Error::InvalidTimestamp {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Parse the textual timestamp embedded in an OO sample header
/// (`Tue Mar 03 10:15:30 2020`).
pub fn parse_oo_header_time(value: &str) -> crate::Result<PrimitiveDateTime> {
    let format = format_description!(
        "[weekday repr:short] [month repr:short] [day] [hour]:[minute]:[second] [year]"
    );
    PrimitiveDateTime::parse(value.trim(), &format).map_err(|e| crate::Error::InvalidTimestamp {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Elapsed flight duration in seconds: the span between the earliest and
/// latest `sys_time` across all GPS readings.
///
/// Input order is irrelevant. Fewer than two readings leave the span
/// undefined and return `None`; callers must treat that as insufficient data,
/// not as a zero-length flight.
pub fn gps_span_seconds(readings: &[GpsReading]) -> Option<f64> {
    if readings.len() < 2 {
        return None;
    }
    let mut min = readings[0].sys_time;
    let mut max = readings[0].sys_time;
    for reading in &readings[1..] {
        if reading.sys_time < min {
            min = reading.sys_time;
        }
        if reading.sys_time > max {
            max = reading.sys_time;
        }
    }
    Some((max - min).as_seconds_f64())
}

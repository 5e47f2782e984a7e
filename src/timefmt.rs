//! Single conversion point for every timestamp in the pipeline. The store
//! keeps UTC wall-clock text, mail bodies display fixed UTC+9, and the
//! strict-greater-than freshness comparison happens on parsed values only.

use crate::types::Result;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

pub const STORE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DISPLAY_OFFSET_SECONDS: i32 = 9 * 3600;

/// Formats a UTC timestamp the way the store persists it.
pub fn to_store_string(t: DateTime<Utc>) -> String {
    t.naive_utc().format(STORE_FORMAT).to_string()
}

/// Parses a stored timestamp back into a comparable UTC wall-clock value.
pub fn from_store_string(s: &str) -> Result<NaiveDateTime> {
    Ok(NaiveDateTime::parse_from_str(s, STORE_FORMAT)?)
}

/// Formats a timestamp for mail bodies, shifted into the fixed display zone.
pub fn to_display_string(t: DateTime<Utc>) -> String {
    let zone = FixedOffset::east_opt(DISPLAY_OFFSET_SECONDS)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
    t.with_timezone(&zone).format(STORE_FORMAT).to_string()
}

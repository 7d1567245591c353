//! FAT date/time decoding
//!
//! XContent records store timestamps as packed FAT date/time pairs:
//!
//! ```text
//! date: [15:9] year - 1980   [8:5] month (1-12)   [4:0] day (1-31)
//! time: [15:11] hour         [10:5] minute        [4:0] second / 2
//! ```
//!
//! The emulator works in Windows file time: 100-nanosecond ticks since
//! 1601-01-01 UTC.

use chrono::{DateTime, NaiveDate, Utc};

/// Seconds between 1601-01-01 and 1970-01-01.
pub const UNIX_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

/// Ticks per second.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Decode a FAT date/time pair to Windows ticks.
///
/// Calendar math is done in UTC. A date or time that does not name a real
/// instant (month 0 or 13, February 30th, hour 24, ...) yields 0.
pub fn decode_fat_timestamp(date: u16, time: u16) -> u64 {
    let year = 1980 + i32::from((date & 0xFE00) >> 9);
    let month = u32::from((date & 0x01E0) >> 5);
    let day = u32::from(date & 0x001F);
    let hour = u32::from((time & 0xF800) >> 11);
    let minute = u32::from((time & 0x07E0) >> 5);
    let second = u32::from(time & 0x001F) << 1;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .map(|dt| dt.and_utc().timestamp())
        .and_then(|unix| unix.checked_add(UNIX_EPOCH_OFFSET_SECS))
        .and_then(|secs| secs.checked_mul(TICKS_PER_SECOND))
        .and_then(|ticks| u64::try_from(ticks).ok())
        .unwrap_or(0)
}

/// Convert Windows ticks back to a UTC date, `None` for 0 or out of range.
pub fn ticks_to_datetime(ticks: u64) -> Option<DateTime<Utc>> {
    if ticks == 0 {
        return None;
    }
    let ticks = i64::try_from(ticks).ok()?;
    let secs = ticks / TICKS_PER_SECOND - UNIX_EPOCH_OFFSET_SECS;
    let nanos = (ticks % TICKS_PER_SECOND) * 100;
    DateTime::from_timestamp(secs, u32::try_from(nanos).ok()?)
}

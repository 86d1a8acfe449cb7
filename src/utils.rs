/// Shared helpers for the drain watch service
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serializer;

/// Asia/Seoul is UTC+9 year-round (no daylight saving)
pub const SEOUL_UTC_OFFSET_SECS: i32 = 9 * 3600;

pub fn seoul_offset() -> FixedOffset {
    FixedOffset::east_opt(SEOUL_UTC_OFFSET_SECS).expect("UTC+9 is a valid offset")
}

/// Express an instant in Korean civil time
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use drain_watch_service::utils::to_seoul_time;
///
/// let utc = Utc.with_ymd_and_hms(2024, 7, 1, 15, 30, 0).unwrap();
/// assert_eq!(to_seoul_time(utc).to_rfc3339(), "2024-07-02T00:30:00+09:00");
/// ```
pub fn to_seoul_time(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&seoul_offset())
}

/// `serialize_with` adapter rendering a UTC timestamp as `+09:00` RFC 3339
pub fn serialize_seoul_time<S>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&to_seoul_time(*instant).to_rfc3339())
}

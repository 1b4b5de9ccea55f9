//! Entry-date resolution
//!
//! The model is asked to resolve relative expressions ("yesterday", "this
//! past Saturday") itself and reply with an absolute date. Its time-of-day
//! and zone are unreliable, so only the calendar day is kept: the timestamp
//! is rebuilt at a fixed local anchor hour. Without the anchor, a UTC
//! midnight instant lands on the previous calendar day in any
//! negative-offset zone.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

/// Local hour a date-only value is pinned to
pub const ANCHOR_HOUR: u32 = 8;

/// Resolve a model-supplied date string into a concrete UTC timestamp,
/// anchored at [`ANCHOR_HOUR`] local time.
///
/// `None` and unparseable input both fall back to `now` (the caller's capture
/// time); the unparseable case is logged, never fatal.
pub fn resolve_entry_date<Tz: TimeZone>(
  raw: Option<&str>,
  now: DateTime<Utc>,
  zone: &Tz,
) -> DateTime<Utc> {
  resolve_entry_date_at(raw, now, zone, ANCHOR_HOUR)
}

/// Same as [`resolve_entry_date`] but with a caller-chosen anchor hour.
/// Meal decoding uses the meal slot's default hour here.
pub fn resolve_entry_date_at<Tz: TimeZone>(
  raw: Option<&str>,
  now: DateTime<Utc>,
  zone: &Tz,
  anchor_hour: u32,
) -> DateTime<Utc> {
  let Some(raw) = raw else {
    return now;
  };
  let raw = raw.trim();
  if raw.is_empty() {
    return now;
  }

  match parse_calendar_day(raw) {
    Some(day) => at_local_anchor(day, zone, anchor_hour).unwrap_or(now),
    None => {
      warn!(input = raw, "unparseable date from model, using capture time");
      now
    }
  }
}

/// Extract the calendar day as written, discarding time-of-day and offset
fn parse_calendar_day(raw: &str) -> Option<NaiveDate> {
  if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
    return Some(instant.date_naive());
  }
  if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
    return Some(naive.date());
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn at_local_anchor<Tz: TimeZone>(
  day: NaiveDate,
  zone: &Tz,
  anchor_hour: u32,
) -> Option<DateTime<Utc>> {
  zone
    .with_ymd_and_hms(day.year(), day.month(), day.day(), anchor_hour, 0, 0)
    .earliest()
    .map(|local| local.with_timezone(&Utc))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{FixedOffset, Timelike};

  fn pacific() -> FixedOffset {
    FixedOffset::west_opt(8 * 3600).unwrap()
  }

  #[test]
  fn test_utc_midnight_stays_on_same_calendar_day() {
    let now = Utc::now();
    let resolved = resolve_entry_date(Some("2024-03-15T00:00:00Z"), now, &pacific());

    let local = resolved.with_timezone(&pacific());
    assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    assert_eq!(local.hour(), ANCHOR_HOUR);
  }

  #[test]
  fn test_bare_date_accepted() {
    let now = Utc::now();
    let resolved = resolve_entry_date(Some("2024-03-15"), now, &pacific());
    let local = resolved.with_timezone(&pacific());
    assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
  }

  #[test]
  fn test_offset_date_keeps_day_as_written() {
    let now = Utc::now();
    // 23:30 at +02:00 is the previous day in UTC; the written day wins
    let resolved = resolve_entry_date(Some("2024-03-15T23:30:00+02:00"), now, &pacific());
    let local = resolved.with_timezone(&pacific());
    assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
  }

  #[test]
  fn test_none_returns_capture_time() {
    let now = Utc::now();
    assert_eq!(resolve_entry_date(None, now, &pacific()), now);
  }

  #[test]
  fn test_garbage_returns_capture_time() {
    let now = Utc::now();
    assert_eq!(resolve_entry_date(Some("next Tuesday-ish"), now, &pacific()), now);
    assert_eq!(resolve_entry_date(Some(""), now, &pacific()), now);
  }

  #[test]
  fn test_custom_anchor_hour() {
    let now = Utc::now();
    let resolved = resolve_entry_date_at(Some("2024-03-15"), now, &pacific(), 18);
    let local = resolved.with_timezone(&pacific());
    assert_eq!(local.hour(), 18);
  }
}

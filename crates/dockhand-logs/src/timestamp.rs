//! Timestamp codec for the single recognized in-line format
//!
//! Monitored services stamp lines as `M/D/YYYY, H:MM:SS AM|PM` at the very
//! start of the line. Query-side inputs additionally accept ISO-8601 with an
//! offset; both parse to the same epoch-millisecond instant.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone};

use dockhand_core::{Error, Result};

/// Parses line and query timestamps into epoch milliseconds.
///
/// Line timestamps carry no zone of their own; they are interpreted in the
/// configured fixed offset, or in the process-local zone when none is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampCodec {
    tz: Option<FixedOffset>,
}

impl TimestampCodec {
    /// Codec using the process-local timezone
    pub fn local() -> Self {
        Self { tz: None }
    }

    /// Codec pinned to a fixed UTC offset
    pub fn fixed(offset: FixedOffset) -> Self {
        Self { tz: Some(offset) }
    }

    pub fn with_offset(tz: Option<FixedOffset>) -> Self {
        Self { tz }
    }

    /// Parse the leading timestamp token of a line, if present.
    ///
    /// Never reads past the end of the token and does not allocate when the
    /// line carries no timestamp.
    pub fn parse_leading(&self, line: &[u8]) -> Option<i64> {
        let (naive, _) = parse_locale_token(line)?;
        self.resolve(naive)
    }

    /// Parse a request-side time string: ISO-8601 with offset or the locale
    /// line format. Both map to the same instant.
    pub fn parse_query(&self, text: &str) -> Result<i64> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidTimestamp(text.to_string()));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(dt.timestamp_millis());
        }

        match parse_locale_token(text.as_bytes()) {
            Some((naive, consumed)) if consumed == text.len() => self
                .resolve(naive)
                .ok_or_else(|| Error::InvalidTimestamp(text.to_string())),
            _ => Err(Error::InvalidTimestamp(text.to_string())),
        }
    }

    /// Map a wall-clock time to an instant in the configured zone.
    ///
    /// Ambiguous local times (DST fold) resolve to the earliest mapping;
    /// nonexistent local times yield `None`.
    fn resolve(&self, naive: NaiveDateTime) -> Option<i64> {
        let millis = match self.tz {
            Some(offset) => offset.from_local_datetime(&naive).single()?.timestamp_millis(),
            None => Local.from_local_datetime(&naive).earliest()?.timestamp_millis(),
        };
        Some(millis)
    }
}

/// Parse `M/D/YYYY, H:MM:SS AM|PM` at the start of `bytes`.
///
/// Returns the wall-clock time and the number of bytes consumed.
fn parse_locale_token(bytes: &[u8]) -> Option<(NaiveDateTime, usize)> {
    let mut cur = Cursor { bytes, pos: 0 };

    let month = cur.digits(1, 2)?;
    cur.literal(b'/')?;
    let day = cur.digits(1, 2)?;
    cur.literal(b'/')?;
    let year = cur.exact_digits(4)?;
    cur.literal(b',')?;
    cur.literal(b' ')?;
    let hour12 = cur.digits(1, 2)?;
    cur.literal(b':')?;
    let minute = cur.exact_digits(2)?;
    cur.literal(b':')?;
    let second = cur.exact_digits(2)?;
    cur.literal(b' ')?;
    let pm = match cur.take()? {
        b'A' => false,
        b'P' => true,
        _ => return None,
    };
    cur.literal(b'M')?;

    if !(1..=12).contains(&hour12) {
        return None;
    }
    let hour = match (hour12, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };

    let naive = NaiveDate::from_ymd_opt(year as i32, month, day)?
        .and_hms_opt(hour, minute, second)?;
    Some((naive, cur.pos))
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take(&mut self) -> Option<u8> {
        let b = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    fn literal(&mut self, expected: u8) -> Option<()> {
        (self.take()? == expected).then_some(())
    }

    /// Consume between `min` and `max` ASCII digits
    fn digits(&mut self, min: usize, max: usize) -> Option<u32> {
        let mut value: u32 = 0;
        let mut count = 0;
        while count < max {
            match self.bytes.get(self.pos) {
                Some(b) if b.is_ascii_digit() => {
                    value = value * 10 + (b - b'0') as u32;
                    self.pos += 1;
                    count += 1;
                }
                _ => break,
            }
        }
        (count >= min).then_some(value)
    }

    fn exact_digits(&mut self, n: usize) -> Option<u32> {
        let start = self.pos;
        let value = self.digits(n, n)?;
        (self.pos - start == n).then_some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn utc() -> TimestampCodec {
        TimestampCodec::fixed(FixedOffset::east_opt(0).unwrap())
    }

    fn millis(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> i64 {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
            .and_utc()
            .timestamp_millis()
    }

    #[test]
    fn test_parse_leading_basic() {
        let codec = utc();
        assert_eq!(
            codec.parse_leading(b"11/20/2025, 11:00:00 PM hello"),
            Some(millis(2025, 11, 20, 23, 0, 0))
        );
        assert_eq!(
            codec.parse_leading(b"1/2/2026, 9:05:07 AM single digits"),
            Some(millis(2026, 1, 2, 9, 5, 7))
        );
    }

    #[test]
    fn test_twelve_hour_convention() {
        let codec = utc();
        assert_eq!(
            codec.parse_leading(b"11/21/2025, 12:00:00 AM midnight"),
            Some(millis(2025, 11, 21, 0, 0, 0))
        );
        assert_eq!(
            codec.parse_leading(b"11/21/2025, 12:30:00 PM noonish"),
            Some(millis(2025, 11, 21, 12, 30, 0))
        );
    }

    #[test]
    fn test_continuation_lines_have_no_timestamp() {
        let codec = utc();
        // 24-hour form without a meridiem is not the recognized format
        assert_eq!(codec.parse_leading(b"11/21/2025, 00:30:00 stack trace"), None);
        assert_eq!(codec.parse_leading(b"    at foo.bar (app.js:10)"), None);
        assert_eq!(codec.parse_leading(b""), None);
        // leading whitespace disqualifies the token
        assert_eq!(codec.parse_leading(b" 11/21/2025, 1:00:00 AM x"), None);
    }

    #[test]
    fn test_malformed_tokens() {
        let codec = utc();
        assert_eq!(codec.parse_leading(b"11/20/2025 11:00:00 PM"), None); // missing comma
        assert_eq!(codec.parse_leading(b"11/20/25, 11:00:00 PM"), None); // 2-digit year
        assert_eq!(codec.parse_leading(b"11/20/2025, 11:00 PM"), None); // no seconds
        assert_eq!(codec.parse_leading(b"13/20/2025, 11:00:00 PM"), None); // bad month
        assert_eq!(codec.parse_leading(b"11/20/2025, 0:30:00 AM"), None); // hour 0
        assert_eq!(codec.parse_leading(b"11/20/2025, 11:00:00 XM"), None);
    }

    #[test]
    fn test_token_does_not_consume_past_end() {
        let (_, consumed) =
            parse_locale_token(b"11/20/2025, 11:00:00 PM trailing text").unwrap();
        assert_eq!(consumed, "11/20/2025, 11:00:00 PM".len());
    }

    #[test]
    fn test_parse_query_both_forms_agree() {
        let codec = utc();
        let locale = codec.parse_query("11/20/2025, 11:30:00 PM").unwrap();
        let iso = codec.parse_query("2025-11-20T23:30:00+00:00").unwrap();
        assert_eq!(locale, iso);
    }

    #[test]
    fn test_parse_query_rejects_garbage() {
        let codec = utc();
        assert!(matches!(
            codec.parse_query("yesterday"),
            Err(Error::InvalidTimestamp(_))
        ));
        assert!(matches!(codec.parse_query(""), Err(Error::InvalidTimestamp(_))));
        // trailing garbage after a locale token is a query error
        assert!(codec.parse_query("11/20/2025, 11:30:00 PM oops").is_err());
    }

    #[test]
    fn test_fixed_offset_applied() {
        let plus_two = TimestampCodec::fixed(FixedOffset::east_opt(2 * 3600).unwrap());
        assert_eq!(
            plus_two.parse_leading(b"11/20/2025, 11:00:00 PM x"),
            Some(millis(2025, 11, 20, 21, 0, 0))
        );
    }
}

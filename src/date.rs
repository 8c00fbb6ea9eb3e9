//! PDF date formatting (§4.9): `D:YYYYMMDDHHMMSS±HH'MM'`.

use time::{Date, Month, Time, UtcOffset};

pub use time::OffsetDateTime;

/// Formats a date as the PDF date string used in the Info dictionary,
/// e.g. `D:20240131153045+02'00'`.
pub fn to_pdf_date_string(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{}{:02}'{:02}'",
        date.year(),
        date.month() as u8,
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        sign,
        offset.whole_hours().unsigned_abs(),
        offset.minutes_past_hour().unsigned_abs(),
    )
}

/// Parses the PDF date format `D:YYYYMMDDHHMMSS±HH'MM'` used in the Info
/// dictionary (reader side; §8 "metadata... within one second of
/// precision"). Tolerant of a missing `D:` prefix and a missing timezone
/// suffix (treated as UTC), which some producers omit.
pub fn parse_pdf_date_string(s: &str) -> Option<OffsetDateTime> {
    let s = s.strip_prefix("D:").unwrap_or(s);
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 14 {
        return None;
    }
    let year: i32 = digits[0..4].parse().ok()?;
    let month: u8 = digits[4..6].parse().ok()?;
    let day: u8 = digits[6..8].parse().ok()?;
    let hour: u8 = digits[8..10].parse().ok()?;
    let minute: u8 = digits[10..12].parse().ok()?;
    let second: u8 = digits[12..14].parse().ok()?;

    let rest = &s[digits.len()..];
    let offset = parse_offset(rest).unwrap_or(UtcOffset::UTC);

    let date = Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()?;
    let time = Time::from_hms(hour, minute, second).ok()?;
    Some(date.with_time(time).assume_offset(offset))
}

fn parse_offset(rest: &str) -> Option<UtcOffset> {
    let rest = rest.trim();
    if rest.is_empty() || rest.starts_with('Z') {
        return Some(UtcOffset::UTC);
    }
    let sign: i8 = match rest.as_bytes()[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    // Accept both `+02'00'` and the less common bare `+0200`.
    let digits: String = rest[1..].chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }
    let hh: i8 = digits[0..2].parse().ok()?;
    let mm: i8 = digits[2..4].parse().ok()?;
    UtcOffset::from_hms(sign * hh, sign * mm, 0).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_date_with_offset() {
        let d = datetime!(2024-01-31 15:30:45 +2);
        let s = to_pdf_date_string(&d);
        let parsed = parse_pdf_date_string(&s).unwrap();
        assert_eq!(parsed, d);
    }

    #[test]
    fn parses_date_missing_offset_as_utc() {
        let parsed = parse_pdf_date_string("D:20240131153045").unwrap();
        assert_eq!(parsed, datetime!(2024-01-31 15:30:45 UTC));
    }

    #[test]
    fn formats_utc_date() {
        let d = datetime!(2024-01-31 15:30:45 UTC);
        assert_eq!(to_pdf_date_string(&d), "D:20240131153045+00'00'");
    }
}

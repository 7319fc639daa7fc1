//! Date and time layouts for both wire forms.
//!
//! Parsers here only produce calendar values. Zero-date policy and time
//! zone handling live in the codec. Errors report column 0; the codec
//! re-targets them.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tidewire_core::{DecodingError, SqlTime};

use crate::protocol::PacketReader;

/// A parsed temporal value, or the all-zero literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed<T> {
    Zero,
    Value(T),
}

fn malformed(bytes: &[u8], message: impl Into<String>) -> DecodingError {
    DecodingError::malformed(0, bytes, message)
}

fn digits(bytes: &[u8], field: &str) -> Result<u32, DecodingError> {
    let text = field.as_bytes();
    if text.is_empty() || !text.iter().all(u8::is_ascii_digit) {
        return Err(malformed(bytes, format!("expected digits, found '{field}'")));
    }
    field
        .parse()
        .map_err(|_| malformed(bytes, format!("number out of range: '{field}'")))
}

fn two_digit_year(yy: u32) -> i32 {
    let yy = i32::try_from(yy).unwrap_or(0);
    if yy <= 69 { 2000 + yy } else { 1900 + yy }
}

/// Fractional digits to nanoseconds, truncating or right-padding to 9.
fn fraction_nanos(bytes: &[u8], fraction: &str) -> Result<u32, DecodingError> {
    if fraction.is_empty() {
        return Ok(0);
    }
    let kept: String = fraction.chars().take(9).collect();
    let value = digits(bytes, &kept)?;
    let pad = 9 - u32::try_from(kept.len()).unwrap_or(9);
    Ok(value * 10_u32.pow(pad))
}

fn build(
    bytes: &[u8],
    (year, month, day): (i32, u32, u32),
    (hour, minute, second, nanos): (u32, u32, u32, u32),
) -> Result<Parsed<NaiveDateTime>, DecodingError> {
    if year == 0 && month == 0 && day == 0 {
        return Ok(Parsed::Zero);
    }
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| malformed(bytes, format!("invalid date {year:04}-{month:02}-{day:02}")))?;
    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos).ok_or_else(|| {
        malformed(bytes, format!("invalid time {hour:02}:{minute:02}:{second:02}"))
    })?;
    Ok(Parsed::Value(date.and_time(time)))
}

/// Parse a text-protocol date or datetime.
///
/// Accepted layouts, by length of the part before any fraction:
/// 19 `YYYY-MM-DD hh:mm:ss`, 14 `YYYYMMDDhhmmss`, 12 `YYMMDDhhmmss`,
/// 10 `YYYY-MM-DD` or `YYMMDDhhmm`, 8 `hh:mm:ss` (on 1970-01-01) or
/// `YYYYMMDD`, 6 `YYMMDD`, 4 `YYMM`, 2 `YY`.
pub fn parse_text_datetime(bytes: &[u8]) -> Result<Parsed<NaiveDateTime>, DecodingError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| malformed(bytes, "temporal value is not ASCII"))?
        .trim();
    if !text.is_ascii() {
        return Err(malformed(bytes, "temporal value is not ASCII"));
    }
    let (main, fraction) = text.split_once('.').unwrap_or((text, ""));
    let nanos = fraction_nanos(bytes, fraction)?;
    let n = |range: std::ops::Range<usize>| digits(bytes, &main[range]);

    let (date, time) = match main.len() {
        19 => (
            (i32::try_from(n(0..4)?).unwrap_or(0), n(5..7)?, n(8..10)?),
            (n(11..13)?, n(14..16)?, n(17..19)?),
        ),
        14 => (
            (i32::try_from(n(0..4)?).unwrap_or(0), n(4..6)?, n(6..8)?),
            (n(8..10)?, n(10..12)?, n(12..14)?),
        ),
        12 => (
            (two_digit_year(n(0..2)?), n(2..4)?, n(4..6)?),
            (n(6..8)?, n(8..10)?, n(10..12)?),
        ),
        10 if main.contains('-') => (
            (i32::try_from(n(0..4)?).unwrap_or(0), n(5..7)?, n(8..10)?),
            (0, 0, 0),
        ),
        10 => (
            (two_digit_year(n(0..2)?), n(2..4)?, n(4..6)?),
            (n(6..8)?, n(8..10)?, 0),
        ),
        8 if main.contains(':') => ((1970, 1, 1), (n(0..2)?, n(3..5)?, n(6..8)?)),
        8 => (
            (i32::try_from(n(0..4)?).unwrap_or(0), n(4..6)?, n(6..8)?),
            (0, 0, 0),
        ),
        6 => ((two_digit_year(n(0..2)?), n(2..4)?, n(4..6)?), (0, 0, 0)),
        4 => ((two_digit_year(n(0..2)?), n(2..4)?, 1), (0, 0, 0)),
        2 => ((two_digit_year(n(0..2)?), 1, 1), (0, 0, 0)),
        len => {
            return Err(malformed(
                bytes,
                format!("unsupported temporal layout of length {len}"),
            ));
        }
    };
    build(bytes, date, (time.0, time.1, time.2, nanos))
}

/// Parse a text-protocol TIME: `[-]H+:MM:SS[.f]`, `HHMMSS`, `HHMM`, or any
/// datetime layout (time part taken).
pub fn parse_text_time(bytes: &[u8]) -> Result<SqlTime, DecodingError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| malformed(bytes, "time value is not ASCII"))?
        .trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if body.contains('-') || body.contains(' ') || body.len() >= 12 {
        return match parse_text_datetime(bytes)? {
            Parsed::Zero => Ok(SqlTime::default()),
            Parsed::Value(dt) => Ok(SqlTime::from(dt.time())),
        };
    }
    let (main, fraction) = body.split_once('.').unwrap_or((body, ""));
    let nanos = fraction_nanos(bytes, fraction)?;
    let (hours, minutes, seconds) = if main.contains(':') {
        let parts: Vec<&str> = main.split(':').collect();
        match parts.as_slice() {
            [h, m, s] => (digits(bytes, h)?, digits(bytes, m)?, digits(bytes, s)?),
            [h, m] => (digits(bytes, h)?, digits(bytes, m)?, 0),
            _ => return Err(malformed(bytes, "expected H:MM:SS")),
        }
    } else if main.is_ascii() {
        match main.len() {
            6 => (digits(bytes, &main[0..2])?, digits(bytes, &main[2..4])?, digits(bytes, &main[4..6])?),
            4 => (digits(bytes, &main[0..2])?, digits(bytes, &main[2..4])?, 0),
            len => {
                return Err(malformed(bytes, format!("unsupported time layout of length {len}")));
            }
        }
    } else {
        return Err(malformed(bytes, "time value is not ASCII"));
    };
    if minutes > 59 || seconds > 59 {
        return Err(malformed(bytes, "minutes and seconds must be below 60"));
    }
    let time = SqlTime {
        negative,
        hours,
        minutes: u8::try_from(minutes).unwrap_or(0),
        seconds: u8::try_from(seconds).unwrap_or(0),
        nanos,
    };
    Ok(time)
}

/// Parse a binary-protocol DATE/DATETIME/TIMESTAMP.
///
/// The first byte is the payload length: 0 (zero date), 4 (date), 7 (plus
/// time), or 11 (plus microseconds). All fields are little-endian.
pub fn parse_binary_datetime(bytes: &[u8]) -> Result<Parsed<NaiveDateTime>, DecodingError> {
    let mut reader = PacketReader::new(bytes);
    let len = reader
        .read_u8()
        .ok_or_else(|| DecodingError::truncated(0, bytes, 1))?;
    if !matches!(len, 0 | 4 | 7 | 11) {
        return Err(malformed(bytes, format!("invalid datetime length byte {len}")));
    }
    if reader.remaining() < usize::from(len) {
        return Err(DecodingError::truncated(0, bytes, 1 + usize::from(len)));
    }
    if len == 0 {
        return Ok(Parsed::Zero);
    }
    let truncated = || DecodingError::truncated(0, bytes, 1 + usize::from(len));
    let year = reader.read_u16_le().ok_or_else(truncated)?;
    let month = reader.read_u8().ok_or_else(truncated)?;
    let day = reader.read_u8().ok_or_else(truncated)?;
    let (mut hour, mut minute, mut second, mut micros) = (0, 0, 0, 0);
    if len >= 7 {
        hour = reader.read_u8().ok_or_else(truncated)?;
        minute = reader.read_u8().ok_or_else(truncated)?;
        second = reader.read_u8().ok_or_else(truncated)?;
    }
    if len == 11 {
        micros = reader.read_u32_le().ok_or_else(truncated)?;
    }
    build(
        bytes,
        (i32::from(year), u32::from(month), u32::from(day)),
        (
            u32::from(hour),
            u32::from(minute),
            u32::from(second),
            micros.saturating_mul(1_000),
        ),
    )
}

/// Parse a binary-protocol TIME: length byte 0, 8 or 12; then a sign byte,
/// a u32 day count, hours, minutes, seconds and optional microseconds.
pub fn parse_binary_time(bytes: &[u8]) -> Result<SqlTime, DecodingError> {
    let mut reader = PacketReader::new(bytes);
    let len = reader
        .read_u8()
        .ok_or_else(|| DecodingError::truncated(0, bytes, 1))?;
    if !matches!(len, 0 | 8 | 12) {
        return Err(malformed(bytes, format!("invalid time length byte {len}")));
    }
    if reader.remaining() < usize::from(len) {
        return Err(DecodingError::truncated(0, bytes, 1 + usize::from(len)));
    }
    if len == 0 {
        return Ok(SqlTime::default());
    }
    let truncated = || DecodingError::truncated(0, bytes, 1 + usize::from(len));
    let negative = reader.read_u8().ok_or_else(truncated)? != 0;
    let days = reader.read_u32_le().ok_or_else(truncated)?;
    let hour = reader.read_u8().ok_or_else(truncated)?;
    let minutes = reader.read_u8().ok_or_else(truncated)?;
    let seconds = reader.read_u8().ok_or_else(truncated)?;
    let micros = if len == 12 {
        reader.read_u32_le().ok_or_else(truncated)?
    } else {
        0
    };
    let hours = days
        .checked_mul(24)
        .and_then(|h| h.checked_add(u32::from(hour)))
        .ok_or_else(|| malformed(bytes, "time day count out of range"))?;
    Ok(SqlTime {
        negative,
        hours,
        minutes,
        seconds,
        nanos: micros.saturating_mul(1_000),
    })
}

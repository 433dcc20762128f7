//! Converts cell values into the C representation an application asked for.
//!
//! Every function in here is pure. Converting the same value into the same target type twice
//! writes the same bytes and reports the same indicator.

use atoi::FromRadix10SignedChecked;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error as ThisError;
use widestring::U16String;

use crate::{
    buffers::{Indicator, Pod, TargetType, write_pod},
    cell::{CellValue, DaySecond, YearMonth},
    sys::{Date, DaySecondStruct, IntervalStruct, IntervalType, Time, Timestamp, YearMonthStruct},
};

/// Outcome of writing a single value into an application buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Converted {
    /// Value for the indicator buffer. For variable length targets this is the length of the
    /// complete (remaining) value in bytes, regardless of how much has been written.
    pub indicator: Indicator,
    /// Number of payload bytes written, excluding any terminating zero.
    pub written: usize,
    /// `true` if the buffer has been too small to hold the complete value.
    pub truncated: bool,
}

impl Converted {
    fn null() -> Self {
        Converted {
            indicator: Indicator::Null,
            written: 0,
            truncated: false,
        }
    }

    fn fixed(size: usize) -> Self {
        Converted {
            indicator: Indicator::Length(size),
            written: size,
            truncated: false,
        }
    }
}

/// A value could not be converted into the requested C type. Nothing meaningful has been written
/// into the buffer in that case.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ConversionError {
    /// The value can not be converted into the C type at all (SQLSTATE 07006).
    #[error("Restricted data type attribute violation. A {source_type} value can not be converted \
        into {target:?}.")]
    RestrictedDataType {
        source_type: &'static str,
        target: TargetType,
    },
    /// The value does not fit into the C type (SQLSTATE 22003).
    #[error("Numeric value out of range. {value} can not be represented as {target:?}.")]
    NumericOutOfRange { value: String, target: TargetType },
    /// Text could not be parsed as a number or interval (SQLSTATE 22018).
    #[error("Invalid character value for cast specification. '{text}' is not a valid {target:?}.")]
    InvalidCharacterValue { text: String, target: TargetType },
    /// Text could not be parsed as a date, time or timestamp (SQLSTATE 22007).
    #[error("Invalid datetime format: '{text}'.")]
    InvalidDatetimeFormat { text: String },
    /// The buffer is smaller than the fixed size C type (SQLSTATE HY090).
    #[error("Invalid buffer length. {target:?} requires {required} bytes, but the buffer only \
        holds {actual}.")]
    BufferTooSmall {
        target: TargetType,
        required: usize,
        actual: usize,
    },
}

/// Writes `cell` into `buffer` as `target`.
///
/// `TargetType::Default` is resolved using the variant of `cell`. Callers which know the column
/// type should resolve it with [`crate::DataType::default_target_type`] first. `NULL` converts
/// into every target without touching the buffer.
pub fn convert(
    cell: &CellValue,
    target: TargetType,
    buffer: &mut [u8],
) -> Result<Converted, ConversionError> {
    if cell.is_null() {
        return Ok(Converted::null());
    }
    let target = if target == TargetType::Default {
        default_target_for(cell)
    } else {
        target
    };
    if target.is_variable_length() {
        let payload = encode_variable(cell, target)?;
        Ok(copy_variable(&payload, target, buffer))
    } else {
        convert_fixed(cell, target, buffer)
    }
}

/// Encodes `cell` the way it is presented to a variable length target: UTF-8 for `Char`, native
/// endian UTF-16 for `WChar` and the raw UTF-8 bytes of text for `Binary`. No terminator is
/// appended.
pub fn encode_variable(cell: &CellValue, target: TargetType) -> Result<Vec<u8>, ConversionError> {
    match target {
        TargetType::Char => Ok(text_representation(cell).into_bytes()),
        TargetType::WChar => {
            let wide = U16String::from_str(&text_representation(cell));
            Ok(wide
                .as_slice()
                .iter()
                .flat_map(|unit| unit.to_ne_bytes())
                .collect())
        }
        TargetType::Binary => match cell {
            CellValue::Text(text) => Ok(text.as_bytes().to_vec()),
            other => Err(restricted(other, target)),
        },
        _ => Err(restricted(cell, target)),
    }
}

/// Copies as much of an encoded payload into `buffer` as fits and zero terminates it if the
/// target is a character type and there is room for it. Truncation happens at code unit
/// boundaries.
pub fn copy_variable(payload: &[u8], target: TargetType, buffer: &mut [u8]) -> Converted {
    let (terminator, unit) = match target {
        TargetType::Char => (1, 1),
        TargetType::WChar => (2, 2),
        _ => (0, 1),
    };
    let capacity = buffer.len().saturating_sub(terminator);
    let capacity = capacity - capacity % unit;
    let written = payload.len().min(capacity);
    buffer[..written].copy_from_slice(&payload[..written]);
    if buffer.len() >= written + terminator {
        buffer[written..written + terminator].fill(0);
    }
    Converted {
        indicator: Indicator::Length(payload.len()),
        written,
        truncated: written < payload.len(),
    }
}

/// Text shown to applications binding a character type. Booleans are presented the way ODBC
/// converts `SQL_BIT` to text.
fn text_representation(cell: &CellValue) -> String {
    match cell {
        CellValue::Bool(true) => "1".to_owned(),
        CellValue::Bool(false) => "0".to_owned(),
        other => other.to_string(),
    }
}

fn default_target_for(cell: &CellValue) -> TargetType {
    match cell {
        CellValue::Bool(_) => TargetType::Bit,
        CellValue::I8(_) => TargetType::STinyInt,
        CellValue::I16(_) => TargetType::SShort,
        CellValue::I32(_) => TargetType::SLong,
        CellValue::I64(_) => TargetType::SBigInt,
        CellValue::U8(_) => TargetType::UTinyInt,
        CellValue::U16(_) => TargetType::UShort,
        CellValue::U32(_) => TargetType::ULong,
        CellValue::U64(_) => TargetType::UBigInt,
        CellValue::F64(_) => TargetType::Double,
        CellValue::Date(_) => TargetType::TypeDate,
        CellValue::Time(_) => TargetType::TypeTime,
        CellValue::Timestamp(_) => TargetType::TypeTimestamp,
        CellValue::IntervalYearMonth(_) => TargetType::IntervalYearToMonth,
        CellValue::IntervalDaySecond(_) => TargetType::IntervalDayToSecond,
        CellValue::Null
        | CellValue::Text(_)
        | CellValue::Array(_)
        | CellValue::Row(_)
        | CellValue::TimeSeries(_) => TargetType::Char,
    }
}

fn convert_fixed(
    cell: &CellValue,
    target: TargetType,
    buffer: &mut [u8],
) -> Result<Converted, ConversionError> {
    match target {
        TargetType::Bit => {
            let bit = to_bit(cell, target)?;
            write_fixed(bit, target, buffer)
        }
        TargetType::STinyInt => write_integer::<i8>(to_integer(cell, target)?, target, buffer),
        TargetType::UTinyInt => write_integer::<u8>(to_integer(cell, target)?, target, buffer),
        TargetType::SShort => write_integer::<i16>(to_integer(cell, target)?, target, buffer),
        TargetType::UShort => write_integer::<u16>(to_integer(cell, target)?, target, buffer),
        TargetType::SLong => write_integer::<i32>(to_integer(cell, target)?, target, buffer),
        TargetType::ULong => write_integer::<u32>(to_integer(cell, target)?, target, buffer),
        TargetType::SBigInt => write_integer::<i64>(to_integer(cell, target)?, target, buffer),
        TargetType::UBigInt => write_integer::<u64>(to_integer(cell, target)?, target, buffer),
        TargetType::Double => write_fixed(to_double(cell, target)?, target, buffer),
        TargetType::Float => {
            let n = to_double(cell, target)?;
            if n.is_finite() && n.abs() > f32::MAX as f64 {
                return Err(out_of_range(n, target));
            }
            write_fixed(n as f32, target, buffer)
        }
        TargetType::TypeDate => {
            let date = to_date(cell, target)?;
            let date = Date {
                year: year_as_i16(date.year(), target)?,
                month: date.month() as u16,
                day: date.day() as u16,
            };
            write_fixed(date, target, buffer)
        }
        TargetType::TypeTime => {
            let time = to_time(cell, target)?;
            let time = Time {
                hour: time.hour() as u16,
                minute: time.minute() as u16,
                second: time.second() as u16,
            };
            write_fixed(time, target, buffer)
        }
        TargetType::TypeTimestamp => {
            let ts = to_timestamp(cell, target)?;
            let ts = Timestamp {
                year: year_as_i16(ts.year(), target)?,
                month: ts.month() as u16,
                day: ts.day() as u16,
                hour: ts.hour() as u16,
                minute: ts.minute() as u16,
                second: ts.second() as u16,
                // Leap seconds are folded into the last regular second
                fraction: ts.nanosecond().min(999_999_999),
            };
            write_fixed(ts, target, buffer)
        }
        TargetType::Char | TargetType::WChar | TargetType::Binary | TargetType::Default => {
            convert(cell, target, buffer)
        }
        interval => {
            let interval_struct = to_interval(cell, interval)?;
            write_fixed(interval_struct, target, buffer)
        }
    }
}

fn write_fixed<T: Pod>(
    value: T,
    target: TargetType,
    buffer: &mut [u8],
) -> Result<Converted, ConversionError> {
    let actual = buffer.len();
    write_pod(value, buffer)
        .map(Converted::fixed)
        .ok_or(ConversionError::BufferTooSmall {
            target,
            required: size_of::<T>(),
            actual,
        })
}

fn write_integer<T>(
    n: i128,
    target: TargetType,
    buffer: &mut [u8],
) -> Result<Converted, ConversionError>
where
    T: Pod + TryFrom<i128>,
{
    let value = T::try_from(n).map_err(|_| out_of_range(n, target))?;
    write_fixed(value, target, buffer)
}

fn to_bit(cell: &CellValue, target: TargetType) -> Result<u8, ConversionError> {
    let n = match cell {
        CellValue::F64(n) => {
            // Fractions between 0 and 2 are truncated, like every other driver does.
            if !(0.0..2.0).contains(n) {
                return Err(out_of_range(n, target));
            }
            n.trunc() as i128
        }
        CellValue::Text(text) => match text.trim() {
            t if t.eq_ignore_ascii_case("true") => 1,
            t if t.eq_ignore_ascii_case("false") => 0,
            _ => to_integer(cell, target)?,
        },
        other => to_integer(other, target)?,
    };
    match n {
        0 => Ok(0),
        1 => Ok(1),
        other => Err(out_of_range(other, target)),
    }
}

fn to_integer(cell: &CellValue, target: TargetType) -> Result<i128, ConversionError> {
    if let Some(n) = cell.as_i128() {
        return Ok(n);
    }
    match cell {
        CellValue::F64(n) => double_to_integer(*n, target),
        CellValue::Text(text) => {
            if let Some(n) = parse_integer(text) {
                return Ok(n);
            }
            let n = parse_double(text, target)?;
            double_to_integer(n, target)
        }
        other => Err(restricted(other, target)),
    }
}

/// Fraction is truncated toward zero.
fn double_to_integer(n: f64, target: TargetType) -> Result<i128, ConversionError> {
    // i128 spans far more than any target type, so anything beyond it is out of range anyway.
    if !n.is_finite() || n.abs() >= 1e38 {
        return Err(out_of_range(n, target));
    }
    Ok(n.trunc() as i128)
}

fn to_double(cell: &CellValue, target: TargetType) -> Result<f64, ConversionError> {
    if let Some(n) = cell.as_i128() {
        return Ok(n as f64);
    }
    match cell {
        CellValue::F64(n) => Ok(*n),
        CellValue::Text(text) => parse_double(text, target),
        other => Err(restricted(other, target)),
    }
}

/// Parses an integer in decimal notation, allowing surrounding whitespace and a leading sign.
fn parse_integer(text: &str) -> Option<i128> {
    let trimmed = text.trim().as_bytes();
    if !trimmed.iter().any(u8::is_ascii_digit) {
        return None;
    }
    match i128::from_radix_10_signed_checked(trimmed) {
        (Some(n), used) if used == trimmed.len() => Some(n),
        _ => None,
    }
}

fn parse_double(text: &str, target: TargetType) -> Result<f64, ConversionError> {
    match text.trim() {
        "NaN" => Ok(f64::NAN),
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        trimmed => trimmed
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| invalid_character_value(text, target)),
    }
}

fn to_date(cell: &CellValue, target: TargetType) -> Result<NaiveDate, ConversionError> {
    match cell {
        CellValue::Date(date) => Ok(*date),
        CellValue::Timestamp(ts) => Ok(ts.date()),
        CellValue::Text(text) => {
            let trimmed = text.trim();
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .or_else(|_| parse_timestamp(trimmed).map(|ts| ts.date()))
                .map_err(|_| invalid_datetime(text))
        }
        other => Err(restricted(other, target)),
    }
}

/// Fractional seconds are dropped, `SQL_TIME_STRUCT` has no field for them.
fn to_time(cell: &CellValue, target: TargetType) -> Result<NaiveTime, ConversionError> {
    match cell {
        CellValue::Time(time) => Ok(*time),
        CellValue::Timestamp(ts) => Ok(ts.time()),
        CellValue::Text(text) => {
            let trimmed = text.trim();
            NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f")
                .or_else(|_| parse_timestamp(trimmed).map(|ts| ts.time()))
                .map_err(|_| invalid_datetime(text))
        }
        other => Err(restricted(other, target)),
    }
}

fn to_timestamp(cell: &CellValue, target: TargetType) -> Result<NaiveDateTime, ConversionError> {
    match cell {
        CellValue::Timestamp(ts) => Ok(*ts),
        CellValue::Date(date) => Ok(date.and_time(NaiveTime::MIN)),
        CellValue::Text(text) => {
            let trimmed = text.trim();
            parse_timestamp(trimmed)
                .or_else(|_| {
                    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                        .map(|date| date.and_time(NaiveTime::MIN))
                })
                .map_err(|_| invalid_datetime(text))
        }
        other => Err(restricted(other, target)),
    }
}

fn parse_timestamp(text: &str) -> chrono::ParseResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
}

fn year_as_i16(year: i32, target: TargetType) -> Result<i16, ConversionError> {
    i16::try_from(year).map_err(|_| out_of_range(year, target))
}

fn to_interval(cell: &CellValue, target: TargetType) -> Result<IntervalStruct, ConversionError> {
    let Some(interval_type) = target.interval_type() else {
        return Err(restricted(cell, target));
    };
    let year_month_target = matches!(
        interval_type,
        IntervalType::Year | IntervalType::Month | IntervalType::YearToMonth
    );
    match (cell, year_month_target) {
        (CellValue::IntervalYearMonth(ym), true) => year_month_struct(ym, interval_type, target),
        (CellValue::IntervalDaySecond(ds), false) => day_second_struct(ds, interval_type, target),
        (CellValue::Text(text), true) => {
            let ym: YearMonth = text
                .trim()
                .parse()
                .map_err(|_| invalid_character_value(text, target))?;
            year_month_struct(&ym, interval_type, target)
        }
        (CellValue::Text(text), false) => {
            let ds: DaySecond = text
                .trim()
                .parse()
                .map_err(|_| invalid_character_value(text, target))?;
            day_second_struct(&ds, interval_type, target)
        }
        (other, _) => Err(restricted(other, target)),
    }
}

fn year_month_struct(
    ym: &YearMonth,
    interval_type: IntervalType,
    target: TargetType,
) -> Result<IntervalStruct, ConversionError> {
    let (year, month) = match interval_type {
        IntervalType::Year => (ym.years as u64, 0),
        IntervalType::Month => (0, ym.total_months()),
        _ => (ym.years as u64, ym.months as u64),
    };
    let value = YearMonthStruct {
        year: field(year, ym, target)?,
        month: field(month, ym, target)?,
    };
    Ok(IntervalStruct::year_month(interval_type, ym.negative, value))
}

/// Fields not part of the interval type stay zero. The leading field carries the total.
fn day_second_struct(
    ds: &DaySecond,
    interval_type: IntervalType,
    target: TargetType,
) -> Result<IntervalStruct, ConversionError> {
    let days = ds.days as u64;
    let hours = ds.hours as u64;
    let minutes = ds.minutes as u64;
    let seconds = ds.seconds as u64;
    let (day, hour, minute, second, fraction) = match interval_type {
        IntervalType::Day => (days, 0, 0, 0, 0),
        IntervalType::Hour => (0, ds.total_hours(), 0, 0, 0),
        IntervalType::Minute => (0, 0, ds.total_minutes(), 0, 0),
        IntervalType::Second => (0, 0, 0, ds.total_seconds(), ds.nanos),
        IntervalType::DayToHour => (days, hours, 0, 0, 0),
        IntervalType::DayToMinute => (days, hours, minutes, 0, 0),
        IntervalType::HourToMinute => (0, ds.total_hours(), minutes, 0, 0),
        IntervalType::HourToSecond => (0, ds.total_hours(), minutes, seconds, ds.nanos),
        IntervalType::MinuteToSecond => (0, 0, ds.total_minutes(), seconds, ds.nanos),
        _ => (days, hours, minutes, seconds, ds.nanos),
    };
    let value = DaySecondStruct {
        day: field(day, ds, target)?,
        hour: field(hour, ds, target)?,
        minute: field(minute, ds, target)?,
        second: field(second, ds, target)?,
        fraction,
    };
    Ok(IntervalStruct::day_second(interval_type, ds.negative, value))
}

fn field(
    value: u64,
    interval: &impl std::fmt::Display,
    target: TargetType,
) -> Result<u32, ConversionError> {
    u32::try_from(value).map_err(|_| out_of_range(interval, target))
}

fn restricted(cell: &CellValue, target: TargetType) -> ConversionError {
    ConversionError::RestrictedDataType {
        source_type: cell.type_name(),
        target,
    }
}

fn out_of_range(value: impl ToString, target: TargetType) -> ConversionError {
    ConversionError::NumericOutOfRange {
        value: value.to_string(),
        target,
    }
}

fn invalid_character_value(text: &str, target: TargetType) -> ConversionError {
    ConversionError::InvalidCharacterValue {
        text: text.to_owned(),
        target,
    }
}

fn invalid_datetime(text: &str) -> ConversionError {
    ConversionError::InvalidDatetimeFormat {
        text: text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use test_case::test_case;

    use crate::{
        buffers::{Indicator, TargetType, read_pod},
        cell::{CellValue, DaySecond, YearMonth},
        sys::{Date, IntervalStruct, IntervalType, Timestamp},
    };

    use super::{ConversionError, convert, copy_variable, parse_integer};

    fn char_value(cell: &CellValue) -> String {
        let mut buffer = vec![0u8; 256];
        let converted = convert(cell, TargetType::Char, &mut buffer).unwrap();
        assert!(!converted.truncated);
        String::from_utf8(buffer[..converted.written].to_vec()).unwrap()
    }

    #[test_case(CellValue::Bool(true), "1"; "boolean true")]
    #[test_case(CellValue::Bool(false), "0"; "boolean false")]
    #[test_case(CellValue::I32(-42), "-42"; "integer")]
    #[test_case(CellValue::U64(u64::MAX), "18446744073709551615"; "unsigned big int")]
    #[test_case(CellValue::F64(1.5), "1.5"; "double")]
    #[test_case(CellValue::Text("Hello".to_owned()), "Hello"; "text")]
    #[test_case(CellValue::Array(vec![CellValue::Bool(true)]), "[true]"; "nested boolean")]
    fn render_as_char(cell: CellValue, expected: &str) {
        assert_eq!(expected, char_value(&cell));
    }

    #[test]
    fn null_converts_into_any_target_without_writing() {
        let mut buffer = [7u8; 8];
        for target in [TargetType::Char, TargetType::SLong, TargetType::TypeDate] {
            let converted = convert(&CellValue::Null, target, &mut buffer).unwrap();
            assert_eq!(Indicator::Null, converted.indicator);
        }
        assert_eq!([7u8; 8], buffer);
    }

    #[test]
    fn char_truncation_reports_full_length() {
        let cell = CellValue::Text("Hello, World!".to_owned());
        let mut buffer = [0xffu8; 6];
        let converted = convert(&cell, TargetType::Char, &mut buffer).unwrap();
        assert!(converted.truncated);
        assert_eq!(Indicator::Length(13), converted.indicator);
        assert_eq!(b"Hello\0", &buffer);
    }

    #[test]
    fn char_value_which_exactly_fits_the_terminator() {
        let cell = CellValue::Text("abc".to_owned());
        let mut buffer = [0xffu8; 4];
        let converted = convert(&cell, TargetType::Char, &mut buffer).unwrap();
        assert!(!converted.truncated);
        assert_eq!(b"abc\0", &buffer);
    }

    #[test]
    fn wchar_is_utf16_and_never_splits_a_code_unit() {
        let cell = CellValue::Text("Hello!!!".to_owned());
        let mut buffer = [0xffu8; 5];
        let converted = convert(&cell, TargetType::WChar, &mut buffer).unwrap();
        assert!(converted.truncated);
        assert_eq!(Indicator::Length(16), converted.indicator);
        // One code unit and the terminator. The fifth byte is left alone.
        assert_eq!(2, converted.written);
        assert_eq!(u16::from_ne_bytes([buffer[0], buffer[1]]), 'H' as u16);
        assert_eq!([0, 0, 0xff], buffer[2..]);
    }

    #[test]
    fn binary_is_only_available_for_text() {
        let mut buffer = [0u8; 8];
        let converted =
            convert(&CellValue::Text("ab".to_owned()), TargetType::Binary, &mut buffer).unwrap();
        assert_eq!(Indicator::Length(2), converted.indicator);
        let error = convert(&CellValue::I32(1), TargetType::Binary, &mut buffer).unwrap_err();
        assert!(matches!(error, ConversionError::RestrictedDataType { .. }));
    }

    #[test]
    fn piecewise_copy() {
        let payload = b"abcdef";
        let mut buffer = [0u8; 4];
        let first = copy_variable(payload, TargetType::Char, &mut buffer);
        assert_eq!(3, first.written);
        let second = copy_variable(&payload[first.written..], TargetType::Char, &mut buffer);
        assert_eq!(Indicator::Length(3), second.indicator);
        assert!(!second.truncated);
        assert_eq!(b"def\0", &buffer);
    }

    #[test_case(CellValue::I64(300), TargetType::STinyInt; "i64 to tiny int")]
    #[test_case(CellValue::I32(-1), TargetType::ULong; "negative to unsigned")]
    #[test_case(CellValue::F64(1e20), TargetType::SBigInt; "double to big int")]
    #[test_case(CellValue::F64(f64::NAN), TargetType::SLong; "nan to integer")]
    #[test_case(CellValue::I32(2), TargetType::Bit; "two to bit")]
    #[test_case(CellValue::F64(1e300), TargetType::Float; "double to float")]
    fn narrowing_never_wraps(cell: CellValue, target: TargetType) {
        let mut buffer = [0u8; 8];
        let error = convert(&cell, target, &mut buffer).unwrap_err();
        assert!(matches!(error, ConversionError::NumericOutOfRange { .. }));
    }

    #[test]
    fn double_to_integer_truncates_toward_zero() {
        let mut buffer = [0u8; 4];
        convert(&CellValue::F64(-42.9), TargetType::SLong, &mut buffer).unwrap();
        assert_eq!(-42, i32::from_ne_bytes(buffer));
    }

    #[test_case("42", 42; "plain")]
    #[test_case(" -7 ", -7; "whitespace and sign")]
    #[test_case("12.75", 12; "decimal is truncated")]
    fn text_to_integer(text: &str, expected: i64) {
        let mut buffer = [0u8; 8];
        convert(&CellValue::Text(text.to_owned()), TargetType::SBigInt, &mut buffer).unwrap();
        assert_eq!(expected, i64::from_ne_bytes(buffer));
    }

    #[test]
    fn text_which_is_no_number() {
        let mut buffer = [0u8; 8];
        let error =
            convert(&CellValue::Text("forty two".to_owned()), TargetType::Double, &mut buffer)
                .unwrap_err();
        assert!(matches!(error, ConversionError::InvalidCharacterValue { .. }));
        assert_eq!(None, parse_integer("-"));
    }

    #[test]
    fn text_to_bit() {
        let mut buffer = [9u8; 1];
        convert(&CellValue::Text("true".to_owned()), TargetType::Bit, &mut buffer).unwrap();
        assert_eq!([1], buffer);
        convert(&CellValue::Text("0".to_owned()), TargetType::Bit, &mut buffer).unwrap();
        assert_eq!([0], buffer);
    }

    #[test]
    fn date_to_timestamp_is_midnight() {
        let cell = CellValue::Date(NaiveDate::from_ymd_opt(2021, 3, 4).unwrap());
        let mut buffer = [0u8; size_of::<Timestamp>()];
        convert(&cell, TargetType::TypeTimestamp, &mut buffer).unwrap();
        let ts: Timestamp = unsafe { read_pod(&buffer) }.unwrap();
        assert_eq!(
            Timestamp {
                year: 2021,
                month: 3,
                day: 4,
                ..Timestamp::default()
            },
            ts
        );
    }

    #[test]
    fn timestamp_keeps_nanoseconds() {
        let ts = NaiveDateTime::parse_from_str(
            "2021-03-04 05:06:07.123456789",
            "%Y-%m-%d %H:%M:%S%.f",
        )
            .unwrap();
        let mut buffer = [0u8; size_of::<Timestamp>()];
        convert(&CellValue::Timestamp(ts), TargetType::TypeTimestamp, &mut buffer).unwrap();
        let written: Timestamp = unsafe { read_pod(&buffer) }.unwrap();
        assert_eq!(123_456_789, written.fraction);
        assert_eq!(7, written.second);
    }

    #[test]
    fn text_to_date() {
        let mut buffer = [0u8; size_of::<Date>()];
        convert(&CellValue::Text("2020-02-29".to_owned()), TargetType::TypeDate, &mut buffer)
            .unwrap();
        let date: Date = unsafe { read_pod(&buffer) }.unwrap();
        assert_eq!((2020, 2, 29), (date.year, date.month, date.day));
        let error =
            convert(&CellValue::Text("2021-02-29".to_owned()), TargetType::TypeDate, &mut buffer)
                .unwrap_err();
        assert!(matches!(error, ConversionError::InvalidDatetimeFormat { .. }));
    }

    #[test]
    fn time_can_not_become_a_date() {
        let cell = CellValue::Time(chrono::NaiveTime::from_hms_opt(1, 2, 3).unwrap());
        let mut buffer = [0u8; size_of::<Date>()];
        let error = convert(&cell, TargetType::TypeDate, &mut buffer).unwrap_err();
        assert_eq!(
            ConversionError::RestrictedDataType {
                source_type: "TIME",
                target: TargetType::TypeDate
            },
            error
        );
    }

    #[test]
    fn fixed_size_target_needs_room() {
        let mut buffer = [0u8; 2];
        let error = convert(&CellValue::I64(1), TargetType::SBigInt, &mut buffer).unwrap_err();
        assert_eq!(
            ConversionError::BufferTooSmall {
                target: TargetType::SBigInt,
                required: 8,
                actual: 2
            },
            error
        );
    }

    #[test]
    fn year_month_to_month_interval_carries_the_total() {
        let cell = CellValue::IntervalYearMonth(YearMonth::new(true, 4, 2));
        let mut buffer = [0u8; size_of::<IntervalStruct>()];
        convert(&cell, TargetType::IntervalMonth, &mut buffer).unwrap();
        let interval: IntervalStruct = unsafe { read_pod(&buffer) }.unwrap();
        assert_eq!(IntervalType::Month, interval.interval_type);
        assert!(interval.is_negative());
        assert_eq!(50, interval.as_year_month().unwrap().month);
    }

    #[test]
    fn day_second_interval() {
        let cell = CellValue::IntervalDaySecond("1 02:03:04.5".parse::<DaySecond>().unwrap());
        let mut buffer = [0u8; size_of::<IntervalStruct>()];
        convert(&cell, TargetType::IntervalHourToSecond, &mut buffer).unwrap();
        let interval: IntervalStruct = unsafe { read_pod(&buffer) }.unwrap();
        let ds = interval.as_day_second().unwrap();
        assert_eq!(
            (0, 26, 3, 4, 500_000_000),
            (ds.day, ds.hour, ds.minute, ds.second, ds.fraction)
        );
    }

    #[test]
    fn interval_family_mismatch() {
        let cell = CellValue::IntervalYearMonth(YearMonth::new(false, 1, 0));
        let mut buffer = [0u8; size_of::<IntervalStruct>()];
        let error = convert(&cell, TargetType::IntervalDay, &mut buffer).unwrap_err();
        assert!(matches!(error, ConversionError::RestrictedDataType { .. }));
    }

    #[test]
    fn default_target_follows_the_value() {
        let mut buffer = [0u8; 8];
        let converted = convert(&CellValue::I16(-3), TargetType::Default, &mut buffer).unwrap();
        assert_eq!(Indicator::Length(2), converted.indicator);
        assert_eq!(-3, i16::from_ne_bytes([buffer[0], buffer[1]]));
    }

    #[test]
    fn conversion_is_idempotent() {
        let cell = CellValue::Row(vec![
            CellValue::I32(1),
            CellValue::Text("a".to_owned()),
            CellValue::Null,
        ]);
        let mut first = [0u8; 5];
        let mut second = [0u8; 5];
        let a = convert(&cell, TargetType::WChar, &mut first).unwrap();
        let b = convert(&cell, TargetType::WChar, &mut second).unwrap();
        assert_eq!(a, b);
        assert_eq!(first, second);
    }
}

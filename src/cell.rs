use std::{
    fmt::{self, Display, Formatter, Write},
    str::FromStr,
};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error as ThisError;

/// Format used by the query engine (and by us) to represent dates as text.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Format used to render times. Fractions are always printed with nanosecond precision.
pub const TIME_FORMAT: &str = "%H:%M:%S%.9f";
/// Format used to render timestamps. Fractions are always printed with nanosecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

/// One value of a result set, as returned by the query engine.
///
/// All cells of one column share the same variant (or are [`CellValue::Null`]). The variant is
/// determined by the column type reported together with the first page of a result set.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F64(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    IntervalYearMonth(YearMonth),
    IntervalDaySecond(DaySecond),
    Array(Vec<CellValue>),
    Row(Vec<CellValue>),
    TimeSeries(Vec<TimeSeriesPoint>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "NULL",
            CellValue::Bool(_) => "BOOLEAN",
            CellValue::I8(_) => "TINYINT",
            CellValue::I16(_) => "SMALLINT",
            CellValue::I32(_) => "INTEGER",
            CellValue::I64(_) => "BIGINT",
            CellValue::U8(_) => "TINYINT UNSIGNED",
            CellValue::U16(_) => "SMALLINT UNSIGNED",
            CellValue::U32(_) => "INTEGER UNSIGNED",
            CellValue::U64(_) => "BIGINT UNSIGNED",
            CellValue::F64(_) => "DOUBLE",
            CellValue::Text(_) => "VARCHAR",
            CellValue::Date(_) => "DATE",
            CellValue::Time(_) => "TIME",
            CellValue::Timestamp(_) => "TIMESTAMP",
            CellValue::IntervalYearMonth(_) => "INTERVAL YEAR TO MONTH",
            CellValue::IntervalDaySecond(_) => "INTERVAL DAY TO SECOND",
            CellValue::Array(_) => "ARRAY",
            CellValue::Row(_) => "ROW",
            CellValue::TimeSeries(_) => "TIMESERIES",
        }
    }

    /// Integer variants widened to `i128`, so range checks against any target type are lossless.
    pub fn as_i128(&self) -> Option<i128> {
        let n = match *self {
            CellValue::Bool(b) => b as i128,
            CellValue::I8(n) => n.into(),
            CellValue::I16(n) => n.into(),
            CellValue::I32(n) => n.into(),
            CellValue::I64(n) => n.into(),
            CellValue::U8(n) => n.into(),
            CellValue::U16(n) => n.into(),
            CellValue::U32(n) => n.into(),
            CellValue::U64(n) => n.into(),
            _ => return None,
        };
        Some(n)
    }
}

/// Canonical text representation. This is what character targets (`SQL_C_CHAR`, `SQL_C_WCHAR`)
/// receive, with the exception of a top level boolean which ODBC demands to be rendered as `0` or
/// `1`.
impl Display for CellValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("null"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::I8(n) => write!(f, "{n}"),
            CellValue::I16(n) => write!(f, "{n}"),
            CellValue::I32(n) => write!(f, "{n}"),
            CellValue::I64(n) => write!(f, "{n}"),
            CellValue::U8(n) => write!(f, "{n}"),
            CellValue::U16(n) => write!(f, "{n}"),
            CellValue::U32(n) => write!(f, "{n}"),
            CellValue::U64(n) => write!(f, "{n}"),
            CellValue::F64(n) => fmt_double(*n, f),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            CellValue::Time(time) => write!(f, "{}", time.format(TIME_FORMAT)),
            CellValue::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            CellValue::IntervalYearMonth(interval) => Display::fmt(interval, f),
            CellValue::IntervalDaySecond(interval) => Display::fmt(interval, f),
            CellValue::Array(elements) => fmt_sequence(f, ('[', ']'), elements.iter()),
            CellValue::Row(fields) => fmt_sequence(f, ('(', ')'), fields.iter()),
            CellValue::TimeSeries(points) => fmt_sequence(f, ('[', ']'), points.iter()),
        }
    }
}

/// `f64` formatting of the standard library is locale independent and yields the shortest
/// representation which round trips. Only the spelling of non finite values differs from what
/// SQL engines print.
fn fmt_double(n: f64, f: &mut Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0. { "Infinity" } else { "-Infinity" })
    } else {
        write!(f, "{n}")
    }
}

/// Empty containers are rendered as `-`.
fn fmt_sequence<T: Display>(
    f: &mut Formatter<'_>,
    (open, close): (char, char),
    mut items: impl Iterator<Item = T>,
) -> fmt::Result {
    let Some(first) = items.next() else {
        return f.write_char('-');
    };
    f.write_char(open)?;
    write!(f, "{first}")?;
    for item in items {
        write!(f, ",{item}")?;
    }
    f.write_char(close)
}

/// One measure of a time series.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesPoint {
    pub time: NaiveDateTime,
    pub value: CellValue,
}

impl Display for TimeSeriesPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{time: {}, value: {}}}",
            self.time.format(TIMESTAMP_FORMAT),
            self.value
        )
    }
}

/// Text could not be interpreted as an interval literal.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("'{0}' is not a valid interval literal.")]
pub struct InvalidIntervalLiteral(pub String);

/// `INTERVAL YEAR TO MONTH`, rendered as `[-]Y-M`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct YearMonth {
    pub negative: bool,
    pub years: u32,
    pub months: u32,
}

impl YearMonth {
    /// Normalizes months beyond eleven into years. Years saturate at `u32::MAX`.
    pub fn new(negative: bool, years: u32, months: u32) -> Self {
        Self {
            negative,
            years: years.saturating_add(months / 12),
            months: months % 12,
        }
    }

    pub fn total_months(&self) -> u64 {
        u64::from(self.years) * 12 + u64::from(self.months)
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { "-" } else { "" };
        write!(f, "{sign}{}-{}", self.years, self.months)
    }
}

impl FromStr for YearMonth {
    type Err = InvalidIntervalLiteral;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidIntervalLiteral(text.to_owned());
        let (negative, unsigned) = split_sign(text.trim());
        let (years, months) = unsigned.split_once('-').ok_or_else(invalid)?;
        let years = years.parse().map_err(|_| invalid())?;
        let months: u32 = months.parse().map_err(|_| invalid())?;
        if months > 11 {
            return Err(invalid());
        }
        Ok(YearMonth {
            negative,
            years,
            months,
        })
    }
}

/// `INTERVAL DAY TO SECOND`, rendered as `[-]D HH:MM:SS.fffffffff`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DaySecond {
    pub negative: bool,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub nanos: u32,
}

impl DaySecond {
    pub fn total_hours(&self) -> u64 {
        u64::from(self.days) * 24 + u64::from(self.hours)
    }

    pub fn total_minutes(&self) -> u64 {
        self.total_hours() * 60 + u64::from(self.minutes)
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_minutes() * 60 + u64::from(self.seconds)
    }
}

impl Display for DaySecond {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { "-" } else { "" };
        write!(
            f,
            "{sign}{} {:02}:{:02}:{:02}.{:09}",
            self.days, self.hours, self.minutes, self.seconds, self.nanos
        )
    }
}

impl FromStr for DaySecond {
    type Err = InvalidIntervalLiteral;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidIntervalLiteral(text.to_owned());
        let (negative, unsigned) = split_sign(text.trim());
        let (days, clock) = unsigned.split_once(' ').ok_or_else(invalid)?;
        let days = days.parse().map_err(|_| invalid())?;
        let (clock, fraction) = clock.split_once('.').unwrap_or((clock, ""));
        let mut parts = clock.splitn(3, ':');
        let mut next_part = |max: u32| -> Result<u32, InvalidIntervalLiteral> {
            let part: u32 = parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(invalid)?;
            if part > max { Err(invalid()) } else { Ok(part) }
        };
        let hours = next_part(23)?;
        let minutes = next_part(59)?;
        let seconds = next_part(59)?;
        let nanos = parse_fraction_as_nanos(fraction).ok_or_else(invalid)?;
        Ok(DaySecond {
            negative,
            days,
            hours,
            minutes,
            seconds,
            nanos,
        })
    }
}

fn split_sign(text: &str) -> (bool, &str) {
    match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    }
}

/// Interprets up to nine fraction digits as nanoseconds. `"5"` is half a second. Digits beyond
/// nanosecond precision are ignored.
fn parse_fraction_as_nanos(fraction: &str) -> Option<u32> {
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let significant = &fraction[..fraction.len().min(9)];
    let mut nanos = 0u32;
    for digit in significant.bytes() {
        nanos = nanos * 10 + u32::from(digit - b'0');
    }
    for _ in significant.len()..9 {
        nanos *= 10;
    }
    Some(nanos)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{CellValue, DaySecond, TimeSeriesPoint, YearMonth};

    fn timestamp(text: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    #[test]
    fn empty_containers_render_as_dash() {
        assert_eq!("-", CellValue::Array(Vec::new()).to_string());
        assert_eq!("-", CellValue::Row(Vec::new()).to_string());
        assert_eq!("-", CellValue::TimeSeries(Vec::new()).to_string());
    }

    #[test]
    fn nested_containers() {
        let value = CellValue::Array(vec![
            CellValue::Row(vec![CellValue::I32(1), CellValue::Text("a".to_owned())]),
            CellValue::Row(vec![CellValue::Null, CellValue::F64(2.5)]),
        ]);
        assert_eq!("[(1,a),(null,2.5)]", value.to_string());
    }

    #[test]
    fn time_series() {
        let value = CellValue::TimeSeries(vec![
            TimeSeriesPoint {
                time: timestamp("2021-03-05 14:18:30.123456789"),
                value: CellValue::F64(1.0),
            },
            TimeSeriesPoint {
                time: timestamp("2021-03-05 14:18:31"),
                value: CellValue::F64(2.0),
            },
        ]);
        assert_eq!(
            "[{time: 2021-03-05 14:18:30.123456789, value: 1},\
            {time: 2021-03-05 14:18:31.000000000, value: 2}]",
            value.to_string()
        );
    }

    #[test]
    fn doubles_are_locale_independent_and_integral_values_have_no_point() {
        assert_eq!("3.25", CellValue::F64(3.25).to_string());
        assert_eq!("-2", CellValue::F64(-2.0).to_string());
        assert_eq!("Infinity", CellValue::F64(f64::INFINITY).to_string());
        assert_eq!("NaN", CellValue::F64(f64::NAN).to_string());
    }

    #[test]
    fn date_renders_iso() {
        let date = NaiveDate::from_ymd_opt(2021, 1, 2).unwrap();
        assert_eq!("2021-01-02", CellValue::Date(date).to_string());
    }

    #[test]
    fn year_month_round_trip() {
        let interval: YearMonth = "4-2".parse().unwrap();
        assert_eq!(YearMonth::new(false, 4, 2), interval);
        assert_eq!("4-2", interval.to_string());
        let negative: YearMonth = "-1-11".parse().unwrap();
        assert!(negative.negative);
        assert_eq!("-1-11", negative.to_string());
    }

    #[test]
    fn months_are_normalized_into_years() {
        assert_eq!(YearMonth::new(false, 5, 2), YearMonth::new(false, 3, 26));
        let saturated = YearMonth::new(true, u32::MAX, u32::MAX);
        assert_eq!(u32::MAX, saturated.years);
        assert_eq!(u32::MAX % 12, saturated.months);
    }

    #[test]
    fn month_overflow_is_rejected() {
        assert!("1-12".parse::<YearMonth>().is_err());
        assert!("abc".parse::<YearMonth>().is_err());
    }

    #[test]
    fn day_second_parse() {
        let interval: DaySecond = "1 02:03:04.5".parse().unwrap();
        assert_eq!(
            DaySecond {
                negative: false,
                days: 1,
                hours: 2,
                minutes: 3,
                seconds: 4,
                nanos: 500_000_000
            },
            interval
        );
        assert_eq!("1 02:03:04.500000000", interval.to_string());
    }

    #[test]
    fn day_second_without_fraction() {
        let interval: DaySecond = "-0 00:00:01".parse().unwrap();
        assert!(interval.negative);
        assert_eq!(1, interval.total_seconds());
    }

    #[test]
    fn day_second_rejects_garbage() {
        assert!("1 25:00:00".parse::<DaySecond>().is_err());
        assert!("1 02:03".parse::<DaySecond>().is_err());
        assert!("02:03:04".parse::<DaySecond>().is_err());
    }
}

use crate::buffers::TargetType;

/// Enumeration over the SQL data types a column of a Timestream result set can have, as reported
/// to ODBC applications via `SQLDescribeCol` and `SQLColAttribute`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DataType {
    /// The type is not known. Timestream reports columns of only `NULL` values this way.
    #[default]
    Unknown,
    /// `BOOLEAN`, reported as `BIT`.
    Bit,
    /// `TINYINT`. Exact numeric value with precision 3 and scale 0.
    TinyInt,
    /// `SMALLINT`. 16 Bit Integer.
    SmallInt,
    /// `INTEGER`. 32 Bit Integer.
    Integer,
    /// `BIGINT`. 64 Bit Integer.
    BigInt,
    /// `DOUBLE`. Signed, approximate, numeric value with a binary precision 53.
    Double,
    /// `VARCHAR(n)`. Variable length character string.
    Varchar {
        /// Maximum length of the character string (excluding terminating zero).
        length: usize,
    },
    /// `DATE`. Year, month, and day fields.
    Date,
    /// `TIME`. Precision indicates the number of fraction digits of the seconds.
    Time { precision: i16 },
    /// `TIMESTAMP`. Precision indicates the number of fraction digits of the seconds.
    Timestamp { precision: i16 },
    /// `INTERVAL YEAR TO MONTH`
    IntervalYearToMonth,
    /// `INTERVAL DAY TO SECOND`. Precision indicates the number of fraction digits of the seconds.
    IntervalDayToSecond { precision: i16 },
    /// `ARRAY(...)`. Applications see its text representation.
    Array,
    /// `ROW(...)`. Applications see its text representation.
    Row,
    /// `TIMESERIES(...)`. Applications see its text representation.
    TimeSeries,
}

/// Maximum length reported for character columns of unknown length. Nested values (arrays, rows,
/// time series) are rendered as text and may grow up to this.
pub const MAX_VARCHAR_LENGTH: usize = 2_147_483_647;

impl DataType {
    /// Maps the scalar type name used by the query engine to a data type. `None` for names which
    /// are not known.
    pub fn from_scalar_type_name(name: &str) -> Option<Self> {
        let data_type = match name {
            "BOOLEAN" => DataType::Bit,
            "TINYINT" => DataType::TinyInt,
            "SMALLINT" => DataType::SmallInt,
            "INTEGER" => DataType::Integer,
            "BIGINT" => DataType::BigInt,
            "DOUBLE" => DataType::Double,
            "VARCHAR" => DataType::Varchar {
                length: MAX_VARCHAR_LENGTH,
            },
            "DATE" => DataType::Date,
            "TIME" => DataType::Time { precision: 9 },
            "TIMESTAMP" => DataType::Timestamp { precision: 9 },
            "INTERVAL_YEAR_TO_MONTH" => DataType::IntervalYearToMonth,
            "INTERVAL_DAY_TO_SECOND" => DataType::IntervalDayToSecond { precision: 9 },
            "UNKNOWN" => DataType::Unknown,
            _ => return None,
        };
        Some(data_type)
    }

    /// The `SQL_*` type code reported to the application. Nested types are reported as
    /// `SQL_VARCHAR`, since applications receive them as text.
    pub fn sql_type_code(&self) -> i16 {
        match self {
            DataType::Unknown => 0,
            DataType::Bit => -7,
            DataType::TinyInt => -6,
            DataType::SmallInt => 5,
            DataType::Integer => 4,
            DataType::BigInt => -5,
            DataType::Double => 8,
            DataType::Varchar { .. } | DataType::Array | DataType::Row | DataType::TimeSeries => 12,
            DataType::Date => 91,
            DataType::Time { .. } => 92,
            DataType::Timestamp { .. } => 93,
            DataType::IntervalYearToMonth => 107,
            DataType::IntervalDayToSecond { .. } => 110,
        }
    }

    /// Column size as defined by ODBC: Maximum number of characters for text, precision for
    /// numbers and the number of characters in the text representation for temporal types.
    pub fn column_size(&self) -> usize {
        match self {
            DataType::Unknown => 0,
            DataType::Bit => 1,
            DataType::TinyInt => 3,
            DataType::SmallInt => 5,
            DataType::Integer => 10,
            DataType::BigInt => 19,
            DataType::Double => 15,
            DataType::Varchar { length } => *length,
            DataType::Array | DataType::Row | DataType::TimeSeries => MAX_VARCHAR_LENGTH,
            DataType::Date => 10,
            DataType::Time { precision } => 8 + fraction_size(*precision),
            DataType::Timestamp { precision } => 19 + fraction_size(*precision),
            // Sign, nine year digits, dash and two month digits
            DataType::IntervalYearToMonth => 13,
            DataType::IntervalDayToSecond { precision } => 19 + fraction_size(*precision),
        }
    }

    /// Number of fraction digits of the seconds or the scale of numeric types.
    pub fn decimal_digits(&self) -> i16 {
        match self {
            DataType::Time { precision }
            | DataType::Timestamp { precision }
            | DataType::IntervalDayToSecond { precision } => *precision,
            _ => 0,
        }
    }

    /// Maximum number of characters needed to display a value of this type.
    pub fn display_size(&self) -> usize {
        match self {
            // sign + digits
            DataType::TinyInt => 4,
            DataType::SmallInt => 6,
            DataType::Integer => 11,
            DataType::BigInt => 20,
            // sign, 15 digits, decimal point, the letter E, sign and three exponent digits
            DataType::Double => 24,
            other => other.column_size(),
        }
    }

    /// C type used if the application requests `SQL_C_DEFAULT`.
    pub fn default_target_type(&self) -> TargetType {
        match self {
            DataType::Unknown
            | DataType::Varchar { .. }
            | DataType::Array
            | DataType::Row
            | DataType::TimeSeries => TargetType::Char,
            DataType::Bit => TargetType::Bit,
            DataType::TinyInt => TargetType::STinyInt,
            DataType::SmallInt => TargetType::SShort,
            DataType::Integer => TargetType::SLong,
            DataType::BigInt => TargetType::SBigInt,
            DataType::Double => TargetType::Double,
            DataType::Date => TargetType::TypeDate,
            DataType::Time { .. } => TargetType::TypeTime,
            DataType::Timestamp { .. } => TargetType::TypeTimestamp,
            DataType::IntervalYearToMonth => TargetType::IntervalYearToMonth,
            DataType::IntervalDayToSecond { .. } => TargetType::IntervalDayToSecond,
        }
    }
}

/// Decimal point plus digits.
fn fraction_size(precision: i16) -> usize {
    if precision > 0 {
        precision as usize + 1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::DataType;

    #[test]
    fn nested_types_are_reported_as_varchar() {
        assert_eq!(12, DataType::Array.sql_type_code());
        assert_eq!(12, DataType::Row.sql_type_code());
        assert_eq!(12, DataType::TimeSeries.sql_type_code());
    }

    #[test]
    fn timestamp_column_size_includes_fraction() {
        let data_type = DataType::from_scalar_type_name("TIMESTAMP").unwrap();
        // `2021-01-01 00:00:00.000000000`
        assert_eq!(29, data_type.column_size());
    }

    #[test]
    fn unknown_scalar_type_name() {
        assert_eq!(None, DataType::from_scalar_type_name("GEOMETRY"));
    }
}

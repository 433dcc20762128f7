use crate::sys::{Date, IntervalStruct, IntervalType, Time, Timestamp};

/// C data types an application may request a column value as (`SQL_C_*`). Closed, so every
/// combination with a [`crate::CellValue`] variant is handled exactly once by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    /// `SQL_C_CHAR`: UTF-8 encoded, zero terminated text.
    Char,
    /// `SQL_C_WCHAR`: UTF-16 encoded, zero terminated text.
    WChar,
    /// `SQL_C_BINARY`
    Binary,
    /// `SQL_C_BIT`: `0` or `1` in a single byte.
    Bit,
    /// `SQL_C_STINYINT` (also `SQL_C_TINYINT`)
    STinyInt,
    /// `SQL_C_UTINYINT`
    UTinyInt,
    /// `SQL_C_SSHORT` (also `SQL_C_SHORT`)
    SShort,
    /// `SQL_C_USHORT`
    UShort,
    /// `SQL_C_SLONG` (also `SQL_C_LONG`)
    SLong,
    /// `SQL_C_ULONG`
    ULong,
    /// `SQL_C_SBIGINT`
    SBigInt,
    /// `SQL_C_UBIGINT`
    UBigInt,
    /// `SQL_C_FLOAT`
    Float,
    /// `SQL_C_DOUBLE`
    Double,
    /// `SQL_C_TYPE_DATE` (also `SQL_C_DATE`)
    TypeDate,
    /// `SQL_C_TYPE_TIME` (also `SQL_C_TIME`)
    TypeTime,
    /// `SQL_C_TYPE_TIMESTAMP` (also `SQL_C_TIMESTAMP`)
    TypeTimestamp,
    IntervalYear,
    IntervalMonth,
    IntervalYearToMonth,
    IntervalDay,
    IntervalHour,
    IntervalMinute,
    IntervalSecond,
    IntervalDayToHour,
    IntervalDayToMinute,
    IntervalDayToSecond,
    IntervalHourToMinute,
    IntervalHourToSecond,
    IntervalMinuteToSecond,
    /// `SQL_C_DEFAULT`. Resolved to a concrete type using the column type before converting.
    Default,
}

impl TargetType {
    /// Maps an `SQL_C_*` code as passed to `SQLBindCol` or `SQLGetData`. `None` for codes the
    /// driver does not support.
    pub fn from_code(code: i16) -> Option<Self> {
        let target = match code {
            1 => TargetType::Char,
            -8 => TargetType::WChar,
            -2 => TargetType::Binary,
            -7 => TargetType::Bit,
            -6 | -26 => TargetType::STinyInt,
            -28 => TargetType::UTinyInt,
            5 | -15 => TargetType::SShort,
            -17 => TargetType::UShort,
            4 | -16 => TargetType::SLong,
            -18 => TargetType::ULong,
            -25 => TargetType::SBigInt,
            -27 => TargetType::UBigInt,
            7 => TargetType::Float,
            8 => TargetType::Double,
            9 | 91 => TargetType::TypeDate,
            10 | 92 => TargetType::TypeTime,
            11 | 93 => TargetType::TypeTimestamp,
            99 => TargetType::Default,
            101 => TargetType::IntervalYear,
            102 => TargetType::IntervalMonth,
            103 => TargetType::IntervalDay,
            104 => TargetType::IntervalHour,
            105 => TargetType::IntervalMinute,
            106 => TargetType::IntervalSecond,
            107 => TargetType::IntervalYearToMonth,
            108 => TargetType::IntervalDayToHour,
            109 => TargetType::IntervalDayToMinute,
            110 => TargetType::IntervalDayToSecond,
            111 => TargetType::IntervalHourToMinute,
            112 => TargetType::IntervalHourToSecond,
            113 => TargetType::IntervalMinuteToSecond,
            _ => return None,
        };
        Some(target)
    }

    /// The canonical `SQL_C_*` code of this type.
    pub fn code(self) -> i16 {
        match self {
            TargetType::Char => 1,
            TargetType::WChar => -8,
            TargetType::Binary => -2,
            TargetType::Bit => -7,
            TargetType::STinyInt => -26,
            TargetType::UTinyInt => -28,
            TargetType::SShort => -15,
            TargetType::UShort => -17,
            TargetType::SLong => -16,
            TargetType::ULong => -18,
            TargetType::SBigInt => -25,
            TargetType::UBigInt => -27,
            TargetType::Float => 7,
            TargetType::Double => 8,
            TargetType::TypeDate => 91,
            TargetType::TypeTime => 92,
            TargetType::TypeTimestamp => 93,
            TargetType::Default => 99,
            other => 100 + other.interval_type().map_or(0, |t| t as i16),
        }
    }

    /// Variable length types are written piecewise by repeated calls to `SQLGetData`.
    pub fn is_variable_length(self) -> bool {
        matches!(
            self,
            TargetType::Char | TargetType::WChar | TargetType::Binary
        )
    }

    /// Size in bytes of one element of a fixed size type. ODBC ignores the buffer length the
    /// application specifies for these, so this is also the stride between elements of a bound
    /// array. `None` for variable length types and [`TargetType::Default`].
    pub fn fixed_size(self) -> Option<usize> {
        let size = match self {
            TargetType::Char | TargetType::WChar | TargetType::Binary | TargetType::Default => {
                return None;
            }
            TargetType::Bit | TargetType::STinyInt | TargetType::UTinyInt => 1,
            TargetType::SShort | TargetType::UShort => 2,
            TargetType::SLong | TargetType::ULong | TargetType::Float => 4,
            TargetType::SBigInt | TargetType::UBigInt | TargetType::Double => 8,
            TargetType::TypeDate => size_of::<Date>(),
            TargetType::TypeTime => size_of::<Time>(),
            TargetType::TypeTimestamp => size_of::<Timestamp>(),
            _ => size_of::<IntervalStruct>(),
        };
        Some(size)
    }

    /// `Some` for the interval targets, identifying the layout of the `SQL_INTERVAL_STRUCT`.
    pub fn interval_type(self) -> Option<IntervalType> {
        let interval_type = match self {
            TargetType::IntervalYear => IntervalType::Year,
            TargetType::IntervalMonth => IntervalType::Month,
            TargetType::IntervalYearToMonth => IntervalType::YearToMonth,
            TargetType::IntervalDay => IntervalType::Day,
            TargetType::IntervalHour => IntervalType::Hour,
            TargetType::IntervalMinute => IntervalType::Minute,
            TargetType::IntervalSecond => IntervalType::Second,
            TargetType::IntervalDayToHour => IntervalType::DayToHour,
            TargetType::IntervalDayToMinute => IntervalType::DayToMinute,
            TargetType::IntervalDayToSecond => IntervalType::DayToSecond,
            TargetType::IntervalHourToMinute => IntervalType::HourToMinute,
            TargetType::IntervalHourToSecond => IntervalType::HourToSecond,
            TargetType::IntervalMinuteToSecond => IntervalType::MinuteToSecond,
            _ => return None,
        };
        Some(interval_type)
    }
}

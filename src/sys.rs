//! Plain ODBC C definitions the result set engine writes into application buffers.
//!
//! A driver is loaded by the driver manager, so it must not link against `libodbc` itself. This
//! module therefore only carries the constants and `#[repr(C)]` layouts from `sql.h`, `sqlext.h`
//! and `sqltypes.h` which are needed to talk to application buffers.

/// `SQLLEN`
pub type Len = isize;

/// Indicator value signaling a `NULL` value (`SQL_NULL_DATA`).
pub const NULL_DATA: Len = -1;
/// Indicator value signaling that the total length of the value is unknown (`SQL_NO_TOTAL`).
pub const NO_TOTAL: Len = -4;

/// Return code of an ODBC function (`SQLRETURN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SqlReturn(pub i16);

impl SqlReturn {
    pub const INVALID_HANDLE: SqlReturn = SqlReturn(-2);
    pub const ERROR: SqlReturn = SqlReturn(-1);
    pub const SUCCESS: SqlReturn = SqlReturn(0);
    pub const SUCCESS_WITH_INFO: SqlReturn = SqlReturn(1);
    pub const STILL_EXECUTING: SqlReturn = SqlReturn(2);
    pub const NEED_DATA: SqlReturn = SqlReturn(99);
    pub const NO_DATA: SqlReturn = SqlReturn(100);
}

/// Values written into the row status array (`SQL_ATTR_ROW_STATUS_PTR`).
pub mod row_status {
    pub const SUCCESS: u16 = 0;
    pub const NOROW: u16 = 3;
    pub const ERROR: u16 = 5;
    pub const SUCCESS_WITH_INFO: u16 = 6;
}

/// `SQL_DATE_STRUCT`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Date {
    pub year: i16,
    pub month: u16,
    pub day: u16,
}

/// `SQL_TIME_STRUCT`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Time {
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
}

/// `SQL_TIMESTAMP_STRUCT`. `fraction` is given in nanoseconds.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub year: i16,
    pub month: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    pub fraction: u32,
}

/// `SQLINTERVAL`, identifies which fields of an [`IntervalStruct`] are meaningful.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalType {
    Year = 1,
    Month = 2,
    Day = 3,
    Hour = 4,
    Minute = 5,
    Second = 6,
    YearToMonth = 7,
    DayToHour = 8,
    DayToMinute = 9,
    DayToSecond = 10,
    HourToMinute = 11,
    HourToSecond = 12,
    MinuteToSecond = 13,
}

/// `SQL_YEAR_MONTH_STRUCT`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct YearMonthStruct {
    pub year: u32,
    pub month: u32,
}

/// `SQL_DAY_SECOND_STRUCT`. `fraction` is given in nanoseconds.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DaySecondStruct {
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub fraction: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union IntervalValue {
    pub year_month: YearMonthStruct,
    pub day_second: DaySecondStruct,
}

/// `SQL_INTERVAL_STRUCT`
#[repr(C)]
#[derive(Clone, Copy)]
pub struct IntervalStruct {
    pub interval_type: IntervalType,
    /// `1` (`SQL_TRUE`) for negative intervals, `0` otherwise.
    pub interval_sign: i16,
    pub intval: IntervalValue,
}

impl IntervalStruct {
    pub fn year_month(interval_type: IntervalType, negative: bool, value: YearMonthStruct) -> Self {
        Self {
            interval_type,
            interval_sign: negative as i16,
            intval: IntervalValue { year_month: value },
        }
    }

    pub fn day_second(interval_type: IntervalType, negative: bool, value: DaySecondStruct) -> Self {
        Self {
            interval_type,
            interval_sign: negative as i16,
            intval: IntervalValue { day_second: value },
        }
    }

    pub fn is_negative(&self) -> bool {
        self.interval_sign != 0
    }

    /// Year and month fields, `None` if this is a day to second interval.
    pub fn as_year_month(&self) -> Option<YearMonthStruct> {
        match self.interval_type {
            IntervalType::Year | IntervalType::Month | IntervalType::YearToMonth => {
                // Safety: The interval type tells us which member of the union has been written.
                Some(unsafe { self.intval.year_month })
            }
            _ => None,
        }
    }

    /// Day to second fields, `None` if this is a year to month interval.
    pub fn as_day_second(&self) -> Option<DaySecondStruct> {
        match self.interval_type {
            IntervalType::Year | IntervalType::Month | IntervalType::YearToMonth => None,
            // Safety: The interval type tells us which member of the union has been written.
            _ => Some(unsafe { self.intval.day_second }),
        }
    }
}

impl Default for IntervalStruct {
    fn default() -> Self {
        Self::day_second(IntervalType::DayToSecond, false, DaySecondStruct::default())
    }
}

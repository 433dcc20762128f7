//! # Timestream ODBC result sets
//!
//! Result set engine of an ODBC driver for Amazon Timestream. Queries are answered by the query
//! service in pages chained by continuation tokens. This crate fetches these pages in the
//! background, hands their rows out in order and converts the values into the C types an
//! application requests with `SQLBindCol` or `SQLGetData`.
//!
//! The entry point is [`ResultSetController`]. It is generic over the [`transport::QueryTransport`]
//! used to talk to the service, so tests and other front ends can provide their own.

mod cell;
mod column_description;
mod config;
mod data_type;
mod error;
mod page;
mod result_set;

pub mod buffers;
pub mod conversion;
pub mod cursor;
pub mod diagnostics;
pub mod fetcher;
pub mod scheduler;
pub mod sql_result;
pub mod sys;
pub mod transport;

pub use self::{
    cell::{
        CellValue, DATE_FORMAT, DaySecond, InvalidIntervalLiteral, TIME_FORMAT, TIMESTAMP_FORMAT,
        TimeSeriesPoint, YearMonth,
    },
    column_description::{ColumnDescription, Nullability},
    config::Configuration,
    conversion::ConversionError,
    data_type::DataType,
    error::Error,
    fetcher::FetchError,
    page::ResultPage,
    result_set::{FetchOrientation, ResultSetController, StatementState},
    sql_result::SqlResult,
};
// Reexports
pub use widestring::{U16Str, U16String};

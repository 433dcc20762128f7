use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;
use thiserror::Error as ThisError;

use crate::{
    CellValue, ColumnDescription, Configuration, DataType, Nullability,
    cell::{DaySecond, TimeSeriesPoint, YearMonth},
    page::ResultPage,
    transport::{
        ColumnInfo, ColumnType, Datum, QueryRequest, QueryResponse, QueryTransport,
        TransportError,
    },
};

/// Fetching a page of the result set failed.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum FetchError {
    /// The query service could not be reached, did not answer in time, or the connection broke
    /// down while fetching.
    #[error("Communication link failure: {0}")]
    TransportFailure(String),
    /// The query service reports the query as failed.
    #[error("Query failed: {message}")]
    ServerError { message: String },
    /// The response does not fit the column types of the result set.
    #[error("Failed to parse query response: {0}")]
    ParseFailure(String),
}

impl From<TransportError> for FetchError {
    fn from(source: TransportError) -> Self {
        match source {
            TransportError::Connection(message) => FetchError::TransportFailure(message),
            TransportError::Timeout(message) => {
                FetchError::TransportFailure(format!("Request timed out: {message}"))
            }
            TransportError::Query(message) => FetchError::ServerError { message },
            TransportError::Malformed(message) => FetchError::ParseFailure(message),
        }
    }
}

/// Everything known after the query has been submitted.
#[derive(Debug, Clone)]
pub struct FirstPage {
    pub query_id: String,
    pub columns: Vec<ColumnDescription>,
    pub page: ResultPage,
}

/// Turns responses of the query service into [`ResultPage`]s. Besides the transport it only
/// remembers the request and the column types of the submitted query, so it can be cloned into
/// the thread fetching pages in the background.
#[derive(Clone)]
pub struct PageFetcher {
    transport: Arc<dyn QueryTransport>,
    request: QueryRequest,
    column_types: Arc<Vec<ColumnType>>,
}

impl PageFetcher {
    pub fn new(transport: Arc<dyn QueryTransport>, config: &Configuration) -> Self {
        Self {
            transport,
            request: QueryRequest::new(String::new(), config.max_rows()),
            column_types: Arc::new(Vec::new()),
        }
    }

    /// Submits `sql` to the query service and parses the first page of its result set.
    pub fn submit(&mut self, sql: &str) -> Result<FirstPage, FetchError> {
        self.request.sql = sql.to_owned();
        let response = self.transport.submit_query(&self.request)?;
        let columns = response
            .column_info
            .iter()
            .map(describe_column)
            .collect::<Result<Vec<_>, _>>()?;
        self.column_types = Arc::new(
            response
                .column_info
                .iter()
                .map(|info| info.column_type.clone())
                .collect(),
        );
        debug!(
            "Query {} submitted. Result set has {} columns.",
            response.query_id,
            columns.len()
        );
        let query_id = response.query_id.clone();
        let page = self.parse_page(response)?;
        Ok(FirstPage {
            query_id,
            columns,
            page,
        })
    }

    /// Fetches the page following the one which carried `token`.
    pub fn fetch_next(&self, token: &str) -> Result<ResultPage, FetchError> {
        let response = self.transport.fetch_page(&self.request, token)?;
        self.parse_page(response)
    }

    /// Forwards a cancellation request for the server side query to the transport.
    pub fn cancel_query(&self, query_id: &str) -> Result<(), FetchError> {
        self.transport.cancel_query(query_id)?;
        Ok(())
    }

    fn parse_page(&self, response: QueryResponse) -> Result<ResultPage, FetchError> {
        let num_cols = self.column_types.len();
        let rows = response
            .rows
            .iter()
            .map(|row| {
                if row.data.len() != num_cols {
                    return Err(FetchError::ParseFailure(format!(
                        "Row with {} values in a result set with {} columns.",
                        row.data.len(),
                        num_cols
                    )));
                }
                row.data
                    .iter()
                    .zip(self.column_types.iter())
                    .map(|(datum, column_type)| parse_datum(datum, column_type))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResultPage::new(rows, response.next_token))
    }
}

fn describe_column(info: &ColumnInfo) -> Result<ColumnDescription, FetchError> {
    let column_type = &info.column_type;
    let data_type = if let Some(scalar_type) = &column_type.scalar_type {
        DataType::from_scalar_type_name(scalar_type).ok_or_else(|| {
            FetchError::ParseFailure(format!("Unsupported scalar type '{scalar_type}'."))
        })?
    } else if column_type.array_column_info.is_some() {
        DataType::Array
    } else if column_type.row_column_info.is_some() {
        DataType::Row
    } else if column_type.time_series_measure_value_column_info.is_some() {
        DataType::TimeSeries
    } else {
        return Err(untyped_column());
    };
    Ok(ColumnDescription::new(
        info.name.as_deref().unwrap_or_default(),
        data_type,
        Nullability::Nullable,
    ))
}

fn parse_datum(datum: &Datum, column_type: &ColumnType) -> Result<CellValue, FetchError> {
    if datum.is_null() {
        return Ok(CellValue::Null);
    }
    if let Some(scalar_type) = &column_type.scalar_type {
        let text = datum
            .scalar_value
            .as_deref()
            .ok_or_else(|| shape_mismatch(scalar_type))?;
        parse_scalar(text, scalar_type)
    } else if let Some(element) = &column_type.array_column_info {
        let elements = datum
            .array_value
            .as_ref()
            .ok_or_else(|| shape_mismatch("ARRAY"))?;
        let elements: Vec<CellValue> = elements
            .iter()
            .map(|element_datum| parse_datum(element_datum, &element.column_type))
            .collect::<Result<_, _>>()?;
        Ok(CellValue::Array(elements))
    } else if let Some(fields) = &column_type.row_column_info {
        let row = datum.row_value.as_ref().ok_or_else(|| shape_mismatch("ROW"))?;
        if row.data.len() != fields.len() {
            return Err(FetchError::ParseFailure(format!(
                "ROW value with {} fields, but the type declares {}.",
                row.data.len(),
                fields.len()
            )));
        }
        let fields: Vec<CellValue> = row
            .data
            .iter()
            .zip(fields)
            .map(|(field_datum, field)| parse_datum(field_datum, &field.column_type))
            .collect::<Result<_, _>>()?;
        Ok(CellValue::Row(fields))
    } else if let Some(measure) = &column_type.time_series_measure_value_column_info {
        let points = datum
            .time_series_value
            .as_ref()
            .ok_or_else(|| shape_mismatch("TIMESERIES"))?;
        let points: Vec<TimeSeriesPoint> = points
            .iter()
            .map(|point| {
                Ok(TimeSeriesPoint {
                    time: parse_timestamp(&point.time)?,
                    value: parse_datum(&point.value, &measure.column_type)?,
                })
            })
            .collect::<Result<_, FetchError>>()?;
        Ok(CellValue::TimeSeries(points))
    } else {
        Err(untyped_column())
    }
}

fn parse_scalar(text: &str, scalar_type: &str) -> Result<CellValue, FetchError> {
    let invalid = || {
        FetchError::ParseFailure(format!("'{text}' is not a valid {scalar_type} value."))
    };
    let cell = match scalar_type {
        "BOOLEAN" => match text {
            "true" => CellValue::Bool(true),
            "false" => CellValue::Bool(false),
            _ => return Err(invalid()),
        },
        "TINYINT" => CellValue::I8(text.parse().map_err(|_| invalid())?),
        "SMALLINT" => CellValue::I16(text.parse().map_err(|_| invalid())?),
        "INTEGER" => CellValue::I32(text.parse().map_err(|_| invalid())?),
        "BIGINT" => CellValue::I64(text.parse().map_err(|_| invalid())?),
        "DOUBLE" => CellValue::F64(match text {
            "NaN" => f64::NAN,
            "Infinity" => f64::INFINITY,
            "-Infinity" => f64::NEG_INFINITY,
            _ => text.parse().map_err(|_| invalid())?,
        }),
        "VARCHAR" => CellValue::Text(text.to_owned()),
        "DATE" => CellValue::Date(
            NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid())?,
        ),
        "TIME" => CellValue::Time(
            NaiveTime::parse_from_str(text, "%H:%M:%S%.f").map_err(|_| invalid())?,
        ),
        "TIMESTAMP" => CellValue::Timestamp(parse_timestamp(text)?),
        "INTERVAL_YEAR_TO_MONTH" => {
            CellValue::IntervalYearMonth(text.parse::<YearMonth>().map_err(|_| invalid())?)
        }
        "INTERVAL_DAY_TO_SECOND" => {
            CellValue::IntervalDaySecond(text.parse::<DaySecond>().map_err(|_| invalid())?)
        }
        "UNKNOWN" => CellValue::Null,
        other => {
            return Err(FetchError::ParseFailure(format!(
                "Unsupported scalar type '{other}'."
            )));
        }
    };
    Ok(cell)
}

fn parse_timestamp(text: &str) -> Result<NaiveDateTime, FetchError> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|_| FetchError::ParseFailure(format!("'{text}' is not a valid TIMESTAMP value.")))
}

fn shape_mismatch(expected: &str) -> FetchError {
    FetchError::ParseFailure(format!("Expected a {expected} value."))
}

fn untyped_column() -> FetchError {
    FetchError::ParseFailure("Column type information is missing.".to_owned())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::{
        CellValue, Configuration, DataType,
        transport::{
            ColumnInfo, ColumnType, Datum, QueryRequest, QueryResponse, QueryTransport, Row,
            TimeSeriesDataPoint, TransportError,
        },
    };

    use super::{FetchError, PageFetcher};

    /// Answers the submission with `first` and every page request with `next`.
    struct TwoPages {
        first: QueryResponse,
        next: Result<QueryResponse, TransportError>,
        requests: Mutex<Vec<QueryRequest>>,
    }

    impl QueryTransport for TwoPages {
        fn submit_query(&self, request: &QueryRequest) -> Result<QueryResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.first.clone())
        }

        fn fetch_page(
            &self,
            _request: &QueryRequest,
            _token: &str,
        ) -> Result<QueryResponse, TransportError> {
            self.next.clone()
        }
    }

    fn response(
        columns: Vec<ColumnInfo>,
        rows: Vec<Vec<Datum>>,
        token: Option<&str>,
    ) -> QueryResponse {
        QueryResponse {
            query_id: "q-1".to_owned(),
            next_token: token.map(str::to_owned),
            column_info: columns,
            rows: rows.into_iter().map(|data| Row { data }).collect(),
        }
    }

    fn fetcher(first: QueryResponse, next: Result<QueryResponse, TransportError>) -> PageFetcher {
        let transport = TwoPages {
            first,
            next,
            requests: Mutex::new(Vec::new()),
        };
        PageFetcher::new(Arc::new(transport), &Configuration::default())
    }

    #[test]
    fn scalars_are_parsed_by_column_type() {
        let columns = vec![
            ColumnInfo::scalar("flag", "BOOLEAN"),
            ColumnInfo::scalar("n", "BIGINT"),
            ColumnInfo::scalar("x", "DOUBLE"),
            ColumnInfo::scalar("ts", "TIMESTAMP"),
        ];
        let rows = vec![vec![
            Datum::scalar("true"),
            Datum::scalar("-42"),
            Datum::scalar("NaN"),
            Datum::scalar("2021-01-02 03:04:05.123456789"),
        ]];
        let mut fetcher = fetcher(response(columns, rows, None), Err(unused()));

        let first = fetcher.submit("SELECT 1").unwrap();

        assert_eq!("q-1", first.query_id);
        assert_eq!(DataType::BigInt, first.columns[1].data_type);
        let row = &first.page.rows[0];
        assert_eq!(CellValue::Bool(true), row[0]);
        assert_eq!(CellValue::I64(-42), row[1]);
        assert!(matches!(row[2], CellValue::F64(x) if x.is_nan()));
        assert_eq!("2021-01-02 03:04:05.123456789", row[3].to_string());
        assert!(first.page.is_last());
    }

    #[test]
    fn nested_values() {
        let array = ColumnInfo {
            name: Some("a".to_owned()),
            column_type: ColumnType {
                array_column_info: Some(Box::new(ColumnInfo::scalar("", "INTEGER"))),
                ..ColumnType::default()
            },
        };
        let series = ColumnInfo {
            name: Some("s".to_owned()),
            column_type: ColumnType {
                time_series_measure_value_column_info: Some(Box::new(ColumnInfo::scalar(
                    "", "DOUBLE",
                ))),
                ..ColumnType::default()
            },
        };
        let rows = vec![vec![
            Datum {
                array_value: Some(vec![Datum::scalar("1"), Datum::null()]),
                ..Datum::default()
            },
            Datum {
                time_series_value: Some(vec![TimeSeriesDataPoint {
                    time: "2021-01-01 00:00:00.000000000".to_owned(),
                    value: Datum::scalar("2.5"),
                }]),
                ..Datum::default()
            },
        ]];
        let mut fetcher = fetcher(response(vec![array, series], rows, None), Err(unused()));

        let first = fetcher.submit("SELECT a, s").unwrap();

        assert_eq!(DataType::Array, first.columns[0].data_type);
        assert_eq!(DataType::TimeSeries, first.columns[1].data_type);
        assert_eq!("[1,null]", first.page.rows[0][0].to_string());
        assert_eq!(
            "[{time: 2021-01-01 00:00:00.000000000, value: 2.5}]",
            first.page.rows[0][1].to_string()
        );
    }

    #[test]
    fn arity_mismatch_is_a_parse_failure() {
        let columns = vec![ColumnInfo::scalar("a", "VARCHAR"), ColumnInfo::scalar("b", "VARCHAR")];
        let rows = vec![vec![Datum::scalar("only one")]];
        let mut fetcher = fetcher(response(columns, rows, None), Err(unused()));

        let error = fetcher.submit("SELECT a, b").unwrap_err();

        assert!(matches!(error, FetchError::ParseFailure(_)));
    }

    #[test]
    fn scalar_text_not_matching_the_type() {
        let columns = vec![ColumnInfo::scalar("n", "INTEGER")];
        let rows = vec![vec![Datum::scalar("forty two")]];
        let mut fetcher = fetcher(response(columns, rows, None), Err(unused()));

        let error = fetcher.submit("SELECT n").unwrap_err();

        assert!(matches!(error, FetchError::ParseFailure(_)));
    }

    #[test]
    fn following_pages_use_column_types_of_the_submission() {
        let columns = vec![ColumnInfo::scalar("n", "INTEGER")];
        let first = response(columns, vec![vec![Datum::scalar("1")]], Some("t"));
        // The service does not repeat the column info on every page
        let second = response(Vec::new(), vec![vec![Datum::scalar("2")]], None);
        let mut fetcher = fetcher(first, Ok(second));

        fetcher.submit("SELECT n").unwrap();
        let page = fetcher.fetch_next("t").unwrap();

        assert_eq!(vec![vec![CellValue::I32(2)]], page.rows);
    }

    #[test]
    fn transport_errors_map_to_fetch_errors() {
        let columns = vec![ColumnInfo::scalar("n", "INTEGER")];
        let first = response(columns, Vec::new(), Some("t"));
        let mut fetcher = fetcher(first, Err(TransportError::Timeout("5s".to_owned())));

        fetcher.submit("SELECT n").unwrap();

        assert_eq!(
            FetchError::TransportFailure("Request timed out: 5s".to_owned()),
            fetcher.fetch_next("t").unwrap_err()
        );
    }

    fn unused() -> TransportError {
        TransportError::Connection("not expected to be called".to_owned())
    }
}

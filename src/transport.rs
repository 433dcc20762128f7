//! Boundary to the query service. The result set engine only ever talks to the service through
//! [`QueryTransport`]. Authentication, endpoints and retries are the concern of the
//! implementation.

use serde::Deserialize;
use thiserror::Error as ThisError;

/// Issues requests against the query service. Implementations must be usable from the background
/// thread fetching pages, hence `Send + Sync`.
pub trait QueryTransport: Send + Sync {
    /// Starts a query and returns its first page.
    fn submit_query(&self, request: &QueryRequest) -> Result<QueryResponse, TransportError>;

    /// Fetches the page identified by `token` of a query started with `request`.
    fn fetch_page(
        &self,
        request: &QueryRequest,
        token: &str,
    ) -> Result<QueryResponse, TransportError>;

    /// Asks the service to stop executing a query. Services which do not support cancellation
    /// can rely on the default, which does nothing.
    fn cancel_query(&self, _query_id: &str) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Parameters of a query request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub sql: String,
    /// Maximum number of rows in a page. `None` leaves the choice to the service.
    pub max_rows: Option<u32>,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>, max_rows: Option<u32>) -> Self {
        Self {
            sql: sql.into(),
            max_rows,
        }
    }
}

/// Failure reported by a [`QueryTransport`].
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum TransportError {
    /// The service could not be reached or the connection broke down.
    #[error("Communication link failure: {0}")]
    Connection(String),
    /// The service did not answer in time.
    #[error("Request timed out: {0}")]
    Timeout(String),
    /// The service answered, but rejected or failed the query.
    #[error("{0}")]
    Query(String),
    /// The service answered with something which is not a valid query response.
    #[error("Malformed query response: {0}")]
    Malformed(String),
}

/// Response to a query or page request. Mirrors the JSON body of a Timestream `Query` call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub query_id: String,
    #[serde(default)]
    pub next_token: Option<String>,
    #[serde(default)]
    pub column_info: Vec<ColumnInfo>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl QueryResponse {
    /// Parses the JSON body of a response.
    pub fn from_json(body: &str) -> Result<Self, TransportError> {
        serde_json::from_str(body).map_err(|error| TransportError::Malformed(error.to_string()))
    }
}

/// Name and type of a column, or of the elements of a nested value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub column_type: ColumnType,
}

impl ColumnInfo {
    /// Column of a scalar type, e.g. `VARCHAR` or `BIGINT`.
    pub fn scalar(name: &str, scalar_type: &str) -> Self {
        Self {
            name: Some(name.to_owned()),
            column_type: ColumnType {
                scalar_type: Some(scalar_type.to_owned()),
                ..ColumnType::default()
            },
        }
    }
}

/// Exactly one of the members is expected to be set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnType {
    #[serde(default)]
    pub scalar_type: Option<String>,
    #[serde(default)]
    pub array_column_info: Option<Box<ColumnInfo>>,
    #[serde(default)]
    pub row_column_info: Option<Vec<ColumnInfo>>,
    #[serde(default)]
    pub time_series_measure_value_column_info: Option<Box<ColumnInfo>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Row {
    pub data: Vec<Datum>,
}

/// A single value on the wire. Scalars are transmitted in their text representation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Datum {
    #[serde(default)]
    pub scalar_value: Option<String>,
    #[serde(default)]
    pub array_value: Option<Vec<Datum>>,
    #[serde(default)]
    pub row_value: Option<Row>,
    #[serde(default)]
    pub time_series_value: Option<Vec<TimeSeriesDataPoint>>,
    #[serde(default)]
    pub null_value: Option<bool>,
}

impl Datum {
    pub fn scalar(text: &str) -> Self {
        Self {
            scalar_value: Some(text.to_owned()),
            ..Datum::default()
        }
    }

    pub fn null() -> Self {
        Self {
            null_value: Some(true),
            ..Datum::default()
        }
    }

    pub fn is_null(&self) -> bool {
        self.null_value == Some(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimeSeriesDataPoint {
    pub time: String,
    pub value: Datum,
}

#[cfg(test)]
mod tests {
    use super::{ColumnInfo, Datum, QueryResponse, TransportError};

    #[test]
    fn parse_query_response() {
        let body = r#"{
            "QueryId": "q-1",
            "NextToken": "t-2",
            "ColumnInfo": [
                {"Name": "region", "Type": {"ScalarType": "VARCHAR"}},
                {"Name": "cpu", "Type": {"ArrayColumnInfo": {"Type": {"ScalarType": "DOUBLE"}}}}
            ],
            "Rows": [
                {"Data": [{"ScalarValue": "eu-west-1"}, {"ArrayValue": [{"ScalarValue": "1.5"}]}]},
                {"Data": [{"NullValue": true}, {"ArrayValue": []}]}
            ]
        }"#;

        let response = QueryResponse::from_json(body).unwrap();

        assert_eq!("q-1", response.query_id);
        assert_eq!(Some("t-2"), response.next_token.as_deref());
        assert_eq!(ColumnInfo::scalar("region", "VARCHAR"), response.column_info[0]);
        assert_eq!(Datum::scalar("eu-west-1"), response.rows[0].data[0]);
        assert!(response.rows[1].data[0].is_null());
    }

    #[test]
    fn last_page_has_no_token() {
        let response = QueryResponse::from_json(r#"{"QueryId": "q", "Rows": []}"#).unwrap();
        assert_eq!(None, response.next_token);
    }

    #[test]
    fn malformed_body() {
        let error = QueryResponse::from_json(r#"{"Rows": 42}"#).unwrap_err();
        assert!(matches!(error, TransportError::Malformed(_)));
    }
}

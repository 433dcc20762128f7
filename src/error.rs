use thiserror::Error as ThisError;

use crate::{
    ConversionError, FetchError,
    diagnostics::{Record, State},
};

#[derive(Debug, Clone, ThisError)]
/// Error type used to indicate a call into the result set engine failed. Every variant maps to
/// the SQLSTATE reported to the application, see [`Error::state`].
pub enum Error {
    /// The function has been called in a state of the statement which does not allow it. E.g.
    /// fetching before executing, or executing a statement with an open cursor.
    #[error("Function sequence error. '{function}' can not be called in the current state.")]
    FunctionSequence {
        /// Function which has been called out of order.
        function: &'static str,
    },
    /// Column number zero, or beyond the number of columns in the result set. Bookmark columns
    /// are not supported.
    #[error("Invalid descriptor index {ordinal}. The result set has {num_cols} columns.")]
    InvalidColumnNumber { ordinal: u16, num_cols: u16 },
    /// The cursor is forward only. Any fetch orientation but `SQL_FETCH_NEXT` is rejected.
    #[error("Fetch type out of range. The cursor only supports fetching the next rowset.")]
    FetchTypeOutOfRange,
    /// An attribute has been set to a value which is not supported.
    #[error("Invalid attribute value {value} for {attribute}.")]
    InvalidAttributeValue {
        attribute: &'static str,
        value: usize,
    },
    /// A value of the current row could not be converted into the type requested by the
    /// application.
    #[error("Converting the value of column {ordinal} failed: {source}")]
    Conversion {
        /// One based column number.
        ordinal: u16,
        source: ConversionError,
    },
    /// A `NULL` value has been fetched into a column bound without an indicator buffer.
    #[error(
        "Indicator variable required but not supplied. Column {ordinal} holds NULL, but has \
        been bound without an indicator."
    )]
    IndicatorRequired { ordinal: u16 },
    /// Retrieving the result set from the query service failed.
    #[error("{0}")]
    Fetch(#[from] FetchError),
    /// The statement has been cancelled. Further calls fail with this error until the cursor is
    /// closed.
    #[error("Operation canceled.")]
    Cancelled,
}

impl Error {
    /// SQLSTATE reported to the application for this error.
    pub fn state(&self) -> State {
        match self {
            Error::FunctionSequence { .. } => State::FUNCTION_SEQUENCE_ERROR,
            Error::InvalidColumnNumber { .. } => State::INVALID_DESCRIPTOR_INDEX,
            Error::FetchTypeOutOfRange => State::FETCH_TYPE_OUT_OF_RANGE,
            Error::InvalidAttributeValue { .. } => State::INVALID_ATTRIBUTE_VALUE,
            Error::Conversion { source, .. } => match source {
                ConversionError::RestrictedDataType { .. } => {
                    State::RESTRICTED_DATA_TYPE_ATTRIBUTE_VIOLATION
                }
                ConversionError::NumericOutOfRange { .. } => State::NUMERIC_VALUE_OUT_OF_RANGE,
                ConversionError::InvalidCharacterValue { .. } => {
                    State::INVALID_CHARACTER_VALUE_FOR_CAST
                }
                ConversionError::InvalidDatetimeFormat { .. } => State::INVALID_DATETIME_FORMAT,
                ConversionError::BufferTooSmall { .. } => State::INVALID_STRING_OR_BUFFER_LENGTH,
            },
            Error::IndicatorRequired { .. } => State::INDICATOR_VARIABLE_REQUIRED_BUT_NOT_SUPPLIED,
            Error::Fetch(fetch_error) => match fetch_error {
                FetchError::TransportFailure(_) => State::COMMUNICATION_LINK_FAILURE,
                FetchError::ServerError { .. } | FetchError::ParseFailure(_) => {
                    State::GENERAL_ERROR
                }
            },
            Error::Cancelled => State::OPERATION_CANCELED,
        }
    }

    /// Diagnostic record describing this error.
    pub fn to_record(&self) -> Record {
        Record::new(self.state(), self.to_string())
    }

    /// `true` if the error ends the result set, i.e. every later fetch reports it again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Error::Fetch(_) | Error::Cancelled)
    }
}

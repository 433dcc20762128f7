use std::fmt;

use log::{Level, warn};

/// A five character SQLSTATE. The first two characters indicate the class, the last three the
/// subclass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct State(pub [u8; 5]);

impl State {
    /// String or binary data returned for a column resulted in the truncation of nonblank
    /// character or non-NULL binary data.
    pub const STRING_DATA_RIGHT_TRUNCATION: State = State(*b"01004");
    /// Data value is not a valid column number, or the column number is larger than the number of
    /// columns in the result set.
    pub const INVALID_DESCRIPTOR_INDEX: State = State(*b"07009");
    pub const RESTRICTED_DATA_TYPE_ATTRIBUTE_VIOLATION: State = State(*b"07006");
    /// The communication link between the driver and the query service failed.
    pub const COMMUNICATION_LINK_FAILURE: State = State(*b"08S01");
    /// The indicator of a bound column has been a null pointer and NULL data was retrieved.
    pub const INDICATOR_VARIABLE_REQUIRED_BUT_NOT_SUPPLIED: State = State(*b"22002");
    pub const NUMERIC_VALUE_OUT_OF_RANGE: State = State(*b"22003");
    pub const INVALID_DATETIME_FORMAT: State = State(*b"22007");
    pub const INVALID_CHARACTER_VALUE_FOR_CAST: State = State(*b"22018");
    /// Catch all for errors without a more specific SQLSTATE, e.g. a failed query.
    pub const GENERAL_ERROR: State = State(*b"HY000");
    /// Processing of the statement has been cancelled.
    pub const OPERATION_CANCELED: State = State(*b"HY008");
    /// The function has been called out of order, e.g. fetching before executing a statement.
    pub const FUNCTION_SEQUENCE_ERROR: State = State(*b"HY010");
    /// Given the specified Attribute value, an invalid value was specified in ValuePtr.
    pub const INVALID_ATTRIBUTE_VALUE: State = State(*b"HY024");
    pub const INVALID_STRING_OR_BUFFER_LENGTH: State = State(*b"HY090");
    pub const FETCH_TYPE_OUT_OF_RANGE: State = State(*b"HY106");

    /// View status code as string slice for displaying.
    pub fn as_str(&self) -> &str {
        // SQLSTATEs are ASCII. Only the constants above are ever constructed by this crate.
        std::str::from_utf8(&self.0).unwrap_or("?????")
    }

    /// Warnings are of class `01`.
    pub fn is_warning(&self) -> bool {
        self.0.starts_with(b"01")
    }
}

/// Diagnostic record, as reported to the application via `SQLGetDiagRec`.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Record {
    pub state: State,
    /// Error code native to the data source. Always zero, the query service reports none.
    pub native_error: i32,
    pub message: String,
}

impl Record {
    pub fn new(state: State, message: impl Into<String>) -> Self {
        Self {
            state,
            native_error: 0,
            message: message.into(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "State: {}, Native error: {}, Message: {}",
            self.state.as_str(),
            self.native_error,
            self.message,
        )
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Report diagnostics from the last call to a function of a handle.
pub trait Diagnostics {
    /// Diagnostic record number `rec_number` of the last call. Records are numbered from 1.
    /// `None` if there is no such record.
    fn diagnostic_record(&self, rec_number: i16) -> Option<&Record>;
}

/// Diagnostic records of the last call to a function. Cleared at the start of every call.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticArea {
    records: Vec<Record>,
}

impl DiagnosticArea {
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Diagnostics for DiagnosticArea {
    fn diagnostic_record(&self, rec_number: i16) -> Option<&Record> {
        let index = usize::try_from(rec_number).ok()?.checked_sub(1)?;
        self.records.get(index)
    }
}

/// Logs the text of every diagnostic record of a handle as a warning.
pub fn log_diagnostics(handle: &(impl Diagnostics + ?Sized)) {
    if log::max_level() < Level::Warn {
        // Early return to safe work iterating the records in case we would not log anything.
        return;
    }

    let mut rec_number = 1;
    while let Some(record) = handle.diagnostic_record(rec_number) {
        warn!("{record}");
        // A fetch of many rows may produce one record per row and column
        if rec_number == i16::MAX {
            warn!("Too many diagnostic records were generated. Not all could be logged.");
            break;
        }
        rec_number += 1;
    }
}

use std::{ffi::c_void, sync::Arc};

use log::{debug, info, warn};

use crate::{
    CellValue, ColumnDescription, Configuration, Error,
    buffers::{Indicator, TargetType},
    conversion::{self, Converted},
    cursor::{BoundColumn, CursorState, RowStatus},
    diagnostics::{DiagnosticArea, Diagnostics, Record, State, log_diagnostics},
    fetcher::PageFetcher,
    page::ResultPage,
    scheduler::{CancelHandle, PaginationScheduler},
    sql_result::SqlResult,
    sys::Len,
    transport::QueryTransport,
};

/// State of the statement owning the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// No result set is open. Either nothing has been executed yet, or the cursor has been
    /// closed.
    Unexecuted,
    /// A result set is open, which is known to hold no rows.
    ExecutedNoRows,
    /// A result set is open, which may hold rows.
    ExecutedHasRows,
}

/// Direction passed to `SQLFetchScroll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrientation {
    Next,
    Prior,
    First,
    Last,
    Absolute,
    Relative,
    Bookmark,
}

impl FetchOrientation {
    /// Maps a `SQL_FETCH_*` code. `None` for unknown codes.
    pub fn from_code(code: i16) -> Option<Self> {
        let orientation = match code {
            1 => FetchOrientation::Next,
            2 => FetchOrientation::First,
            3 => FetchOrientation::Last,
            4 => FetchOrientation::Prior,
            5 => FetchOrientation::Absolute,
            6 => FetchOrientation::Relative,
            8 => FetchOrientation::Bookmark,
            _ => return None,
        };
        Some(orientation)
    }
}

/// The result set of a statement as seen through the ODBC API. Enforces the statement state
/// machine, and moves values from the pages fetched in the background into application buffers.
///
/// Every call resets the diagnostics. Records describing warnings and errors of the last call are
/// available through [`Self::diagnostics`].
pub struct ResultSetController {
    fetcher: PageFetcher,
    scheduler: PaginationScheduler,
    cursor: CursorState,
    columns: Vec<ColumnDescription>,
    state: StatementState,
    /// Server side id of the open query. `None` for materialized result sets, or once the query
    /// no longer needs to be cancelled on the server.
    query_id: Option<String>,
    diagnostics: DiagnosticArea,
    /// Fetch failure or cancellation. Ends the result set until it is closed.
    terminal: Option<Error>,
    /// All rows have been fetched.
    end_of_data: bool,
}

impl ResultSetController {
    pub fn new(transport: Arc<dyn QueryTransport>, config: Configuration) -> Self {
        Self {
            fetcher: PageFetcher::new(transport, &config),
            scheduler: PaginationScheduler::new(config.effective_prefetch_depth()),
            cursor: CursorState::new(),
            columns: Vec::new(),
            state: StatementState::Unexecuted,
            query_id: None,
            diagnostics: DiagnosticArea::default(),
            terminal: None,
            end_of_data: false,
        }
    }

    pub fn state(&self) -> StatementState {
        self.state
    }

    /// Submits `sql` and opens its result set. The first page is fetched synchronously, following
    /// pages in the background.
    pub fn execute(&mut self, sql: &str) -> Result<SqlResult<()>, Error> {
        self.diagnostics.clear();
        self.require_unexecuted("SQLExecDirect")?;
        self.scheduler.prime();
        let first = match self.fetcher.submit(sql) {
            Ok(first) => first,
            Err(fetch_error) => {
                self.scheduler.close();
                return Err(self.fail(Error::Fetch(fetch_error)));
            }
        };
        info!(
            "Query {} executed. {} columns.",
            first.query_id,
            first.columns.len()
        );
        let query_id = first.query_id;
        self.open(first.columns, &first.page);
        self.scheduler
            .open(first.page, self.fetcher.clone(), &query_id);
        self.query_id = Some(query_id);
        Ok(SqlResult::Success(()))
    }

    /// Opens a result set whose rows are already known, e.g. the result of a catalog function.
    /// Behaves like a result set returned by the query service which fits into a single page.
    pub fn execute_materialized(
        &mut self,
        columns: Vec<ColumnDescription>,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<SqlResult<()>, Error> {
        self.diagnostics.clear();
        self.require_unexecuted("SQLExecDirect")?;
        debug!("Opening materialized result set with {} rows.", rows.len());
        let page = ResultPage::new(rows, None);
        self.open(columns, &page);
        self.scheduler.open_materialized(page);
        Ok(SqlResult::Success(()))
    }

    fn open(&mut self, columns: Vec<ColumnDescription>, first: &ResultPage) {
        self.columns = columns;
        self.cursor.reset();
        self.terminal = None;
        self.end_of_data = false;
        self.state = if first.rows.is_empty() && first.is_last() {
            StatementState::ExecutedNoRows
        } else {
            StatementState::ExecutedHasRows
        };
    }

    /// Fetches the next rowset (`SQLFetch`) and writes its values into the bound columns.
    ///
    /// # Return
    ///
    /// Number of rows fetched. `SqlResult::SuccessWithInfo` if a value had been truncated, a
    /// value could not be converted, or fetching failed after some rows of the rowset have been
    /// fetched already. `SqlResult::NoData` after the last row.
    pub fn fetch(&mut self) -> Result<SqlResult<usize>, Error> {
        self.diagnostics.clear();
        if self.state == StatementState::Unexecuted {
            return Err(self.fail(Error::FunctionSequence {
                function: "SQLFetch",
            }));
        }
        if let Some(terminal) = self.terminal.clone() {
            self.cursor.end_of_data();
            return Err(self.fail(terminal));
        }

        let row_array_size = self.cursor.row_array_size();
        let mut rows = Vec::with_capacity(row_array_size);
        let mut failure = None;
        while rows.len() < row_array_size {
            if let Some(row) = self.cursor.next_row() {
                rows.push(row);
                continue;
            }
            match self.scheduler.take_next() {
                Ok(Some(page)) => self.cursor.push_page(page),
                Ok(None) => {
                    self.end_of_data = true;
                    break;
                }
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }

        if let Some(error) = failure {
            if error.is_terminal() {
                self.terminal = Some(error.clone());
            }
            if rows.is_empty() {
                self.cursor.end_of_data();
                return Err(self.fail(error));
            }
            // Rows fetched before the failure are still handed out.
            self.diagnostics.push(error.to_record());
        }

        if rows.is_empty() {
            debug!(
                "Query {}: End of result set reached.",
                self.query_id.as_deref().unwrap_or("<materialized>")
            );
            self.cursor.end_of_data();
            return Ok(SqlResult::NoData);
        }

        self.cursor.begin_rowset(rows);
        let num_rows = self.cursor.rows_fetched();
        let mut first_row_error = None;
        for row_index in 0..num_rows {
            let status = match self.write_bound_row(row_index) {
                Ok(false) => RowStatus::Success,
                Ok(true) => RowStatus::SuccessWithInfo,
                Err(error) => {
                    self.diagnostics.push(error.to_record());
                    if row_index == 0 {
                        first_row_error = Some(error);
                    }
                    RowStatus::Error
                }
            };
            self.cursor.set_row_status(row_index, status);
        }

        // Without a row array, a conversion error fails the whole call.
        if self.cursor.row_array_size() == 1 {
            if let Some(error) = first_row_error {
                return Err(error);
            }
        }
        let warnings = !self.diagnostics.is_empty();
        if warnings {
            log_diagnostics(&self.diagnostics);
        }
        Ok(SqlResult::with_warnings(num_rows, warnings))
    }

    /// Writes every bound column of row `row_index` of the current rowset. `Ok(true)` if a value
    /// has been truncated.
    fn write_bound_row(&mut self, row_index: usize) -> Result<bool, Error> {
        let mut truncated = false;
        let mut first_error = None;
        for (ordinal, column) in self.cursor.bindings() {
            let Some(cell) = self.cursor.rowset()[row_index].get(usize::from(ordinal) - 1) else {
                // Bound beyond the number of columns of this result set.
                continue;
            };
            let target_type = self.resolve_target_type(ordinal, column.target_type);
            let converted = if column.target_value.is_null() {
                // Only the indicator is bound. Convert into a scratch buffer to learn its value.
                let mut scratch = vec![0u8; target_type.fixed_size().unwrap_or(0)];
                conversion::convert(cell, target_type, &mut scratch).map(|converted| Converted {
                    truncated: false,
                    ..converted
                })
            } else {
                // Safety: `bind_col` obliges the application to keep the buffers valid for the
                // row array size while they are bound.
                let buffer = unsafe { column.target_buffer(target_type, row_index) };
                conversion::convert(cell, target_type, buffer)
            };
            let outcome = converted
                .map_err(|source| Error::Conversion { ordinal, source })
                .and_then(|converted| {
                    // Safety: `bind_col` obliges the application to keep the indicator array
                    // valid while the column is bound.
                    let written = unsafe {
                        column.write_indicator(row_index, converted.indicator.to_isize())
                    };
                    if !written && converted.indicator.is_null() {
                        Err(Error::IndicatorRequired { ordinal })
                    } else {
                        Ok(converted)
                    }
                });
            match outcome {
                Ok(Converted {
                    truncated: true, ..
                }) => {
                    truncated = true;
                    self.diagnostics.push(truncation_record(ordinal));
                }
                Ok(_) => (),
                // Keep writing the other columns of the row, report the first failure.
                Err(error) => {
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(truncated),
        }
    }

    /// `SQLFetchScroll`. The cursor is forward only, so only [`FetchOrientation::Next`] is
    /// supported. `offset` is ignored for it.
    pub fn fetch_scroll(
        &mut self,
        orientation: FetchOrientation,
        _offset: isize,
    ) -> Result<SqlResult<usize>, Error> {
        match orientation {
            FetchOrientation::Next => self.fetch(),
            other => {
                self.diagnostics.clear();
                debug!("Rejecting fetch orientation {other:?}.");
                Err(self.fail(Error::FetchTypeOutOfRange))
            }
        }
    }

    /// Retrieves the value of column `ordinal` of the current row (`SQLGetData`).
    ///
    /// Character and binary values can be retrieved in pieces. Each call continues where the last
    /// one stopped and reports the length of the remaining value. Once the value has been
    /// returned completely, further calls return [`SqlResult::NoData`]. Fixed size values are
    /// returned completely on every call.
    pub fn get_data(
        &mut self,
        ordinal: u16,
        target_type: TargetType,
        buffer: &mut [u8],
    ) -> Result<SqlResult<Indicator>, Error> {
        self.diagnostics.clear();
        if let Some(Error::Cancelled) = self.terminal {
            return Err(self.fail(Error::Cancelled));
        }
        if self.state == StatementState::Unexecuted || !self.cursor.is_positioned() {
            return Err(self.fail(Error::FunctionSequence {
                function: "SQLGetData",
            }));
        }
        self.check_ordinal(ordinal)?;
        let target_type = self.resolve_target_type(ordinal, target_type);
        let Some(offset) = self.cursor.get_data_offset(ordinal, target_type) else {
            return Ok(SqlResult::NoData);
        };
        let Some(cell) = self
            .cursor
            .current_row()
            .and_then(|row| row.get(usize::from(ordinal) - 1))
        else {
            return Err(self.fail(Error::InvalidColumnNumber {
                ordinal,
                num_cols: self.num_cols_u16(),
            }));
        };

        let converted = if cell.is_null() {
            Ok(Converted {
                indicator: Indicator::Null,
                written: 0,
                truncated: false,
            })
        } else if target_type.is_variable_length() {
            conversion::encode_variable(cell, target_type).map(|payload| {
                let remaining = &payload[offset.min(payload.len())..];
                conversion::copy_variable(remaining, target_type, buffer)
            })
        } else {
            conversion::convert(cell, target_type, buffer)
        };
        let converted = match converted {
            Ok(converted) => converted,
            Err(source) => return Err(self.fail(Error::Conversion { ordinal, source })),
        };

        if tracks_progress(target_type, converted.indicator) {
            self.cursor.advance_get_data(
                ordinal,
                target_type,
                offset + converted.written,
                !converted.truncated,
            );
        }
        if converted.truncated {
            self.diagnostics.push(truncation_record(ordinal));
            log_diagnostics(&self.diagnostics);
            Ok(SqlResult::SuccessWithInfo(converted.indicator))
        } else {
            Ok(SqlResult::Success(converted.indicator))
        }
    }

    /// Binds an application buffer to column `ordinal` (`SQLBindCol`). Binding a null
    /// `target_value` together with a null `indicator` unbinds the column. Takes effect with the
    /// next fetch.
    ///
    /// # Safety
    ///
    /// As long as the column is bound, `target_value` and `indicator` must either be null or
    /// valid for writes of as many elements as the row array size. Elements of `target_value` are
    /// `buffer_length` bytes long for character and binary types, and as large as the C type for
    /// fixed size types.
    pub unsafe fn bind_col(
        &mut self,
        ordinal: u16,
        target_type: TargetType,
        target_value: *mut c_void,
        buffer_length: Len,
        indicator: *mut Len,
    ) -> Result<SqlResult<()>, Error> {
        self.diagnostics.clear();
        let beyond_result_set =
            self.state != StatementState::Unexecuted && usize::from(ordinal) > self.columns.len();
        if ordinal == 0 || beyond_result_set {
            return Err(self.fail(Error::InvalidColumnNumber {
                ordinal,
                num_cols: self.num_cols_u16(),
            }));
        }
        if target_value.is_null() && indicator.is_null() {
            self.cursor.unbind(ordinal);
        } else {
            self.cursor.bind(
                ordinal,
                BoundColumn {
                    target_type,
                    target_value,
                    buffer_length,
                    indicator,
                },
            );
        }
        Ok(SqlResult::Success(()))
    }

    pub fn unbind_col(&mut self, ordinal: u16) {
        self.cursor.unbind(ordinal);
    }

    /// `SQLFreeStmt` with `SQL_UNBIND`.
    pub fn unbind_all(&mut self) {
        self.cursor.unbind_all();
    }

    /// Number of rows fetched with each call to [`Self::fetch`] (`SQL_ATTR_ROW_ARRAY_SIZE`).
    pub fn set_row_array_size(&mut self, size: usize) -> Result<SqlResult<()>, Error> {
        self.diagnostics.clear();
        if size == 0 {
            return Err(self.fail(Error::InvalidAttributeValue {
                attribute: "SQL_ATTR_ROW_ARRAY_SIZE",
                value: size,
            }));
        }
        self.cursor.set_row_array_size(size);
        Ok(SqlResult::Success(()))
    }

    /// Stops fetching pages (`SQLCancel`). The result set stays open, but every later fetch
    /// reports the cancellation until it is closed.
    pub fn cancel(&mut self) -> Result<SqlResult<()>, Error> {
        self.diagnostics.clear();
        if self.state == StatementState::Unexecuted {
            return Ok(SqlResult::Success(()));
        }
        info!("Cancelling query {}.", self.query_id.as_deref().unwrap_or("<materialized>"));
        self.scheduler.cancel();
        self.cancel_server_query();
        self.cursor.end_of_data();
        self.terminal = Some(Error::Cancelled);
        Ok(SqlResult::Success(()))
    }

    /// Closes the cursor (`SQLCloseCursor`, `SQLFreeStmt` with `SQL_CLOSE`). Stops fetching,
    /// discards all rows and returns to [`StatementState::Unexecuted`]. Bindings are kept. Closing
    /// a statement without open result set does nothing.
    pub fn close(&mut self) -> Result<SqlResult<()>, Error> {
        self.diagnostics.clear();
        if self.state == StatementState::Unexecuted {
            return Ok(SqlResult::Success(()));
        }
        debug!("Closing result set of query {:?}.", self.query_id);
        self.scheduler.close();
        self.cancel_server_query();
        self.cursor.reset();
        self.columns.clear();
        self.terminal = None;
        self.end_of_data = false;
        self.state = StatementState::Unexecuted;
        Ok(SqlResult::Success(()))
    }

    /// Asks the service to stop a query whose result set has not been consumed completely. The
    /// outcome only affects resources on the server, so failures are logged, not reported.
    fn cancel_server_query(&mut self) {
        let Some(query_id) = self.query_id.take() else {
            return;
        };
        if self.end_of_data {
            return;
        }
        if let Err(fetch_error) = self.fetcher.cancel_query(&query_id) {
            warn!("Failed to cancel query {query_id} on the server: {fetch_error}");
        }
    }

    /// One based number of the current row. `0` before the first fetch. Not advanced by fetches
    /// returning `NoData`.
    pub fn row_number(&self) -> u64 {
        self.cursor.row_number()
    }

    /// Status of each row of the current rowset. As long as the row array size.
    pub fn row_status_array(&self) -> &[RowStatus] {
        self.cursor.row_status_array()
    }

    /// Number of rows fetched by the last call to fetch (`SQL_ATTR_ROWS_FETCHED_PTR`).
    pub fn rows_fetched(&self) -> usize {
        self.cursor.rows_fetched()
    }

    /// Number of columns of the open result set. `0` if there is none.
    pub fn num_result_cols(&self) -> usize {
        self.columns.len()
    }

    /// Description of column `ordinal`.
    pub fn column_description(&mut self, ordinal: u16) -> Result<&ColumnDescription, Error> {
        self.diagnostics.clear();
        self.check_ordinal(ordinal)?;
        Ok(&self.columns[usize::from(ordinal) - 1])
    }

    /// Records describing warnings and errors of the last call.
    pub fn diagnostics(&self) -> &DiagnosticArea {
        &self.diagnostics
    }

    /// Id of the query on the server, if the result set stems from the query service.
    pub fn query_id(&self) -> Option<&str> {
        self.query_id.as_deref()
    }

    /// Handle to cancel fetching from another thread (`SQLCancel` from a second thread). Wakes a
    /// fetch blocked waiting for the next page.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.scheduler.cancel_handle()
    }

    fn require_unexecuted(&mut self, function: &'static str) -> Result<(), Error> {
        if self.state == StatementState::Unexecuted {
            Ok(())
        } else {
            Err(self.fail(Error::FunctionSequence { function }))
        }
    }

    fn check_ordinal(&mut self, ordinal: u16) -> Result<(), Error> {
        if ordinal == 0 || usize::from(ordinal) > self.columns.len() {
            Err(self.fail(Error::InvalidColumnNumber {
                ordinal,
                num_cols: self.num_cols_u16(),
            }))
        } else {
            Ok(())
        }
    }

    fn num_cols_u16(&self) -> u16 {
        u16::try_from(self.columns.len()).unwrap_or(u16::MAX)
    }

    /// `SQL_C_DEFAULT` is resolved using the type of the column.
    fn resolve_target_type(&self, ordinal: u16, target_type: TargetType) -> TargetType {
        match (target_type, self.columns.get(usize::from(ordinal) - 1)) {
            (TargetType::Default, Some(column)) => column.data_type.default_target_type(),
            (other, _) => other,
        }
    }

    /// Records `error` as diagnostic of the current call and hands it back for returning.
    fn fail(&mut self, error: Error) -> Error {
        debug!("Result set call failed: {error}");
        self.diagnostics.push(error.to_record());
        error
    }
}

impl Diagnostics for ResultSetController {
    fn diagnostic_record(&self, rec_number: i16) -> Option<&Record> {
        self.diagnostics.diagnostic_record(rec_number)
    }
}

impl Drop for ResultSetController {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!("Closing result set on drop failed: {error}");
        }
    }
}

/// Only character and binary values are retrieved in pieces. `NULL` is reported once.
fn tracks_progress(target_type: TargetType, indicator: Indicator) -> bool {
    target_type.is_variable_length() || indicator.is_null()
}

fn truncation_record(ordinal: u16) -> Record {
    Record::new(
        State::STRING_DATA_RIGHT_TRUNCATION,
        format!("String data, right truncated. Value of column {ordinal} did not fit the buffer."),
    )
}

use std::{
    collections::{BTreeMap, VecDeque},
    ffi::c_void,
    ptr, slice,
};

use crate::{
    CellValue,
    buffers::TargetType,
    page::ResultPage,
    sys::{Len, row_status},
};

/// Status of a row in the current rowset, as written to the row status array
/// (`SQL_ATTR_ROW_STATUS_PTR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    /// The row has been fetched and every bound value has been written.
    Success,
    /// The row has been fetched, but a value has been truncated.
    SuccessWithInfo,
    /// Converting a value of the row failed.
    Error,
    /// There is no row at this position of the rowset.
    NoRow,
}

impl RowStatus {
    pub fn as_sql(self) -> u16 {
        match self {
            RowStatus::Success => row_status::SUCCESS,
            RowStatus::SuccessWithInfo => row_status::SUCCESS_WITH_INFO,
            RowStatus::Error => row_status::ERROR,
            RowStatus::NoRow => row_status::NOROW,
        }
    }
}

/// An application buffer bound to a column with `SQLBindCol`. With a row array size larger than
/// one, `target_value` and `indicator` point to column wise arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundColumn {
    pub target_type: TargetType,
    /// May be null, in which case only the indicator is written.
    pub target_value: *mut c_void,
    /// Length of one element of `target_value` in bytes. Ignored for fixed size types.
    pub buffer_length: Len,
    /// May be null.
    pub indicator: *mut Len,
}

impl BoundColumn {
    /// Size of one array element for the given (resolved) target type.
    fn element_length(&self, target_type: TargetType) -> usize {
        target_type
            .fixed_size()
            .unwrap_or_else(|| self.buffer_length.max(0) as usize)
    }

    /// Buffer of the element for row `row_index` of the rowset.
    ///
    /// # Safety
    ///
    /// `target_value` must be null, or valid for writes of `row_array_size` elements, each as
    /// large as [`Self::element_length`] and `row_index` must be smaller than `row_array_size`.
    pub unsafe fn target_buffer<'a>(
        &self,
        target_type: TargetType,
        row_index: usize,
    ) -> &'a mut [u8] {
        if self.target_value.is_null() {
            return &mut [];
        }
        let length = self.element_length(target_type);
        unsafe {
            let start = (self.target_value as *mut u8).add(row_index * length);
            slice::from_raw_parts_mut(start, length)
        }
    }

    /// Writes the indicator of row `row_index`. Returns `false` if no indicator is bound.
    ///
    /// # Safety
    ///
    /// `indicator` must be null, or valid for writes of `row_array_size` elements and `row_index`
    /// must be smaller than `row_array_size`.
    pub unsafe fn write_indicator(&self, row_index: usize, value: Len) -> bool {
        if self.indicator.is_null() {
            return false;
        }
        unsafe { ptr::write_unaligned(self.indicator.add(row_index), value) };
        true
    }
}

/// How far a column of the current row has been read with `SQLGetData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GetDataProgress {
    /// Number of bytes of the encoded value already returned.
    Partial { target_type: TargetType, offset: usize },
    /// The value has been returned completely.
    Done,
}

/// Position of the cursor within the result set, the rows of the current rowset and the columns
/// bound to application buffers.
#[derive(Debug)]
pub struct CursorState {
    /// Rows of pages already taken from the scheduler, not yet part of a rowset.
    pending: VecDeque<Vec<CellValue>>,
    /// Rows of the current rowset. `SQLGetData` addresses the first of them.
    rowset: Vec<Vec<CellValue>>,
    /// One based number of the first row of the current rowset. `0` before the first fetch.
    row_number: u64,
    /// Number of the row following the current rowset.
    next_row_number: u64,
    row_status: Vec<RowStatus>,
    row_array_size: usize,
    bindings: BTreeMap<u16, BoundColumn>,
    get_data: BTreeMap<u16, GetDataProgress>,
}

impl Default for CursorState {
    fn default() -> Self {
        Self::new()
    }
}

impl CursorState {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            rowset: Vec::new(),
            row_number: 0,
            next_row_number: 1,
            row_status: vec![RowStatus::NoRow],
            row_array_size: 1,
            bindings: BTreeMap::new(),
            get_data: BTreeMap::new(),
        }
    }

    /// Forgets rows and position. Bindings and the row array size stay in place, like they do for
    /// `SQLFreeStmt` with `SQL_CLOSE`.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.rowset.clear();
        self.row_number = 0;
        self.next_row_number = 1;
        self.row_status = vec![RowStatus::NoRow; self.row_array_size];
        self.get_data.clear();
    }

    pub fn row_array_size(&self) -> usize {
        self.row_array_size
    }

    /// Takes effect with the next fetch. `size` must not be zero.
    pub fn set_row_array_size(&mut self, size: usize) {
        self.row_array_size = size;
        self.row_status = vec![RowStatus::NoRow; size];
    }

    pub fn bind(&mut self, ordinal: u16, column: BoundColumn) {
        self.bindings.insert(ordinal, column);
    }

    pub fn unbind(&mut self, ordinal: u16) {
        self.bindings.remove(&ordinal);
    }

    pub fn unbind_all(&mut self) {
        self.bindings.clear();
    }

    pub fn binding(&self, ordinal: u16) -> Option<&BoundColumn> {
        self.bindings.get(&ordinal)
    }

    /// Bound columns ordered by column number.
    pub fn bindings(&self) -> impl Iterator<Item = (u16, &BoundColumn)> {
        self.bindings.iter().map(|(&ordinal, column)| (ordinal, column))
    }

    /// Queues the rows of a page behind the rows not yet fetched.
    pub fn push_page(&mut self, page: ResultPage) {
        self.pending.extend(page.rows);
    }

    /// Next row not yet part of a rowset.
    pub fn next_row(&mut self) -> Option<Vec<CellValue>> {
        self.pending.pop_front()
    }

    /// Makes `rows` the current rowset and advances the row number. `rows` must not be empty.
    pub fn begin_rowset(&mut self, rows: Vec<Vec<CellValue>>) {
        self.row_number = self.next_row_number;
        self.next_row_number += rows.len() as u64;
        self.rowset = rows;
        self.row_status = vec![RowStatus::NoRow; self.row_array_size.max(self.rowset.len())];
        self.get_data.clear();
    }

    /// Moves the cursor after the last row. The row number stays at the last row fetched.
    pub fn end_of_data(&mut self) {
        self.rowset.clear();
        self.row_status.iter_mut().for_each(|status| *status = RowStatus::NoRow);
        self.get_data.clear();
    }

    /// `true` if the cursor is positioned on a row, i.e. the last fetch returned data.
    pub fn is_positioned(&self) -> bool {
        !self.rowset.is_empty()
    }

    /// Rows of the current rowset.
    pub fn rowset(&self) -> &[Vec<CellValue>] {
        &self.rowset
    }

    /// Row `SQLGetData` reads from.
    pub fn current_row(&self) -> Option<&[CellValue]> {
        self.rowset.first().map(Vec::as_slice)
    }

    pub fn row_number(&self) -> u64 {
        self.row_number
    }

    pub fn rows_fetched(&self) -> usize {
        self.rowset.len()
    }

    pub fn set_row_status(&mut self, row_index: usize, status: RowStatus) {
        self.row_status[row_index] = status;
    }

    pub fn row_status_array(&self) -> &[RowStatus] {
        &self.row_status
    }

    /// Byte offset to continue reading column `ordinal` of the current row from. `None` if the
    /// value has already been returned completely. Switching the target type starts over.
    pub fn get_data_offset(&self, ordinal: u16, target_type: TargetType) -> Option<usize> {
        match self.get_data.get(&ordinal) {
            None => Some(0),
            Some(GetDataProgress::Done) => None,
            Some(GetDataProgress::Partial {
                target_type: previous,
                offset,
            }) => Some(if *previous == target_type { *offset } else { 0 }),
        }
    }

    /// Remembers how far column `ordinal` has been read.
    pub fn advance_get_data(
        &mut self,
        ordinal: u16,
        target_type: TargetType,
        offset: usize,
        complete: bool,
    ) {
        let progress = if complete {
            GetDataProgress::Done
        } else {
            GetDataProgress::Partial {
                target_type,
                offset,
            }
        };
        self.get_data.insert(ordinal, progress);
    }
}

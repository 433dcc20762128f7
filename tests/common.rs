#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use timestream_odbc::{
    Configuration, ResultSetController, SqlResult,
    buffers::{Indicator, TargetType},
    transport::{
        ColumnInfo, Datum, QueryRequest, QueryResponse, QueryTransport, Row, TransportError,
    },
};

pub const QUERY_ID: &str = "query-1";

/// Installs `env_logger` once. Tests run in parallel, so later calls are allowed to fail.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Transport answering with a scripted sequence of pages. Page `n` (one based) carries the token
/// `page-{n+1}` unless it is the last one.
pub struct MockTransport {
    columns: Vec<ColumnInfo>,
    pages: Vec<Vec<Row>>,
    delays: HashMap<usize, Duration>,
    jitter: Option<(Mutex<StdRng>, u64)>,
    fail_at: Option<usize>,
    pub page_requests: AtomicUsize,
    pub cancelled_queries: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new(columns: Vec<ColumnInfo>, pages: Vec<Vec<Row>>) -> Self {
        Self {
            columns,
            pages,
            delays: HashMap::new(),
            jitter: None,
            fail_at: None,
            page_requests: AtomicUsize::new(0),
            cancelled_queries: Mutex::new(Vec::new()),
        }
    }

    /// A single `BIGINT` column `n` holding `1..=num_rows`, split into pages of `rows_per_page`.
    pub fn numbered_rows(num_rows: usize, rows_per_page: usize) -> Self {
        let rows: Vec<Row> = (1..=num_rows)
            .map(|n| Row {
                data: vec![Datum::scalar(&n.to_string())],
            })
            .collect();
        let pages = rows
            .chunks(rows_per_page)
            .map(<[Row]>::to_vec)
            .collect();
        Self::new(vec![ColumnInfo::scalar("n", "BIGINT")], pages)
    }

    /// A single page with one row for each of `values`, all in one column.
    pub fn single_column(name: &str, column_type: &str, values: Vec<Datum>) -> Self {
        let rows = values.into_iter().map(|datum| Row { data: vec![datum] }).collect();
        Self::new(vec![ColumnInfo::scalar(name, column_type)], vec![rows])
    }

    pub fn delay_page(mut self, page: usize, delay: Duration) -> Self {
        self.delays.insert(page, delay);
        self
    }

    /// Every page request sleeps a random duration up to `max_millis`. Seeded, so a failing run
    /// can be reproduced.
    pub fn random_latency(mut self, seed: u64, max_millis: u64) -> Self {
        self.jitter = Some((Mutex::new(StdRng::seed_from_u64(seed)), max_millis));
        self
    }

    /// Requesting page `page` fails with a query error reported by the service.
    pub fn fail_at(mut self, page: usize) -> Self {
        self.fail_at = Some(page);
        self
    }

    pub fn num_pages(&self) -> usize {
        self.pages.len().max(1)
    }

    fn page(&self, number: usize) -> Result<QueryResponse, TransportError> {
        if self.fail_at == Some(number) {
            return Err(TransportError::Query(format!(
                "Query aborted while producing page {number}."
            )));
        }
        Ok(QueryResponse {
            query_id: QUERY_ID.to_owned(),
            next_token: (number < self.num_pages()).then(|| format!("page-{}", number + 1)),
            column_info: self.columns.clone(),
            rows: self.pages.get(number - 1).cloned().unwrap_or_default(),
        })
    }

    fn sleep_for(&self, number: usize) {
        if let Some(delay) = self.delays.get(&number) {
            thread::sleep(*delay);
        }
        if let Some((rng, max_millis)) = &self.jitter {
            let millis = rng.lock().unwrap().gen_range(0..=*max_millis);
            thread::sleep(Duration::from_millis(millis));
        }
    }
}

impl QueryTransport for MockTransport {
    fn submit_query(&self, _request: &QueryRequest) -> Result<QueryResponse, TransportError> {
        self.sleep_for(1);
        self.page(1)
    }

    fn fetch_page(
        &self,
        _request: &QueryRequest,
        token: &str,
    ) -> Result<QueryResponse, TransportError> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        let number: usize = token
            .strip_prefix("page-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| TransportError::Malformed(format!("Unknown token {token}")))?;
        self.sleep_for(number);
        self.page(number)
    }

    fn cancel_query(&self, query_id: &str) -> Result<(), TransportError> {
        self.cancelled_queries
            .lock()
            .unwrap()
            .push(query_id.to_owned());
        Ok(())
    }
}

/// Controller executing `SELECT` against `transport`.
pub fn execute(transport: Arc<MockTransport>, prefetch_depth: usize) -> ResultSetController {
    let config = Configuration::default().with_prefetch_depth(prefetch_depth);
    let mut controller = ResultSetController::new(transport, config);
    controller.execute("SELECT * FROM measurements").unwrap();
    controller
}

/// Fetches every row and returns the value of the first column as `i64`.
pub fn drain_numbers(controller: &mut ResultSetController) -> Vec<i64> {
    let mut numbers = Vec::new();
    while !controller.fetch().unwrap().is_no_data() {
        numbers.push(get_i64(controller, 1));
    }
    numbers
}

pub fn get_i64(controller: &mut ResultSetController, ordinal: u16) -> i64 {
    let mut buffer = [0u8; 8];
    let indicator = controller
        .get_data(ordinal, TargetType::SBigInt, &mut buffer)
        .unwrap()
        .unwrap();
    assert_eq!(Indicator::Length(8), indicator);
    i64::from_ne_bytes(buffer)
}

/// Value of column `ordinal` of the current row as UTF-8 text. Retrieved in one piece.
pub fn get_text(controller: &mut ResultSetController, ordinal: u16) -> Option<String> {
    let mut buffer = vec![0u8; 4096];
    match controller
        .get_data(ordinal, TargetType::Char, &mut buffer)
        .unwrap()
    {
        SqlResult::Success(Indicator::Length(len)) => {
            Some(String::from_utf8(buffer[..len].to_vec()).unwrap())
        }
        SqlResult::Success(Indicator::Null) => None,
        other => panic!("Unexpected result retrieving text: {other:?}"),
    }
}

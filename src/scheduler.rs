use std::{
    collections::BTreeMap,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
};

use log::{debug, error, warn};

use crate::{Error, FetchError, fetcher::PageFetcher, page::ResultPage};

/// Where the scheduler is in the lifecycle of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No result set is open.
    Idle,
    /// The query has been submitted, the first page is not there yet.
    Priming,
    /// The result set is open. Pages are fetched in the background and handed out in order.
    Streaming,
    /// Cancellation has been issued. The outcome of a fetch still in flight is discarded.
    Draining,
}

/// Position of the first page of a result set. Positions of following pages count up from here.
const FIRST_POSITION: u64 = 1;

struct Inner {
    phase: Phase,
    /// Pages (or the failure to fetch them) keyed by their position in the result set, waiting to
    /// be taken by the consumer.
    ready: BTreeMap<u64, Result<ResultPage, FetchError>>,
    /// Position of the next page [`PaginationScheduler::take_next`] hands out.
    next_to_deliver: u64,
    /// Continuation token of the fetch currently waiting on the transport.
    in_flight: Option<String>,
    /// No further pages will be added to `ready`.
    exhausted: bool,
    cancelled: bool,
    /// Once set, every call to `take_next` reports this error.
    terminal: Option<Error>,
}

impl Inner {
    /// Pages waiting in `ready` besides the first one. The first page is fetched synchronously,
    /// so it does not count against the prefetch depth.
    fn num_fetched_ahead(&self) -> usize {
        self.ready.range(FIRST_POSITION + 1..).count()
    }

    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            ready: BTreeMap::new(),
            next_to_deliver: FIRST_POSITION,
            in_flight: None,
            exhausted: true,
            cancelled: false,
            terminal: None,
        }
    }
}

struct Shared {
    inner: Mutex<Inner>,
    /// Signaled whenever a page is added to `ready`, fetching ends, or on cancellation.
    page_ready: Condvar,
    /// Signaled whenever the consumer takes a page, or on cancellation.
    slot_free: Condvar,
    /// Upper bound for pages fetched ahead of the first page, which are waiting in `ready` or in
    /// flight.
    prefetch_depth: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic of the fetch thread is reported by joining it. The state itself is consistent
        // after every statement, so there is no reason to propagate the poison.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel(&self) {
        {
            let mut inner = self.lock();
            inner.cancelled = true;
            if inner.phase != Phase::Idle {
                inner.phase = Phase::Draining;
            }
        }
        self.page_ready.notify_all();
        self.slot_free.notify_all();
    }
}

/// Requests cancellation of the result set from any thread. Wakes a consumer blocked in
/// [`PaginationScheduler::take_next`], which then returns [`Error::Cancelled`].
#[derive(Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        debug!("Cancellation requested by handle.");
        self.shared.cancel();
    }
}

/// Fetches the pages of a result set on a dedicated system thread, while the application
/// processes the rows of the pages fetched earlier.
///
/// Continuation tokens chain, so there is at most one fetch in flight per result set. Pages are
/// handed out strictly in result set order. The number of pages buffered ahead of the consumer is
/// bounded by the prefetch depth.
pub struct PaginationScheduler {
    shared: Arc<Shared>,
    /// `None` if there is no thread fetching, or it has already been joined.
    fetch_thread: Option<JoinHandle<()>>,
}

impl PaginationScheduler {
    /// A scheduler in [`Phase::Idle`]. `prefetch_depth` values smaller than one are raised to
    /// one.
    pub fn new(prefetch_depth: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::new()),
                page_ready: Condvar::new(),
                slot_free: Condvar::new(),
                prefetch_depth: prefetch_depth.max(1),
            }),
            fetch_thread: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.shared.lock().phase
    }

    /// Marks the query as submitted. Expected to be followed by [`Self::open`] once the first
    /// page arrived, or by [`Self::close`] if submitting failed.
    pub fn prime(&mut self) {
        self.close();
        self.shared.lock().phase = Phase::Priming;
    }

    /// Opens the result set with its first page and starts fetching the following pages in the
    /// background, if there are any.
    pub fn open(&mut self, first: ResultPage, fetcher: PageFetcher, query_id: &str) {
        let token = first.next_token.clone();
        self.start(first);
        if let Some(token) = token {
            self.spawn_fetch_thread(fetcher, token, query_id.to_owned());
        }
    }

    /// Opens a result set consisting of a single page, which is already complete. No thread is
    /// spawned.
    pub fn open_materialized(&mut self, rows: ResultPage) {
        self.start(ResultPage {
            next_token: None,
            ..rows
        });
    }

    fn start(&mut self, first: ResultPage) {
        let mut inner = self.shared.lock();
        let is_last = first.is_last();
        // A cancellation requested while the query has been submitted still applies
        let cancelled = inner.cancelled;
        *inner = Inner::new();
        inner.cancelled = cancelled;
        inner.ready.insert(FIRST_POSITION, Ok(first));
        inner.exhausted = is_last;
        inner.phase = if cancelled {
            Phase::Draining
        } else {
            Phase::Streaming
        };
    }

    fn spawn_fetch_thread(&mut self, fetcher: PageFetcher, token: String, query_id: String) {
        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name("page-fetch".to_owned())
            .spawn(move || fetch_pages(&shared, &fetcher, token, &query_id));
        match spawned {
            Ok(handle) => self.fetch_thread = Some(handle),
            Err(io_error) => {
                error!("Failed to spawn thread fetching pages: {io_error}");
                let mut inner = self.shared.lock();
                inner.ready.insert(
                    FIRST_POSITION + 1,
                    Err(FetchError::TransportFailure(format!(
                        "Failed to spawn thread fetching pages: {io_error}"
                    ))),
                );
                inner.exhausted = true;
            }
        }
    }

    /// Next page of the result set in order. Blocks until it is available.
    ///
    /// # Return
    ///
    /// * `Ok(Some(page))`: The next page.
    /// * `Ok(None)`: All pages have been handed out. Any further call returns `Ok(None)` too.
    /// * `Err(_)`: Fetching the next page failed, or the result set has been cancelled. Any
    ///   further call returns the same error.
    pub fn take_next(&mut self) -> Result<Option<ResultPage>, Error> {
        let shared = &*self.shared;
        let mut inner = shared.lock();
        loop {
            if let Some(terminal) = &inner.terminal {
                return Err(terminal.clone());
            }
            if inner.cancelled {
                inner.terminal = Some(Error::Cancelled);
                return Err(Error::Cancelled);
            }
            let position = inner.next_to_deliver;
            if let Some(result) = inner.ready.remove(&position) {
                inner.next_to_deliver += 1;
                shared.slot_free.notify_all();
                return match result {
                    Ok(page) => Ok(Some(page)),
                    Err(fetch_error) => {
                        let error = Error::Fetch(fetch_error);
                        inner.terminal = Some(error.clone());
                        Err(error)
                    }
                };
            }
            if inner.exhausted {
                inner.phase = Phase::Idle;
                return Ok(None);
            }
            inner = shared
                .page_ready
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Stops fetching pages and joins the fetch thread. Buffered pages are discarded. Any later
    /// call to [`Self::take_next`] returns [`Error::Cancelled`] until the scheduler is closed.
    pub fn cancel(&mut self) {
        self.shared.cancel();
        self.join_fetch_thread();
        let mut inner = self.shared.lock();
        inner.ready.clear();
        inner.in_flight = None;
        inner.exhausted = true;
        inner.phase = Phase::Idle;
    }

    /// Cancels fetching and returns to a pristine [`Phase::Idle`] state, ready for the next result
    /// set.
    pub fn close(&mut self) {
        self.cancel();
        *self.shared.lock() = Inner::new();
    }

    /// A handle to cancel this result set from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.lock().cancelled
    }

    /// Number of pages fetched, but not yet handed out.
    pub fn num_buffered_pages(&self) -> usize {
        self.shared.lock().ready.len()
    }

    /// Continuation token of the page currently being fetched.
    pub fn in_flight_token(&self) -> Option<String> {
        self.shared.lock().in_flight.clone()
    }

    fn join_fetch_thread(&mut self) {
        if let Some(handle) = self.fetch_thread.take() {
            if handle.join().is_err() {
                warn!("Thread fetching pages panicked.");
            }
        }
    }
}

impl Drop for PaginationScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Body of the fetch thread. Chains continuation tokens until the last page, a failure or
/// cancellation.
fn fetch_pages(shared: &Shared, fetcher: &PageFetcher, first_token: String, query_id: &str) {
    let mut token = first_token;
    let mut position = FIRST_POSITION + 1;
    loop {
        {
            let mut inner = shared.lock();
            while !inner.cancelled && inner.num_fetched_ahead() >= shared.prefetch_depth {
                inner = shared
                    .slot_free
                    .wait(inner)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if inner.cancelled {
                debug!("Query {query_id}: Stop fetching pages due to cancellation.");
                return;
            }
            inner.in_flight = Some(token.clone());
        }

        // No lock is held while waiting for the transport.
        let result = fetcher.fetch_next(&token);

        let mut inner = shared.lock();
        inner.in_flight = None;
        if inner.cancelled {
            debug!("Query {query_id}: Discarding page {position} due to cancellation.");
            return;
        }
        let next_token = match &result {
            Ok(page) => {
                debug!(
                    "Query {query_id}: Page {position} arrived with {} rows.",
                    page.num_rows()
                );
                page.next_token.clone()
            }
            Err(fetch_error) => {
                error!("Query {query_id}: Fetching page {position} failed: {fetch_error}");
                None
            }
        };
        inner.ready.insert(position, result);
        position += 1;
        if next_token.is_none() {
            inner.exhausted = true;
        }
        drop(inner);
        shared.page_ready.notify_all();
        match next_token {
            Some(next) => token = next,
            None => return,
        }
    }
}

use log::warn;

/// Settings of the result set engine. Filled in by the connection layer (e.g. from the DSN) and
/// read only from then on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Maximum number of rows the service should put into a single page. Values smaller than one
    /// leave the page size to the service. `-1` is the canonical way to express that.
    pub max_row_per_page: i32,
    /// Number of pages which may be fetched ahead of the application. At least one.
    pub prefetch_depth: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            max_row_per_page: -1,
            prefetch_depth: 1,
        }
    }
}

impl Configuration {
    pub fn with_max_row_per_page(mut self, max_row_per_page: i32) -> Self {
        self.max_row_per_page = max_row_per_page;
        self
    }

    /// `0` is raised to `1`.
    pub fn with_prefetch_depth(mut self, prefetch_depth: usize) -> Self {
        self.prefetch_depth = prefetch_depth.max(1);
        self
    }

    /// Page size to send along with a query request.
    pub fn max_rows(&self) -> Option<u32> {
        match self.max_row_per_page {
            -1 => None,
            n if n > 0 => Some(n as u32),
            other => {
                warn!(
                    "Ignoring invalid maximum number of rows per page: {other}. Leaving the page \
                    size to the service."
                );
                None
            }
        }
    }

    pub fn effective_prefetch_depth(&self) -> usize {
        self.prefetch_depth.max(1)
    }
}

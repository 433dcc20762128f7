use crate::CellValue;

/// One batch of rows as delivered by the query service, together with the continuation token
/// needed to request the next batch.
///
/// Pages are owned values. They are moved from the fetch thread to the consumer, never shared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultPage {
    /// Rows of this page. Every row holds exactly one cell per column of the result set. May be
    /// empty, even if more pages follow.
    pub rows: Vec<Vec<CellValue>>,
    /// Token to fetch the next page. `None` if this is the last page of the result set.
    pub next_token: Option<String>,
}

impl ResultPage {
    pub fn new(rows: Vec<Vec<CellValue>>, next_token: Option<String>) -> Self {
        Self { rows, next_token }
    }

    /// `true` if no further pages follow this one.
    pub fn is_last(&self) -> bool {
        self.next_token.is_none()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::ResultPage;

    #[test]
    fn empty_page_with_token_is_not_last() {
        let page = ResultPage::new(Vec::new(), Some("token".to_owned()));
        assert!(!page.is_last());
        assert_eq!(0, page.num_rows());
    }
}

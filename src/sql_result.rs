use crate::{Error, sys::SqlReturn};

/// Outcome of a successful call into the result set engine. Variants hold the same meaning as
/// the constants associated with [`SqlReturn`]. Errors are reported through the `Err` variant of
/// a surrounding `Result`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SqlResult<T> {
    /// The function has been executed successfully.
    Success(T),
    /// The function has been executed successfully. There have been warnings.
    SuccessWithInfo(T),
    /// No more data is available
    NoData,
}

impl<T> SqlResult<T> {
    /// `Success` if `warnings` is `false`, `SuccessWithInfo` otherwise.
    pub fn with_warnings(value: T, warnings: bool) -> Self {
        if warnings {
            SqlResult::SuccessWithInfo(value)
        } else {
            SqlResult::Success(value)
        }
    }

    /// Applies `f` to any value wrapped in `Success` or `SuccessWithInfo`.
    pub fn map<U, F>(self, f: F) -> SqlResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            SqlResult::Success(v) => SqlResult::Success(f(v)),
            SqlResult::SuccessWithInfo(v) => SqlResult::SuccessWithInfo(f(v)),
            SqlResult::NoData => SqlResult::NoData,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, SqlResult::NoData)
    }

    /// The wrapped value. `None` for [`SqlResult::NoData`].
    pub fn value(self) -> Option<T> {
        match self {
            SqlResult::Success(v) | SqlResult::SuccessWithInfo(v) => Some(v),
            SqlResult::NoData => None,
        }
    }

    pub fn unwrap(self) -> T {
        match self {
            SqlResult::Success(v) | SqlResult::SuccessWithInfo(v) => v,
            SqlResult::NoData => panic!("Unwraping SqlResult::NoData"),
        }
    }
}

/// Return code for the ODBC entry point which produced `result`.
pub fn return_code<T>(result: &Result<SqlResult<T>, Error>) -> SqlReturn {
    match result {
        Ok(SqlResult::Success(_)) => SqlReturn::SUCCESS,
        Ok(SqlResult::SuccessWithInfo(_)) => SqlReturn::SUCCESS_WITH_INFO,
        Ok(SqlResult::NoData) => SqlReturn::NO_DATA,
        Err(_) => SqlReturn::ERROR,
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, sys::SqlReturn};

    use super::{SqlResult, return_code};

    #[test]
    fn return_codes() {
        assert_eq!(SqlReturn::SUCCESS, return_code(&Ok(SqlResult::Success(1))));
        assert_eq!(
            SqlReturn::SUCCESS_WITH_INFO,
            return_code(&Ok(SqlResult::with_warnings(1, true)))
        );
        assert_eq!(SqlReturn::NO_DATA, return_code::<u32>(&Ok(SqlResult::NoData)));
        assert_eq!(SqlReturn::ERROR, return_code::<u32>(&Err(Error::Cancelled)));
    }

    #[test]
    fn map_keeps_the_variant() {
        assert_eq!(SqlResult::SuccessWithInfo(2), SqlResult::SuccessWithInfo(1).map(|n| n + 1));
        assert_eq!(SqlResult::<u32>::NoData, SqlResult::NoData.map(|n: u32| n + 1));
    }
}

use crate::sys::{Len, NO_TOTAL, NULL_DATA};

/// Indicates existence and length of a value.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Indicator {
    /// Field does not exist
    Null,
    /// Fields exists. Value indicates number of bytes required to store the value. In case of
    /// truncated data, this is the true length of the data, before truncation occurred.
    Length(usize),
}

impl Indicator {
    /// Creates an indicator value as required by the ODBC C API. Lengths which can not be
    /// represented are reported as `SQL_NO_TOTAL`.
    pub fn to_isize(self) -> Len {
        match self {
            Indicator::Null => NULL_DATA,
            Indicator::Length(len) => len.try_into().unwrap_or(NO_TOTAL),
        }
    }

    /// Only `true` if the indicator is the equivalent to [`crate::sys::NULL_DATA`], indicating a
    /// non-existing value.
    pub fn is_null(self) -> bool {
        matches!(self, Indicator::Null)
    }

    /// If the indicator is [`Indicator::Length`] this is [`Some`].
    pub fn length(self) -> Option<usize> {
        if let Indicator::Length(len) = self {
            Some(len)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::sys::{NO_TOTAL, NULL_DATA};

    use super::Indicator;

    #[test]
    fn indicator_values_of_the_c_api() {
        assert_eq!(NULL_DATA, Indicator::Null.to_isize());
        assert_eq!(42, Indicator::Length(42).to_isize());
        assert_eq!(NO_TOTAL, Indicator::Length(usize::MAX).to_isize());
    }

    #[test]
    fn length_of_null_is_none() {
        assert_eq!(None, Indicator::Null.length());
        assert_eq!(Some(3), Indicator::Length(3).length());
    }
}

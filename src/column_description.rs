use crate::DataType;

/// Indication of whether a column is nullable or not.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum Nullability {
    /// Indicates that we do not know whether the column is Nullable or not.
    #[default]
    Unknown,
    /// The column may hold NULL values.
    Nullable,
    /// The column can not hold NULL values.
    NoNulls,
}

impl Nullability {
    /// Value reported for `SQL_DESC_NULLABLE` (`SQL_NO_NULLS`, `SQL_NULLABLE` or
    /// `SQL_NULLABLE_UNKNOWN`).
    pub fn as_sql_nullable(self) -> i16 {
        match self {
            Nullability::NoNulls => 0,
            Nullability::Nullable => 1,
            Nullability::Unknown => 2,
        }
    }
}

/// Describes the type and attributes of a column. Immutable once the result set is opened.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct ColumnDescription {
    /// Column name. May be empty if unavailable.
    pub name: String,
    /// Type of the column
    pub data_type: DataType,
    /// Indicates whether the column is nullable or not.
    pub nullability: Nullability,
}

impl ColumnDescription {
    /// In production, an 'empty' [`ColumnDescription`] is expected to be constructed via the
    /// [`Default`] trait. It is then filled from the metadata of the first page. For tests and
    /// catalog result sets it is convenient to construct it directly.
    pub fn new(name: &str, data_type: DataType, nullability: Nullability) -> Self {
        Self {
            name: name.to_owned(),
            data_type,
            nullability,
        }
    }

    /// `true` if the column is `Nullable` or it is not know whether the column is nullable.
    /// `false` if and only if the column is `NoNulls`.
    pub fn could_be_nullable(&self) -> bool {
        match self.nullability {
            Nullability::Nullable | Nullability::Unknown => true,
            Nullability::NoNulls => false,
        }
    }
}

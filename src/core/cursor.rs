//! Result cursor abstraction
//!
//! The materializer reads rows through [`ResultCursor`] so it does not care
//! which driver produced them. Dropping a cursor must release whatever
//! statement or result handle backs it.

use super::error::{OrmError, Result};
use super::value::DatabaseValue;

/// Forward-only view over a query result
pub trait ResultCursor {
    /// Result column names in result order
    fn column_names(&self) -> &[String];

    /// Move to the next row, returning `false` once the result is exhausted
    fn advance(&mut self) -> Result<bool>;

    /// Raw value of the 0-based `index` column of the current row
    fn value(&self, index: usize) -> Result<DatabaseValue>;
}

/// Cursor over rows that are already in memory
#[derive(Debug, Clone, Default)]
pub struct VecCursor {
    columns: Vec<String>,
    rows: std::vec::IntoIter<Vec<DatabaseValue>>,
    current: Option<Vec<DatabaseValue>>,
}

impl VecCursor {
    /// Create a cursor over `rows`, each aligned with `columns`
    pub fn new<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<DatabaseValue>>,
    ) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: rows.into_iter(),
            current: None,
        }
    }
}

impl ResultCursor for VecCursor {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn advance(&mut self) -> Result<bool> {
        self.current = self.rows.next();
        Ok(self.current.is_some())
    }

    fn value(&self, index: usize) -> Result<DatabaseValue> {
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| OrmError::other("Cursor is not positioned on a row"))?;
        row.get(index)
            .cloned()
            .ok_or_else(|| OrmError::ColumnNotFound(format!("index {}", index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_cursor_walks_rows() {
        let mut cursor = VecCursor::new(
            ["id", "name"],
            vec![
                vec![DatabaseValue::Long(1), "a".into()],
                vec![DatabaseValue::Long(2), "b".into()],
            ],
        );
        assert_eq!(cursor.column_names(), ["id", "name"]);
        assert!(cursor.value(0).is_err());

        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.value(1).unwrap(), DatabaseValue::Text("a".into()));
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.value(0).unwrap(), DatabaseValue::Long(2));
        assert!(matches!(cursor.value(5), Err(OrmError::ColumnNotFound(_))));
        assert!(!cursor.advance().unwrap());
    }
}

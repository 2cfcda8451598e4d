//! Decoded tabular content of one object.

use serde::{Deserialize, Serialize};

/// One record; every value is kept as the text the source encoded.
pub type Row = Vec<String>;

/// Ordered rows with optional column names.
///
/// Column names are attached only when the source was configured with them.
/// Their count is not checked against row width; a mismatch is a caller
/// configuration problem and surfaces as `None` from [`column`](Self::column)
/// lookups rather than a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCollection {
    columns: Option<Vec<String>>,
    rows: Vec<Row>,
}

impl RowCollection {
    /// Build from decoded records. A single-record body still yields a
    /// one-row, two-dimensional collection.
    #[must_use]
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            columns: None,
            rows,
        }
    }

    /// Attach column names. An empty list leaves the collection unnamed.
    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        self.columns = (!columns.is_empty()).then_some(columns);
        self
    }

    #[must_use]
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Width of the widest row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.as_ref()?.iter().position(|c| c == name)
    }

    /// Values of a named column; rows too short for the column yield `""`.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.get(idx).map_or("", String::as_str))
                .collect(),
        )
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl<'a> IntoIterator for &'a RowCollection {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// A transform result the destination can write.
///
/// Requiring the rows up front gives every result a measurable length.
pub trait TabularOutput {
    fn rows(&self) -> &[Row];

    fn row_count(&self) -> usize {
        self.rows().len()
    }
}

impl TabularOutput for RowCollection {
    fn rows(&self) -> &[Row] {
        &self.rows
    }
}

impl TabularOutput for Vec<Row> {
    fn rows(&self) -> &[Row] {
        self
    }
}

/// Build a [`Row`] from anything displayable: `row!["1", 2, "foo"]`.
#[macro_export]
macro_rules! row {
    ($($v:expr),* $(,)?) => {
        vec![$($v.to_string()),*]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RowCollection {
        RowCollection::from_rows(vec![row![1, "foo"], row![2, "bar"]]).with_columns(["id", "text"])
    }

    #[test]
    fn test_named_column_lookup() {
        let rc = sample();
        assert_eq!(rc.len(), 2);
        assert_eq!(rc.width(), 2);
        assert_eq!(rc.column("text"), Some(vec!["foo", "bar"]));
        assert_eq!(rc.column("missing"), None);
    }

    #[test]
    fn test_single_row_stays_two_dimensional() {
        let rc = RowCollection::from_rows(vec![row![1, "only"]]).with_columns(["id", "text"]);
        assert_eq!(rc.len(), 1);
        assert_eq!(rc.column("id"), Some(vec!["1"]));
    }

    #[test]
    fn test_empty_column_list_means_unnamed() {
        let rc = RowCollection::from_rows(vec![row!["x"]]).with_columns(Vec::<String>::new());
        assert!(rc.columns().is_none());
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let rc = RowCollection::from_rows(vec![row![1, "a"], row![2]]).with_columns(["id", "text"]);
        assert_eq!(rc.column("text"), Some(vec!["a", ""]));
    }

    #[test]
    fn test_tabular_output_counts() {
        let v: Vec<Row> = vec![row!["a"], row!["b"], row!["c"]];
        assert_eq!(v.row_count(), 3);
        assert_eq!(sample().row_count(), 2);
    }
}

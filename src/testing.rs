//! Fixtures for exercising batches against the in-memory fakes.
//!
//! ```
//! use prefixflow::io::cloud::FakeObjectIO;
//! use prefixflow::testing::{numbered_keys, read_rows, sample_rows, upload_rows};
//!
//! let storage = FakeObjectIO::new();
//! for key in numbered_keys("dev/foo_input/foo_input.tsv", 0..3) {
//!     upload_rows(&storage, "bucket", &key, &sample_rows(2)).unwrap();
//! }
//! let rows = read_rows(&storage, "bucket", "dev/foo_input/foo_input.tsv.0001_part_00.gz").unwrap();
//! assert_eq!(rows.len(), 2);
//! ```

use crate::error::{EtlError, Result};
use crate::io::cloud::ObjectIO;
use crate::io::tsv::TsvFormat;
use crate::rows::{Row, RowCollection};
use crate::runner::Transform;
use std::ops::Range;

/// Write `rows` as a gzip TSV object, the shape an unload produces.
///
/// # Errors
/// Encoding or storage failures.
pub fn upload_rows<O: ObjectIO + ?Sized>(
    storage: &O,
    bucket: &str,
    key: &str,
    rows: &[Row],
) -> Result<()> {
    let body = TsvFormat::gzip().encode(key, rows)?;
    storage
        .put_object(bucket, key, &body)
        .map_err(EtlError::Storage)
}

/// Read an object back into rows, detecting compression.
///
/// # Errors
/// Storage or decode failures.
pub fn read_rows<O: ObjectIO + ?Sized>(storage: &O, bucket: &str, key: &str) -> Result<Vec<Row>> {
    let body = storage.get_object(bucket, key).map_err(EtlError::Storage)?;
    TsvFormat::default().decode(key, &body)
}

/// Unload-style part keys: `{prefix}.0000_part_00.gz`, `{prefix}.0001_part_00.gz`, ...
#[must_use]
pub fn numbered_keys(prefix: &str, range: Range<usize>) -> Vec<String> {
    range.map(|i| format!("{prefix}.{i:04}_part_00.gz")).collect()
}

/// `n` two-column rows: `[i, "row-i"]`.
#[must_use]
pub fn sample_rows(n: usize) -> Vec<Row> {
    (0..n).map(|i| vec![i.to_string(), format!("row-{i}")]).collect()
}

/// Echoes its input and remembers what it saw.
#[derive(Debug, Default)]
pub struct RecordingTransform {
    seen: Vec<usize>,
    fail_on: Option<usize>,
}

impl RecordingTransform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `call`-th invocation (1-based) instead of echoing.
    #[must_use]
    pub fn failing_on(call: usize) -> Self {
        Self {
            seen: Vec::new(),
            fail_on: Some(call),
        }
    }

    /// Number of successful calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.seen.len()
    }

    /// Input row counts, in call order.
    #[must_use]
    pub fn row_counts(&self) -> &[usize] {
        &self.seen
    }
}

impl Transform for RecordingTransform {
    type Output = Vec<Row>;

    fn transform(&mut self, rows: &RowCollection) -> anyhow::Result<Vec<Row>> {
        if self.fail_on == Some(self.seen.len() + 1) {
            anyhow::bail!("injected failure on call {}", self.seen.len() + 1);
        }
        self.seen.push(rows.len());
        Ok(rows.iter().cloned().collect())
    }
}

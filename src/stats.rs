//! Per-file timing statistics and the end-of-run summary.
//!
//! Stats live only for one run. The per-row figure is the mean over files of
//! each file's `elapsed / rows`, so every file weighs the same regardless of
//! its size; it is not total time divided by total rows.

use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Timing for one transformed file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileStat {
    pub key: String,
    pub elapsed: Duration,
    pub row_count: usize,
}

impl FileStat {
    pub fn new(key: impl Into<String>, elapsed: Duration, row_count: usize) -> Self {
        Self {
            key: key.into(),
            elapsed,
            row_count,
        }
    }

    /// Seconds per row; zero for a file without rows.
    #[must_use]
    pub fn secs_per_row(&self) -> f64 {
        if self.row_count == 0 {
            0.0
        } else {
            self.elapsed.as_secs_f64() / self.row_count as f64
        }
    }
}

/// Stats in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    files: Vec<FileStat>,
}

impl RunStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stat: FileStat) {
        self.files.push(stat);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn files(&self) -> &[FileStat] {
        &self.files
    }

    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.files.iter().map(|f| f.row_count).sum()
    }

    /// Aggregate figures, or `None` when no file was processed.
    #[must_use]
    pub fn summary(&self) -> Option<RunSummary> {
        if self.files.is_empty() {
            return None;
        }
        let n = self.files.len() as f64;
        let total_secs: f64 = self.files.iter().map(|f| f.elapsed.as_secs_f64()).sum();
        let per_row: f64 = self.files.iter().map(FileStat::secs_per_row).sum();

        Some(RunSummary {
            total_rows: self.total_rows(),
            files: self.files.len(),
            mean_secs_per_file: total_secs / n,
            mean_secs_per_row: per_row / n,
        })
    }
}

impl Extend<FileStat> for RunStats {
    fn extend<I: IntoIterator<Item = FileStat>>(&mut self, iter: I) {
        self.files.extend(iter);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_rows: usize,
    pub files: usize,
    pub mean_secs_per_file: f64,
    pub mean_secs_per_row: f64,
}

impl RunSummary {
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "total_rows": self.total_rows,
            "files": self.files,
            "transform_secs_per_file": self.mean_secs_per_file,
            "transform_secs_per_row": self.mean_secs_per_row,
        })
    }

    /// Emit the summary as `info` events, one line each.
    pub fn log(&self) {
        info!(
            total_rows = self.total_rows,
            files = self.files,
            "{} rows processed ({} files)",
            self.total_rows,
            self.files
        );
        info!("transform / file: {:.3}s", self.mean_secs_per_file);
        info!("transform / row: {:.3}s", self.mean_secs_per_row);
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} rows processed ({} files)", self.total_rows, self.files)?;
        writeln!(f, "transform / file: {:.3}s", self.mean_secs_per_file)?;
        write!(f, "transform / row: {:.3}s", self.mean_secs_per_row)
    }
}

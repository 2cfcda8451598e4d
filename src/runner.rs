//! The batch orchestrator.
//!
//! A [`Batch`] ties a [`Source`], a [`Transform`] and an optional
//! [`Destination`] together and drives one pass over the selected objects:
//!
//! ```text
//! Idle ──run──▶ Running ──▶ Completed
//!                      └──▶ Failed
//! ```
//!
//! Each object is fully read, transformed and written before the next one is
//! fetched, so at most one decoded file is resident at a time. Every failure
//! aborts the run; nothing is retried.

use crate::dest::{Destination, ObjectDest, SkipProbe};
use crate::error::{EtlError, Result};
use crate::io::cloud::ObjectIO;
use crate::rows::{RowCollection, TabularOutput};
use crate::source::Source;
use crate::stats::{FileStat, RunStats, RunSummary};
use crate::template::TemplateArgs;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Lifecycle of a [`Batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Caller-supplied per-file transformation.
///
/// Closures of the shape `FnMut(&RowCollection) -> anyhow::Result<O>` are
/// transforms. The input row count is recorded before the call, so a
/// transform may return more or fewer rows than it was given.
pub trait Transform {
    type Output: TabularOutput;

    /// # Errors
    /// Any error aborts the run as [`EtlError::Transform`].
    fn transform(&mut self, rows: &RowCollection) -> anyhow::Result<Self::Output>;
}

impl<F, O> Transform for F
where
    F: FnMut(&RowCollection) -> anyhow::Result<O>,
    O: TabularOutput,
{
    type Output = O;

    fn transform(&mut self, rows: &RowCollection) -> anyhow::Result<O> {
        self(rows)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Resolved source prefix.
    pub prefix: String,
    /// Objects under the prefix before filtering.
    pub listed: usize,
    pub stats: RunStats,
    /// Destination keys written, in processing order.
    pub written: Vec<String>,
    pub dry: bool,
}

impl RunReport {
    #[must_use]
    pub fn summary(&self) -> Option<RunSummary> {
        self.stats.summary()
    }
}

/// One configured ETL job.
pub struct Batch<S, T> {
    source: S,
    transform: T,
    dest: Option<Box<dyn Destination>>,
    args: TemplateArgs,
    state: RunState,
}

impl<S: Source, T: Transform> Batch<S, T> {
    /// A batch with no destination: runs read and transform only.
    pub fn new(source: S, transform: T) -> Self {
        Self {
            source,
            transform,
            dest: None,
            args: TemplateArgs::new(),
            state: RunState::Idle,
        }
    }

    #[must_use]
    pub fn with_dest(mut self, dest: impl Destination + 'static) -> Self {
        self.dest = Some(Box::new(dest));
        self
    }

    /// Write gzip TSV next to the source, `_input` mapped to `_output`.
    #[must_use]
    pub fn with_default_dest<O: ObjectIO + 'static>(self, storage: O) -> Self {
        self.with_dest(ObjectDest::new(storage))
    }

    /// Arguments for the source prefix template.
    #[must_use]
    pub fn with_args(mut self, args: TemplateArgs) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn transform(&self) -> &T {
        &self.transform
    }

    /// Return a finished batch to [`RunState::Idle`] so it can run again.
    pub fn reset(&mut self) {
        self.state = RunState::Idle;
    }

    /// Process every selected object once.
    ///
    /// With `dry` set, or without a destination, nothing is written and
    /// already-written objects are not skipped; statistics are gathered the
    /// same way.
    ///
    /// # Errors
    /// [`EtlError::InvalidState`] unless idle, [`EtlError::SourceEmpty`] if the
    /// prefix lists nothing at all, and any selection, decode, transform or
    /// write failure. The batch ends in [`RunState::Failed`] in every case but
    /// the first.
    pub fn run(&mut self, dry: bool) -> Result<RunReport> {
        if self.state != RunState::Idle {
            return Err(EtlError::InvalidState(self.state));
        }
        self.state = RunState::Running;

        match self.execute(dry) {
            Ok(report) => {
                self.state = RunState::Completed;
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "run failed");
                self.state = RunState::Failed;
                Err(e)
            }
        }
    }

    fn execute(&mut self, dry: bool) -> Result<RunReport> {
        let Self {
            source,
            transform,
            dest,
            args,
            ..
        } = self;
        let dest = dest.as_deref();
        let probe: Option<&dyn SkipProbe> = match dest {
            Some(d) if !dry => Some(d),
            _ => None,
        };

        let batch = source.open(args, probe)?;
        if batch.listed() == 0 {
            return Err(EtlError::SourceEmpty {
                prefix: batch.prefix().to_string(),
            });
        }
        let prefix = batch.prefix().to_string();
        let listed = batch.listed();
        info!(prefix = %prefix, listed, dry, "starting run");

        let mut stats = RunStats::new();
        let mut written = Vec::new();
        for item in batch {
            let (object, rows) = item?;
            if rows.is_empty() {
                debug!(key = %object.key, "no rows, skipping");
                continue;
            }
            let row_count = rows.len();

            info!(key = %object.key, rows = row_count, "transform start");
            let started = Instant::now();
            let output = transform.transform(&rows).map_err(EtlError::Transform)?;
            let elapsed = started.elapsed();
            info!(
                key = %object.key,
                elapsed_secs = elapsed.as_secs_f64(),
                "transform finished"
            );
            stats.push(FileStat::new(&object.key, elapsed, row_count));

            if !dry && let Some(dest) = dest {
                written.push(dest.put(&output, &object)?);
            }
        }

        match stats.summary() {
            Some(summary) => summary.log(),
            None => info!(prefix = %prefix, "nothing to process"),
        }

        Ok(RunReport {
            prefix,
            listed,
            stats,
            written,
            dry,
        })
    }
}

//! # Prefixflow
//!
//! A **batch ETL runner** for tabular files stored under object-store prefixes.
//! Prefixflow lists every object under a prefix, narrows the listing to this
//! worker's share, decodes each object into rows, applies a caller-supplied
//! transform, and writes the result back at a deterministically mapped key.
//!
//! ## Key Features
//!
//! - **Templated prefixes** - `dev/{date}/foo_input/foo_input.tsv` resolved per run
//! - **Static sharding** - N independent processes each own a contiguous slice of the listing
//! - **Idempotent re-runs** - objects whose destination key already exists are skipped
//! - **Key allow-lists** - restrict a run to named objects for backfills and repairs
//! - **Dry runs** - read and transform without writing, with the same statistics
//! - **Warehouse exports** - run an `UNLOAD` first, then process the produced parts
//! - **Pluggable storage** - everything goes through the [`ObjectIO`] and [`WarehouseIO`] traits
//!
//! ## Quick Start
//!
//! ```
//! use prefixflow::io::cloud::FakeObjectIO;
//! use prefixflow::testing::{numbered_keys, sample_rows, upload_rows};
//! use prefixflow::{Batch, ObjectSource, Row, RowCollection, TemplateArgs};
//!
//! # fn main() -> prefixflow::Result<()> {
//! let storage = FakeObjectIO::new();
//! for key in numbered_keys("dev/2016-11-01/foo_input/foo_input.tsv", 0..2) {
//!     upload_rows(&storage, "bucket", &key, &sample_rows(3))?;
//! }
//!
//! let source = ObjectSource::new(storage.clone(), "bucket", "{env}/{date}/foo_input/foo_input.tsv")
//!     .with_columns(["id", "name"]);
//! let upper = |rows: &RowCollection| -> anyhow::Result<Vec<Row>> {
//!     Ok(rows.iter().map(|r| r.iter().map(|v| v.to_uppercase()).collect()).collect())
//! };
//!
//! let mut batch = Batch::new(source, upper)
//!     .with_default_dest(storage.clone())
//!     .with_args(TemplateArgs::new().with("env", "dev").with("date", "2016-11-01"));
//!
//! let report = batch.run(false)?;
//! assert_eq!(report.written.len(), 2);
//! assert_eq!(report.stats.total_rows(), 6);
//! assert!(storage
//!     .keys("bucket", "dev/2016-11-01/foo_output/")
//!     .iter()
//!     .all(|k| k.contains("foo_output.tsv")));
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Sources
//!
//! A [`Source`] turns template arguments into a lazy [`SourceBatch`] of
//! `(SourceObject, RowCollection)` pairs. [`ObjectSource`] reads delimited
//! files from a prefix; [`RedshiftUnloadSource`] exports a query into a prefix
//! first and then behaves like an `ObjectSource`.
//!
//! Selection happens in a fixed order:
//!
//! 1. resolve the prefix template and list it (the unfiltered count is kept)
//! 2. keep this worker's shard slice
//! 3. keep only allow-listed keys
//! 4. drop objects whose destination key already exists
//!
//! ### Destinations
//!
//! A [`Destination`] writes a transform's output and also answers the skip
//! probe, using one [`KeyMapper`] for both. The default [`ObjectDest`] writes
//! gzip TSV into the source bucket with `_input` replaced by `_output`.
//!
//! ### Batches
//!
//! A [`Batch`] runs once from [`RunState::Idle`] to `Completed` or `Failed`.
//! Any error is fatal. A prefix that lists nothing at all is an
//! [`EtlError::SourceEmpty`]; a shard whose slice is empty after filtering just
//! completes with no statistics.
//!
//! ### Statistics
//!
//! Every processed file contributes a [`FileStat`]. The run summary reports
//! the mean transform time per file and the mean, over files, of each file's
//! time per row.
//!
//! ## Configuration
//!
//! Shard coordinates and the allow-list come from environment variables whose
//! names the caller picks; resolve them once with [`SelectionConfig::from_env`]
//! and pass the result to the source. Logging is configured with
//! [`logging::LogConfig`] and installed with [`logging::init_logging`].
//!
//! ## Feature Flags
//!
//! - `compression-gzip` (default) - gzip bodies via `flate2`
//! - `compression-zstd` (default) - zstd bodies via `zstd`

pub mod config;
pub mod dest;
pub mod error;
pub mod io;
pub mod keymap;
pub mod logging;
pub mod partition;
pub mod redshift;
pub mod rows;
pub mod runner;
pub mod source;
pub mod stats;
pub mod template;
pub mod testing;

// Re-exports for a compact public API.
pub use config::{KeyAllowList, ParallelEnv, SelectionConfig, ShardCoordinates};
pub use dest::{Destination, ObjectDest, SkipProbe};
pub use error::{EtlError, Result};
pub use io::cloud::{CloudIOError, CloudResult, ErrorKind, ObjectIO, WarehouseIO};
pub use io::tsv::{Compression, TsvFormat};
pub use keymap::{KeyMapper, MarkerKeyMapper, RegexKeyMapper};
pub use partition::{shard_range, split_even};
pub use redshift::{RedshiftConfig, RedshiftUnloadSource};
pub use rows::{Row, RowCollection, TabularOutput};
pub use runner::{Batch, RunReport, RunState, Transform};
pub use source::{ObjectSource, Selection, Source, SourceBatch, SourceObject};
pub use stats::{FileStat, RunStats, RunSummary};
pub use template::{PrefixTemplate, TemplateArgs};

//! Object selection and reading.
//!
//! [`ObjectSource`] resolves a prefix template, lists the prefix, narrows the
//! listing (shard slice, then allow-list, then already-written skip) and hands
//! back a lazy [`SourceBatch`] that decodes one object at a time.
//!
//! Ordering follows the store's listing order throughout, so shard boundaries
//! are reproducible across workers that list the same prefix independently.

use crate::config::SelectionConfig;
use crate::dest::SkipProbe;
use crate::error::{EtlError, Result};
use crate::io::cloud::ObjectIO;
use crate::io::tsv::TsvFormat;
use crate::rows::RowCollection;
use crate::template::{PrefixTemplate, TemplateArgs};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceObject {
    pub bucket: String,
    pub key: String,
}

impl SourceObject {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for SourceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// The objects a worker will process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Resolved prefix.
    pub prefix: String,
    /// Objects under the prefix before any filtering.
    pub listed: usize,
    pub objects: Vec<SourceObject>,
}

type RowsIter<'a> = Box<dyn Iterator<Item = Result<(SourceObject, RowCollection)>> + 'a>;

/// Lazy, forward-only sequence of decoded objects.
///
/// Objects whose body holds no rows are skipped. A decode failure is yielded
/// as an error; callers stop at the first one.
pub struct SourceBatch<'a> {
    prefix: String,
    listed: usize,
    iter: RowsIter<'a>,
}

impl<'a> SourceBatch<'a> {
    pub fn new(prefix: String, listed: usize, iter: RowsIter<'a>) -> Self {
        Self {
            prefix,
            listed,
            iter,
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Objects under the prefix before any filtering. Zero means the source
    /// does not exist, as opposed to this worker having nothing left to do.
    #[must_use]
    pub fn listed(&self) -> usize {
        self.listed
    }
}

impl Iterator for SourceBatch<'_> {
    type Item = Result<(SourceObject, RowCollection)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

/// Anything a [`Batch`](crate::runner::Batch) can pull rows from.
pub trait Source {
    /// The unresolved prefix, for messages.
    fn prefix_template(&self) -> &PrefixTemplate;

    /// Select objects for `args` and return them lazily decoded.
    ///
    /// `skip`, when given, drops objects whose mapped destination key already
    /// exists.
    ///
    /// # Errors
    /// Configuration, listing and skip-probe failures. Per-object failures are
    /// yielded by the batch instead.
    fn open<'a>(
        &'a self,
        args: &TemplateArgs,
        skip: Option<&dyn SkipProbe>,
    ) -> Result<SourceBatch<'a>>;
}

/// Delimited files under a prefix in object storage.
pub struct ObjectSource<O> {
    storage: O,
    bucket: String,
    prefix: PrefixTemplate,
    columns: Vec<String>,
    format: TsvFormat,
    selection: SelectionConfig,
}

impl<O: ObjectIO> ObjectSource<O> {
    pub fn new(storage: O, bucket: impl Into<String>, prefix: impl Into<PrefixTemplate>) -> Self {
        Self {
            storage,
            bucket: bucket.into(),
            prefix: prefix.into(),
            columns: Vec::new(),
            format: TsvFormat::default(),
            selection: SelectionConfig::default(),
        }
    }

    /// Name the decoded columns. Not validated against row width.
    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TsvFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionConfig {
        &self.selection
    }

    /// # Errors
    /// [`EtlError::Config`] for an unresolvable template.
    pub fn resolve_prefix(&self, args: &TemplateArgs) -> Result<String> {
        self.prefix.resolve(args)
    }

    /// Decide which objects this worker processes.
    ///
    /// # Errors
    /// Template, listing or skip-probe failures.
    pub fn select(&self, args: &TemplateArgs, skip: Option<&dyn SkipProbe>) -> Result<Selection> {
        let prefix = self.resolve_prefix(args)?;
        let mut objects: Vec<SourceObject> = self
            .storage
            .list_objects(&self.bucket, Some(&prefix))
            .map_err(EtlError::Storage)?
            .into_iter()
            .map(|o| SourceObject::new(&self.bucket, o.key))
            .collect();
        let listed = objects.len();
        debug!(bucket = %self.bucket, prefix = %prefix, listed, "listed source");

        if let Some(shard) = &self.selection.shard {
            objects = shard.slice(objects);
            info!(
                index = shard.index(),
                size = shard.size(),
                selected = objects.len(),
                "selected shard"
            );
        }

        if let Some(allow) = &self.selection.allow_list {
            objects.retain(|o| allow.contains(&o.key));
            info!(allowed = allow.len(), selected = objects.len(), "applied key allow-list");
        }

        if let Some(probe) = skip {
            let existing = probe.existing_keys(&self.bucket, &prefix)?;
            let before = objects.len();
            objects.retain(|o| !existing.contains(&probe.map_key(&o.key)));
            let skipped = before - objects.len();
            if skipped > 0 {
                info!(skipped, remaining = objects.len(), "skipping already processed files");
            }
        }

        Ok(Selection {
            prefix,
            listed,
            objects,
        })
    }

    /// Fetch and decode one object; `None` if it holds no rows.
    ///
    /// # Errors
    /// [`EtlError::Storage`] or [`EtlError::Decode`].
    pub fn read(&self, object: &SourceObject) -> Result<Option<RowCollection>> {
        let body = self
            .storage
            .get_object(&object.bucket, &object.key)
            .map_err(EtlError::Storage)?;
        let rows = self.format.decode(&object.key, &body)?;
        if rows.is_empty() {
            debug!(key = %object.key, "no rows, skipping");
            return Ok(None);
        }
        Ok(Some(
            RowCollection::from_rows(rows).with_columns(self.columns.iter().cloned()),
        ))
    }

    /// [`open`](Source::open) without skip detection.
    ///
    /// # Errors
    /// As for [`open`](Source::open).
    pub fn fetch(&self, args: &TemplateArgs) -> Result<SourceBatch<'_>> {
        self.open(args, None)
    }
}

impl<O: ObjectIO> Source for ObjectSource<O> {
    fn prefix_template(&self) -> &PrefixTemplate {
        &self.prefix
    }

    fn open<'a>(
        &'a self,
        args: &TemplateArgs,
        skip: Option<&dyn SkipProbe>,
    ) -> Result<SourceBatch<'a>> {
        let Selection {
            prefix,
            listed,
            objects,
        } = self.select(args, skip)?;

        let iter = objects
            .into_iter()
            .filter_map(move |object| match self.read(&object) {
                Ok(Some(rows)) => Some(Ok((object, rows))),
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            });
        Ok(SourceBatch::new(prefix, listed, Box::new(iter)))
    }
}

//! Destination writes and skip detection.

use crate::error::{EtlError, Result};
use crate::io::cloud::ObjectIO;
use crate::io::tsv::TsvFormat;
use crate::keymap::{KeyMapper, MarkerKeyMapper};
use crate::rows::TabularOutput;
use crate::source::SourceObject;
use std::collections::HashSet;
use tracing::debug;

/// Answers which destination keys already exist for a source prefix.
pub trait SkipProbe {
    fn map_key(&self, source_key: &str) -> String;

    /// Keys already present under `map_key(source_prefix)`.
    ///
    /// # Errors
    /// [`EtlError::Storage`] if the listing fails.
    fn existing_keys(&self, source_bucket: &str, source_prefix: &str) -> Result<HashSet<String>>;
}

/// Where transform results are written. Also its own skip probe, so the key
/// mapping used to skip and to write can never diverge.
pub trait Destination: SkipProbe {
    /// Write `output` for `object`; returns the destination key.
    ///
    /// # Errors
    /// [`EtlError::Encode`] or [`EtlError::Storage`].
    fn put(&self, output: &dyn TabularOutput, object: &SourceObject) -> Result<String>;
}

/// Writes encoded rows back to object storage at the mapped key.
pub struct ObjectDest<O, M = MarkerKeyMapper> {
    storage: O,
    mapper: M,
    format: TsvFormat,
    bucket: Option<String>,
}

impl<O: ObjectIO> ObjectDest<O> {
    /// Gzip TSV into the source object's bucket, `_input` mapped to `_output`.
    pub fn new(storage: O) -> Self {
        Self {
            storage,
            mapper: MarkerKeyMapper::default(),
            format: TsvFormat::gzip(),
            bucket: None,
        }
    }
}

impl<O: ObjectIO, M: KeyMapper> ObjectDest<O, M> {
    pub fn with_key_mapper<M2: KeyMapper>(self, mapper: M2) -> ObjectDest<O, M2> {
        ObjectDest {
            storage: self.storage,
            mapper,
            format: self.format,
            bucket: self.bucket,
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: TsvFormat) -> Self {
        self.format = format;
        self
    }

    /// Write to `bucket` instead of the source object's bucket.
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    fn target_bucket<'a>(&'a self, source_bucket: &'a str) -> &'a str {
        self.bucket.as_deref().unwrap_or(source_bucket)
    }
}

impl<O: ObjectIO, M: KeyMapper> SkipProbe for ObjectDest<O, M> {
    fn map_key(&self, source_key: &str) -> String {
        self.mapper.map_key(source_key)
    }

    fn existing_keys(&self, source_bucket: &str, source_prefix: &str) -> Result<HashSet<String>> {
        let bucket = self.target_bucket(source_bucket);
        let prefix = self.map_key(source_prefix);
        let keys: HashSet<String> = self
            .storage
            .list_objects(bucket, Some(&prefix))
            .map_err(EtlError::Storage)?
            .into_iter()
            .map(|o| o.key)
            .collect();
        debug!(bucket, prefix = %prefix, existing = keys.len(), "probed destination");
        Ok(keys)
    }
}

impl<O: ObjectIO, M: KeyMapper> Destination for ObjectDest<O, M> {
    fn put(&self, output: &dyn TabularOutput, object: &SourceObject) -> Result<String> {
        let key = self.map_key(&object.key);
        let bucket = self.target_bucket(&object.bucket);
        let body = self.format.encode(&key, output.rows())?;
        self.storage
            .put_object(bucket, &key, &body)
            .map_err(EtlError::Storage)?;
        debug!(bucket, key = %key, rows = output.row_count(), bytes = body.len(), "wrote result");
        Ok(key)
    }
}

//! Core traits for object storage and warehouse collaborators.
//!
//! These traits are synchronous; implementations wrapping async SDKs block
//! internally.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Core Error Type
// ============================================================================

/// Generic error type for cloud IO operations
#[derive(Debug, Clone)]
pub struct CloudIOError {
    pub message: String,
    pub kind: ErrorKind,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Authorization,
    NotFound,
    InvalidInput,
    Network,
    Timeout,
    ServiceUnavailable,
    InternalError,
    Other,
}

impl fmt::Display for CloudIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

impl Error for CloudIOError {}

impl CloudIOError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

pub type CloudResult<T> = Result<T, CloudIOError>;

// ============================================================================
// ObjectIO - Object Storage
// ============================================================================

/// An entry returned by a prefix listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub key: String,
    pub size: u64,
}

/// Trait for object storage operations
///
/// Listing order must be stable and total (lexicographic by key): independent
/// workers partition the same listing and rely on seeing identical order.
pub trait ObjectIO: Send + Sync {
    /// Upload data to object storage
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket is inaccessible or the upload fails
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<()>;

    /// Download data from object storage
    ///
    /// # Errors
    ///
    /// Returns an error if the object doesn't exist or the download fails
    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>>;

    /// List objects whose key starts with `prefix`, sorted by key
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket doesn't exist or the listing fails
    fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> CloudResult<Vec<ObjectMetadata>>;

    /// Check if an object exists
    ///
    /// # Errors
    ///
    /// Returns an error if the check itself fails
    fn object_exists(&self, bucket: &str, key: &str) -> CloudResult<bool>;

    /// Delete an object
    ///
    /// # Errors
    ///
    /// Returns an error if permissions are not enough or the deletion fails
    fn delete_object(&self, bucket: &str, key: &str) -> CloudResult<()>;
}

impl<O: ObjectIO + ?Sized> ObjectIO for Arc<O> {
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<()> {
        (**self).put_object(bucket, key, data)
    }

    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>> {
        (**self).get_object(bucket, key)
    }

    fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> CloudResult<Vec<ObjectMetadata>> {
        (**self).list_objects(bucket, prefix)
    }

    fn object_exists(&self, bucket: &str, key: &str) -> CloudResult<bool> {
        (**self).object_exists(bucket, key)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> CloudResult<()> {
        (**self).delete_object(bucket, key)
    }
}

// ============================================================================
// WarehouseIO - Analytical Databases
// ============================================================================

/// Trait for analytical data warehouse operations
pub trait WarehouseIO: Send + Sync {
    /// Execute a statement without returning results
    ///
    /// Returns once the warehouse acknowledges the statement. For exports this
    /// does not imply the produced files are complete.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement is invalid, execution fails, or there's a connection issue
    fn execute(&self, sql: &str) -> CloudResult<()>;
}

impl<W: WarehouseIO + ?Sized> WarehouseIO for Arc<W> {
    fn execute(&self, sql: &str) -> CloudResult<()> {
        (**self).execute(sql)
    }
}

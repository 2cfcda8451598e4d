//! An [`ObjectIO`] decorator that logs every call under a redaction policy.

use crate::io::cloud::traits::{CloudResult, ObjectIO, ObjectMetadata};
use crate::logging::{RedactedFields, RedactionPolicy};
use std::fmt;
use tracing::debug;

/// Renders a body lazily so omitted bodies are never decoded.
struct BodyText<'a>(&'a [u8]);

impl fmt::Display for BodyText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.0))
    }
}

/// Wraps any store and emits one `debug` event per call.
///
/// Object bodies are passed to the policy as the `body` field, so the default
/// policy keeps them out of the log while still recording their size.
pub struct LoggedObjectIO<O> {
    inner: O,
    policy: RedactionPolicy,
}

impl<O: ObjectIO> LoggedObjectIO<O> {
    pub fn new(inner: O) -> Self {
        Self::with_policy(inner, RedactionPolicy::default())
    }

    pub fn with_policy(inner: O, policy: RedactionPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    fn fields(&self) -> RedactedFields<'_> {
        RedactedFields::new(&self.policy)
    }
}

impl<O: ObjectIO> ObjectIO for LoggedObjectIO<O> {
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<()> {
        let fields = self
            .fields()
            .field("bucket", bucket)
            .field("key", key)
            .field("bytes", data.len())
            .field("body", BodyText(data));
        debug!(action = "put_object", params = %fields);
        self.inner.put_object(bucket, key, data)
    }

    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>> {
        let fields = self.fields().field("bucket", bucket).field("key", key);
        debug!(action = "get_object", params = %fields);
        self.inner.get_object(bucket, key)
    }

    fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> CloudResult<Vec<ObjectMetadata>> {
        let fields = self
            .fields()
            .field("bucket", bucket)
            .field("prefix", prefix.unwrap_or(""));
        debug!(action = "list_objects", params = %fields);
        self.inner.list_objects(bucket, prefix)
    }

    fn object_exists(&self, bucket: &str, key: &str) -> CloudResult<bool> {
        let fields = self.fields().field("bucket", bucket).field("key", key);
        debug!(action = "object_exists", params = %fields);
        self.inner.object_exists(bucket, key)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> CloudResult<()> {
        let fields = self.fields().field("bucket", bucket).field("key", key);
        debug!(action = "delete_object", params = %fields);
        self.inner.delete_object(bucket, key)
    }
}

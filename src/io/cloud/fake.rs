//! Fake implementations for testing.
//!
//! These implementations use in-memory data structures to simulate object
//! storage and a warehouse, so batch runs can be tested without external
//! dependencies.

use crate::io::cloud::traits::{
    CloudIOError, CloudResult, ErrorKind, ObjectIO, ObjectMetadata, WarehouseIO,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type BucketStorage = Arc<Mutex<HashMap<String, HashMap<String, Vec<u8>>>>>;
type ExecuteHook = Arc<dyn Fn(&str) -> CloudResult<()> + Send + Sync>;

// ============================================================================
// FakeObjectIO
// ============================================================================

/// Shared in-memory object store. Clones see the same buckets.
#[derive(Clone)]
pub struct FakeObjectIO {
    storage: BucketStorage,
    writes: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeObjectIO {
    #[must_use]
    pub fn new() -> Self {
        Self {
            storage: Arc::new(Mutex::new(HashMap::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create an empty bucket so listings succeed before anything is written.
    ///
    /// # Panics
    ///
    /// Panics if the storage mutex is poisoned.
    pub fn create_bucket(&self, bucket: &str) {
        self.storage
            .lock()
            .expect("storage mutex poisoned")
            .entry(bucket.to_string())
            .or_default();
    }

    /// Every `(bucket, key)` passed to `put_object`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the write log mutex is poisoned.
    #[must_use]
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().expect("writes mutex poisoned").clone()
    }

    /// Keys under `prefix`, sorted; empty if the bucket doesn't exist.
    #[must_use]
    pub fn keys(&self, bucket: &str, prefix: &str) -> Vec<String> {
        self.list_objects(bucket, Some(prefix))
            .map(|objs| objs.into_iter().map(|o| o.key).collect())
            .unwrap_or_default()
    }
}

impl Default for FakeObjectIO {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectIO for FakeObjectIO {
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<()> {
        self.storage
            .lock()
            .expect("storage mutex poisoned")
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), data.to_vec());
        self.writes
            .lock()
            .expect("writes mutex poisoned")
            .push((bucket.to_string(), key.to_string()));
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        storage
            .get(bucket)
            .and_then(|b| b.get(key))
            .cloned()
            .ok_or_else(|| {
                CloudIOError::new(
                    ErrorKind::NotFound,
                    format!("Object {bucket}/{key} not found"),
                )
            })
    }

    fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> CloudResult<Vec<ObjectMetadata>> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        let bucket_map = storage.get(bucket).ok_or_else(|| {
            CloudIOError::new(ErrorKind::NotFound, format!("Bucket {bucket} not found"))
        })?;

        let mut objects: Vec<ObjectMetadata> = bucket_map
            .iter()
            .filter(|(key, _)| prefix.is_none_or(|p| key.starts_with(p)))
            .map(|(key, data)| ObjectMetadata {
                key: key.clone(),
                size: data.len() as u64,
            })
            .collect();

        drop(storage);
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    fn object_exists(&self, bucket: &str, key: &str) -> CloudResult<bool> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        Ok(storage.get(bucket).is_some_and(|b| b.contains_key(key)))
    }

    fn delete_object(&self, bucket: &str, key: &str) -> CloudResult<()> {
        if let Some(bucket_map) = self
            .storage
            .lock()
            .expect("storage mutex poisoned")
            .get_mut(bucket)
        {
            bucket_map.remove(key);
        }
        Ok(())
    }
}

// ============================================================================
// FakeWarehouseIO
// ============================================================================

/// Records executed statements. An optional hook runs on each `execute`, which
/// lets tests materialise an export's output or inject a failure.
#[derive(Clone, Default)]
pub struct FakeWarehouseIO {
    statements: Arc<Mutex<Vec<String>>>,
    on_execute: Option<ExecuteHook>,
}

impl FakeWarehouseIO {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) -> CloudResult<()> + Send + Sync + 'static,
    {
        self.on_execute = Some(Arc::new(hook));
        self
    }

    /// Statements passed to `execute`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the statements mutex is poisoned.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.statements
            .lock()
            .expect("statements mutex poisoned")
            .clone()
    }
}

impl WarehouseIO for FakeWarehouseIO {
    fn execute(&self, sql: &str) -> CloudResult<()> {
        self.statements
            .lock()
            .expect("statements mutex poisoned")
            .push(sql.to_string());
        match &self.on_execute {
            Some(hook) => hook(sql),
            None => Ok(()),
        }
    }
}

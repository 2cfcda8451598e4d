//! Run-time selection configuration.
//!
//! Shard coordinates and the key allow-list arrive through environment
//! variables whose names the caller chooses. They are resolved exactly once,
//! at the entry point, into a [`SelectionConfig`] that is handed to the
//! source; nothing below this module reads the environment.

use crate::error::{EtlError, Result};
use crate::partition::shard_range;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Names of the two variables carrying shard coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelEnv {
    pub index_var: String,
    pub size_var: String,
}

impl ParallelEnv {
    pub fn new(index_var: impl Into<String>, size_var: impl Into<String>) -> Self {
        Self {
            index_var: index_var.into(),
            size_var: size_var.into(),
        }
    }
}

/// Which slice of the listing this worker owns.
///
/// Deserialization goes through [`ShardCoordinates::new`], so a loaded value
/// always satisfies `index < size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawShardCoordinates")]
pub struct ShardCoordinates {
    index: usize,
    size: usize,
}

#[derive(Deserialize)]
struct RawShardCoordinates {
    index: usize,
    size: usize,
}

impl TryFrom<RawShardCoordinates> for ShardCoordinates {
    type Error = EtlError;

    fn try_from(raw: RawShardCoordinates) -> Result<Self> {
        Self::new(raw.index, raw.size)
    }
}

impl ShardCoordinates {
    /// # Errors
    /// [`EtlError::Config`] unless `size > 0` and `index < size`.
    pub fn new(index: usize, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(EtlError::config("shard size must be positive"));
        }
        if index >= size {
            return Err(EtlError::config(format!(
                "shard index {index} out of range for size {size}"
            )));
        }
        Ok(Self { index, size })
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Keep only this shard's contiguous slice of `items`.
    #[must_use]
    pub fn slice<T>(&self, mut items: Vec<T>) -> Vec<T> {
        let range = shard_range(items.len(), self.size, self.index);
        items.truncate(range.end);
        items.drain(..range.start);
        items
    }
}

/// Exact source keys a run is restricted to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAllowList(HashSet<String>);

impl KeyAllowList {
    /// Parse a comma-separated list, trimming whitespace and dropping empty
    /// entries.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        text.split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for KeyAllowList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Narrowing applied to a listing before skip detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub shard: Option<ShardCoordinates>,
    pub allow_list: Option<KeyAllowList>,
}

impl SelectionConfig {
    #[must_use]
    pub fn with_shard(mut self, shard: ShardCoordinates) -> Self {
        self.shard = Some(shard);
        self
    }

    #[must_use]
    pub fn with_allow_list(mut self, allow_list: KeyAllowList) -> Self {
        self.allow_list = Some(allow_list);
        self
    }

    /// Resolve from the process environment.
    ///
    /// # Errors
    /// See [`resolve`](Self::resolve).
    pub fn from_env(parallel: Option<&ParallelEnv>, allow_list_var: Option<&str>) -> Result<Self> {
        Self::resolve(parallel, allow_list_var, |name| std::env::var(name).ok())
    }

    /// Resolve through `lookup`.
    ///
    /// An unset or empty size variable disables sharding. A set size with an
    /// unset index, a non-numeric value, or out-of-range coordinates is fatal.
    /// An unset or empty allow-list variable disables the allow-list.
    ///
    /// # Errors
    /// [`EtlError::Config`] as described above.
    pub fn resolve(
        parallel: Option<&ParallelEnv>,
        allow_list_var: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();

        if let Some(env) = parallel
            && let Some(size) = lookup(&env.size_var).filter(|v| !v.trim().is_empty())
        {
            let size = parse_count(&env.size_var, &size)?;
            let index = lookup(&env.index_var).ok_or_else(|| {
                EtlError::config(format!(
                    "environment variable `{}` must be specified",
                    env.index_var
                ))
            })?;
            let index = parse_count(&env.index_var, &index)?;
            config.shard = Some(ShardCoordinates::new(index, size)?);
        }

        if let Some(var) = allow_list_var
            && let Some(keys) = lookup(var).filter(|v| !v.is_empty())
        {
            config.allow_list = Some(KeyAllowList::parse(&keys));
        }

        Ok(config)
    }
}

fn parse_count(var: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|e| {
        EtlError::config(format!(
            "environment variable `{var}` must be a non-negative integer, got `{value}`: {e}"
        ))
    })
}

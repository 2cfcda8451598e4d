//! Source key to destination key mapping.
//!
//! The same mapper must drive both skip detection and the write path; the
//! destination owns its mapper and serves both roles, which keeps them in
//! step.

use crate::error::{EtlError, Result};
use regex::Regex;

/// A pure, deterministic function from source key to destination key.
pub trait KeyMapper {
    fn map_key(&self, key: &str) -> String;
}

impl<F> KeyMapper for F
where
    F: Fn(&str) -> String,
{
    fn map_key(&self, key: &str) -> String {
        self(key)
    }
}

/// Replaces every occurrence of a marker substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerKeyMapper {
    from: String,
    to: String,
}

impl MarkerKeyMapper {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Default for MarkerKeyMapper {
    /// `_input` becomes `_output`.
    fn default() -> Self {
        Self::new("_input", "_output")
    }
}

impl KeyMapper for MarkerKeyMapper {
    fn map_key(&self, key: &str) -> String {
        if self.from.is_empty() {
            return key.to_string();
        }
        key.replace(&self.from, &self.to)
    }
}

/// Regex substitution; the replacement may use `$1` / `${name}` groups.
#[derive(Debug, Clone)]
pub struct RegexKeyMapper {
    pattern: Regex,
    replacement: String,
}

impl RegexKeyMapper {
    /// # Errors
    /// [`EtlError::Config`] if `pattern` is not a valid regex.
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| EtlError::config(format!("invalid key pattern `{pattern}`: {e}")))?;
        Ok(Self {
            pattern,
            replacement: replacement.into(),
        })
    }
}

impl KeyMapper for RegexKeyMapper {
    fn map_key(&self, key: &str) -> String {
        self.pattern
            .replace_all(key, self.replacement.as_str())
            .into_owned()
    }
}

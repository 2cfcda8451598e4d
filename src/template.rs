//! Prefix templates with named `{placeholder}` substitution.
//!
//! `{{` and `}}` produce literal braces. Every placeholder must be supplied;
//! unused arguments are ignored.

use crate::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named values substituted into a [`PrefixTemplate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateArgs(BTreeMap<String, String>);

impl TemplateArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(name.into(), value.to_string());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        self.0.insert(name.into(), value.to_string());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for TemplateArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
        )
    }
}

/// A key prefix such as `"input/{date}/file.tsv"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefixTemplate(String);

impl PrefixTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitute `args` into the template.
    ///
    /// # Errors
    /// [`EtlError::Config`] for a placeholder missing from `args`, an empty or
    /// unterminated placeholder, or a lone `}`.
    pub fn resolve(&self, args: &TemplateArgs) -> Result<String> {
        let mut out = String::with_capacity(self.0.len());
        let mut chars = self.0.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(EtlError::config(format!(
                            "unterminated placeholder in prefix `{}`",
                            self.0
                        )));
                    }
                    if name.is_empty() {
                        return Err(EtlError::config(format!(
                            "empty placeholder in prefix `{}`",
                            self.0
                        )));
                    }
                    let value = args.get(&name).ok_or_else(|| {
                        EtlError::config(format!(
                            "unresolved placeholder `{{{name}}}` in prefix `{}`",
                            self.0
                        ))
                    })?;
                    out.push_str(value);
                }
                '}' => {
                    return Err(EtlError::config(format!(
                        "single `}}` in prefix `{}`",
                        self.0
                    )));
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }
}

impl fmt::Display for PrefixTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrefixTemplate {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PrefixTemplate {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_named_placeholder() {
        let t = PrefixTemplate::new("input/{date}/file.tsv");
        let args = TemplateArgs::new().with("date", "2020-01-01");
        assert_eq!(t.resolve(&args).unwrap(), "input/2020-01-01/file.tsv");
    }

    #[test]
    fn test_plain_prefix_ignores_extra_args() {
        let t = PrefixTemplate::new("development/foo/foo.tsv");
        let args = TemplateArgs::new().with("unused", 1);
        assert_eq!(t.resolve(&args).unwrap(), "development/foo/foo.tsv");
    }

    #[test]
    fn test_escaped_braces() {
        let t = PrefixTemplate::new("a/{{literal}}/{x}");
        let args = TemplateArgs::new().with("x", 7);
        assert_eq!(t.resolve(&args).unwrap(), "a/{literal}/7");
    }

    #[test]
    fn test_missing_placeholder_is_config_error() {
        let t = PrefixTemplate::new("input/{date}/");
        let err = t.resolve(&TemplateArgs::new()).unwrap_err();
        assert!(matches!(err, EtlError::Config(ref m) if m.contains("{date}")));
    }

    #[test]
    fn test_malformed_templates() {
        let args = TemplateArgs::new().with("a", "x");
        assert!(PrefixTemplate::new("input/{a").resolve(&args).is_err());
        assert!(PrefixTemplate::new("input/{}").resolve(&args).is_err());
        assert!(PrefixTemplate::new("input/a}").resolve(&args).is_err());
    }
}

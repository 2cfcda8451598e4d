//! Logging setup and field redaction.
//!
//! All progress output goes through `tracing`. Binaries call [`init_logging`]
//! once at startup; libraries and tests may skip it.
//!
//! Sensitive values (object bodies, warehouse credentials) are kept out of log
//! records by rendering fields through an explicit [`RedactionPolicy`] at the
//! call site:
//!
//! ```
//! use prefixflow::logging::{RedactedFields, RedactionPolicy};
//!
//! let policy = RedactionPolicy::default();
//! let fields = RedactedFields::new(&policy)
//!     .field("key", "out/part_00.gz")
//!     .field("body", "<bytes>")
//!     .field("credentials", "aws_iam_role=arn:...");
//! assert_eq!(fields.to_string(), "key=out/part_00.gz credentials=****");
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log level (`trace` .. `error`).
pub const LOG_LEVEL_ENV: &str = "PREFIXFLOW_LOG_LEVEL";
/// Environment variable holding the log format (`text` or `json`).
pub const LOG_FORMAT_ENV: &str = "PREFIXFLOW_LOG_FORMAT";

/// Log level for filtering messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(anyhow::anyhow!("Invalid log level: {}", s)),
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `<time> <target> [<LEVEL>] <message>` lines on stdout
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl LogConfig {
    /// Read [`LOG_LEVEL_ENV`] and [`LOG_FORMAT_ENV`], defaulting unset values.
    ///
    /// # Errors
    /// Returns an error if either variable holds an unrecognised value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with an injectable variable lookup.
    ///
    /// # Errors
    /// Returns an error if either variable holds an unrecognised value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|v| !v.is_empty()) {
            config.level = level.parse().with_context(|| format!("parse {LOG_LEVEL_ENV}"))?;
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV).filter(|v| !v.is_empty()) {
            config.format = format.parse().with_context(|| format!("parse {LOG_FORMAT_ENV}"))?;
        }
        Ok(config)
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_tracing_level().as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Text => registry
            .with(tfmt::layer().with_writer(std::io::stdout).with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(tfmt::layer().json().with_writer(std::io::stdout))
            .try_init(),
    }
    .context("install tracing subscriber")
}

// ============================================================================
// Redaction
// ============================================================================

/// What to do with one named field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldDirective {
    Keep,
    /// Drop the field entirely.
    Omit,
    /// Keep the field name, replace the value with `****`.
    Mask,
}

/// Per-field redaction rules. Fields without a rule are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionPolicy {
    rules: HashMap<String, FieldDirective>,
}

impl Default for RedactionPolicy {
    /// Omits object bodies and masks credentials.
    fn default() -> Self {
        Self::keep_all()
            .with_rule("body", FieldDirective::Omit)
            .with_rule("credentials", FieldDirective::Mask)
    }
}

impl RedactionPolicy {
    #[must_use]
    pub fn keep_all() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_rule(mut self, field: impl Into<String>, directive: FieldDirective) -> Self {
        self.rules.insert(field.into(), directive);
        self
    }

    #[must_use]
    pub fn directive(&self, field: &str) -> FieldDirective {
        self.rules.get(field).copied().unwrap_or(FieldDirective::Keep)
    }

    /// The value to log for `field`, or `None` if it must be omitted.
    #[must_use]
    pub fn render(&self, field: &str, value: &dyn fmt::Display) -> Option<String> {
        match self.directive(field) {
            FieldDirective::Keep => Some(value.to_string()),
            FieldDirective::Mask => Some("****".to_string()),
            FieldDirective::Omit => None,
        }
    }
}

/// `name=value` pairs rendered through a policy, for use as one log field.
pub struct RedactedFields<'a> {
    policy: &'a RedactionPolicy,
    rendered: Vec<(String, String)>,
}

impl<'a> RedactedFields<'a> {
    #[must_use]
    pub fn new(policy: &'a RedactionPolicy) -> Self {
        Self {
            policy,
            rendered: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, name: &str, value: impl fmt::Display) -> Self {
        if let Some(v) = self.policy.render(name, &value) {
            self.rendered.push((name.to_string(), v));
        }
        self
    }
}

impl fmt::Display for RedactedFields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.rendered.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_config_from_lookup() {
        let config = LogConfig::from_lookup(|name| match name {
            LOG_LEVEL_ENV => Some("debug".to_string()),
            LOG_FORMAT_ENV => Some("json".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);

        assert_eq!(LogConfig::from_lookup(|_| None).unwrap(), LogConfig::default());
        assert!(LogConfig::from_lookup(|_| Some("nope".to_string())).is_err());
    }

    #[test]
    fn test_default_policy_hides_body_and_credentials() {
        let policy = RedactionPolicy::default();
        assert_eq!(policy.render("body", &"secret bytes"), None);
        assert_eq!(policy.render("credentials", &"k;s"), Some("****".to_string()));
        assert_eq!(policy.render("key", &"a/b"), Some("a/b".to_string()));
    }

    #[test]
    fn test_custom_rules_override_defaults() {
        let policy = RedactionPolicy::default().with_rule("body", FieldDirective::Keep);
        let fields = RedactedFields::new(&policy).field("body", 3).field("bucket", "b");
        assert_eq!(fields.to_string(), "body=3 bucket=b");
    }
}

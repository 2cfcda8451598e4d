//! A source that first exports a query result to object storage.
//!
//! [`RedshiftUnloadSource`] issues an `UNLOAD` for its SQL into the resolved
//! prefix, then reads the produced parts through an ordinary
//! [`ObjectSource`]. The export is trusted once the warehouse acknowledges the
//! statement; the parts are not checked for completeness.

use crate::dest::SkipProbe;
use crate::error::{EtlError, Result};
use crate::io::cloud::{ObjectIO, WarehouseIO};
use crate::logging::RedactionPolicy;
use crate::source::{ObjectSource, Source, SourceBatch};
use crate::template::{PrefixTemplate, TemplateArgs};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Variable supplying the default warehouse user.
pub const USER_ENV: &str = "RSUSER";

/// Connection and export-credential settings.
///
/// The connection fields are for the [`WarehouseIO`] implementation; this
/// crate itself only needs the credentials.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedshiftConfig {
    pub user: Option<String>,
    pub database: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub iam_role: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl RedshiftConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with `user` taken from [`USER_ENV`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            user: lookup(USER_ENV).filter(|u| !u.is_empty()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = Some(host.into());
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn with_iam_role(mut self, role: impl Into<String>) -> Self {
        self.iam_role = Some(role.into());
        self
    }

    #[must_use]
    pub fn with_access_key(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// The `credentials` clause value. An IAM role wins over a key pair.
    ///
    /// # Errors
    /// [`EtlError::Config`] if neither a role nor a complete key pair is set.
    pub fn credential_string(&self) -> Result<String> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.is_empty())
        }

        if let Some(role) = present(&self.iam_role) {
            return Ok(format!("aws_iam_role={role}"));
        }
        if let (Some(id), Some(secret)) = (
            present(&self.access_key_id),
            present(&self.secret_access_key),
        ) {
            return Ok(format!(
                "aws_access_key_id={id};aws_secret_access_key={secret}"
            ));
        }
        Err(EtlError::config("s3 credential is required"))
    }
}

impl fmt::Debug for RedshiftConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedshiftConfig")
            .field("user", &self.user)
            .field("database", &self.database)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("iam_role", &self.iam_role)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "****"),
            )
            .finish()
    }
}

/// Strip common leading indentation and surrounding blank lines.
///
/// The first line only loses its own leading whitespace and does not count
/// towards the common indent.
#[must_use]
pub fn cleandoc(text: &str) -> String {
    fn indent(line: &str) -> usize {
        line.len() - line.trim_start_matches([' ', '\t']).len()
    }

    let lines: Vec<&str> = text.lines().collect();
    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent(l))
        .min()
        .unwrap_or(0);

    let mut out: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.trim_start()
            } else {
                line.get(margin..).unwrap_or_else(|| line.trim_start())
            }
        })
        .collect();

    while out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }
    let first = out
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(out.len());
    out[first..].join("\n")
}

/// Escape single quotes for embedding in a quoted `UNLOAD` argument.
#[must_use]
pub fn escape_query(sql: &str) -> String {
    sql.replace('\'', "\\'")
}

fn render_unload(sql: &str, bucket: &str, prefix: &str, credentials: &str) -> String {
    let sql = cleandoc(&escape_query(sql));
    format!(
        "unload ('\n{sql}\n')\nto 's3://{bucket}/{prefix}'\ncredentials '{credentials}'\n\
         delimiter '\\t'\ngzip\nallowoverwrite\n;"
    )
}

/// Exports `sql` with `UNLOAD`, then reads the parts like an [`ObjectSource`].
pub struct RedshiftUnloadSource<W, O> {
    warehouse: W,
    sql: String,
    config: RedshiftConfig,
    source: ObjectSource<O>,
    policy: RedactionPolicy,
}

impl<W: WarehouseIO, O: ObjectIO> RedshiftUnloadSource<W, O> {
    /// `source` decides the unload destination (its bucket and resolved
    /// prefix) as well as how the parts are selected and decoded.
    pub fn new(
        warehouse: W,
        sql: impl Into<String>,
        config: RedshiftConfig,
        source: ObjectSource<O>,
    ) -> Self {
        Self {
            warehouse,
            sql: sql.into(),
            config,
            source,
            policy: RedactionPolicy::default(),
        }
    }

    /// Policy applied to the logged statement's `credentials` field.
    #[must_use]
    pub fn with_policy(mut self, policy: RedactionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn config(&self) -> &RedshiftConfig {
        &self.config
    }

    /// The full statement for an unload into `prefix`.
    ///
    /// # Errors
    /// [`EtlError::Config`] without credentials.
    pub fn unload_statement(&self, prefix: &str) -> Result<String> {
        let credentials = self.config.credential_string()?;
        Ok(render_unload(
            &self.sql,
            self.source.bucket(),
            prefix,
            &credentials,
        ))
    }

    /// Resolve the prefix and run the unload; returns the prefix.
    ///
    /// # Errors
    /// [`EtlError::Config`] or [`EtlError::Warehouse`].
    pub fn execute_unload(&self, args: &TemplateArgs) -> Result<String> {
        let prefix = self.source.resolve_prefix(args)?;
        let credentials = self.config.credential_string()?;
        let shown = self
            .policy
            .render("credentials", &credentials)
            .unwrap_or_default();
        info!(
            bucket = self.source.bucket(),
            prefix = %prefix,
            "unloading\n{}",
            render_unload(&self.sql, self.source.bucket(), &prefix, &shown)
        );

        let statement = render_unload(&self.sql, self.source.bucket(), &prefix, &credentials);
        self.warehouse
            .execute(&statement)
            .map_err(EtlError::Warehouse)?;
        Ok(prefix)
    }

    /// Unload, then return the produced parts without skip detection.
    ///
    /// # Errors
    /// As for [`execute_unload`](Self::execute_unload) and
    /// [`ObjectSource::fetch`].
    pub fn get(&self, args: &TemplateArgs) -> Result<SourceBatch<'_>> {
        self.open(args, None)
    }
}

impl<W: WarehouseIO, O: ObjectIO> Source for RedshiftUnloadSource<W, O> {
    fn prefix_template(&self) -> &PrefixTemplate {
        self.source.prefix_template()
    }

    fn open<'a>(
        &'a self,
        args: &TemplateArgs,
        skip: Option<&dyn SkipProbe>,
    ) -> Result<SourceBatch<'a>> {
        self.execute_unload(args)?;
        self.source.open(args, skip)
    }
}

//! Error taxonomy for batch runs.
//!
//! Every variant is fatal: nothing in the crate retries, and a run that hits any
//! of these ends in [`RunState::Failed`](crate::runner::RunState::Failed).

use crate::io::cloud::CloudIOError;
use crate::runner::RunState;
use thiserror::Error;

/// Errors raised while selecting, reading, transforming or writing objects.
#[derive(Debug, Error)]
pub enum EtlError {
    /// Unresolvable prefix template, shard size without index, missing credentials.
    #[error("configuration error: {0}")]
    Config(String),

    /// The resolved prefix matched no objects at all, before any filtering.
    #[error("source does not exist: `{prefix}`")]
    SourceEmpty { prefix: String },

    /// A source object body could not be decoded into rows.
    #[error("failed to decode {key}: {reason}")]
    Decode { key: String, reason: String },

    /// A transform result could not be encoded for the destination.
    #[error("failed to encode {key}: {reason}")]
    Encode { key: String, reason: String },

    /// Propagated unchanged from the caller's transform.
    #[error("transform failed: {0:#}")]
    Transform(anyhow::Error),

    #[error("object storage error: {0}")]
    Storage(#[source] CloudIOError),

    #[error("warehouse error: {0}")]
    Warehouse(#[source] CloudIOError),

    /// `run` was called on a batch that is not idle.
    #[error("batch is {0:?}; only an idle batch can run")]
    InvalidState(RunState),
}

impl EtlError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub(crate) fn decode(key: &str, reason: impl ToString) -> Self {
        Self::Decode {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn encode(key: &str, reason: impl ToString) -> Self {
        Self::Encode {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

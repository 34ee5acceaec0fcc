//! Error type shared by the store, aggregator and codec.
//!
//! None of these errors is fatal: every caller can fall back to fresh
//! autotuning or to default parameters.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TuneError {
    /// Non-positive (or non-finite) throughput sample offered to an aggregator.
    #[error("invalid performance sample: {0} (must be finite and > 0)")]
    InvalidSample(f64),
    /// Statistics requested before any sample was recorded.
    #[error("no performance samples recorded yet")]
    EmptyAggregator,
    /// Required key field missing or unparsable.
    #[error("malformed tuning record: {0}")]
    MalformedRecord(String),
    /// The output stream rejected a write.
    #[error("failed to write tuning record: {0}")]
    StreamWrite(#[source] std::io::Error),
    /// Insert attempted for a key that already has a record.
    #[error("duplicate tuning key: {0}")]
    DuplicateKey(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// A kernel slot of a configuration was already bound.
    #[error("kernel slot {0:?} is already bound")]
    KernelAlreadyBound(crate::kernel_types::KernelVariant),
}

pub type TuneResult<T> = Result<T, TuneError>;

impl TuneError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        TuneError::MalformedRecord(msg.into())
    }
}

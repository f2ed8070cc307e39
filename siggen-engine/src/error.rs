//! Error taxonomy for the engine crate.
//!
//! - [`ConfigError`]: a configuration record was rejected; the previous
//!   configuration stays active.
//! - [`SigGenError`]: everything the engine surfaces to its caller, including
//!   sink failures and fatal invariant violations that stop production.

use crate::engine::EngineState;

/// Result alias that carries the crate-wide [`SigGenError`].
pub type Result<T> = std::result::Result<T, SigGenError>;

/// Why a configuration record was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("sample_rate must be > 0 (got {0})")]
    SampleRate(f64),
    #[error("xfer_len must be > 0")]
    XferLen,
    #[error("{field} must be finite (got {value})")]
    NonFinite { field: &'static str, value: f64 },
    #[error("stream_id must not be empty")]
    EmptyStreamId,
    /// Sample or buffer period too long to schedule.
    #[error("sample_rate {sample_rate} with xfer_len {xfer_len} gives a buffer period no clock can represent")]
    Period { sample_rate: f64, xfer_len: usize },
}

/// Common error type for the engine crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SigGenError {
    /// Rejected synchronously by `configure`.
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),
    /// Lifecycle call that does not fit the current state.
    #[error("cannot {op} while engine is {state}")]
    InvalidState { op: &'static str, state: EngineState },
    /// A sink gave up on a buffer or announcement.
    #[error("sink `{sink}` failed: {reason}")]
    Sink { sink: String, reason: String },
    /// Internal invariant violated; production stops and is not retried.
    #[error("fatal engine error: {0}")]
    Fatal(String),
    /// Free-form error for the outer layers (file loading, device setup).
    #[error("{0}")]
    Message(String),
}

impl SigGenError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn sink(sink: impl Into<String>, reason: impl ToString) -> Self {
        Self::Sink { sink: sink.into(), reason: reason.to_string() }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal(reason.into())
    }

    /// True for errors that halt the production loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_) | Self::Sink { .. })
    }
}

impl From<&str> for SigGenError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SigGenError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

use thiserror::Error;

/// Failure converting between instants and snowflake IDs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("invalid timestamp: {0} ms is outside the snowflake range")]
    InvalidTimestamp(i64),
    #[error("invalid snowflake id: {0:?}")]
    InvalidId(String),
}

/// Why a range token could not be turned into a window.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("no {{date}} or {{date - date}} token found")]
    MissingToken,
    #[error("unrecognised date literal: {0:?}")]
    BadDate(String),
    #[error("window start is after its end")]
    Inverted,
}

/// Failures raised while retrieving a window of records.
///
/// Only [`RetrievalError::Exhausted`] ever reaches callers of the
/// orchestrator; the other variants are handled by switching strategy.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("encoding error: {0}")]
    Encoding(#[from] CodecError),
    #[error("remote call failed: {0:#}")]
    Remote(anyhow::Error),
    #[error("no anchor near {0}")]
    AnchorNotFound(String),
    #[error("index unavailable: {0:#}")]
    IndexIo(anyhow::Error),
    #[error("retrieval failed after fallback: {0}")]
    Exhausted(Box<RetrievalError>),
}

impl RetrievalError {
    pub fn remote(err: anyhow::Error) -> Self {
        Self::Remote(err)
    }

    pub fn index_io(err: anyhow::Error) -> Self {
        Self::IndexIo(err)
    }

    pub fn exhausted(cause: RetrievalError) -> Self {
        Self::Exhausted(Box::new(cause))
    }
}

//! Error types for Polygram Core

use thiserror::Error;

use crate::address::ADDRESS_FORMAT;

/// Failures surfaced to callers of the core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid wallet address '{0}'. Expected format: {fmt}", fmt = ADDRESS_FORMAT)]
    InvalidAddress(String),

    #[error("Market data unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("No wallet connected for conversation {0}")]
    WalletNotConnected(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// A single upstream record that could not be normalized.
///
/// These never reach callers: the aggregator logs them and drops the record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },

    #[error("field `{field}` has unexpected value: {value}")]
    Invalid { field: &'static str, value: String },
}

use super::{coercion::CoercionError, tokenizer::RowError};
use crate::file::store::StoreError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    /// A store call failed. Rendered as `<operation> failed: <reason>`.
    #[error("{operation} failed: {reason} (key: {key})")]
    SourceUnavailable {
        operation: &'static str,
        key: String,
        reason: StoreError,
    },

    #[error("Object is empty: {key}")]
    EmptyObject { key: String },

    #[error("Malformed header in {key}: {reason}")]
    MalformedHeader { key: String, reason: String },

    #[error("Malformed row in {key} at byte {offset}: {reason}")]
    MalformedRow {
        key: String,
        offset: u64,
        reason: String,
    },

    #[error("Row in {key} at byte {offset} exceeds the {limit} byte row limit")]
    RowTooLarge { key: String, offset: u64, limit: usize },

    #[error("Invalid value in {key} at byte {offset}: {source}")]
    ValueCoercion {
        key: String,
        offset: u64,
        #[source]
        source: CoercionError,
    },

    #[error("Cannot decode cursor: {0}")]
    CursorDecode(String),

    #[error("Invalid cursor for file source: {0}")]
    InvalidCursor(String),

    #[error("Invalid page request: {0}")]
    InvalidRequest(String),

    #[error("Invalid CSV settings: {0}")]
    InvalidSettings(String),

    #[error("Stream for {key} ended at byte {offset}, before the object end at {size}")]
    Truncated { key: String, offset: u64, size: u64 },

    #[error("Page request for {key} timed out: {detail}")]
    Timeout { key: String, detail: String },
}

impl FileError {
    pub fn source_unavailable(operation: &'static str, key: &str, reason: StoreError) -> Self {
        FileError::SourceUnavailable {
            operation,
            key: key.to_string(),
            reason,
        }
    }

    /// Maps a tokenizer failure for the row starting at `offset`.
    pub fn from_row_error(key: &str, offset: u64, err: RowError) -> Self {
        match err {
            RowError::TooLarge { limit } => FileError::RowTooLarge {
                key: key.to_string(),
                offset,
                limit,
            },
            RowError::UnterminatedQuote => FileError::MalformedRow {
                key: key.to_string(),
                offset,
                reason: RowError::UnterminatedQuote.to_string(),
            },
            RowError::Io(io) => FileError::from_stream_error(key, io),
        }
    }

    /// A read from an already opened stream failed.
    pub fn from_stream_error(key: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut {
            return FileError::Timeout {
                key: key.to_string(),
                detail: err.to_string(),
            };
        }
        FileError::source_unavailable("read", key, StoreError::from_io(key, &err))
    }

    pub fn deadline_elapsed(key: &str, after: Duration) -> Self {
        FileError::Timeout {
            key: key.to_string(),
            detail: format!("deadline of {after:?} elapsed"),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FileError::Timeout { .. })
    }

    /// Errors caused by the caller's input rather than the data or the store.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FileError::CursorDecode(_)
                | FileError::InvalidCursor(_)
                | FileError::InvalidRequest(_)
                | FileError::InvalidSettings(_)
        )
    }

    /// Errors caused by the object's contents.
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            FileError::MalformedHeader { .. }
                | FileError::MalformedRow { .. }
                | FileError::RowTooLarge { .. }
                | FileError::ValueCoercion { .. }
        )
    }
}

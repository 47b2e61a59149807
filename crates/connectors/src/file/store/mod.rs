//! Object-store contract consumed by the CSV pager.
//!
//! The pager only needs two things from a store: the size of an object and a
//! byte stream over an inclusive range of it. Anything that can answer those
//! (S3, GCS, a local directory, memory) plugs in through [`ByteSource`].

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tokio::io::AsyncRead;

pub mod local;
pub mod memory;

pub use local::LocalFileSource;
pub use memory::MemorySource;

/// Stream of object bytes returned by [`ByteSource::open_range`].
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// Inclusive byte range. `end: None` reads to the end of the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    pub fn new(start: u64, end: Option<u64>) -> Self {
        ByteRange { start, end }
    }

    pub fn starting_at(start: u64) -> Self {
        ByteRange { start, end: None }
    }

    /// Clamp to an object of `size` bytes. Returns `None` when the range
    /// starts at or past the end of the object.
    pub fn clamp(&self, size: u64) -> Option<(u64, u64)> {
        if self.start >= size {
            return None;
        }
        let last = size - 1;
        let end = self.end.map_or(last, |e| e.min(last));
        if end < self.start {
            return None;
        }
        Some((self.start, end))
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "bytes={}-{}", self.start, end),
            None => write!(f, "bytes={}-", self.start),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    NotFound,
    PermissionDenied,
    Redirected,
    RangeNotSatisfiable,
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            StoreErrorKind::NotFound => "object not found",
            StoreErrorKind::PermissionDenied => "permission denied",
            StoreErrorKind::Redirected => "redirected",
            StoreErrorKind::RangeNotSatisfiable => "range not satisfiable",
            StoreErrorKind::Other => "store error",
        };
        f.write_str(reason)
    }
}

/// Classified failure reported by a [`ByteSource`].
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        StoreError {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(key: &str) -> Self {
        StoreError::new(StoreErrorKind::NotFound, key)
    }

    pub fn range_not_satisfiable(key: &str, range: ByteRange, size: u64) -> Self {
        StoreError::new(
            StoreErrorKind::RangeNotSatisfiable,
            format!("{range} of {key} ({size} bytes)"),
        )
    }

    /// Classifies a local I/O failure.
    pub fn from_io(key: &str, err: &std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StoreErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => StoreErrorKind::PermissionDenied,
            _ => StoreErrorKind::Other,
        };
        StoreError::new(kind, format!("{key}: {err}"))
    }
}

#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Size in bytes of the object stored under `key`.
    async fn exists(&self, key: &str) -> Result<u64, StoreError>;

    /// Opens a stream over `range` of the object stored under `key`.
    async fn open_range(&self, key: &str, range: ByteRange) -> Result<ByteStream, StoreError>;
}

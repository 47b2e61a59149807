use super::{ByteRange, ByteSource, ByteStream, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};
use tokio_util::io::StreamReader;
use tracing::warn;

const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// In-memory object store. Range reads are served as a stream of fixed-size
/// chunks, the way a network body arrives.
#[derive(Debug, Clone)]
pub struct MemorySource {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
    chunk_size: usize,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource {
    pub fn new() -> Self {
        MemorySource {
            objects: Arc::new(RwLock::new(HashMap::new())),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Stores or replaces an object. A poisoned lock is recovered, never skipped.
    pub fn insert(&self, key: impl Into<String>, data: impl Into<Bytes>) {
        let mut objects = self.objects.write().unwrap_or_else(|poisoned| {
            warn!("Object map lock was poisoned, recovering");
            PoisonError::into_inner(poisoned)
        });
        objects.insert(key.into(), data.into());
    }

    fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        let objects = self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(key))
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    async fn exists(&self, key: &str) -> Result<u64, StoreError> {
        Ok(self.get(key)?.len() as u64)
    }

    async fn open_range(&self, key: &str, range: ByteRange) -> Result<ByteStream, StoreError> {
        let data = self.get(key)?;
        let size = data.len() as u64;
        let (start, end) = range
            .clamp(size)
            .ok_or_else(|| StoreError::range_not_satisfiable(key, range, size))?;

        let slice = data.slice(start as usize..=end as usize);
        let chunks = (0..slice.len())
            .step_by(self.chunk_size)
            .map(|at| {
                let to = (at + self.chunk_size).min(slice.len());
                Ok::<_, std::io::Error>(slice.slice(at..to))
            })
            .collect::<Vec<_>>();

        Ok(Box::new(StreamReader::new(futures_util::stream::iter(
            chunks,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::store::StoreErrorKind;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn serves_ranges_in_chunks() {
        let source = MemorySource::new().with_chunk_size(2);
        source.insert("k", &b"abcdefg"[..]);

        assert_eq!(source.exists("k").await.unwrap(), 7);

        let mut stream = source
            .open_range("k", ByteRange::new(1, Some(5)))
            .await
            .unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"bcdef");
    }

    #[tokio::test]
    async fn poisoned_lock_does_not_drop_inserts() {
        let source = MemorySource::new();
        let objects = Arc::clone(&source.objects);
        let _ = std::thread::spawn(move || {
            let _guard = objects.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(source.objects.is_poisoned());

        source.insert("k", &b"abc"[..]);
        assert_eq!(source.exists("k").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn unknown_keys_are_not_found() {
        let source = MemorySource::new();
        let err = source.exists("missing").await.unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::NotFound);
    }
}

use super::{ByteRange, ByteSource, ByteStream, StoreError, StoreErrorKind};
use async_trait::async_trait;
use std::{
    io::SeekFrom,
    path::{Component, Path, PathBuf},
};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Serves objects from a directory on disk. Keys are paths relative to `root`.
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    root: PathBuf,
}

impl LocalFileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalFileSource { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let rel = Path::new(key.trim_start_matches('/'));
        // Keys must stay under the root
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StoreError::new(
                StoreErrorKind::PermissionDenied,
                format!("key escapes store root: {key}"),
            ));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl ByteSource for LocalFileSource {
    async fn exists(&self, key: &str) -> Result<u64, StoreError> {
        let path = self.resolve(key)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| StoreError::from_io(key, &e))?;
        if !meta.is_file() {
            return Err(StoreError::not_found(key));
        }
        Ok(meta.len())
    }

    async fn open_range(&self, key: &str, range: ByteRange) -> Result<ByteStream, StoreError> {
        let path = self.resolve(key)?;
        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| StoreError::from_io(key, &e))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| StoreError::from_io(key, &e))?
            .len();

        let (start, end) = range
            .clamp(size)
            .ok_or_else(|| StoreError::range_not_satisfiable(key, range, size))?;

        file.seek(SeekFrom::Start(start))
            .await
            .map_err(|e| StoreError::from_io(key, &e))?;

        Ok(Box::new(file.take(end - start + 1)))
    }
}

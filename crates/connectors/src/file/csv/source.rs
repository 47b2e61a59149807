use crate::file::{
    csv::{
        bom::MAX_BOM_LEN,
        cursor,
        error::FileError,
        header::{HeaderInfo, resolve_headers},
        page::PageAccumulator,
        reader::CountingReader,
        settings::CsvSettings,
        tokenizer::RowTokenizer,
    },
    store::{ByteRange, ByteSource},
};
use async_trait::async_trait;
use model::{
    core::data_type::AttributeTypeMap,
    pagination::{cursor::Cursor, page::FetchResult},
    records::row::RowData,
};
use std::{sync::Arc, time::Instant};
use tracing::{debug, warn};

/// One page request against a CSV object.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub key: String,
    pub page_size: usize,
    pub types: AttributeTypeMap,
    /// Token from the previous page, empty for the first page.
    pub cursor: String,
}

impl PageRequest {
    pub fn new(key: impl Into<String>, page_size: usize) -> Self {
        PageRequest {
            key: key.into(),
            page_size,
            types: AttributeTypeMap::new(),
            cursor: String::new(),
        }
    }

    pub fn with_types(mut self, types: AttributeTypeMap) -> Self {
        self.types = types;
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = cursor.into();
        self
    }
}

#[async_trait]
pub trait FileDataSource: Send + Sync {
    type Error;

    async fn fetch(&self, request: &PageRequest) -> Result<FetchResult, Self::Error>;
}

/// Pages through CSV objects held in a [`ByteSource`].
///
/// Holds no per-sync state: everything needed to resume travels in the cursor,
/// so one instance can serve any number of concurrent syncs.
pub struct CsvDataSource<S> {
    store: Arc<S>,
    settings: CsvSettings,
}

impl<S> Clone for CsvDataSource<S> {
    fn clone(&self) -> Self {
        CsvDataSource {
            store: Arc::clone(&self.store),
            settings: self.settings.clone(),
        }
    }
}

impl<S: ByteSource> CsvDataSource<S> {
    pub fn new(store: Arc<S>, settings: CsvSettings) -> Result<Self, FileError> {
        settings.validate()?;
        Ok(CsvDataSource { store, settings })
    }

    fn tokenizer(&self) -> RowTokenizer {
        RowTokenizer::new(self.settings.max_row_bytes)
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<FetchResult, FileError> {
        let started = Instant::now();
        let key = request.key.as_str();

        if request.page_size == 0 {
            return Err(FileError::InvalidRequest(
                "page size must be greater than zero".into(),
            ));
        }

        let cursor = cursor::decode(&request.cursor)?;
        debug!(
            key,
            page_size = request.page_size,
            has_cursor = cursor.is_some(),
            "Fetching CSV page"
        );

        let size = self
            .store
            .exists(key)
            .await
            .map_err(|e| FileError::source_unavailable("exists", key, e))?;
        if size == 0 {
            return Err(FileError::EmptyObject {
                key: key.to_string(),
            });
        }

        let (headers, start) = match cursor {
            Some(Cursor {
                byte_offset: Some(offset),
                headers: Some(headers),
            }) => (headers, offset),
            Some(Cursor {
                byte_offset: Some(offset),
                headers: None,
            }) => {
                warn!(key, offset, "Cursor carries no headers, re-reading header row");
                (self.read_headers(key, size).await?.headers, offset)
            }
            _ => {
                let info = self.read_headers(key, size).await?;
                let start = info.first_data_offset;
                (info.headers, start)
            }
        };

        if start > size {
            return Err(FileError::InvalidCursor(format!(
                "offset {start} is past the end of {key} ({size} bytes)"
            )));
        }
        if start == size {
            return Self::result(Vec::new(), None, started);
        }

        // Wide enough for every row that starts inside the budget, plus the peek byte
        let window = self
            .settings
            .max_bytes_per_page()
            .saturating_add(self.settings.max_row_bytes as u64);
        let end = start.saturating_add(window).min(size - 1);
        let stream = self
            .store
            .open_range(key, ByteRange::new(start, Some(end)))
            .await
            .map_err(|e| FileError::source_unavailable("open range", key, e))?;
        let mut reader = CountingReader::new(stream);

        let accumulator = PageAccumulator {
            key,
            headers: &headers,
            types: &request.types,
            tokenizer: self.tokenizer(),
            delimiter: self.settings.delimiter_byte(),
            page_size: request.page_size,
            max_bytes_per_page: self.settings.max_bytes_per_page(),
        };
        let page = accumulator.accumulate(&mut reader, start).await?;

        let next_offset = start + page.bytes_consumed;
        if !page.has_next && next_offset < size {
            return Err(FileError::Truncated {
                key: key.to_string(),
                offset: next_offset,
                size,
            });
        }

        debug!(
            key,
            start,
            next_offset,
            rows = page.records.len(),
            has_next = page.has_next,
            "CSV page decoded"
        );

        let next = page.has_next.then(|| Cursor::new(next_offset, headers));
        Self::result(page.records, next, started)
    }

    async fn read_headers(&self, key: &str, size: u64) -> Result<HeaderInfo, FileError> {
        let end = (self.settings.max_row_bytes as u64).saturating_add(MAX_BOM_LEN as u64);
        let stream = self
            .store
            .open_range(key, ByteRange::new(0, Some(end.min(size - 1))))
            .await
            .map_err(|e| FileError::source_unavailable("open header range", key, e))?;
        let mut reader = CountingReader::new(stream);

        let info = resolve_headers(
            key,
            &mut reader,
            &self.tokenizer(),
            self.settings.delimiter_byte(),
        )
        .await?;
        debug!(
            key,
            columns = info.headers.len(),
            bom_len = info.bom_len,
            first_data_offset = info.first_data_offset,
            "Resolved CSV headers"
        );
        Ok(info)
    }

    fn result(
        rows: Vec<RowData>,
        next: Option<Cursor>,
        started: Instant,
    ) -> Result<FetchResult, FileError> {
        let next_cursor = cursor::encode(next.as_ref())?;
        Ok(FetchResult {
            row_count: rows.len(),
            reached_end: next.is_none(),
            rows,
            next_cursor,
            took_ms: started.elapsed().as_millis(),
        })
    }
}

#[async_trait]
impl<S: ByteSource> FileDataSource for CsvDataSource<S> {
    type Error = FileError;

    /// Fetches one page. The whole request, store calls included, runs under
    /// the configured deadline; nothing is returned for a partial page.
    async fn fetch(&self, request: &PageRequest) -> Result<FetchResult, FileError> {
        let deadline = self.settings.request_timeout();
        match tokio::time::timeout(deadline, self.fetch_page(request)).await {
            Ok(result) => result,
            Err(_) => Err(FileError::deadline_elapsed(&request.key, deadline)),
        }
    }
}

use super::{
    coercion::coerce_value,
    error::FileError,
    reader::CountingReader,
    tokenizer::{ReadOutcome, RowTokenizer, split_fields},
};
use model::{
    core::{
        data_type::AttributeTypeMap,
        value::{FieldValue, Value},
    },
    pagination::page::PageResult,
    records::row::RowData,
};
use tokio::io::AsyncRead;
use tracing::trace;

/// Builds one page of typed records from a stream positioned at a row boundary.
pub struct PageAccumulator<'a> {
    pub key: &'a str,
    pub headers: &'a [String],
    pub types: &'a AttributeTypeMap,
    pub tokenizer: RowTokenizer,
    pub delimiter: u8,
    pub page_size: usize,
    pub max_bytes_per_page: u64,
}

impl PageAccumulator<'_> {
    /// Reads rows until the page is full, the byte budget would be exceeded, or
    /// the stream ends. `start_offset` is the absolute offset of the stream's
    /// first byte and is only used to report error positions.
    ///
    /// A row that would push the page over its byte budget is read but not
    /// committed: `bytes_consumed` stops at its first byte, so it opens the next
    /// page instead of being lost.
    pub async fn accumulate<R: AsyncRead + Unpin>(
        &self,
        reader: &mut CountingReader<R>,
        start_offset: u64,
    ) -> Result<PageResult, FileError> {
        let mut records = Vec::with_capacity(self.page_size.min(1024));
        let mut committed = 0u64;

        let has_next = loop {
            if records.len() >= self.page_size {
                // Full page: only advertise a next page if bytes remain
                let more = reader
                    .peek_byte()
                    .await
                    .map_err(|e| FileError::from_stream_error(self.key, e))?;
                break more.is_some();
            }

            let row_offset = start_offset + committed;
            let row = match self.tokenizer.read_row(reader).await {
                Ok(ReadOutcome::Row(row)) => row,
                Ok(ReadOutcome::EndOfStream) => break false,
                Err(e) => return Err(FileError::from_row_error(self.key, row_offset, e)),
            };

            if committed.saturating_add(row.consumed) > self.max_bytes_per_page {
                trace!(
                    key = self.key,
                    offset = row_offset,
                    committed,
                    "Byte budget reached, deferring row to next page"
                );
                break true;
            }
            committed += row.consumed;

            if row.is_blank() {
                continue;
            }

            let cells =
                split_fields(&row.bytes, self.delimiter).map_err(|e| FileError::MalformedRow {
                    key: self.key.to_string(),
                    offset: row_offset,
                    reason: e.to_string(),
                })?;
            records.push(self.build_record(cells, row_offset)?);
        };

        Ok(PageResult {
            records,
            bytes_consumed: committed,
            has_next,
        })
    }

    fn build_record(&self, cells: Vec<String>, offset: u64) -> Result<RowData, FileError> {
        if cells.len() > self.headers.len() {
            return Err(FileError::MalformedRow {
                key: self.key.to_string(),
                offset,
                reason: format!(
                    "row has {} fields but the header has {}",
                    cells.len(),
                    self.headers.len()
                ),
            });
        }

        let mut cells = cells.into_iter();
        let mut fields = Vec::with_capacity(self.headers.len());
        for header in self.headers {
            let value = match cells.next() {
                Some(raw) => coerce_value(header, &raw, self.types.get(header).copied()).map_err(
                    |source| FileError::ValueCoercion {
                        key: self.key.to_string(),
                        offset,
                        source,
                    },
                )?,
                None => Value::Null,
            };
            fields.push(FieldValue::new(header.clone(), value));
        }

        Ok(RowData::new(self.key, fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::data_type::AttributeType;

    fn headers() -> Vec<String> {
        vec!["id".into(), "name".into()]
    }

    async fn run(
        data: &'static [u8],
        page_size: usize,
        budget: u64,
        types: &AttributeTypeMap,
    ) -> Result<PageResult, FileError> {
        let headers = headers();
        let acc = PageAccumulator {
            key: "t.csv",
            headers: &headers,
            types,
            tokenizer: RowTokenizer::new(64),
            delimiter: b',',
            page_size,
            max_bytes_per_page: budget,
        };
        let mut reader = CountingReader::new(data);
        acc.accumulate(&mut reader, 100).await
    }

    #[tokio::test]
    async fn stops_at_page_size_and_peeks_for_more() {
        let types = AttributeTypeMap::new();
        let page = run(b"1,a\n2,b\n3,c\n", 2, 1024, &types).await.unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.bytes_consumed, 8);
        assert!(page.has_next);

        let page = run(b"1,a\n2,b\n", 2, 1024, &types).await.unwrap();
        assert_eq!(page.records.len(), 2);
        assert!(!page.has_next, "exactly full page at EOF is final");
    }

    #[tokio::test]
    async fn budget_defers_the_overflowing_row() {
        let types = AttributeTypeMap::new();
        // Rows are 4, 4 and 6 bytes long
        let page = run(b"1,a\n2,b\n3,ccc\n", 10, 10, &types).await.unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.bytes_consumed, 8);
        assert!(page.has_next);

        let page = run(b"1,a\n2,b\n3,ccc\n", 10, 14, &types).await.unwrap();
        assert_eq!(page.records.len(), 3);
        assert_eq!(page.bytes_consumed, 14);
        assert!(!page.has_next);
    }

    #[tokio::test]
    async fn blank_rows_use_budget_but_not_page_slots() {
        let types = AttributeTypeMap::new();
        let page = run(b"\n1,a\n\n\n2,b\n", 2, 1024, &types).await.unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.bytes_consumed, 11);
        assert!(!page.has_next);
    }

    #[tokio::test]
    async fn short_rows_pad_with_null_and_long_rows_fail() {
        let types = AttributeTypeMap::new();
        let page = run(b"1\n", 5, 1024, &types).await.unwrap();
        assert_eq!(page.records[0].get_value("name"), Value::Null);

        let err = run(b"1,a\n2,b,extra\n", 5, 1024, &types).await.unwrap_err();
        assert!(matches!(err, FileError::MalformedRow { offset: 104, .. }));
    }

    #[tokio::test]
    async fn coercion_failure_aborts_the_page() {
        let mut types = AttributeTypeMap::new();
        types.insert("id".into(), AttributeType::Double);
        types.insert("not_in_header".into(), AttributeType::Bool);

        let page = run(b"1.5,a\n", 5, 1024, &types).await.unwrap();
        assert_eq!(page.records[0].get_value("id"), Value::Double(1.5));

        let err = run(b"1,a\nx,b\n", 5, 1024, &types).await.unwrap_err();
        match err {
            FileError::ValueCoercion { offset, source, .. } => {
                assert_eq!(offset, 104);
                assert_eq!(source.column, "id");
                assert_eq!(source.value, "x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn oversized_rows_report_their_offset() {
        let types = AttributeTypeMap::new();
        let mut bytes = b"1,a\n".to_vec();
        bytes.extend(std::iter::repeat_n(b'x', 80));
        bytes.push(b'\n');
        let data: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        let err = run(data, 5, 1024, &types).await.unwrap_err();
        assert!(matches!(
            err,
            FileError::RowTooLarge {
                offset: 104,
                limit: 64,
                ..
            }
        ));
    }
}

use super::{
    bom::strip_bom,
    error::FileError,
    reader::CountingReader,
    tokenizer::{ReadOutcome, RowError, RowTokenizer, split_fields},
};
use tokio::io::AsyncRead;

/// Column names and where the data rows begin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInfo {
    pub headers: Vec<String>,
    pub bom_len: usize,
    /// Byte offset of the first data row: BOM plus the header row and its terminator.
    pub first_data_offset: u64,
}

/// Reads the header row from a stream positioned at the start of the object.
pub async fn resolve_headers<R: AsyncRead + Unpin>(
    key: &str,
    reader: &mut CountingReader<R>,
    tokenizer: &RowTokenizer,
    delimiter: u8,
) -> Result<HeaderInfo, FileError> {
    let bom_len = strip_bom(reader)
        .await
        .map_err(|e| FileError::from_stream_error(key, e))?;

    let row = match tokenizer.read_row(reader).await {
        Ok(ReadOutcome::Row(row)) => row,
        Ok(ReadOutcome::EndOfStream) => {
            return Err(FileError::EmptyObject {
                key: key.to_string(),
            });
        }
        Err(RowError::Io(e)) => return Err(FileError::from_stream_error(key, e)),
        Err(e) => {
            return Err(FileError::MalformedHeader {
                key: key.to_string(),
                reason: e.to_string(),
            });
        }
    };

    let headers = split_fields(&row.bytes, delimiter).map_err(|e| FileError::MalformedHeader {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    if headers.is_empty() {
        return Err(FileError::MalformedHeader {
            key: key.to_string(),
            reason: "header row has no columns".into(),
        });
    }

    Ok(HeaderInfo {
        headers,
        bom_len,
        first_data_offset: bom_len as u64 + row.consumed,
    })
}

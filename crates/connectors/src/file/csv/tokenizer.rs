//! Quote-aware splitting of a byte stream into logical CSV rows.
//!
//! The tokenizer never interprets field contents. It only decides where a row
//! ends, so that the exact number of bytes each row occupies in the object is
//! known and a later page can resume at a row boundary. Field splitting and
//! unescaping of a finished row is left to the `csv` crate.

use super::reader::CountingReader;
use std::io;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Scanner state between two bytes of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteState {
    Normal,
    InQuotes,
    /// Saw a `"` while quoted: either the first half of an escaped `""` or the
    /// closing quote, decided by the next byte.
    AfterQuoteInQuotes,
}

/// What a single byte means for the row being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Data,
    LineFeed,
    CarriageReturn,
}

impl QuoteState {
    pub fn advance(self, byte: u8) -> (QuoteState, Transition) {
        match (self, byte) {
            (QuoteState::Normal, b'"') => (QuoteState::InQuotes, Transition::Data),
            (QuoteState::Normal, b'\n') => (QuoteState::Normal, Transition::LineFeed),
            (QuoteState::Normal, b'\r') => (QuoteState::Normal, Transition::CarriageReturn),
            (QuoteState::Normal, _) => (QuoteState::Normal, Transition::Data),
            (QuoteState::InQuotes, b'"') => (QuoteState::AfterQuoteInQuotes, Transition::Data),
            (QuoteState::InQuotes, _) => (QuoteState::InQuotes, Transition::Data),
            (QuoteState::AfterQuoteInQuotes, b'"') => (QuoteState::InQuotes, Transition::Data),
            (QuoteState::AfterQuoteInQuotes, other) => QuoteState::Normal.advance(other),
        }
    }
}

/// Raw bytes of one logical row. `bytes` excludes the terminator,
/// `consumed` includes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub bytes: Vec<u8>,
    pub consumed: u64,
}

impl RawRow {
    pub fn is_blank(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Row(RawRow),
    /// The stream ended before any byte of a new row.
    EndOfStream,
}

#[derive(Debug, Error)]
pub enum RowError {
    #[error("row exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("quoted field is not terminated before end of data")]
    UnterminatedQuote,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct RowTokenizer {
    max_row_bytes: usize,
}

impl RowTokenizer {
    pub fn new(max_row_bytes: usize) -> Self {
        RowTokenizer { max_row_bytes }
    }

    /// Reads the next logical row. A row longer than the limit, terminator
    /// included, is an error; nothing partial is returned.
    pub async fn read_row<R: AsyncRead + Unpin>(
        &self,
        reader: &mut CountingReader<R>,
    ) -> Result<ReadOutcome, RowError> {
        let mut bytes = Vec::new();
        let mut consumed = 0u64;
        let mut state = QuoteState::Normal;

        loop {
            let Some(byte) = reader.next_byte().await? else {
                if consumed == 0 {
                    return Ok(ReadOutcome::EndOfStream);
                }
                if state == QuoteState::InQuotes {
                    return Err(RowError::UnterminatedQuote);
                }
                return Ok(ReadOutcome::Row(RawRow { bytes, consumed }));
            };
            consumed += 1;
            self.check_len(consumed)?;

            let (next, transition) = state.advance(byte);
            state = next;
            match transition {
                Transition::Data => bytes.push(byte),
                Transition::LineFeed => return Ok(ReadOutcome::Row(RawRow { bytes, consumed })),
                Transition::CarriageReturn => {
                    // CRLF counts as a single terminator
                    if reader.peek_byte().await? == Some(b'\n') {
                        reader.next_byte().await?;
                        consumed += 1;
                        self.check_len(consumed)?;
                    }
                    return Ok(ReadOutcome::Row(RawRow { bytes, consumed }));
                }
            }
        }
    }

    fn check_len(&self, consumed: u64) -> Result<(), RowError> {
        if consumed > self.max_row_bytes as u64 {
            return Err(RowError::TooLarge {
                limit: self.max_row_bytes,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum FieldError {
    #[error(transparent)]
    Csv(#[from] ::csv::Error),

    /// The field parser saw a record boundary inside what the row scanner
    /// treated as one row, e.g. a bare `"` in the middle of an unquoted field.
    #[error("stray quote: row splits into several records after byte {at}")]
    StrayQuote { at: u64 },
}

/// Splits a raw row into unescaped fields. The whole row must parse as exactly
/// one record; anything left over is an error rather than silently dropped.
pub fn split_fields(raw: &[u8], delimiter: u8) -> Result<Vec<String>, FieldError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(raw);

    let mut record = ::csv::StringRecord::new();
    reader.read_record(&mut record)?;
    let at = reader.position().byte();

    let mut rest = ::csv::StringRecord::new();
    if reader.read_record(&mut rest)? {
        return Err(FieldError::StrayQuote { at });
    }
    Ok(record.iter().map(String::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn rows(data: &'static [u8], limit: usize) -> Result<Vec<RawRow>, RowError> {
        let tokenizer = RowTokenizer::new(limit);
        let mut reader = CountingReader::new(data);
        let mut out = Vec::new();
        while let ReadOutcome::Row(row) = tokenizer.read_row(&mut reader).await? {
            out.push(row);
        }
        Ok(out)
    }

    #[test]
    fn normal_state_transitions() {
        assert_eq!(
            QuoteState::Normal.advance(b'a'),
            (QuoteState::Normal, Transition::Data)
        );
        assert_eq!(
            QuoteState::Normal.advance(b'"'),
            (QuoteState::InQuotes, Transition::Data)
        );
        assert_eq!(
            QuoteState::Normal.advance(b'\n'),
            (QuoteState::Normal, Transition::LineFeed)
        );
        assert_eq!(
            QuoteState::Normal.advance(b'\r'),
            (QuoteState::Normal, Transition::CarriageReturn)
        );
    }

    #[test]
    fn quoted_newlines_are_data() {
        assert_eq!(
            QuoteState::InQuotes.advance(b'\n'),
            (QuoteState::InQuotes, Transition::Data)
        );
        assert_eq!(
            QuoteState::InQuotes.advance(b'\r'),
            (QuoteState::InQuotes, Transition::Data)
        );
        assert_eq!(
            QuoteState::InQuotes.advance(b','),
            (QuoteState::InQuotes, Transition::Data)
        );
    }

    #[test]
    fn quote_after_quote_is_an_escape() {
        assert_eq!(
            QuoteState::InQuotes.advance(b'"'),
            (QuoteState::AfterQuoteInQuotes, Transition::Data)
        );
        assert_eq!(
            QuoteState::AfterQuoteInQuotes.advance(b'"'),
            (QuoteState::InQuotes, Transition::Data)
        );
        assert_eq!(
            QuoteState::AfterQuoteInQuotes.advance(b','),
            (QuoteState::Normal, Transition::Data)
        );
        assert_eq!(
            QuoteState::AfterQuoteInQuotes.advance(b'\n'),
            (QuoteState::Normal, Transition::LineFeed)
        );
    }

    #[tokio::test]
    async fn quoted_comma_and_newline_stay_in_one_row() {
        let rows = rows(b"\"a,b\nc\",x\nnext\n", 1024).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].bytes, b"\"a,b\nc\",x");
        assert_eq!(rows[0].consumed, 10);

        let fields = split_fields(&rows[0].bytes, b',').unwrap();
        assert_eq!(fields, vec!["a,b\nc".to_string(), "x".to_string()]);
    }

    #[tokio::test]
    async fn crlf_and_lone_cr_terminate_rows() {
        let rows = rows(b"a,b\r\nc,d\re,f", 1024).await.unwrap();
        let bytes: Vec<_> = rows.iter().map(|r| r.bytes.as_slice()).collect();
        assert_eq!(bytes, vec![&b"a,b"[..], b"c,d", b"e,f"]);
        let consumed: Vec<_> = rows.iter().map(|r| r.consumed).collect();
        assert_eq!(consumed, vec![5, 4, 3]);
    }

    #[tokio::test]
    async fn escaped_quotes_do_not_close_the_field() {
        let rows = rows(b"\"say \"\"hi\"\"\",1\n", 1024).await.unwrap();
        assert_eq!(rows.len(), 1);
        let fields = split_fields(&rows[0].bytes, b',').unwrap();
        assert_eq!(fields, vec!["say \"hi\"".to_string(), "1".to_string()]);
    }

    #[tokio::test]
    async fn blank_lines_are_zero_length_rows() {
        let rows = rows(b"\n\r\nx\n", 1024).await.unwrap();
        assert!(rows[0].is_blank());
        assert!(rows[1].is_blank());
        assert_eq!(rows[1].consumed, 2);
        assert_eq!(rows[2].bytes, b"x");
    }

    #[tokio::test]
    async fn empty_stream_is_end_of_stream() {
        let tokenizer = RowTokenizer::new(16);
        let data: &[u8] = b"";
        let mut reader = CountingReader::new(data);
        assert_eq!(
            tokenizer.read_row(&mut reader).await.unwrap(),
            ReadOutcome::EndOfStream
        );
    }

    #[tokio::test]
    async fn oversized_rows_fail_instead_of_truncating() {
        // 5 data bytes + LF = 6 bytes
        assert!(rows(b"abcde\n", 6).await.is_ok());
        assert!(matches!(
            rows(b"abcde\n", 5).await,
            Err(RowError::TooLarge { limit: 5 })
        ));
        assert!(matches!(
            rows(b"\"ab\ncd\"\n", 4).await,
            Err(RowError::TooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn bare_quote_inside_a_field_is_rejected_not_truncated() {
        // The scanner joins both lines through the quotes; the field parser
        // reads them literally and would stop at the line feed
        let rows = rows(b"ab\"c,1\nd\"e,2\n3,x\n", 1024).await.unwrap();
        assert_eq!(rows[0].bytes, b"ab\"c,1\nd\"e,2");
        assert!(matches!(
            split_fields(&rows[0].bytes, b','),
            Err(FieldError::StrayQuote { .. })
        ));
        assert_eq!(
            split_fields(&rows[1].bytes, b',').unwrap(),
            vec!["3".to_string(), "x".to_string()]
        );
    }

    #[tokio::test]
    async fn unterminated_quote_at_eof_is_an_error() {
        assert!(matches!(
            rows(b"a,\"open\n", 1024).await,
            Err(RowError::UnterminatedQuote)
        ));
        // A closing quote right before EOF is fine
        let rows = rows(b"a,\"closed\"", 1024).await.unwrap();
        assert_eq!(rows[0].consumed, 10);
    }
}

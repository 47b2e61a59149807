use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

const BUFFER_SIZE: usize = 64 * 1024;

/// Buffered reader that counts every byte handed to the caller.
///
/// `consumed()` only moves forward on [`next_byte`](Self::next_byte) and
/// [`discard`](Self::discard); peeking never advances it. The buffer is owned
/// here rather than by a `BufReader` so peeks of a few bytes work across
/// chunk boundaries of the underlying stream.
pub struct CountingReader<R> {
    inner: R,
    buf: Box<[u8]>,
    pos: usize,
    filled: usize,
    consumed: u64,
    eof: bool,
}

impl<R: AsyncRead + Unpin> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_capacity(BUFFER_SIZE, inner)
    }

    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        CountingReader {
            inner,
            buf: vec![0; capacity.max(8)].into_boxed_slice(),
            pos: 0,
            filled: 0,
            consumed: 0,
            eof: false,
        }
    }

    /// Bytes consumed since the reader was created.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Reads and consumes one byte. `None` at end of stream.
    pub async fn next_byte(&mut self) -> io::Result<Option<u8>> {
        self.fill_to(1).await?;
        if self.available() == 0 {
            return Ok(None);
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        self.consumed += 1;
        Ok(Some(byte))
    }

    /// Looks at the next byte without consuming it.
    pub async fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        self.fill_to(1).await?;
        Ok(self.buf[self.pos..self.filled].first().copied())
    }

    /// Looks at up to `n` upcoming bytes. Fewer are returned only at end of stream.
    pub async fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        let n = n.min(self.buf.len());
        self.fill_to(n).await?;
        let end = self.filled.min(self.pos + n);
        Ok(&self.buf[self.pos..end])
    }

    /// Consumes up to `n` bytes, returning how many were actually skipped.
    pub async fn discard(&mut self, n: usize) -> io::Result<usize> {
        let mut skipped = 0;
        while skipped < n {
            self.fill_to(1).await?;
            let take = self.available().min(n - skipped);
            if take == 0 {
                break;
            }
            self.pos += take;
            self.consumed += take as u64;
            skipped += take;
        }
        Ok(skipped)
    }

    fn available(&self) -> usize {
        self.filled - self.pos
    }

    async fn fill_to(&mut self, want: usize) -> io::Result<()> {
        while self.available() < want && !self.eof {
            if self.filled == self.buf.len() {
                self.buf.copy_within(self.pos..self.filled, 0);
                self.filled -= self.pos;
                self.pos = 0;
            }
            let n = self.inner.read(&mut self.buf[self.filled..]).await?;
            if n == 0 {
                self.eof = true;
            } else {
                self.filled += n;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio_util::io::StreamReader;

    fn chunked(data: &'static [u8], chunk: usize) -> impl AsyncRead + Unpin {
        let chunks = data
            .chunks(chunk)
            .map(|c| Ok::<_, io::Error>(Bytes::from_static(c)))
            .collect::<Vec<_>>();
        StreamReader::new(futures_util::stream::iter(chunks))
    }

    #[tokio::test]
    async fn peek_spans_chunk_boundaries() {
        let mut reader = CountingReader::new(chunked(b"\xEF\xBB\xBFabc", 1));
        assert_eq!(reader.peek(4).await.unwrap(), b"\xEF\xBB\xBFa");
        assert_eq!(reader.consumed(), 0);
        assert_eq!(reader.discard(3).await.unwrap(), 3);
        assert_eq!(reader.consumed(), 3);
        assert_eq!(reader.next_byte().await.unwrap(), Some(b'a'));
    }

    #[tokio::test]
    async fn counter_tracks_consumed_bytes_only() {
        let data = b"0123456789abcdef";
        let mut reader = CountingReader::with_capacity(8, chunked(data, 3));
        let mut out = Vec::new();
        while let Some(b) = reader.next_byte().await.unwrap() {
            out.push(b);
            let upcoming = data.get(out.len()).copied();
            assert_eq!(reader.peek_byte().await.unwrap(), upcoming);
        }
        assert_eq!(out, b"0123456789abcdef");
        assert_eq!(reader.consumed(), 16);
        assert_eq!(reader.peek_byte().await.unwrap(), None);
        assert_eq!(reader.discard(5).await.unwrap(), 0);
    }
}

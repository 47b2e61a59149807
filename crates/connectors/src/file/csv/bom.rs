use super::reader::CountingReader;
use std::io;
use tokio::io::AsyncRead;

/// Byte-order marks recognised at the start of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bom {
    Utf32Le,
    Utf32Be,
    Utf8,
    Utf16Le,
    Utf16Be,
}

/// Longest first: the UTF-16LE mark is a prefix of the UTF-32LE one.
const BOMS: [(Bom, &[u8]); 5] = [
    (Bom::Utf32Le, &[0xFF, 0xFE, 0x00, 0x00]),
    (Bom::Utf32Be, &[0x00, 0x00, 0xFE, 0xFF]),
    (Bom::Utf8, &[0xEF, 0xBB, 0xBF]),
    (Bom::Utf16Le, &[0xFF, 0xFE]),
    (Bom::Utf16Be, &[0xFE, 0xFF]),
];

pub const MAX_BOM_LEN: usize = 4;

impl Bom {
    pub fn detect(prefix: &[u8]) -> Option<Bom> {
        BOMS.iter()
            .find(|(_, mark)| prefix.starts_with(mark))
            .map(|(bom, _)| *bom)
    }

    pub fn len(&self) -> usize {
        match self {
            Bom::Utf32Le | Bom::Utf32Be => 4,
            Bom::Utf8 => 3,
            Bom::Utf16Le | Bom::Utf16Be => 2,
        }
    }
}

/// Discards a leading byte-order mark and returns its length, 0 if none.
pub async fn strip_bom<R: AsyncRead + Unpin>(reader: &mut CountingReader<R>) -> io::Result<usize> {
    let prefix = reader.peek(MAX_BOM_LEN).await?;
    match Bom::detect(prefix) {
        Some(bom) => {
            let len = bom.len();
            reader.discard(len).await?;
            Ok(len)
        }
        None => Ok(0),
    }
}

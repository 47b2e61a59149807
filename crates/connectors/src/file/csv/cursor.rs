//! Opaque cursor tokens: base64 over the JSON form of [`Cursor`].
//!
//! Tokens written by older releases must keep decoding. Those carried only
//! `cursor` (no `headers`), and some still older ones carried bookkeeping
//! fields that are no longer used. Unknown fields are ignored and missing ones
//! decode as absent, which forces the header row to be re-read.

use super::error::FileError;
use base64::{Engine, engine::general_purpose::STANDARD};
use model::pagination::cursor::Cursor;

/// Encodes a cursor. `None` is the final page and encodes to an empty token.
pub fn encode(cursor: Option<&Cursor>) -> Result<String, FileError> {
    let Some(cursor) = cursor else {
        return Ok(String::new());
    };
    let json = serde_json::to_vec(cursor)
        .map_err(|e| FileError::CursorDecode(format!("cannot serialize cursor: {e}")))?;
    Ok(STANDARD.encode(json))
}

/// Decodes a token. An empty token is the start of a sync and decodes to `None`.
pub fn decode(token: &str) -> Result<Option<Cursor>, FileError> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(None);
    }
    let json = STANDARD
        .decode(token)
        .map_err(|e| FileError::CursorDecode(format!("token is not valid base64: {e}")))?;
    let cursor = serde_json::from_slice::<Cursor>(&json)
        .map_err(|e| FileError::CursorDecode(format!("token is not a cursor object: {e}")))?;
    Ok(Some(cursor))
}

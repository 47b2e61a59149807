use serde::{Deserialize, Serialize};

/// Pagination state carried between page requests of one sync.
///
/// `byte_offset` always points at a row boundary. `headers` caches the header
/// row so later pages skip re-reading the start of the object. Either field may
/// be absent: older cursors never carried headers.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    #[serde(rename = "cursor", default, skip_serializing_if = "Option::is_none")]
    pub byte_offset: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,
}

impl Cursor {
    pub fn new(byte_offset: u64, headers: Vec<String>) -> Self {
        Cursor {
            byte_offset: Some(byte_offset),
            headers: Some(headers),
        }
    }
}

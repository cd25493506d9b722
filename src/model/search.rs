use super::BookId;

/// One row of a catalog search response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchItem {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub cover_url: Option<String>,
    /// True when the catalog offers a PDF rendition.
    pub has_pdf: bool,
}

/// The alternate-format payload: a PDF shipped as base64 inside JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfPayload {
    pub id: u64,
    pub title: String,
    pub author: String,
    pub producer: String,
    pub bytes: Vec<u8>,
}

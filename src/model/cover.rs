//! Base64 cover images as shipped inside book payloads.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::Result;

/// A cover image still in its base64 text form.
///
/// Payloads may carry either bare base64 or a data URI
/// (`data:image/png;base64,...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage(String);

/// A cover ready to embed in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCover {
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
}

impl DecodedCover {
    /// File extension matching the media type.
    pub fn extension(&self) -> &'static str {
        match self.media_type {
            "image/jpeg" => "jpg",
            _ => "png",
        }
    }
}

impl CoverImage {
    /// Wrap a payload value; empty strings mean "no cover".
    pub fn from_payload(value: Option<String>) -> Option<Self> {
        value.filter(|v| !v.trim().is_empty()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The base64 body with any data-URI prefix removed.
    pub fn base64_body(&self) -> &str {
        match self.0.find("base64,") {
            Some(pos) => &self.0[pos + "base64,".len()..],
            None => &self.0,
        }
    }

    /// Media type guessed from the leading base64 characters.
    pub fn media_type(&self) -> &'static str {
        let body = self.base64_body().trim_start();
        if body.starts_with("/9j/") {
            "image/jpeg"
        } else {
            // PNG ("iVBOR") and anything unrecognized
            "image/png"
        }
    }

    pub fn decode(&self) -> Result<DecodedCover> {
        let cleaned: String = self
            .base64_body()
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = STANDARD.decode(cleaned.as_bytes())?;
        Ok(DecodedCover {
            bytes,
            media_type: self.media_type(),
        })
    }
}

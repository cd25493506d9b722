//! Document information for extracted PDFs.

use std::io::{self, Write};

use lopdf::{Dictionary, Document, Object, StringFormat};

use crate::error::Result;
use crate::model::PdfPayload;

/// A decoded PDF with the payload's metadata set as its document
/// information (`/Info`).
pub struct StampedPdf {
    doc: Document,
}

impl StampedPdf {
    /// Parse `payload.bytes` and replace its `/Info` dictionary with the
    /// payload's title, author, producer and catalog id. Empty values are
    /// left out.
    pub fn new(payload: &PdfPayload) -> Result<Self> {
        let mut doc = Document::load_mem(&payload.bytes)?;

        let mut info = Dictionary::new();
        for (key, value) in [
            ("Title", payload.title.as_str()),
            ("Author", payload.author.as_str()),
            ("Producer", payload.producer.as_str()),
        ] {
            if !value.trim().is_empty() {
                info.set(key, text_string(value));
            }
        }
        info.set("OriginalID", text_string(&payload.id.to_string()));

        let info_id = doc.add_object(info);
        doc.trailer.set("Info", Object::Reference(info_id));
        log::debug!("Stamped PDF {} with title \"{}\"", payload.id, payload.title);

        Ok(Self { doc })
    }

    pub fn save_to<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        self.doc.save_to(out).map_err(io::Error::other)?;
        Ok(())
    }
}

/// A PDF text string: a literal for ASCII, UTF-16BE with BOM otherwise.
fn text_string(s: &str) -> Object {
    if s.is_ascii() {
        return Object::string_literal(s);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(s.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    /// A one-page PDF.
    fn minimal_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn info_value(pdf: &[u8], key: &[u8]) -> Option<Vec<u8>> {
        let doc = Document::load_mem(pdf).unwrap();
        let id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_object(id).unwrap().as_dict().unwrap();
        match info.get(key).ok()? {
            Object::String(bytes, _) => Some(bytes.clone()),
            _ => None,
        }
    }

    fn payload(title: &str, author: &str) -> PdfPayload {
        PdfPayload {
            id: 77,
            title: title.into(),
            author: author.into(),
            producer: "ketabonline".into(),
            bytes: minimal_pdf(),
        }
    }

    #[test]
    fn test_info_dictionary_is_written() {
        let mut stamped = StampedPdf::new(&payload("Kitab", "Ibn Test")).unwrap();
        let mut out = Vec::new();
        stamped.save_to(&mut out).unwrap();

        assert_eq!(info_value(&out, b"Title").unwrap(), b"Kitab");
        assert_eq!(info_value(&out, b"Author").unwrap(), b"Ibn Test");
        assert_eq!(info_value(&out, b"Producer").unwrap(), b"ketabonline");
        assert_eq!(info_value(&out, b"OriginalID").unwrap(), b"77");
    }

    #[test]
    fn test_non_ascii_values_are_utf16() {
        let mut stamped = StampedPdf::new(&payload("صحيح", "")).unwrap();
        let mut out = Vec::new();
        stamped.save_to(&mut out).unwrap();

        let title = info_value(&out, b"Title").unwrap();
        assert_eq!(&title[..2], &[0xFE, 0xFF]);
        let units: Vec<u16> = title[2..]
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(String::from_utf16(&units).unwrap(), "صحيح");
        assert!(info_value(&out, b"Author").is_none());
    }

    #[test]
    fn test_rejects_non_pdf_bytes() {
        let mut bad = payload("t", "a");
        bad.bytes = b"not a pdf".to_vec();
        assert!(matches!(StampedPdf::new(&bad), Err(crate::Error::Pdf(_))));
    }
}

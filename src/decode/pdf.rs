//! Alternate-format payload: a JSON array whose first element carries the
//! PDF as base64.

use std::fmt;
use std::io::Read;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, SeqAccess, Visitor};

use crate::error::{Error, Result};
use crate::model::PdfPayload;

use super::{DecodeContext, LenientInt, run_seed};

/// Decode the first document of a PDF payload; later elements are skipped.
pub fn decode_pdf_payload<R: Read>(reader: R) -> Result<PdfPayload> {
    let ctx = DecodeContext::new(None);
    let raw = run_seed(reader, &ctx, FirstSeed { ctx: &ctx })?.ok_or(Error::EmptyPdfPayload)?;

    // Strip a data-URI prefix such as "data:application/pdf;base64,"
    let body = match raw.pdf_file.split_once(',') {
        Some((_, rest)) => rest,
        None => raw.pdf_file.as_str(),
    };
    let clean: Vec<u8> = body.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(clean)?;

    log::debug!("Decoded PDF payload \"{}\" ({} bytes)", raw.title, bytes.len());

    Ok(PdfPayload {
        id: raw.id.0,
        title: raw.title,
        author: raw.author.unwrap_or_default(),
        producer: raw.producer.unwrap_or_default(),
        bytes,
    })
}

#[derive(Deserialize)]
struct RawPdf {
    id: LenientInt,
    #[serde(default)]
    title: String,
    author: Option<String>,
    producer: Option<String>,
    pdf_file: String,
}

struct FirstSeed<'c> {
    ctx: &'c DecodeContext<'c>,
}

impl<'de> DeserializeSeed<'de> for FirstSeed<'_> {
    type Value = Option<RawPdf>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for FirstSeed<'_> {
    type Value = Option<RawPdf>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a list of PDF documents")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
        self.ctx.at("pdf_file");
        let first = seq.next_element::<RawPdf>()?;
        self.ctx.at(super::DOCUMENT);
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(first)
    }
}

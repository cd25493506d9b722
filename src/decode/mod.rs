//! Streaming decoders for catalog payloads.
//!
//! Every decoder drives a `serde_json` deserializer over a buffered reader
//! with hand-written visitors: fields are recognized by name, unknown fields
//! are skipped without being materialized, and array elements (pages,
//! index entries, search rows) are handed on one at a time. No decoder
//! builds a JSON tree of the whole document; the only value ever held as a
//! `serde_json::Value` is a single page's `part`.
//!
//! Errors name the field being decoded when the token stream went wrong,
//! e.g. `pages.content`.

mod book;
mod index;
mod part;
mod pdf;
mod search;

use std::cell::Cell;
use std::fmt;
use std::io::{BufReader, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::{self, DeserializeSeed, Deserializer, Unexpected, Visitor};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::text::PlainTextOptions;

pub use book::{decode_book_data, decode_book_with};
pub use index::{decode_index, decode_index_part, fetch_paged_index};
pub use part::resolve_part;
pub use pdf::decode_pdf_payload;
pub use search::decode_search;

/// Cooperative cancellation flag shared with the thread running a decode.
///
/// Checked before every page record; once set, decoding stops with
/// [`Error::Cancelled`] and the reader is dropped.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Options shared by the book and search decoders.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Substituted for authors whose `name` is missing or null.
    pub unknown_author: String,
    /// Markup stripping applied to page content.
    pub text: PlainTextOptions,
    pub cancel: Option<CancelToken>,
}

impl DecodeOptions {
    pub fn new(unknown_author: impl Into<String>) -> Self {
        Self {
            unknown_author: unknown_author.into(),
            text: PlainTextOptions::default(),
            cancel: None,
        }
    }

    pub fn with_text(mut self, text: PlainTextOptions) -> Self {
        self.text = text;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Root field name used for errors outside any named field.
const DOCUMENT: &str = "document";

/// Per-decode bookkeeping shared by the visitors.
pub(crate) struct DecodeContext<'a> {
    field: Cell<&'static str>,
    cancelled: Cell<bool>,
    cancel: Option<&'a CancelToken>,
}

impl<'a> DecodeContext<'a> {
    pub(crate) fn new(cancel: Option<&'a CancelToken>) -> Self {
        Self {
            field: Cell::new(DOCUMENT),
            cancelled: Cell::new(false),
            cancel,
        }
    }

    /// Record the field about to be decoded.
    pub(crate) fn at(&self, field: &'static str) {
        self.field.set(field);
    }

    /// Fail the current decode if cancellation was requested.
    pub(crate) fn check_cancelled<E: de::Error>(&self) -> std::result::Result<(), E> {
        if self.cancel.is_some_and(CancelToken::is_cancelled) {
            self.cancelled.set(true);
            return Err(E::custom("cancelled"));
        }
        Ok(())
    }

    fn error(&self, source: serde_json::Error) -> Error {
        if self.cancelled.get() {
            Error::Cancelled
        } else if source.is_io() {
            Error::Io(source.into())
        } else {
            Error::Decode {
                field: self.field.get(),
                source,
            }
        }
    }
}

/// Run `seed` over the whole of `reader`, rejecting trailing data.
pub(crate) fn run_seed<'de, R, S>(reader: R, ctx: &DecodeContext<'_>, seed: S) -> Result<S::Value>
where
    R: Read,
    S: DeserializeSeed<'de>,
{
    let mut de = serde_json::Deserializer::from_reader(BufReader::new(reader));
    let value = seed.deserialize(&mut de).map_err(|e| ctx.error(e))?;
    ctx.at(DOCUMENT);
    de.end().map_err(|e| ctx.error(e))?;
    Ok(value)
}

/// A non-negative integer that may arrive as a number or a numeric string.
pub(crate) struct LenientInt(pub u64);

impl LenientInt {
    pub(crate) fn into_u32<E: de::Error>(self) -> std::result::Result<u32, E> {
        u32::try_from(self.0)
            .map_err(|_| E::invalid_value(Unexpected::Unsigned(self.0), &"a 32-bit integer"))
    }
}

impl<'de> Deserialize<'de> for LenientInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(LenientIntVisitor)
    }
}

struct LenientIntVisitor;

impl<'de> Visitor<'de> for LenientIntVisitor {
    type Value = LenientInt;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative integer or numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        Ok(LenientInt(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
        u64::try_from(v)
            .map(LenientInt)
            .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
        if v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 {
            Ok(LenientInt(v as u64))
        } else {
            Err(E::invalid_value(Unexpected::Float(v), &self))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        v.trim()
            .parse()
            .map(LenientInt)
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

//! Table-of-contents payload: `{status, code, data: [entries]}`.

use std::fmt;
use std::io::Read;

use serde::Deserialize;
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::Value;

use crate::error::Result;
use crate::model::{BookIndex, DEFAULT_PART};

use super::part::{parse_part_number, resolve_part};
use super::{DecodeContext, LenientInt, run_seed};

/// Decode an index response.
///
/// A response flagged as failed (`status` false or absent, `code` other than
/// 200) or with no entries is not an error: it yields an empty list and the
/// book is assembled into a single chapter.
pub fn decode_index<R: Read>(reader: R) -> Result<Vec<BookIndex>> {
    decode_index_part(reader, DEFAULT_PART)
}

/// Like [`decode_index`], giving entries without an explicit part
/// `default_part`.
pub fn decode_index_part<R: Read>(reader: R, default_part: u32) -> Result<Vec<BookIndex>> {
    let ctx = DecodeContext::new(None);
    let raw = run_seed(reader, &ctx, IndexSeed { ctx: &ctx, default_part })?;

    if !raw.succeeded() {
        log::warn!(
            "Index response rejected (status {:?}, code {:?}); assembling without an index",
            raw.status,
            raw.code
        );
        return Ok(Vec::new());
    }
    if raw.entries.is_empty() {
        log::warn!("Index response has no entries");
    }
    Ok(raw.entries)
}

/// Fetch a multi-part index one part at a time.
///
/// `fetch(n)` returns the response for part `n`, or `None` when there is no
/// such part. Fetching stops at the first missing or empty part, or after
/// `max_parts`.
pub fn fetch_paged_index<F, R>(mut fetch: F, max_parts: u32) -> Result<Vec<BookIndex>>
where
    F: FnMut(u32) -> Result<Option<R>>,
    R: Read,
{
    let mut entries = Vec::new();
    for part in 1..=max_parts {
        let Some(reader) = fetch(part)? else {
            break;
        };
        let chunk = decode_index_part(reader, part)?;
        if chunk.is_empty() {
            break;
        }
        log::debug!("Index part {part}: {} entries", chunk.len());
        entries.extend(chunk);
    }
    Ok(entries)
}

#[derive(Default)]
struct RawIndex {
    status: Option<bool>,
    code: Option<i64>,
    entries: Vec<BookIndex>,
}

impl RawIndex {
    fn succeeded(&self) -> bool {
        self.status == Some(true) && self.code == Some(200)
    }

    /// True once either flag is known to be failing.
    fn known_failed(&self) -> bool {
        self.status == Some(false) || self.code.is_some_and(|c| c != 200)
    }
}

#[derive(Deserialize)]
#[serde(field_identifier, rename_all = "snake_case")]
enum IndexField {
    Status,
    Code,
    Data,
    #[serde(other)]
    Other,
}

struct IndexSeed<'c> {
    ctx: &'c DecodeContext<'c>,
    default_part: u32,
}

impl<'de> DeserializeSeed<'de> for IndexSeed<'_> {
    type Value = RawIndex;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<RawIndex, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for IndexSeed<'_> {
    type Value = RawIndex;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an index response object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<RawIndex, A::Error> {
        let ctx = self.ctx;
        let mut raw = RawIndex::default();

        loop {
            ctx.at(super::DOCUMENT);
            let Some(field) = map.next_key::<IndexField>()? else {
                break;
            };
            match field {
                IndexField::Status => {
                    ctx.at("status");
                    raw.status = map.next_value()?;
                }
                IndexField::Code => {
                    ctx.at("code");
                    raw.code = map.next_value()?;
                }
                IndexField::Data if raw.known_failed() => {
                    map.next_value::<IgnoredAny>()?;
                }
                IndexField::Data => {
                    ctx.at("data");
                    raw.entries = map.next_value_seed(EntriesSeed {
                        ctx,
                        default_part: self.default_part,
                    })?;
                }
                IndexField::Other => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        Ok(raw)
    }
}

struct EntriesSeed<'c> {
    ctx: &'c DecodeContext<'c>,
    default_part: u32,
}

impl<'de> DeserializeSeed<'de> for EntriesSeed<'_> {
    type Value = Vec<BookIndex>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for EntriesSeed<'_> {
    type Value = Vec<BookIndex>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a list of index entries")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(Vec::new())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        loop {
            self.ctx.at("data");
            let seed = EntrySeed {
                ctx: self.ctx,
                default_part: self.default_part,
            };
            let Some(entry) = seq.next_element_seed(seed)? else {
                break;
            };
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[derive(Deserialize)]
#[serde(field_identifier, rename_all = "snake_case")]
enum EntryField {
    Title,
    PageId,
    Page,
    PartName,
    Part,
    #[serde(other)]
    Other,
}

struct EntrySeed<'c> {
    ctx: &'c DecodeContext<'c>,
    default_part: u32,
}

impl<'de> DeserializeSeed<'de> for EntrySeed<'_> {
    type Value = BookIndex;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<BookIndex, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for EntrySeed<'_> {
    type Value = BookIndex;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an index entry object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<BookIndex, A::Error> {
        let ctx = self.ctx;
        let mut title = String::new();
        let mut page_id = None;
        let mut page = 0;
        let mut part_name = None;
        let mut part = None;

        loop {
            ctx.at("data");
            let Some(field) = map.next_key::<EntryField>()? else {
                break;
            };
            match field {
                EntryField::Title => {
                    ctx.at("data.title");
                    title = map.next_value::<Option<String>>()?.unwrap_or_default();
                }
                EntryField::PageId => {
                    ctx.at("data.page_id");
                    page_id = Some(map.next_value::<LenientInt>()?.0);
                }
                EntryField::Page => {
                    ctx.at("data.page");
                    if let Some(value) = map.next_value::<Option<LenientInt>>()? {
                        page = value.into_u32::<A::Error>()?;
                    }
                }
                EntryField::PartName => {
                    ctx.at("data.part_name");
                    part_name = parse_part_number(&map.next_value::<Value>()?);
                }
                EntryField::Part => {
                    ctx.at("data.part");
                    let value = map.next_value::<Value>()?;
                    part = match &value {
                        Value::Number(_) => parse_part_number(&value),
                        _ => resolve_part(Some(&value)),
                    };
                }
                EntryField::Other => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        ctx.at("data.page_id");
        let page_id = page_id.ok_or_else(|| <A::Error as de::Error>::missing_field("page_id"))?;

        Ok(BookIndex {
            title,
            page_id,
            page,
            part: part_name.or(part).unwrap_or(self.default_part),
        })
    }
}

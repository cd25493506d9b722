//! Catalog search results.

use std::fmt;
use std::io::Read;

use serde::Deserialize;
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};

use crate::error::{Error, Result};
use crate::model::{BookId, SearchItem};

use super::book::{AuthorPaths, AuthorsSeed, FilePaths, FilesSeed};
use super::{DecodeContext, DecodeOptions, LenientInt, run_seed};

const ITEM_AUTHORS: AuthorPaths = AuthorPaths {
    list: "data.authors",
    name: "data.authors.name",
};

const ITEM_FILES: FilePaths = FilePaths {
    pdf: "data.files.pdf",
    url: "data.files.pdf.url",
};

/// Decode a search response.
///
/// Accepts the `{status, code, data}` envelope or a bare array of rows.
/// Unlike a missing index, a rejected search is an error.
pub fn decode_search<R: Read>(reader: R, opts: &DecodeOptions) -> Result<Vec<SearchItem>> {
    let ctx = DecodeContext::new(opts.cancel.as_ref());
    let seed = SearchSeed {
        ctx: &ctx,
        unknown: &opts.unknown_author,
    };
    let raw = run_seed(reader, &ctx, seed)?;

    if let Some((status, code)) = raw.envelope {
        let status = status.unwrap_or(false);
        let code = code.unwrap_or(0);
        if !status || code != 200 {
            return Err(Error::Rejected { status, code });
        }
    }

    log::debug!("Search returned {} results", raw.items.len());
    Ok(raw.items)
}

struct RawSearch {
    /// `(status, code)` when the response was wrapped in an envelope.
    envelope: Option<(Option<bool>, Option<i64>)>,
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
#[serde(field_identifier, rename_all = "snake_case")]
enum EnvelopeField {
    Status,
    Code,
    Data,
    #[serde(other)]
    Other,
}

struct SearchSeed<'c, 'u> {
    ctx: &'c DecodeContext<'c>,
    unknown: &'u str,
}

impl<'de> DeserializeSeed<'de> for SearchSeed<'_, '_> {
    type Value = RawSearch;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<RawSearch, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for SearchSeed<'_, '_> {
    type Value = RawSearch;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a search response")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> std::result::Result<RawSearch, A::Error> {
        let items = ItemsSeed {
            ctx: self.ctx,
            unknown: self.unknown,
        }
        .visit_seq(seq)?;
        Ok(RawSearch { envelope: None, items })
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<RawSearch, A::Error> {
        let ctx = self.ctx;
        let mut status = None;
        let mut code = None;
        let mut items = Vec::new();

        loop {
            ctx.at(super::DOCUMENT);
            let Some(field) = map.next_key::<EnvelopeField>()? else {
                break;
            };
            match field {
                EnvelopeField::Status => {
                    ctx.at("status");
                    status = map.next_value()?;
                }
                EnvelopeField::Code => {
                    ctx.at("code");
                    code = map.next_value()?;
                }
                EnvelopeField::Data => {
                    ctx.at("data");
                    items = map.next_value_seed(ItemsSeed {
                        ctx,
                        unknown: self.unknown,
                    })?;
                }
                EnvelopeField::Other => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        Ok(RawSearch {
            envelope: Some((status, code)),
            items,
        })
    }
}

struct ItemsSeed<'c, 'u> {
    ctx: &'c DecodeContext<'c>,
    unknown: &'u str,
}

impl<'de> DeserializeSeed<'de> for ItemsSeed<'_, '_> {
    type Value = Vec<SearchItem>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for ItemsSeed<'_, '_> {
    type Value = Vec<SearchItem>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a list of search results")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(Vec::new())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        loop {
            self.ctx.check_cancelled()?;
            self.ctx.at("data");
            let seed = ItemSeed {
                ctx: self.ctx,
                unknown: self.unknown,
            };
            let Some(item) = seq.next_element_seed(seed)? else {
                break;
            };
            items.push(item);
        }
        Ok(items)
    }
}

#[derive(Deserialize)]
#[serde(field_identifier, rename_all = "snake_case")]
enum ItemField {
    Id,
    Title,
    Authors,
    ImageUrl,
    Files,
    #[serde(other)]
    Other,
}

struct ItemSeed<'c, 'u> {
    ctx: &'c DecodeContext<'c>,
    unknown: &'u str,
}

impl<'de> DeserializeSeed<'de> for ItemSeed<'_, '_> {
    type Value = SearchItem;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<SearchItem, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for ItemSeed<'_, '_> {
    type Value = SearchItem;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a search result object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<SearchItem, A::Error> {
        let ctx = self.ctx;
        let mut id = None;
        let mut title = String::new();
        let mut author = String::new();
        let mut cover_url = None;
        let mut has_pdf = false;

        loop {
            ctx.at("data");
            let Some(field) = map.next_key::<ItemField>()? else {
                break;
            };
            match field {
                ItemField::Id => {
                    ctx.at("data.id");
                    id = Some(map.next_value::<LenientInt>()?.0);
                }
                ItemField::Title => {
                    ctx.at("data.title");
                    title = map.next_value::<Option<String>>()?.unwrap_or_default();
                }
                ItemField::Authors => {
                    ctx.at("data.authors");
                    author = map.next_value_seed(AuthorsSeed {
                        ctx,
                        unknown: self.unknown,
                        paths: &ITEM_AUTHORS,
                    })?;
                }
                ItemField::ImageUrl => {
                    ctx.at("data.image_url");
                    cover_url = map
                        .next_value::<Option<String>>()?
                        .filter(|url| !url.trim().is_empty());
                }
                ItemField::Files => {
                    ctx.at("data.files");
                    has_pdf = map
                        .next_value_seed(FilesSeed {
                            ctx,
                            paths: &ITEM_FILES,
                        })?
                        .is_some();
                }
                ItemField::Other => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        ctx.at("data.id");
        let id = id.ok_or_else(|| <A::Error as de::Error>::missing_field("id"))?;

        Ok(SearchItem {
            id: BookId(id),
            title,
            author,
            cover_url,
            has_pdf,
        })
    }
}

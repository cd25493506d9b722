//! Catalog URLs.
//!
//! The crate does no networking; these are the addresses a transport should
//! fetch, with the payloads then handed to [`crate::decode`].

use std::borrow::Cow;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::Deserialize;

use crate::model::BookId;

/// Characters escaped in query values: everything but RFC 3986 unreserved.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Base URLs of the catalog API and its file storage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub api_base: String,
    pub storage_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: "https://backend.ketabonline.com/api/v2".into(),
            storage_base: "https://s2.ketabonline.com/books".into(),
        }
    }
}

impl Endpoints {
    /// Title search, ranked by relevance.
    pub fn search_url(&self, query: &str, page: u32, limit: u32) -> String {
        format!(
            "{}/books?is_active=1&is_deleted=0&page={}&limit={}&q={}&scope=titles&sort_field=_score&sort_direction=DESC",
            self.api(),
            page.max(1),
            limit,
            utf8_percent_encode(query, QUERY_VALUE)
        )
    }

    /// Whole table of contents in one response.
    pub fn index_url(&self, id: BookId) -> String {
        format!("{}/books/{}/index", self.api(), id)
    }

    /// One part of a multi-part table of contents.
    pub fn paged_index_url(&self, id: BookId, part: u32) -> String {
        format!("{}?part={}&is_recursive=1", self.index_url(id), part)
    }

    /// Zipped book data payload.
    pub fn data_url(&self, id: BookId) -> String {
        format!("{}/{}/{}.data.zip", self.storage(), id, id)
    }

    fn api(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    fn storage(&self) -> &str {
        self.storage_base.trim_end_matches('/')
    }
}

/// The last non-empty path segment of `url`, percent-decoded.
///
/// Query and fragment are ignored. Returns `None` for URLs without a path
/// segment (e.g. `https://host/`).
pub fn file_name_from_url(url: &str) -> Option<String> {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let without_query = &url[..end];
    let path = match without_query.find("://") {
        Some(scheme_end) => {
            let rest = &without_query[scheme_end + 3..];
            // Drop the authority
            &rest[rest.find('/')?..]
        }
        None => without_query,
    };

    let segment = path.rsplit('/').find(|s| !s.is_empty())?;
    let decoded: Cow<str> = percent_decode_str(segment).decode_utf8_lossy();
    Some(decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_query() {
        let url = Endpoints::default().search_url("صحيح البخاري & more", 2, 20);
        assert!(url.starts_with("https://backend.ketabonline.com/api/v2/books?is_active=1&is_deleted=0&page=2&limit=20&q="));
        assert!(url.contains("q=%D8%B5%D8%AD"));
        assert!(url.contains("%20%26%20more&scope=titles"));
        assert!(url.ends_with("&sort_field=_score&sort_direction=DESC"));
    }

    #[test]
    fn test_book_urls() {
        let endpoints = Endpoints {
            api_base: "https://api.example/v2/".into(),
            storage_base: "https://files.example/books".into(),
        };
        let id = BookId(1207);
        assert_eq!(endpoints.index_url(id), "https://api.example/v2/books/1207/index");
        assert_eq!(
            endpoints.paged_index_url(id, 3),
            "https://api.example/v2/books/1207/index?part=3&is_recursive=1"
        );
        assert_eq!(endpoints.data_url(id), "https://files.example/books/1207/1207.data.zip");
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://s2.example/books/12/book%20name.pdf.zip?token=a#x").as_deref(),
            Some("book name.pdf.zip")
        );
        assert_eq!(file_name_from_url("https://host/dir/file/").as_deref(), Some("file"));
        assert_eq!(file_name_from_url("https://host/"), None);
        assert_eq!(file_name_from_url("https://host"), None);
        assert_eq!(file_name_from_url("relative/name.json").as_deref(), Some("name.json"));
    }
}

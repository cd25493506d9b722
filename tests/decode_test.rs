//! Decoding through the public API, including zipped payloads.

use std::io::{Cursor, Write};

use zip::write::{SimpleFileOptions, ZipWriter};

use ketab2epub::decode::{DecodeOptions, decode_book_with, decode_pdf_payload};
use ketab2epub::io::{PayloadKind, detect_kind, read_payload};
use ketab2epub::{CancelToken, Error, decode_book_data, decode_index, decode_search, resolve_part};

fn zipped(contents: &str) -> Cursor<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("payload.json", SimpleFileOptions::default()).unwrap();
    zip.write_all(contents.as_bytes()).unwrap();
    let mut cursor = zip.finish().unwrap();
    cursor.set_position(0);
    cursor
}

fn opts() -> DecodeOptions {
    DecodeOptions::new("Unknown")
}

#[test]
fn test_zipped_and_raw_payloads_decode_alike() {
    let json = r#"{"title": "Kitab", "authors": null, "pages": [{"id": 2, "content": "<b>bold</b> text"}]}"#;

    let raw = read_payload(Cursor::new(json.as_bytes().to_vec()), |r| decode_book_data(r, &opts())).unwrap();
    let mut archive = zipped(json);
    assert_eq!(detect_kind(&mut archive).unwrap(), PayloadKind::Zip);
    let from_zip = read_payload(archive, |r| decode_book_data(r, &opts())).unwrap();

    assert_eq!(raw, from_zip);
    assert_eq!(raw.author(), "");
    assert_eq!(raw.pages[0].content, "bold text");
}

#[test]
fn test_empty_archive() {
    let zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut cursor = zip.finish().unwrap();
    cursor.set_position(0);
    let err = read_payload(cursor, |r| decode_index(r)).unwrap_err();
    assert!(matches!(err, Error::EmptyArchive));
}

#[test]
fn test_missing_title_yields_no_data() {
    let err = decode_book_data(r#"{"pages": [{"id": 1}]}"#.as_bytes(), &opts()).unwrap_err();
    assert!(matches!(err, Error::MissingTitle));
}

#[test]
fn test_pages_stream_before_metadata_is_known() {
    // Pages may come before the title in the payload
    let json = r#"{"pages": [{"id": 1}, {"id": 2}], "title": "Late"}"#;
    let mut seen = Vec::new();
    let meta = decode_book_with(json.as_bytes(), &opts(), |page| seen.push(page.id)).unwrap();
    assert_eq!(meta.title, "Late");
    assert_eq!(seen, vec![1, 2]);
}

#[test]
fn test_cancelled_decode_returns_nothing() {
    let token = CancelToken::new();
    token.cancel();
    let opts = opts().with_cancel(token);
    let err = decode_book_data(r#"{"title": "t", "pages": [{"id": 1}]}"#.as_bytes(), &opts).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[test]
fn test_index_failures_are_empty() {
    let failed = r#"{"status": false, "code": 200, "data": [{"title": "x", "page_id": 1}]}"#;
    assert!(decode_index(failed.as_bytes()).unwrap().is_empty());

    let missing = r#"{"data": [{"title": "x", "page_id": 1}]}"#;
    assert!(decode_index(missing.as_bytes()).unwrap().is_empty());
}

#[test]
fn test_search_rejection_is_an_error() {
    let err = decode_search(r#"{"status": true, "code": 500, "data": []}"#.as_bytes(), &opts()).unwrap_err();
    assert!(matches!(err, Error::Rejected { status: true, code: 500 }));
}

#[test]
fn test_search_items() {
    let json = r#"{"status": true, "code": 200, "data": [
        {"id": 5, "title": "A", "authors": [{"name": "X"}], "files": {"pdf": {"url": "u"}}},
        {"id": "6", "title": "B", "authors": [{}]}
    ]}"#;
    let items = decode_search(json.as_bytes(), &opts()).unwrap();
    assert_eq!(items.len(), 2);
    assert!(items[0].has_pdf);
    assert_eq!(items[0].author, "X");
    assert!(!items[1].has_pdf);
    assert_eq!(items[1].author, "Unknown");
}

#[test]
fn test_part_resolution() {
    let parse = |s: &str| serde_json::from_str::<serde_json::Value>(s).unwrap();
    assert_eq!(resolve_part(Some(&parse(r#"{"name": "3"}"#))), Some(3));
    assert_eq!(resolve_part(Some(&parse(r#"[{"name": "2"}, {"name": "9"}]"#))), Some(2));
    assert_eq!(resolve_part(Some(&parse(r#"{"name": "x"}"#))), None);
    assert_eq!(resolve_part(Some(&serde_json::Value::Null)), None);
}

#[test]
fn test_zipped_pdf_payload() {
    let archive = zipped(r#"[{"id": 1, "title": "T", "pdf_file": "JVBERg=="}]"#);
    let pdf = read_payload(archive, |r| decode_pdf_payload(r)).unwrap();
    assert_eq!(pdf.bytes, b"%PDF");
}

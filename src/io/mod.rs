//! Access to downloaded payloads.
//!
//! The catalog ships book data either as raw JSON or as a zip archive
//! holding a single JSON file. Both are exposed as one forward-only reader.

mod archive;

pub use archive::{PayloadKind, detect_kind, open_payload, read_payload};

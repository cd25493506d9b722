//! Error types for ketab2epub operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while decoding payloads or writing documents.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded PDF could not be parsed.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// The book payload has no usable `title`.
    #[error("This book has no title")]
    MissingTitle,

    /// A JSON token did not match the shape expected for `field`.
    #[error("Malformed `{field}`: {source}")]
    Decode {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The remote service answered, but flagged the request as failed.
    #[error("Request rejected with status {status} and code {code}")]
    Rejected { status: bool, code: i64 },

    /// The payload source could not be opened.
    #[error("Resource unavailable at {}: {source}", path.display())]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output sink could not be opened or written.
    #[error("Failed to write output: {0}")]
    Sink(#[source] std::io::Error),

    #[error("Archive contains no files")]
    EmptyArchive,

    #[error("PDF payload contains no documents")]
    EmptyPdfPayload,

    #[error("PDF URL not found")]
    MissingPdfUrl,

    #[error("Unknown book type: {0}")]
    UnknownBookType(String),

    /// The download status file exists but is not valid JSON.
    #[error("Corrupt download status file {}: {source}", path.display())]
    Tracker {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration at {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Whether the request can be retried from scratch.
    ///
    /// Decode failures are deterministic for a given payload; transport-side
    /// failures may not be.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::ResourceUnavailable { .. } | Error::Zip(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

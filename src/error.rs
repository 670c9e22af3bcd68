//! Error types for waveclip

use thiserror::Error;

/// Result type alias for waveclip operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for waveclip
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File extension or magic bytes name a format with no parser
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Structurally invalid container data
    #[error("Bad format: {0}")]
    BadFormat(String),

    /// A declared length reads past the end of the file or region
    #[error("Truncated file: {0}")]
    TruncatedFile(String),

    /// A required MP4 atom was not found
    #[error("Missing atom: {0}")]
    MissingAtom(String),
}

impl Error {
    /// Create an unsupported format error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Error::UnsupportedFormat(msg.into())
    }

    /// Create a bad format error
    pub fn bad_format<S: Into<String>>(msg: S) -> Self {
        Error::BadFormat(msg.into())
    }

    /// Create a truncated file error
    pub fn truncated<S: Into<String>>(msg: S) -> Self {
        Error::TruncatedFile(msg.into())
    }

    /// Create a missing atom error
    pub fn missing_atom<S: Into<String>>(msg: S) -> Self {
        Error::MissingAtom(msg.into())
    }
}

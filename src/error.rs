//! Error types for pdfblocks.

use std::io;
use thiserror::Error;

/// Result type alias for pdfblocks operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while parsing, editing or exporting documents.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The byte stream does not start with the `%PDF-` signature.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// The PDF could not be opened or its structure could not be read.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// The PDF opened but contains no pages.
    #[error("Document has no pages")]
    EmptyDocument,

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// A single page failed to parse.
    #[error("Page {page}: {message}")]
    PageParse {
        /// 1-based page number
        page: u32,
        /// What went wrong
        message: String,
    },

    /// A document, page or block invariant does not hold.
    #[error("Invalid document model: {0}")]
    InvalidModel(String),

    /// No block with the given id exists.
    #[error("Block not found: {0}")]
    BlockNotFound(String),

    /// An edit does not match the block's content kind.
    #[error("Block {id} holds {expected} content")]
    ContentMismatch {
        /// Block id
        id: String,
        /// The content kind the block requires
        expected: &'static str,
    },

    /// A replacement font could not be embedded.
    #[error("Font embedding error: {0}")]
    FontEmbed(String),

    /// Writing draw operations into the output PDF failed.
    #[error("Rendering error: {0}")]
    Render(String),

    /// The JSON boundary could not be read or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unparseable page range string.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl Error {
    /// Whether this error concerns one page only and may be skipped in lenient mode.
    pub fn is_page_level(&self) -> bool {
        matches!(self, Error::PageParse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Encrypted;
        assert_eq!(err.to_string(), "Document is encrypted");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );

        let err = Error::ContentMismatch {
            id: "p1-b0".to_string(),
            expected: "table",
        };
        assert_eq!(err.to_string(), "Block p1-b0 holds table content");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_page_level_classification() {
        let err = Error::PageParse {
            page: 3,
            message: "bad content stream".to_string(),
        };
        assert!(err.is_page_level());
        assert!(!Error::EmptyDocument.is_page_level());
        assert_eq!(err.to_string(), "Page 3: bad content stream");
    }
}

//! PDF signature precondition check.
//!
//! The upload layer is expected to hand over a PDF byte stream; the core
//! re-asserts the `%PDF-` signature before handing bytes to the backend.

use crate::error::{Error, Result};

/// Header information read from the first bytes of a PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfHeader {
    /// PDF version (e.g., "1.7", "2.0")
    pub version: String,
}

impl std::fmt::Display for PdfHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Check the `%PDF-` signature and read the header version.
///
/// Fails with [`Error::UnknownFormat`] when the signature is missing and
/// [`Error::UnsupportedVersion`] when the version is not `d.d`.
pub fn check_signature(data: &[u8]) -> Result<PdfHeader> {
    let rest = data.strip_prefix(PDF_MAGIC).ok_or(Error::UnknownFormat)?;
    let version_bytes = rest.get(..3).ok_or(Error::UnknownFormat)?;
    let version = String::from_utf8_lossy(version_bytes).to_string();

    let valid = matches!(version_bytes, [major, b'.', minor]
        if major.is_ascii_digit() && minor.is_ascii_digit());
    if !valid {
        return Err(Error::UnsupportedVersion(version));
    }

    Ok(PdfHeader { version })
}

/// Check if bytes start with a valid PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    check_signature(data).is_ok()
}

//! JSON boundary of the document model.
//!
//! The editor reads what [`to_json`] writes and sends edits back through
//! [`from_json`], so field names and units (layout pixels) must stay stable.

use crate::error::Result;
use crate::model::Document;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert a document to JSON.
pub fn to_json(doc: &Document, format: JsonFormat) -> Result<String> {
    let json = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(doc)?,
        JsonFormat::Compact => serde_json::to_string(doc)?,
    };
    Ok(json)
}

/// Read a document back and check its invariants.
///
/// The original PDF bytes are never part of the JSON; attach them to
/// `metadata.original_bytes` before exporting.
pub fn from_json(json: &str) -> Result<Document> {
    let doc: Document = serde_json::from_str(json)?;
    doc.validate()?;
    Ok(doc)
}

//! Plain text projection of a document.

use crate::model::Document;

/// Plain text of every page in reading order.
///
/// With `page_markers`, each page is introduced by a `--- Page N ---` line.
pub fn to_text(doc: &Document, page_markers: bool) -> String {
    if !page_markers {
        return doc.plain_text().trim().to_string();
    }
    doc.pages
        .iter()
        .map(|page| format!("--- Page {} ---\n{}", page.page_number, page.plain_text()))
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string()
}

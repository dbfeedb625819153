//! Document-level types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Block, Page};
use crate::error::{Error, Result};

/// A parsed PDF document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique document id
    pub id: String,

    /// Document metadata (title, author, etc.)
    pub metadata: Metadata,

    /// Pages in the document, `pages[i].page_number == i + 1`
    pub pages: Vec<Page>,
}

impl Document {
    /// Create a new empty document with a fresh id.
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: Metadata::default(),
            pages: Vec::new(),
        }
    }

    /// Get the number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Get a page by number (1-indexed).
    pub fn get_page(&self, page_num: u32) -> Option<&Page> {
        if page_num == 0 {
            return None;
        }
        self.pages.get((page_num - 1) as usize)
    }

    /// Mutable page by number (1-indexed).
    pub fn get_page_mut(&mut self, page_num: u32) -> Option<&mut Page> {
        if page_num == 0 {
            return None;
        }
        self.pages.get_mut((page_num - 1) as usize)
    }

    /// Append a page, renumbering it to keep page numbers contiguous.
    pub fn add_page(&mut self, mut page: Page) {
        page.page_number = self.page_count() + 1;
        self.pages.push(page);
        self.metadata.page_count = self.page_count();
    }

    /// Find a block anywhere in the document.
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.pages.iter().find_map(|p| p.block(id))
    }

    /// Find a block for editing.
    pub fn block_mut(&mut self, id: &str) -> Result<&mut Block> {
        self.pages
            .iter_mut()
            .find_map(|p| p.block_mut(id))
            .ok_or_else(|| Error::BlockNotFound(id.to_string()))
    }

    /// All edited blocks with their page number.
    pub fn edited_blocks(&self) -> Vec<(u32, &Block)> {
        self.pages
            .iter()
            .flat_map(|p| p.edited_blocks().map(move |b| (p.page_number, b)))
            .collect()
    }

    /// Whether any block was edited since parsing.
    pub fn has_edits(&self) -> bool {
        self.pages.iter().any(|p| p.edited_blocks().next().is_some())
    }

    /// Check if the document has any pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn block_count(&self) -> usize {
        self.pages.iter().map(Page::block_count).sum()
    }

    /// Get plain text content of the entire document.
    pub fn plain_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.plain_text())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Check page numbering and every page and block invariant.
    pub fn validate(&self) -> Result<()> {
        for (i, page) in self.pages.iter().enumerate() {
            let expected = i as u32 + 1;
            if page.page_number != expected {
                return Err(Error::InvalidModel(format!(
                    "page at index {} is numbered {} (expected {})",
                    i, page.page_number, expected
                )));
            }
            page.validate()?;
        }
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Total number of pages
    pub page_count: u32,

    /// PDF version from the file header, e.g. `"1.7"`
    #[serde(default)]
    pub version: Option<String>,

    /// Creation date from the info dictionary
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,

    /// Modification date from the info dictionary
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,

    /// File name the bytes were uploaded under
    #[serde(default)]
    pub original_file_name: Option<String>,

    /// Source bytes, kept so export can modify the original file in place.
    /// Never serialized.
    #[serde(skip)]
    pub original_bytes: Option<Vec<u8>>,
}

impl Metadata {
    /// Whether the source bytes are still attached.
    pub fn has_source(&self) -> bool {
        self.original_bytes.as_ref().is_some_and(|b| !b.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockContent, BlockStyle, BlockType, Dimensions, Position};

    fn sample() -> Document {
        let mut doc = Document::new();
        for n in 0..2 {
            let mut page = Page::new(0, Dimensions::default());
            page.add_block(
                Block::new(
                    format!("p{}-b0", n + 1),
                    BlockType::Paragraph,
                    BlockContent::Text(format!("Page {} text", n + 1)),
                    Position::new(10.0, 10.0, 100.0, 12.0),
                    BlockStyle::default(),
                    0.9,
                )
                .unwrap(),
            )
            .unwrap();
            doc.add_page(page);
        }
        doc
    }

    #[test]
    fn test_add_page_numbers_contiguously() {
        let doc = sample();
        assert_eq!(doc.pages[0].page_number, 1);
        assert_eq!(doc.pages[1].page_number, 2);
        assert_eq!(doc.metadata.page_count, 2);
        assert!(doc.validate().is_ok());
        assert!(doc.get_page(0).is_none());
        assert!(doc.get_page(2).is_some());
    }

    #[test]
    fn test_block_mut_and_edits() {
        let mut doc = sample();
        assert!(!doc.has_edits());
        doc.block_mut("p2-b0").unwrap().set_text("Changed").unwrap();
        let edited = doc.edited_blocks();
        assert_eq!(edited.len(), 1);
        assert_eq!(edited[0].0, 2);
        assert!(matches!(doc.block_mut("missing"), Err(Error::BlockNotFound(_))));
    }

    #[test]
    fn test_validate_page_numbering() {
        let mut doc = sample();
        doc.pages[1].page_number = 5;
        assert!(matches!(doc.validate(), Err(Error::InvalidModel(_))));
    }

    #[test]
    fn test_original_bytes_not_serialized() {
        let mut doc = sample();
        doc.metadata.original_bytes = Some(b"%PDF-1.7".to_vec());
        doc.metadata.original_file_name = Some("report.pdf".into());
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["metadata"].get("originalBytes").is_none());
        assert_eq!(json["metadata"]["originalFileName"], "report.pdf");
        assert_eq!(json["metadata"]["pageCount"], 2);
        assert_eq!(doc.plain_text(), "Page 1 text\n\nPage 2 text");
    }
}

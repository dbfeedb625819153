//! # pdfblocks
//!
//! Turn PDF pages into editable structured blocks and write edits back.
//!
//! The parser groups positioned glyph runs into lines, classifies the lines
//! into headings, tables, lists and paragraphs, and produces a
//! [`Document`] tree. After the blocks are edited, the reflow engine
//! covers each edited region in the original file and draws the new text
//! in its place.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfblocks::{export_pdf, parse_file};
//!
//! fn main() -> pdfblocks::Result<()> {
//!     let mut doc = parse_file("report.pdf")?;
//!
//!     let block = doc.block_mut("p1-b0")?;
//!     block.set_text("Revised title")?;
//!
//!     let bytes = export_pdf(&doc)?;
//!     std::fs::write("report-edited.pdf", bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Block classification**: Headings, tables, lists, paragraphs, images
//! - **JSON boundary**: camelCase document model for editors
//! - **In-place export**: Cover-and-redraw of edited blocks only
//! - **Parallel processing**: Uses Rayon to classify pages concurrently

pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod reflow;
pub mod render;
pub mod util;

// Re-export commonly used types
pub use detect::{check_signature, is_pdf_bytes, PdfHeader};
pub use error::{Error, Result};
pub use model::{
    Block, BlockContent, BlockMetadata, BlockStyle, BlockType, Dimensions, Document,
    ImageContent, List, ListItem, ListType, Metadata, Page, Position, Table, TableCell, TableRow,
    TextAlign,
};
pub use parser::{
    ensure_initialized, ClassifierConfig, ErrorMode, LopdfBackend, PageSelection, ParseOptions,
    PdfBackend, PdfParser,
};
pub use reflow::{ReflowEngine, ReflowOptions};
pub use render::{from_json, to_json, to_text, JsonFormat};

use std::path::Path;

/// Parse a PDF file into a structured document.
///
/// # Example
///
/// ```no_run
/// use pdfblocks::parse_file;
///
/// let doc = parse_file("document.pdf").unwrap();
/// println!("Pages: {}", doc.page_count());
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    let parser = PdfParser::open(path)?;
    parser.parse()
}

/// Parse a PDF file with custom options.
///
/// # Example
///
/// ```no_run
/// use pdfblocks::{parse_file_with_options, ParseOptions};
///
/// let options = ParseOptions::new().lenient().sequential();
/// let doc = parse_file_with_options("document.pdf", options).unwrap();
/// ```
pub fn parse_file_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Document> {
    let parser = PdfParser::open_with_options(path, options)?;
    parser.parse()
}

/// Parse a PDF from bytes.
///
/// The bytes are kept in the document metadata so that [`export_pdf`] can
/// write edits back without the caller holding on to them.
pub fn parse_bytes(data: &[u8]) -> Result<Document> {
    let parser = PdfParser::from_bytes(data)?;
    parser.parse()
}

/// Parse a PDF from bytes with custom options.
pub fn parse_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Document> {
    let parser = PdfParser::from_bytes_with_options(data, options)?;
    parser.parse()
}

/// Export an edited document using the source bytes attached at parse time.
///
/// Fails with [`Error::InvalidModel`] when the document carries no source,
/// which is the case after a JSON round trip.
///
/// # Example
///
/// ```no_run
/// use pdfblocks::{export_pdf, parse_bytes};
///
/// let data = std::fs::read("document.pdf").unwrap();
/// let doc = parse_bytes(&data).unwrap();
/// let unchanged = export_pdf(&doc).unwrap();
/// assert_eq!(unchanged, data);
/// ```
pub fn export_pdf(document: &Document) -> Result<Vec<u8>> {
    ReflowEngine::default().export(attached_source(document)?, document)
}

/// Export an edited document against explicit source bytes.
pub fn export_pdf_with_source(source: &[u8], document: &Document) -> Result<Vec<u8>> {
    ReflowEngine::default().export(source, document)
}

fn attached_source(document: &Document) -> Result<&[u8]> {
    document
        .metadata
        .original_bytes
        .as_deref()
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| Error::InvalidModel("document has no source PDF attached".to_string()))
}

/// Builder for parsing and exporting PDF documents.
///
/// # Example
///
/// ```no_run
/// use pdfblocks::Pdfblocks;
///
/// let pdf = Pdfblocks::new().lenient().sequential();
/// let doc = pdf.parse("document.pdf").unwrap();
/// let bytes = pdf.export(&doc).unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pdfblocks {
    parse_options: ParseOptions,
    reflow_options: ReflowOptions,
}

impl Pdfblocks {
    /// Create a builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip failing pages instead of failing the document.
    pub fn lenient(mut self) -> Self {
        self.parse_options = self.parse_options.lenient();
        self
    }

    /// Only classify the selected pages.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.parse_options = self.parse_options.with_pages(pages);
        self
    }

    /// Toggle parallel page classification.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parse_options = self.parse_options.with_parallel(parallel);
        self
    }

    /// Classify pages one after another.
    pub fn sequential(self) -> Self {
        self.with_parallel(false)
    }

    /// Points-to-layout scale factor.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.parse_options = self.parse_options.with_scale(scale);
        self
    }

    /// Classifier thresholds.
    pub fn with_classifier(mut self, config: ClassifierConfig) -> Self {
        self.parse_options = self.parse_options.with_classifier(config);
        self
    }

    /// Reflow constants used on export.
    pub fn with_reflow_options(mut self, options: ReflowOptions) -> Self {
        self.reflow_options = options;
        self
    }

    /// Parse options currently configured.
    pub fn parse_options(&self) -> &ParseOptions {
        &self.parse_options
    }

    /// Parse a PDF file.
    pub fn parse<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        parse_file_with_options(path, self.parse_options.clone())
    }

    /// Parse PDF bytes.
    pub fn parse_bytes(&self, data: &[u8]) -> Result<Document> {
        parse_bytes_with_options(data, self.parse_options.clone())
    }

    /// Export using the source bytes attached to `document`.
    pub fn export(&self, document: &Document) -> Result<Vec<u8>> {
        self.export_with_source(attached_source(document)?, document)
    }

    /// Export against explicit source bytes.
    pub fn export_with_source(&self, source: &[u8], document: &Document) -> Result<Vec<u8>> {
        ReflowEngine::new(self.reflow_options.clone()).export(source, document)
    }
}

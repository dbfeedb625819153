//! PDF parsing module: backend access, line building and block classification.

mod backend;
mod classifier;
mod content;
mod heading;
mod lines;
mod list_detector;
mod options;
mod paragraph;
mod patterns;
mod pdf_parser;
mod table_detector;

pub use backend::{
    parse_pdf_date, DocumentInfo, FontHandle, FontSet, LopdfBackend, PageContent, PageInfo,
    PdfBackend,
};
pub use classifier::{classify_page, post_process, FontStats, PageContext};
pub use content::{ContentInterpreter, FontEntry, ImagePlacement, Interpreted, Matrix};
pub use heading::HeadingDetector;
pub use lines::{build_lines, needs_space, place_run, GlyphRun, PlacedRun, TextLine};
pub use list_detector::{parse_marker, ListDetector, Marker};
pub use options::{ClassifierConfig, ErrorMode, PageSelection, ParseOptions};
pub use paragraph::{join_lines, ParagraphGrouper};
pub use patterns::{ensure_initialized, is_initialized};
pub use pdf_parser::PdfParser;
pub use table_detector::TableDetector;

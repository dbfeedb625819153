//! Parsing options and classifier thresholds.

use std::ops::RangeInclusive;

use crate::error::{Error, Result};

/// Options for parsing PDF documents.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Error handling mode for page-level failures
    pub error_mode: ErrorMode,

    /// Page selection (which pages to classify)
    pub pages: PageSelection,

    /// Whether to classify pages on the rayon pool
    pub parallel: bool,

    /// Layout pixels per PDF point
    pub scale: f32,

    /// Line builder and detector thresholds
    pub classifier: ClassifierConfig,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (failed pages become empty pages).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Set the render scale. Non-positive values are ignored.
    pub fn with_scale(mut self, scale: f32) -> Self {
        if scale > 0.0 && scale.is_finite() {
            self.scale = scale;
        }
        self
    }

    /// Replace the classifier thresholds.
    pub fn with_classifier(mut self, config: ClassifierConfig) -> Self {
        self.classifier = config;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            pages: PageSelection::All,
            parallel: false,
            scale: 1.0,
            classifier: ClassifierConfig::default(),
        }
    }
}

/// Error handling mode during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail the whole document when a page fails
    #[default]
    Strict,
    /// Log the failure and keep the page with no blocks
    Lenient,
}

/// Page selection for parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// A range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Specific pages (1-indexed)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        let number = |part: &str| -> Result<u32> {
            part.trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| Error::InvalidPageRange(s.to_string()))
        };

        if !s.contains(',') {
            if let Some((start, end)) = s.split_once('-') {
                let (start, end) = (number(start)?, number(end)?);
                if start > end {
                    return Err(Error::InvalidPageRange(s.to_string()));
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            match part.split_once('-') {
                Some((start, end)) => pages.extend(number(start)?..=number(end)?),
                None => pages.push(number(part)?),
            }
        }
        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}

/// Thresholds of the line builder and the four detector passes.
///
/// All distances are layout units. The defaults are empirically tuned;
/// changing one should keep the relative order of the others.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Max |Δy| between a run and its line anchor
    pub line_y_tolerance: f32,
    /// Gap ratio (of mean font size) below which no space is inserted
    pub tight_gap_ratio: f32,
    /// Gap ratio at or above which a space is always inserted
    pub word_gap_ratio: f32,

    /// Minimum rubric score for a heading
    pub heading_min_score: u32,
    /// Font must be at least this multiple of the page mean
    pub heading_size_ratio: f32,
    /// ...and at least this percentile of line font sizes
    pub heading_percentile: f32,
    /// Absolute fallback: mean plus this many points
    pub heading_abs_delta: f32,
    /// Max characters for the "short line" rubric item
    pub heading_max_len: usize,

    /// Horizontal gap that separates table columns
    pub table_column_gap: f32,
    /// X-origins are bucketed to multiples of this
    pub table_column_bucket: f32,
    /// Min rows of a table
    pub table_min_rows: usize,

    /// Indent that makes a line a list continuation, and the width of one nesting level
    pub list_indent: f32,
    /// Fewest marker lines that form a list
    pub list_min_items: usize,

    /// Max vertical gap inside a paragraph
    pub paragraph_max_gap: f32,
    /// Max font size difference inside a paragraph
    pub paragraph_max_font_delta: f32,

    /// Blocks narrower than this are discarded
    pub min_block_width: f32,
    /// Blocks shorter than this are discarded
    pub min_block_height: f32,
    /// Text blocks that trim to fewer characters are discarded
    pub min_text_chars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            line_y_tolerance: 5.0,
            tight_gap_ratio: 0.15,
            word_gap_ratio: 0.4,
            heading_min_score: 6,
            heading_size_ratio: 1.2,
            heading_percentile: 0.75,
            heading_abs_delta: 2.0,
            heading_max_len: 100,
            table_column_gap: 20.0,
            table_column_bucket: 10.0,
            table_min_rows: 2,
            list_indent: 20.0,
            list_min_items: 2,
            paragraph_max_gap: 25.0,
            paragraph_max_font_delta: 2.0,
            min_block_width: 10.0,
            min_block_height: 5.0,
            min_text_chars: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_builder() {
        let options = ParseOptions::new()
            .lenient()
            .with_parallel(true)
            .with_scale(1.5)
            .with_scale(-1.0);

        assert_eq!(options.error_mode, ErrorMode::Lenient);
        assert!(options.parallel);
        assert_eq!(options.scale, 1.5);
    }

    #[test]
    fn test_default_options() {
        let options = ParseOptions::default();
        assert_eq!(options.error_mode, ErrorMode::Strict);
        assert!(!options.parallel);
        assert_eq!(options.classifier.heading_min_score, 6);
        assert_eq!(options.classifier.paragraph_max_gap, 25.0);
    }

    #[test]
    fn test_page_selection_parse() {
        assert_eq!(PageSelection::parse("all").unwrap(), PageSelection::All);
        assert_eq!(
            PageSelection::parse("2-4").unwrap(),
            PageSelection::Range(2..=4)
        );
        assert_eq!(
            PageSelection::parse("5,1,3-4,1").unwrap(),
            PageSelection::Pages(vec![1, 3, 4, 5])
        );
        assert!(PageSelection::parse("4-2").is_err());
        assert!(PageSelection::parse("0").is_err());
        assert!(PageSelection::parse("x").is_err());
    }

    #[test]
    fn test_page_selection_includes() {
        let sel = PageSelection::Range(2..=3);
        assert!(!sel.includes(1));
        assert!(sel.includes(3));
        assert!(PageSelection::All.includes(99));
    }
}

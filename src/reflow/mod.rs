//! Reflow/re-render engine: edited blocks back into PDF content.
//!
//! For every edited block the engine covers the original footprint with a
//! white rectangle and lays the new content out inside it. Planning is
//! pure ([`ReflowEngine::plan_page`] returns [`DrawOp`]s); writing goes
//! through a [`PdfBackend`].

mod fonts;
mod geometry;
mod wrap;

pub use fonts::{encode_win_ansi, select_font, StandardFont};
pub use geometry::{layout_to_pdf, layout_top, pdf_bottom, pdf_to_layout, DrawOp, PdfRect};
pub use wrap::{chars_per_line, estimated_width, wrap_text_intelligently};

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::model::{Block, BlockContent, BlockType, Dimensions, Document, Page, TextAlign};
use crate::parser::{FontSet, LopdfBackend, PdfBackend};
use crate::util::Rgb;

/// Clamp rule for a recomputed font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeRule {
    pub min: f32,
    pub max: f32,
    /// Fraction of the block height
    pub ratio: f32,
}

impl SizeRule {
    /// `max(min, min(height * ratio, max))`
    pub fn apply(&self, block_height: f32) -> f32 {
        (block_height * self.ratio).min(self.max).max(self.min)
    }
}

/// Layout parameters of the reflow engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflowOptions {
    /// Cover rectangle padding on every side, in points
    pub cover_padding: f32,

    /// Font size rule for body blocks
    pub body_size: SizeRule,

    /// Font size rule for headings
    pub heading_size: SizeRule,

    /// Character width estimate; `None` uses the substitute font's own factor
    pub char_width_factor: Option<f32>,

    /// Line pitch as a multiple of the font size
    pub line_pitch: f32,

    /// Indentation per list nesting level, in points
    pub list_indent: f32,
}

impl ReflowOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force one character width estimate for every font.
    pub fn with_char_width_factor(mut self, factor: f32) -> Self {
        if factor > 0.0 && factor.is_finite() {
            self.char_width_factor = Some(factor);
        }
        self
    }

    pub fn with_cover_padding(mut self, padding: f32) -> Self {
        self.cover_padding = padding.max(0.0);
        self
    }

    pub fn with_line_pitch(mut self, pitch: f32) -> Self {
        if pitch > 0.0 && pitch.is_finite() {
            self.line_pitch = pitch;
        }
        self
    }
}

impl Default for ReflowOptions {
    fn default() -> Self {
        Self {
            cover_padding: 2.0,
            body_size: SizeRule {
                min: 8.0,
                max: 14.0,
                ratio: 0.6,
            },
            heading_size: SizeRule {
                min: 10.0,
                max: 18.0,
                ratio: 0.7,
            },
            char_width_factor: None,
            line_pitch: 1.2,
            list_indent: 20.0,
        }
    }
}

/// Plans and writes replacement content for edited blocks.
#[derive(Debug, Clone, Default)]
pub struct ReflowEngine {
    options: ReflowOptions,
}

impl ReflowEngine {
    pub fn new(options: ReflowOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReflowOptions {
        &self.options
    }

    /// Draw operations for every edited block of a page, in block order.
    pub fn plan_page(&self, page: &Page) -> Vec<DrawOp> {
        page.blocks
            .iter()
            .filter(|b| b.is_edited())
            .flat_map(|b| self.plan_block(b, &page.dimensions))
            .collect()
    }

    /// Draw operations replacing one block.
    ///
    /// Empty when the block's content trims to nothing: the original
    /// footprint is then left as it was.
    pub fn plan_block(&self, block: &Block, dims: &Dimensions) -> Vec<DrawOp> {
        let source_lines = self.source_lines(block);
        if source_lines.iter().all(|(_, l)| l.trim().is_empty()) {
            log::debug!("Block {}: empty content, nothing to draw", block.id);
            return Vec::new();
        }

        let rect = layout_to_pdf(&block.position, dims);
        let style = &block.style;
        let font = select_font(
            style.font_family.as_deref().unwrap_or_default(),
            style.font_weight,
            style.font_style,
        );
        let size = if block.block_type == BlockType::Heading {
            self.options.heading_size.apply(rect.height)
        } else {
            self.options.body_size.apply(rect.height)
        };
        let factor = self
            .options
            .char_width_factor
            .unwrap_or_else(|| font.char_width_factor());
        let color = match Rgb::from_hex(&style.color) {
            Some(c) if !c.is_near_white() => c,
            Some(_) => Rgb::BLACK,
            None => {
                log::warn!("Block {}: unreadable colour {:?}", block.id, style.color);
                Rgb::BLACK
            }
        };

        let lines: Vec<(f32, String)> = source_lines
            .iter()
            .flat_map(|(level, text)| {
                let indent = (*level as f32 * self.options.list_indent).min(rect.width / 2.0);
                wrap_text_intelligently(text, rect.width - indent, size, factor)
                    .into_iter()
                    .map(move |line| (indent, line))
            })
            .collect();

        let pitch = size * self.options.line_pitch;
        let offset = ((rect.height - lines.len() as f32 * pitch) / 2.0).max(0.0);
        let first_baseline = rect.top() - offset - size;

        let mut ops = vec![DrawOp::CoverRect(rect.expanded(self.options.cover_padding))];
        for (i, (indent, line)) in lines.into_iter().enumerate() {
            let y = first_baseline - i as f32 * pitch;
            // The first line is always drawn.
            if i > 0 && y < rect.y {
                log::debug!("Block {}: clipped after {} lines", block.id, i);
                break;
            }
            let free = (rect.width - indent - estimated_width(&line, size, factor)).max(0.0);
            let x = rect.x
                + indent
                + match style.text_align {
                    TextAlign::Center => free / 2.0,
                    TextAlign::Right => free,
                    TextAlign::Left | TextAlign::Justify => 0.0,
                };
            ops.push(DrawOp::Text {
                x,
                y,
                font,
                size,
                color,
                text: line,
            });
        }
        ops
    }

    /// Logical lines of a block before wrapping, with their nesting level.
    fn source_lines(&self, block: &Block) -> Vec<(u8, String)> {
        match &block.content {
            BlockContent::Text(text) => text.lines().map(|l| (0, l.to_string())).collect(),
            BlockContent::Table(table) => {
                table.rows.iter().map(|r| (0, r.joined("  "))).collect()
            }
            BlockContent::List(list) => list
                .items
                .iter()
                .map(|item| (item.level, format!("{} {}", item.marker, item.text)))
                .collect(),
            BlockContent::Image(_) => {
                log::warn!("Block {}: image blocks are not re-rendered", block.id);
                Vec::new()
            }
        }
    }

    /// Modified PDF bytes for `document`, read from `source`.
    ///
    /// Without edits the source bytes come back unchanged.
    pub fn export(&self, source: &[u8], document: &Document) -> Result<Vec<u8>> {
        if !document.has_edits() {
            log::info!("No edited blocks; returning the original bytes");
            return Ok(source.to_vec());
        }
        let mut backend = LopdfBackend::load_bytes(source)?;
        self.export_with(&mut backend, document)
    }

    /// Write every edited block through `backend` and serialize it.
    pub fn export_with<B: PdfBackend>(&self, backend: &mut B, document: &Document) -> Result<Vec<u8>> {
        let page_count = backend.page_count();
        let mut fonts = FontCache::default();
        let mut edited = 0;

        for page in &document.pages {
            if page.page_number > page_count {
                return Err(Error::PageOutOfRange(page.page_number, page_count));
            }
            let ops = self.plan_page(page);
            if ops.is_empty() {
                continue;
            }
            let ops = fonts.resolve(backend, ops);
            match backend.append_page_ops(page.page_number, &ops, fonts.handles()) {
                Ok(()) => edited += page.edited_blocks().count(),
                Err(e) => log::warn!("Page {}: skipping edits: {}", page.page_number, e),
            }
        }

        log::info!(
            "Re-rendered {} edited blocks with {} fonts",
            edited,
            fonts.handles().len()
        );
        backend.save()
    }
}

/// Per-export embed-once font cache.
#[derive(Debug, Default)]
struct FontCache {
    handles: FontSet,
    failed: HashSet<StandardFont>,
}

impl FontCache {
    fn handles(&self) -> &FontSet {
        &self.handles
    }

    /// Embed `font` unless already embedded; `false` if that failed now or before.
    fn ensure<B: PdfBackend>(&mut self, backend: &mut B, font: StandardFont) -> bool {
        if self.handles.contains_key(&font) {
            return true;
        }
        if self.failed.contains(&font) {
            return false;
        }
        match backend.embed_font(font) {
            Ok(handle) => {
                self.handles.insert(font, handle);
                true
            }
            Err(e) => {
                log::warn!("Embedding {} failed: {}", font, e);
                self.failed.insert(font);
                false
            }
        }
    }

    /// Substitute fonts that cannot be embedded. Text whose font and the
    /// Helvetica fallback both fail is dropped.
    fn resolve<B: PdfBackend>(&mut self, backend: &mut B, ops: Vec<DrawOp>) -> Vec<DrawOp> {
        ops.into_iter()
            .filter_map(|op| match op {
                DrawOp::Text {
                    x,
                    y,
                    font,
                    size,
                    color,
                    text,
                } => {
                    let font = if self.ensure(backend, font) {
                        font
                    } else if self.ensure(backend, StandardFont::Helvetica) {
                        log::warn!("Falling back to Helvetica for {}", font);
                        StandardFont::Helvetica
                    } else {
                        log::warn!("No font available; skipping line {:?}", text);
                        return None;
                    };
                    Some(DrawOp::Text {
                        x,
                        y,
                        font,
                        size,
                        color,
                        text,
                    })
                }
                cover => Some(cover),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockStyle, List, ListItem, ListType, Position, Table};
    use crate::parser::{DocumentInfo, FontHandle, PageContent, PageInfo};
    use crate::util::FontWeight;

    fn edited(content: BlockContent, block_type: BlockType, position: Position) -> Block {
        let mut block = Block::new(
            "p1-b0",
            block_type,
            content,
            position,
            BlockStyle::default(),
            0.9,
        )
        .unwrap();
        block.mark_edited();
        block
    }

    fn texts(ops: &[DrawOp]) -> Vec<&str> {
        ops.iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                DrawOp::CoverRect(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_hello_world_block() {
        let block = edited(
            BlockContent::Text("Hello world".to_string()),
            BlockType::Paragraph,
            Position::new(72.0, 100.0, 100.0, 20.0),
        );
        let ops = ReflowEngine::default().plan_block(&block, &Dimensions::default());
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0], DrawOp::CoverRect(PdfRect::new(70.0, 670.0, 104.0, 24.0)));
        match &ops[1] {
            DrawOp::Text {
                x,
                font,
                size,
                color,
                text,
                ..
            } => {
                assert_eq!(*x, 72.0);
                assert_eq!(*font, StandardFont::Helvetica);
                assert_eq!(*size, 12.0);
                assert_eq!(*color, Rgb::BLACK);
                assert_eq!(text, "Hello world");
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_edit_draws_nothing() {
        let block = edited(
            BlockContent::Text("   ".to_string()),
            BlockType::Paragraph,
            Position::new(72.0, 100.0, 100.0, 20.0),
        );
        assert!(ReflowEngine::default()
            .plan_block(&block, &Dimensions::default())
            .is_empty());
    }

    #[test]
    fn test_font_size_rules() {
        let options = ReflowOptions::default();
        assert_eq!(options.body_size.apply(10.0), 8.0);
        assert_eq!(options.body_size.apply(20.0), 12.0);
        assert_eq!(options.body_size.apply(100.0), 14.0);
        assert_eq!(options.heading_size.apply(10.0), 10.0);
        assert_eq!(options.heading_size.apply(20.0), 14.0);
        assert_eq!(options.heading_size.apply(40.0), 18.0);
    }

    #[test]
    fn test_near_white_becomes_black_and_bold_serif() {
        let mut block = edited(
            BlockContent::Text("Title".to_string()),
            BlockType::Heading,
            Position::new(72.0, 100.0, 300.0, 30.0),
        );
        block.style.color = "#fafafa".to_string();
        block.style.font_family = Some("Times New Roman".to_string());
        block.style.font_weight = FontWeight::Bold;
        let ops = ReflowEngine::default().plan_block(&block, &Dimensions::default());
        let DrawOp::Text { font, color, size, .. } = &ops[1] else {
            panic!("expected text");
        };
        assert_eq!(*font, StandardFont::TimesBold);
        assert_eq!(*color, Rgb::BLACK);
        assert_eq!(*size, 18.0);
    }

    #[test]
    fn test_lines_are_centered_and_clipped() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let block = edited(
            BlockContent::Text(text.to_string()),
            BlockType::Paragraph,
            Position::new(0.0, 0.0, 60.0, 20.0),
        );
        let ops = ReflowEngine::default().plan_block(&block, &Dimensions::default());
        let rect = layout_to_pdf(&block.position, &Dimensions::default());
        let baselines: Vec<f32> = ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { y, .. } => Some(*y),
                DrawOp::CoverRect(_) => None,
            })
            .collect();
        // Too many lines to fit: no centering offset, and the run stops at the bottom edge.
        assert!(!baselines.is_empty());
        assert_eq!(baselines[0], rect.top() - 12.0);
        assert!(baselines.iter().skip(1).all(|y| *y >= rect.y));
        assert!(baselines.len() < 12);
    }

    #[test]
    fn test_short_block_still_draws_first_line() {
        let block = edited(
            BlockContent::Text("Footnote marker text".to_string()),
            BlockType::Paragraph,
            Position::new(72.0, 100.0, 300.0, 5.0),
        );
        let ops = ReflowEngine::default().plan_block(&block, &Dimensions::default());
        let rect = layout_to_pdf(&block.position, &Dimensions::default());
        let baselines: Vec<f32> = ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { y, .. } => Some(*y),
                DrawOp::CoverRect(_) => None,
            })
            .collect();
        // The 8pt minimum does not fit in 5pt, yet the covered area gets its text.
        assert_eq!(baselines.len(), 1);
        assert!(baselines[0] < rect.y);
        assert_eq!(ops.iter().filter(|op| op.is_cover()).count(), 1);
    }

    #[test]
    fn test_structured_content_lines() {
        let engine = ReflowEngine::default();
        let table = edited(
            BlockContent::Table(Table::from_rows(vec![vec!["A", "1"], vec!["B", "2"]], false)),
            BlockType::Table,
            Position::new(72.0, 100.0, 400.0, 60.0),
        );
        let ops = engine.plan_block(&table, &Dimensions::default());
        assert_eq!(texts(&ops), vec!["A  1", "B  2"]);

        let mut list = List::new(ListType::Bullet);
        list.push(ListItem::new("•", "Top", 0));
        list.push(ListItem::new("-", "Nested", 1));
        let block = edited(
            BlockContent::List(list),
            BlockType::List,
            Position::new(72.0, 100.0, 400.0, 60.0),
        );
        let ops = engine.plan_block(&block, &Dimensions::default());
        assert_eq!(texts(&ops), vec!["• Top", "- Nested"]);
        let xs: Vec<f32> = ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { x, .. } => Some(*x),
                DrawOp::CoverRect(_) => None,
            })
            .collect();
        assert_eq!(xs, vec![72.0, 92.0]);
    }

    #[test]
    fn test_explicit_newlines() {
        let block = edited(
            BlockContent::Text("first\nsecond".to_string()),
            BlockType::Paragraph,
            Position::new(72.0, 100.0, 400.0, 60.0),
        );
        let ops = ReflowEngine::default().plan_block(&block, &Dimensions::default());
        assert_eq!(texts(&ops), vec!["first", "second"]);
    }

    /// Backend whose font embedding fails for everything but Helvetica.
    #[derive(Default)]
    struct FakeBackend {
        pages: u32,
        broken_page: Option<u32>,
        embedded: Vec<StandardFont>,
        appended: Vec<(u32, Vec<DrawOp>)>,
    }

    impl PdfBackend for FakeBackend {
        fn page_count(&self) -> u32 {
            self.pages.max(1)
        }

        fn page_info(&self, _page: u32) -> Result<PageInfo> {
            Ok(PageInfo::default())
        }

        fn page_content(&self, _page: u32) -> Result<PageContent> {
            Ok(PageContent::default())
        }

        fn metadata(&self) -> DocumentInfo {
            DocumentInfo::default()
        }

        fn embed_font(&mut self, font: StandardFont) -> Result<FontHandle> {
            if font != StandardFont::Helvetica {
                return Err(Error::FontEmbed(font.to_string()));
            }
            self.embedded.push(font);
            Ok(FontHandle::new("RF1", (1, 0)))
        }

        fn append_page_ops(&mut self, page: u32, ops: &[DrawOp], _fonts: &FontSet) -> Result<()> {
            if self.broken_page == Some(page) {
                return Err(Error::Render(format!("corrupt page {page}")));
            }
            self.appended.push((page, ops.to_vec()));
            Ok(())
        }

        fn save(&mut self) -> Result<Vec<u8>> {
            Ok(b"%PDF-1.7 fake".to_vec())
        }
    }

    #[test]
    fn test_font_fallback_embeds_once() {
        let mut page = Page::new(1, Dimensions::default());
        for (i, family) in ["Courier", "Helvetica"].iter().enumerate() {
            let mut block = edited(
                BlockContent::Text(format!("Line {i}")),
                BlockType::Paragraph,
                Position::new(72.0, 100.0 + i as f32 * 40.0, 300.0, 20.0),
            );
            block.id = format!("p1-b{i}");
            block.style.font_family = Some(family.to_string());
            page.add_block(block).unwrap();
        }
        let mut doc = Document::new();
        doc.add_page(page);

        let mut backend = FakeBackend::default();
        let bytes = ReflowEngine::default().export_with(&mut backend, &doc).unwrap();
        assert_eq!(bytes, b"%PDF-1.7 fake");
        assert_eq!(backend.embedded, vec![StandardFont::Helvetica]);
        let (_, ops) = &backend.appended[0];
        assert!(ops
            .iter()
            .filter_map(DrawOp::font)
            .all(|f| f == StandardFont::Helvetica));
        assert_eq!(ops.iter().filter(|op| op.is_cover()).count(), 2);
    }

    #[test]
    fn test_failing_page_is_skipped() {
        let mut doc = Document::new();
        for number in 1..=2 {
            let mut page = Page::new(number, Dimensions::default());
            let mut block = edited(
                BlockContent::Text(format!("Page {number} text")),
                BlockType::Paragraph,
                Position::new(72.0, 100.0, 300.0, 20.0),
            );
            block.id = format!("p{number}-b0");
            page.add_block(block).unwrap();
            doc.add_page(page);
        }

        let mut backend = FakeBackend {
            pages: 2,
            broken_page: Some(1),
            ..FakeBackend::default()
        };
        let bytes = ReflowEngine::default().export_with(&mut backend, &doc).unwrap();
        assert_eq!(bytes, b"%PDF-1.7 fake");
        let pages: Vec<u32> = backend.appended.iter().map(|(p, _)| *p).collect();
        assert_eq!(pages, vec![2]);
        assert_eq!(texts(&backend.appended[0].1), vec!["Page 2 text"]);
    }

    #[test]
    fn test_export_without_edits_returns_source() {
        let doc = Document::new();
        let source = b"%PDF-1.4 untouched".to_vec();
        assert_eq!(ReflowEngine::default().export(&source, &doc).unwrap(), source);
    }
}

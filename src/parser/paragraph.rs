//! Paragraph grouping: the catch-all last pass.

use std::cmp::Ordering;

use super::classifier::{bounds_of, provenance_of, style_of, PageContext};
use super::lines::TextLine;
use super::options::ClassifierConfig;
use crate::model::{Block, BlockContent, BlockType, PARAGRAPH_CONFIDENCE};

/// Lines shorter than this never pull following lines into their paragraph.
const MIN_OPENING_CHARS: usize = 3;

/// Last detector pass. Claims every remaining line.
pub struct ParagraphGrouper<'a> {
    config: &'a ClassifierConfig,
}

impl<'a> ParagraphGrouper<'a> {
    pub fn new(config: &'a ClassifierConfig) -> Self {
        Self { config }
    }

    /// Merge the remaining lines into paragraph blocks.
    pub fn group(&self, mut lines: Vec<TextLine>, ctx: &PageContext) -> Vec<Block> {
        lines.sort_by(|a, b| {
            a.y()
                .partial_cmp(&b.y())
                .unwrap_or(Ordering::Equal)
                .then(a.x().partial_cmp(&b.x()).unwrap_or(Ordering::Equal))
        });

        let mut groups: Vec<Vec<&TextLine>> = Vec::new();
        for line in &lines {
            match groups.last_mut() {
                Some(current) if self.continues(current, line, ctx) => current.push(line),
                _ => groups.push(vec![line]),
            }
        }

        groups
            .iter()
            .filter_map(|group| self.build(group, ctx))
            .collect()
    }

    /// Whether `line` extends the paragraph in `current`.
    fn continues(&self, current: &[&TextLine], line: &TextLine, ctx: &PageContext) -> bool {
        let (Some(first), Some(prev)) = (current.first(), current.last()) else {
            return false;
        };
        if first.char_len() < MIN_OPENING_CHARS {
            return false;
        }
        let gap = line.y() - prev.bounds.bottom();
        gap <= self.config.paragraph_max_gap
            && ctx.points((line.font_size - prev.font_size).abs())
                <= self.config.paragraph_max_font_delta
    }

    fn build(&self, lines: &[&TextLine], ctx: &PageContext) -> Option<Block> {
        let text = join_lines(lines.iter().map(|l| l.text.as_str()));
        let mut block = Block::new(
            String::new(),
            BlockType::Paragraph,
            BlockContent::Text(text),
            bounds_of(lines),
            style_of(lines, ctx),
            PARAGRAPH_CONFIDENCE,
        )
        .ok()?;
        block.metadata.text_runs = provenance_of(lines);
        Some(block)
    }
}

/// Join lines with spaces, undoing end-of-line hyphenation.
///
/// `exam-` followed by a line starting in lowercase becomes `example`.
pub fn join_lines<'s>(lines: impl IntoIterator<Item = &'s str>) -> String {
    let mut out = String::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if out.is_empty() {
            out.push_str(line);
            continue;
        }
        let hyphenated = out.ends_with('-')
            && out
                .chars()
                .rev()
                .nth(1)
                .is_some_and(char::is_alphabetic)
            && line.chars().next().is_some_and(char::is_lowercase);
        if hyphenated {
            out.pop();
        } else {
            out.push(' ');
        }
        out.push_str(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lines::{build_lines, GlyphRun};

    fn ctx() -> PageContext {
        PageContext {
            page_number: 1,
            width: 612.0,
            height: 792.0,
            scale: 1.0,
        }
    }

    fn group(runs: &[GlyphRun]) -> Vec<Block> {
        let config = ClassifierConfig::default();
        let lines = build_lines(runs, 792.0, 1.0, &config);
        ParagraphGrouper::new(&config).group(lines, &ctx())
    }

    #[test]
    fn test_join_lines() {
        assert_eq!(join_lines(["one", "two"]), "one two");
        assert_eq!(join_lines(["an exam-", "ple here"]), "an example here");
        assert_eq!(join_lines(["well-", "Known"]), "well- Known");
        assert_eq!(join_lines(["  ", "solo "]), "solo");
    }

    #[test]
    fn test_gap_splits_paragraphs() {
        let blocks = group(&[
            GlyphRun::at("First paragraph line", 72.0, 700.0, 100.0, 11.0, "Helvetica"),
            GlyphRun::at("continues here", 72.0, 686.0, 80.0, 11.0, "Helvetica"),
            GlyphRun::at("Second paragraph", 72.0, 620.0, 90.0, 11.0, "Helvetica"),
        ]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text(), Some("First paragraph line continues here"));
        assert_eq!(blocks[1].text(), Some("Second paragraph"));
    }

    #[test]
    fn test_font_change_splits_paragraphs() {
        let blocks = group(&[
            GlyphRun::at("Body text line", 72.0, 700.0, 100.0, 11.0, "Helvetica"),
            GlyphRun::at("Caption in small type", 72.0, 686.0, 80.0, 7.0, "Helvetica"),
        ]);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_font_delta_is_in_points() {
        let config = ClassifierConfig::default();
        // 11pt and 12.5pt text: 1.5pt apart, one paragraph at any scale.
        let runs = [
            GlyphRun::at("Body text line", 72.0, 700.0, 100.0, 11.0, "Helvetica"),
            GlyphRun::at("slightly larger text", 72.0, 686.0, 110.0, 12.5, "Helvetica"),
        ];
        let lines = build_lines(&runs, 792.0, 2.0, &config);
        let scaled = PageContext {
            width: 1224.0,
            height: 1584.0,
            scale: 2.0,
            ..ctx()
        };
        let blocks = ParagraphGrouper::new(&config).group(lines, &scaled);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_short_opening_line_stands_alone() {
        let blocks = group(&[
            GlyphRun::at("ab", 72.0, 700.0, 12.0, 11.0, "Helvetica"),
            GlyphRun::at("Following text", 72.0, 686.0, 80.0, 11.0, "Helvetica"),
        ]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text(), Some("ab"));
    }
}

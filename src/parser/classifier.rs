//! Block classifier: four detector passes over a page's lines.
//!
//! Each pass takes the lines the earlier passes left unclaimed and returns
//! `(claimed blocks, remaining lines)`, so the order heading → table →
//! list → paragraph is encoded in the data flow rather than in a shared
//! "processed" set.

use std::cmp::Ordering;

use super::heading::HeadingDetector;
use super::lines::{dominant_color, TextLine};
use super::list_detector::ListDetector;
use super::options::ClassifierConfig;
use super::paragraph::ParagraphGrouper;
use super::table_detector::TableDetector;
use crate::model::{Block, BlockStyle, Position, RunProvenance, TextAlign};
use crate::util::{font_family, infer_font_style, infer_font_weight, FontWeight};

/// Page facts every detector may consult.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageContext {
    pub page_number: u32,
    /// Layout width of the page
    pub width: f32,
    /// Layout height of the page
    pub height: f32,
    /// Layout pixels per PDF point
    pub scale: f32,
}

impl PageContext {
    /// Convert a layout length back to PDF points.
    pub fn points(&self, layout: f32) -> f32 {
        if self.scale > 0.0 {
            layout / self.scale
        } else {
            layout
        }
    }
}

/// Font-size distribution of a page's lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontStats {
    pub mean: f32,
    /// 75th percentile (nearest rank) by default
    pub percentile: f32,
}

impl FontStats {
    /// Compute over the line font sizes. `None` for a page without lines.
    pub fn from_lines(lines: &[TextLine], percentile: f32) -> Option<Self> {
        if lines.is_empty() {
            return None;
        }
        let mut sizes: Vec<f32> = lines.iter().map(|l| l.font_size).collect();
        sizes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let mean = sizes.iter().sum::<f32>() / sizes.len() as f32;
        let rank = ((percentile.clamp(0.0, 1.0) * sizes.len() as f32).ceil() as usize).max(1);
        Some(Self {
            mean,
            percentile: sizes[rank.min(sizes.len()) - 1],
        })
    }
}

/// Classify one page.
///
/// `extra` carries blocks that did not come from text lines (image
/// placements); they go through the same post-processing.
pub fn classify_page(
    lines: Vec<TextLine>,
    extra: Vec<Block>,
    ctx: &PageContext,
    config: &ClassifierConfig,
) -> Vec<Block> {
    let mut blocks = extra;

    if let Some(stats) = FontStats::from_lines(&lines, config.heading_percentile) {
        log::debug!(
            "Page {}: {} lines, mean font {:.1}, p{:.0} {:.1}",
            ctx.page_number,
            lines.len(),
            stats.mean,
            config.heading_percentile * 100.0,
            stats.percentile
        );

        let (headings, rest) = HeadingDetector::new(config, &stats)
            .with_scale(ctx.scale)
            .detect(lines, ctx);
        let (tables, rest) = TableDetector::new(config).detect(rest, ctx);
        let (lists, rest) = ListDetector::new(config).detect(rest, ctx);
        let paragraphs = ParagraphGrouper::new(config).group(rest, ctx);

        log::debug!(
            "Page {}: {} headings, {} tables, {} lists, {} paragraphs",
            ctx.page_number,
            headings.len(),
            tables.len(),
            lists.len(),
            paragraphs.len()
        );

        blocks.extend(headings);
        blocks.extend(tables);
        blocks.extend(lists);
        blocks.extend(paragraphs);
    }

    post_process(blocks, ctx, config)
}

/// Drop noise, sort by `(y, x)` and assign `p{page}-b{n}` ids.
pub fn post_process(blocks: Vec<Block>, ctx: &PageContext, config: &ClassifierConfig) -> Vec<Block> {
    let mut kept: Vec<Block> = blocks
        .into_iter()
        .filter(|b| {
            let small = b.position.width < config.min_block_width
                || b.position.height < config.min_block_height;
            let short = b.block_type.is_textual()
                && b.plain_text().trim().chars().count() < config.min_text_chars;
            if small || short {
                log::debug!(
                    "Page {}: dropping {:?} block {:?}",
                    ctx.page_number,
                    b.block_type,
                    b.position
                );
            }
            !(small || short)
        })
        .collect();

    kept.sort_by(|a, b| {
        a.position
            .y
            .partial_cmp(&b.position.y)
            .unwrap_or(Ordering::Equal)
            .then(
                a.position
                    .x
                    .partial_cmp(&b.position.x)
                    .unwrap_or(Ordering::Equal),
            )
    });

    for (i, block) in kept.iter_mut().enumerate() {
        block.id = format!("p{}-b{}", ctx.page_number, i);
    }
    kept
}

/// Union of the line bounds.
pub(crate) fn bounds_of(lines: &[&TextLine]) -> Position {
    lines
        .iter()
        .map(|l| l.bounds)
        .reduce(|a, b| a.union(&b))
        .unwrap_or_default()
        .clamped()
}

/// Provenance records of every run on the lines.
pub(crate) fn provenance_of(lines: &[&TextLine]) -> Vec<RunProvenance> {
    lines
        .iter()
        .flat_map(|l| l.runs.iter().map(|r| r.provenance()))
        .collect()
}

/// Style of a block built from `lines`.
pub(crate) fn style_of(lines: &[&TextLine], ctx: &PageContext) -> BlockStyle {
    let Some(first) = lines.first() else {
        return BlockStyle::default();
    };
    let font_size = lines.iter().map(|l| l.font_size).sum::<f32>() / lines.len() as f32;

    // Font of the longest run stands in for the block's face.
    let font_name = lines
        .iter()
        .flat_map(|l| l.runs.iter())
        .max_by_key(|r| r.text.chars().count())
        .map(|r| r.font_name.as_str())
        .unwrap_or_default();

    let mut font_weight = infer_font_weight(font_name, ctx.points(font_size));
    if lines.iter().all(|l| l.is_bold()) {
        font_weight = FontWeight::Bold;
    }

    let line_height = if lines.len() > 1 && font_size > 0.0 {
        let span = lines[lines.len() - 1].y() - first.y();
        (span / (lines.len() - 1) as f32 / font_size).max(1.0)
    } else {
        1.2
    };

    BlockStyle {
        font_size,
        font_weight,
        font_style: infer_font_style(font_name),
        font_family: Some(font_family(font_name)).filter(|f| !f.is_empty()),
        text_align: infer_alignment(lines, ctx),
        color: dominant_color(lines.iter().flat_map(|l| l.runs.iter())).to_hex(),
        line_height,
        heading_level: None,
        list_type: None,
    }
}

/// Alignment from line edges relative to the page.
fn infer_alignment(lines: &[&TextLine], ctx: &PageContext) -> TextAlign {
    if ctx.width <= 0.0 || lines.is_empty() {
        return TextAlign::Left;
    }
    let tolerance = 2.0;
    let page_center = ctx.width / 2.0;
    let centered = lines.iter().all(|l| {
        let center = l.x() + l.bounds.width / 2.0;
        (center - page_center).abs() <= ctx.width * 0.02 && l.x() > ctx.width * 0.15
    });
    if centered {
        return TextAlign::Center;
    }
    if lines.len() < 2 {
        return TextAlign::Left;
    }

    let left_spread = spread(lines.iter().map(|l| l.x()));
    let right_spread = spread(lines.iter().map(|l| l.bounds.right()));
    let body_right_spread = spread(lines[..lines.len() - 1].iter().map(|l| l.bounds.right()));

    if left_spread > tolerance && right_spread <= tolerance {
        TextAlign::Right
    } else if lines.len() >= 3 && left_spread <= tolerance && body_right_spread <= tolerance {
        TextAlign::Justify
    } else {
        TextAlign::Left
    }
}

fn spread(values: impl Iterator<Item = f32>) -> f32 {
    let (lo, hi) = values.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    hi - lo
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockContent, BlockType};
    use crate::parser::lines::{build_lines, GlyphRun};

    fn ctx() -> PageContext {
        PageContext {
            page_number: 1,
            width: 612.0,
            height: 792.0,
            scale: 1.0,
        }
    }

    fn classify(runs: Vec<GlyphRun>) -> Vec<Block> {
        let config = ClassifierConfig::default();
        let lines = build_lines(&runs, 792.0, 1.0, &config);
        classify_page(lines, Vec::new(), &ctx(), &config)
    }

    #[test]
    fn test_font_stats_percentile() {
        let runs: Vec<GlyphRun> = [11.0, 11.0, 11.0, 24.0]
            .iter()
            .enumerate()
            .map(|(i, s)| GlyphRun::at("Some text", 72.0, 700.0 - i as f32 * 40.0, 60.0, *s, "F"))
            .collect();
        let lines = build_lines(&runs, 792.0, 1.0, &ClassifierConfig::default());
        let stats = FontStats::from_lines(&lines, 0.75).unwrap();
        assert_eq!(stats.mean, 14.25);
        assert_eq!(stats.percentile, 11.0);
        assert!(FontStats::from_lines(&[], 0.75).is_none());
    }

    #[test]
    fn test_heading_then_paragraph() {
        let blocks = classify(vec![
            GlyphRun::at("Quarterly Report", 72.0, 720.0, 200.0, 24.0, "Helvetica"),
            GlyphRun::at("Revenue grew in every region this", 72.0, 680.0, 180.0, 11.0, "Helvetica"),
            GlyphRun::at("quarter, led by strong demand.", 72.0, 666.0, 170.0, 11.0, "Helvetica"),
        ]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].block_type, BlockType::Heading);
        assert_eq!(blocks[0].style.heading_level, Some(1));
        assert_eq!(blocks[0].id, "p1-b0");
        assert_eq!(blocks[1].block_type, BlockType::Paragraph);
        assert_eq!(
            blocks[1].content,
            BlockContent::Text(
                "Revenue grew in every region this quarter, led by strong demand.".into()
            )
        );
        assert_eq!(blocks[1].id, "p1-b1");
    }

    #[test]
    fn test_classification_is_idempotent() {
        let runs = vec![
            GlyphRun::at("Overview", 72.0, 720.0, 80.0, 20.0, "Helvetica-Bold"),
            GlyphRun::at("1. First item", 72.0, 690.0, 70.0, 11.0, "Helvetica"),
            GlyphRun::at("2. Second item", 72.0, 676.0, 75.0, 11.0, "Helvetica"),
            GlyphRun::at("Closing words for the page.", 72.0, 640.0, 140.0, 11.0, "Helvetica"),
        ];
        let a = classify(runs.clone());
        let b = classify(runs);
        assert_eq!(a, b);
        let types: Vec<BlockType> = a.iter().map(|b| b.block_type).collect();
        assert_eq!(
            types,
            vec![BlockType::Heading, BlockType::List, BlockType::Paragraph]
        );
    }

    #[test]
    fn test_scaled_body_text_keeps_normal_weight() {
        let config = ClassifierConfig::default();
        let runs = vec![
            GlyphRun::at("Body copy set in ten point type", 72.0, 700.0, 150.0, 10.0, "Helvetica"),
            GlyphRun::at("across two lines of the page.", 72.0, 688.0, 140.0, 10.0, "Helvetica"),
        ];
        let lines = build_lines(&runs, 792.0, 2.0, &config);
        let scaled = PageContext {
            width: 1224.0,
            height: 1584.0,
            scale: 2.0,
            ..ctx()
        };
        let blocks = classify_page(lines, Vec::new(), &scaled, &config);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block_type, BlockType::Paragraph);
        assert_eq!(blocks[0].style.font_size, 20.0);
        assert_eq!(blocks[0].style.font_weight, FontWeight::Normal);
    }

    #[test]
    fn test_hanging_marker_list_is_not_table() {
        let config = ClassifierConfig::default();
        let mut runs = Vec::new();
        for (i, item) in ["First item", "Second item", "Third item"].iter().enumerate() {
            let y = 700.0 - i as f32 * 14.0;
            runs.push(GlyphRun::at(format!("{}.", i + 1), 72.0, y, 6.0, 11.0, "Helvetica"));
            runs.push(GlyphRun::at(*item, 100.0, y, 60.0, 11.0, "Helvetica"));
        }
        let lines = build_lines(&runs, 792.0, 1.0, &config);
        let blocks = classify_page(lines, Vec::new(), &ctx(), &config);
        let types: Vec<BlockType> = blocks.iter().map(|b| b.block_type).collect();
        assert_eq!(types, vec![BlockType::List]);
    }

    #[test]
    fn test_post_process_drops_noise() {
        let config = ClassifierConfig::default();
        let tiny = Block::new(
            "",
            BlockType::Paragraph,
            BlockContent::Text("Visible text".into()),
            Position::new(0.0, 0.0, 8.0, 12.0),
            BlockStyle::default(),
            0.9,
        )
        .unwrap();
        let short = Block::new(
            "",
            BlockType::Paragraph,
            BlockContent::Text(" ab ".into()),
            Position::new(0.0, 0.0, 80.0, 12.0),
            BlockStyle::default(),
            0.9,
        )
        .unwrap();
        let kept = Block::new(
            "",
            BlockType::Paragraph,
            BlockContent::Text("Kept".into()),
            Position::new(0.0, 30.0, 80.0, 12.0),
            BlockStyle::default(),
            0.9,
        )
        .unwrap();
        let out = post_process(vec![tiny, short, kept], &ctx(), &config);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "p1-b0");
    }

    #[test]
    fn test_alignment() {
        let config = ClassifierConfig::default();
        let centered = build_lines(
            &[GlyphRun::at("Centered title", 256.0, 700.0, 100.0, 12.0, "F")],
            792.0,
            1.0,
            &config,
        );
        let refs: Vec<&TextLine> = centered.iter().collect();
        assert_eq!(infer_alignment(&refs, &ctx()), TextAlign::Center);

        let right = build_lines(
            &[
                GlyphRun::at("short", 440.0, 700.0, 100.0, 12.0, "F"),
                GlyphRun::at("a longer line", 340.0, 686.0, 200.0, 12.0, "F"),
            ],
            792.0,
            1.0,
            &config,
        );
        let refs: Vec<&TextLine> = right.iter().collect();
        assert_eq!(infer_alignment(&refs, &ctx()), TextAlign::Right);
    }
}

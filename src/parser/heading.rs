//! Heading detection by weighted rubric.

use std::collections::BTreeSet;

use super::classifier::{bounds_of, provenance_of, style_of, FontStats, PageContext};
use super::lines::TextLine;
use super::options::ClassifierConfig;
use super::patterns::patterns;
use crate::model::{Block, BlockContent, BlockType, HEADING_CONFIDENCE};
use crate::util::FontWeight;

/// Rubric weights.
const LARGE_FONT: u32 = 4;
const SHORT_LINE: u32 = 2;
const BOLD: u32 = 3;
const NUMBERED: u32 = 2;
const ALL_CAPS: u32 = 2;
const CAPITALIZED: u32 = 1;
const KEYWORD: u32 = 3;

/// First detector pass. Claims heading lines.
pub struct HeadingDetector<'a> {
    config: &'a ClassifierConfig,
    stats: &'a FontStats,
    scale: f32,
}

impl<'a> HeadingDetector<'a> {
    pub fn new(config: &'a ClassifierConfig, stats: &'a FontStats) -> Self {
        Self {
            config,
            stats,
            scale: 1.0,
        }
    }

    /// Layout pixels per point of the sizes in `stats`.
    pub fn with_scale(mut self, scale: f32) -> Self {
        if scale > 0.0 {
            self.scale = scale;
        }
        self
    }

    /// Whether a font size counts as large relative to the page body.
    ///
    /// The absolute delta is in points, so it grows with the layout scale.
    pub fn is_large(&self, font_size: f32) -> bool {
        let relative = font_size >= self.config.heading_size_ratio * self.stats.mean
            && font_size >= self.stats.percentile;
        relative || font_size >= self.stats.mean + self.config.heading_abs_delta * self.scale
    }

    /// Rubric score of a line.
    pub fn score(&self, line: &TextLine) -> u32 {
        let text = line.text.trim();
        let mut score = 0;

        if self.is_large(line.font_size) {
            score += LARGE_FONT;
        }
        if text.chars().count() <= self.config.heading_max_len {
            score += SHORT_LINE;
        }
        if line.is_bold() {
            score += BOLD;
        }
        if patterns().numbering.is_match(text) {
            score += NUMBERED;
        }
        if is_all_caps(text) {
            score += ALL_CAPS;
        }
        if text.chars().next().is_some_and(char::is_uppercase) {
            score += CAPITALIZED;
        }
        if patterns().heading_keyword.is_match(text) {
            score += KEYWORD;
        }
        score
    }

    /// Split `lines` into heading blocks and the lines left for later passes.
    pub fn detect(&self, lines: Vec<TextLine>, ctx: &PageContext) -> (Vec<Block>, Vec<TextLine>) {
        let (headings, rest): (Vec<TextLine>, Vec<TextLine>) = lines.into_iter().partition(|l| {
            let score = self.score(l);
            let heading = score >= self.config.heading_min_score && self.is_large(l.font_size);
            if heading {
                log::debug!("Heading candidate {:?} (score {})", l.text, score);
            }
            heading
        });

        // Distinct heading sizes, largest first, keyed at 0.1pt resolution.
        let sizes: BTreeSet<i32> = headings
            .iter()
            .map(|l| size_key(l.font_size))
            .collect();
        let ranked: Vec<i32> = sizes.into_iter().rev().collect();

        let blocks = headings
            .iter()
            .filter_map(|line| {
                let rank = ranked
                    .iter()
                    .position(|k| *k == size_key(line.font_size))
                    .unwrap_or(0);
                let level = heading_level(rank, &line.text);
                let lines = [line];
                let mut style = style_of(&lines, ctx);
                style.heading_level = Some(level);
                if line.is_bold() {
                    style.font_weight = FontWeight::Bold;
                }
                let mut block = Block::new(
                    String::new(),
                    BlockType::Heading,
                    BlockContent::Text(line.text.trim().to_string()),
                    bounds_of(&lines),
                    style,
                    HEADING_CONFIDENCE,
                )
                .ok()?;
                block.metadata.text_runs = provenance_of(&lines);
                Some(block)
            })
            .collect();

        (blocks, rest)
    }
}

fn size_key(font_size: f32) -> i32 {
    (font_size * 10.0).round() as i32
}

/// Level from the size rank (0 = largest), capped by numbering depth.
///
/// `"1. Title"` caps at 2, `"1.1. Title"` at 3.
fn heading_level(rank: usize, text: &str) -> u8 {
    let mut level = (rank + 1).min(6) as u8;
    if let Some(caps) = patterns().numbering.captures(text.trim()) {
        let depth = caps[1].split('.').count() as u8;
        level = level.min(depth + 1);
    }
    level
}

/// Every letter uppercase, at least one letter, longer than three characters.
fn is_all_caps(text: &str) -> bool {
    text.chars().count() > 3
        && text.chars().any(char::is_alphabetic)
        && text
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(char::is_uppercase)
}

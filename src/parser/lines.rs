//! Line builder: positioned glyph runs to ordered text lines.
//!
//! Runs arrive in PDF space (origin bottom-left, Y up) and leave as
//! [`TextLine`]s in layout space (origin top-left, Y down), sorted in
//! reading order with inter-run spaces decided by the gap heuristic.

use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;

use super::options::ClassifierConfig;
use crate::model::{Position, RunProvenance};
use crate::util::{has_bold_marker, Rgb};

/// A glyph run as reported by the backend, in PDF points.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRun {
    /// Decoded text
    pub text: String,
    /// Text rendering matrix `[a b c d e f]`; `e`/`f` are the baseline origin
    pub transform: Vec<f32>,
    /// Advance width in points
    pub width: f32,
    /// Effective font size in points
    pub font_size: f32,
    /// Base font name (e.g., "Helvetica-Bold")
    pub font_name: String,
    /// Fill colour at the time the run was shown
    pub color: Rgb,
}

impl GlyphRun {
    /// Convenience constructor for an unrotated run at `(x, y)`.
    pub fn at(
        text: impl Into<String>,
        x: f32,
        y: f32,
        width: f32,
        font_size: f32,
        font_name: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            transform: vec![1.0, 0.0, 0.0, 1.0, x, y],
            width,
            font_size,
            font_name: font_name.into(),
            color: Rgb::BLACK,
        }
    }

    /// Baseline origin, when the transform is usable.
    fn origin(&self) -> Option<(f32, f32)> {
        match self.transform.as_slice() {
            [a, b, c, d, e, f] if [a, b, c, d, e, f].iter().all(|v| v.is_finite()) => {
                Some((*e, *f))
            }
            _ => None,
        }
    }
}

/// A run placed in layout space. `y` is the approximate top edge.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
    pub font_name: String,
    pub color: Rgb,
    pub bold: bool,
}

impl PlacedRun {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn provenance(&self) -> RunProvenance {
        RunProvenance {
            text: self.text.clone(),
            x: self.x,
            y: self.y,
            width: self.width,
            font_size: self.font_size,
            font_name: self.font_name.clone(),
        }
    }
}

/// An ordered group of runs on one visual line.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Position of the line in the page's reading order
    pub index: usize,
    /// Runs sorted by x
    pub runs: Vec<PlacedRun>,
    /// Assembled text
    pub text: String,
    /// Aggregate bounds
    pub bounds: Position,
    /// Mean run font size
    pub font_size: f32,
}

impl TextLine {
    fn from_runs(index: usize, mut runs: Vec<PlacedRun>, config: &ClassifierConfig) -> Self {
        runs.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));

        let left = runs.iter().map(|r| r.x).fold(f32::INFINITY, f32::min);
        let top = runs.iter().map(|r| r.y).fold(f32::INFINITY, f32::min);
        let right = runs.iter().map(PlacedRun::right).fold(f32::NEG_INFINITY, f32::max);
        let bottom = runs
            .iter()
            .map(|r| r.y + r.font_size)
            .fold(f32::NEG_INFINITY, f32::max);
        let font_size = runs.iter().map(|r| r.font_size).sum::<f32>() / runs.len() as f32;

        let mut text = String::new();
        for (i, run) in runs.iter().enumerate() {
            if i > 0 && needs_space(&runs[i - 1], run, config) {
                text.push(' ');
            }
            text.push_str(&run.text);
        }

        Self {
            index,
            runs,
            text,
            bounds: Position::from_edges(left, top, right, bottom),
            font_size,
        }
    }

    pub fn x(&self) -> f32 {
        self.bounds.x
    }

    pub fn y(&self) -> f32 {
        self.bounds.y
    }

    pub fn height(&self) -> f32 {
        self.bounds.height
    }

    /// Any run in a bold face.
    pub fn is_bold(&self) -> bool {
        self.runs.iter().any(|r| r.bold)
    }

    /// Trimmed text length in characters.
    pub fn char_len(&self) -> usize {
        self.text.trim().chars().count()
    }

    /// Horizontal gaps between consecutive runs.
    pub fn gaps(&self) -> impl Iterator<Item = f32> + '_ {
        self.runs.windows(2).map(|w| w[1].x - w[0].right())
    }

    /// Colour covering the most characters on the line.
    pub fn dominant_color(&self) -> Rgb {
        dominant_color(self.runs.iter())
    }
}

/// Colour covering the most characters; ties keep the first seen.
pub fn dominant_color<'a>(runs: impl Iterator<Item = &'a PlacedRun>) -> Rgb {
    let mut tally: Vec<(String, Rgb, usize)> = Vec::new();
    for run in runs {
        let key = run.color.to_hex();
        let n = run.text.chars().count();
        match tally.iter_mut().find(|(k, _, _)| *k == key) {
            Some(entry) => entry.2 += n,
            None => tally.push((key, run.color, n)),
        }
    }
    tally
        .iter()
        .fold(None::<&(String, Rgb, usize)>, |best, entry| match best {
            Some(b) if b.2 >= entry.2 => Some(b),
            _ => Some(entry),
        })
        .map(|(_, c, _)| *c)
        .unwrap_or_default()
}

/// Decide whether a space separates two adjacent runs.
///
/// Tight gaps (≤ `tight_gap_ratio` of the mean font size) never get a
/// space, wide gaps (≥ `word_gap_ratio`) always do; in between, a space
/// goes in only when both touching characters are alphanumeric.
pub fn needs_space(prev: &PlacedRun, next: &PlacedRun, config: &ClassifierConfig) -> bool {
    let (Some(last), Some(first)) = (prev.text.chars().last(), next.text.chars().next()) else {
        return false;
    };
    if last.is_whitespace() || first.is_whitespace() {
        return false;
    }

    let gap = next.x - prev.right();
    let avg_font_size = (prev.font_size + next.font_size) / 2.0;

    if gap <= config.tight_gap_ratio * avg_font_size {
        false
    } else if gap >= config.word_gap_ratio * avg_font_size {
        true
    } else {
        last.is_alphanumeric() && first.is_alphanumeric()
    }
}

/// Convert a run to layout space. Returns `None` when it must be skipped.
pub fn place_run(run: &GlyphRun, page_height_pt: f32, scale: f32) -> Option<PlacedRun> {
    let text: String = run.text.nfkc().collect();
    if text.trim().is_empty() {
        return None;
    }
    let Some((x, y)) = run.origin() else {
        log::warn!("Skipping run {:?}: unusable transform {:?}", text, run.transform);
        return None;
    };
    if !(run.font_size.is_finite() && run.font_size > 0.0) {
        log::warn!("Skipping run {:?}: font size {}", text, run.font_size);
        return None;
    }

    let font_size = run.font_size * scale;
    Some(PlacedRun {
        x: x * scale,
        y: (page_height_pt - y) * scale - font_size,
        width: run.width.max(0.0) * scale,
        font_size,
        bold: has_bold_marker(&run.font_name),
        font_name: run.font_name.clone(),
        color: run.color,
        text,
    })
}

/// Group a page's glyph runs into reading-order lines.
pub fn build_lines(
    runs: &[GlyphRun],
    page_height_pt: f32,
    scale: f32,
    config: &ClassifierConfig,
) -> Vec<TextLine> {
    let mut placed: Vec<PlacedRun> = runs
        .iter()
        .filter_map(|r| place_run(r, page_height_pt, scale))
        .collect();

    placed.sort_by(|a, b| {
        a.y.partial_cmp(&b.y)
            .unwrap_or(Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut groups: Vec<Vec<PlacedRun>> = Vec::new();
    let mut anchor_y = f32::NAN;
    for run in placed {
        match groups.last_mut() {
            Some(group) if (run.y - anchor_y).abs() <= config.line_y_tolerance => group.push(run),
            _ => {
                anchor_y = run.y;
                groups.push(vec![run]);
            }
        }
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(i, group)| TextLine::from_runs(i, group, config))
        .collect()
}

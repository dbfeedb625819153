//! Table detection from run alignment.
//!
//! A table is a stretch of consecutive lines that each split into columns
//! at wide horizontal gaps, whose run x-origins line up on at least two
//! shared column positions, and which carries tabular (numeric) content.

use std::collections::BTreeMap;

use super::classifier::{bounds_of, provenance_of, style_of, PageContext};
use super::lines::TextLine;
use super::options::ClassifierConfig;
use super::patterns::patterns;
use crate::model::{Block, BlockContent, BlockType, Table, TABLE_CONFIDENCE};

/// Max characters of a header cell.
const HEADER_CELL_MAX_LEN: usize = 50;

/// Second detector pass. Claims table lines.
pub struct TableDetector<'a> {
    config: &'a ClassifierConfig,
}

impl<'a> TableDetector<'a> {
    pub fn new(config: &'a ClassifierConfig) -> Self {
        Self { config }
    }

    /// Split `lines` into table blocks and the lines left for later passes.
    pub fn detect(&self, lines: Vec<TextLine>, ctx: &PageContext) -> (Vec<Block>, Vec<TextLine>) {
        let mut blocks = Vec::new();
        let mut rest = Vec::with_capacity(lines.len());
        let mut group: Vec<TextLine> = Vec::new();

        for line in lines {
            let adjacent = group.last().is_some_and(|l| l.index + 1 == line.index);
            if self.has_multiple_columns(&line) {
                if !adjacent {
                    self.flush(&mut group, &mut blocks, &mut rest, ctx);
                }
                group.push(line);
            } else {
                self.flush(&mut group, &mut blocks, &mut rest, ctx);
                rest.push(line);
            }
        }
        self.flush(&mut group, &mut blocks, &mut rest, ctx);

        rest.sort_by_key(|l| l.index);
        (blocks, rest)
    }

    /// At least one gap between runs wider than the column gap.
    pub fn has_multiple_columns(&self, line: &TextLine) -> bool {
        line.gaps().any(|g| g > self.config.table_column_gap)
    }

    fn flush(
        &self,
        group: &mut Vec<TextLine>,
        blocks: &mut Vec<Block>,
        rest: &mut Vec<TextLine>,
        ctx: &PageContext,
    ) {
        if group.is_empty() {
            return;
        }
        let lines = std::mem::take(group);
        if lines.len() >= self.config.table_min_rows {
            if let Some(block) = self.build(&lines, ctx) {
                blocks.push(block);
                return;
            }
        }
        rest.extend(lines);
    }

    /// Confirm a candidate group and build its block.
    fn build(&self, lines: &[TextLine], ctx: &PageContext) -> Option<Block> {
        let columns = self.shared_columns(lines);
        if columns.len() < 2 {
            log::debug!(
                "Table candidate of {} lines rejected: {} shared columns",
                lines.len(),
                columns.len()
            );
            return None;
        }
        if !lines.iter().any(|l| self.is_tabular(l)) {
            log::debug!("Table candidate of {} lines rejected: no tabular content", lines.len());
            return None;
        }

        let rows: Vec<Vec<String>> = lines.iter().map(|l| assign_cells(l, &columns)).collect();
        let has_header = rows.first().is_some_and(|r| is_header_row(r));
        let table = Table::from_rows(rows, has_header);

        log::debug!(
            "Table: {} rows x {} columns (header: {})",
            table.row_count(),
            table.column_count,
            has_header
        );

        let refs: Vec<&TextLine> = lines.iter().collect();
        let mut block = Block::new(
            String::new(),
            BlockType::Table,
            BlockContent::Table(table),
            bounds_of(&refs),
            style_of(&refs, ctx),
            TABLE_CONFIDENCE,
        )
        .ok()?;
        block.metadata.text_runs = provenance_of(&refs);
        Some(block)
    }

    /// Bucketed x-origins that occur on at least two lines, ascending.
    pub fn shared_columns(&self, lines: &[TextLine]) -> Vec<f32> {
        let bucket = self.config.table_column_bucket.max(1.0);
        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        for line in lines {
            let mut keys: Vec<i64> = line
                .runs
                .iter()
                .map(|r| (r.x / bucket).round() as i64)
                .collect();
            keys.dedup();
            for key in keys {
                *counts.entry(key).or_default() += 1;
            }
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n >= 2)
            .map(|(k, _)| k as f32 * bucket)
            .collect()
    }

    /// Contains a digit and its text splits into at least two cells on
    /// runs of two or more spaces.
    ///
    /// Only whitespace already present in the line text counts, so a
    /// hanging list marker separated by a wide gap stays one cell.
    pub fn is_tabular(&self, line: &TextLine) -> bool {
        let text = line.text.trim();
        let cells = patterns()
            .cell_separator
            .split(text)
            .filter(|s| !s.trim().is_empty())
            .count();
        text.chars().any(|c| c.is_ascii_digit()) && cells >= 2
    }
}

/// Put each run's text into the nearest column.
fn assign_cells(line: &TextLine, columns: &[f32]) -> Vec<String> {
    let mut cells = vec![String::new(); columns.len()];
    for run in &line.runs {
        let nearest = columns
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (run.x - **a)
                    .abs()
                    .partial_cmp(&(run.x - **b).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        let cell = &mut cells[nearest];
        if !cell.is_empty() {
            cell.push(' ');
        }
        cell.push_str(run.text.trim());
    }
    cells
}

/// Short, capitalized, non-numeric cells.
fn is_header_row(cells: &[String]) -> bool {
    let filled: Vec<&str> = cells
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    !filled.is_empty()
        && filled.iter().all(|c| {
            c.chars().count() < HEADER_CELL_MAX_LEN
                && c.chars().next().is_some_and(char::is_uppercase)
                && !is_numeric(c)
        })
}

fn is_numeric(cell: &str) -> bool {
    cell.chars().any(|c| c.is_ascii_digit())
        && cell
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+' | '%' | '$'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockContent;
    use crate::parser::lines::{build_lines, GlyphRun};

    fn ctx() -> PageContext {
        PageContext {
            page_number: 1,
            width: 612.0,
            height: 792.0,
            scale: 1.0,
        }
    }

    /// Cells padded with trailing spaces, as column-aligned text is drawn.
    fn row(cells: &[&str], y: f32) -> Vec<GlyphRun> {
        cells
            .iter()
            .enumerate()
            .map(|(i, text)| {
                GlyphRun::at(
                    format!("{}   ", text),
                    72.0 + i as f32 * 120.0,
                    y,
                    40.0,
                    11.0,
                    "Helvetica",
                )
            })
            .collect()
    }

    fn table_lines() -> Vec<TextLine> {
        let mut runs = row(&["Name", "Age", "City"], 700.0);
        runs.extend(row(&["Alice", "30", "Paris"], 686.0));
        runs.extend(row(&["Bob", "25", "Rome"], 672.0));
        build_lines(&runs, 792.0, 1.0, &ClassifierConfig::default())
    }

    #[test]
    fn test_detects_simple_table() {
        let config = ClassifierConfig::default();
        let (blocks, rest) = TableDetector::new(&config).detect(table_lines(), &ctx());
        assert!(rest.is_empty());
        assert_eq!(blocks.len(), 1);
        let BlockContent::Table(table) = &blocks[0].content else {
            panic!("expected table content");
        };
        assert_eq!(table.column_count, 3);
        assert_eq!(table.row_count(), 3);
        assert!(table.has_header);
        assert_eq!(table.rows[1].joined("|"), "Alice|30|Paris");
        assert_eq!(blocks[0].metadata.confidence, 0.8);
    }

    #[test]
    fn test_rejects_without_digits() {
        let config = ClassifierConfig::default();
        let mut runs = row(&["Left", "Right"], 700.0);
        runs.extend(row(&["More", "Words"], 686.0));
        let lines = build_lines(&runs, 792.0, 1.0, &config);
        let (blocks, rest) = TableDetector::new(&config).detect(lines, &ctx());
        assert!(blocks.is_empty());
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn test_single_row_is_not_table() {
        let config = ClassifierConfig::default();
        let lines = build_lines(&row(&["Total", "42"], 700.0), 792.0, 1.0, &config);
        let (blocks, rest) = TableDetector::new(&config).detect(lines, &ctx());
        assert!(blocks.is_empty());
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn test_non_adjacent_lines_split_groups() {
        let config = ClassifierConfig::default();
        let lines = table_lines();
        // Drop the middle line so the remaining two are not consecutive.
        let lines: Vec<TextLine> = lines.into_iter().filter(|l| l.index != 1).collect();
        let (blocks, rest) = TableDetector::new(&config).detect(lines, &ctx());
        assert!(blocks.is_empty());
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn test_hanging_marker_is_one_cell() {
        let config = ClassifierConfig::default();
        let runs = vec![
            GlyphRun::at("1.", 72.0, 700.0, 6.0, 11.0, "Helvetica"),
            GlyphRun::at("First item", 100.0, 700.0, 60.0, 11.0, "Helvetica"),
            GlyphRun::at("2.", 72.0, 686.0, 6.0, 11.0, "Helvetica"),
            GlyphRun::at("Second item", 100.0, 686.0, 60.0, 11.0, "Helvetica"),
        ];
        let lines = build_lines(&runs, 792.0, 1.0, &config);
        let detector = TableDetector::new(&config);
        assert!(lines.iter().all(|l| detector.has_multiple_columns(l)));
        assert!(lines.iter().all(|l| !detector.is_tabular(l)));
        assert_eq!(detector.shared_columns(&lines).len(), 2);

        let (blocks, rest) = detector.detect(lines, &ctx());
        assert!(blocks.is_empty());
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn test_header_rules() {
        let cells = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert!(is_header_row(&cells(&["Name", "Age"])));
        assert!(!is_header_row(&cells(&["Name", "2024"])));
        assert!(!is_header_row(&cells(&["name", "Age"])));
        assert!(is_numeric("1,234.50"));
        assert!(!is_numeric("Q3"));
    }
}

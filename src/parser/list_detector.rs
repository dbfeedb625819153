//! List detection from item markers.

use std::collections::HashMap;

use super::classifier::{bounds_of, provenance_of, style_of, PageContext};
use super::lines::TextLine;
use super::options::ClassifierConfig;
use super::patterns::patterns;
use crate::model::{Block, BlockContent, BlockType, List, ListItem, ListType, LIST_CONFIDENCE};
use crate::util::from_roman;

/// A recognised item marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub list_type: ListType,
    /// Marker as written, e.g. `"2)"`
    pub text: String,
    /// Item text after the marker
    pub rest: String,
}

/// Recognise a list marker at the start of `text`.
///
/// Bullets win over numbers, numbers over Roman numerals, Roman numerals
/// over letters. A single letter counts as Roman only for `i`/`I`.
pub fn parse_marker(text: &str) -> Option<Marker> {
    let text = text.trim();
    let p = patterns();

    if let Some(caps) = p.bullet.captures(text) {
        return Some(marker(ListType::Bullet, &caps));
    }
    if let Some(caps) = p.numbered.captures(text) {
        return Some(marker(ListType::Numbered, &caps));
    }
    if let Some(caps) = p.roman.captures(text) {
        let numeral = caps[1].trim_end_matches(['.', ')']);
        let roman = numeral.len() > 1 || numeral.eq_ignore_ascii_case("i");
        if roman && from_roman(numeral).is_some() {
            return Some(marker(ListType::Roman, &caps));
        }
    }
    if let Some(caps) = p.alpha.captures(text) {
        return Some(marker(ListType::Alpha, &caps));
    }
    None
}

fn marker(list_type: ListType, caps: &regex::Captures<'_>) -> Marker {
    Marker {
        list_type,
        text: caps[1].to_string(),
        rest: caps[2].trim().to_string(),
    }
}

/// Lines of one list under construction.
struct Group<'l> {
    first_x: f32,
    items: Vec<(Marker, Vec<&'l TextLine>)>,
}

impl Group<'_> {
    fn last_line(&self) -> Option<&TextLine> {
        self.items.last().and_then(|(_, lines)| lines.last().copied())
    }
}

/// Third detector pass. Claims list lines.
pub struct ListDetector<'a> {
    config: &'a ClassifierConfig,
}

impl<'a> ListDetector<'a> {
    pub fn new(config: &'a ClassifierConfig) -> Self {
        Self { config }
    }

    /// Split `lines` into list blocks and the lines left for later passes.
    pub fn detect(&self, lines: Vec<TextLine>, ctx: &PageContext) -> (Vec<Block>, Vec<TextLine>) {
        let mut blocks = Vec::new();
        let mut claimed = vec![false; lines.len()];
        let position: HashMap<usize, usize> =
            lines.iter().enumerate().map(|(i, l)| (l.index, i)).collect();

        let mut group: Option<Group<'_>> = None;
        for line in &lines {
            let adjacent = group
                .as_ref()
                .and_then(Group::last_line)
                .is_some_and(|last| last.index + 1 == line.index);

            if let Some(marker) = parse_marker(&line.text) {
                match group.as_mut() {
                    Some(g) if adjacent => g.items.push((marker, vec![line])),
                    _ => {
                        self.flush(group.take(), &mut blocks, &mut claimed, &position, ctx);
                        group = Some(Group {
                            first_x: line.x(),
                            items: vec![(marker, vec![line])],
                        });
                    }
                }
                continue;
            }

            let continues = adjacent
                && group.as_ref().is_some_and(|g| self.is_continuation(g, line));
            if continues {
                if let Some((_, item_lines)) = group.as_mut().and_then(|g| g.items.last_mut()) {
                    item_lines.push(line);
                }
            } else {
                self.flush(group.take(), &mut blocks, &mut claimed, &position, ctx);
            }
        }
        self.flush(group, &mut blocks, &mut claimed, &position, ctx);

        let rest = lines
            .into_iter()
            .zip(claimed)
            .filter_map(|(line, taken)| (!taken).then_some(line))
            .collect();
        (blocks, rest)
    }

    /// Indented past the item's own x and closer than one line height.
    fn is_continuation(&self, group: &Group<'_>, line: &TextLine) -> bool {
        let Some((_, item_lines)) = group.items.last() else {
            return false;
        };
        let (Some(item), Some(prev)) = (item_lines.first(), item_lines.last()) else {
            return false;
        };
        let gap = line.y() - prev.bounds.bottom();
        line.x() > item.x() + self.config.list_indent && gap < prev.height()
    }

    fn flush(
        &self,
        group: Option<Group<'_>>,
        blocks: &mut Vec<Block>,
        claimed: &mut [bool],
        position: &HashMap<usize, usize>,
        ctx: &PageContext,
    ) {
        let Some(group) = group else {
            return;
        };
        if group.items.len() < self.config.list_min_items.max(1) {
            return;
        }

        let list_type = group.items[0].0.list_type;
        let mut list = List::new(list_type);
        let mut all_lines: Vec<&TextLine> = Vec::new();
        for (marker, lines) in &group.items {
            let level = ((lines[0].x() - group.first_x) / self.config.list_indent.max(1.0))
                .floor()
                .clamp(0.0, u8::MAX as f32) as u8;
            let mut text = marker.rest.clone();
            for cont in &lines[1..] {
                text.push(' ');
                text.push_str(cont.text.trim());
            }
            list.push(ListItem::new(marker.text.clone(), text, level));
            all_lines.extend(lines.iter().copied());
        }

        log::debug!("List: {:?} with {} items", list_type, list.len());

        let mut style = style_of(&all_lines, ctx);
        style.list_type = Some(list_type);
        let Ok(mut block) = Block::new(
            String::new(),
            BlockType::List,
            BlockContent::List(list),
            bounds_of(&all_lines),
            style,
            LIST_CONFIDENCE,
        ) else {
            return;
        };
        block.metadata.text_runs = provenance_of(&all_lines);

        for line in &all_lines {
            if let Some(&i) = position.get(&line.index) {
                claimed[i] = true;
            }
        }
        blocks.push(block);
    }
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

    fn detect(runs: &[GlyphRun]) -> (Vec<Block>, Vec<TextLine>) {
        let config = ClassifierConfig::default();
        let lines = build_lines(runs, 792.0, 1.0, &config);
        ListDetector::new(&config).detect(lines, &ctx())
    }

    #[test]
    fn test_marker_precedence() {
        assert_eq!(parse_marker("• Apples").unwrap().list_type, ListType::Bullet);
        assert_eq!(parse_marker("3) Three").unwrap().list_type, ListType::Numbered);
        assert_eq!(parse_marker("iv. Four").unwrap().list_type, ListType::Roman);
        assert_eq!(parse_marker("i. One").unwrap().list_type, ListType::Roman);
        assert_eq!(parse_marker("c. Gamma").unwrap().list_type, ListType::Alpha);
        assert_eq!(parse_marker("B) Beta").unwrap().list_type, ListType::Alpha);
        assert!(parse_marker("Plain sentence.").is_none());

        let m = parse_marker("2.  Second item").unwrap();
        assert_eq!(m.text, "2.");
        assert_eq!(m.rest, "Second item");
    }

    #[test]
    fn test_numbered_list() {
        let (blocks, rest) = detect(&[
            GlyphRun::at("1. First item", 72.0, 700.0, 70.0, 11.0, "Helvetica"),
            GlyphRun::at("2. Second item", 72.0, 686.0, 75.0, 11.0, "Helvetica"),
            GlyphRun::at("3. Third item", 72.0, 672.0, 70.0, 11.0, "Helvetica"),
        ]);
        assert!(rest.is_empty());
        assert_eq!(blocks.len(), 1);
        let BlockContent::List(list) = &blocks[0].content else {
            panic!("expected list content");
        };
        assert_eq!(list.list_type, ListType::Numbered);
        let markers: Vec<&str> = list.items.iter().map(|i| i.marker.as_str()).collect();
        assert_eq!(markers, vec!["1.", "2.", "3."]);
        assert_eq!(list.items[2].text, "Third item");
        assert_eq!(blocks[0].style.list_type, Some(ListType::Numbered));
    }

    #[test]
    fn test_continuation_and_nesting() {
        let (blocks, rest) = detect(&[
            GlyphRun::at("• Top level item that wraps", 72.0, 700.0, 140.0, 11.0, "Helvetica"),
            GlyphRun::at("onto a second line", 100.0, 688.0, 90.0, 11.0, "Helvetica"),
            GlyphRun::at("- Nested item", 94.0, 674.0, 70.0, 11.0, "Helvetica"),
            GlyphRun::at("Not part of the list.", 72.0, 640.0, 100.0, 11.0, "Helvetica"),
        ]);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].text, "Not part of the list.");
        let BlockContent::List(list) = &blocks[0].content else {
            panic!("expected list content");
        };
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].text, "Top level item that wraps onto a second line");
        assert_eq!(list.items[0].level, 0);
        assert_eq!(list.items[1].level, 1);
    }

    #[test]
    fn test_single_candidate_is_left() {
        let (blocks, rest) = detect(&[GlyphRun::at(
            "1. Lonely line",
            72.0,
            700.0,
            70.0,
            11.0,
            "Helvetica",
        )]);
        assert!(blocks.is_empty());
        assert_eq!(rest.len(), 1);
    }
}

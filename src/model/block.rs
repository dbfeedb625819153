//! Blocks: the editable unit of a page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{List, Table};
use crate::error::{Error, Result};
use crate::util::{FontStyle, FontWeight};

/// Detector confidence for heading blocks.
pub const HEADING_CONFIDENCE: f32 = 0.9;
/// Detector confidence for table blocks.
pub const TABLE_CONFIDENCE: f32 = 0.8;
/// Detector confidence for list blocks.
pub const LIST_CONFIDENCE: f32 = 0.85;
/// Detector confidence for paragraph blocks.
pub const PARAGRAPH_CONFIDENCE: f32 = 0.9;
/// Confidence of image placements and user-created blocks.
pub const CERTAIN_CONFIDENCE: f32 = 1.0;

/// Semantic type of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Paragraph,
    Heading,
    Table,
    List,
    Image,
    Quote,
    Code,
}

impl BlockType {
    /// Types whose content is a plain string.
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            BlockType::Paragraph | BlockType::Heading | BlockType::Quote | BlockType::Code
        )
    }

    fn expected_content(self) -> &'static str {
        match self {
            BlockType::Table => "table",
            BlockType::List => "list",
            BlockType::Image => "image",
            _ => "text",
        }
    }
}

/// Image descriptor of an `image` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContent {
    /// Resource reference, `page{n}/{xobject name}` for parsed images
    pub src: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

/// Block payload. The shape depends on [`BlockType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockContent {
    Text(String),
    Table(Table),
    List(List),
    Image(ImageContent),
}

impl BlockContent {
    fn kind(&self) -> &'static str {
        match self {
            BlockContent::Text(_) => "text",
            BlockContent::Table(_) => "table",
            BlockContent::List(_) => "list",
            BlockContent::Image(_) => "image",
        }
    }

    /// Whether this payload is valid for `block_type`.
    pub fn matches(&self, block_type: BlockType) -> bool {
        self.kind() == block_type.expected_content()
    }

    /// Text projection used for filtering, search and reflow.
    ///
    /// Tables yield one line per row with cells separated by two spaces;
    /// lists yield one line per item with its marker.
    pub fn plain_text(&self) -> String {
        match self {
            BlockContent::Text(s) => s.clone(),
            BlockContent::Table(t) => t
                .rows
                .iter()
                .map(|r| r.joined("  "))
                .collect::<Vec<_>>()
                .join("\n"),
            BlockContent::List(l) => l.plain_text(),
            BlockContent::Image(img) => img.alt.clone().unwrap_or_default(),
        }
    }
}

/// Axis-aligned box in layout space (top-left origin, Y down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box spanning two corners.
    pub fn from_edges(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new(left, top, (right - left).max(0.0), (bottom - top).max(0.0))
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Position) -> Position {
        Position::from_edges(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Whether the interiors intersect.
    pub fn overlaps(&self, other: &Position) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Finite and non-negative in every component.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }

    /// Clamp the origin to the page's non-negative quadrant.
    pub fn clamped(mut self) -> Self {
        if self.x < 0.0 {
            self.width = (self.width + self.x).max(0.0);
            self.x = 0.0;
        }
        if self.y < 0.0 {
            self.height = (self.height + self.y).max(0.0);
            self.y = 0.0;
        }
        self
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Visual style of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStyle {
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub text_align: TextAlign,
    /// `#rrggbb`
    pub color: String,
    /// Line pitch as a multiple of the font size
    pub line_height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_type: Option<super::ListType>,
}

impl Default for BlockStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            font_family: None,
            text_align: TextAlign::Left,
            color: "#000000".to_string(),
            line_height: 1.2,
            heading_level: None,
            list_type: None,
        }
    }
}

/// One glyph run a block was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunProvenance {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
    pub font_name: String,
}

/// Detection and edit bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    /// Detector confidence (0-1)
    pub confidence: f32,
    #[serde(default)]
    pub original_font_size: Option<f32>,
    #[serde(default)]
    pub original_color: Option<String>,
    #[serde(default)]
    pub original_bounds: Option<Position>,
    #[serde(default)]
    pub text_runs: Vec<RunProvenance>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
}

impl BlockMetadata {
    pub fn detected(confidence: f32) -> Self {
        Self {
            confidence,
            original_font_size: None,
            original_color: None,
            original_bounds: None,
            text_runs: Vec::new(),
            is_edited: false,
            edited_at: None,
        }
    }
}

/// A classified, independently editable region of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Stable identifier
    pub id: String,

    #[serde(rename = "type")]
    pub block_type: BlockType,

    pub content: BlockContent,

    pub position: Position,

    pub style: BlockStyle,

    pub metadata: BlockMetadata,
}

impl Block {
    /// Create a detected block, rejecting content that does not match `block_type`.
    pub fn new(
        id: impl Into<String>,
        block_type: BlockType,
        content: BlockContent,
        position: Position,
        style: BlockStyle,
        confidence: f32,
    ) -> Result<Self> {
        let id = id.into();
        if !content.matches(block_type) {
            return Err(Error::ContentMismatch {
                id,
                expected: block_type.expected_content(),
            });
        }
        let mut metadata = BlockMetadata::detected(confidence);
        metadata.original_font_size = Some(style.font_size);
        metadata.original_color = Some(style.color.clone());
        metadata.original_bounds = Some(position);
        Ok(Self {
            id,
            block_type,
            content,
            position,
            style,
            metadata,
        })
    }

    /// A block added by the user rather than the parser.
    ///
    /// It carries full confidence and is marked edited so that export draws it.
    pub fn user_created(
        block_type: BlockType,
        content: BlockContent,
        position: Position,
        style: BlockStyle,
    ) -> Result<Self> {
        let id = format!("user-{}", uuid::Uuid::new_v4());
        let mut block = Self::new(id, block_type, content, position, style, CERTAIN_CONFIDENCE)?;
        block.metadata.original_bounds = None;
        block.mark_edited();
        Ok(block)
    }

    /// String payload of textual blocks.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            BlockContent::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn plain_text(&self) -> String {
        self.content.plain_text()
    }

    pub fn is_edited(&self) -> bool {
        self.metadata.is_edited
    }

    /// Flag the block as edited now.
    pub fn mark_edited(&mut self) {
        self.metadata.is_edited = true;
        self.metadata.edited_at = Some(Utc::now());
    }

    /// Replace the text of a textual block. An empty string erases the block on export.
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<()> {
        if !self.block_type.is_textual() {
            return Err(self.mismatch());
        }
        self.content = BlockContent::Text(text.into());
        self.mark_edited();
        Ok(())
    }

    /// Replace the rows of a table block.
    pub fn set_table(&mut self, table: Table) -> Result<()> {
        if self.block_type != BlockType::Table {
            return Err(self.mismatch());
        }
        self.content = BlockContent::Table(table);
        self.mark_edited();
        Ok(())
    }

    /// Replace the items of a list block.
    pub fn set_list(&mut self, list: List) -> Result<()> {
        if self.block_type != BlockType::List {
            return Err(self.mismatch());
        }
        self.style.list_type = Some(list.list_type);
        self.content = BlockContent::List(list);
        self.mark_edited();
        Ok(())
    }

    pub fn set_style(&mut self, style: BlockStyle) {
        self.style = style;
        self.mark_edited();
    }

    /// Move or resize the block. Negative or non-finite boxes are rejected.
    pub fn move_to(&mut self, position: Position) -> Result<()> {
        if !position.is_valid() {
            return Err(Error::InvalidModel(format!(
                "block {} cannot move to {:?}",
                self.id, position
            )));
        }
        self.position = position;
        self.mark_edited();
        Ok(())
    }

    /// Check the per-block invariants: content kind matches type, position is valid.
    pub fn validate(&self) -> Result<()> {
        if !self.content.matches(self.block_type) {
            return Err(self.mismatch());
        }
        if !self.position.is_valid() {
            return Err(Error::InvalidModel(format!(
                "block {} has invalid position {:?}",
                self.id, self.position
            )));
        }
        if let Some(level) = self.style.heading_level {
            if !(1..=6).contains(&level) {
                return Err(Error::InvalidModel(format!(
                    "block {} has heading level {}",
                    self.id, level
                )));
            }
        }
        Ok(())
    }

    fn mismatch(&self) -> Error {
        Error::ContentMismatch {
            id: self.id.clone(),
            expected: self.block_type.expected_content(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ListItem, ListType};

    fn paragraph(text: &str) -> Block {
        Block::new(
            "p1-b0",
            BlockType::Paragraph,
            BlockContent::Text(text.to_string()),
            Position::new(10.0, 20.0, 100.0, 20.0),
            BlockStyle::default(),
            PARAGRAPH_CONFIDENCE,
        )
        .unwrap()
    }

    #[test]
    fn test_content_must_match_type() {
        let err = Block::new(
            "x",
            BlockType::Table,
            BlockContent::Text("nope".into()),
            Position::default(),
            BlockStyle::default(),
            TABLE_CONFIDENCE,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ContentMismatch { expected: "table", .. }));
    }

    #[test]
    fn test_set_text_marks_edited() {
        let mut block = paragraph("Hello");
        assert!(!block.is_edited());
        assert_eq!(block.metadata.original_bounds, Some(block.position));

        block.set_text("Hello world").unwrap();
        assert!(block.is_edited());
        assert!(block.metadata.edited_at.is_some());
        assert_eq!(block.text(), Some("Hello world"));
    }

    #[test]
    fn test_set_text_on_list_fails() {
        let mut list = List::new(ListType::Bullet);
        list.push(ListItem::new("•", "One", 0));
        let mut block = Block::new(
            "l",
            BlockType::List,
            BlockContent::List(list),
            Position::new(0.0, 0.0, 50.0, 10.0),
            BlockStyle::default(),
            LIST_CONFIDENCE,
        )
        .unwrap();
        assert!(block.set_text("x").is_err());
        assert!(!block.is_edited());
    }

    #[test]
    fn test_move_rejects_negative() {
        let mut block = paragraph("Hello");
        assert!(block
            .move_to(Position::new(-1.0, 0.0, 10.0, 10.0))
            .is_err());
        block.move_to(Position::new(5.0, 5.0, 10.0, 10.0)).unwrap();
        assert_eq!(block.position.x, 5.0);
    }

    #[test]
    fn test_user_created_block() {
        let block = Block::user_created(
            BlockType::Quote,
            BlockContent::Text("Quoted".into()),
            Position::new(0.0, 0.0, 100.0, 20.0),
            BlockStyle::default(),
        )
        .unwrap();
        assert!(block.id.starts_with("user-"));
        assert_eq!(block.metadata.confidence, 1.0);
        assert!(block.is_edited());
    }

    #[test]
    fn test_position_geometry() {
        let a = Position::new(0.0, 0.0, 10.0, 10.0);
        let b = Position::new(5.0, 5.0, 10.0, 10.0);
        let c = Position::new(10.0, 0.0, 5.0, 5.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert_eq!(a.union(&b), Position::new(0.0, 0.0, 15.0, 15.0));
        assert_eq!(
            Position::new(-2.0, 3.0, 10.0, 4.0).clamped(),
            Position::new(0.0, 3.0, 8.0, 4.0)
        );
    }

    #[test]
    fn test_json_shape() {
        let block = paragraph("Hello");
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "paragraph");
        assert_eq!(json["content"], "Hello");
        assert_eq!(json["position"]["width"], 100.0);
        assert_eq!(json["style"]["fontSize"], 12.0);
        assert_eq!(json["metadata"]["isEdited"], false);
        assert!(json["style"].get("headingLevel").is_none());

        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }
}

//! Document model: Document → Page → Block.
//!
//! This is the tree produced by the parser, mutated by edits and consumed
//! by the reflow engine and the JSON boundary. Field names serialize in
//! camelCase and all geometry is in layout space (top-left origin, Y down).

mod block;
mod document;
mod list;
mod page;
mod table;

pub use block::{
    Block, BlockContent, BlockMetadata, BlockStyle, BlockType, ImageContent, Position,
    RunProvenance, TextAlign, CERTAIN_CONFIDENCE, HEADING_CONFIDENCE, LIST_CONFIDENCE,
    PARAGRAPH_CONFIDENCE, TABLE_CONFIDENCE,
};
pub use document::{Document, Metadata};
pub use list::{List, ListItem, ListType};
pub use page::{Dimensions, Page};
pub use table::{Table, TableCell, TableRow};

//! Page-level types.

use serde::{Deserialize, Serialize};

use super::Block;
use crate::error::{Error, Result};

/// Page size in layout units plus the render scale used to produce them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in layout pixels
    pub width: f32,

    /// Height in layout pixels
    pub height: f32,

    /// Layout pixels per PDF point
    pub scale: f32,
}

impl Dimensions {
    /// Dimensions of a page measured in PDF points, scaled to layout space.
    pub fn from_points(width_pt: f32, height_pt: f32, scale: f32) -> Self {
        Self {
            width: width_pt * scale,
            height: height_pt * scale,
            scale,
        }
    }

    /// Height of the page in PDF points.
    pub fn height_pt(&self) -> f32 {
        crate::util::px_to_pt(self.height, self.scale)
    }

    /// Width of the page in PDF points.
    pub fn width_pt(&self) -> f32 {
        crate::util::px_to_pt(self.width, self.scale)
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        // US Letter at scale 1
        Self {
            width: 612.0,
            height: 792.0,
            scale: 1.0,
        }
    }
}

/// A single page in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Page number (1-indexed)
    pub page_number: u32,

    pub dimensions: Dimensions,

    /// Page rotation in degrees (0, 90, 180, 270)
    #[serde(default)]
    pub rotation: u16,

    /// Blocks on the page. Order carries no meaning, though parsed pages
    /// keep them sorted by position.
    pub blocks: Vec<Block>,
}

impl Page {
    /// Create a new page with the given dimensions.
    pub fn new(page_number: u32, dimensions: Dimensions) -> Self {
        Self {
            page_number,
            dimensions,
            rotation: 0,
            blocks: Vec::new(),
        }
    }

    /// Add a block to the page. Block ids must be unique within the page.
    pub fn add_block(&mut self, block: Block) -> Result<()> {
        if self.block(&block.id).is_some() {
            return Err(Error::InvalidModel(format!(
                "duplicate block id {} on page {}",
                block.id, self.page_number
            )));
        }
        self.blocks.push(block);
        Ok(())
    }

    /// Remove a block by id and return it.
    pub fn remove_block(&mut self, id: &str) -> Result<Block> {
        let index = self
            .blocks
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| Error::BlockNotFound(id.to_string()))?;
        Ok(self.blocks.remove(index))
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn block_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    /// Blocks flagged as edited.
    pub fn edited_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| b.is_edited())
    }

    /// Plain text of all blocks in reading order, separated by blank lines.
    pub fn plain_text(&self) -> String {
        let mut ordered: Vec<&Block> = self.blocks.iter().collect();
        ordered.sort_by(|a, b| {
            a.position
                .y
                .partial_cmp(&b.position.y)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    a.position
                        .x
                        .partial_cmp(&b.position.x)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });
        ordered
            .into_iter()
            .map(Block::plain_text)
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Check if the page is in landscape orientation.
    pub fn is_landscape(&self) -> bool {
        self.dimensions.width > self.dimensions.height
    }

    /// Check the page and every block on it.
    pub fn validate(&self) -> Result<()> {
        let dims = &self.dimensions;
        if !(dims.width.is_finite() && dims.height.is_finite() && dims.scale > 0.0) {
            return Err(Error::InvalidModel(format!(
                "page {} has invalid dimensions {:?}",
                self.page_number, dims
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for block in &self.blocks {
            if !seen.insert(block.id.as_str()) {
                return Err(Error::InvalidModel(format!(
                    "duplicate block id {} on page {}",
                    block.id, self.page_number
                )));
            }
            block.validate()?;
        }
        Ok(())
    }
}

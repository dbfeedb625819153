//! Conversions between layout space and PDF space, and the draw operations
//! the reflow engine emits.
//!
//! Layout space is what the model stores: pixels at the page's render
//! scale, origin top-left, Y growing downwards. PDF space is points with
//! the origin at the bottom-left of the (origin-shifted) MediaBox and Y
//! growing upwards.

use super::fonts::StandardFont;
use crate::model::{Dimensions, Position};
use crate::util::{pt_to_px, px_to_pt, Rgb};

/// Axis-aligned rectangle in PDF points, `y` at the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PdfRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Grow by `padding` on every side.
    pub fn expanded(&self, padding: f32) -> PdfRect {
        PdfRect {
            x: self.x - padding,
            y: self.y - padding,
            width: self.width + 2.0 * padding,
            height: self.height + 2.0 * padding,
        }
    }
}

/// Bottom edge in PDF space of a box whose top edge sits at layout `y`.
///
/// All arguments in the same unit.
pub fn pdf_bottom(layout_y: f32, height: f32, page_height: f32) -> f32 {
    page_height - layout_y - height
}

/// Top edge in layout space of a box whose bottom edge sits at PDF `y`.
pub fn layout_top(pdf_y: f32, height: f32, page_height: f32) -> f32 {
    page_height - pdf_y - height
}

/// Layout box to a PDF rectangle in points.
pub fn layout_to_pdf(position: &Position, dims: &Dimensions) -> PdfRect {
    let s = dims.scale;
    let height = px_to_pt(position.height, s);
    PdfRect {
        x: px_to_pt(position.x, s),
        y: pdf_bottom(px_to_pt(position.y, s), height, dims.height_pt()),
        width: px_to_pt(position.width, s),
        height,
    }
}

/// PDF rectangle in points to a layout box.
pub fn pdf_to_layout(rect: &PdfRect, dims: &Dimensions) -> Position {
    let s = dims.scale;
    Position::new(
        pt_to_px(rect.x, s),
        pt_to_px(layout_top(rect.y, rect.height, dims.height_pt()), s),
        pt_to_px(rect.width, s),
        pt_to_px(rect.height, s),
    )
}

/// One drawing step in PDF points, relative to the page's lower-left corner.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Opaque white rectangle
    CoverRect(PdfRect),
    /// Single line of text with its baseline at `(x, y)`
    Text {
        x: f32,
        y: f32,
        font: StandardFont,
        size: f32,
        color: Rgb,
        text: String,
    },
}

impl DrawOp {
    pub fn is_cover(&self) -> bool {
        matches!(self, DrawOp::CoverRect(_))
    }

    pub fn font(&self) -> Option<StandardFont> {
        match self {
            DrawOp::Text { font, .. } => Some(*font),
            DrawOp::CoverRect(_) => None,
        }
    }
}

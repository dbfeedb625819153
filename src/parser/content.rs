//! Content-stream interpretation: operations to glyph runs and image placements.
//!
//! Tracks the graphics state (CTM, fill colour) and the text state
//! (font, size, spacing, leading, text and line matrices) well enough to
//! place every shown string on the page.

use std::collections::{HashMap, HashSet};

use lopdf::content::Operation;
use lopdf::Object;

use super::lines::GlyphRun;
use crate::util::Rgb;

/// Adjustment in a `TJ` array (thousandths of an em) treated as a word space.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Fallback glyph advance when the font has no usable `/Widths`, in em.
const DEFAULT_ADVANCE_EM: f32 = 0.5;

/// Affine matrix `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// A matrix whose runs the line builder will reject.
    const INVALID: Matrix = Matrix {
        a: f32::NAN,
        b: f32::NAN,
        c: f32::NAN,
        d: f32::NAN,
        e: f32::NAN,
        f: f32::NAN,
    };

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        let v: Vec<f32> = operands.iter().map(number).collect::<Option<_>>()?;
        match v.as_slice() {
            [a, b, c, d, e, f] => Some(Self {
                a: *a,
                b: *b,
                c: *c,
                d: *d,
                e: *e,
                f: *f,
            }),
            _ => None,
        }
    }

    /// `self × other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Apply to a point.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Length of the transformed x unit vector.
    pub fn x_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    /// Length of the transformed y unit vector.
    pub fn y_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    pub fn to_vec(self) -> Vec<f32> {
        vec![self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

/// Everything the interpreter needs to know about one font resource.
pub struct FontEntry<'a> {
    pub base_font: String,
    /// `(FirstChar, Widths)` in thousandths of an em
    pub widths: Option<(u32, Vec<f32>)>,
    /// Composite (Type0) font with two-byte codes
    pub two_byte: bool,
    pub decode: Box<dyn Fn(&[u8]) -> String + 'a>,
}

impl FontEntry<'_> {
    /// A font known only by name, decoded with the byte-level fallback.
    pub fn simple(base_font: impl Into<String>) -> FontEntry<'static> {
        FontEntry {
            base_font: base_font.into(),
            widths: None,
            two_byte: false,
            decode: Box::new(decode_text_simple),
        }
    }

    /// Advance of `bytes` in unscaled text space.
    fn advance(&self, bytes: &[u8], decoded: &str, ts: &TextState) -> f32 {
        let h = ts.horizontal_scale;
        match (&self.widths, self.two_byte) {
            (Some((first, widths)), false) => bytes
                .iter()
                .map(|&code| {
                    let w = (code as u32)
                        .checked_sub(*first)
                        .and_then(|i| widths.get(i as usize))
                        .copied()
                        .unwrap_or(DEFAULT_ADVANCE_EM * 1000.0);
                    let word = if code == b' ' { ts.word_spacing } else { 0.0 };
                    (w / 1000.0 * ts.font_size + ts.char_spacing + word) * h
                })
                .sum(),
            _ => decoded
                .chars()
                .map(|c| {
                    let word = if c == ' ' { ts.word_spacing } else { 0.0 };
                    (DEFAULT_ADVANCE_EM * ts.font_size + ts.char_spacing + word) * h
                })
                .sum(),
        }
    }
}

/// An image XObject drawn on the page, in PDF points.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlacement {
    /// XObject resource name
    pub name: String,
    /// Left edge
    pub x: f32,
    /// Bottom edge
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone)]
struct TextState {
    font: Vec<u8>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Vec::new(),
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    fill: Rgb,
}

/// Output of one content stream.
#[derive(Debug, Default)]
pub struct Interpreted {
    pub runs: Vec<GlyphRun>,
    pub images: Vec<ImagePlacement>,
}

/// Walks content-stream operations.
pub struct ContentInterpreter<'f, 'a> {
    fonts: &'f HashMap<Vec<u8>, FontEntry<'a>>,
    images: &'f HashSet<Vec<u8>>,
    gs: GraphicsState,
    stack: Vec<GraphicsState>,
    ts: TextState,
    tm: Matrix,
    tlm: Matrix,
    in_text: bool,
    out: Interpreted,
}

impl<'f, 'a> ContentInterpreter<'f, 'a> {
    /// `fonts` maps font resource names, `images` lists image XObject names.
    pub fn new(fonts: &'f HashMap<Vec<u8>, FontEntry<'a>>, images: &'f HashSet<Vec<u8>>) -> Self {
        Self {
            fonts,
            images,
            gs: GraphicsState {
                ctm: Matrix::IDENTITY,
                fill: Rgb::BLACK,
            },
            stack: Vec::new(),
            ts: TextState::default(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            in_text: false,
            out: Interpreted::default(),
        }
    }

    /// Start from a base CTM (e.g. to shift a MediaBox origin to zero).
    pub fn with_ctm(mut self, ctm: Matrix) -> Self {
        self.gs.ctm = ctm;
        self
    }

    pub fn run(mut self, operations: &[Operation]) -> Interpreted {
        for op in operations {
            self.step(op);
        }
        self.out
    }

    fn step(&mut self, op: &Operation) {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "q" => self.stack.push(self.gs),
            "Q" => {
                if let Some(gs) = self.stack.pop() {
                    self.gs = gs;
                }
            }
            "cm" => match Matrix::from_operands(operands) {
                Some(m) => self.gs.ctm = m.then(&self.gs.ctm),
                None => log::warn!("Ignoring malformed cm operands"),
            },
            "rg" | "g" | "k" | "sc" | "scn" => {
                if let Some(color) = fill_color(operands) {
                    self.gs.fill = color;
                }
            }
            "BT" => {
                self.in_text = true;
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "ET" => self.in_text = false,
            "Tf" => {
                if let [Object::Name(name), size, ..] = operands {
                    self.ts.font = name.clone();
                    self.ts.font_size = number(size).unwrap_or(self.ts.font_size);
                }
            }
            "Tc" => set_number(&mut self.ts.char_spacing, operands),
            "Tw" => set_number(&mut self.ts.word_spacing, operands),
            "TL" => set_number(&mut self.ts.leading, operands),
            "Tz" => {
                if let Some(v) = operands.first().and_then(number) {
                    self.ts.horizontal_scale = v / 100.0;
                }
            }
            "Td" => self.move_line(operands, false),
            "TD" => self.move_line(operands, true),
            "Tm" => {
                let m = Matrix::from_operands(operands).unwrap_or_else(|| {
                    log::warn!("Malformed Tm operands; runs until the next Tm are dropped");
                    Matrix::INVALID
                });
                self.tm = m;
                self.tlm = m;
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(&[TjItem::Text(bytes)]);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(&[TjItem::Text(bytes)]);
                }
            }
            "\"" => {
                if let [aw, ac, Object::String(bytes, _)] = operands {
                    self.ts.word_spacing = number(aw).unwrap_or(0.0);
                    self.ts.char_spacing = number(ac).unwrap_or(0.0);
                    self.next_line();
                    self.show(&[TjItem::Text(bytes)]);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let items: Vec<TjItem<'_>> = items
                        .iter()
                        .filter_map(|o| match o {
                            Object::String(bytes, _) => Some(TjItem::Text(bytes)),
                            other => number(other).map(TjItem::Adjust),
                        })
                        .collect();
                    self.show(&items);
                }
            }
            "Do" => {
                if let Some(Object::Name(name)) = operands.first() {
                    if self.images.contains(name) {
                        self.place_image(name);
                    }
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, operands: &[Object], set_leading: bool) {
        let (Some(tx), Some(ty)) = (
            operands.first().and_then(number),
            operands.get(1).and_then(number),
        ) else {
            log::warn!("Ignoring malformed text move operands");
            return;
        };
        if set_leading {
            self.ts.leading = -ty;
        }
        self.tlm = Matrix::translate(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        self.tlm = Matrix::translate(0.0, -self.ts.leading).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn show(&mut self, items: &[TjItem<'_>]) {
        if !self.in_text {
            return;
        }
        let fonts = self.fonts;
        let fallback;
        let font = match fonts.get(&self.ts.font) {
            Some(f) => f,
            None => {
                fallback = FontEntry::simple(String::from_utf8_lossy(&self.ts.font).to_string());
                &fallback
            }
        };

        let start = self.tm.then(&self.gs.ctm);
        let mut text = String::new();
        let mut advance = 0.0;
        for item in items {
            match item {
                TjItem::Text(bytes) => {
                    let decoded = (font.decode)(bytes);
                    advance += font.advance(bytes, &decoded, &self.ts);
                    text.push_str(&decoded);
                }
                TjItem::Adjust(n) => {
                    advance -= n / 1000.0 * self.ts.font_size * self.ts.horizontal_scale;
                    let word_break = -n > TJ_SPACE_THRESHOLD
                        && !text.is_empty()
                        && !text.ends_with(char::is_whitespace);
                    if word_break {
                        text.push(' ');
                    }
                }
            }
        }

        self.tm = Matrix::translate(advance, 0.0).then(&self.tm);

        if text.is_empty() {
            return;
        }
        self.out.runs.push(GlyphRun {
            text,
            transform: start.to_vec(),
            width: advance * start.x_scale(),
            font_size: self.ts.font_size * start.y_scale(),
            font_name: font.base_font.clone(),
            color: self.gs.fill,
        });
    }

    fn place_image(&mut self, name: &[u8]) {
        let ctm = &self.gs.ctm;
        let corners = [
            ctm.apply(0.0, 0.0),
            ctm.apply(1.0, 0.0),
            ctm.apply(0.0, 1.0),
            ctm.apply(1.0, 1.0),
        ];
        let min_x = corners.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
        if ![min_x, max_x, min_y, max_y].iter().all(|v| v.is_finite()) {
            log::warn!("Skipping image placement with non-finite CTM");
            return;
        }
        self.out.images.push(ImagePlacement {
            name: String::from_utf8_lossy(name).to_string(),
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        });
    }
}

enum TjItem<'o> {
    Text(&'o [u8]),
    Adjust(f32),
}

fn set_number(target: &mut f32, operands: &[Object]) {
    if let Some(v) = operands.first().and_then(number) {
        *target = v;
    }
}

/// Fill colour from `g` (1), `rg` (3) or `k` (4) style operands.
fn fill_color(operands: &[Object]) -> Option<Rgb> {
    let v: Vec<f32> = operands.iter().map(number).collect::<Option<_>>()?;
    match v.as_slice() {
        [gray] => Some(Rgb::from_gray(*gray)),
        [r, g, b] => Some(Rgb::new(*r, *g, *b)),
        [c, m, y, k] => Some(Rgb::from_cmyk(*c, *m, *y, *k)),
        _ => None,
    }
}

/// Helper to extract number from PDF object.
pub fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let utf16: Vec<u16> = body
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

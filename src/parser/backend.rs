//! PDF backend abstraction layer.
//!
//! The classifier and the reflow engine only see [`PdfBackend`]; the
//! concrete PDF library (lopdf) stays behind [`LopdfBackend`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{
    dictionary, Dictionary, Document as LopdfDocument, Object, ObjectId, Stream, StringFormat,
};

use super::content::{
    decode_text_simple, number, ContentInterpreter, FontEntry, ImagePlacement, Matrix,
};
use super::lines::GlyphRun;
use crate::error::{Error, Result};
use crate::reflow::{encode_win_ansi, DrawOp, StandardFont};
use crate::util::Rgb;

/// Limit on `/Parent` hops when looking up inherited page attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Page geometry in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageInfo {
    pub width: f32,
    pub height: f32,
    /// `/Rotate`, in degrees
    pub rotation: i32,
    /// Lower-left corner of the MediaBox
    pub origin: (f32, f32),
}

impl Default for PageInfo {
    fn default() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            rotation: 0,
            origin: (0.0, 0.0),
        }
    }
}

/// Document information dictionary and header version.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub version: String,
}

/// What a page draws that the pipeline cares about, in origin-shifted points.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub runs: Vec<GlyphRun>,
    pub images: Vec<ImagePlacement>,
}

/// A font made available to [`PdfBackend::append_page_ops`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontHandle {
    /// Name under which the font is registered in page resources
    pub resource_name: String,
    object_id: ObjectId,
}

impl FontHandle {
    pub fn new(resource_name: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            resource_name: resource_name.into(),
            object_id,
        }
    }
}

/// Fonts embedded for one export, keyed by face.
pub type FontSet = HashMap<StandardFont, FontHandle>;

/// Narrow capability interface over a PDF library.
///
/// Pages are numbered from 1.
pub trait PdfBackend {
    fn page_count(&self) -> u32;

    fn page_info(&self, page: u32) -> Result<PageInfo>;

    /// Glyph runs and image placements of a page.
    fn page_content(&self, page: u32) -> Result<PageContent>;

    fn text_runs(&self, page: u32) -> Result<Vec<GlyphRun>> {
        Ok(self.page_content(page)?.runs)
    }

    fn image_placements(&self, page: u32) -> Result<Vec<ImagePlacement>> {
        Ok(self.page_content(page)?.images)
    }

    fn metadata(&self) -> DocumentInfo;

    /// Register a Standard 14 font once; the handle is valid on every page.
    fn embed_font(&mut self, font: StandardFont) -> Result<FontHandle>;

    /// Draw `ops` on top of the existing page content.
    fn append_page_ops(&mut self, page: u32, ops: &[DrawOp], fonts: &FontSet) -> Result<()>;

    /// Serialize the (possibly modified) document.
    fn save(&mut self) -> Result<Vec<u8>>;
}

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
    pages: BTreeMap<u32, ObjectId>,
    font_counter: u32,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_document(LopdfDocument::load(path)?)
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        Self::from_document(LopdfDocument::load_mem(data)?)
    }

    fn from_document(doc: LopdfDocument) -> Result<Self> {
        if doc.is_encrypted() {
            log::warn!("Document is encrypted; text may not decode");
        }
        let pages = doc.get_pages();
        Ok(Self {
            doc,
            pages,
            font_counter: 0,
        })
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.pages
            .get(&page)
            .copied()
            .ok_or(Error::PageOutOfRange(page, self.pages.len() as u32))
    }

    /// Follow a reference, or return the object itself.
    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        self.resolve(obj).and_then(|o| o.as_dict().ok())
    }

    /// Page attribute, inherited through `/Parent` when the page lacks it.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut id = page_id;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            let dict = self.doc.get_dictionary(id).ok()?;
            if let Ok(value) = dict.get(key) {
                return self.resolve(value);
            }
            id = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        }
        None
    }

    fn resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        self.inherited(page_id, b"Resources")
            .and_then(|o| o.as_dict().ok())
    }

    /// Interpreter-ready entries for every font of a page.
    fn page_fonts(&self, page_id: ObjectId) -> HashMap<Vec<u8>, FontEntry<'_>> {
        let fonts = match self.doc.get_page_fonts(page_id) {
            Ok(fonts) => fonts,
            Err(e) => {
                log::warn!("Cannot read fonts of page object {:?}: {}", page_id, e);
                return HashMap::new();
            }
        };

        fonts
            .into_iter()
            .map(|(name, dict)| (name, self.font_entry(dict)))
            .collect()
    }

    fn font_entry<'a>(&'a self, dict: &'a Dictionary) -> FontEntry<'a> {
        let base_font = dict
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        let two_byte = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|n| n == b"Type0");

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| o.as_i64().ok());
        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| o.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| self.resolve(w).and_then(number).unwrap_or(0.0))
                    .collect::<Vec<f32>>()
            });

        let decode: Box<dyn Fn(&[u8]) -> String + 'a> = match dict.get_font_encoding(&self.doc) {
            Ok(encoding) => Box::new(move |bytes: &[u8]| {
                LopdfDocument::decode_text(&encoding, bytes)
                    .unwrap_or_else(|_| decode_text_simple(bytes))
            }),
            Err(_) => Box::new(decode_text_simple),
        };

        FontEntry {
            base_font,
            widths: match (first_char, widths) {
                (Some(first), Some(w)) if first >= 0 => Some((first as u32, w)),
                _ => None,
            },
            two_byte,
            decode,
        }
    }

    /// Names of the image XObjects a page can draw.
    fn page_images(&self, page_id: ObjectId) -> HashSet<Vec<u8>> {
        let Some(xobjects) = self
            .resources(page_id)
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|o| self.resolve_dict(o))
        else {
            return HashSet::new();
        };

        xobjects
            .iter()
            .filter(|(_, obj)| {
                matches!(self.resolve(obj), Some(Object::Stream(stream))
                    if stream.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Image".as_slice()))
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Font resource names used anywhere in the document.
    fn used_font_names(&self) -> HashSet<Vec<u8>> {
        self.pages
            .values()
            .filter_map(|id| self.doc.get_page_fonts(*id).ok())
            .flat_map(|fonts| fonts.into_keys())
            .collect()
    }

    /// Page `/Resources` as an inline dictionary whose `/Font` entry is
    /// also inline, so new fonts can be added without touching shared objects.
    fn owned_resources(&self, page_id: ObjectId) -> Dictionary {
        let mut resources = self.resources(page_id).cloned().unwrap_or_default();
        let fonts = resources
            .get(b"Font")
            .ok()
            .and_then(|o| self.resolve_dict(o))
            .cloned()
            .unwrap_or_default();
        resources.set("Font", Object::Dictionary(fonts));
        resources
    }

    fn add_stream(&mut self, operations: Vec<Operation>) -> Result<ObjectId> {
        let bytes = Content { operations }
            .encode()
            .map_err(|e| Error::Render(e.to_string()))?;
        Ok(self.doc.add_object(Stream::new(dictionary! {}, bytes)))
    }
}

impl PdfBackend for LopdfBackend {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_info(&self, page: u32) -> Result<PageInfo> {
        let page_id = self.page_id(page)?;
        let mut info = PageInfo::default();

        let media_box = self
            .inherited(page_id, b"MediaBox")
            .and_then(|o| o.as_array().ok())
            .and_then(|arr| {
                arr.iter()
                    .map(|v| self.resolve(v).and_then(number))
                    .collect::<Option<Vec<f32>>>()
            });
        match media_box.as_deref() {
            Some([x0, y0, x1, y1]) => {
                info.origin = (x0.min(*x1), y0.min(*y1));
                info.width = (x1 - x0).abs();
                info.height = (y1 - y0).abs();
            }
            _ => log::warn!("Page {}: no usable MediaBox, assuming US Letter", page),
        }

        info.rotation = self
            .inherited(page_id, b"Rotate")
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0) as i32;
        Ok(info)
    }

    fn page_content(&self, page: u32) -> Result<PageContent> {
        let page_id = self.page_id(page)?;
        let info = self.page_info(page)?;

        let data = self
            .doc
            .get_page_content(page_id)
            .map_err(|e| Error::PageParse {
                page,
                message: e.to_string(),
            })?;
        let content = Content::decode(&data).map_err(|e| Error::PageParse {
            page,
            message: e.to_string(),
        })?;

        let fonts = self.page_fonts(page_id);
        let images = self.page_images(page_id);
        let (ox, oy) = info.origin;
        let out = ContentInterpreter::new(&fonts, &images)
            .with_ctm(Matrix::translate(-ox, -oy))
            .run(&content.operations);

        log::debug!(
            "Page {}: {} operations, {} runs, {} images",
            page,
            content.operations.len(),
            out.runs.len(),
            out.images.len()
        );
        Ok(PageContent {
            runs: out.runs,
            images: out.images,
        })
    }

    fn metadata(&self) -> DocumentInfo {
        let mut info = DocumentInfo {
            version: self.doc.version.to_string(),
            ..Default::default()
        };

        let Some(dict) = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|o| self.resolve_dict(o))
        else {
            return info;
        };

        info.title = get_string_from_dict(dict, b"Title");
        info.author = get_string_from_dict(dict, b"Author");
        info.created = get_string_from_dict(dict, b"CreationDate").and_then(|s| parse_pdf_date(&s));
        info.modified = get_string_from_dict(dict, b"ModDate").and_then(|s| parse_pdf_date(&s));
        info
    }

    fn embed_font(&mut self, font: StandardFont) -> Result<FontHandle> {
        let taken = self.used_font_names();
        let resource_name = loop {
            self.font_counter += 1;
            let candidate = format!("RF{}", self.font_counter);
            if !taken.contains(candidate.as_bytes()) {
                break candidate;
            }
        };

        let object_id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        log::debug!("Embedded {} as /{}", font, resource_name);
        Ok(FontHandle {
            resource_name,
            object_id,
        })
    }

    fn append_page_ops(&mut self, page: u32, ops: &[DrawOp], fonts: &FontSet) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let page_id = self.page_id(page)?;
        let (ox, oy) = self.page_info(page)?.origin;

        let mut resources = self.owned_resources(page_id);
        if let Ok(Object::Dictionary(font_dict)) = resources.get_mut(b"Font") {
            for handle in fonts.values() {
                font_dict.set(
                    handle.resource_name.as_bytes().to_vec(),
                    Object::Reference(handle.object_id),
                );
            }
        }

        let mut operations = vec![Operation::new("Q", vec![])];
        for op in ops {
            match op {
                DrawOp::CoverRect(rect) => {
                    operations.push(Operation::new("q", vec![]));
                    operations.push(fill_color_op(Rgb::WHITE));
                    operations.push(Operation::new(
                        "re",
                        vec![
                            Object::Real(rect.x + ox),
                            Object::Real(rect.y + oy),
                            Object::Real(rect.width),
                            Object::Real(rect.height),
                        ],
                    ));
                    operations.push(Operation::new("f", vec![]));
                    operations.push(Operation::new("Q", vec![]));
                }
                DrawOp::Text {
                    x,
                    y,
                    font,
                    size,
                    color,
                    text,
                } => {
                    let Some(handle) = fonts.get(font) else {
                        log::warn!("Page {}: no embedded font for {}, skipping line", page, font);
                        continue;
                    };
                    operations.push(Operation::new("BT", vec![]));
                    operations.push(Operation::new(
                        "Tf",
                        vec![
                            Object::Name(handle.resource_name.as_bytes().to_vec()),
                            Object::Real(*size),
                        ],
                    ));
                    operations.push(fill_color_op(*color));
                    operations.push(Operation::new(
                        "Td",
                        vec![Object::Real(x + ox), Object::Real(y + oy)],
                    ));
                    operations.push(Operation::new(
                        "Tj",
                        vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                    ));
                    operations.push(Operation::new("ET", vec![]));
                }
            }
        }

        let open = self.add_stream(vec![Operation::new("q", vec![])])?;
        let close = self.add_stream(operations)?;

        let page_dict = self.doc.get_dictionary_mut(page_id)?;
        let mut contents = vec![Object::Reference(open)];
        match page_dict.get(b"Contents") {
            Ok(Object::Array(existing)) => contents.extend(existing.iter().cloned()),
            Ok(other) => contents.push(other.clone()),
            Err(_) => {}
        }
        contents.push(Object::Reference(close));
        page_dict.set("Contents", Object::Array(contents));
        page_dict.set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    fn save(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| Error::Render(e.to_string()))?;
        Ok(out)
    }
}

fn fill_color_op(color: Rgb) -> Operation {
    Operation::new(
        "rg",
        vec![
            Object::Real(color.r),
            Object::Real(color.g),
            Object::Real(color.b),
        ],
    )
}

/// Helper to get a string from a PDF dictionary.
fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => {
            let text = decode_text_simple(bytes);
            let text = text.trim_matches('\0').trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        Object::Name(bytes) => String::from_utf8(bytes.clone()).ok(),
        _ => None,
    }
}

/// Parse a PDF date string (D:YYYYMMDDHHmmSSOHH'mm').
///
/// The timezone suffix is ignored and the time read as UTC.
pub fn parse_pdf_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);

    // At minimum we need YYYY
    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6).and_then(|m| m.parse().ok()).unwrap_or(1);
    let day: u32 = s.get(6..8).and_then(|d| d.parse().ok()).unwrap_or(1);
    let hour: u32 = s.get(8..10).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = s.get(10..12).and_then(|m| m.parse().ok()).unwrap_or(0);
    let second: u32 = s.get(12..14).and_then(|s| s.parse().ok()).unwrap_or(0);

    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
}

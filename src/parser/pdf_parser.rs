//! Page-by-page driver producing a [`Document`].

use std::path::Path;

use rayon::prelude::*;

use super::backend::{LopdfBackend, PageContent, PageInfo, PdfBackend};
use super::classifier::{classify_page, PageContext};
use super::lines::build_lines;
use super::options::{ErrorMode, ParseOptions};
use crate::detect::check_signature;
use crate::error::{Error, Result};
use crate::model::{
    Block, BlockContent, BlockStyle, BlockType, Dimensions, Document, ImageContent, Page,
    CERTAIN_CONFIDENCE,
};
use crate::reflow::{pdf_to_layout, PdfRect};

/// PDF document parser.
pub struct PdfParser<B: PdfBackend = LopdfBackend> {
    backend: B,
    options: ParseOptions,
    source: Option<Vec<u8>>,
    file_name: Option<String>,
}

/// Backend output for one page, ready for classification.
struct PageInput {
    number: u32,
    info: PageInfo,
    /// `None` for unselected or failed pages
    content: Option<PageContent>,
}

impl PdfParser<LopdfBackend> {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ParseOptions::default())
    }

    /// Open a PDF file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let mut parser = Self::from_bytes_with_options(&data, options)?;
        parser.file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        Ok(parser)
    }

    /// Parse a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    /// Parse a PDF from bytes with custom options.
    ///
    /// The bytes are kept on the parsed document for a later export.
    pub fn from_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Self> {
        let header = check_signature(data)?;
        log::debug!("Loading {} ({} bytes)", header, data.len());

        let backend = LopdfBackend::load_bytes(data)?;
        let mut parser = Self::with_backend(backend, options);
        parser.source = Some(data.to_vec());
        Ok(parser)
    }
}

impl<B: PdfBackend> PdfParser<B> {
    /// Parse through any backend, e.g. a test fake.
    pub fn with_backend(backend: B, options: ParseOptions) -> Self {
        Self {
            backend,
            options,
            source: None,
            file_name: None,
        }
    }

    /// Record the file name the bytes were uploaded under.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Get the number of pages.
    pub fn page_count(&self) -> u32 {
        self.backend.page_count()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Parse the document and return a structured Document.
    pub fn parse(&self) -> Result<Document> {
        let page_count = self.backend.page_count();
        if page_count == 0 {
            return Err(Error::EmptyDocument);
        }

        let mut document = Document::new();
        let info = self.backend.metadata();
        document.metadata.title = info.title;
        document.metadata.author = info.author;
        document.metadata.created = info.created;
        document.metadata.modified = info.modified;
        document.metadata.version = Some(info.version).filter(|v| !v.is_empty());
        document.metadata.original_file_name = self.file_name.clone();
        document.metadata.original_bytes = self.source.clone();

        // Backend access stays on this thread; only classification fans out.
        let inputs = (1..=page_count)
            .map(|n| self.load_page(n))
            .collect::<Result<Vec<_>>>()?;

        let options = &self.options;
        let pages: Vec<Page> = if options.parallel {
            inputs
                .into_par_iter()
                .map(|input| build_page(input, options))
                .collect()
        } else {
            inputs
                .into_iter()
                .map(|input| build_page(input, options))
                .collect()
        };

        for page in pages {
            document.add_page(page);
        }

        log::info!(
            "Parsed {} pages into {} blocks",
            document.page_count(),
            document.block_count()
        );
        Ok(document)
    }

    /// Fetch one page from the backend, applying page selection and error mode.
    fn load_page(&self, number: u32) -> Result<PageInput> {
        let selected = self.options.pages.includes(number);
        let loaded = self
            .backend
            .page_info(number)
            .and_then(|info| {
                let content = if selected {
                    Some(self.backend.page_content(number)?)
                } else {
                    None
                };
                Ok((info, content))
            })
            .map_err(|e| match e {
                page_level @ Error::PageParse { .. } => page_level,
                other => Error::PageParse {
                    page: number,
                    message: other.to_string(),
                },
            });

        match loaded {
            Ok((info, content)) => Ok(PageInput {
                number,
                info,
                content,
            }),
            Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                log::warn!("Skipping page {}: {}", number, e);
                Ok(PageInput {
                    number,
                    info: PageInfo::default(),
                    content: None,
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// Line building and classification for one page.
fn build_page(input: PageInput, options: &ParseOptions) -> Page {
    let dims = Dimensions::from_points(input.info.width, input.info.height, options.scale);
    let mut page = Page::new(input.number, dims);
    page.rotation = input.info.rotation.rem_euclid(360) as u16;

    let Some(content) = input.content else {
        return page;
    };

    let config = &options.classifier;
    let lines = build_lines(&content.runs, input.info.height, options.scale, config);
    let images = content
        .images
        .iter()
        .filter_map(|img| {
            let rect = PdfRect::new(img.x, img.y, img.width, img.height);
            Block::new(
                String::new(),
                BlockType::Image,
                BlockContent::Image(ImageContent {
                    src: format!("page{}/{}", input.number, img.name),
                    alt: None,
                    caption: None,
                }),
                pdf_to_layout(&rect, &dims).clamped(),
                BlockStyle::default(),
                CERTAIN_CONFIDENCE,
            )
            .ok()
        })
        .collect();

    let ctx = PageContext {
        page_number: input.number,
        width: dims.width,
        height: dims.height,
        scale: options.scale,
    };
    for block in classify_page(lines, images, &ctx, config) {
        if let Err(e) = page.add_block(block) {
            log::warn!("Page {}: {}", input.number, e);
        }
    }
    page
}

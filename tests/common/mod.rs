//! In-memory PDF fixtures shared by the integration tests.

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// One `Tj` placed with `Td` inside its own text object.
pub struct Line {
    pub text: &'static str,
    pub bold: bool,
    pub size: i64,
    pub x: i64,
    pub y: i64,
}

pub fn line(text: &'static str, size: i64, x: i64, y: i64) -> Line {
    Line {
        text,
        bold: false,
        size,
        x,
        y,
    }
}

pub fn bold(text: &'static str, size: i64, x: i64, y: i64) -> Line {
    Line {
        text,
        bold: true,
        size,
        x,
        y,
    }
}

fn page_content(lines: &[Line]) -> Vec<u8> {
    let mut operations = Vec::new();
    for l in lines {
        let font = if l.bold { "F2" } else { "F1" };
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![font.into(), Object::Integer(l.size)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Integer(l.x), Object::Integer(l.y)],
        ));
        operations.push(Operation::new("Tj", vec![Object::string_literal(l.text)]));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }.encode().unwrap()
}

/// A US Letter PDF with one page per entry of `pages`.
///
/// `F1` is Helvetica and `F2` Helvetica-Bold, both shared through the page tree.
pub fn build_pdf(pages: &[Vec<Line>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let heavy = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => regular, "F2" => heavy },
    });

    let mut kids = Vec::new();
    for lines in pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, page_content(lines)));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => Object::Integer(kids.len() as i64),
            "Kids" => kids,
            "Resources" => resources_id,
            "MediaBox" => [0, 0, 612, 792]
                .iter()
                .map(|v| Object::Integer(*v))
                .collect::<Vec<_>>(),
        }),
    );
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Quarterly Report"),
        "Author" => Object::string_literal("Finance"),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Heading at 24pt over five 11pt body lines.
pub fn report_page() -> Vec<Line> {
    vec![
        bold("Quarterly Report", 24, 72, 700),
        line("Revenue grew in every region this quarter", 11, 72, 650),
        line("driven by strong demand for the new product", 11, 72, 636),
        line("line and steady renewals across accounts.", 11, 72, 622),
        line("Operating costs stayed flat compared with", 11, 72, 608),
        line("the previous quarter despite new hiring.", 11, 72, 594),
    ]
}

/// Three numbered items under a short intro paragraph.
pub fn list_page() -> Vec<Line> {
    vec![
        line("The plan has three steps for the coming year.", 11, 72, 700),
        line("1. First item", 11, 72, 650),
        line("2. Second item", 11, 72, 636),
        line("3. Third item", 11, 72, 622),
    ]
}

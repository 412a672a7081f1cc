//! Small PDF builders for tests

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Multi-page PDF assembled from raw content operations.
/// `F1` is Helvetica, `F2` is Helvetica-Bold.
#[derive(Default)]
pub(crate) struct PdfFixture {
    pages: Vec<Vec<Operation>>,
}

impl PdfFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, ops: Vec<Operation>) -> Self {
        self.pages.push(ops);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let regular = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let bold = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => regular, "F2" => bold },
        });

        let mut kids: Vec<Object> = Vec::new();
        for ops in &self.pages {
            let content = Content {
                operations: ops.clone(),
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }
}

fn text_with_font(font: &str, x: i64, y: i64, size: i64, s: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(s)]),
        Operation::new("ET", vec![]),
    ]
}

/// Regular text at a baseline position
pub(crate) fn text(x: i64, y: i64, size: i64, s: &str) -> Vec<Operation> {
    text_with_font("F1", x, y, size, s)
}

pub(crate) fn bold_text(x: i64, y: i64, size: i64, s: &str) -> Vec<Operation> {
    text_with_font("F2", x, y, size, s)
}

/// Stroked straight line
pub(crate) fn line(x1: i64, y1: i64, x2: i64, y2: i64) -> Vec<Operation> {
    vec![
        Operation::new("m", vec![x1.into(), y1.into()]),
        Operation::new("l", vec![x2.into(), y2.into()]),
        Operation::new("S", vec![]),
    ]
}

/// Text laid out in columns without any rules
pub(crate) fn aligned_rows(x: i64, top: i64, col_width: i64, row_height: i64, rows: &[&[&str]]) -> Vec<Operation> {
    let mut ops = Vec::new();
    for (r, row) in rows.iter().enumerate() {
        let y = top - r as i64 * row_height;
        for (c, cell) in row.iter().enumerate() {
            if !cell.is_empty() {
                ops.extend(text(x + c as i64 * col_width, y, 10, cell));
            }
        }
    }
    ops
}

/// A fully ruled table with text inside each cell
pub(crate) fn ruled_table(x: i64, top: i64, col_width: i64, row_height: i64, rows: &[&[&str]]) -> Vec<Operation> {
    let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0) as i64;
    let right = x + columns * col_width;
    let bottom = top - rows.len() as i64 * row_height;

    let mut ops = Vec::new();
    for r in 0..=rows.len() as i64 {
        let y = top - r * row_height;
        ops.extend(line(x, y, right, y));
    }
    for c in 0..=columns {
        let cx = x + c * col_width;
        ops.extend(line(cx, top, cx, bottom));
    }
    for (r, row) in rows.iter().enumerate() {
        let baseline = top - (r as i64 + 1) * row_height + 6;
        for (c, cell) in row.iter().enumerate() {
            if !cell.is_empty() {
                ops.extend(text(x + c as i64 * col_width + 5, baseline, 10, cell));
            }
        }
    }
    ops
}

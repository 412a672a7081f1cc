//! Shared helpers for integration tests

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdf_convert::config::ConverterConfig;
use std::path::Path;

/// Default configuration with storage under `dir`
pub fn config_in(dir: &Path) -> ConverterConfig {
    let mut config = ConverterConfig::default();
    config.storage.uploads_dir = dir.join("uploads");
    config.storage.converted_dir = dir.join("converted");
    config
}

/// Single-font PDF with one page per operation list
pub fn build_pdf(pages: Vec<Vec<Operation>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for operations in pages {
        let content = Content { operations };
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

pub fn text(x: i64, y: i64, size: i64, s: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(s)]),
        Operation::new("ET", vec![]),
    ]
}

fn line(x1: i64, y1: i64, x2: i64, y2: i64) -> Vec<Operation> {
    vec![
        Operation::new("m", vec![x1.into(), y1.into()]),
        Operation::new("l", vec![x2.into(), y2.into()]),
        Operation::new("S", vec![]),
    ]
}

/// Fully ruled table, 120pt columns and 20pt rows, top-left at (72, 700)
pub fn ruled_table(rows: &[&[&str]]) -> Vec<Operation> {
    let (x, top, width, height) = (72, 700, 120, 20);
    let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0) as i64;
    let right = x + columns * width;
    let bottom = top - rows.len() as i64 * height;

    let mut ops = Vec::new();
    for r in 0..=rows.len() as i64 {
        ops.extend(line(x, top - r * height, right, top - r * height));
    }
    for c in 0..=columns {
        ops.extend(line(x + c * width, top, x + c * width, bottom));
    }
    for (r, row) in rows.iter().enumerate() {
        let baseline = top - (r as i64 + 1) * height + 6;
        for (c, cell) in row.iter().enumerate() {
            ops.extend(text(x + c as i64 * width + 5, baseline, 10, cell));
        }
    }
    ops
}

/// Form fields for a multipart request body
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub const BOUNDARY: &str = "pdfconvertboundary";

/// Encode a `multipart/form-data` body using [`BOUNDARY`]
pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

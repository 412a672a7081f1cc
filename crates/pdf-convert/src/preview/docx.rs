//! Reads a .docx package into the document model

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read};

use crate::types::{Block, DocumentModel, Paragraph, ParagraphStyle, Run, TableBlock};

/// Parse `word/document.xml` into blocks in document order
pub fn read_document(data: &[u8]) -> Result<DocumentModel, String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).map_err(|e| format!("not a docx package: {}", e))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| format!("missing word/document.xml: {}", e))?
        .read_to_string(&mut xml)
        .map_err(|e| format!("unreadable word/document.xml: {}", e))?;

    parse_document_xml(&xml)
}

fn parse_document_xml(xml: &str) -> Result<DocumentModel, String> {
    let mut reader = Reader::from_str(xml);
    let mut state = DocumentReader::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => state.open(&e, false),
            Ok(Event::Empty(e)) => state.open(&e, true),
            Ok(Event::End(e)) => state.close(e.name().as_ref()),
            Ok(Event::Text(e)) => {
                if state.in_text {
                    let text = e.unescape().map_err(|e| e.to_string())?;
                    state.push_text(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "invalid XML at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
    }

    Ok(DocumentModel {
        blocks: state.blocks,
    })
}

/// Value of the `w:val` attribute, if present
fn val(e: &BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"val")
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Toggle properties are on unless explicitly switched off
fn toggle(e: &BytesStart) -> bool {
    !matches!(val(e).as_deref(), Some("0" | "false" | "off"))
}

#[derive(Default)]
struct DocumentReader {
    blocks: Vec<Block>,
    paragraph: Option<Paragraph>,
    run: Option<Run>,
    in_text: bool,
    in_paragraph_props: bool,
    table_depth: usize,
    table_rows: Vec<Vec<String>>,
    row: Option<Vec<String>>,
    cell: Option<Vec<String>>,
}

impl DocumentReader {
    fn open(&mut self, e: &BytesStart, empty: bool) {
        let name = e.name();
        match name.as_ref() {
            b"w:p" => {
                self.paragraph = Some(Paragraph::new(ParagraphStyle::Body));
                if empty {
                    self.close(b"w:p");
                }
            }
            b"w:pPr" => self.in_paragraph_props = !empty,
            b"w:pStyle" => {
                if let (true, Some(paragraph), Some(style)) =
                    (self.in_paragraph_props, self.paragraph.as_mut(), val(e))
                {
                    paragraph.style = ParagraphStyle::from_style_name(&style);
                }
            }
            b"w:r" => {
                self.run = Some(Run::default());
                if empty {
                    self.close(b"w:r");
                }
            }
            // Paragraph-mark formatting lives under w:pPr and does not apply to runs
            b"w:b" | b"w:i" | b"w:u" if !self.in_paragraph_props => {
                if let Some(run) = self.run.as_mut() {
                    match name.as_ref() {
                        b"w:b" => run.bold = toggle(e),
                        b"w:i" => run.italic = toggle(e),
                        _ => run.underline = val(e).as_deref() != Some("none"),
                    }
                }
            }
            b"w:t" => self.in_text = self.run.is_some() && !empty,
            b"w:tab" => self.push_text("\t"),
            b"w:br" | b"w:cr" => self.push_text("\n"),
            b"w:tbl" => {
                self.table_depth += 1;
                if self.table_depth == 1 {
                    self.table_rows.clear();
                }
            }
            b"w:tr" if self.table_depth == 1 => self.row = Some(Vec::new()),
            b"w:tc" if self.table_depth == 1 => self.cell = Some(Vec::new()),
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"w:t" => self.in_text = false,
            b"w:pPr" => self.in_paragraph_props = false,
            b"w:r" => {
                if let (Some(run), Some(paragraph)) = (self.run.take(), self.paragraph.as_mut()) {
                    paragraph.push_run(run);
                }
            }
            b"w:p" => {
                if let Some(paragraph) = self.paragraph.take() {
                    // Nested tables flatten into the enclosing cell
                    match self.cell.as_mut() {
                        Some(cell) => cell.push(paragraph.text()),
                        None => self.blocks.push(Block::Paragraph(paragraph)),
                    }
                }
            }
            b"w:tc" if self.table_depth == 1 => {
                if let (Some(cell), Some(row)) = (self.cell.take(), self.row.as_mut()) {
                    row.push(cell.join("\n"));
                }
            }
            b"w:tr" if self.table_depth == 1 => {
                if let Some(row) = self.row.take() {
                    self.table_rows.push(row);
                }
            }
            b"w:tbl" => {
                if self.table_depth == 1 {
                    self.blocks.push(Block::Table(TableBlock {
                        rows: std::mem::take(&mut self.table_rows),
                    }));
                }
                self.table_depth = self.table_depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(run) = self.run.as_mut() {
            run.text.push_str(text);
        }
    }
}

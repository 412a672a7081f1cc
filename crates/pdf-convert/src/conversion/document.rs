//! Word-processing reconstruction of a PDF: paragraphs, headings, ruled tables and images
//! in reading order, one page break between pages

use docx_rs as docx;
use std::io::Cursor;

use crate::error::{Error, Result};
use crate::extraction::layout::{group_into_lines, PageImage, TextFragment, TextLine};
use crate::extraction::{ExtractionError, GridDetector, PdfSource};
use crate::types::{Paragraph, ParagraphStyle, Run, TableBlock};

/// Line spacing above which consecutive lines start a new paragraph, in font sizes
const PARAGRAPH_GAP_FACTOR: f32 = 1.8;

/// Lines longer than this are body text regardless of size
const MAX_HEADING_CHARS: usize = 200;

const POINTS_TO_EMU: f32 = 12_700.0;

/// One element of the reconstructed document
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutBlock {
    Paragraph(Paragraph),
    Table(TableBlock),
    Image(PageImage),
    PageBreak,
}

/// Rebuild the document's block structure from its page layouts. Stops with
/// `Cancelled` at the next page once the source is cancelled.
pub fn reconstruct(source: &PdfSource) -> std::result::Result<Vec<LayoutBlock>, ExtractionError> {
    let layouts = source.layouts();
    source.checkpoint()?;
    let body_size = body_font_size(layouts.iter().flat_map(|l| l.fragments.iter()));
    let detector = GridDetector::default();

    let mut blocks = Vec::new();
    for (index, layout) in layouts.iter().enumerate() {
        source.checkpoint()?;
        if index > 0 {
            blocks.push(LayoutBlock::PageBreak);
        }

        let tables = detector.detect(layout);
        let mut positioned: Vec<(f32, LayoutBlock)> = Vec::new();

        for table in &tables {
            positioned.push((
                table.top,
                LayoutBlock::Table(TableBlock {
                    rows: table.rows.clone(),
                }),
            ));
        }
        for image in &layout.images {
            positioned.push((image.top(), LayoutBlock::Image(image.clone())));
        }

        let loose = layout
            .fragments
            .iter()
            .filter(|f| !tables.iter().any(|t| t.contains(f)));
        for (top, paragraph) in paragraphs(group_into_lines(loose, 0.4), body_size) {
            positioned.push((top, LayoutBlock::Paragraph(paragraph)));
        }

        // Stable sort keeps same-height items in insertion order
        positioned.sort_by(|a, b| b.0.total_cmp(&a.0));
        blocks.extend(positioned.into_iter().map(|(_, block)| block));
    }

    tracing::debug!("Reconstructed {} blocks from {} pages", blocks.len(), layouts.len());
    Ok(blocks)
}

/// Median fragment font size, the size of ordinary body text
fn body_font_size<'a>(fragments: impl Iterator<Item = &'a TextFragment>) -> f32 {
    let mut sizes: Vec<f32> = fragments.map(|f| f.font_size).filter(|s| *s > 0.0).collect();
    if sizes.is_empty() {
        return 12.0;
    }
    sizes.sort_by(f32::total_cmp);
    sizes[sizes.len() / 2]
}

fn heading_style(size: f32, body_size: f32) -> ParagraphStyle {
    let ratio = size / body_size;
    if ratio >= 1.6 {
        ParagraphStyle::Heading(1)
    } else if ratio >= 1.3 {
        ParagraphStyle::Heading(2)
    } else if ratio >= 1.15 {
        ParagraphStyle::Heading(3)
    } else {
        ParagraphStyle::Body
    }
}

/// Runs of one line; fragments separated by a visible gap get a space between them
fn line_runs(line: &TextLine) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut previous: Option<&TextFragment> = None;

    for fragment in &line.fragments {
        let needs_space = previous.is_some_and(|p| fragment.x - p.right() > fragment.font_size * 0.15);
        let text = if needs_space {
            format!(" {}", fragment.text)
        } else {
            fragment.text.clone()
        };
        runs.push(Run {
            text,
            bold: fragment.bold,
            italic: fragment.italic,
            underline: false,
        });
        previous = Some(fragment);
    }
    runs
}

/// Merge lines into paragraphs; returns each paragraph with the y of its first line
fn paragraphs(lines: Vec<TextLine>, body_size: f32) -> Vec<(f32, Paragraph)> {
    let mut out: Vec<(f32, Paragraph)> = Vec::new();
    let mut previous: Option<&TextLine> = None;

    for line in &lines {
        let runs = line_runs(line);
        let length: usize = runs.iter().map(|r| r.text.chars().count()).sum();
        let style = if length <= MAX_HEADING_CHARS {
            heading_style(line.font_size, body_size)
        } else {
            ParagraphStyle::Body
        };

        let continues = match (previous, out.last()) {
            (Some(prev), Some((_, paragraph))) => {
                paragraph.style == style
                    && prev.y - line.y <= prev.font_size.max(line.font_size) * PARAGRAPH_GAP_FACTOR
            }
            _ => false,
        };

        if continues {
            if let Some((_, paragraph)) = out.last_mut() {
                join_line(paragraph, runs);
            }
        } else {
            let mut paragraph = Paragraph::new(style);
            for run in runs {
                paragraph.push_run(run);
            }
            out.push((line.y + line.font_size, paragraph));
        }
        previous = Some(line);
    }
    out
}

/// Append a wrapped line; a trailing hyphen before a lowercase word is removed
fn join_line(paragraph: &mut Paragraph, mut runs: Vec<Run>) {
    let starts_lowercase = runs
        .first()
        .and_then(|r| r.text.chars().next())
        .is_some_and(char::is_lowercase);

    let dehyphenate = starts_lowercase
        && paragraph
            .runs
            .last()
            .is_some_and(|r| r.text.ends_with('-') && !r.text.ends_with(" -"));

    if dehyphenate {
        if let Some(last) = paragraph.runs.last_mut() {
            last.text.pop();
        }
    } else if let Some(first) = runs.first_mut() {
        first.text.insert(0, ' ');
    }

    for run in runs {
        paragraph.push_run(run);
    }
}

/// Serialize blocks as a .docx package
pub fn write_docx(blocks: &[LayoutBlock]) -> Result<Vec<u8>> {
    let mut document = docx::Docx::new()
        .add_style(heading_definition(1, 32))
        .add_style(heading_definition(2, 28))
        .add_style(heading_definition(3, 24));

    for block in blocks {
        document = match block {
            LayoutBlock::Paragraph(paragraph) => document.add_paragraph(to_docx_paragraph(paragraph)),
            LayoutBlock::Table(table) => document.add_table(to_docx_table(table)),
            LayoutBlock::Image(image) => document.add_paragraph(
                docx::Paragraph::new().add_run(docx::Run::new().add_image(to_docx_picture(image))),
            ),
            LayoutBlock::PageBreak => document.add_paragraph(
                docx::Paragraph::new().add_run(docx::Run::new().add_break(docx::BreakType::Page)),
            ),
        };
    }

    let mut buffer = Cursor::new(Vec::new());
    document
        .build()
        .pack(&mut buffer)
        .map_err(|e| Error::conversion(format!("Failed to write document: {}", e)))?;
    Ok(buffer.into_inner())
}

/// Heading style with a half-point size
fn heading_definition(level: u8, size: usize) -> docx::Style {
    docx::Style::new(format!("Heading{}", level), docx::StyleType::Paragraph)
        .name(format!("Heading {}", level))
        .size(size)
        .bold()
}

fn to_docx_run(run: &Run) -> docx::Run {
    let mut out = docx::Run::new().add_text(run.text.as_str());
    if run.bold {
        out = out.bold();
    }
    if run.italic {
        out = out.italic();
    }
    if run.underline {
        out = out.underline("single");
    }
    out
}

fn to_docx_paragraph(paragraph: &Paragraph) -> docx::Paragraph {
    let mut out = docx::Paragraph::new();
    if let Some(style_id) = paragraph.style.style_id() {
        out = out.style(&style_id);
    }
    for run in &paragraph.runs {
        out = out.add_run(to_docx_run(run));
    }
    out
}

fn to_docx_table(table: &TableBlock) -> docx::Table {
    let rows = table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let cells = row
                .iter()
                .map(|text| {
                    // Every cell needs at least one paragraph
                    let lines: Vec<&str> = if text.is_empty() { vec![""] } else { text.lines().collect() };
                    lines.into_iter().fold(docx::TableCell::new(), |cell, line| {
                        let mut run = docx::Run::new().add_text(line);
                        if index == 0 {
                            run = run.bold();
                        }
                        cell.add_paragraph(docx::Paragraph::new().add_run(run))
                    })
                })
                .collect();
            docx::TableRow::new(cells)
        })
        .collect();
    docx::Table::new(rows)
}

fn to_docx_picture(image: &PageImage) -> docx::Pic {
    docx::Pic::new_with_dimensions(image.data.clone(), image.pixel_width, image.pixel_height).size(
        (image.width * POINTS_TO_EMU) as u32,
        (image.height * POINTS_TO_EMU) as u32,
    )
}

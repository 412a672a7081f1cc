//! CSV and workbook writers for extraction results

use rust_xlsxwriter::{Format, Workbook};
use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::types::ExtractionResult;

/// Spreadsheet cells hold at most this many characters
const MAX_CELL_CHARS: usize = 32_767;

/// Header row (if any) followed by data rows, no index column
pub fn to_csv(result: &ExtractionResult) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    for row in result.all_rows() {
        writer
            .write_record(row)
            .map_err(|e| Error::internal(format!("Failed to write CSV row: {}", e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| Error::internal(format!("Failed to flush CSV: {}", e)))
}

/// Single worksheet with a bold header row
pub fn to_xlsx(result: &ExtractionResult) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    let mut row_index: u32 = 0;
    if let Some(header) = &result.header {
        for (col, cell) in header.iter().enumerate() {
            worksheet
                .write_string_with_format(row_index, column(col)?, cell_text(cell).as_ref(), &header_format)
                .map_err(xlsx_error)?;
        }
        row_index += 1;
    }

    for row in &result.rows {
        for (col, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            worksheet
                .write_string(row_index, column(col)?, cell_text(cell).as_ref())
                .map_err(xlsx_error)?;
        }
        row_index += 1;
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}

fn column(index: usize) -> Result<u16> {
    u16::try_from(index).map_err(|_| Error::internal(format!("Column {} out of range", index)))
}

fn cell_text(text: &str) -> Cow<'_, str> {
    if text.chars().count() > MAX_CELL_CHARS {
        Cow::Owned(text.chars().take(MAX_CELL_CHARS).collect())
    } else {
        Cow::Borrowed(text)
    }
}

fn xlsx_error(e: rust_xlsxwriter::XlsxError) -> Error {
    Error::internal(format!("Failed to write workbook: {}", e))
}

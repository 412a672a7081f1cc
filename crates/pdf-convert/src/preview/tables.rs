//! Reads tabular artifacts back into rows of strings

use calamine::{Data, Reader};
use std::io::Cursor;

/// All CSV records, the first being the header
pub fn read_csv(data: &[u8]) -> Result<Vec<Vec<String>>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|e| format!("invalid CSV: {}", e))
        })
        .collect()
}

/// Rows of the first worksheet; empty cells become empty strings
pub fn read_xlsx(data: &[u8]) -> Result<Vec<Vec<String>>, String> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(data))
        .map_err(|e| format!("invalid workbook: {}", e))?;

    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        return Ok(Vec::new());
    };
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| format!("unreadable worksheet {}: {}", sheet, e))?;

    // Ranges start at the first used cell; keep the sheet's own column positions
    let leading = range.start().map(|(_, col)| col as usize).unwrap_or(0);
    Ok(range
        .rows()
        .map(|row| {
            std::iter::repeat(String::new())
                .take(leading)
                .chain(row.iter().map(cell_text))
                .collect()
        })
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        _ => String::new(),
    }
}

//! Tabular extraction result

use serde::{Deserialize, Serialize};

/// Tabular data produced by exactly one extraction step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Header row, written first when present
    pub header: Option<Vec<String>>,
    /// Data rows in order
    pub rows: Vec<Vec<String>>,
}

impl ExtractionResult {
    /// Concatenate tables row-wise. The first row of the first table becomes the header
    /// and every row is padded to the widest one.
    pub fn from_tables(tables: Vec<Vec<Vec<String>>>) -> Self {
        let mut rows: Vec<Vec<String>> = tables.into_iter().flatten().collect();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, String::new());
        }

        let header = if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        };

        Self { header, rows }
    }

    /// Two-column (page label, page text) result from per-page text
    pub fn from_page_text(pages: Vec<(u32, String)>) -> Self {
        Self {
            header: Some(vec!["Page".to_string(), "Text".to_string()]),
            rows: pages
                .into_iter()
                .map(|(number, text)| vec![format!("Page {}", number), text])
                .collect(),
        }
    }

    /// Single-cell result carrying a fixed message
    pub fn placeholder(message: &str) -> Self {
        Self {
            header: None,
            rows: vec![vec![message.to_string()]],
        }
    }

    /// Header (if any) followed by the data rows
    pub fn all_rows(&self) -> impl Iterator<Item = &Vec<String>> {
        self.header.iter().chain(self.rows.iter())
    }

    /// Number of rows including the header
    pub fn len(&self) -> usize {
        self.rows.len() + usize::from(self.header.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

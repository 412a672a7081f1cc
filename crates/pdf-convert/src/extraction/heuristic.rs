//! Stream-mode table detection from text alignment alone
//!
//! Lines with two or more separated cells that follow each other at normal line spacing
//! form a candidate region. Column boundaries are the left edges that recur across the
//! region's rows.

use std::collections::{HashMap, HashSet};

use super::layout::{group_into_lines, PageLayout, TextLine};
use super::{ExtractionError, PdfSource, StrategyKind, Table, TableStrategy};

/// Stream detection tuning
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub min_rows: usize,
    pub min_columns: usize,
    /// Above this the region is most likely word-split prose
    pub max_columns: usize,
    /// Row grouping tolerance as a fraction of font size
    pub y_tolerance_factor: f32,
    /// Horizontal gaps wider than this fraction of font size separate cells
    pub cell_gap_factor: f32,
    /// Rows further apart than this multiple of font size end a region
    pub max_row_gap_factor: f32,
    /// Share of rows an edge must appear in to become a column
    pub min_alignment_ratio: f32,
    /// Minimum distance between column edges, in points
    pub min_column_gap: f32,
    /// Width of the buckets left edges are snapped into, in points
    pub bucket_size: f32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 12,
            y_tolerance_factor: 0.4,
            cell_gap_factor: 1.0,
            max_row_gap_factor: 2.5,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
            bucket_size: 5.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    x: f32,
}

#[derive(Debug, Clone)]
struct Row {
    y: f32,
    font_size: f32,
    cells: Vec<Cell>,
}

/// Alignment-based table detector for a single page
#[derive(Debug, Clone, Default)]
pub struct StreamDetector {
    config: StreamConfig,
}

impl StreamDetector {
    /// Tables on the page, top to bottom
    pub fn detect(&self, layout: &PageLayout) -> Vec<Table> {
        let rows: Vec<Row> = group_into_lines(&layout.fragments, self.config.y_tolerance_factor)
            .into_iter()
            .map(|line| self.split_cells(line))
            .collect();

        self.regions(&rows)
            .into_iter()
            .filter_map(|region| self.build_table(region))
            .collect()
    }

    /// Merge fragments separated by small gaps into cells
    fn split_cells(&self, line: TextLine) -> Row {
        let mut cells: Vec<Cell> = Vec::new();
        let mut last_right = f32::NEG_INFINITY;
        let mut last_size = line.font_size;

        for fragment in &line.fragments {
            let gap = fragment.x - last_right;
            let threshold = fragment.font_size.max(last_size) * self.config.cell_gap_factor;
            match cells.last_mut() {
                Some(cell) if gap < threshold => {
                    if gap > fragment.font_size * 0.1 && !cell.text.ends_with(' ') {
                        cell.text.push(' ');
                    }
                    cell.text.push_str(&fragment.text);
                }
                _ => cells.push(Cell {
                    text: fragment.text.clone(),
                    x: fragment.x,
                }),
            }
            last_right = last_right.max(fragment.right());
            last_size = fragment.font_size;
        }

        Row {
            y: line.y,
            font_size: line.font_size,
            cells,
        }
    }

    /// Maximal runs of consecutive multi-cell rows at normal line spacing
    fn regions<'a>(&self, rows: &'a [Row]) -> Vec<&'a [Row]> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for i in 0..=rows.len() {
            let continues = rows.get(i).is_some_and(|row| {
                row.cells.len() >= self.config.min_columns
                    && match start {
                        Some(_) => {
                            let prev = &rows[i - 1];
                            prev.y - row.y <= prev.font_size.max(row.font_size) * self.config.max_row_gap_factor
                        }
                        None => true,
                    }
            });

            match (start, continues) {
                (None, true) => start = Some(i),
                (Some(s), false) => {
                    if i - s >= self.config.min_rows {
                        regions.push(&rows[s..i]);
                    }
                    // The breaking row may itself open a new region
                    start = rows
                        .get(i)
                        .filter(|row| row.cells.len() >= self.config.min_columns)
                        .map(|_| i);
                }
                _ => {}
            }
        }
        regions
    }

    fn column_edges(&self, rows: &[Row]) -> Vec<f32> {
        let bucket = self.config.bucket_size;
        let mut counts: HashMap<i32, usize> = HashMap::new();
        for row in rows {
            let buckets: HashSet<i32> = row.cells.iter().map(|c| (c.x / bucket).round() as i32).collect();
            for b in buckets {
                *counts.entry(b).or_insert(0) += 1;
            }
        }

        let min_occurrences = ((rows.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);
        let mut edges: Vec<f32> = counts
            .into_iter()
            .filter(|(_, count)| *count >= min_occurrences)
            .map(|(b, _)| b as f32 * bucket)
            .collect();
        edges.sort_by(f32::total_cmp);

        let mut merged: Vec<f32> = Vec::new();
        for edge in edges {
            match merged.last() {
                Some(last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    fn build_table(&self, region: &[Row]) -> Option<Table> {
        let edges = self.column_edges(region);
        if edges.len() < self.config.min_columns || edges.len() > self.config.max_columns {
            tracing::debug!("Rejecting stream region with {} columns", edges.len());
            return None;
        }

        let snap = self.config.bucket_size;
        let rows: Table = region
            .iter()
            .map(|row| {
                let mut cells = vec![String::new(); edges.len()];
                for cell in &row.cells {
                    let col = edges.iter().rposition(|e| *e <= cell.x + snap).unwrap_or(0);
                    if !cells[col].is_empty() {
                        cells[col].push(' ');
                    }
                    cells[col].push_str(&cell.text);
                }
                cells
            })
            .collect();

        // Every row landed in one column: the alignment was coincidental
        let populated: HashSet<usize> = rows
            .iter()
            .flat_map(|r| r.iter().enumerate().filter(|(_, c)| !c.is_empty()).map(|(i, _)| i))
            .collect();
        (populated.len() >= self.config.min_columns).then_some(rows)
    }
}

/// Alignment-based strategy over all pages
#[derive(Debug, Clone, Default)]
pub struct HeuristicStrategy {
    detector: StreamDetector,
}

impl TableStrategy for HeuristicStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Heuristic
    }

    fn extract_tables(&self, source: &PdfSource) -> Result<Vec<Table>, ExtractionError> {
        let mut tables: Vec<Table> = Vec::new();
        for layout in source.layouts() {
            source.checkpoint()?;
            tables.extend(self.detector.detect(layout));
        }
        source.checkpoint()?;

        tracing::debug!("Stream detection found {} tables", tables.len());
        Ok(tables)
    }
}

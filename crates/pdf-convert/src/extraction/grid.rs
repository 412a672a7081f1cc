//! Ruled-table detection: cells are the rectangles formed by intersecting ruling lines

use super::layout::{Orientation, PageLayout, Ruling, TextFragment};
use super::{ExtractionError, PdfSource, StrategyKind, Table, TableStrategy};

/// Grid detection tuning
#[derive(Debug, Clone)]
pub struct GridConfig {
    /// Distance within which rulings intersect and coordinates merge
    pub snap_tolerance: f32,
    /// A table needs at least this many cells; a lone frame is not a table
    pub min_cells: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: 2.0,
            min_cells: 2,
        }
    }
}

/// A table found on a page, rows top to bottom
#[derive(Debug, Clone, PartialEq)]
pub struct GridTable {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
    pub rows: Vec<Vec<String>>,
}

impl GridTable {
    /// Whether a fragment's anchor lies inside the table frame
    pub fn contains(&self, fragment: &TextFragment) -> bool {
        let (x, y) = anchor(fragment);
        x >= self.left && x <= self.right && y <= self.top && y >= self.bottom
    }
}

/// Finds ruled tables in a page layout
#[derive(Debug, Clone, Default)]
pub struct GridDetector {
    config: GridConfig,
}

impl GridDetector {
    /// Tables on the page, top to bottom
    pub fn detect(&self, layout: &PageLayout) -> Vec<GridTable> {
        let mut tables: Vec<GridTable> = connected_groups(&layout.rulings, self.config.snap_tolerance)
            .into_iter()
            .filter_map(|group| self.build_table(&group, &layout.fragments))
            .collect();

        tables.sort_by(|a, b| b.top.total_cmp(&a.top));
        tables
    }

    fn build_table(&self, rulings: &[Ruling], fragments: &[TextFragment]) -> Option<GridTable> {
        let tol = self.config.snap_tolerance;

        let mut ys = cluster(
            rulings
                .iter()
                .filter(|r| r.orientation == Orientation::Horizontal)
                .map(Ruling::position),
            tol,
        );
        let xs = cluster(
            rulings
                .iter()
                .filter(|r| r.orientation == Orientation::Vertical)
                .map(Ruling::position),
            tol,
        );
        if ys.len() < 2 || xs.len() < 2 {
            return None;
        }
        ys.reverse();

        let (row_count, col_count) = (ys.len() - 1, xs.len() - 1);
        if row_count * col_count < self.config.min_cells {
            return None;
        }

        let mut table = GridTable {
            top: ys[0],
            bottom: ys[row_count],
            left: xs[0],
            right: xs[col_count],
            rows: Vec::new(),
        };

        // Fragments per cell, kept in reading order
        let mut cells: Vec<Vec<Vec<&TextFragment>>> = vec![vec![Vec::new(); col_count]; row_count];
        for fragment in fragments {
            if let Some((row, col)) = locate(fragment, &xs, &ys, tol) {
                cells[row][col].push(fragment);
            }
        }

        table.rows = cells
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|c| !c.is_empty()))
            .collect();

        if table.rows.is_empty() {
            None
        } else {
            Some(table)
        }
    }
}

/// Point used to place a fragment: its horizontal center, a little above the baseline
fn anchor(fragment: &TextFragment) -> (f32, f32) {
    (fragment.center_x(), fragment.y + fragment.font_size * 0.3)
}

fn locate(fragment: &TextFragment, xs: &[f32], ys: &[f32], tol: f32) -> Option<(usize, usize)> {
    let (cx, cy) = anchor(fragment);
    let row = ys.windows(2).position(|w| cy <= w[0] + tol && cy > w[1])?;

    // Width estimates can be off for fonts without metrics; fall back to the start point
    let column_of = |x: f32| xs.windows(2).position(|w| x >= w[0] && x < w[1]);
    let col = column_of(cx).or_else(|| column_of(fragment.x + 1.0))?;
    Some((row, col))
}

fn cell_text(mut fragments: Vec<&TextFragment>) -> String {
    fragments.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut text = String::new();
    let mut last: Option<&TextFragment> = None;
    for fragment in fragments {
        if let Some(prev) = last {
            let same_line = (prev.y - fragment.y).abs() < prev.font_size * 0.5;
            text.push(if same_line { ' ' } else { '\n' });
        }
        text.push_str(&fragment.text);
        last = Some(fragment);
    }
    text.trim().to_string()
}

/// Merge sorted values closer than `tol` into their mean
fn cluster(values: impl Iterator<Item = f32>, tol: f32) -> Vec<f32> {
    let mut sorted: Vec<f32> = values.collect();
    sorted.sort_by(f32::total_cmp);

    let mut groups: Vec<Vec<f32>> = Vec::new();
    for value in sorted {
        match groups.last_mut() {
            Some(group) if value - group[group.len() - 1] <= tol => group.push(value),
            _ => groups.push(vec![value]),
        }
    }
    groups
        .iter()
        .map(|g| g.iter().sum::<f32>() / g.len() as f32)
        .collect()
}

fn intersects(h: &Ruling, v: &Ruling, tol: f32) -> bool {
    let x = v.position();
    let y = h.position();
    x >= h.x1 - tol && x <= h.x2 + tol && y >= v.y1 - tol && y <= v.y2 + tol
}

/// Partition rulings into groups connected through horizontal/vertical intersections
fn connected_groups(rulings: &[Ruling], tol: f32) -> Vec<Vec<Ruling>> {
    let mut parent: Vec<usize> = (0..rulings.len()).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for (i, a) in rulings.iter().enumerate() {
        for (j, b) in rulings.iter().enumerate().skip(i + 1) {
            let touching = match (a.orientation, b.orientation) {
                (Orientation::Horizontal, Orientation::Vertical) => intersects(a, b, tol),
                (Orientation::Vertical, Orientation::Horizontal) => intersects(b, a, tol),
                _ => false,
            };
            if touching {
                let (ra, rb) = (find(&mut parent, i), find(&mut parent, j));
                if ra != rb {
                    parent[ra] = rb;
                }
            }
        }
    }

    let mut groups: Vec<(usize, Vec<Ruling>)> = Vec::new();
    for (i, ruling) in rulings.iter().enumerate() {
        let root = find(&mut parent, i);
        match groups.iter_mut().find(|(r, _)| *r == root) {
            Some((_, group)) => group.push(*ruling),
            None => groups.push((root, vec![*ruling])),
        }
    }
    groups.into_iter().map(|(_, group)| group).collect()
}

/// Ruled-table strategy over all pages
#[derive(Debug, Clone, Default)]
pub struct GridStrategy {
    detector: GridDetector,
}

impl TableStrategy for GridStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Grid
    }

    fn extract_tables(&self, source: &PdfSource) -> Result<Vec<Table>, ExtractionError> {
        let mut tables: Vec<Table> = Vec::new();
        for layout in source.layouts() {
            source.checkpoint()?;
            tables.extend(self.detector.detect(layout).into_iter().map(|table| table.rows));
        }
        source.checkpoint()?;

        tracing::debug!("Grid detection found {} tables", tables.len());
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{aligned_rows, line, ruled_table, text, PdfFixture};

    fn layout_of(ops: Vec<lopdf::content::Operation>) -> PageLayout {
        let data = PdfFixture::new().page(ops).build();
        PdfSource::load(&data).unwrap().layouts()[0].clone()
    }

    #[test]
    fn test_detects_ruled_table() {
        let ops = ruled_table(
            72,
            700,
            120,
            20,
            &[&["Item", "Qty", "Price"], &["Bolt", "4", "0.25"], &["Nut", "", "0.10"]],
        );
        let tables = GridDetector::default().detect(&layout_of(ops));

        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0].rows,
            vec![
                vec!["Item", "Qty", "Price"],
                vec!["Bolt", "4", "0.25"],
                vec!["Nut", "", "0.10"],
            ]
        );
        assert_eq!((tables[0].left, tables[0].top), (72.0, 700.0));
    }

    #[test]
    fn test_two_tables_top_to_bottom() {
        let mut ops = ruled_table(72, 400, 100, 20, &[&["Second", "B"], &["x", "y"]]);
        ops.extend(ruled_table(72, 700, 100, 20, &[&["First", "A"], &["1", "2"]]));
        let tables = GridDetector::default().detect(&layout_of(ops));

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].rows[0][0], "First");
        assert_eq!(tables[1].rows[0][0], "Second");
    }

    #[test]
    fn test_page_frame_is_not_a_table() {
        let mut ops = line(36, 36, 576, 36);
        ops.extend(line(36, 756, 576, 756));
        ops.extend(line(36, 36, 36, 756));
        ops.extend(line(576, 36, 576, 756));
        ops.extend(text(72, 700, 12, "Just prose inside a border"));

        assert!(GridDetector::default().detect(&layout_of(ops)).is_empty());
    }

    #[test]
    fn test_unruled_text_is_ignored() {
        let ops = aligned_rows(72, 700, 120, 20, &[&["a", "b"], &["c", "d"]]);
        assert!(GridDetector::default().detect(&layout_of(ops)).is_empty());
    }

    #[test]
    fn test_empty_rows_are_dropped() {
        let ops = ruled_table(72, 700, 100, 20, &[&["H1", "H2"], &["", ""], &["v1", "v2"]]);
        let tables = GridDetector::default().detect(&layout_of(ops));
        assert_eq!(tables[0].rows, vec![vec!["H1", "H2"], vec!["v1", "v2"]]);
    }

    #[test]
    fn test_cluster_merges_close_values() {
        let merged = cluster([10.0, 10.5, 50.0, 11.0].into_iter(), 2.0);
        assert_eq!(merged, vec![10.5, 50.0]);
    }
}

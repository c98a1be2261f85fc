use tracing::debug;

use crate::core::{CellSpan, Consistent};
use crate::render::PathBackend;

use super::content::CellContent;
use super::settings::CellSettings;
use super::{PAINT_STAGES, Table, TableSignal, TableState};

/// One slot of the grid.
#[derive(Debug)]
pub struct Cell {
    row: usize,
    col: usize,
    pub(super) span: CellSpan,
    pub(super) settings: CellSettings,
    pub(super) content: Option<Box<dyn CellContent>>,
    pub(super) overlapped_by: Option<usize>,
}

impl Cell {
    pub(super) fn new(row: usize, col: usize) -> Self {
        Self {
            row,
            col,
            span: CellSpan::SINGLE,
            settings: CellSettings::default(),
            content: None,
            overlapped_by: None,
        }
    }

    /// Re-initializes a pooled cell for a new position.
    fn reset(&mut self, row: usize, col: usize) {
        *self = Self::new(row, col);
    }

    #[must_use]
    pub fn row(&self) -> usize {
        self.row
    }

    #[must_use]
    pub fn col(&self) -> usize {
        self.col
    }

    #[must_use]
    pub fn span(&self) -> CellSpan {
        self.span
    }

    #[must_use]
    pub fn row_span(&self) -> usize {
        self.span.row_span
    }

    #[must_use]
    pub fn col_span(&self) -> usize {
        self.span.col_span
    }

    #[must_use]
    pub fn settings(&self) -> &CellSettings {
        &self.settings
    }

    #[must_use]
    pub fn content(&self) -> Option<&dyn CellContent> {
        self.content.as_deref()
    }

    /// Row-major index of the merged cell covering this one.
    #[must_use]
    pub fn overlapped_by(&self) -> Option<usize> {
        self.overlapped_by
    }

    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.overlapped_by.is_none()
    }
}

impl<B: PathBackend> Table<B> {
    /// Cell at `(row, col)`, or `None` outside the current grid.
    pub fn cell(&mut self, row: usize, col: usize) -> Option<&Cell> {
        self.check_structure();
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col)
    }

    pub(super) fn cell_index(&mut self, row: usize, col: usize) -> Option<usize> {
        self.check_structure();
        (row < self.rows && col < self.cols).then_some(row * self.cols + col)
    }

    fn alloc_cell(&mut self, row: usize, col: usize) -> Cell {
        match self.cell_pool.pop() {
            Some(mut cell) => {
                cell.reset(row, col);
                cell
            }
            None => Cell::new(row, col),
        }
    }

    fn free_cell(&mut self, mut cell: Cell) {
        if let Some(content) = cell.content.take() {
            self.content_to_clear.push(content);
        }
        self.cell_pool.push(cell);
    }

    /// Rebuilds the cell array for the current counts, keeping cells whose
    /// position still exists and pooling the rest.
    pub(super) fn check_structure(&mut self) -> bool {
        if !self.has_invalidation_state(TableState::STRUCTURE) {
            return false;
        }

        let old_cols = self.built_cols;
        let old_rows = if old_cols == 0 {
            0
        } else {
            self.cells.len() / old_cols
        };
        let kept_rows = old_rows.min(self.rows);
        let kept_cols = old_cols.min(self.cols);

        let mut old_cells: Vec<Option<Cell>> =
            std::mem::take(&mut self.cells).into_iter().map(Some).collect();
        let mut cells = Vec::with_capacity(self.rows * self.cols);
        let mut freed = 0_usize;
        let mut allocated = 0_usize;

        for row in 0..self.rows {
            for col in 0..self.cols {
                let kept = (row < kept_rows && col < kept_cols)
                    .then(|| old_cells.get_mut(row * old_cols + col).and_then(Option::take))
                    .flatten();
                let cell = match kept {
                    Some(cell) => cell,
                    None => {
                        allocated += 1;
                        self.alloc_cell(row, col)
                    }
                };
                cells.push(cell);
            }
        }
        for cell in old_cells.into_iter().flatten() {
            freed += 1;
            self.free_cell(cell);
        }

        self.cells = cells;
        self.built_cols = self.cols;
        self.mark_consistent(TableState::STRUCTURE);
        self.invalidate(
            TableState::CELL_BOUNDS | TableState::OVERLAP | PAINT_STAGES,
            TableSignal::empty(),
        );
        debug!(
            rows = self.rows,
            cols = self.cols,
            allocated,
            freed,
            pooled = self.cell_pool.len(),
            "table structure rebuilt"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::core::Rect;
    use crate::render::RecordingBackend;
    use crate::table::{Table, TableConfig, TextContent};

    fn table(rows: usize, cols: usize) -> Table<RecordingBackend> {
        Table::new(
            RecordingBackend::new(),
            TableConfig::default()
                .with_rows(rows)
                .with_cols(cols)
                .with_bounds(Rect::new(0.0, 0.0, 90.0, 90.0)),
        )
    }

    #[test]
    fn out_of_range_cell_lookup_returns_none() {
        let mut table = table(2, 3);
        assert!(table.cell(1, 2).is_some());
        assert!(table.cell(2, 0).is_none());
        assert!(table.cell(0, 3).is_none());
    }

    #[test]
    fn shrinking_keeps_surviving_cells_and_pools_the_rest() {
        let mut table = table(3, 3);
        table
            .cell_mut(0, 0)
            .expect("cell")
            .set_content(Some(Box::new(TextContent::new("kept"))));
        table
            .cell_mut(2, 2)
            .expect("cell")
            .set_content(Some(Box::new(TextContent::new("dropped"))));

        table.set_rows_count(2);
        table.set_cols_count(2);
        let kept = table.cell(0, 0).expect("cell");
        assert_eq!(kept.content().and_then(|content| content.text()), Some("kept"));
        assert_eq!(table.cell_pool.len(), 5);
        assert_eq!(table.content_to_clear.len(), 1);
    }

    #[test]
    fn growing_reuses_pooled_cells_in_fresh_state() {
        let mut table = table(2, 2);
        table
            .cell_mut(1, 1)
            .expect("cell")
            .set_row_span(2);
        table.set_rows_count(1);
        assert!(table.cell(0, 0).is_some());
        table.set_rows_count(2);
        let cell = table.cell(1, 1).expect("cell");
        assert_eq!(cell.row_span(), 1);
        assert_eq!((cell.row(), cell.col()), (1, 1));
        assert!(table.cell_pool.is_empty());
    }
}

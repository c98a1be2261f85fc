use tracing::{debug, warn};

use crate::core::{CellSpan, Consistent, Rect, SizeBound, SizeValue, SlotSizing};
use crate::error::{GridError, GridResult};
use crate::render::PathBackend;

use super::{PAINT_STAGES, Table, TableSignal, TableState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Rows,
    Cols,
}

fn validate_size(value: Option<SizeValue>) -> GridResult<()> {
    match value {
        Some(size) if size.normalize(1.0).is_none() => {
            let err = GridError::InvalidSize(size.to_string());
            warn!(error = %err, "rejected size setting");
            Err(err)
        }
        _ => Ok(()),
    }
}

/// Start offset and inclusive end of `span` slots starting at `index`.
fn slot_range(boundaries: &[f64], index: usize, span: usize) -> (f64, f64) {
    let start = index
        .checked_sub(1)
        .and_then(|previous| boundaries.get(previous))
        .map_or(0.0, |edge| edge + 1.0);
    let last = (index + span).min(boundaries.len()).saturating_sub(1);
    let end = boundaries.get(last).copied().unwrap_or(start);
    (start, end)
}

/// Absolute bounds of a block of cells given solved boundaries.
pub(super) fn cell_rect(
    bounds: Rect,
    col_rights: &[f64],
    row_bottoms: &[f64],
    row: usize,
    col: usize,
    span: CellSpan,
) -> Rect {
    let (left, right) = slot_range(col_rights, col, span.col_span);
    let (top, bottom) = slot_range(row_bottoms, row, span.row_span);
    Rect::new(bounds.left + left, bounds.top + top, right - left, bottom - top)
}

impl<B: PathBackend> Table<B> {
    #[must_use]
    pub fn row_sizing(&self) -> &SlotSizing {
        &self.row_sizing
    }

    #[must_use]
    pub fn col_sizing(&self) -> &SlotSizing {
        &self.col_sizing
    }

    fn sizing_mut(&mut self, axis: Axis) -> &mut SlotSizing {
        match axis {
            Axis::Rows => &mut self.row_sizing,
            Axis::Cols => &mut self.col_sizing,
        }
    }

    fn set_slot_size(
        &mut self,
        axis: Axis,
        index: usize,
        bound: SizeBound,
        value: Option<SizeValue>,
    ) -> GridResult<()> {
        validate_size(value)?;
        if self.sizing_mut(axis).set_slot(index, bound, value) {
            self.invalidate(TableState::CELL_BOUNDS, TableSignal::NEEDS_REDRAW);
        }
        Ok(())
    }

    fn set_default_size(
        &mut self,
        axis: Axis,
        bound: SizeBound,
        value: Option<SizeValue>,
    ) -> GridResult<()> {
        validate_size(value)?;
        if self.sizing_mut(axis).set_default(bound, value) {
            self.invalidate(TableState::CELL_BOUNDS, TableSignal::NEEDS_REDRAW);
        }
        Ok(())
    }

    /// Fixed height of one row; `None` makes it auto again.
    pub fn set_row_height(&mut self, row: usize, value: Option<SizeValue>) -> GridResult<()> {
        self.set_slot_size(Axis::Rows, row, SizeBound::Size, value)
    }

    pub fn set_row_min_height(&mut self, row: usize, value: Option<SizeValue>) -> GridResult<()> {
        self.set_slot_size(Axis::Rows, row, SizeBound::Min, value)
    }

    pub fn set_row_max_height(&mut self, row: usize, value: Option<SizeValue>) -> GridResult<()> {
        self.set_slot_size(Axis::Rows, row, SizeBound::Max, value)
    }

    /// Fixed width of one column; `None` makes it auto again.
    pub fn set_col_width(&mut self, col: usize, value: Option<SizeValue>) -> GridResult<()> {
        self.set_slot_size(Axis::Cols, col, SizeBound::Size, value)
    }

    pub fn set_col_min_width(&mut self, col: usize, value: Option<SizeValue>) -> GridResult<()> {
        self.set_slot_size(Axis::Cols, col, SizeBound::Min, value)
    }

    pub fn set_col_max_width(&mut self, col: usize, value: Option<SizeValue>) -> GridResult<()> {
        self.set_slot_size(Axis::Cols, col, SizeBound::Max, value)
    }

    /// Default height of rows without their own setting.
    pub fn set_rows_height(&mut self, value: Option<SizeValue>) -> GridResult<()> {
        self.set_default_size(Axis::Rows, SizeBound::Size, value)
    }

    pub fn set_rows_min_height(&mut self, value: Option<SizeValue>) -> GridResult<()> {
        self.set_default_size(Axis::Rows, SizeBound::Min, value)
    }

    pub fn set_rows_max_height(&mut self, value: Option<SizeValue>) -> GridResult<()> {
        self.set_default_size(Axis::Rows, SizeBound::Max, value)
    }

    /// Default width of columns without their own setting.
    pub fn set_cols_width(&mut self, value: Option<SizeValue>) -> GridResult<()> {
        self.set_default_size(Axis::Cols, SizeBound::Size, value)
    }

    pub fn set_cols_min_width(&mut self, value: Option<SizeValue>) -> GridResult<()> {
        self.set_default_size(Axis::Cols, SizeBound::Min, value)
    }

    pub fn set_cols_max_width(&mut self, value: Option<SizeValue>) -> GridResult<()> {
        self.set_default_size(Axis::Cols, SizeBound::Max, value)
    }

    /// Solves row and column boundaries. Downstream stages are only
    /// re-dirtied when a boundary actually moved.
    pub(super) fn check_sizes(&mut self) -> bool {
        if !self.has_invalidation_state(TableState::CELL_BOUNDS) {
            return false;
        }

        let cols = self.col_sizing.solve(self.cols, self.bounds.width);
        let rows = self.row_sizing.solve(self.rows, self.bounds.height);
        if !cols.converged || !rows.converged {
            debug!(
                cols_converged = cols.converged,
                rows_converged = rows.converged,
                "size negotiation hit its iteration budget"
            );
        }

        let cols_changed = cols.boundaries != self.col_rights;
        let rows_changed = rows.boundaries != self.row_bottoms;
        self.mark_consistent(TableState::CELL_BOUNDS);
        if cols_changed || rows_changed {
            self.col_rights = cols.boundaries;
            self.row_bottoms = rows.boundaries;
            self.invalidate(PAINT_STAGES, TableSignal::empty());
            debug!(
                col_rights = ?self.col_rights,
                row_bottoms = ?self.row_bottoms,
                "table cell bounds resolved"
            );
        }
        true
    }

    /// Bounds of a `row_span x col_span` block starting at `(row, col)`,
    /// solving structure and sizes first if they are stale.
    pub fn get_cell_bounds(&mut self, row: usize, col: usize, row_span: usize, col_span: usize) -> Rect {
        self.check_structure();
        self.check_sizes();
        self.cell_bounds(row, col, CellSpan::new(row_span, col_span))
    }

    pub(super) fn cell_bounds(&self, row: usize, col: usize, span: CellSpan) -> Rect {
        cell_rect(self.bounds, &self.col_rights, &self.row_bottoms, row, col, span)
    }
}

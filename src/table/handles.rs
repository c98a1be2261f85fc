use tracing::{trace, warn};

use crate::core::{CellSpan, Consistent};
use crate::error::{GridError, GridResult};
use crate::render::{Fill, PathBackend, Stroke};

use super::content::{CellContent, TextContent};
use super::settings::{Edge, PaddingSettings, SlotSettings};
use super::structure::Cell;
use super::{Table, TableSignal, TableState};

/// Matrix of optional cell contents, one inner vector per row.
pub type ContentMatrix = Vec<Vec<Option<Box<dyn CellContent>>>>;

fn checked<T>(result: GridResult<T>) -> GridResult<T> {
    if let Err(err) = &result {
        warn!(error = %err, "rejected table setting");
    }
    result
}

fn validate_fill(fill: Option<&Fill>) -> GridResult<()> {
    checked(fill.map_or(Ok(()), Fill::validate))
}

fn validate_stroke(stroke: Option<&Stroke>) -> GridResult<()> {
    checked(stroke.map_or(Ok(()), Stroke::validate))
}

fn validate_padding(padding: &PaddingSettings) -> GridResult<()> {
    checked(if padding.validate() {
        Ok(())
    } else {
        Err(GridError::InvalidData(format!(
            "padding must be finite: {padding:?}"
        )))
    })
}

/// Mutable handle to one cell of a [`Table`].
///
/// Every setter marks only the stages it affects; nothing is recomputed
/// until the next [`Table::draw`].
pub struct CellMut<'a, B: PathBackend> {
    table: &'a mut Table<B>,
    index: usize,
}

impl<B: PathBackend> CellMut<'_, B> {
    fn cell(&self) -> &Cell {
        &self.table.cells[self.index]
    }

    fn cell_mut(&mut self) -> &mut Cell {
        &mut self.table.cells[self.index]
    }

    #[must_use]
    pub fn row(&self) -> usize {
        self.cell().row()
    }

    #[must_use]
    pub fn col(&self) -> usize {
        self.cell().col()
    }

    fn set_span(&mut self, span: CellSpan) -> &mut Self {
        if self.cell().span != span {
            self.cell_mut().span = span;
            self.table
                .invalidate(TableState::OVERLAP, TableSignal::NEEDS_REDRAW);
        }
        self
    }

    /// Number of rows this cell covers; values below 1 are treated as 1.
    pub fn set_row_span(&mut self, row_span: usize) -> &mut Self {
        let col_span = self.cell().span.col_span;
        self.set_span(CellSpan::new(row_span, col_span))
    }

    pub fn set_col_span(&mut self, col_span: usize) -> &mut Self {
        let row_span = self.cell().span.row_span;
        self.set_span(CellSpan::new(row_span, col_span))
    }

    pub fn set_fill(&mut self, fill: Option<Fill>) -> GridResult<&mut Self> {
        validate_fill(fill.as_ref())?;
        if self.cell().settings.fill != fill {
            self.cell_mut().settings.fill = fill;
            self.table
                .invalidate(TableState::FILLS, TableSignal::NEEDS_REDRAW);
        }
        Ok(self)
    }

    pub fn set_border(&mut self, edge: Edge, stroke: Option<Stroke>) -> GridResult<&mut Self> {
        validate_stroke(stroke.as_ref())?;
        if self.cell_mut().settings.border.set(edge, stroke) {
            self.table
                .invalidate(TableState::BORDERS, TableSignal::NEEDS_REDRAW);
        }
        Ok(self)
    }

    pub fn set_padding(&mut self, padding: PaddingSettings) -> GridResult<&mut Self> {
        validate_padding(&padding)?;
        if self.cell().settings.padding != padding {
            self.cell_mut().settings.padding = padding;
            self.table
                .invalidate(TableState::CONTENT, TableSignal::NEEDS_REDRAW);
        }
        Ok(self)
    }

    /// Replaces the cell content. The previous content is released on the
    /// next draw.
    pub fn set_content(&mut self, content: Option<Box<dyn CellContent>>) -> &mut Self {
        let previous = std::mem::replace(&mut self.cell_mut().content, content);
        let changed = previous.is_some() || self.cell().content.is_some();
        if let Some(previous) = previous {
            self.table.content_to_clear.push(previous);
        }
        if changed {
            trace!(row = self.row(), col = self.col(), "cell content replaced");
            self.table
                .invalidate(TableState::CONTENT, TableSignal::NEEDS_REDRAW);
        }
        self
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.set_content(Some(Box::new(TextContent::new(text))))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotAxis {
    Row,
    Col,
}

/// Mutable handle to the settings of one row or column.
pub struct SlotMut<'a, B: PathBackend> {
    table: &'a mut Table<B>,
    axis: SlotAxis,
    index: usize,
}

impl<B: PathBackend> SlotMut<'_, B> {
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Applies `apply` to the slot's settings, dropping them again when
    /// they end up empty. Invalidates `state` when `apply` reports a change.
    fn update(&mut self, state: TableState, apply: impl FnOnce(&mut SlotSettings) -> bool) {
        let map = match self.axis {
            SlotAxis::Row => &mut self.table.row_settings,
            SlotAxis::Col => &mut self.table.col_settings,
        };
        let settings = map.entry(self.index).or_default();
        let changed = apply(settings);
        if settings.is_empty() {
            map.remove(&self.index);
        }
        if changed {
            self.table.invalidate(state, TableSignal::NEEDS_REDRAW);
        }
    }

    pub fn set_cell_fill(&mut self, fill: Option<Fill>) -> GridResult<&mut Self> {
        validate_fill(fill.as_ref())?;
        self.update(TableState::FILLS, |settings| {
            let changed = settings.cell_fill != fill;
            settings.cell_fill = fill;
            changed
        });
        Ok(self)
    }

    /// Outer border of the whole row or column.
    pub fn set_border(&mut self, edge: Edge, stroke: Option<Stroke>) -> GridResult<&mut Self> {
        validate_stroke(stroke.as_ref())?;
        self.update(TableState::BORDERS, |settings| settings.border.set(edge, stroke));
        Ok(self)
    }

    /// Border of every cell in the row or column.
    pub fn set_cell_border(&mut self, edge: Edge, stroke: Option<Stroke>) -> GridResult<&mut Self> {
        validate_stroke(stroke.as_ref())?;
        self.update(TableState::BORDERS, |settings| {
            settings.cell_border.set(edge, stroke)
        });
        Ok(self)
    }

    pub fn set_padding(&mut self, padding: PaddingSettings) -> GridResult<&mut Self> {
        validate_padding(&padding)?;
        self.update(TableState::CONTENT, |settings| {
            let changed = settings.padding != padding;
            settings.padding = padding;
            changed
        });
        Ok(self)
    }
}

impl<B: PathBackend> Table<B> {
    /// Handle to the cell at `(row, col)`, or `None` outside the grid.
    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<CellMut<'_, B>> {
        let index = self.cell_index(row, col)?;
        Some(CellMut { table: self, index })
    }

    pub fn row_mut(&mut self, row: usize) -> Option<SlotMut<'_, B>> {
        if row >= self.rows {
            return None;
        }
        Some(SlotMut {
            table: self,
            axis: SlotAxis::Row,
            index: row,
        })
    }

    pub fn col_mut(&mut self, col: usize) -> Option<SlotMut<'_, B>> {
        if col >= self.cols {
            return None;
        }
        Some(SlotMut {
            table: self,
            axis: SlotAxis::Col,
            index: col,
        })
    }

    /// Fallback fill of every cell.
    pub fn set_fill(&mut self, fill: Fill) -> GridResult<()> {
        validate_fill(Some(&fill))?;
        if self.settings.fill != fill {
            self.settings.fill = fill;
            self.invalidate(TableState::FILLS, TableSignal::NEEDS_REDRAW);
        }
        Ok(())
    }

    /// Fill of rows 1, 3, 5, ...
    pub fn set_row_odd_fill(&mut self, fill: Option<Fill>) -> GridResult<()> {
        validate_fill(fill.as_ref())?;
        if self.settings.row_odd_fill != fill {
            self.settings.row_odd_fill = fill;
            self.invalidate(TableState::FILLS, TableSignal::NEEDS_REDRAW);
        }
        Ok(())
    }

    /// Fill of rows 0, 2, 4, ...
    pub fn set_row_even_fill(&mut self, fill: Option<Fill>) -> GridResult<()> {
        validate_fill(fill.as_ref())?;
        if self.settings.row_even_fill != fill {
            self.settings.row_even_fill = fill;
            self.invalidate(TableState::FILLS, TableSignal::NEEDS_REDRAW);
        }
        Ok(())
    }

    /// Outer border of the table.
    pub fn set_border(&mut self, edge: Edge, stroke: Option<Stroke>) -> GridResult<()> {
        validate_stroke(stroke.as_ref())?;
        if self.settings.border.set(edge, stroke) {
            self.invalidate(TableState::BORDERS, TableSignal::NEEDS_REDRAW);
        }
        Ok(())
    }

    pub fn set_cell_border(&mut self, edge: Edge, stroke: Option<Stroke>) -> GridResult<()> {
        validate_stroke(stroke.as_ref())?;
        if self.settings.cell_border.set(edge, stroke) {
            self.invalidate(TableState::BORDERS, TableSignal::NEEDS_REDRAW);
        }
        Ok(())
    }

    pub fn set_cell_padding(&mut self, padding: PaddingSettings) -> GridResult<()> {
        validate_padding(&padding)?;
        if self.settings.cell_padding != padding {
            self.settings.cell_padding = padding;
            self.invalidate(TableState::CONTENT, TableSignal::NEEDS_REDRAW);
        }
        Ok(())
    }

    /// Resizes the table to `matrix` and installs its contents.
    ///
    /// Row count is the number of rows in `matrix`, column count the longest
    /// row; missing entries clear their cell. With `demerge` every span is
    /// reset first. Signals raised on the way are delivered once at the end.
    pub fn contents(&mut self, matrix: ContentMatrix, demerge: bool) -> GridResult<()> {
        let rows = matrix.len();
        let cols = matrix.iter().map(Vec::len).max().unwrap_or(0);
        if rows == 0 || cols == 0 {
            let err = GridError::InvalidContents { rows, cols };
            warn!(error = %err, "rejected table contents");
            return Err(err);
        }

        let mut table = self.batch();
        table.set_rows_count(rows);
        table.set_cols_count(cols);
        for (row, values) in matrix.into_iter().enumerate() {
            let mut values = values.into_iter();
            for col in 0..cols {
                let Some(mut cell) = table.cell_mut(row, col) else {
                    continue;
                };
                if demerge {
                    cell.set_row_span(1).set_col_span(1);
                }
                cell.set_content(values.next().flatten());
            }
        }
        Ok(())
    }

    /// Text of every cell's content, row by row.
    pub fn content_texts(&mut self) -> Vec<Vec<Option<String>>> {
        self.check_structure();
        self.cells
            .chunks(self.cols.max(1))
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        cell.content()
                            .and_then(|content| content.text())
                            .map(str::to_owned)
                    })
                    .collect()
            })
            .collect()
    }

    /// Which cells currently hold content, row by row.
    pub fn contents_snapshot(&mut self) -> Vec<Vec<bool>> {
        self.check_structure();
        self.cells
            .chunks(self.cols.max(1))
            .map(|row| row.iter().map(|cell| cell.content().is_some()).collect())
            .collect()
    }
}

//! Most-specific-wins resolution of fills, borders and paddings.
//!
//! Lookups walk cell → row → column → table. Within one level the cell or
//! slot on the top/left side of an edge is asked before the bottom/right one.

use std::collections::BTreeMap;

use crate::core::Padding;
use crate::render::{Fill, Stroke};

use super::settings::{CellSettings, Edge, PaddingSettings, SlotSettings, TableSettings};

/// A level of the style hierarchy.
pub trait StyleLevel {
    /// Border drawn around this level as a whole.
    fn border(&self, edge: Edge) -> Option<&Stroke>;

    /// Border applied to every cell inside this level.
    fn cell_border(&self, edge: Edge) -> Option<&Stroke>;

    fn cell_fill(&self) -> Option<&Fill>;

    fn padding(&self) -> &PaddingSettings;
}

impl StyleLevel for CellSettings {
    fn border(&self, edge: Edge) -> Option<&Stroke> {
        self.border.get(edge)
    }

    fn cell_border(&self, _edge: Edge) -> Option<&Stroke> {
        None
    }

    fn cell_fill(&self) -> Option<&Fill> {
        self.fill.as_ref()
    }

    fn padding(&self) -> &PaddingSettings {
        &self.padding
    }
}

impl StyleLevel for SlotSettings {
    fn border(&self, edge: Edge) -> Option<&Stroke> {
        self.border.get(edge)
    }

    fn cell_border(&self, edge: Edge) -> Option<&Stroke> {
        self.cell_border.get(edge)
    }

    fn cell_fill(&self) -> Option<&Fill> {
        self.cell_fill.as_ref()
    }

    fn padding(&self) -> &PaddingSettings {
        &self.padding
    }
}

impl StyleLevel for TableSettings {
    fn border(&self, edge: Edge) -> Option<&Stroke> {
        self.border.get(edge)
    }

    fn cell_border(&self, edge: Edge) -> Option<&Stroke> {
        self.cell_border.get(edge)
    }

    fn cell_fill(&self) -> Option<&Fill> {
        Some(&self.fill)
    }

    fn padding(&self) -> &PaddingSettings {
        &self.cell_padding
    }
}

/// A cell taking part in an edge lookup: its grid position and settings.
#[derive(Debug, Clone, Copy)]
pub struct EdgeCell<'a> {
    pub row: usize,
    pub col: usize,
    pub settings: &'a CellSettings,
}

/// Borrowed view over every settings level of one table.
#[derive(Debug, Clone, Copy)]
pub struct StyleChain<'a> {
    pub table: &'a TableSettings,
    pub rows: &'a BTreeMap<usize, SlotSettings>,
    pub cols: &'a BTreeMap<usize, SlotSettings>,
}

fn edge_of<'a, L: StyleLevel + ?Sized>(level: Option<&'a L>, edge: Edge) -> Option<&'a Stroke> {
    level.and_then(|level| level.border(edge))
}

fn cell_edge_of<'a, L: StyleLevel + ?Sized>(
    level: Option<&'a L>,
    edge: Edge,
) -> Option<&'a Stroke> {
    level.and_then(|level| level.cell_border(edge))
}

/// Outer edge of a level, used when one side of the edge lies outside it.
fn outer_edge<'a, L: StyleLevel + ?Sized>(
    level: &'a L,
    first_missing: bool,
    first_edge: Edge,
    second_missing: bool,
    second_edge: Edge,
) -> Option<&'a Stroke> {
    let first = first_missing
        .then(|| level.border(first_edge).or_else(|| level.border(Edge::All)))
        .flatten();
    first.or_else(|| {
        second_missing
            .then(|| level.border(second_edge).or_else(|| level.border(Edge::All)))
            .flatten()
    })
}

impl<'a> StyleChain<'a> {
    #[must_use]
    pub fn new(
        table: &'a TableSettings,
        rows: &'a BTreeMap<usize, SlotSettings>,
        cols: &'a BTreeMap<usize, SlotSettings>,
    ) -> Self {
        Self { table, rows, cols }
    }

    fn row(&self, row: usize) -> Option<&'a SlotSettings> {
        self.rows.get(&row)
    }

    fn col(&self, col: usize) -> Option<&'a SlotSettings> {
        self.cols.get(&col)
    }

    /// Fill of the cell at `(row, col)`; odd rows are 1, 3, 5, ...
    #[must_use]
    pub fn fill(&self, cell: &'a CellSettings, row: usize, col: usize) -> &'a Fill {
        let parity = if row % 2 == 1 {
            self.table.row_odd_fill.as_ref()
        } else {
            self.table.row_even_fill.as_ref()
        };
        cell.cell_fill()
            .or_else(|| self.row(row).and_then(|slot| slot.cell_fill()))
            .or_else(|| self.col(col).and_then(|slot| slot.cell_fill()))
            .or(parity)
            .unwrap_or(&self.table.fill)
    }

    /// Stroke of the horizontal edge between `top` and `bottom`.
    ///
    /// `None` for either side means the edge lies on the table boundary;
    /// `None` for both means the edge is internal to a merged cell and must
    /// not be drawn, which is also what the return value says.
    #[must_use]
    pub fn horizontal_border(
        &self,
        top: Option<EdgeCell<'a>>,
        bottom: Option<EdgeCell<'a>>,
    ) -> Option<&'a Stroke> {
        let shared_col = top.or(bottom)?.col;
        let top_settings = top.map(|cell| cell.settings);
        let bottom_settings = bottom.map(|cell| cell.settings);

        if let Some(stroke) = edge_of(top_settings, Edge::Bottom)
            .or_else(|| edge_of(bottom_settings, Edge::Top))
            .or_else(|| edge_of(top_settings, Edge::All))
            .or_else(|| edge_of(bottom_settings, Edge::All))
        {
            return Some(stroke);
        }

        let top_row = top.and_then(|cell| self.row(cell.row));
        let bottom_row = bottom.and_then(|cell| self.row(cell.row));
        if let Some(stroke) = edge_of(top_row, Edge::Bottom)
            .or_else(|| edge_of(bottom_row, Edge::Top))
            .or_else(|| edge_of(top_row, Edge::All))
            .or_else(|| edge_of(bottom_row, Edge::All))
            .or_else(|| cell_edge_of(top_row, Edge::Bottom))
            .or_else(|| cell_edge_of(bottom_row, Edge::Top))
            .or_else(|| cell_edge_of(top_row, Edge::All))
            .or_else(|| cell_edge_of(bottom_row, Edge::All))
        {
            return Some(stroke);
        }

        if let Some(col) = self.col(shared_col) {
            if let Some(stroke) =
                outer_edge(col, top.is_none(), Edge::Top, bottom.is_none(), Edge::Bottom)
                    .or_else(|| col.cell_border(Edge::Bottom))
                    .or_else(|| col.cell_border(Edge::Top))
                    .or_else(|| col.cell_border(Edge::All))
            {
                return Some(stroke);
            }
        }

        outer_edge(
            self.table,
            top.is_none(),
            Edge::Top,
            bottom.is_none(),
            Edge::Bottom,
        )
        .or_else(|| top.and_then(|_| self.table.cell_border(Edge::Bottom)))
        .or_else(|| bottom.and_then(|_| self.table.cell_border(Edge::Top)))
        .or_else(|| self.table.cell_border(Edge::All))
    }

    /// Stroke of the vertical edge between `left` and `right`.
    #[must_use]
    pub fn vertical_border(
        &self,
        left: Option<EdgeCell<'a>>,
        right: Option<EdgeCell<'a>>,
    ) -> Option<&'a Stroke> {
        let shared_row = left.or(right)?.row;
        let left_settings = left.map(|cell| cell.settings);
        let right_settings = right.map(|cell| cell.settings);

        if let Some(stroke) = edge_of(left_settings, Edge::Right)
            .or_else(|| edge_of(right_settings, Edge::Left))
            .or_else(|| edge_of(left_settings, Edge::All))
            .or_else(|| edge_of(right_settings, Edge::All))
        {
            return Some(stroke);
        }

        if let Some(row) = self.row(shared_row) {
            if let Some(stroke) =
                outer_edge(row, left.is_none(), Edge::Left, right.is_none(), Edge::Right)
                    .or_else(|| row.cell_border(Edge::Right))
                    .or_else(|| row.cell_border(Edge::Left))
                    .or_else(|| row.cell_border(Edge::All))
            {
                return Some(stroke);
            }
        }

        let left_col = left.and_then(|cell| self.col(cell.col));
        let right_col = right.and_then(|cell| self.col(cell.col));
        if let Some(stroke) = edge_of(left_col, Edge::Right)
            .or_else(|| edge_of(right_col, Edge::Left))
            .or_else(|| edge_of(left_col, Edge::All))
            .or_else(|| edge_of(right_col, Edge::All))
            .or_else(|| cell_edge_of(left_col, Edge::Right))
            .or_else(|| cell_edge_of(right_col, Edge::Left))
            .or_else(|| cell_edge_of(left_col, Edge::All))
            .or_else(|| cell_edge_of(right_col, Edge::All))
        {
            return Some(stroke);
        }

        outer_edge(
            self.table,
            left.is_none(),
            Edge::Left,
            right.is_none(),
            Edge::Right,
        )
        .or_else(|| left.and_then(|_| self.table.cell_border(Edge::Right)))
        .or_else(|| right.and_then(|_| self.table.cell_border(Edge::Left)))
        .or_else(|| self.table.cell_border(Edge::All))
    }

    /// Content padding of a cell: cell → row → column → table, zero if unset.
    #[must_use]
    pub fn padding(&self, cell: &CellSettings, row: usize, col: usize) -> Padding {
        let levels = [
            Some(cell.padding()),
            self.row(row).map(|slot| slot.padding()),
            self.col(col).map(|slot| slot.padding()),
            Some(self.table.padding()),
        ];
        PaddingSettings::resolve(levels.iter().flatten().copied())
    }
}

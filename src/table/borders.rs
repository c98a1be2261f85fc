use tracing::debug;

use crate::core::{CellSpan, Consistent, Rect};
use crate::render::{LayerId, PathBackend, PathPool, Stroke};

use super::sizing::cell_rect;
use super::structure::Cell;
use super::style_chain::{EdgeCell, StyleChain};
use super::{Table, TableState};

/// Which side of a cell rectangle a border segment runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

struct Segment<'a> {
    stroke: &'a Stroke,
    bounds: Rect,
    side: Side,
}

fn edge_cell(cell: &Cell) -> EdgeCell<'_> {
    EdgeCell {
        row: cell.row(),
        col: cell.col(),
        settings: &cell.settings,
    }
}

/// Adds one border line to the path of its stroke. Odd thicknesses are
/// shifted half a pixel so the line lands on whole device pixels.
fn draw_border<B: PathBackend + ?Sized>(
    paths: &mut PathPool,
    backend: &mut B,
    layer: LayerId,
    segment: &Segment<'_>,
) {
    let stroke = segment.stroke;
    let shift = stroke.pixel_shift();
    let Rect { left, top, .. } = segment.bounds;
    let right = segment.bounds.right();
    let bottom = segment.bounds.bottom();
    let ((x1, y1), (x2, y2)) = match segment.side {
        Side::Top => ((left, top + shift), (right + 1.0, top + shift)),
        Side::Right => ((right + shift, top), (right + shift, bottom + 1.0)),
        Side::Bottom => ((left, bottom + shift), (right + 1.0, bottom + shift)),
        Side::Left => ((left + shift, top), (left + shift, bottom + 1.0)),
    };
    let path = paths.border_path(backend, layer, stroke);
    backend.move_to(path, x1, y1);
    backend.line_to(path, x2, y2);
}

impl<B: PathBackend> Table<B> {
    /// Repaints every cell edge.
    ///
    /// The outer top and left edges are walked once per owner cell in the
    /// first row/column. Every slot then contributes its bottom and right
    /// edge, resolved between the owners on either side; edges inside a
    /// merged cell resolve to nothing and are skipped.
    pub(super) fn check_borders(&mut self, layer: LayerId) -> bool {
        if !self.has_invalidation_state(TableState::BORDERS) {
            return false;
        }

        self.paths.reset_borders(&mut self.backend);
        let chain = StyleChain::new(&self.settings, &self.row_settings, &self.col_settings);
        let (rows, cols) = (self.rows, self.cols);
        let cells = &self.cells;
        let rect = |row: usize, col: usize, span: CellSpan| {
            cell_rect(self.bounds, &self.col_rights, &self.row_bottoms, row, col, span)
        };
        let at = |row: usize, col: usize| cells.get(row * cols + col);
        let owner = |cell: &Cell| -> usize {
            cell.overlapped_by()
                .unwrap_or(cell.row() * cols + cell.col())
        };

        let mut segments = Vec::new();

        for cell in (0..cols).filter_map(|col| at(0, col)).filter(|cell| cell.is_owner()) {
            let span = CellSpan::new(1, cell.span.clamped(0, cell.col(), rows, cols).col_span);
            if let Some(stroke) = chain.horizontal_border(None, Some(edge_cell(cell))) {
                segments.push(Segment {
                    stroke,
                    bounds: rect(0, cell.col(), span),
                    side: Side::Top,
                });
            }
        }

        for cell in (0..rows).filter_map(|row| at(row, 0)).filter(|cell| cell.is_owner()) {
            let span = CellSpan::new(cell.span.clamped(cell.row(), 0, rows, cols).row_span, 1);
            if let Some(stroke) = chain.vertical_border(None, Some(edge_cell(cell))) {
                segments.push(Segment {
                    stroke,
                    bounds: rect(cell.row(), 0, span),
                    side: Side::Left,
                });
            }
        }

        for row in 0..rows {
            for col in 0..cols {
                let Some(cell) = at(row, col) else {
                    continue;
                };
                let this_owner = owner(cell);
                let Some(owner_cell) = cells.get(this_owner) else {
                    continue;
                };
                let bounds = rect(row, col, CellSpan::SINGLE);

                let below = if row + 1 < rows { at(row + 1, col) } else { None };
                let bottom = match below {
                    Some(next) if owner(next) == this_owner => None,
                    Some(next) => {
                        let next_owner = cells.get(owner(next)).map(edge_cell);
                        chain.horizontal_border(Some(edge_cell(owner_cell)), next_owner)
                    }
                    None => chain.horizontal_border(Some(edge_cell(owner_cell)), None),
                };
                if let Some(stroke) = bottom {
                    segments.push(Segment {
                        stroke,
                        bounds,
                        side: Side::Bottom,
                    });
                }

                let beside = if col + 1 < cols { at(row, col + 1) } else { None };
                let right = match beside {
                    Some(next) if owner(next) == this_owner => None,
                    Some(next) => {
                        let next_owner = cells.get(owner(next)).map(edge_cell);
                        chain.vertical_border(Some(edge_cell(owner_cell)), next_owner)
                    }
                    None => chain.vertical_border(Some(edge_cell(owner_cell)), None),
                };
                if let Some(stroke) = right {
                    segments.push(Segment {
                        stroke,
                        bounds,
                        side: Side::Right,
                    });
                }
            }
        }

        let mut drawn = 0_usize;
        for segment in segments.iter().filter(|segment| !segment.stroke.is_none()) {
            draw_border(&mut self.paths, &mut self.backend, layer, segment);
            drawn += 1;
        }

        self.mark_consistent(TableState::BORDERS);
        debug!(
            drawn,
            paths = self.paths.border_path_count(),
            "table borders drawn"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::core::Rect;
    use crate::render::{Color, PathCommand, RecordingBackend, Stroke};
    use crate::table::{Edge, Table, TableConfig};

    fn table(rows: usize, cols: usize) -> Table<RecordingBackend> {
        Table::new(
            RecordingBackend::new(),
            TableConfig::default()
                .with_rows(rows)
                .with_cols(cols)
                .with_bounds(Rect::new(0.0, 0.0, 20.0, 20.0)),
        )
    }

    fn segment_count(table: &Table<RecordingBackend>, stroke: &Stroke) -> usize {
        table
            .backend()
            .drawn_paths()
            .into_iter()
            .filter(|path| &path.stroke == stroke)
            .map(|path| {
                path.commands
                    .iter()
                    .filter(|command| matches!(command, PathCommand::MoveTo(..)))
                    .count()
            })
            .sum()
    }

    #[test]
    fn default_grid_draws_every_edge_once() {
        let mut table = table(2, 2);
        table.draw();
        // 2 top + 2 left + 4 bottom + 4 right.
        assert_eq!(segment_count(&table, &Stroke::solid(Color::BLACK, 1.0)), 12);
        assert_eq!(table.paths.border_path_count(), 1);
    }

    #[test]
    fn merged_cell_hides_inner_edges() {
        let mut table = table(2, 2);
        table.cell_mut(0, 0).expect("cell").set_row_span(2).set_col_span(2);
        table.draw();
        // 1 top + 1 left + 2 bottom + 2 right.
        assert_eq!(segment_count(&table, &Stroke::solid(Color::BLACK, 1.0)), 6);
    }

    #[test]
    fn odd_thickness_is_shifted_half_a_pixel() {
        let mut table = table(1, 1);
        table.draw();
        let path = table
            .backend()
            .drawn_paths()
            .into_iter()
            .next()
            .expect("border path");
        assert_eq!(path.commands[0], PathCommand::MoveTo(0.0, 0.5));
        assert_eq!(path.commands[1], PathCommand::LineTo(20.0, 0.5));
    }

    #[test]
    fn cell_border_side_overrides_table_cell_border() {
        let mut table = table(1, 2);
        let red = Stroke::solid(Color::rgb(1.0, 0.0, 0.0), 2.0);
        table
            .cell_mut(0, 0)
            .expect("cell")
            .set_border(Edge::Right, Some(red.clone()))
            .expect("border");
        table.draw();
        assert_eq!(segment_count(&table, &red), 1);
        assert_eq!(table.paths.border_path_count(), 2);
    }

    #[test]
    fn none_stroke_suppresses_an_edge() {
        let mut table = table(1, 1);
        table.set_cell_border(Edge::All, Some(Stroke::None)).expect("border");
        table.draw();
        assert_eq!(table.paths.border_path_count(), 0);
    }
}

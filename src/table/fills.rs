use tracing::debug;

use crate::core::{Consistent, Rect};
use crate::render::{LayerId, PathBackend, PathId};

use super::sizing::cell_rect;
use super::style_chain::StyleChain;
use super::{Table, TableState};

/// Appends the closed outline of `bounds`, right and bottom edges inclusive.
pub(super) fn trace_rect<B: PathBackend + ?Sized>(backend: &mut B, path: PathId, bounds: Rect) {
    let left = bounds.left;
    let top = bounds.top;
    let right = bounds.right() + 1.0;
    let bottom = bounds.bottom() + 1.0;
    backend.move_to(path, left, top);
    backend.line_to(path, right, top);
    backend.line_to(path, right, bottom);
    backend.line_to(path, left, bottom);
    backend.close_path(path);
}

impl<B: PathBackend> Table<B> {
    /// Repaints cell backgrounds. Cells sharing a fill share one path.
    pub(super) fn check_fills(&mut self, layer: LayerId) -> bool {
        if !self.has_invalidation_state(TableState::FILLS) {
            return false;
        }

        self.paths.reset_fills(&mut self.backend);
        let chain = StyleChain::new(&self.settings, &self.row_settings, &self.col_settings);
        let mut painted = 0_usize;
        for cell in self.cells.iter().filter(|cell| cell.is_owner()) {
            let fill = chain.fill(&cell.settings, cell.row(), cell.col());
            if fill.is_none() {
                continue;
            }
            let span = cell.span.clamped(cell.row(), cell.col(), self.rows, self.cols);
            let bounds = cell_rect(
                self.bounds,
                &self.col_rights,
                &self.row_bottoms,
                cell.row(),
                cell.col(),
                span,
            );
            let path = self.paths.fill_path(&mut self.backend, layer, fill);
            trace_rect(&mut self.backend, path, bounds);
            painted += 1;
        }

        self.mark_consistent(TableState::FILLS);
        debug!(painted, paths = self.paths.fill_path_count(), "table fills drawn");
        true
    }
}

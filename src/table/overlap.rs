use tracing::debug;

use crate::core::{CellSpan, Consistent, resolve_overlaps};
use crate::render::PathBackend;

use super::{PAINT_STAGES, Table, TableSignal, TableState};

impl<B: PathBackend> Table<B> {
    /// Recomputes which merged cell covers every slot.
    pub(super) fn check_overlap(&mut self) -> bool {
        if !self.has_invalidation_state(TableState::OVERLAP) {
            return false;
        }

        let spans: Vec<CellSpan> = self.cells.iter().map(|cell| cell.span).collect();
        let resolved = resolve_overlaps(self.rows, self.cols, &spans);
        let mut covered = 0_usize;
        for (index, cell) in self.cells.iter_mut().enumerate() {
            cell.overlapped_by = resolved.get(index).copied().flatten();
            covered += usize::from(cell.overlapped_by.is_some());
        }

        self.mark_consistent(TableState::OVERLAP);
        self.invalidate(PAINT_STAGES, TableSignal::empty());
        debug!(covered, "table overlap resolved");
        true
    }
}

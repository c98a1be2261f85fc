use serde::{Deserialize, Serialize};

/// Row/column span of one cell. Both spans are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellSpan {
    pub row_span: usize,
    pub col_span: usize,
}

impl CellSpan {
    pub const SINGLE: Self = Self {
        row_span: 1,
        col_span: 1,
    };

    #[must_use]
    pub fn new(row_span: usize, col_span: usize) -> Self {
        Self {
            row_span: row_span.max(1),
            col_span: col_span.max(1),
        }
    }

    #[must_use]
    pub fn is_merged(self) -> bool {
        self.row_span > 1 || self.col_span > 1
    }

    /// Span clipped so a cell at `(row, col)` stays inside a `rows x cols` grid.
    #[must_use]
    pub fn clamped(self, row: usize, col: usize, rows: usize, cols: usize) -> Self {
        Self {
            row_span: self.row_span.min(rows.saturating_sub(row)).max(1),
            col_span: self.col_span.min(cols.saturating_sub(col)).max(1),
        }
    }
}

impl Default for CellSpan {
    fn default() -> Self {
        Self::SINGLE
    }
}

/// Computes, for every slot of a row-major `rows x cols` grid, the index of
/// the cell that visually owns it, or `None` for owner/unmerged slots.
///
/// Scanning is row-major and the first writer wins: a slot already covered by
/// an earlier span is never re-assigned, and a covered cell never starts a
/// span of its own.
#[must_use]
pub fn resolve_overlaps(rows: usize, cols: usize, spans: &[CellSpan]) -> Vec<Option<usize>> {
    let len = rows.saturating_mul(cols).min(spans.len());
    let mut overlapped_by: Vec<Option<usize>> = vec![None; len];

    for row in 0..rows {
        for col in 0..cols {
            let index = row * cols + col;
            if index >= len {
                return overlapped_by;
            }
            let span = spans[index];
            if overlapped_by[index].is_some() || !span.is_merged() {
                continue;
            }

            let row_end = rows.min(row + span.row_span);
            let col_end = cols.min(col + span.col_span);
            for covered_row in row..row_end {
                for covered_col in col..col_end {
                    let covered = covered_row * cols + covered_col;
                    if covered != index && covered < len && overlapped_by[covered].is_none() {
                        overlapped_by[covered] = Some(index);
                    }
                }
            }
        }
    }

    overlapped_by
}

#[cfg(test)]
mod tests {
    use super::{CellSpan, resolve_overlaps};

    fn grid(rows: usize, cols: usize, merged: &[(usize, CellSpan)]) -> Vec<CellSpan> {
        let mut spans = vec![CellSpan::SINGLE; rows * cols];
        for (index, span) in merged {
            spans[*index] = *span;
        }
        spans
    }

    #[test]
    fn two_by_two_span_marks_covered_slots() {
        let spans = grid(3, 3, &[(0, CellSpan::new(2, 2))]);
        let overlap = resolve_overlaps(3, 3, &spans);
        assert_eq!(overlap[0], None);
        assert_eq!(overlap[1], Some(0));
        assert_eq!(overlap[3], Some(0));
        assert_eq!(overlap[4], Some(0));
        assert_eq!(overlap[2], None);
        assert_eq!(overlap[8], None);
    }

    #[test]
    fn span_is_clipped_at_grid_edge() {
        let spans = grid(2, 2, &[(3, CellSpan::new(5, 5))]);
        let overlap = resolve_overlaps(2, 2, &spans);
        assert_eq!(overlap, vec![None; 4]);
    }

    #[test]
    fn covered_cell_does_not_start_its_own_span() {
        let spans = grid(3, 3, &[(0, CellSpan::new(2, 2)), (4, CellSpan::new(2, 2))]);
        let overlap = resolve_overlaps(3, 3, &spans);
        assert_eq!(overlap[4], Some(0));
        assert_eq!(overlap[8], None);
        assert_eq!(overlap[5], None);
    }

    #[test]
    fn first_writer_wins_for_conflicting_spans() {
        // (0,1) spans two rows down, (1,0) spans the whole second row.
        let spans = grid(3, 3, &[(1, CellSpan::new(2, 1)), (3, CellSpan::new(1, 3))]);
        let overlap = resolve_overlaps(3, 3, &spans);
        assert_eq!(overlap[4], Some(1));
        assert_eq!(overlap[5], Some(3));
        assert_eq!(overlap[3], None);
    }

    #[test]
    fn clamped_span_never_leaves_grid() {
        assert_eq!(
            CellSpan::new(4, 9).clamped(1, 2, 3, 4),
            CellSpan::new(2, 2)
        );
        assert_eq!(CellSpan::new(0, 0), CellSpan::SINGLE);
    }
}

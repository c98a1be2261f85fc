//! Grid layout engine.
//!
//! A [`Table`] owns a row-major cell array, per-slot size and style settings
//! and the paths it paints through a [`PathBackend`]. All mutations only mark
//! consistency states dirty; [`Table::draw`] then runs the dirty stages in a
//! fixed order:
//!
//! `STRUCTURE → CELL_BOUNDS → OVERLAP → FILLS → BORDERS → CONTENT`,
//! followed by `Z_INDEX` and `CONTAINER`. A stage that changes its output
//! re-dirties the stages downstream of it.

mod borders;
mod content;
mod fills;
mod handles;
mod overlap;
mod settings;
mod sizing;
mod snapshot;
mod structure;
mod style_chain;

pub use content::{CellContent, TextContent};
pub use handles::{CellMut, ContentMatrix, SlotMut};
pub use settings::{
    BorderSettings, CellSettings, Edge, PaddingSettings, SlotSettings, TableSettings,
};
pub use snapshot::{
    CellSnapshot, TABLE_SNAPSHOT_JSON_SCHEMA_V1, TableSnapshot, TableSnapshotJsonContractV1,
};
pub use structure::Cell;
pub use style_chain::{EdgeCell, StyleChain, StyleLevel};

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::{Consistent, Invalidatable, Rect, SlotSizing};
use crate::render::{LayerId, PathBackend, PathPool};

bitflags! {
    /// Consistency states of a [`Table`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TableState: u16 {
        const BOUNDS = 1 << 0;
        const Z_INDEX = 1 << 1;
        const CONTAINER = 1 << 2;
        /// Cell array must be rebuilt for new row/column counts.
        const STRUCTURE = 1 << 3;
        /// Row and column boundaries must be solved again.
        const CELL_BOUNDS = 1 << 4;
        const OVERLAP = 1 << 5;
        const FILLS = 1 << 6;
        const BORDERS = 1 << 7;
        const CONTENT = 1 << 8;
    }
}

bitflags! {
    /// Signals raised by a [`Table`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TableSignal: u8 {
        const NEEDS_REDRAW = 1 << 0;
        const BOUNDS_CHANGED = 1 << 1;
    }
}

/// Stages re-run after the cell grid or its geometry changed.
const PAINT_STAGES: TableState = TableState::FILLS
    .union(TableState::BORDERS)
    .union(TableState::CONTENT);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    pub rows: usize,
    pub cols: usize,
    pub bounds: Rect,
    #[serde(default)]
    pub z_index: i32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            rows: 5,
            cols: 4,
            bounds: Rect::new(0.0, 0.0, 0.0, 0.0),
            z_index: 0,
        }
    }
}

impl TableConfig {
    #[must_use]
    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    #[must_use]
    pub fn with_cols(mut self, cols: usize) -> Self {
        self.cols = cols;
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }

    #[must_use]
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }
}

/// Constraint-based grid of cells drawn into a [`PathBackend`].
pub struct Table<B: PathBackend> {
    backend: B,
    consistency: Invalidatable<TableState, TableSignal>,

    rows: usize,
    cols: usize,
    /// Column count the current `cells` array was built with.
    built_cols: usize,
    cells: Vec<Cell>,
    cell_pool: Vec<Cell>,

    settings: TableSettings,
    row_settings: BTreeMap<usize, SlotSettings>,
    col_settings: BTreeMap<usize, SlotSettings>,
    row_sizing: SlotSizing,
    col_sizing: SlotSizing,

    col_rights: Vec<f64>,
    row_bottoms: Vec<f64>,

    bounds: Rect,
    z_index: i32,
    container: Option<LayerId>,
    layer: Option<LayerId>,
    content_layer: Option<LayerId>,

    paths: PathPool,
    content_to_clear: Vec<Box<dyn CellContent>>,
}

impl<B: PathBackend> std::fmt::Debug for Table<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("bounds", &self.bounds)
            .field("consistency", &self.consistency)
            .field("col_rights", &self.col_rights)
            .field("row_bottoms", &self.row_bottoms)
            .finish_non_exhaustive()
    }
}

impl<B: PathBackend> Consistent for Table<B> {
    type State = TableState;
    type Signal = TableSignal;

    fn consistency(&self) -> &Invalidatable<TableState, TableSignal> {
        &self.consistency
    }

    fn consistency_mut(&mut self) -> &mut Invalidatable<TableState, TableSignal> {
        &mut self.consistency
    }
}

impl<B: PathBackend> Table<B> {
    #[must_use]
    pub fn new(backend: B, config: TableConfig) -> Self {
        Self {
            backend,
            consistency: Invalidatable::new(TableState::all(), TableSignal::all()),
            rows: config.rows.max(1),
            cols: config.cols.max(1),
            built_cols: 0,
            cells: Vec::new(),
            cell_pool: Vec::new(),
            settings: TableSettings::default(),
            row_settings: BTreeMap::new(),
            col_settings: BTreeMap::new(),
            row_sizing: SlotSizing::default(),
            col_sizing: SlotSizing::default(),
            col_rights: Vec::new(),
            row_bottoms: Vec::new(),
            bounds: config.bounds,
            z_index: config.z_index,
            container: None,
            layer: None,
            content_layer: None,
            paths: PathPool::new(),
            content_to_clear: Vec::new(),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[must_use]
    pub fn into_backend(self) -> B {
        self.backend
    }

    #[must_use]
    pub fn rows_count(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols_count(&self) -> usize {
        self.cols
    }

    /// Sets the row count. Zero is ignored, as is an unchanged value.
    pub fn set_rows_count(&mut self, rows: usize) {
        if rows == 0 || rows == self.rows {
            return;
        }
        self.rows = rows;
        self.invalidate(
            TableState::STRUCTURE | TableState::OVERLAP,
            TableSignal::NEEDS_REDRAW,
        );
    }

    /// Sets the column count. Zero is ignored, as is an unchanged value.
    pub fn set_cols_count(&mut self, cols: usize) {
        if cols == 0 || cols == self.cols {
            return;
        }
        self.cols = cols;
        self.invalidate(
            TableState::STRUCTURE | TableState::OVERLAP,
            TableSignal::NEEDS_REDRAW,
        );
    }

    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        if bounds == self.bounds {
            return;
        }
        self.bounds = bounds;
        self.invalidate(
            TableState::BOUNDS,
            TableSignal::NEEDS_REDRAW | TableSignal::BOUNDS_CHANGED,
        );
    }

    #[must_use]
    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn set_z_index(&mut self, z_index: i32) {
        if z_index == self.z_index {
            return;
        }
        self.z_index = z_index;
        self.invalidate(TableState::Z_INDEX, TableSignal::NEEDS_REDRAW);
    }

    #[must_use]
    pub fn container(&self) -> Option<LayerId> {
        self.container
    }

    /// Parent layer of the table's own layer; `None` detaches the table.
    pub fn set_container(&mut self, container: Option<LayerId>) {
        if container == self.container {
            return;
        }
        self.container = container;
        self.invalidate(TableState::CONTAINER, TableSignal::NEEDS_REDRAW);
    }

    /// Root layer of the table, created on first draw.
    #[must_use]
    pub fn layer(&self) -> Option<LayerId> {
        self.layer
    }

    #[must_use]
    pub fn content_layer(&self) -> Option<LayerId> {
        self.content_layer
    }

    #[must_use]
    pub fn settings(&self) -> &TableSettings {
        &self.settings
    }

    /// Right edge (inclusive, relative to the table) of every column.
    #[must_use]
    pub fn col_rights(&self) -> &[f64] {
        &self.col_rights
    }

    /// Bottom edge (inclusive, relative to the table) of every row.
    #[must_use]
    pub fn row_bottoms(&self) -> &[f64] {
        &self.row_bottoms
    }

    #[must_use]
    pub fn row_settings(&self, row: usize) -> Option<&SlotSettings> {
        self.row_settings.get(&row)
    }

    #[must_use]
    pub fn col_settings(&self, col: usize) -> Option<&SlotSettings> {
        self.col_settings.get(&col)
    }

    pub(crate) fn style_chain(&self) -> StyleChain<'_> {
        StyleChain::new(&self.settings, &self.row_settings, &self.col_settings)
    }

    fn ensure_layers(&mut self) -> (LayerId, LayerId) {
        if let (Some(layer), Some(content_layer)) = (self.layer, self.content_layer) {
            return (layer, content_layer);
        }
        let layer = self.backend.create_layer();
        let content_layer = self.backend.create_layer();
        self.backend.set_layer_parent(content_layer, Some(layer));
        self.layer = Some(layer);
        self.content_layer = Some(content_layer);
        (layer, content_layer)
    }

    /// Runs every dirty stage and returns the set of stages that ran.
    ///
    /// Calling `draw` again without intervening mutations does no work and
    /// returns an empty set.
    pub fn draw(&mut self) -> TableState {
        let mut processed = TableState::empty();
        if self.is_consistent() {
            return processed;
        }
        let (layer, content_layer) = self.ensure_layers();

        if self.has_invalidation_state(TableState::BOUNDS) {
            self.invalidate(TableState::CELL_BOUNDS, TableSignal::empty());
            self.mark_consistent(TableState::BOUNDS);
            processed |= TableState::BOUNDS;
        }

        for (stage, ran) in [
            (TableState::STRUCTURE, self.check_structure()),
            (TableState::CELL_BOUNDS, self.check_sizes()),
            (TableState::OVERLAP, self.check_overlap()),
            (TableState::FILLS, self.check_fills(layer)),
            (TableState::BORDERS, self.check_borders(layer)),
            (TableState::CONTENT, self.check_content(content_layer)),
        ] {
            if ran {
                processed |= stage;
            }
        }

        if self.has_invalidation_state(TableState::Z_INDEX) {
            self.backend.set_layer_z_index(layer, self.z_index);
            self.mark_consistent(TableState::Z_INDEX);
            processed |= TableState::Z_INDEX;
        }

        if self.has_invalidation_state(TableState::CONTAINER) {
            self.backend.set_layer_parent(layer, self.container);
            self.mark_consistent(TableState::CONTAINER);
            processed |= TableState::CONTAINER;
        }

        debug!(stages = ?processed, rows = self.rows, cols = self.cols, "table drawn");
        processed
    }

    /// Forces a full repaint on the next draw.
    pub fn invalidate_all(&mut self) {
        trace!("table invalidated");
        self.invalidate(
            TableState::CELL_BOUNDS | TableState::OVERLAP | PAINT_STAGES,
            TableSignal::NEEDS_REDRAW,
        );
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{Table, TableConfig, TableSignal, TableState};
    use crate::core::{Consistent, Rect};
    use crate::render::RecordingBackend;

    fn table() -> Table<RecordingBackend> {
        Table::new(
            RecordingBackend::new(),
            TableConfig::default().with_bounds(Rect::new(0.0, 0.0, 100.0, 50.0)),
        )
    }

    #[test]
    fn first_draw_runs_every_stage_and_second_draw_none() {
        let mut table = table();
        let first = table.draw();
        assert!(first.contains(TableState::STRUCTURE | TableState::CELL_BOUNDS));
        assert!(first.contains(TableState::FILLS | TableState::BORDERS | TableState::CONTENT));
        assert!(table.is_consistent());

        let revision = table.backend().revision;
        assert!(table.draw().is_empty());
        assert_eq!(table.backend().revision, revision);
    }

    #[test]
    fn unchanged_counts_do_not_invalidate() {
        let mut table = table();
        table.draw();
        table.set_rows_count(5);
        table.set_cols_count(0);
        assert!(table.is_consistent());
    }

    #[test]
    fn bounds_change_escalates_to_cell_bounds() {
        let mut table = table();
        table.draw();
        let signals = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&signals);
        table.listen_signals(move |signal| sink.borrow_mut().push(signal));

        table.set_bounds(Rect::new(0.0, 0.0, 200.0, 50.0));
        assert_eq!(
            signals.borrow().as_slice(),
            &[TableSignal::NEEDS_REDRAW | TableSignal::BOUNDS_CHANGED]
        );
        let stages = table.draw();
        assert!(stages.contains(TableState::BOUNDS | TableState::CELL_BOUNDS));
        assert!(stages.contains(TableState::FILLS | TableState::BORDERS));
        assert!(!stages.contains(TableState::STRUCTURE));
    }

    #[test]
    fn z_index_and_container_are_applied_to_the_root_layer() {
        let mut table = table();
        table.draw();
        let parent = {
            use crate::render::PathBackend;
            table.backend_mut().create_layer()
        };
        table.set_z_index(4);
        table.set_container(Some(parent));
        assert_eq!(table.draw(), TableState::Z_INDEX | TableState::CONTAINER);

        let layer = table.layer().expect("layer");
        let record = table.backend().layer(layer).expect("record");
        assert_eq!(record.z_index, 4);
        assert_eq!(record.parent, Some(parent));
    }
}

//! Hierarchical virtualization controller.
//!
//! A [`GanttController`] owns a [`DataTree`] and derives three things from
//! it, each behind its own consistency state:
//!
//! - `DATA`: the linearization (indices, depths, rollups, date range),
//! - `VISIBILITY`: the expanded-only row ordering and its height cache,
//! - `POSITION`: the visible window (start, end, offset) for the current
//!   available height.
//!
//! Structural tree changes re-run all three; collapse/expand only the last
//! two; scrolling only the window negotiation, which is O(log n) over the
//! height cache.

mod height_cache;
mod position;
mod scroll;
mod snapshot;
mod visible;

pub use height_cache::HeightCache;
pub use scroll::{ScrollTarget, window_for_scroll_ratio};
pub use snapshot::{
    CONTROLLER_SNAPSHOT_JSON_SCHEMA_V1, ControllerSnapshot, ControllerSnapshotJsonContractV1,
};
pub use visible::{
    Connector, ConnectorEnd, PeriodRef, VisibleData, VisibleItem, build_visible, item_height,
};

use bitflags::bitflags;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::core::{
    Consistent, DataTree, DateRange, Invalidatable, Linearization, NodeId, NodeMeta, TreeSignal,
    linearize,
};
use crate::error::{GridError, GridResult};

bitflags! {
    /// Consistency states of a [`GanttController`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControllerState: u8 {
        /// Tree structure or values changed; linearize again.
        const DATA = 1 << 0;
        /// Collapse state changed; rebuild the visible rows.
        const VISIBILITY = 1 << 1;
        /// Window inputs changed; negotiate start/end/offset again.
        const POSITION = 1 << 2;
    }
}

bitflags! {
    /// Signals raised by a [`GanttController`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControllerSignal: u8 {
        const NEEDS_REAPPLICATION = 1 << 0;
    }
}

pub const DEFAULT_ROW_HEIGHT: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Resource charts show periods per row and skip parent rollups.
    #[serde(default)]
    pub resource_mode: bool,
    pub default_row_height: f64,
    pub row_stroke_thickness: f64,
    /// Timeline gaps as fractions of the visible date span.
    #[serde(default)]
    pub timeline_min_gap: f64,
    #[serde(default)]
    pub timeline_max_gap: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            resource_mode: false,
            default_row_height: DEFAULT_ROW_HEIGHT,
            row_stroke_thickness: 1.0,
            timeline_min_gap: 0.0,
            timeline_max_gap: 0.0,
        }
    }
}

impl ControllerConfig {
    #[must_use]
    pub fn with_resource_mode(mut self, resource_mode: bool) -> Self {
        self.resource_mode = resource_mode;
        self
    }

    #[must_use]
    pub fn with_default_row_height(mut self, height: f64) -> Self {
        self.default_row_height = height;
        self
    }

    #[must_use]
    pub fn with_row_stroke_thickness(mut self, thickness: f64) -> Self {
        self.row_stroke_thickness = thickness;
        self
    }

    #[must_use]
    pub fn with_timeline_gaps(mut self, min_gap: f64, max_gap: f64) -> Self {
        self.timeline_min_gap = min_gap;
        self.timeline_max_gap = max_gap;
        self
    }

    fn validate(&self) -> GridResult<()> {
        if !self.default_row_height.is_finite() || self.default_row_height <= 0.0 {
            return Err(GridError::InvalidSize(format!(
                "default row height must be finite and > 0, got {}",
                self.default_row_height
            )));
        }
        validate_non_negative("row stroke thickness", self.row_stroke_thickness)?;
        validate_non_negative("timeline min gap", self.timeline_min_gap)?;
        validate_non_negative("timeline max gap", self.timeline_max_gap)
    }
}

fn validate_non_negative(name: &str, value: f64) -> GridResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GridError::InvalidSize(format!(
            "{name} must be finite and >= 0, got {value}"
        )))
    }
}

fn checked(result: GridResult<()>) -> GridResult<()> {
    if let Err(err) = &result {
        warn!(error = %err, "rejected controller setting");
    }
    result
}

/// What the row-drawing collaborators need after a [`GanttController::run`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportFrame<'a> {
    pub items: &'a [VisibleItem],
    pub start_index: usize,
    pub end_index: usize,
    /// Pixels of the start row hidden above the viewport.
    pub vertical_offset: f64,
    pub available_height: f64,
    pub date_range: DateRange,
    /// Whether the window was renegotiated during this run.
    pub position_recalculated: bool,
}

impl ViewportFrame<'_> {
    /// Items of rows `start_index..=end_index`.
    #[must_use]
    pub fn window(&self) -> &[VisibleItem] {
        if self.items.is_empty() {
            return &[];
        }
        let end = self.end_index.min(self.items.len() - 1);
        let start = self.start_index.min(end);
        &self.items[start..=end]
    }
}

pub struct GanttController {
    consistency: Invalidatable<ControllerState, ControllerSignal>,
    config: ControllerConfig,
    tree: DataTree,
    linearization: Linearization,
    visible: VisibleData,
    start_index: Option<usize>,
    end_index: Option<usize>,
    vertical_offset: f64,
    available_height: f64,
    date_range: DateRange,
    position_recalculated: bool,
}

impl std::fmt::Debug for GanttController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GanttController")
            .field("config", &self.config)
            .field("consistency", &self.consistency)
            .field("rows", &self.visible.len())
            .field("start_index", &self.start_index)
            .field("end_index", &self.end_index)
            .field("vertical_offset", &self.vertical_offset)
            .field("available_height", &self.available_height)
            .finish_non_exhaustive()
    }
}

impl Consistent for GanttController {
    type State = ControllerState;
    type Signal = ControllerSignal;

    fn consistency(&self) -> &Invalidatable<ControllerState, ControllerSignal> {
        &self.consistency
    }

    fn consistency_mut(&mut self) -> &mut Invalidatable<ControllerState, ControllerSignal> {
        &mut self.consistency
    }
}

impl Default for GanttController {
    fn default() -> Self {
        Self::with_config(ControllerConfig::default())
    }
}

impl GanttController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller with an empty tree. An invalid config is replaced by the
    /// defaults, keeping only its mode.
    #[must_use]
    pub fn with_config(config: ControllerConfig) -> Self {
        let defaults = ControllerConfig::default();
        let config = if config.validate().is_ok() {
            config
        } else {
            warn!(?config, "invalid controller config, using defaults");
            ControllerConfig {
                resource_mode: config.resource_mode,
                ..defaults
            }
        };
        Self {
            consistency: Invalidatable::new(ControllerState::all(), ControllerSignal::all()),
            config,
            tree: DataTree::new(),
            linearization: Linearization::default(),
            visible: VisibleData::default(),
            start_index: None,
            end_index: None,
            vertical_offset: 0.0,
            available_height: 0.0,
            date_range: DateRange::life_years(config.timeline_min_gap, config.timeline_max_gap),
            position_recalculated: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    #[must_use]
    pub fn data(&self) -> &DataTree {
        &self.tree
    }

    /// Replaces the data tree and returns the previous one.
    pub fn set_data(&mut self, mut tree: DataTree) -> DataTree {
        tree.take_signals();
        let previous = std::mem::replace(&mut self.tree, tree);
        trace!(nodes = self.tree.len(), "controller data replaced");
        self.invalidate(ControllerState::DATA, ControllerSignal::NEEDS_REAPPLICATION);
        previous
    }

    /// Mutates the tree in place. Signals the tree raised are mapped onto
    /// controller states: value/structure changes onto `DATA`, collapse
    /// changes onto `VISIBILITY`.
    pub fn update_data<R>(&mut self, update: impl FnOnce(&mut DataTree) -> R) -> R {
        let result = update(&mut self.tree);
        self.handle_tree_signals();
        result
    }

    fn handle_tree_signals(&mut self) {
        let signals = self.tree.take_signals();
        let mut states = ControllerState::empty();
        if signals.contains(TreeSignal::META_CHANGED) {
            states |= ControllerState::VISIBILITY;
        }
        if signals.contains(TreeSignal::DATA_CHANGED) {
            states |= ControllerState::DATA;
        }
        if !states.is_empty() {
            trace!(?signals, ?states, "tree signals received");
            self.invalidate(states, ControllerSignal::NEEDS_REAPPLICATION);
        }
    }

    pub fn set_collapsed(&mut self, node: NodeId, collapsed: bool) -> GridResult<()> {
        self.update_data(|tree| tree.set_collapsed(node, collapsed))
    }

    pub fn collapse_all(&mut self) {
        self.update_data(|tree| tree.set_all_collapsed(true));
    }

    pub fn expand_all(&mut self) {
        self.update_data(|tree| tree.set_all_collapsed(false));
    }

    #[must_use]
    pub fn resource_mode(&self) -> bool {
        self.config.resource_mode
    }

    pub fn set_resource_mode(&mut self, resource_mode: bool) {
        if self.config.resource_mode != resource_mode {
            self.config.resource_mode = resource_mode;
            self.invalidate(ControllerState::DATA, ControllerSignal::NEEDS_REAPPLICATION);
        }
    }

    #[must_use]
    pub fn row_stroke_thickness(&self) -> f64 {
        self.config.row_stroke_thickness
    }

    pub fn set_row_stroke_thickness(&mut self, thickness: f64) -> GridResult<()> {
        checked(validate_non_negative("row stroke thickness", thickness))?;
        if self.config.row_stroke_thickness != thickness {
            self.config.row_stroke_thickness = thickness;
            self.invalidate(
                ControllerState::VISIBILITY,
                ControllerSignal::NEEDS_REAPPLICATION,
            );
        }
        Ok(())
    }

    pub fn set_default_row_height(&mut self, height: f64) -> GridResult<()> {
        checked(ControllerConfig {
            default_row_height: height,
            ..self.config
        }
        .validate())?;
        if self.config.default_row_height != height {
            self.config.default_row_height = height;
            self.invalidate(
                ControllerState::VISIBILITY,
                ControllerSignal::NEEDS_REAPPLICATION,
            );
        }
        Ok(())
    }

    /// Timeline gaps used to fit the fallback date range.
    pub fn set_timeline_gaps(&mut self, min_gap: f64, max_gap: f64) -> GridResult<()> {
        checked(validate_non_negative("timeline min gap", min_gap))?;
        checked(validate_non_negative("timeline max gap", max_gap))?;
        if (self.config.timeline_min_gap, self.config.timeline_max_gap) != (min_gap, max_gap) {
            self.config.timeline_min_gap = min_gap;
            self.config.timeline_max_gap = max_gap;
            self.invalidate(
                ControllerState::POSITION,
                ControllerSignal::NEEDS_REAPPLICATION,
            );
        }
        Ok(())
    }

    #[must_use]
    pub fn start_index(&self) -> Option<usize> {
        self.start_index
    }

    /// Anchors the window at the top of row `index`. Clears the end anchor
    /// and resets the vertical offset.
    pub fn set_start_index(&mut self, index: usize) {
        self.start_index = Some(index);
        self.vertical_offset = 0.0;
        self.end_index = None;
        trace!(index, "start index set");
        self.invalidate(
            ControllerState::POSITION,
            ControllerSignal::NEEDS_REAPPLICATION,
        );
    }

    #[must_use]
    pub fn end_index(&self) -> Option<usize> {
        self.end_index
    }

    /// Anchors the window so that row `index` ends at the viewport bottom.
    /// Clears the start anchor.
    pub fn set_end_index(&mut self, index: usize) {
        self.end_index = Some(index);
        self.start_index = None;
        trace!(index, "end index set");
        self.invalidate(
            ControllerState::POSITION,
            ControllerSignal::NEEDS_REAPPLICATION,
        );
    }

    #[must_use]
    pub fn vertical_offset(&self) -> f64 {
        self.vertical_offset
    }

    pub fn set_vertical_offset(&mut self, offset: f64) -> GridResult<()> {
        if !offset.is_finite() {
            return checked(Err(GridError::InvalidSize(format!(
                "vertical offset must be finite, got {offset}"
            ))));
        }
        if self.vertical_offset != offset {
            self.vertical_offset = offset;
            self.invalidate(
                ControllerState::POSITION,
                ControllerSignal::NEEDS_REAPPLICATION,
            );
        }
        Ok(())
    }

    #[must_use]
    pub fn available_height(&self) -> f64 {
        self.available_height
    }

    pub fn set_available_height(&mut self, height: f64) -> GridResult<()> {
        checked(validate_non_negative("available height", height))?;
        if self.available_height != height {
            self.available_height = height;
            self.invalidate(
                ControllerState::POSITION,
                ControllerSignal::NEEDS_REAPPLICATION,
            );
        }
        Ok(())
    }

    #[must_use]
    pub fn visible_items(&self) -> &[VisibleItem] {
        &self.visible.items
    }

    #[must_use]
    pub fn visible_data(&self) -> &VisibleData {
        &self.visible
    }

    #[must_use]
    pub fn height_cache(&self) -> &HeightCache {
        &self.visible.cache
    }

    #[must_use]
    pub fn connectors(&self) -> &[Connector] {
        &self.visible.connectors
    }

    #[must_use]
    pub fn visible_items_map(&self) -> &IndexMap<String, usize> {
        &self.visible.items_by_id
    }

    #[must_use]
    pub fn periods_map(&self) -> &IndexMap<String, PeriodRef> {
        &self.visible.periods
    }

    #[must_use]
    pub fn linearization(&self) -> &Linearization {
        &self.linearization
    }

    #[must_use]
    pub fn node_meta(&self, node: NodeId) -> Option<&NodeMeta> {
        self.linearization.get(node)
    }

    /// Date range of the last run.
    #[must_use]
    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    /// Height of rows `start..=end`; see [`HeightCache::height_by_indexes`].
    #[must_use]
    pub fn height_by_indexes(&self, start: usize, end: Option<usize>) -> f64 {
        self.visible.cache.height_by_indexes(start, end)
    }

    #[must_use]
    pub fn index_by_height(&self, height: f64) -> usize {
        self.visible.cache.index_by_height(height)
    }

    fn relinearize(&mut self) {
        self.linearization = linearize(&self.tree, !self.config.resource_mode);
        debug!(
            nodes = self.linearization.len(),
            rollup = !self.config.resource_mode,
            "controller data linearized"
        );
    }

    fn rebuild_visible(&mut self) {
        self.visible = build_visible(
            &self.tree,
            self.config.default_row_height,
            self.config.row_stroke_thickness,
            self.config.resource_mode,
        );
        debug!(
            rows = self.visible.len(),
            total_height = self.visible.cache.total(),
            connectors = self.visible.connectors.len(),
            "controller visible rows built"
        );
    }

    fn resolve_date_range(&mut self) {
        let found = match (self.linearization.date_range, self.visible.date_range) {
            (Some(data), Some(periods)) => Some(data.union(periods)),
            (data, periods) => data.or(periods),
        };
        self.date_range = match found {
            Some(range) => range.widened(),
            None => DateRange::life_years(self.config.timeline_min_gap, self.config.timeline_max_gap),
        };
    }

    /// Brings every stale derivation up to date and returns the frame to
    /// draw. A run with nothing stale recomputes nothing.
    pub fn run(&mut self) -> ViewportFrame<'_> {
        if !self.is_consistent() {
            if self.has_invalidation_state(ControllerState::DATA) {
                self.relinearize();
                self.mark_consistent(ControllerState::DATA);
                self.invalidate(ControllerState::VISIBILITY, ControllerSignal::empty());
            }
            if self.has_invalidation_state(ControllerState::VISIBILITY) {
                self.rebuild_visible();
                self.mark_consistent(ControllerState::VISIBILITY);
                self.invalidate(ControllerState::POSITION, ControllerSignal::empty());
            }
            self.recalculate();
            self.resolve_date_range();
        }

        let position_recalculated = std::mem::take(&mut self.position_recalculated);
        ViewportFrame {
            items: &self.visible.items,
            start_index: self.start_index.unwrap_or(0),
            end_index: self.end_index.unwrap_or(0),
            vertical_offset: self.vertical_offset,
            available_height: self.available_height,
            date_range: self.date_range,
            position_recalculated,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use super::{ControllerConfig, ControllerSignal, ControllerState, GanttController};
    use crate::core::tree::{fields, item_fields};
    use crate::core::{Consistent, DataTree, DateRange};

    fn flat_tree(rows: usize) -> DataTree {
        let mut tree = DataTree::new();
        for row in 0..rows {
            tree.add_root(item_fields([(fields::ID, json!(row))]));
        }
        tree
    }

    #[test]
    fn second_run_without_changes_does_nothing() {
        let mut controller = GanttController::new();
        controller.set_data(flat_tree(10));
        controller.set_available_height(50.0).expect("height");
        assert!(controller.run().position_recalculated);
        assert!(controller.is_consistent());
        let frame = controller.run();
        assert!(!frame.position_recalculated);
        assert_eq!((frame.start_index, frame.end_index), (0, 2));
    }

    #[test]
    fn collapse_only_rebuilds_visibility() {
        let mut tree = DataTree::new();
        let root = tree.add_root(item_fields([(fields::ID, json!("root"))]));
        tree.add_child(root, item_fields([(fields::ID, json!("leaf"))]))
            .expect("child");
        let mut controller = GanttController::new();
        controller.set_data(tree);
        controller.run();

        controller.set_collapsed(root, true).expect("collapse");
        assert!(controller.has_invalidation_state(ControllerState::VISIBILITY));
        assert!(!controller.has_invalidation_state(ControllerState::DATA));
        assert_eq!(controller.run().items.len(), 1);

        controller.expand_all();
        assert_eq!(controller.run().items.len(), 2);
    }

    #[test]
    fn value_change_relinearizes_and_signals() {
        let mut tree = DataTree::new();
        let root = tree.add_root(item_fields([(fields::ID, json!("root"))]));
        let mut controller = GanttController::new();
        controller.set_data(tree);
        controller.run();

        let signals = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&signals);
        controller.listen_signals(move |signal| sink.borrow_mut().push(signal));
        controller
            .update_data(|tree| tree.set_field(root, fields::ACTUAL_START, json!(0)))
            .expect("set field");
        assert!(controller.has_invalidation_state(ControllerState::DATA));
        assert_eq!(
            signals.borrow().as_slice(),
            &[ControllerSignal::NEEDS_REAPPLICATION]
        );
    }

    #[test]
    fn empty_data_falls_back_to_life_years() {
        let mut controller = GanttController::with_config(
            ControllerConfig::default().with_timeline_gaps(0.1, 0.1),
        );
        let frame = controller.run();
        assert_eq!((frame.start_index, frame.end_index), (0, 0));
        assert_eq!(frame.date_range, DateRange::life_years(0.1, 0.1));
    }

    #[test]
    fn single_date_is_widened_by_a_day() {
        let mut tree = DataTree::new();
        tree.add_root(item_fields([(fields::ACTUAL_START, json!(86_400_000))]));
        let mut controller = GanttController::new();
        controller.set_data(tree);
        let range = controller.run().date_range;
        assert_eq!((range.min, range.max), (0.0, 172_800_000.0));
    }

    #[test]
    fn invalid_inputs_are_rejected_without_invalidation() {
        let mut controller = GanttController::new();
        controller.run();
        assert!(controller.set_available_height(-1.0).is_err());
        assert!(controller.set_vertical_offset(f64::NAN).is_err());
        assert!(controller.set_row_stroke_thickness(f64::INFINITY).is_err());
        assert!(controller.set_default_row_height(0.0).is_err());
        assert!(controller.is_consistent());
    }
}

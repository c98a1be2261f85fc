//! Pure linearization of a [`DataTree`].
//!
//! Every node (collapsed subtrees included) receives a pre-order linear index
//! and a depth. In project mode parents also receive rolled-up start, end and
//! progress values computed bottom-up from their children. Explicit values
//! are never overwritten: an auto value is only produced when the node's own
//! field is absent. The tree itself is not touched.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::tree::{DataTree, NodeId, TreeNode, fields};

/// 20 May 1861, 00:00 UTC in milliseconds.
pub const GANTT_BIRTH_DATE_MS: f64 = -3_427_660_800_000.0;
/// 23 Nov 1919, 00:00 UTC in milliseconds.
pub const GANTT_DEATH_DATE_MS: f64 = -1_581_292_800_000.0;
pub const MILLISECONDS_IN_DAY: f64 = 86_400_000.0;

/// Derived metadata of one node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeMeta {
    pub depth: usize,
    pub index: usize,
    pub auto_start: Option<f64>,
    pub auto_end: Option<f64>,
    pub auto_progress: Option<f64>,
}

/// Closed timestamp range in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub min: f64,
    pub max: f64,
}

impl DateRange {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Range substituted when the data carries no dates, fitted so that the
    /// timeline gaps land exactly on the gantt life years.
    #[must_use]
    pub fn life_years(min_gap: f64, max_gap: f64) -> Self {
        let birth = GANTT_BIRTH_DATE_MS;
        let death = GANTT_DEATH_DATE_MS;
        let k = 1.0 + min_gap + max_gap;
        Self {
            min: ((birth + birth * max_gap + death * min_gap) / k).round(),
            max: ((death + death * min_gap + birth * max_gap) / k).round(),
        }
    }

    /// Widens a single-instant range by one day on each side.
    #[must_use]
    pub fn widened(self) -> Self {
        if self.min == self.max {
            Self {
                min: self.min - MILLISECONDS_IN_DAY,
                max: self.max + MILLISECONDS_IN_DAY,
            }
        } else {
            self
        }
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Accumulates finite timestamps into an optional [`DateRange`].
pub fn extend_range(range: &mut Option<DateRange>, date: Option<f64>) {
    let Some(date) = date.filter(|value| value.is_finite()) else {
        return;
    };
    *range = Some(match *range {
        Some(current) => DateRange::new(current.min.min(date), current.max.max(date)),
        None => DateRange::new(date, date),
    });
}

/// Output of [`linearize`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Linearization {
    /// Metadata keyed by node, in pre-order.
    pub meta: IndexMap<NodeId, NodeMeta>,
    /// Range of all actual and baseline dates found in the tree.
    pub date_range: Option<DateRange>,
}

impl Linearization {
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&NodeMeta> {
        self.meta.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.meta.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }

    /// Explicit `actualStart`, falling back to the rolled-up value.
    #[must_use]
    pub fn effective_start(&self, id: NodeId, node: &TreeNode) -> Option<f64> {
        node.timestamp(fields::ACTUAL_START)
            .or_else(|| self.get(id).and_then(|meta| meta.auto_start))
    }

    /// Explicit `actualEnd`, then the rolled-up end, then the effective start.
    #[must_use]
    pub fn effective_end(&self, id: NodeId, node: &TreeNode) -> Option<f64> {
        node.timestamp(fields::ACTUAL_END)
            .or_else(|| self.get(id).and_then(|meta| meta.auto_end))
            .or_else(|| self.effective_start(id, node))
    }

    /// Explicit progress ratio, then the rolled-up ratio, then zero.
    #[must_use]
    pub fn effective_progress(&self, id: NodeId, node: &TreeNode) -> f64 {
        node.ratio(fields::PROGRESS_VALUE)
            .or_else(|| self.get(id).and_then(|meta| meta.auto_progress))
            .unwrap_or(0.0)
    }
}

fn fold_min(acc: Option<f64>, value: Option<f64>) -> Option<f64> {
    match (acc, value) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn fold_max(acc: Option<f64>, value: Option<f64>) -> Option<f64> {
    match (acc, value) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Linearizes `tree`. With `rollup` set (project mode) parents get auto values.
#[must_use]
pub fn linearize(tree: &DataTree, rollup: bool) -> Linearization {
    let order = tree.depth_first();
    let mut result = Linearization {
        meta: IndexMap::with_capacity(order.len()),
        date_range: None,
    };

    for (index, (id, depth)) in order.iter().enumerate() {
        result.meta.insert(
            *id,
            NodeMeta {
                depth: *depth,
                index,
                ..NodeMeta::default()
            },
        );
        if let Some(node) = tree.node(*id) {
            for key in [
                fields::ACTUAL_START,
                fields::ACTUAL_END,
                fields::BASELINE_START,
                fields::BASELINE_END,
            ] {
                extend_range(&mut result.date_range, node.timestamp(key));
            }
        }
    }

    if !rollup {
        return result;
    }

    // Reverse pre-order visits every child before its parent.
    for (id, _) in order.iter().rev() {
        let Some(node) = tree.node(*id) else {
            continue;
        };
        if !node.has_children() {
            continue;
        }

        let mut start = None;
        let mut end = None;
        let mut progress_length = 0.0;
        let mut total_length = 0.0;

        for child_id in node.children() {
            let Some(child) = tree.node(*child_id) else {
                continue;
            };
            let child_start = result.effective_start(*child_id, child);
            let child_end = result.effective_end(*child_id, child);
            let child_progress = result.effective_progress(*child_id, child);

            start = fold_min(fold_min(start, child_start), child_end);
            end = fold_max(fold_max(end, child_start), child_end);

            if let (Some(child_start), Some(child_end)) = (child_start, child_end) {
                let delta = child_end - child_start;
                progress_length += child_progress * delta;
                total_length += delta;
            }
        }

        let explicit_start = node.timestamp(fields::ACTUAL_START).is_some();
        let explicit_end = node.timestamp(fields::ACTUAL_END).is_some();
        let explicit_progress = node.ratio(fields::PROGRESS_VALUE).is_some();

        if let Some(meta) = result.meta.get_mut(id) {
            if !explicit_start {
                meta.auto_start = start;
            }
            if !explicit_end {
                meta.auto_end = end;
            }
            if !explicit_progress && total_length != 0.0 {
                let ratio = progress_length / total_length;
                meta.auto_progress = ratio.is_finite().then_some(ratio);
            }
        }
    }

    result
}

//! Visible-row build: the expanded-only traversal of the tree, its height
//! prefix cache, and the id maps that connector drawing needs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::linearize::extend_range;
use crate::core::tree::{fields, value_id_key, value_timestamp};
use crate::core::{DataTree, DateRange, NodeId};

use super::height_cache::HeightCache;

/// One row of the visible ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleItem {
    pub node: NodeId,
    /// Position in the visible ordering.
    pub index: usize,
    pub depth: usize,
    /// Row height without the row stroke.
    pub height: f64,
}

/// Endpoint of a connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorEnd {
    /// A visible row, or one of the periods of that row in resource mode.
    Row { row: usize, period: Option<usize> },
    /// Target that was not seen yet when the connector was built.
    Pending(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    pub from: ConnectorEnd,
    pub to: ConnectorEnd,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_type: Option<String>,
}

/// Location of a period inside the visible rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRef {
    pub row: usize,
    /// Position inside the row's `periods` array.
    pub position: usize,
}

/// Output of [`build_visible`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibleData {
    pub items: Vec<VisibleItem>,
    pub cache: HeightCache,
    /// Item id → first visible row carrying it.
    pub items_by_id: IndexMap<String, usize>,
    /// Period id → first occurrence (resource mode).
    pub periods: IndexMap<String, PeriodRef>,
    pub connectors: Vec<Connector>,
    /// Per-row min/max over its periods (resource mode).
    pub period_ranges: IndexMap<usize, DateRange>,
    /// Range of all period dates (resource mode).
    pub date_range: Option<DateRange>,
}

impl VisibleData {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Pixel height of a row: its numeric `rowHeight`, else `default_height`.
#[must_use]
pub fn item_height(tree: &DataTree, node: NodeId, default_height: f64) -> f64 {
    tree.node(node)
        .and_then(|node| node.number(fields::ROW_HEIGHT))
        .filter(|height| *height != 0.0)
        .unwrap_or(default_height)
}

fn pending_or(target: Option<ConnectorEnd>, id: String) -> ConnectorEnd {
    target.unwrap_or(ConnectorEnd::Pending(id))
}

/// Walks the expanded rows of `tree` and builds the visible ordering.
#[must_use]
pub fn build_visible(
    tree: &DataTree,
    default_row_height: f64,
    row_stroke_thickness: f64,
    resource_mode: bool,
) -> VisibleData {
    let mut data = VisibleData::default();

    for (node_id, depth) in tree.expanded_depth_first() {
        let Some(node) = tree.node(node_id) else {
            continue;
        };
        let height = item_height(tree, node_id, default_row_height);
        let row = data.cache.push(height + row_stroke_thickness);
        data.items.push(VisibleItem {
            node: node_id,
            index: row,
            depth,
            height,
        });
        if let Some(id) = node.id_key(fields::ID) {
            data.items_by_id.entry(id).or_insert(row);
        }

        if resource_mode {
            let Some(Value::Array(periods)) = node.get(fields::PERIODS) else {
                continue;
            };
            let mut row_range: Option<DateRange> = None;
            for (position, period) in periods.iter().enumerate() {
                let Value::Object(period) = period else {
                    continue;
                };
                let here = PeriodRef { row, position };
                if let Some(id) = period.get(fields::ID).and_then(value_id_key) {
                    data.periods.entry(id).or_insert(here);
                }

                if let Some(target) = period.get(fields::CONNECT_TO).and_then(value_id_key) {
                    let resolved = data.periods.get(&target).map(|found| ConnectorEnd::Row {
                        row: found.row,
                        period: Some(found.position),
                    });
                    data.connectors.push(Connector {
                        from: ConnectorEnd::Row {
                            row,
                            period: Some(position),
                        },
                        to: pending_or(resolved, target),
                        connector_type: period
                            .get(fields::CONNECTOR_TYPE)
                            .and_then(value_id_key),
                    });
                }

                let start = period.get(fields::START).and_then(value_timestamp);
                let end = period.get(fields::END).and_then(value_timestamp);
                if let (Some(start), Some(end)) = (start, end) {
                    extend_range(&mut row_range, Some(start));
                    extend_range(&mut row_range, Some(end));
                    extend_range(&mut data.date_range, Some(start));
                    extend_range(&mut data.date_range, Some(end));
                }
            }
            if let Some(range) = row_range {
                data.period_ranges.insert(row, range);
            }
        } else if let Some(target) = node.id_key(fields::CONNECT_TO) {
            let resolved = data
                .items_by_id
                .get(&target)
                .map(|found| ConnectorEnd::Row {
                    row: *found,
                    period: None,
                });
            data.connectors.push(Connector {
                from: ConnectorEnd::Row { row, period: None },
                to: pending_or(resolved, target),
                connector_type: node.id_key(fields::CONNECTOR_TYPE),
            });
        }
    }

    data
}

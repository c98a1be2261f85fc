//! Hierarchical data source consumed by the gantt controller.
//!
//! Nodes live in an arena addressed by [`NodeId`]. Mutations accumulate
//! [`TreeSignal`] bits that a consumer drains with [`DataTree::take_signals`]:
//! structural and field changes raise `DATA_CHANGED`, collapse toggles raise
//! `META_CHANGED`.
//!
//! Mutating the tree while a consumer is linearizing it is a caller contract
//! violation; no reentrancy guard exists.

use bitflags::bitflags;
use chrono::DateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;

use crate::core::size::SizeValue;
use crate::error::{GridError, GridResult};

/// Well-known field names of gantt data items.
pub mod fields {
    pub const ID: &str = "id";
    pub const ACTUAL_START: &str = "actualStart";
    pub const ACTUAL_END: &str = "actualEnd";
    pub const BASELINE_START: &str = "baselineStart";
    pub const BASELINE_END: &str = "baselineEnd";
    pub const PROGRESS_VALUE: &str = "progressValue";
    pub const ROW_HEIGHT: &str = "rowHeight";
    pub const CONNECT_TO: &str = "connectTo";
    pub const CONNECTOR_TYPE: &str = "connectorType";
    pub const PERIODS: &str = "periods";
    pub const START: &str = "start";
    pub const END: &str = "end";
}

bitflags! {
    /// Change notifications raised by a [`DataTree`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TreeSignal: u8 {
        /// Structure or field values changed; order and rollups are stale.
        const DATA_CHANGED = 1 << 0;
        /// Only presentation metadata (collapse state) changed.
        const META_CHANGED = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    fields: IndexMap<String, Value>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    collapsed: bool,
}

impl TreeNode {
    #[must_use]
    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|value| !value.is_null())
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    /// Numeric timestamp (ms) of a date field. RFC 3339 strings are accepted.
    #[must_use]
    pub fn timestamp(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(value_timestamp)
    }

    /// Finite number stored under `key`.
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(value_number)
    }

    /// Ratio in `0..=1` stored as a number or a percentage string.
    #[must_use]
    pub fn ratio(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(value_ratio)
    }

    /// Identifier stored under `key`, rendered as a string key.
    #[must_use]
    pub fn id_key(&self, key: &str) -> Option<String> {
        self.get(key).and_then(value_id_key)
    }
}

#[must_use]
pub fn value_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|n| n.is_finite()),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

#[must_use]
pub fn value_timestamp(value: &Value) -> Option<f64> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|date| date.timestamp_millis() as f64)
            .or_else(|| value_number(value)),
        _ => value_number(value),
    }
}

#[must_use]
pub fn value_ratio(value: &Value) -> Option<f64> {
    match value {
        Value::String(text) => text
            .parse::<SizeValue>()
            .ok()
            .and_then(|size| size.normalize(1.0)),
        _ => value_number(value),
    }
}

#[must_use]
pub fn value_id_key(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTree {
    nodes: Vec<Option<TreeNode>>,
    roots: Vec<NodeId>,
    pending: TreeSignal,
}

impl DataTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> GridResult<&mut TreeNode> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(GridError::UnknownNode(id.raw()))
    }

    fn alloc(&mut self, fields: IndexMap<String, Value>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(Some(TreeNode {
            fields,
            parent,
            children: Vec::new(),
            collapsed: false,
        }));
        id
    }

    pub fn add_root(&mut self, fields: IndexMap<String, Value>) -> NodeId {
        let id = self.alloc(fields, None);
        self.roots.push(id);
        self.pending.insert(TreeSignal::DATA_CHANGED);
        id
    }

    pub fn add_child(&mut self, parent: NodeId, fields: IndexMap<String, Value>) -> GridResult<NodeId> {
        self.node_mut(parent)?;
        let id = self.alloc(fields, Some(parent));
        self.node_mut(parent)?.children.push(id);
        self.pending.insert(TreeSignal::DATA_CHANGED);
        Ok(id)
    }

    /// Removes `id` together with its whole subtree.
    pub fn remove(&mut self, id: NodeId) -> GridResult<()> {
        let parent = self.node_mut(id)?.parent;
        match parent {
            Some(parent) => self.node_mut(parent)?.children.retain(|child| *child != id),
            None => self.roots.retain(|root| *root != id),
        }

        let mut stack: SmallVec<[NodeId; 16]> = SmallVec::new();
        stack.push(id);
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.index()).and_then(Option::take) {
                stack.extend(node.children);
            }
        }
        self.pending.insert(TreeSignal::DATA_CHANGED);
        Ok(())
    }

    pub fn set_field(&mut self, id: NodeId, key: impl Into<String>, value: Value) -> GridResult<()> {
        let node = self.node_mut(id)?;
        let key = key.into();
        if node.fields.get(&key) == Some(&value) {
            return Ok(());
        }
        node.fields.insert(key, value);
        self.pending.insert(TreeSignal::DATA_CHANGED);
        Ok(())
    }

    pub fn set_collapsed(&mut self, id: NodeId, collapsed: bool) -> GridResult<()> {
        let node = self.node_mut(id)?;
        if node.collapsed != collapsed {
            node.collapsed = collapsed;
            self.pending.insert(TreeSignal::META_CHANGED);
        }
        Ok(())
    }

    /// Sets the collapse flag of every node that has children.
    pub fn set_all_collapsed(&mut self, collapsed: bool) {
        let mut changed = false;
        for node in self.nodes.iter_mut().flatten() {
            if node.has_children() && node.collapsed != collapsed {
                node.collapsed = collapsed;
                changed = true;
            }
        }
        if changed {
            self.pending.insert(TreeSignal::META_CHANGED);
        }
    }

    #[must_use]
    pub fn pending_signals(&self) -> TreeSignal {
        self.pending
    }

    pub fn take_signals(&mut self) -> TreeSignal {
        std::mem::take(&mut self.pending)
    }

    /// Pre-order traversal of every node.
    #[must_use]
    pub fn depth_first(&self) -> Vec<(NodeId, usize)> {
        self.walk(false)
    }

    /// Pre-order traversal that skips children of collapsed nodes.
    #[must_use]
    pub fn expanded_depth_first(&self) -> Vec<(NodeId, usize)> {
        self.walk(true)
    }

    fn walk(&self, skip_collapsed: bool) -> Vec<(NodeId, usize)> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: SmallVec<[(NodeId, usize); 32]> =
            self.roots.iter().rev().map(|root| (*root, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            order.push((id, depth));
            if skip_collapsed && node.collapsed {
                continue;
            }
            stack.extend(node.children.iter().rev().map(|child| (*child, depth + 1)));
        }
        order
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<TreeItemSnapshot> {
        self.roots
            .iter()
            .filter_map(|root| self.item_snapshot(*root))
            .collect()
    }

    fn item_snapshot(&self, id: NodeId) -> Option<TreeItemSnapshot> {
        let node = self.node(id)?;
        Some(TreeItemSnapshot {
            fields: node.fields.clone(),
            collapsed: node.collapsed,
            children: node
                .children
                .iter()
                .filter_map(|child| self.item_snapshot(*child))
                .collect(),
        })
    }

    /// Builds a tree from nested item snapshots. Pending signals start at `DATA_CHANGED`.
    #[must_use]
    pub fn from_snapshot(items: &[TreeItemSnapshot]) -> Self {
        let mut tree = Self::new();
        let mut stack: Vec<(Option<NodeId>, &TreeItemSnapshot)> =
            items.iter().rev().map(|item| (None, item)).collect();
        while let Some((parent, item)) = stack.pop() {
            let id = tree.alloc(item.fields.clone(), parent);
            match parent {
                Some(parent) => {
                    if let Some(Some(node)) = tree.nodes.get_mut(parent.index()) {
                        node.children.push(id);
                    }
                }
                None => tree.roots.push(id),
            }
            if let Some(Some(node)) = tree.nodes.get_mut(id.index()) {
                node.collapsed = item.collapsed;
            }
            stack.extend(item.children.iter().rev().map(|child| (Some(id), child)));
        }
        tree.pending = TreeSignal::DATA_CHANGED;
        tree
    }

    pub fn to_json_pretty(&self) -> GridResult<String> {
        serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| GridError::InvalidData(format!("failed to serialize tree: {e}")))
    }

    pub fn from_json_str(input: &str) -> GridResult<Self> {
        let items: Vec<TreeItemSnapshot> = serde_json::from_str(input)
            .map_err(|e| GridError::InvalidData(format!("failed to parse tree json: {e}")))?;
        Ok(Self::from_snapshot(&items))
    }
}

/// JSON mirror of one tree item and its subtree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TreeItemSnapshot {
    #[serde(flatten)]
    pub fields: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub collapsed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeItemSnapshot>,
}

/// Convenience constructor for a field map.
#[must_use]
pub fn item_fields<K, I>(entries: I) -> IndexMap<String, Value>
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    entries
        .into_iter()
        .map(|(key, value)| (key.into(), value))
        .collect()
}

pub mod consistency;
pub mod linearize;
pub mod overlap;
pub mod size;
pub mod tree;
pub mod types;

pub use consistency::{Consistent, Invalidatable, ListenerId, SignalBatch};
pub use linearize::{DateRange, Linearization, NodeMeta, linearize};
pub use overlap::{CellSpan, resolve_overlaps};
pub use size::{SizeBound, SizeConstraint, SizeSolution, SizeValue, SlotSizing};
pub use tree::{DataTree, NodeId, TreeItemSnapshot, TreeNode, TreeSignal};
pub use types::{Padding, Rect};

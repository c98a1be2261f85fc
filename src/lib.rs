//! gridchart-rs: table layout and gantt virtualization core.
//!
//! Two retained-mode components share one invalidation model
//! ([`core::Consistent`]): the constraint-based grid [`table::Table`] and the
//! hierarchical row virtualizer [`gantt::GanttController`]. Mutations only
//! record dirty states; a `draw`/`run` pass recomputes exactly what changed.

pub mod core;
pub mod error;
pub mod gantt;
pub mod render;
pub mod table;
pub mod telemetry;

pub use core::{Consistent, DataTree, NodeId, Rect, SizeValue};
pub use error::{GridError, GridResult};
pub use gantt::{ControllerConfig, GanttController, ViewportFrame};
pub use render::{PathBackend, RecordingBackend};
pub use table::{Table, TableConfig, TableState};

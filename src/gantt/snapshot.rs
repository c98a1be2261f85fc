use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{DataTree, TreeItemSnapshot};
use crate::error::{GridError, GridResult};

use super::{ControllerConfig, GanttController};

pub const CONTROLLER_SNAPSHOT_JSON_SCHEMA_V1: u32 = 1;

/// Serializable state of a [`GanttController`]: its data and scroll anchor.
///
/// Only one of `start_index` and `end_index` is restored; a start anchor
/// wins when both are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    #[serde(default)]
    pub resource_mode: bool,
    #[serde(default)]
    pub tree_data: Vec<TreeItemSnapshot>,
    #[serde(default)]
    pub vertical_offset: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshotJsonContractV1 {
    pub schema_version: u32,
    pub snapshot: ControllerSnapshot,
}

impl ControllerSnapshot {
    pub fn to_json_contract_v1_pretty(&self) -> GridResult<String> {
        let payload = ControllerSnapshotJsonContractV1 {
            schema_version: CONTROLLER_SNAPSHOT_JSON_SCHEMA_V1,
            snapshot: self.clone(),
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            GridError::InvalidData(format!(
                "failed to serialize controller snapshot contract v1: {e}"
            ))
        })
    }

    /// Accepts either a bare snapshot or a versioned contract payload.
    pub fn from_json_compat_str(input: &str) -> GridResult<Self> {
        if let Ok(payload) = serde_json::from_str::<ControllerSnapshotJsonContractV1>(input) {
            if payload.schema_version != CONTROLLER_SNAPSHOT_JSON_SCHEMA_V1 {
                return Err(GridError::InvalidData(format!(
                    "unsupported controller snapshot schema version: {}",
                    payload.schema_version
                )));
            }
            return Ok(payload.snapshot);
        }
        serde_json::from_str::<ControllerSnapshot>(input).map_err(|e| {
            GridError::InvalidData(format!("failed to parse controller snapshot json payload: {e}"))
        })
    }
}

impl GanttController {
    #[must_use]
    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            resource_mode: self.config.resource_mode,
            tree_data: self.tree.snapshot(),
            vertical_offset: self.vertical_offset,
            start_index: self.start_index,
            end_index: self.end_index,
        }
    }

    pub fn snapshot_json_contract_v1_pretty(&self) -> GridResult<String> {
        self.snapshot().to_json_contract_v1_pretty()
    }

    /// Restores data and scroll anchor on top of `config`. Nothing is
    /// computed until the next [`GanttController::run`].
    pub fn from_snapshot(config: ControllerConfig, snapshot: ControllerSnapshot) -> GridResult<Self> {
        if !snapshot.vertical_offset.is_finite() {
            let err = GridError::InvalidData(format!(
                "snapshot vertical offset must be finite, got {}",
                snapshot.vertical_offset
            ));
            warn!(error = %err, "rejected controller snapshot");
            return Err(err);
        }

        let mut controller =
            Self::with_config(config.with_resource_mode(snapshot.resource_mode));
        controller.set_data(DataTree::from_snapshot(&snapshot.tree_data));
        match (snapshot.start_index, snapshot.end_index) {
            (Some(start), _) => {
                controller.set_start_index(start);
                controller.set_vertical_offset(snapshot.vertical_offset)?;
            }
            (None, Some(end)) => controller.set_end_index(end),
            (None, None) => {}
        }
        Ok(controller)
    }
}

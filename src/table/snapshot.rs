use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{CellSpan, Rect, SlotSizing};
use crate::error::{GridError, GridResult};
use crate::render::{Fill, PathBackend};

use super::content::{CellContent, TextContent};
use super::settings::{BorderSettings, CellSettings, Edge, SlotSettings, TableSettings};
use super::{Table, TableConfig};

pub const TABLE_SNAPSHOT_JSON_SCHEMA_V1: u32 = 1;

/// A cell that differs from a fresh one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub row: usize,
    pub col: usize,
    #[serde(default)]
    pub span: CellSpan,
    #[serde(default)]
    pub settings: CellSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Serializable description of a table's layout and styling.
///
/// Content is captured through [`crate::table::CellContent::text`]; content
/// without a text form is not part of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub rows: usize,
    pub cols: usize,
    pub bounds: Rect,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default)]
    pub row_sizing: SlotSizing,
    #[serde(default)]
    pub col_sizing: SlotSizing,
    pub settings: TableSettings,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub row_settings: BTreeMap<usize, SlotSettings>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub col_settings: BTreeMap<usize, SlotSettings>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cells: Vec<CellSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshotJsonContractV1 {
    pub schema_version: u32,
    pub snapshot: TableSnapshot,
}

impl TableSnapshot {
    pub fn to_json_contract_v1_pretty(&self) -> GridResult<String> {
        let payload = TableSnapshotJsonContractV1 {
            schema_version: TABLE_SNAPSHOT_JSON_SCHEMA_V1,
            snapshot: self.clone(),
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            GridError::InvalidData(format!("failed to serialize table snapshot contract v1: {e}"))
        })
    }

    /// Accepts either a bare snapshot or a versioned contract payload.
    pub fn from_json_compat_str(input: &str) -> GridResult<Self> {
        if let Ok(snapshot) = serde_json::from_str::<TableSnapshot>(input) {
            return Ok(snapshot);
        }
        let payload: TableSnapshotJsonContractV1 = serde_json::from_str(input).map_err(|e| {
            GridError::InvalidData(format!("failed to parse table snapshot json payload: {e}"))
        })?;
        if payload.schema_version != TABLE_SNAPSHOT_JSON_SCHEMA_V1 {
            return Err(GridError::InvalidData(format!(
                "unsupported table snapshot schema version: {}",
                payload.schema_version
            )));
        }
        Ok(payload.snapshot)
    }

    fn validate(&self) -> GridResult<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(GridError::InvalidContents {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if !self.bounds.is_finite() {
            return Err(GridError::InvalidData(
                "table bounds must be finite".to_owned(),
            ));
        }
        validate_fill(Some(&self.settings.fill))?;
        validate_fill(self.settings.row_odd_fill.as_ref())?;
        validate_fill(self.settings.row_even_fill.as_ref())?;
        validate_border(&self.settings.border)?;
        validate_border(&self.settings.cell_border)?;
        for slot in self.row_settings.values().chain(self.col_settings.values()) {
            validate_fill(slot.cell_fill.as_ref())?;
            validate_border(&slot.border)?;
            validate_border(&slot.cell_border)?;
        }
        for cell in &self.cells {
            if cell.row >= self.rows || cell.col >= self.cols {
                return Err(GridError::CellOutOfBounds {
                    row: cell.row,
                    col: cell.col,
                    rows: self.rows,
                    cols: self.cols,
                });
            }
            validate_fill(cell.settings.fill.as_ref())?;
            validate_border(&cell.settings.border)?;
        }
        Ok(())
    }
}

fn validate_fill(fill: Option<&Fill>) -> GridResult<()> {
    fill.map_or(Ok(()), Fill::validate)
}

fn validate_border(border: &BorderSettings) -> GridResult<()> {
    [Edge::All, Edge::Top, Edge::Right, Edge::Bottom, Edge::Left]
        .into_iter()
        .filter_map(|edge| border.get(edge))
        .try_for_each(|stroke| stroke.validate())
}

impl<B: PathBackend> Table<B> {
    /// Captures layout, styling and text content.
    pub fn snapshot(&mut self) -> TableSnapshot {
        self.check_structure();
        let cells = self
            .cells
            .iter()
            .filter_map(|cell| {
                let text = cell
                    .content()
                    .and_then(|content| content.text())
                    .map(str::to_owned);
                let fresh = cell.span() == CellSpan::SINGLE
                    && *cell.settings() == CellSettings::default()
                    && text.is_none();
                (!fresh).then(|| CellSnapshot {
                    row: cell.row(),
                    col: cell.col(),
                    span: cell.span(),
                    settings: cell.settings().clone(),
                    text,
                })
            })
            .collect();

        TableSnapshot {
            rows: self.rows,
            cols: self.cols,
            bounds: self.bounds,
            z_index: self.z_index,
            row_sizing: self.row_sizing.clone(),
            col_sizing: self.col_sizing.clone(),
            settings: self.settings.clone(),
            row_settings: self.row_settings.clone(),
            col_settings: self.col_settings.clone(),
            cells,
        }
    }

    pub fn snapshot_json_contract_v1_pretty(&mut self) -> GridResult<String> {
        self.snapshot().to_json_contract_v1_pretty()
    }

    /// Builds a table from a snapshot. Nothing is drawn until [`Table::draw`].
    pub fn from_snapshot(backend: B, snapshot: TableSnapshot) -> GridResult<Self> {
        if let Err(err) = snapshot.validate() {
            warn!(error = %err, "rejected table snapshot");
            return Err(err);
        }

        let mut table = Self::new(
            backend,
            TableConfig {
                rows: snapshot.rows,
                cols: snapshot.cols,
                bounds: snapshot.bounds,
                z_index: snapshot.z_index,
            },
        );
        table.row_sizing = snapshot.row_sizing;
        table.col_sizing = snapshot.col_sizing;
        table.settings = snapshot.settings;
        table.row_settings = snapshot.row_settings;
        table.col_settings = snapshot.col_settings;
        table.row_settings.retain(|_, slot| !slot.is_empty());
        table.col_settings.retain(|_, slot| !slot.is_empty());

        for cell in snapshot.cells {
            let Some(index) = table.cell_index(cell.row, cell.col) else {
                continue;
            };
            let target = &mut table.cells[index];
            target.span = cell.span;
            target.settings = cell.settings;
            target.content = cell
                .text
                .map(|text| Box::new(TextContent::new(text)) as Box<dyn CellContent>);
        }
        table.invalidate_all();
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::{TABLE_SNAPSHOT_JSON_SCHEMA_V1, TableSnapshot};
    use crate::core::{Rect, SizeValue};
    use crate::render::{Color, Fill, RecordingBackend, Stroke};
    use crate::table::{Edge, Table, TableConfig};

    fn styled() -> Table<RecordingBackend> {
        let mut table = Table::new(
            RecordingBackend::new(),
            TableConfig::default()
                .with_rows(3)
                .with_cols(2)
                .with_bounds(Rect::new(5.0, 5.0, 200.0, 90.0))
                .with_z_index(3),
        );
        table
            .set_col_width(0, Some(SizeValue::Percent(25.0)))
            .expect("width");
        table
            .set_row_odd_fill(Some(Fill::solid(Color::rgb(0.9, 0.9, 0.9))))
            .expect("fill");
        table
            .row_mut(0)
            .expect("row")
            .set_cell_border(Edge::Bottom, Some(Stroke::solid(Color::BLACK, 2.0)))
            .expect("border");
        let mut cell = table.cell_mut(1, 0).expect("cell");
        cell.set_col_span(2).set_text("merged");
        table
    }

    #[test]
    fn json_contract_round_trip_restores_layout() {
        let mut table = styled();
        let json = table.snapshot_json_contract_v1_pretty().expect("serialize");
        assert!(json.contains(&format!("\"schema_version\": {TABLE_SNAPSHOT_JSON_SCHEMA_V1}")));

        let snapshot = TableSnapshot::from_json_compat_str(&json).expect("parse");
        assert_eq!(snapshot.cells.len(), 1);
        let mut restored =
            Table::from_snapshot(RecordingBackend::new(), snapshot.clone()).expect("restore");
        assert_eq!(restored.snapshot(), snapshot);

        table.draw();
        restored.draw();
        assert_eq!(restored.col_rights(), table.col_rights());
        assert_eq!(restored.row_bottoms(), table.row_bottoms());
        assert_eq!(restored.z_index(), 3);
    }

    #[test]
    fn bare_snapshot_json_is_accepted() {
        let mut table = styled();
        let bare = serde_json::to_string(&table.snapshot()).expect("serialize");
        assert!(TableSnapshot::from_json_compat_str(&bare).is_ok());
    }

    #[test]
    fn unsupported_schema_version_is_rejected() {
        let mut table = styled();
        let json = table
            .snapshot_json_contract_v1_pretty()
            .expect("serialize")
            .replace("\"schema_version\": 1", "\"schema_version\": 9");
        assert!(TableSnapshot::from_json_compat_str(&json).is_err());
    }

    #[test]
    fn out_of_range_cell_is_rejected() {
        let mut table = styled();
        let mut snapshot = table.snapshot();
        snapshot.cells[0].row = 7;
        assert!(Table::from_snapshot(RecordingBackend::new(), snapshot).is_err());
    }
}

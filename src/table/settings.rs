//! Typed style settings for cells, rows, columns and the table itself.
//!
//! Every field is optional: `None` means "not set here, ask the next level".
//! An explicit `Some(Stroke::None)` or `Some(Fill::None)` is a real value and
//! stops the lookup.

use serde::{Deserialize, Serialize};

use crate::core::Padding;
use crate::render::{Color, Fill, Stroke};

/// One side of a rectangle, or all four at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    All,
    Top,
    Right,
    Bottom,
    Left,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BorderSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Stroke>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<Stroke>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Stroke>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<Stroke>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Stroke>,
}

impl BorderSettings {
    #[must_use]
    pub fn get(&self, edge: Edge) -> Option<&Stroke> {
        match edge {
            Edge::All => self.all.as_ref(),
            Edge::Top => self.top.as_ref(),
            Edge::Right => self.right.as_ref(),
            Edge::Bottom => self.bottom.as_ref(),
            Edge::Left => self.left.as_ref(),
        }
    }

    /// Sets one side. Setting `Edge::All` also drops every side override.
    /// Returns whether anything changed.
    pub fn set(&mut self, edge: Edge, stroke: Option<Stroke>) -> bool {
        if edge == Edge::All {
            let cleared = Self {
                all: stroke,
                ..Self::default()
            };
            if *self == cleared {
                return false;
            }
            *self = cleared;
            return true;
        }

        let slot = match edge {
            Edge::Top => &mut self.top,
            Edge::Right => &mut self.right,
            Edge::Bottom => &mut self.bottom,
            Edge::Left => &mut self.left,
            Edge::All => &mut self.all,
        };
        if *slot == stroke {
            return false;
        }
        *slot = stroke;
        true
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Per-side padding; unset sides fall back along the padding chain.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PaddingSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<f64>,
}

impl PaddingSettings {
    #[must_use]
    pub const fn uniform(value: f64) -> Self {
        Self {
            top: Some(value),
            right: Some(value),
            bottom: Some(value),
            left: Some(value),
        }
    }

    #[must_use]
    pub fn get(&self, edge: Edge) -> Option<f64> {
        match edge {
            Edge::Top => self.top,
            Edge::Right => self.right,
            Edge::Bottom => self.bottom,
            Edge::Left => self.left,
            Edge::All => None,
        }
    }

    pub(crate) fn validate(&self) -> bool {
        [self.top, self.right, self.bottom, self.left]
            .into_iter()
            .flatten()
            .all(f64::is_finite)
    }

    /// Resolves every side through `chain`, defaulting to zero.
    #[must_use]
    pub fn resolve<'a>(chain: impl IntoIterator<Item = &'a PaddingSettings> + Clone) -> Padding {
        let side = |edge: Edge| {
            chain
                .clone()
                .into_iter()
                .find_map(|settings| settings.get(edge))
                .unwrap_or(0.0)
        };
        Padding::new(
            side(Edge::Top),
            side(Edge::Right),
            side(Edge::Bottom),
            side(Edge::Left),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CellSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,
    #[serde(default, skip_serializing_if = "BorderSettings::is_empty")]
    pub border: BorderSettings,
    #[serde(default)]
    pub padding: PaddingSettings,
}

/// Settings shared by rows and columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SlotSettings {
    /// Outer border of the whole row or column.
    #[serde(default, skip_serializing_if = "BorderSettings::is_empty")]
    pub border: BorderSettings,
    /// Border applied to each cell of the slot.
    #[serde(default, skip_serializing_if = "BorderSettings::is_empty")]
    pub cell_border: BorderSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_fill: Option<Fill>,
    #[serde(default)]
    pub padding: PaddingSettings,
}

impl SlotSettings {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSettings {
    pub fill: Fill,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_odd_fill: Option<Fill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_even_fill: Option<Fill>,
    /// Outer border of the table.
    #[serde(default)]
    pub border: BorderSettings,
    #[serde(default)]
    pub cell_border: BorderSettings,
    #[serde(default)]
    pub cell_padding: PaddingSettings,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            fill: Fill::None,
            row_odd_fill: None,
            row_even_fill: None,
            border: BorderSettings::default(),
            cell_border: BorderSettings {
                all: Some(Stroke::solid(Color::BLACK, 1.0)),
                ..BorderSettings::default()
            },
            cell_padding: PaddingSettings::uniform(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BorderSettings, Edge, PaddingSettings};
    use crate::core::Padding;
    use crate::render::{Color, Stroke};

    #[test]
    fn setting_all_clears_side_overrides() {
        let mut border = BorderSettings::default();
        assert!(border.set(Edge::Top, Some(Stroke::solid(Color::BLACK, 2.0))));
        assert!(border.set(Edge::All, Some(Stroke::solid(Color::WHITE, 1.0))));
        assert!(border.top.is_none());
        assert!(!border.set(Edge::All, Some(Stroke::solid(Color::WHITE, 1.0))));
    }

    #[test]
    fn padding_resolves_each_side_independently() {
        let cell = PaddingSettings {
            top: Some(4.0),
            ..PaddingSettings::default()
        };
        let row = PaddingSettings {
            top: Some(9.0),
            left: Some(2.0),
            ..PaddingSettings::default()
        };
        let resolved = PaddingSettings::resolve([&cell, &row]);
        assert_eq!(resolved, Padding::new(4.0, 0.0, 0.0, 2.0));
    }
}

//! Row/column size negotiation.
//!
//! Slots with a resolved fixed size take it (clamped to their bounds); the
//! remaining "auto" slots share what is left. Auto slots carrying min/max
//! bounds are pinned to those bounds one at a time until the even share is
//! stable or the `auto_count²` iteration budget runs out.
//!
//! When fixed slots exceed the available extent the even share floors at
//! 3px per auto slot and boundaries run past the available extent. Overflow
//! is reported through the boundaries themselves and never clipped.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};

/// Minimal visible share per auto slot under over-subscription.
const MIN_AUTO_SLOT_PX: f64 = 3.0;

/// Raw size setting: fixed pixels or a percentage of the table extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSizeValue", into = "RawSizeValue")]
pub enum SizeValue {
    Pixels(f64),
    Percent(f64),
}

impl SizeValue {
    #[must_use]
    pub const fn px(value: f64) -> Self {
        Self::Pixels(value)
    }

    #[must_use]
    pub const fn percent(value: f64) -> Self {
        Self::Percent(value)
    }

    /// Resolves the value against `total` pixels. Non-finite results map to `None`.
    #[must_use]
    pub fn normalize(self, total: f64) -> Option<f64> {
        let value = match self {
            Self::Pixels(px) => px,
            Self::Percent(percent) => percent * total / 100.0,
        };
        value.is_finite().then_some(value)
    }
}

impl fmt::Display for SizeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pixels(px) => write!(f, "{px}"),
            Self::Percent(percent) => write!(f, "{percent}%"),
        }
    }
}

impl FromStr for SizeValue {
    type Err = GridError;

    fn from_str(input: &str) -> GridResult<Self> {
        let trimmed = input.trim();
        let (number, percent) = if let Some(stripped) = trimmed.strip_suffix('%') {
            (stripped.trim(), true)
        } else if let Some(stripped) = trimmed.strip_suffix("px") {
            (stripped.trim(), false)
        } else {
            (trimmed, false)
        };

        let value: f64 = number
            .parse()
            .map_err(|_| GridError::InvalidSize(input.to_owned()))?;
        if !value.is_finite() {
            return Err(GridError::InvalidSize(input.to_owned()));
        }
        Ok(if percent {
            Self::Percent(value)
        } else {
            Self::Pixels(value)
        })
    }
}

impl From<f64> for SizeValue {
    fn from(value: f64) -> Self {
        Self::Pixels(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawSizeValue {
    Number(f64),
    Text(String),
}

impl TryFrom<RawSizeValue> for SizeValue {
    type Error = GridError;

    fn try_from(raw: RawSizeValue) -> GridResult<Self> {
        match raw {
            RawSizeValue::Number(px) => Ok(Self::Pixels(px)),
            RawSizeValue::Text(text) => text.parse(),
        }
    }
}

impl From<SizeValue> for RawSizeValue {
    fn from(value: SizeValue) -> Self {
        match value {
            SizeValue::Pixels(px) => Self::Number(px),
            SizeValue::Percent(_) => Self::Text(value.to_string()),
        }
    }
}

/// Size, min and max settings; each may be unset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SizeConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<SizeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<SizeValue>,
}

/// Which of a slot's three size settings is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeBound {
    Size,
    Min,
    Max,
}

/// Sparse per-slot size settings plus table-wide defaults for one axis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SlotSizing {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    sizes: BTreeMap<usize, SizeValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    min_sizes: BTreeMap<usize, SizeValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    max_sizes: BTreeMap<usize, SizeValue>,
    #[serde(default)]
    default: SizeConstraint,
}

impl SlotSizing {
    #[must_use]
    pub fn slot(&self, index: usize, bound: SizeBound) -> Option<SizeValue> {
        self.map(bound).get(&index).copied()
    }

    /// Sets (or with `None` removes) one slot setting. Returns whether it changed.
    pub fn set_slot(&mut self, index: usize, bound: SizeBound, value: Option<SizeValue>) -> bool {
        let map = self.map_mut(bound);
        match value {
            Some(value) => map.insert(index, value) != Some(value),
            None => map.remove(&index).is_some(),
        }
    }

    #[must_use]
    pub fn default_constraint(&self) -> SizeConstraint {
        self.default
    }

    pub fn set_default(&mut self, bound: SizeBound, value: Option<SizeValue>) -> bool {
        let slot = match bound {
            SizeBound::Size => &mut self.default.size,
            SizeBound::Min => &mut self.default.min,
            SizeBound::Max => &mut self.default.max,
        };
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }

    fn map(&self, bound: SizeBound) -> &BTreeMap<usize, SizeValue> {
        match bound {
            SizeBound::Size => &self.sizes,
            SizeBound::Min => &self.min_sizes,
            SizeBound::Max => &self.max_sizes,
        }
    }

    fn map_mut(&mut self, bound: SizeBound) -> &mut BTreeMap<usize, SizeValue> {
        match bound {
            SizeBound::Size => &mut self.sizes,
            SizeBound::Min => &mut self.min_sizes,
            SizeBound::Max => &mut self.max_sizes,
        }
    }

    /// Runs the solver and returns the full outcome.
    #[must_use]
    pub fn solve(&self, count: usize, total: f64) -> SizeSolution {
        solve_sizes(count, self, total)
    }

    /// Returns new cumulative boundaries, or `None` when they equal `previous`.
    #[must_use]
    pub fn count_sizes(&self, count: usize, total: f64, previous: &[f64]) -> Option<Vec<f64>> {
        let solution = self.solve(count, total);
        (solution.boundaries.as_slice() != previous).then_some(solution.boundaries)
    }
}

/// Result of one solver pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeSolution {
    /// `boundaries[i]` is the inclusive far edge of slot `i`.
    pub boundaries: Vec<f64>,
    /// Resolved (unrounded) size of each slot.
    pub sizes: Vec<f64>,
    /// `false` when the pinning loop stopped on its iteration budget.
    pub converged: bool,
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct SlotBounds {
    fixed: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
}

fn normalize(value: Option<SizeValue>, total: f64) -> Option<f64> {
    value.and_then(|value| value.normalize(total))
}

/// Fixed size for one slot; `None` means auto. Min wins over a conflicting max.
fn fixed_size(
    raw: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    default: (Option<f64>, Option<f64>, Option<f64>),
) -> Option<f64> {
    let size = raw.or(default.0)?;
    let min = min.or(default.1);
    let max = max.or(default.2);
    let mut size = size;
    if let Some(max) = max {
        size = size.min(max);
    }
    if let Some(min) = min {
        size = size.max(min);
    }
    Some(size)
}

/// Rounds half up, matching the boundary snapping used for layout.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn auto_share(total: f64, distributed: f64, auto_count: usize) -> f64 {
    let count = auto_count as f64;
    (MIN_AUTO_SLOT_PX * count).max(total - distributed) / count
}

fn solve_sizes(count: usize, sizing: &SlotSizing, total: f64) -> SizeSolution {
    let defaults = (
        normalize(sizing.default.size, total),
        normalize(sizing.default.min, total),
        normalize(sizing.default.max, total),
    );

    let mut slots = vec![SlotBounds::default(); count];
    let mut distributed = 0.0;
    let mut auto_count = 0_usize;
    let mut constrained = false;

    for (index, slot) in slots.iter_mut().enumerate() {
        let min = normalize(sizing.slot(index, SizeBound::Min), total);
        let max = normalize(sizing.slot(index, SizeBound::Max), total);
        let raw = normalize(sizing.slot(index, SizeBound::Size), total);
        match fixed_size(raw, min, max, defaults) {
            Some(size) => {
                distributed += size;
                slot.fixed = Some(size);
            }
            None => {
                auto_count += 1;
                slot.min = min.or(defaults.1);
                slot.max = max.or(defaults.2);
                constrained |= slot.min.is_some() || slot.max.is_some();
            }
        }
    }

    let mut restricted: Vec<Option<f64>> = vec![None; count];
    let mut converged = true;
    let mut iterations = 0_usize;

    if constrained && auto_count > 0 {
        let mut budget = auto_count * auto_count;
        loop {
            iterations += 1;
            let share = auto_share(total, distributed, auto_count);
            let mut repeat = false;

            for (index, slot) in slots.iter().enumerate() {
                if slot.fixed.is_some() {
                    continue;
                }
                if let Some(pinned) = restricted[index] {
                    // Release a pin once the share no longer violates its bound.
                    let released = match (slot.min, slot.max) {
                        (Some(min), _) if pinned == min && min < share => true,
                        (_, Some(max)) if pinned == max && max > share => true,
                        _ => false,
                    };
                    if released {
                        distributed -= pinned;
                        auto_count += 1;
                        restricted[index] = None;
                        repeat = true;
                        break;
                    }
                } else {
                    let pin = match (slot.min, slot.max) {
                        (Some(min), _) if min > share => Some(min),
                        (_, Some(max)) if max < share => Some(max),
                        _ => None,
                    };
                    if let Some(pin) = pin {
                        distributed += pin;
                        restricted[index] = Some(pin);
                        auto_count -= 1;
                        repeat = true;
                        break;
                    }
                }
            }

            if !repeat || auto_count == 0 {
                break;
            }
            if budget == 0 {
                converged = false;
                break;
            }
            budget -= 1;
        }
    }

    let share = if auto_count > 0 {
        auto_share(total, distributed, auto_count)
    } else {
        0.0
    };

    let mut current = 0.0;
    let mut boundaries = Vec::with_capacity(count);
    let mut sizes = Vec::with_capacity(count);
    for (index, slot) in slots.iter().enumerate() {
        let size = slot.fixed.or(restricted[index]).unwrap_or(share);
        current += size;
        sizes.push(size);
        boundaries.push(round_half_up(current) - 1.0);
    }

    SizeSolution {
        boundaries,
        sizes,
        converged,
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::{SizeBound, SizeValue, SlotSizing};

    #[test]
    fn size_value_parses_percent_and_pixels() {
        assert_eq!("30%".parse::<SizeValue>().ok(), Some(SizeValue::Percent(30.0)));
        assert_eq!("12px".parse::<SizeValue>().ok(), Some(SizeValue::Pixels(12.0)));
        assert_eq!(" 7 ".parse::<SizeValue>().ok(), Some(SizeValue::Pixels(7.0)));
        assert!("wide".parse::<SizeValue>().is_err());
    }

    #[test]
    fn size_value_round_trips_through_json() {
        let json = serde_json::to_string(&vec![SizeValue::Percent(25.0), SizeValue::Pixels(40.0)])
            .expect("serialize");
        assert_eq!(json, r#"["25%",40.0]"#);
        let parsed: Vec<SizeValue> = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed, vec![SizeValue::Percent(25.0), SizeValue::Pixels(40.0)]);
    }

    #[test]
    fn three_auto_slots_share_one_hundred_pixels() {
        let sizing = SlotSizing::default();
        let solution = sizing.solve(3, 100.0);
        assert_eq!(solution.boundaries, vec![32.0, 66.0, 99.0]);
        assert!(solution.converged);
    }

    #[test]
    fn fixed_and_percent_slots_leave_rest_to_auto() {
        let mut sizing = SlotSizing::default();
        sizing.set_slot(0, SizeBound::Size, Some(SizeValue::Pixels(20.0)));
        sizing.set_slot(1, SizeBound::Size, Some(SizeValue::Percent(50.0)));
        let solution = sizing.solve(3, 200.0);
        assert_eq!(solution.sizes, vec![20.0, 100.0, 80.0]);
        assert_eq!(solution.boundaries, vec![19.0, 119.0, 199.0]);
    }

    #[test]
    fn min_wins_over_conflicting_max_for_fixed_slot() {
        let mut sizing = SlotSizing::default();
        sizing.set_slot(0, SizeBound::Size, Some(SizeValue::Pixels(50.0)));
        sizing.set_slot(0, SizeBound::Min, Some(SizeValue::Pixels(40.0)));
        sizing.set_slot(0, SizeBound::Max, Some(SizeValue::Pixels(30.0)));
        let solution = sizing.solve(1, 100.0);
        assert_eq!(solution.sizes, vec![40.0]);
    }

    #[test]
    fn auto_slot_below_min_is_pinned() {
        let mut sizing = SlotSizing::default();
        sizing.set_slot(0, SizeBound::Min, Some(SizeValue::Pixels(60.0)));
        let solution = sizing.solve(2, 100.0);
        assert_eq!(solution.sizes, vec![60.0, 40.0]);
        assert!(solution.converged);
    }

    #[test]
    fn auto_slot_above_max_is_pinned() {
        let mut sizing = SlotSizing::default();
        sizing.set_slot(1, SizeBound::Max, Some(SizeValue::Pixels(10.0)));
        let solution = sizing.solve(3, 100.0);
        assert_eq!(solution.sizes, vec![45.0, 10.0, 45.0]);
    }

    #[test]
    fn oversubscribed_fixed_slots_overflow_with_three_pixel_auto_floor() {
        let mut sizing = SlotSizing::default();
        sizing.set_slot(0, SizeBound::Size, Some(SizeValue::Pixels(150.0)));
        let solution = sizing.solve(3, 100.0);
        assert_eq!(solution.sizes, vec![150.0, 3.0, 3.0]);
        assert_eq!(solution.boundaries.last().copied(), Some(155.0));
    }

    #[test]
    fn all_fixed_slots_skip_auto_distribution() {
        let mut sizing = SlotSizing::default();
        sizing.set_default(SizeBound::Size, Some(SizeValue::Pixels(25.0)));
        let solution = sizing.solve(4, 100.0);
        assert_eq!(solution.boundaries, vec![24.0, 49.0, 74.0, 99.0]);
        assert_eq!(solution.iterations, 0);
    }

    #[test]
    fn count_sizes_returns_none_when_boundaries_are_unchanged() {
        let sizing = SlotSizing::default();
        let first = sizing.count_sizes(3, 90.0, &[]).expect("first pass changes");
        assert!(sizing.count_sizes(3, 90.0, &first).is_none());
        assert!(sizing.count_sizes(2, 90.0, &first).is_some());
    }

    #[test]
    fn set_slot_reports_changes_only() {
        let mut sizing = SlotSizing::default();
        assert!(sizing.set_slot(2, SizeBound::Size, Some(SizeValue::Pixels(5.0))));
        assert!(!sizing.set_slot(2, SizeBound::Size, Some(SizeValue::Pixels(5.0))));
        assert!(sizing.set_slot(2, SizeBound::Size, None));
        assert!(!sizing.set_slot(2, SizeBound::Size, None));
    }
}

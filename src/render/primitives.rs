use std::str::FromStr;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};

/// RGBA color in normalized 0..=1 channel values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    #[must_use]
    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    #[must_use]
    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self::rgba(red, green, blue, 1.0)
    }

    pub fn validate(self) -> GridResult<()> {
        for (channel, value) in [
            ("red", self.red),
            ("green", self.green),
            ("blue", self.blue),
            ("alpha", self.alpha),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(GridError::InvalidData(format!(
                    "color channel `{channel}` must be finite and in [0, 1]"
                )));
            }
        }
        Ok(())
    }

    fn key(self) -> [OrderedFloat<f64>; 4] {
        [
            OrderedFloat(self.red),
            OrderedFloat(self.green),
            OrderedFloat(self.blue),
            OrderedFloat(self.alpha),
        ]
    }
}

/// Parses `#rgb`, `#rrggbb` and `#rrggbbaa`.
impl FromStr for Color {
    type Err = GridError;

    fn from_str(input: &str) -> GridResult<Self> {
        let invalid = || GridError::InvalidData(format!("invalid color `{input}`"));
        let hex = input.trim().strip_prefix('#').ok_or_else(invalid)?;
        let channel = |range: std::ops::Range<usize>| -> GridResult<f64> {
            let digits = hex.get(range).ok_or_else(invalid)?;
            let value = u8::from_str_radix(digits, 16).map_err(|_| invalid())?;
            Ok(f64::from(value) / 255.0)
        };
        match hex.len() {
            3 => {
                let short = |index: usize| -> GridResult<f64> {
                    let digit = hex.get(index..=index).ok_or_else(invalid)?;
                    let value = u8::from_str_radix(digit, 16).map_err(|_| invalid())?;
                    Ok(f64::from(value * 17) / 255.0)
                };
                Ok(Self::rgb(short(0)?, short(1)?, short(2)?))
            }
            6 => Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Ok(Self::rgba(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientKey {
    pub offset: f64,
    pub color: Color,
}

/// Area paint of a cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fill {
    #[default]
    None,
    Solid {
        color: Color,
    },
    LinearGradient {
        keys: Vec<GradientKey>,
        angle: f64,
    },
}

impl Fill {
    #[must_use]
    pub const fn solid(color: Color) -> Self {
        Self::Solid { color }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn validate(&self) -> GridResult<()> {
        match self {
            Self::None => Ok(()),
            Self::Solid { color } => color.validate(),
            Self::LinearGradient { keys, angle } => {
                if !angle.is_finite() {
                    return Err(GridError::InvalidData(
                        "gradient angle must be finite".to_owned(),
                    ));
                }
                if keys.is_empty() {
                    return Err(GridError::InvalidData(
                        "gradient needs at least one key".to_owned(),
                    ));
                }
                for key in keys {
                    if !(0.0..=1.0).contains(&key.offset) {
                        return Err(GridError::InvalidData(
                            "gradient key offset must be in [0, 1]".to_owned(),
                        ));
                    }
                    key.color.validate()?;
                }
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn key(&self) -> StyleKey {
        match self {
            Self::None => StyleKey::NoFill,
            Self::Solid { color } => StyleKey::SolidFill(color.key()),
            Self::LinearGradient { keys, angle } => StyleKey::GradientFill {
                keys: keys
                    .iter()
                    .map(|key| (OrderedFloat(key.offset), key.color.key()))
                    .collect(),
                angle: OrderedFloat(*angle),
            },
        }
    }
}

/// Line paint of a border edge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stroke {
    #[default]
    None,
    Solid {
        color: Color,
        thickness: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dash: Option<String>,
    },
}

impl Stroke {
    #[must_use]
    pub fn solid(color: Color, thickness: f64) -> Self {
        Self::Solid {
            color,
            thickness,
            dash: None,
        }
    }

    #[must_use]
    pub fn dashed(color: Color, thickness: f64, dash: impl Into<String>) -> Self {
        Self::Solid {
            color,
            thickness,
            dash: Some(dash.into()),
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Line width; a zero or unset thickness draws as one pixel.
    #[must_use]
    pub fn thickness(&self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Solid { thickness, .. } if *thickness > 0.0 => *thickness,
            Self::Solid { .. } => 1.0,
        }
    }

    /// Half-pixel offset that keeps odd-width lines on pixel centers.
    #[must_use]
    pub fn pixel_shift(&self) -> f64 {
        let thickness = self.thickness();
        if thickness.rem_euclid(2.0) == 1.0 {
            0.5
        } else {
            0.0
        }
    }

    pub fn validate(&self) -> GridResult<()> {
        match self {
            Self::None => Ok(()),
            Self::Solid {
                color, thickness, ..
            } => {
                if !thickness.is_finite() || *thickness < 0.0 {
                    return Err(GridError::InvalidData(
                        "stroke thickness must be finite and >= 0".to_owned(),
                    ));
                }
                color.validate()
            }
        }
    }

    #[must_use]
    pub fn key(&self) -> StyleKey {
        match self {
            Self::None => StyleKey::NoStroke,
            Self::Solid {
                color,
                thickness,
                dash,
            } => StyleKey::SolidStroke {
                color: color.key(),
                thickness: OrderedFloat(*thickness),
                dash: dash.clone(),
            },
        }
    }
}

/// Structural identity of a fill or stroke, used to pool one path per style.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StyleKey {
    NoFill,
    SolidFill([OrderedFloat<f64>; 4]),
    GradientFill {
        keys: Vec<(OrderedFloat<f64>, [OrderedFloat<f64>; 4])>,
        angle: OrderedFloat<f64>,
    },
    NoStroke,
    SolidStroke {
        color: [OrderedFloat<f64>; 4],
        thickness: OrderedFloat<f64>,
        dash: Option<String>,
    },
}

//! Typed effect parameters.
//!
//! A [`ParameterSet`] maps names to closed tagged values. Lookups never fail: a missing or
//! mistyped entry falls back to the default supplied by the caller (the effect's compiled-in
//! default).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Color, Point, Size};

/// One tagged parameter value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ParamValue {
    /// Floating point scalar.
    Float(f64),
    /// Integer scalar.
    Int(i64),
    /// Flag.
    Bool(bool),
    /// Free-form string (e.g. a mode name).
    String(String),
    /// Straight-alpha color.
    Color(Color),
    /// Pixel size.
    Size(Size),
    /// 2D point.
    Point(Point),
}

impl ParamValue {
    /// Interpolate toward `other` at `t`; non-numeric values step at `t >= 1`.
    ///
    /// Mismatched variants hold `self` until `t` reaches `1`.
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => Self::Float(a + (b - a) * t),
            (Self::Int(a), Self::Int(b)) => {
                Self::Int((*a as f64 + (*b - *a) as f64 * t).round() as i64)
            }
            (Self::Color(a), Self::Color(b)) => Self::Color(a.lerp(*b, t)),
            (Self::Size(a), Self::Size(b)) => Self::Size(Size::new(
                lerp_u32(a.width, b.width, t),
                lerp_u32(a.height, b.height, t),
            )),
            (Self::Point(a), Self::Point(b)) => Self::Point(a.lerp(*b, t)),
            _ => {
                if t >= 1.0 {
                    other.clone()
                } else {
                    self.clone()
                }
            }
        }
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::Color(_) => "color",
            Self::Size(_) => "size",
            Self::Point(_) => "point",
        }
    }
}

fn lerp_u32(a: u32, b: u32, t: f64) -> u32 {
    (f64::from(a) + (f64::from(b) - f64::from(a)) * t)
        .round()
        .max(0.0) as u32
}

/// Named parameter values of one effect.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParamValue>);

impl ParameterSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    /// Insert or replace one value.
    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    /// Raw lookup.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return `true` when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Copy of `self` with every entry of `overrides` replacing or adding to it.
    pub fn merged(&self, overrides: &ParameterSet) -> ParameterSet {
        let mut out = self.clone();
        for (k, v) in &overrides.0 {
            out.0.insert(k.clone(), v.clone());
        }
        out
    }

    /// Float lookup; `Int` values are widened.
    pub fn float(&self, name: &str, default: f64) -> f64 {
        match self.0.get(name) {
            Some(ParamValue::Float(v)) if v.is_finite() => *v,
            Some(ParamValue::Int(v)) => *v as f64,
            _ => default,
        }
    }

    /// Integer lookup; `Float` values are rounded.
    pub fn int(&self, name: &str, default: i64) -> i64 {
        match self.0.get(name) {
            Some(ParamValue::Int(v)) => *v,
            Some(ParamValue::Float(v)) if v.is_finite() => v.round() as i64,
            _ => default,
        }
    }

    /// Bool lookup.
    pub fn bool(&self, name: &str, default: bool) -> bool {
        match self.0.get(name) {
            Some(ParamValue::Bool(v)) => *v,
            _ => default,
        }
    }

    /// String lookup.
    pub fn string<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        match self.0.get(name) {
            Some(ParamValue::String(v)) => v.as_str(),
            _ => default,
        }
    }

    /// Color lookup.
    pub fn color(&self, name: &str, default: Color) -> Color {
        match self.0.get(name) {
            Some(ParamValue::Color(v)) => *v,
            _ => default,
        }
    }

    /// Size lookup.
    pub fn size(&self, name: &str, default: Size) -> Size {
        match self.0.get(name) {
            Some(ParamValue::Size(v)) => *v,
            _ => default,
        }
    }

    /// Point lookup.
    pub fn point(&self, name: &str, default: Point) -> Point {
        match self.0.get(name) {
            Some(ParamValue::Point(v)) => *v,
            _ => default,
        }
    }
}

impl FromIterator<(String, ParamValue)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/params.rs"]
mod tests;

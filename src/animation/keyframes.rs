use serde::{Deserialize, Serialize};

use crate::effects::params::{ParamValue, ParameterSet};
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::time::Timestamp;

/// Interpolation strategy between adjacent keyframes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Interpolation {
    /// Exact linear blend.
    #[default]
    Linear,
    /// Cubic ease-in/out between keys.
    EaseInOut,
    /// Hold the earlier key's values until the next key.
    Hold,
}

impl Interpolation {
    fn progress(self, t: f64) -> f64 {
        match self {
            Self::Linear => t.clamp(0.0, 1.0),
            Self::EaseInOut => {
                let t = t.clamp(0.0, 1.0);
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (2.0 - 2.0 * t).powi(3) / 2.0
                }
            }
            Self::Hold => 0.0,
        }
    }
}

/// Parameter overrides that take effect at `time` (clip-local).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Keyframe {
    /// Clip-local time of this key.
    pub time: Timestamp,
    /// Overrides applied at `time`.
    pub values: ParameterSet,
}

impl Keyframe {
    /// Create a keyframe.
    pub fn new(time: Timestamp, values: ParameterSet) -> Self {
        Self { time, values }
    }
}

/// Validate that keys are sorted by time.
pub fn validate_keyframes(keys: &[Keyframe]) -> MontageResult<()> {
    if !keys.windows(2).all(|w| w[0].time <= w[1].time) {
        return Err(MontageError::validation("keyframes must be sorted by time"));
    }
    Ok(())
}

/// Interpolated overrides at `t`, clamped to the first/last key outside the keyed span.
pub fn interpolate(keys: &[Keyframe], t: Timestamp, mode: Interpolation) -> ParameterSet {
    let Some(first) = keys.first() else {
        return ParameterSet::new();
    };
    if t <= first.time {
        return first.values.clone();
    }
    let idx = keys.partition_point(|k| k.time <= t);
    if idx >= keys.len() {
        return keys[keys.len() - 1].values.clone();
    }

    let a = &keys[idx - 1];
    let b = &keys[idx];
    if t == a.time {
        return a.values.clone();
    }
    let span = b.time - a.time;
    if span.is_zero() {
        return a.values.clone();
    }
    let progress = mode.progress((t - a.time).ratio(span));

    let mut out = ParameterSet::new();
    for (name, av) in a.values.iter() {
        let v = match b.values.get(name) {
            Some(bv) => av.lerp(bv, progress),
            None => av.clone(),
        };
        out.set(name.clone(), v);
    }
    for (name, bv) in b.values.iter() {
        if a.values.get(name).is_none() {
            out.set(name.clone(), bv.clone());
        }
    }
    out
}

/// Float convenience for one named parameter.
pub fn interpolate_float(
    keys: &[Keyframe],
    name: &str,
    t: Timestamp,
    mode: Interpolation,
) -> Option<f64> {
    match interpolate(keys, t, mode).get(name) {
        Some(ParamValue::Float(v)) => Some(*v),
        Some(ParamValue::Int(v)) => Some(*v as f64),
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/keyframes.rs"]
mod tests;

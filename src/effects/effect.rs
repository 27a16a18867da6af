//! Effect values and the composition algebra.
//!
//! An [`Effect`] is an immutable value: an id, a typed parameter set, and an operation. The
//! operation is a closed sum over built-in filters and the composition operators (sequential,
//! parallel blend, time gate, keyframes), plus an escape hatch for caller-supplied closures.
//! Application is pure: animation state is recomputed from the timestamp on every call.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::animation::keyframes::{Interpolation, Keyframe, interpolate, validate_keyframes};
use crate::effects::builtin::{Filter, apply_filter};
use crate::effects::context::RenderContext;
use crate::effects::params::{ParamValue, ParameterSet};
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::time::{TimeRange, Timestamp};
use crate::render::frame::FrameRGBA;

type EffectFn = dyn Fn(&FrameRGBA, Timestamp, &RenderContext, &ParameterSet) -> MontageResult<FrameRGBA>
    + Send
    + Sync;
type CombineFn = dyn Fn([f32; 4], [f32; 4]) -> [f32; 4] + Send + Sync;
type GateFn = dyn Fn(Timestamp, &RenderContext) -> bool + Send + Sync;

/// A pure, parameterized frame transform.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Effect {
    id: String,
    #[serde(default, skip_serializing_if = "ParameterSet::is_empty")]
    parameters: ParameterSet,
    operation: EffectOp,
}

/// What an effect does.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub enum EffectOp {
    /// Built-in filter reading its parameters from the effect.
    Filter(Filter),
    /// Apply each effect to the previous one's output.
    Sequential(Vec<Effect>),
    /// Apply both effects to the same input, then blend the two results.
    Parallel {
        /// Left branch.
        first: Box<Effect>,
        /// Right branch.
        second: Box<Effect>,
        /// Pixel combiner.
        blend: BlendFn,
    },
    /// Apply `inner` only while `gate` holds; pass the input through otherwise.
    TimeGated {
        /// Gated effect.
        inner: Box<Effect>,
        /// Predicate over clip-local time and context.
        gate: Gate,
    },
    /// Apply `base` with parameters interpolated from keyframes.
    Keyframed {
        /// Effect whose parameters are animated.
        base: Box<Effect>,
        /// Keys sorted by time.
        keyframes: Vec<Keyframe>,
        /// Interpolation between keys.
        interpolation: Interpolation,
    },
    /// Caller-supplied transform. Not serializable.
    #[serde(skip)]
    Custom(CustomEffect),
}

/// Closure-backed effect body.
#[derive(Clone)]
pub struct CustomEffect {
    apply: Arc<EffectFn>,
    framing: bool,
}

impl fmt::Debug for CustomEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomEffect")
            .field("framing", &self.framing)
            .finish_non_exhaustive()
    }
}

/// Named pixel combiner for parallel composition.
///
/// Pixels are premultiplied unit floats `[r, g, b, a]`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlendFn {
    /// Channel-wise mean.
    Average,
    /// `1 - (1 - a)(1 - b)`.
    Screen,
    /// Separable multiply with source-over alpha.
    Multiply,
    /// Saturating sum.
    Add,
    /// Channel-wise maximum.
    Lighten,
    /// Channel-wise minimum.
    Darken,
    /// Caller-supplied combiner. Not serializable.
    #[serde(skip)]
    Custom(Arc<CombineFn>),
}

impl fmt::Debug for BlendFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Average => f.write_str("Average"),
            Self::Screen => f.write_str("Screen"),
            Self::Multiply => f.write_str("Multiply"),
            Self::Add => f.write_str("Add"),
            Self::Lighten => f.write_str("Lighten"),
            Self::Darken => f.write_str("Darken"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl BlendFn {
    /// Wrap a custom pixel combiner.
    pub fn custom(f: impl Fn([f32; 4], [f32; 4]) -> [f32; 4] + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// Combine one pixel pair.
    pub fn combine_px(&self, a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
        let mut out = [0.0f32; 4];
        match self {
            Self::Average => {
                for c in 0..4 {
                    out[c] = (a[c] + b[c]) * 0.5;
                }
            }
            Self::Screen => {
                for c in 0..4 {
                    out[c] = 1.0 - (1.0 - a[c]) * (1.0 - b[c]);
                }
            }
            Self::Multiply => {
                for c in 0..3 {
                    out[c] = a[c] * b[c] + a[c] * (1.0 - b[3]) + b[c] * (1.0 - a[3]);
                }
                out[3] = a[3] + b[3] - a[3] * b[3];
            }
            Self::Add => {
                for c in 0..4 {
                    out[c] = (a[c] + b[c]).min(1.0);
                }
            }
            Self::Lighten => {
                for c in 0..4 {
                    out[c] = a[c].max(b[c]);
                }
            }
            Self::Darken => {
                for c in 0..4 {
                    out[c] = a[c].min(b[c]);
                }
            }
            Self::Custom(f) => out = f(a, b),
        }
        out
    }

    /// Blend two frames of equal extent.
    pub fn combine(&self, a: &FrameRGBA, b: &FrameRGBA) -> MontageResult<FrameRGBA> {
        if !a.same_extent(b) {
            return Err(MontageError::effect_failure(format!(
                "blend inputs differ in extent: {}x{} vs {}x{}",
                a.width, a.height, b.width, b.height
            )));
        }
        let mut out = a.clone();
        for (o, bp) in out.data.chunks_exact_mut(4).zip(b.data.chunks_exact(4)) {
            let ap = [
                f32::from(o[0]) / 255.0,
                f32::from(o[1]) / 255.0,
                f32::from(o[2]) / 255.0,
                f32::from(o[3]) / 255.0,
            ];
            let bq = [
                f32::from(bp[0]) / 255.0,
                f32::from(bp[1]) / 255.0,
                f32::from(bp[2]) / 255.0,
                f32::from(bp[3]) / 255.0,
            ];
            let r = self.combine_px(ap, bq);
            let alpha = r[3].clamp(0.0, 1.0);
            o[3] = (alpha * 255.0).round() as u8;
            for c in 0..3 {
                // Keep the result a valid premultiplied pixel.
                o[c] = (r[c].clamp(0.0, alpha) * 255.0).round() as u8;
            }
        }
        Ok(out)
    }
}

/// Predicate deciding whether a gated effect applies.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Gate {
    /// Clip-local time inside the range.
    Within(TimeRange),
    /// Clip-local time strictly before the timestamp.
    Before(Timestamp),
    /// Clip-local time at or after the timestamp.
    After(Timestamp),
    /// Caller-supplied predicate. Not serializable.
    #[serde(skip)]
    Custom(Arc<GateFn>),
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Within(r) => f.debug_tuple("Within").field(r).finish(),
            Self::Before(t) => f.debug_tuple("Before").field(t).finish(),
            Self::After(t) => f.debug_tuple("After").field(t).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Gate {
    /// Wrap a custom predicate.
    pub fn custom(f: impl Fn(Timestamp, &RenderContext) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// Evaluate the predicate.
    pub fn holds(&self, t: Timestamp, ctx: &RenderContext) -> bool {
        match self {
            Self::Within(r) => r.contains(t),
            Self::Before(x) => t < *x,
            Self::After(x) => t >= *x,
            Self::Custom(f) => f(t, ctx),
        }
    }
}

impl Effect {
    /// Built-in filter with explicit parameters; absent names use the filter's defaults.
    pub fn filter(filter: Filter, parameters: ParameterSet) -> Self {
        Self {
            id: filter.name().to_string(),
            parameters,
            operation: EffectOp::Filter(filter),
        }
    }

    /// Closure-backed effect that must preserve frame bounds.
    pub fn custom(
        id: impl Into<String>,
        parameters: ParameterSet,
        f: impl Fn(&FrameRGBA, Timestamp, &RenderContext, &ParameterSet) -> MontageResult<FrameRGBA>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            parameters,
            operation: EffectOp::Custom(CustomEffect {
                apply: Arc::new(f),
                framing: false,
            }),
        }
    }

    /// Closure-backed framing effect; its output is re-cropped to the input bounds.
    pub fn custom_framing(
        id: impl Into<String>,
        parameters: ParameterSet,
        f: impl Fn(&FrameRGBA, Timestamp, &RenderContext, &ParameterSet) -> MontageResult<FrameRGBA>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            parameters,
            operation: EffectOp::Custom(CustomEffect {
                apply: Arc::new(f),
                framing: true,
            }),
        }
    }

    /// `second` applied to the output of `first`.
    pub fn sequential(first: Effect, second: Effect) -> Self {
        Self {
            id: format!("{}>{}", first.id, second.id),
            parameters: ParameterSet::new(),
            operation: EffectOp::Sequential(vec![first, second]),
        }
    }

    /// Both effects applied to the same input, results combined with `blend`.
    pub fn parallel(first: Effect, second: Effect, blend: BlendFn) -> Self {
        Self {
            id: format!("({}|{})", first.id, second.id),
            parameters: ParameterSet::new(),
            operation: EffectOp::Parallel {
                first: Box::new(first),
                second: Box::new(second),
                blend,
            },
        }
    }

    /// `inner` applied only while `gate` holds.
    pub fn time_gated(inner: Effect, gate: Gate) -> Self {
        Self {
            id: format!("gated({})", inner.id),
            parameters: ParameterSet::new(),
            operation: EffectOp::TimeGated {
                inner: Box::new(inner),
                gate,
            },
        }
    }

    /// `base` animated by keyframe overrides; keys must be sorted by time.
    pub fn keyframed(
        base: Effect,
        keyframes: Vec<Keyframe>,
        interpolation: Interpolation,
    ) -> MontageResult<Self> {
        validate_keyframes(&keyframes)?;
        Ok(Self {
            id: format!("keyframed({})", base.id),
            parameters: ParameterSet::new(),
            operation: EffectOp::Keyframed {
                base: Box::new(base),
                keyframes,
                interpolation,
            },
        })
    }

    /// Check invariants the constructors enforce, for effects that were deserialized.
    ///
    /// Walks the whole operation tree: keyframes must be sorted by time.
    pub fn validate(&self) -> MontageResult<()> {
        match &self.operation {
            EffectOp::Filter(_) | EffectOp::Custom(_) => Ok(()),
            EffectOp::Sequential(effects) => effects.iter().try_for_each(Effect::validate),
            EffectOp::Parallel { first, second, .. } => {
                first.validate()?;
                second.validate()
            }
            EffectOp::TimeGated { inner, .. } => inner.validate(),
            EffectOp::Keyframed {
                base, keyframes, ..
            } => {
                validate_keyframes(keyframes).map_err(|e| {
                    MontageError::validation(format!("effect '{}': {e}", self.id))
                })?;
                base.validate()
            }
        }
    }

    /// Effect identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Explicit parameters (without filter defaults).
    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// The operation.
    pub fn operation(&self) -> &EffectOp {
        &self.operation
    }

    /// Copy with a different id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Copy with one parameter replaced.
    pub fn with_parameter(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.parameters.set(name, value);
        self
    }

    /// Copy with the whole parameter set replaced.
    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters = parameters;
        self
    }

    /// Parameters with compiled-in defaults filled in.
    pub fn resolved_parameters(&self) -> ParameterSet {
        match &self.operation {
            EffectOp::Filter(f) => f.default_parameters().merged(&self.parameters),
            _ => self.parameters.clone(),
        }
    }

    /// Return `true` for framing/transform effects whose output is re-cropped to input bounds.
    pub fn is_framing(&self) -> bool {
        match &self.operation {
            EffectOp::Filter(f) => f.is_framing(),
            EffectOp::Custom(c) => c.framing,
            EffectOp::Sequential(list) => list.iter().any(Effect::is_framing),
            EffectOp::Parallel { first, second, .. } => first.is_framing() || second.is_framing(),
            EffectOp::TimeGated { inner, .. } => inner.is_framing(),
            EffectOp::Keyframed { base, .. } => base.is_framing(),
        }
    }

    /// Apply at clip-local time `t`.
    ///
    /// The result always has the input's extent: framing effects are re-cropped, any other
    /// effect that changes bounds fails with [`MontageError::EffectFailure`].
    pub fn apply(
        &self,
        frame: &FrameRGBA,
        t: Timestamp,
        ctx: &RenderContext,
    ) -> MontageResult<FrameRGBA> {
        let out = self.apply_unchecked(frame, t, ctx)?;
        if out.same_extent(frame) {
            return Ok(out);
        }
        if self.is_framing() {
            return Ok(out.cropped_to(frame.size()));
        }
        Err(MontageError::effect_failure(format!(
            "effect '{}' changed frame bounds from {}x{} to {}x{}",
            self.id, frame.width, frame.height, out.width, out.height
        )))
    }

    fn apply_unchecked(
        &self,
        frame: &FrameRGBA,
        t: Timestamp,
        ctx: &RenderContext,
    ) -> MontageResult<FrameRGBA> {
        match &self.operation {
            EffectOp::Filter(f) => apply_filter(*f, &self.resolved_parameters(), frame, t, ctx),
            EffectOp::Sequential(list) => {
                let Some((head, rest)) = list.split_first() else {
                    return Ok(frame.clone());
                };
                let mut cur = head.apply(frame, t, ctx)?;
                for e in rest {
                    cur = e.apply(&cur, t, ctx)?;
                }
                Ok(cur)
            }
            EffectOp::Parallel {
                first,
                second,
                blend,
            } => {
                let (a, b) = rayon::join(
                    || first.apply(frame, t, ctx),
                    || second.apply(frame, t, ctx),
                );
                blend.combine(&a?, &b?)
            }
            EffectOp::TimeGated { inner, gate } => {
                if gate.holds(t, ctx) {
                    inner.apply(frame, t, ctx)
                } else {
                    Ok(frame.clone())
                }
            }
            EffectOp::Keyframed {
                base,
                keyframes,
                interpolation,
            } => {
                let overrides = interpolate(keyframes, t, *interpolation);
                let animated = base
                    .as_ref()
                    .clone()
                    .with_parameters(base.parameters.merged(&overrides));
                animated.apply(frame, t, ctx)
            }
            EffectOp::Custom(c) => (c.apply)(frame, t, ctx, &self.parameters),
        }
    }
}

/// Ordered accumulation of effects reducible to one sequential composite.
#[derive(Clone, Debug, Default)]
pub struct EffectChain {
    effects: Vec<Effect>,
}

impl EffectChain {
    /// Empty chain (identity).
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an effect.
    pub fn then(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Append an effect in place.
    pub fn push(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Number of accumulated effects.
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Return `true` when no effects were added.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Reduce to a single sequential effect.
    pub fn build(self) -> Effect {
        let id = if self.effects.is_empty() {
            "identity".to_string()
        } else {
            self.effects
                .iter()
                .map(Effect::id)
                .collect::<Vec<_>>()
                .join(">")
        };
        Effect {
            id,
            parameters: ParameterSet::new(),
            operation: EffectOp::Sequential(self.effects),
        }
    }
}

impl FromIterator<Effect> for EffectChain {
    fn from_iter<I: IntoIterator<Item = Effect>>(iter: I) -> Self {
        Self {
            effects: iter.into_iter().collect(),
        }
    }
}

/// Apply `effects` in declared order.
pub fn apply_chain(
    effects: &[Effect],
    frame: &FrameRGBA,
    t: Timestamp,
    ctx: &RenderContext,
) -> MontageResult<FrameRGBA> {
    let mut cur = frame.clone();
    for e in effects {
        cur = e.apply(&cur, t, ctx)?;
    }
    Ok(cur)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/effect.rs"]
mod tests;

//! Clip-to-clip transition descriptions.

use serde::{Deserialize, Serialize};

use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::time::Timestamp;

/// Direction a wipe reveals the incoming clip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WipeDir {
    /// Reveal from the left edge.
    #[default]
    LeftToRight,
    /// Reveal from the right edge.
    RightToLeft,
    /// Reveal from the top edge.
    TopToBottom,
    /// Reveal from the bottom edge.
    BottomToTop,
}

/// How the outgoing clip hands over to the incoming one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransitionKind {
    /// Linear cross-dissolve.
    Crossfade,
    /// Moving edge reveal.
    Wipe {
        /// Reveal direction.
        direction: WipeDir,
        /// Edge feather in `[0, 1]` of the travel distance.
        soft_edge: f32,
    },
    /// Outgoing fades to black over the first half, incoming fades in over the second.
    FadeToBlack,
}

/// Transition at the tail of a clip into the next clip on the same track.
///
/// Serialized flat as `{kind, duration}`; wipes add optional `direction` and `softEdge`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TransitionRepr", into = "TransitionRepr")]
pub struct Transition {
    /// Blend style.
    pub kind: TransitionKind,
    /// Length of the handover, measured back from the clip's end.
    pub duration: Timestamp,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum KindName {
    Crossfade,
    Wipe,
    FadeToBlack,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TransitionRepr {
    kind: KindName,
    duration: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    direction: Option<WipeDir>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    soft_edge: Option<f32>,
}

impl TryFrom<TransitionRepr> for Transition {
    type Error = MontageError;

    fn try_from(r: TransitionRepr) -> MontageResult<Self> {
        let kind = match (r.kind, r.direction, r.soft_edge) {
            (KindName::Wipe, direction, soft_edge) => TransitionKind::Wipe {
                direction: direction.unwrap_or_default(),
                soft_edge: soft_edge.unwrap_or(0.0),
            },
            (_, Some(_), _) | (_, _, Some(_)) => {
                return Err(MontageError::format(
                    "only wipe transitions take direction or softEdge",
                ));
            }
            (KindName::Crossfade, None, None) => TransitionKind::Crossfade,
            (KindName::FadeToBlack, None, None) => TransitionKind::FadeToBlack,
        };
        Ok(Self {
            kind,
            duration: r.duration,
        })
    }
}

impl From<Transition> for TransitionRepr {
    fn from(t: Transition) -> Self {
        let (kind, direction, soft_edge) = match t.kind {
            TransitionKind::Crossfade => (KindName::Crossfade, None, None),
            TransitionKind::Wipe {
                direction,
                soft_edge,
            } => (KindName::Wipe, Some(direction), Some(soft_edge)),
            TransitionKind::FadeToBlack => (KindName::FadeToBlack, None, None),
        };
        Self {
            kind,
            duration: t.duration,
            direction,
            soft_edge,
        }
    }
}

impl Transition {
    /// Validated transition.
    pub fn new(kind: TransitionKind, duration: Timestamp) -> MontageResult<Self> {
        if duration.is_negative() || duration.is_zero() {
            return Err(MontageError::validation(
                "transition duration must be positive",
            ));
        }
        if let TransitionKind::Wipe { soft_edge, .. } = kind
            && !(0.0..=1.0).contains(&soft_edge)
        {
            return Err(MontageError::validation(
                "wipe soft edge must be in [0, 1]",
            ));
        }
        Ok(Self { kind, duration })
    }

    /// Progress in `[0, 1]` given the time remaining until the clip ends.
    ///
    /// Returns `None` while the transition is not yet active.
    pub fn progress(&self, remaining: Timestamp) -> Option<f32> {
        if remaining > self.duration || remaining.is_negative() {
            return None;
        }
        let p = 1.0 - remaining.ratio(self.duration);
        Some(p.clamp(0.0, 1.0) as f32)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/transitions.rs"]
mod tests;

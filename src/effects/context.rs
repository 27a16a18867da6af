use crate::foundation::core::{Fps, Size};
use crate::foundation::time::Timestamp;

/// Per-call inputs an effect may read besides the frame and clip-local time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderContext {
    /// Output canvas size of the timeline.
    pub canvas: Size,
    /// Timeline frame rate.
    pub fps: Fps,
    /// Absolute presentation timestamp being rendered.
    pub time: Timestamp,
    /// Duration of the clip the effect is attached to.
    pub clip_duration: Timestamp,
    /// Deterministic seed for procedural effects.
    pub seed: u64,
}

impl RenderContext {
    /// Context for rendering at absolute `time`.
    pub fn new(canvas: Size, fps: Fps, time: Timestamp) -> Self {
        Self {
            canvas,
            fps,
            time,
            clip_duration: Timestamp::ZERO,
            seed: 0,
        }
    }

    /// Copy with the attached clip's duration.
    pub fn with_clip_duration(mut self, clip_duration: Timestamp) -> Self {
        self.clip_duration = clip_duration;
        self
    }

    /// Copy with a procedural seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Normalized clip progress of clip-local `elapsed`, clamped to `[0, 1]`.
    pub fn clip_progress(&self, elapsed: Timestamp) -> f64 {
        if self.clip_duration.is_zero() {
            return 0.0;
        }
        elapsed.ratio(self.clip_duration).clamp(0.0, 1.0)
    }
}

//! Per-frame timeline composition.
//!
//! Tracks stack bottom to top in declared order; within a track, later clips land on top of
//! earlier ones. Each clip is resolved, fitted into its frame, run through its effect chain,
//! then composited with its opacity. Track opacity applies when the track layer reaches the
//! canvas. The result always has exactly the timeline's size.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{trace, warn};
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::assets::resolver::AssetResolver;
use crate::assets::text::{BlockTextRasterizer, TextRasterizer};
use crate::effects::composite::{crossfade_frames, over_at, wipe_frames};
use crate::effects::context::RenderContext;
use crate::effects::effect::apply_chain;
use crate::effects::transitions::TransitionKind;
use crate::foundation::core::{Color, Size};
use crate::foundation::error::MontageResult;
use crate::foundation::time::Timestamp;
use crate::render::fit::fit_into;
use crate::render::frame::FrameRGBA;
use crate::render::shape::render_shape;
use crate::render::text::render_text;
use crate::scene::media::MediaItem;
use crate::scene::model::{Clip, Timeline, Track, TrackType};

const SEED: u64 = 0x6d6f_6e74_6167_6521;

/// Compositor configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompositorOpts {
    /// Propagate clip failures instead of rendering the clip blank.
    pub strict: bool,
}

impl CompositorOpts {
    /// Set whether clip failures abort composition.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Stateless function from `(timeline, timestamp)` to one output frame.
#[derive(Clone)]
pub struct Compositor {
    resolver: Arc<dyn AssetResolver>,
    text: Arc<dyn TextRasterizer>,
    opts: CompositorOpts,
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

/// A clip raster positioned on the canvas.
struct Placed {
    raster: FrameRGBA,
    x: i64,
    y: i64,
    opacity: f32,
}

impl Compositor {
    /// Compositor using [`BlockTextRasterizer`] for text until another is supplied.
    pub fn new(resolver: Arc<dyn AssetResolver>) -> Self {
        Self {
            resolver,
            text: Arc::new(BlockTextRasterizer),
            opts: CompositorOpts::default(),
        }
    }

    /// Replace the text layout collaborator.
    pub fn with_text_rasterizer(mut self, text: Arc<dyn TextRasterizer>) -> Self {
        self.text = text;
        self
    }

    /// Replace the compositor options.
    pub fn with_opts(mut self, opts: CompositorOpts) -> Self {
        self.opts = opts;
        self
    }

    /// Current options.
    pub fn opts(&self) -> CompositorOpts {
        self.opts
    }

    /// Asset resolver shared with the audio mixer during export.
    pub fn resolver(&self) -> &dyn AssetResolver {
        self.resolver.as_ref()
    }

    /// Compose the frame presented at absolute time `t`.
    ///
    /// Deterministic: the same timeline and `t` always yield identical pixels.
    #[tracing::instrument(level = "trace", skip_all, fields(timeline = %timeline.id, t = %t))]
    pub async fn compose(&self, timeline: &Timeline, t: Timestamp) -> MontageResult<FrameRGBA> {
        let size = timeline.size;
        let mut canvas = FrameRGBA::filled(size, timeline.background_color.to_premul());

        for track in timeline
            .tracks()
            .iter()
            .filter(|tr| tr.is_enabled && tr.is_visual())
        {
            let active: SmallVec<[(usize, &Clip); 4]> = track.active_at(t).collect();
            if active.is_empty() {
                continue;
            }

            if track.track_type == TrackType::Effect {
                for (_, clip) in active {
                    let elapsed = t - clip.time_range.start();
                    let ctx = self.context(timeline, clip, t);
                    match apply_chain(&clip.effects, &canvas, elapsed, &ctx) {
                        Ok(adjusted) => canvas = adjusted,
                        Err(e) if !self.opts.strict => {
                            warn!(clip = %clip.id, track = %track.id, error = %e, "adjustment layer failed, skipping");
                        }
                        Err(e) => return Err(e),
                    }
                }
                continue;
            }

            let mut layer = FrameRGBA::transparent(size);
            for (idx, clip) in active {
                if idx > 0 && hands_over(&track.clips[idx - 1], t) {
                    // already drawn inside the outgoing clip's transition
                    continue;
                }
                match self.render_clip(timeline, track, idx, clip, t).await {
                    Ok(Some(p)) => over_at(&mut layer, &p.raster, p.x, p.y, p.opacity),
                    Ok(None) => {}
                    Err(e) if !self.opts.strict => {
                        warn!(clip = %clip.id, track = %track.id, error = %e, "clip failed, rendering blank");
                    }
                    Err(e) => return Err(e),
                }
            }
            over_at(&mut canvas, &layer, 0, 0, track.opacity.unwrap_or(1.0));
        }

        trace!("composed");
        Ok(canvas.cropped_to(size))
    }

    fn context(&self, timeline: &Timeline, clip: &Clip, t: Timestamp) -> RenderContext {
        RenderContext::new(timeline.size, timeline.frame_rate, t)
            .with_clip_duration(clip.time_range.duration())
            .with_seed(xxh3_64_with_seed(clip.id.as_bytes(), SEED))
    }

    /// Render one clip, blending into the next clip of the track while its transition runs.
    async fn render_clip(
        &self,
        timeline: &Timeline,
        track: &Track,
        idx: usize,
        clip: &Clip,
        t: Timestamp,
    ) -> MontageResult<Option<Placed>> {
        let elapsed = t - clip.time_range.start();
        let own = self.clip_raster(timeline, clip, t, elapsed).await?;

        let Some(transition) = clip.transition else {
            return Ok(own);
        };
        let Some(progress) = transition.progress(clip.time_range.end() - t) else {
            return Ok(own);
        };

        let size = timeline.size;
        let outgoing = flatten(own, size);
        let incoming = match track.clips.get(idx + 1) {
            Some(next) => {
                // The incoming clip is sampled at its own local time, held at its first frame
                // until it starts.
                let next_elapsed = (t - next.time_range.start()).max(Timestamp::ZERO);
                let placed = self.clip_raster(timeline, next, t, next_elapsed).await?;
                flatten(placed, size)
            }
            None => FrameRGBA::transparent(size),
        };

        let blended = blend_transition(outgoing, &incoming, transition.kind, progress)?;
        Ok(Some(Placed {
            raster: blended,
            x: 0,
            y: 0,
            opacity: 1.0,
        }))
    }

    /// Resolve, fit and apply effects for `clip` at clip-local `elapsed`.
    async fn clip_raster(
        &self,
        timeline: &Timeline,
        clip: &Clip,
        t: Timestamp,
        elapsed: Timestamp,
    ) -> MontageResult<Option<Placed>> {
        if !clip.media_item.renders_at(elapsed) {
            return Ok(None);
        }
        let target = Size::new(
            clip.frame.width.round().max(0.0) as u32,
            clip.frame.height.round().max(0.0) as u32,
        );
        if target.is_empty() {
            return Ok(None);
        }

        let raster = match &clip.media_item {
            MediaItem::Image(_) | MediaItem::Video(_) => {
                let source = self.resolver.frame(&clip.media_item, elapsed).await?;
                fit_into(&source, target, clip.content_mode)
            }
            MediaItem::Text(text) => render_text(text, elapsed, target, self.text.as_ref())?,
            MediaItem::Shape(shape) => render_shape(shape, target),
            MediaItem::Audio(_) => return Ok(None),
        };

        let ctx = self.context(timeline, clip, t);
        let raster = apply_chain(&clip.effects, &raster, elapsed, &ctx)?;
        Ok(Some(Placed {
            raster,
            x: clip.frame.x.round() as i64,
            y: clip.frame.y.round() as i64,
            opacity: clip.opacity,
        }))
    }
}

/// Whether `clip` is active at `t` and transitioning into its successor.
fn hands_over(clip: &Clip, t: Timestamp) -> bool {
    clip.time_range.contains(t)
        && clip
            .transition
            .is_some_and(|tr| tr.progress(clip.time_range.end() - t).is_some())
}

/// Draw a placed raster onto a transparent canvas-sized frame.
fn flatten(placed: Option<Placed>, size: Size) -> FrameRGBA {
    let mut out = FrameRGBA::transparent(size);
    if let Some(p) = placed {
        over_at(&mut out, &p.raster, p.x, p.y, p.opacity);
    }
    out
}

/// Blend `a` toward `b` at `progress` in `[0, 1]`.
fn blend_transition(
    mut a: FrameRGBA,
    b: &FrameRGBA,
    kind: TransitionKind,
    progress: f32,
) -> MontageResult<FrameRGBA> {
    match kind {
        TransitionKind::Crossfade => crossfade_frames(&mut a, b, progress)?,
        TransitionKind::Wipe {
            direction,
            soft_edge,
        } => wipe_frames(&mut a, b, direction, soft_edge, progress)?,
        TransitionKind::FadeToBlack => {
            let black = FrameRGBA::filled(a.size(), Color::BLACK.to_premul());
            if progress < 0.5 {
                crossfade_frames(&mut a, &black, progress * 2.0)?;
            } else {
                a = black;
                crossfade_frames(&mut a, b, progress * 2.0 - 1.0)?;
            }
        }
    }
    Ok(a)
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;

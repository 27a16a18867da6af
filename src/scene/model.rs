//! Clips, tracks and the timeline document.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::effects::effect::Effect;
use crate::effects::transitions::Transition;
use crate::foundation::core::{Color, Fps, Rect, Size};
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::time::{TimeRange, Timestamp};
use crate::scene::media::MediaItem;

/// How a source raster is mapped into a clip's frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentMode {
    /// Stretch to the frame, ignoring aspect ratio.
    ScaleToFill,
    /// Fit entirely inside the frame, letterboxing the rest.
    #[default]
    AspectFit,
    /// Cover the frame, cropping overflow.
    AspectFill,
}

/// Spatial placement of a clip on the output canvas, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClipFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ClipFrame {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Frame covering the whole canvas.
    pub fn full(size: Size) -> Self {
        Self::new(0.0, 0.0, f64::from(size.width), f64::from(size.height))
    }

    pub fn to_rect(self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

/// One positioned, timed, effected instance of a media item.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Clip {
    pub id: String,
    pub media_item: MediaItem,
    pub time_range: TimeRange,
    pub frame: ClipFrame,
    #[serde(default)]
    pub content_mode: ContentMode,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default = "one")]
    pub opacity: f32,
    /// Handover into the next clip of the same track.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
}

fn one() -> f32 {
    1.0
}

impl Clip {
    /// Opaque clip without effects, fitted with [`ContentMode::AspectFit`].
    pub fn new(
        id: impl Into<String>,
        media_item: MediaItem,
        time_range: TimeRange,
        frame: ClipFrame,
    ) -> Self {
        Self {
            id: id.into(),
            media_item,
            time_range,
            frame,
            content_mode: ContentMode::AspectFit,
            effects: Vec::new(),
            opacity: 1.0,
            transition: None,
        }
    }

    pub fn with_content_mode(mut self, content_mode: ContentMode) -> Self {
        self.content_mode = content_mode;
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transition = Some(transition);
        self
    }

    /// Clip-local time for absolute `t`, or `None` when the clip is not active.
    pub fn elapsed_at(&self, t: Timestamp) -> Option<Timestamp> {
        self.time_range
            .contains(t)
            .then(|| t - self.time_range.start())
    }

    fn validate(&self) -> MontageResult<()> {
        if self.id.trim().is_empty() {
            return Err(MontageError::validation("clip id must be non-empty"));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(MontageError::validation(format!(
                "clip '{}' opacity must be in [0, 1]",
                self.id
            )));
        }
        if !(self.frame.width >= 0.0 && self.frame.height >= 0.0) {
            return Err(MontageError::validation(format!(
                "clip '{}' frame must have non-negative size",
                self.id
            )));
        }
        if let Some(tr) = &self.transition {
            Transition::new(tr.kind, tr.duration)?;
        }
        for effect in &self.effects {
            effect.validate()?;
        }
        self.media_item.validate()
    }
}

/// What a track carries and how the compositor treats it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackType {
    Video,
    Audio,
    Overlay,
    /// Adjustment layer: clip effects apply to everything composed below.
    Effect,
}

/// Ordered clips of one kind.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Track {
    pub id: String,
    pub track_type: TrackType,
    #[serde(default)]
    pub clips: Vec<Clip>,
    #[serde(default = "enabled")]
    pub is_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
}

fn enabled() -> bool {
    true
}

impl Track {
    pub fn new(id: impl Into<String>, track_type: TrackType) -> Self {
        Self {
            id: id.into(),
            track_type,
            clips: Vec::new(),
            is_enabled: true,
            volume: None,
            opacity: None,
        }
    }

    pub fn with_clip(mut self, clip: Clip) -> Self {
        self.clips.push(clip);
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_enabled(mut self, is_enabled: bool) -> Self {
        self.is_enabled = is_enabled;
        self
    }

    /// Track volume, `1.0` when unset.
    pub fn gain(&self) -> f32 {
        self.volume.unwrap_or(1.0)
    }

    /// Latest clip end on this track.
    pub fn end(&self) -> Option<Timestamp> {
        self.clips.iter().map(|c| c.time_range.end()).max()
    }

    /// Clips active at `t` in declared order, paired with their index.
    pub fn active_at(&self, t: Timestamp) -> impl Iterator<Item = (usize, &Clip)> {
        self.clips
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.time_range.contains(t))
    }

    /// Return `true` if the track contributes pixels.
    pub fn is_visual(&self) -> bool {
        self.track_type != TrackType::Audio
    }

    fn validate(&self) -> MontageResult<()> {
        let unit = |v: Option<f32>| v.is_none_or(|v| (0.0..=1.0).contains(&v));
        if !unit(self.volume) || !unit(self.opacity) {
            return Err(MontageError::validation(format!(
                "track '{}' volume and opacity must be in [0, 1]",
                self.id
            )));
        }
        for clip in &self.clips {
            clip.validate()?;
        }
        Ok(())
    }
}

/// Top-level composition.
///
/// `duration` is cached; mutate tracks only through [`Timeline::tracks_mut`], which resets it.
/// The exporter borrows a timeline for the whole export, so it cannot change mid-render.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Timeline {
    pub id: String,
    tracks: Vec<Track>,
    pub size: Size,
    pub frame_rate: Fps,
    #[serde(default = "black")]
    pub background_color: Color,
    #[serde(skip)]
    duration: OnceLock<Timestamp>,
}

fn black() -> Color {
    Color::BLACK
}

impl Timeline {
    pub fn new(id: impl Into<String>, size: Size, frame_rate: Fps) -> Self {
        Self {
            id: id.into(),
            tracks: Vec::new(),
            size,
            frame_rate,
            background_color: Color::BLACK,
            duration: OnceLock::new(),
        }
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks_mut().push(track);
        self
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Mutable access to the track list; invalidates the cached duration.
    pub fn tracks_mut(&mut self) -> &mut Vec<Track> {
        self.duration = OnceLock::new();
        &mut self.tracks
    }

    /// Latest clip end across enabled tracks; zero for an empty timeline.
    pub fn duration(&self) -> Timestamp {
        *self.duration.get_or_init(|| {
            self.tracks
                .iter()
                .filter(|t| t.is_enabled)
                .filter_map(Track::end)
                .max()
                .unwrap_or(Timestamp::ZERO)
        })
    }

    /// Number of video frames covering the duration.
    pub fn total_frames(&self) -> u64 {
        self.duration().frames_floor(self.frame_rate)
    }

    pub fn validate(&self) -> MontageResult<()> {
        if self.size.is_empty() {
            return Err(MontageError::validation("timeline size must be non-zero"));
        }
        Fps::new(self.frame_rate.num, self.frame_rate.den)?;
        for track in &self.tracks {
            track.validate()?;
        }
        Ok(())
    }

    /// Parse and validate a timeline document.
    pub fn from_json_str(s: &str) -> MontageResult<Self> {
        let timeline: Self = serde_json::from_str(s)?;
        timeline
            .validate()
            .map_err(|e| MontageError::format(e.to_string()))?;
        Ok(timeline)
    }

    /// Read a timeline document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> MontageResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read timeline {}", path.display()))
            .map_err(|e| MontageError::invalid_file(format!("{e:#}")))?;
        Self::from_json_str(&s)
    }

    /// Pretty JSON in declared field order.
    pub fn to_json_string(&self) -> MontageResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;

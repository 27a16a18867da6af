//! Asset resolution interface and an in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::audio::pcm::PcmBuffer;
use crate::foundation::core::Fps;
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::time::{TimeRange, Timestamp};
use crate::render::frame::FrameRGBA;
use crate::scene::media::MediaItem;

/// Produces source rasters and PCM for resolver-backed media items.
///
/// Implementations may perform blocking or async IO. Failures surface as
/// [`MontageError::SourceUnavailable`] or [`MontageError::InvalidFile`].
#[async_trait]
pub trait AssetResolver: Send + Sync {
    /// Raster of an image or video item at clip-local `elapsed`.
    async fn frame(&self, item: &MediaItem, elapsed: Timestamp) -> MontageResult<FrameRGBA>;

    /// PCM of an audio or video item over the clip-local `window`.
    ///
    /// The buffer is in the source's native format and may be shorter than the window.
    async fn audio(&self, item: &MediaItem, window: TimeRange) -> MontageResult<PcmBuffer>;
}

#[derive(Clone, Debug)]
struct VideoFrames {
    fps: Fps,
    frames: Vec<Arc<FrameRGBA>>,
}

/// Resolver backed by preloaded rasters, frame sequences and PCM keyed by asset reference.
#[derive(Clone, Debug, Default)]
pub struct MemoryAssetResolver {
    images: HashMap<String, Arc<FrameRGBA>>,
    videos: HashMap<String, VideoFrames>,
    audio: HashMap<String, Arc<PcmBuffer>>,
}

impl MemoryAssetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, key: impl Into<String>, frame: FrameRGBA) -> Self {
        self.images.insert(key.into(), Arc::new(frame));
        self
    }

    /// Register a frame sequence played back at `fps`; the last frame holds past the end.
    pub fn with_video(mut self, key: impl Into<String>, fps: Fps, frames: Vec<FrameRGBA>) -> Self {
        self.videos.insert(
            key.into(),
            VideoFrames {
                fps,
                frames: frames.into_iter().map(Arc::new).collect(),
            },
        );
        self
    }

    pub fn with_audio(mut self, key: impl Into<String>, pcm: PcmBuffer) -> Self {
        self.audio.insert(key.into(), Arc::new(pcm));
        self
    }

    fn missing(item: &MediaItem) -> MontageError {
        MontageError::source_unavailable(format!(
            "no {} asset registered for '{}'",
            item.kind_name(),
            item.asset_ref().unwrap_or("<inline>")
        ))
    }
}

#[async_trait]
impl AssetResolver for MemoryAssetResolver {
    async fn frame(&self, item: &MediaItem, elapsed: Timestamp) -> MontageResult<FrameRGBA> {
        match item {
            MediaItem::Image(img) => self
                .images
                .get(&img.raster_ref)
                .map(|f| f.as_ref().clone())
                .ok_or_else(|| Self::missing(item)),
            MediaItem::Video(v) => {
                let video = self
                    .videos
                    .get(&v.source_ref)
                    .ok_or_else(|| Self::missing(item))?;
                let last = video.frames.len().checked_sub(1).ok_or_else(|| {
                    MontageError::source_unavailable(format!(
                        "video '{}' has no frames",
                        v.source_ref
                    ))
                })?;
                let idx = (elapsed.frames_floor(video.fps) as usize).min(last);
                Ok(video.frames[idx].as_ref().clone())
            }
            _ => Err(MontageError::source_unavailable(format!(
                "{} items are not resolver-backed rasters",
                item.kind_name()
            ))),
        }
    }

    async fn audio(&self, item: &MediaItem, window: TimeRange) -> MontageResult<PcmBuffer> {
        let key = match item {
            MediaItem::Audio(a) => &a.source_ref,
            MediaItem::Video(v) => &v.source_ref,
            _ => {
                return Err(MontageError::source_unavailable(format!(
                    "{} items carry no audio",
                    item.kind_name()
                )));
            }
        };
        let pcm = self.audio.get(key).ok_or_else(|| Self::missing(item))?;
        let rate = pcm.format.sample_rate;
        let start = window.start().samples_round(rate).max(0) as usize;
        let len = window.duration().samples_round(rate).max(0) as usize;
        Ok(pcm.slice_frames(start, len))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/resolver.rs"]
mod tests;

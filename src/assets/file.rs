//! Filesystem-backed asset resolver.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;

use crate::assets::decode::decode_image;
use crate::assets::media::{VideoProbe, decode_audio_window, decode_video_frame, probe_video};
use crate::assets::resolver::AssetResolver;
use crate::audio::pcm::{AudioFormat, PcmBuffer};
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::time::{TimeRange, Timestamp};
use crate::render::frame::FrameRGBA;
use crate::scene::media::MediaItem;

/// Resolves asset references as paths relative to a root directory.
///
/// Images are decoded once and cached; video frames and audio windows are decoded on demand
/// through `ffmpeg` (feature `media-ffmpeg`). Decoding runs on tokio's blocking pool.
#[derive(Debug)]
pub struct FileAssetResolver {
    root: PathBuf,
    audio_format: AudioFormat,
    images: Mutex<HashMap<String, Arc<FrameRGBA>>>,
    probes: Mutex<HashMap<String, Arc<VideoProbe>>>,
}

impl FileAssetResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            audio_format: AudioFormat::STEREO_48K,
            images: Mutex::new(HashMap::new()),
            probes: Mutex::new(HashMap::new()),
        }
    }

    /// Format audio is decoded into.
    pub fn with_audio_format(mut self, format: AudioFormat) -> Self {
        self.audio_format = format;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `reference` against the root, rejecting absolute paths and `..` escapes.
    pub fn resolve_path(&self, reference: &str) -> MontageResult<PathBuf> {
        let rel = Path::new(reference);
        if rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(MontageError::source_unavailable(format!(
                "asset reference '{reference}' must be relative to the asset root"
            )));
        }
        Ok(self.root.join(rel))
    }

    async fn image(&self, reference: &str) -> MontageResult<Arc<FrameRGBA>> {
        let cached = lock(&self.images)?.get(reference).cloned();
        if let Some(hit) = cached {
            return Ok(hit);
        }
        let path = self.resolve_path(reference)?;
        let frame = blocking(move || {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("read image {}", path.display()))
                .map_err(|e| MontageError::source_unavailable(format!("{e:#}")))?;
            decode_image(&bytes)
        })
        .await?;
        let frame = Arc::new(frame);
        lock(&self.images)?.insert(reference.to_string(), frame.clone());
        Ok(frame)
    }

    async fn probe(&self, reference: &str) -> MontageResult<Arc<VideoProbe>> {
        let cached = lock(&self.probes)?.get(reference).cloned();
        if let Some(hit) = cached {
            return Ok(hit);
        }
        let path = self.resolve_path(reference)?;
        let probe = Arc::new(blocking(move || probe_video(&path)).await?);
        lock(&self.probes)?.insert(reference.to_string(), probe.clone());
        Ok(probe)
    }
}

fn lock<T>(m: &Mutex<T>) -> MontageResult<std::sync::MutexGuard<'_, T>> {
    m.lock()
        .map_err(|_| MontageError::source_unavailable("asset cache lock poisoned"))
}

async fn blocking<T, F>(f: F) -> MontageResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> MontageResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| MontageError::source_unavailable(format!("decode task failed: {e}")))?
}

#[async_trait]
impl AssetResolver for FileAssetResolver {
    async fn frame(&self, item: &MediaItem, elapsed: Timestamp) -> MontageResult<FrameRGBA> {
        match item {
            MediaItem::Image(img) => Ok(self.image(&img.raster_ref).await?.as_ref().clone()),
            MediaItem::Video(v) => {
                let probe = self.probe(&v.source_ref).await?;
                let t = elapsed.seconds_f64();
                blocking(move || decode_video_frame(&probe, t)).await
            }
            _ => Err(MontageError::source_unavailable(format!(
                "{} items are not file-backed rasters",
                item.kind_name()
            ))),
        }
    }

    async fn audio(&self, item: &MediaItem, window: TimeRange) -> MontageResult<PcmBuffer> {
        let reference = match item {
            MediaItem::Audio(a) => &a.source_ref,
            MediaItem::Video(v) => &v.source_ref,
            _ => {
                return Err(MontageError::source_unavailable(format!(
                    "{} items carry no audio",
                    item.kind_name()
                )));
            }
        };
        let path = self.resolve_path(reference)?;
        let format = self.audio_format;
        let (start, dur) = (
            window.start().seconds_f64(),
            window.duration().seconds_f64(),
        );
        blocking(move || decode_audio_window(&path, format, start, dur)).await
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/file.rs"]
mod tests;

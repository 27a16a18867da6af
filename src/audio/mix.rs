//! Windowed multi-track audio mixing.

use tracing::warn;

use crate::assets::resolver::AssetResolver;
use crate::audio::pcm::{AudioFormat, PcmBuffer};
use crate::foundation::error::MontageResult;
use crate::foundation::time::{TimeRange, Timestamp};
use crate::scene::model::{Track, TrackType};

struct Contribution {
    offset: Timestamp,
    length: Timestamp,
    gain: f32,
    pcm: PcmBuffer,
}

/// Stateless mixer from (audio tracks, time window) to one PCM buffer.
#[derive(Clone, Copy, Debug, Default)]
pub struct AudioMixer;

impl AudioMixer {
    /// Mix every enabled audio track's clips overlapping `window`.
    ///
    /// With `format == None` the output takes the format of the first source that yields
    /// samples; later sources are resampled and remapped to match. Returns `None` when nothing
    /// contributes, in which case the caller substitutes silence. Sums are not clamped.
    /// Sources that fail to resolve are logged and treated as silence.
    pub async fn mix(
        &self,
        tracks: &[Track],
        window: TimeRange,
        format: Option<AudioFormat>,
        resolver: &dyn AssetResolver,
    ) -> MontageResult<Option<PcmBuffer>> {
        let mut contributions = Vec::new();
        for track in tracks
            .iter()
            .filter(|t| t.is_enabled && t.track_type == TrackType::Audio)
        {
            for clip in &track.clips {
                let Some(overlap) = clip.time_range.intersect(window) else {
                    continue;
                };
                if overlap.is_empty() {
                    continue;
                }
                let local = overlap.shifted(Timestamp::ZERO - clip.time_range.start());
                let pcm = match resolver.audio(&clip.media_item, local).await {
                    Ok(pcm) => pcm,
                    Err(e) => {
                        warn!(clip = %clip.id, track = %track.id, error = %e, "audio source unavailable, mixing silence");
                        continue;
                    }
                };
                if pcm.is_empty() {
                    continue;
                }
                contributions.push(Contribution {
                    offset: overlap.start() - window.start(),
                    length: overlap.duration(),
                    gain: track.gain() * clip.opacity,
                    pcm,
                });
            }
        }

        let Some(format) = format.or_else(|| contributions.first().map(|c| c.pcm.format)) else {
            return Ok(None);
        };
        if contributions.is_empty() {
            return Ok(None);
        }

        let rate = format.sample_rate;
        let frames = window.duration().samples_round(rate).max(0) as usize;
        let mut out = PcmBuffer::silence(format, frames);
        for c in contributions {
            let offset = c.offset.samples_round(rate).max(0) as usize;
            let len = c.length.samples_round(rate).max(0) as usize;
            let src = c.pcm.converted_to(format, len);
            out.mix_in(&src, offset, c.gain)?;
        }
        Ok(Some(out))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;

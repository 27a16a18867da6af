//! Export configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::pcm::AudioFormat;
use crate::foundation::core::Fps;
use crate::foundation::error::{MontageError, MontageResult};

/// Video stream options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VideoSettings {
    /// Output frame rate; the timeline's own rate when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<Fps>,
}

impl VideoSettings {
    pub fn with_frame_rate(mut self, fps: Fps) -> Self {
        self.frame_rate = Some(fps);
        self
    }
}

/// Audio stream options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,
    /// Sample frames per mixing window.
    pub window_samples: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: AudioFormat::STEREO_48K.sample_rate,
            channels: AudioFormat::STEREO_48K.channels,
            window_samples: 4096,
        }
    }
}

impl AudioSettings {
    pub fn format(&self) -> MontageResult<AudioFormat> {
        AudioFormat::new(self.sample_rate, self.channels)
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.sample_rate = format.sample_rate;
        self.channels = format.channels;
        self
    }

    pub fn with_window_samples(mut self, n: u32) -> Self {
        self.window_samples = n;
        self
    }
}

/// Settings for one export run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ExportSettings {
    pub video: VideoSettings,
    /// `None` exports a silent, video-only stream.
    pub audio: Option<AudioSettings>,
    /// Sleep between readiness polls while the sink applies backpressure.
    pub poll_interval_ms: u64,
    /// Buffered progress events per subscriber before old ones are dropped.
    pub progress_capacity: usize,
    /// Peak limiter applied to each mixed window when set.
    pub limiter_ceiling: Option<f32>,
    /// Flatten frames over the timeline background before hand-off.
    pub background_flatten: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            video: VideoSettings::default(),
            audio: Some(AudioSettings::default()),
            poll_interval_ms: 2,
            progress_capacity: 64,
            limiter_ceiling: None,
            background_flatten: true,
        }
    }
}

impl ExportSettings {
    pub fn with_video(mut self, video: VideoSettings) -> Self {
        self.video = video;
        self
    }

    pub fn with_audio(mut self, audio: Option<AudioSettings>) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_progress_capacity(mut self, capacity: usize) -> Self {
        self.progress_capacity = capacity;
        self
    }

    pub fn with_limiter_ceiling(mut self, ceiling: Option<f32>) -> Self {
        self.limiter_ceiling = ceiling;
        self
    }

    pub fn with_background_flatten(mut self, flatten: bool) -> Self {
        self.background_flatten = flatten;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn from_json_str(s: &str) -> MontageResult<Self> {
        let settings: Self = serde_json::from_str(s)?;
        settings
            .validate()
            .map_err(|e| MontageError::format(e.to_string()))?;
        Ok(settings)
    }

    pub fn validate(&self) -> MontageResult<()> {
        if let Some(fps) = self.video.frame_rate {
            Fps::new(fps.num, fps.den)?;
        }
        if let Some(audio) = self.audio {
            audio.format()?;
            if audio.window_samples == 0 {
                return Err(MontageError::validation("audio window must hold at least one sample"));
            }
        }
        if self.progress_capacity == 0 {
            return Err(MontageError::validation("progress capacity must be > 0"));
        }
        if let Some(c) = self.limiter_ceiling
            && !(c > 0.0 && c.is_finite())
        {
            return Err(MontageError::validation("limiter ceiling must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/settings.rs"]
mod tests;

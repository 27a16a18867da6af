//! Interleaved `f32` PCM buffers and format conversion.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::time::Timestamp;

/// Sample rate and channel layout of a PCM stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    /// 48 kHz stereo.
    pub const STEREO_48K: Self = Self {
        sample_rate: 48_000,
        channels: 2,
    };

    pub fn new(sample_rate: u32, channels: u16) -> MontageResult<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(MontageError::validation(
                "audio format needs sample_rate > 0 and channels > 0",
            ));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::STEREO_48K
    }
}

/// Interleaved PCM in `[-1, 1]` nominal range (not clamped).
#[derive(Clone, Debug, PartialEq)]
pub struct PcmBuffer {
    pub format: AudioFormat,
    pub samples: Vec<f32>,
}

impl PcmBuffer {
    pub fn new(format: AudioFormat, samples: Vec<f32>) -> MontageResult<Self> {
        if !samples.len().is_multiple_of(usize::from(format.channels)) {
            return Err(MontageError::validation(
                "pcm sample count must be a multiple of the channel count",
            ));
        }
        Ok(Self { format, samples })
    }

    /// `frames` sample frames of silence.
    pub fn silence(format: AudioFormat, frames: usize) -> Self {
        Self {
            format,
            samples: vec![0.0; frames * usize::from(format.channels)],
        }
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.format.channels.max(1))
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Exact playback duration.
    pub fn duration(&self) -> Timestamp {
        Timestamp::from_sample(self.frames() as u64, self.format.sample_rate)
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    /// Copy of frames `[start, start + len)`, shorter if the buffer ends first.
    pub fn slice_frames(&self, start: usize, len: usize) -> Self {
        let ch = usize::from(self.format.channels);
        let begin = (start * ch).min(self.samples.len());
        let end = ((start + len) * ch).min(self.samples.len());
        Self {
            format: self.format,
            samples: self.samples[begin..end].to_vec(),
        }
    }

    /// Copy truncated to at most `frames` sample frames.
    pub fn truncated(mut self, frames: usize) -> Self {
        self.samples
            .truncate(frames * usize::from(self.format.channels));
        self
    }

    /// Copy converted to `format` (resample first, then channel layout).
    pub fn converted(&self, format: AudioFormat) -> Self {
        if self.format == format {
            return self.clone();
        }
        self.resampled(format.sample_rate)
            .with_channels(format.channels)
    }

    /// Like [`PcmBuffer::converted`], but sized for a span of exactly `frames` output frames.
    ///
    /// A resampled slice covers a fractional number of output frames; the tail frame is
    /// interpolated against the last source frame instead of being dropped.
    pub fn converted_to(&self, format: AudioFormat, frames: usize) -> Self {
        let src_rate = self.format.sample_rate;
        let rated = if src_rate == format.sample_rate {
            self.clone()
        } else {
            let exact = self.frames() as u128 * u128::from(format.sample_rate);
            let covered = exact.div_ceil(u128::from(src_rate)) as usize;
            // a source slice rounded to whole frames may fall short by up to one source frame
            let slack = format.sample_rate.div_ceil(src_rate) as usize;
            let out = if covered.saturating_add(slack) >= frames {
                frames
            } else {
                covered
            };
            self.resample_frames(format.sample_rate, out)
        };
        rated.with_channels(format.channels).truncated(frames)
    }

    /// Linear-interpolation resample to `rate`.
    pub fn resampled(&self, rate: u32) -> Self {
        let out_frames = ((self.frames() as u128 * u128::from(rate))
            / u128::from(self.format.sample_rate)) as usize;
        self.resample_frames(rate, out_frames)
    }

    fn resample_frames(&self, rate: u32, out_frames: usize) -> Self {
        let src_rate = self.format.sample_rate;
        let format = AudioFormat {
            sample_rate: rate,
            channels: self.format.channels,
        };
        if src_rate == rate || self.samples.is_empty() {
            return Self {
                format,
                samples: self.samples.clone(),
            };
        }
        let ch = usize::from(self.format.channels);
        let last = self.frames() - 1;
        let step = f64::from(src_rate) / f64::from(rate);
        let mut samples = Vec::with_capacity(out_frames * ch);
        for i in 0..out_frames {
            let pos = i as f64 * step;
            let f0 = (pos.floor() as usize).min(last);
            let f1 = (f0 + 1).min(last);
            let frac = (pos - f0 as f64).clamp(0.0, 1.0) as f32;
            for c in 0..ch {
                let v0 = self.samples[f0 * ch + c];
                let v1 = self.samples[f1 * ch + c];
                samples.push(v0 + (v1 - v0) * frac);
            }
        }
        Self { format, samples }
    }

    /// Copy remapped to `channels`: mono is duplicated upward, extra channels are averaged
    /// down into the target layout.
    pub fn with_channels(&self, channels: u16) -> Self {
        let src_ch = usize::from(self.format.channels);
        let dst_ch = usize::from(channels);
        if src_ch == dst_ch {
            return self.clone();
        }
        let frames = self.frames();
        let mut samples = vec![0.0f32; frames * dst_ch];
        for f in 0..frames {
            let src = &self.samples[f * src_ch..(f + 1) * src_ch];
            let dst = &mut samples[f * dst_ch..(f + 1) * dst_ch];
            if src_ch < dst_ch {
                for (c, d) in dst.iter_mut().enumerate() {
                    *d = src[c % src_ch];
                }
            } else {
                let mut counts = vec![0u32; dst_ch];
                for (c, s) in src.iter().enumerate() {
                    dst[c % dst_ch] += s;
                    counts[c % dst_ch] += 1;
                }
                for (d, n) in dst.iter_mut().zip(counts) {
                    *d /= n.max(1) as f32;
                }
            }
        }
        Self {
            format: AudioFormat {
                sample_rate: self.format.sample_rate,
                channels,
            },
            samples,
        }
    }

    /// Add `src * gain` starting at frame `offset`; both buffers must share a format.
    ///
    /// Samples past the end of `self` are dropped.
    pub fn mix_in(&mut self, src: &PcmBuffer, offset: usize, gain: f32) -> MontageResult<()> {
        if src.format != self.format {
            return Err(MontageError::validation(format!(
                "cannot mix {:?} into {:?}",
                src.format, self.format
            )));
        }
        let ch = usize::from(self.format.channels);
        let start = (offset * ch).min(self.samples.len());
        for (d, s) in self.samples[start..].iter_mut().zip(&src.samples) {
            *d += s * gain;
        }
        Ok(())
    }

    /// Scale the whole buffer so its peak does not exceed `ceiling`.
    pub fn limit_peak(&mut self, ceiling: f32) {
        let peak = self.peak();
        if ceiling <= 0.0 || peak <= ceiling {
            return;
        }
        let k = ceiling / peak;
        for s in &mut self.samples {
            *s *= k;
        }
    }

    /// Little-endian `f32` bytes of the interleaved samples.
    pub fn to_f32le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * 4);
        for &s in &self.samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        bytes
    }

    /// Parse little-endian `f32` bytes.
    pub fn from_f32le_bytes(format: AudioFormat, bytes: &[u8]) -> MontageResult<Self> {
        if !bytes.len().is_multiple_of(4) {
            return Err(MontageError::invalid_file("f32le stream length is not a multiple of 4"));
        }
        let samples = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Self::new(format, samples)
    }

    /// Write raw interleaved `f32le` to `path`.
    pub fn write_f32le(&self, path: &Path) -> MontageResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create audio directory '{}'", parent.display()))?;
        }
        std::fs::write(path, self.to_f32le_bytes())
            .with_context(|| format!("write audio '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/pcm.rs"]
mod tests;

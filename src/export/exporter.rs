//! Dual-pipeline export driver.
//!
//! One video producer and one audio producer run as concurrent futures on the caller's task
//! and feed a single [`EncoderSink`]. Each loop polls the sink's readiness before every
//! hand-off, sleeping between polls, and checks the sink status and a shared abort flag every
//! iteration. Any failure in either loop aborts both; the sink is then cancelled and the first
//! error is returned.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::audio::mix::AudioMixer;
use crate::audio::pcm::{AudioFormat, PcmBuffer};
use crate::encode::sink::{EncoderSink, MediaKind, PixelBuffer, SinkConfig, SinkStatus};
use crate::export::progress::{ProgressEmitter, ProgressEvent};
use crate::export::settings::{AudioSettings, ExportSettings};
use crate::foundation::core::{Color, Fps};
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::math::unit_to_u8;
use crate::foundation::time::{TimeRange, Timestamp};
use crate::render::compositor::Compositor;
use crate::scene::model::Timeline;

/// Lifecycle of an [`Exporter`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportState {
    #[default]
    Idle,
    Writing,
    Completed,
    Failed,
}

/// How a producer loop ended without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoopEnd {
    Done(u64),
    Aborted,
}

/// Resets the busy flag when an export call returns.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives composition and mixing into an encoder sink.
///
/// Only one export may run per instance; a second concurrent call fails with
/// [`MontageError::ExportFailed`] without touching the first.
#[derive(Debug)]
pub struct Exporter {
    compositor: Compositor,
    mixer: AudioMixer,
    busy: AtomicBool,
    state: Mutex<ExportState>,
}

impl Exporter {
    pub fn new(compositor: Compositor) -> Self {
        Self {
            compositor,
            mixer: AudioMixer,
            busy: AtomicBool::new(false),
            state: Mutex::new(ExportState::Idle),
        }
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn state(&self) -> ExportState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: ExportState) {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(from = ?*st, to = ?next, "export state");
        *st = next;
    }

    fn acquire(&self) -> MontageResult<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| MontageError::export_failed("an export is already in progress"))?;
        Ok(BusyGuard(&self.busy))
    }

    /// Export without progress reporting.
    pub async fn export(
        &self,
        timeline: &Timeline,
        settings: &ExportSettings,
        sink: &dyn EncoderSink,
    ) -> MontageResult<PathBuf> {
        self.run(timeline, settings, sink, None).await
    }

    /// Export while reporting per-frame progress.
    ///
    /// A bounded channel of `settings.progress_capacity` events is created for this call and its
    /// receiver handed to `subscribe` before any frame is produced. The channel closes when the
    /// export returns.
    pub async fn export_with_progress(
        &self,
        timeline: &Timeline,
        settings: &ExportSettings,
        sink: &dyn EncoderSink,
        subscribe: impl FnOnce(broadcast::Receiver<ProgressEvent>) + Send,
    ) -> MontageResult<PathBuf> {
        let (emitter, rx) = ProgressEmitter::channel(settings.progress_capacity);
        subscribe(rx);
        self.run(timeline, settings, sink, Some(&emitter)).await
    }

    /// Render `timeline` into `sink` and return the finalized output location.
    #[tracing::instrument(level = "debug", skip_all, fields(timeline = %timeline.id))]
    async fn run(
        &self,
        timeline: &Timeline,
        settings: &ExportSettings,
        sink: &dyn EncoderSink,
        progress: Option<&ProgressEmitter>,
    ) -> MontageResult<PathBuf> {
        let _busy = self.acquire()?;
        timeline.validate()?;
        settings.validate()?;

        let fps = settings.video.frame_rate.unwrap_or(timeline.frame_rate);
        let duration = timeline.duration();
        let total_frames = duration.frames_floor(fps);
        let audio = match settings.audio {
            Some(a) => Some((a, a.format()?)),
            None => None,
        };
        info!(
            frames = total_frames,
            duration = %duration,
            fps = fps.as_f64(),
            audio = audio.is_some(),
            "export started"
        );

        self.set_state(ExportState::Writing);
        let config = SinkConfig {
            size: timeline.size,
            fps,
            audio: audio.map(|(_, f)| f),
        };
        if let Err(e) = sink.start(config) {
            error!(error = %e, "encoder sink failed to start");
            self.set_state(ExportState::Failed);
            return Err(sink_failure(sink, e));
        }

        let abort = AtomicBool::new(false);
        let poll = settings.poll_interval();
        let background = settings
            .background_flatten
            .then(|| straight_rgba8(timeline.background_color));

        let video = async {
            let r = self
                .video_loop(timeline, fps, total_frames, background, sink, poll, &abort, progress)
                .await;
            if r.is_err() {
                abort.store(true, Ordering::Release);
            }
            r
        };
        let audio_fut = async {
            let Some((a, format)) = audio else {
                return Ok(LoopEnd::Done(0));
            };
            let r = self
                .audio_loop(timeline, duration, a, format, settings.limiter_ceiling, sink, poll, &abort)
                .await;
            if r.is_err() {
                abort.store(true, Ordering::Release);
            }
            r
        };
        let (video_res, audio_res) = tokio::join!(video, audio_fut);

        let outcome = match (video_res, audio_res) {
            (Err(e), _) | (_, Err(e)) => Err(e),
            (Ok(LoopEnd::Aborted), _) | (_, Ok(LoopEnd::Aborted)) => Err(
                MontageError::export_failed("export aborted"),
            ),
            (Ok(LoopEnd::Done(frames)), Ok(LoopEnd::Done(windows))) => {
                debug!(frames, windows, "producers finished");
                sink.finish().await
            }
        };

        match outcome {
            Ok(path) => {
                self.set_state(ExportState::Completed);
                info!(out = %path.display(), frames = total_frames, "export completed");
                Ok(path)
            }
            Err(e) => {
                error!(error = %e, "export failed");
                sink.cancel();
                self.set_state(ExportState::Failed);
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn video_loop(
        &self,
        timeline: &Timeline,
        fps: Fps,
        total_frames: u64,
        background: Option<[u8; 4]>,
        sink: &dyn EncoderSink,
        poll: Duration,
        abort: &AtomicBool,
        progress: Option<&ProgressEmitter>,
    ) -> MontageResult<LoopEnd> {
        let mut buffer = PixelBuffer::new(timeline.size);
        for index in 0..total_frames {
            if abort.load(Ordering::Acquire) {
                debug!(frame = index, "video loop aborted");
                return Ok(LoopEnd::Aborted);
            }
            ensure_writing(sink)?;

            let t = Timestamp::from_frame(index, fps);
            let frame = self.compositor.compose(timeline, t).await.map_err(|e| {
                error!(frame = index, t = %t, error = %e, "frame composition failed");
                e
            })?;
            buffer.load(&frame, background)?;

            if !wait_ready(sink, MediaKind::Video, poll, abort).await? {
                return Ok(LoopEnd::Aborted);
            }
            sink.append_video(&buffer, t)
                .map_err(|e| sink_failure(sink, e))?;
            if let Some(p) = progress {
                p.emit(index + 1, total_frames);
            }
        }
        sink.mark_finished(MediaKind::Video);
        debug!(frames = total_frames, "video loop finished");
        Ok(LoopEnd::Done(total_frames))
    }

    #[allow(clippy::too_many_arguments)]
    async fn audio_loop(
        &self,
        timeline: &Timeline,
        duration: Timestamp,
        settings: AudioSettings,
        format: AudioFormat,
        limiter: Option<f32>,
        sink: &dyn EncoderSink,
        poll: Duration,
        abort: &AtomicBool,
    ) -> MontageResult<LoopEnd> {
        let rate = format.sample_rate;
        let total = duration.samples_floor(rate);
        let step = u64::from(settings.window_samples.max(1));
        let resolver = self.compositor.resolver();

        let mut start = 0u64;
        let mut windows = 0u64;
        while start < total {
            if abort.load(Ordering::Acquire) {
                debug!(sample = start, "audio loop aborted");
                return Ok(LoopEnd::Aborted);
            }
            ensure_writing(sink)?;

            let len = step.min(total - start);
            let pts = Timestamp::from_sample(start, rate);
            let window = TimeRange::from_bounds(pts, Timestamp::from_sample(start + len, rate))?;
            let frames = len as usize;
            let mut pcm = self
                .mixer
                .mix(timeline.tracks(), window, Some(format), resolver)
                .await?
                .unwrap_or_else(|| PcmBuffer::silence(format, frames));
            fit_frames(&mut pcm, frames);
            if let Some(ceiling) = limiter {
                pcm.limit_peak(ceiling);
            }

            if !wait_ready(sink, MediaKind::Audio, poll, abort).await? {
                return Ok(LoopEnd::Aborted);
            }
            sink.append_audio(&pcm, pts)
                .map_err(|e| sink_failure(sink, e))?;
            start += len;
            windows += 1;
        }
        sink.mark_finished(MediaKind::Audio);
        debug!(windows, samples = total, "audio loop finished");
        Ok(LoopEnd::Done(windows))
    }
}

/// Poll readiness until the sink accepts more data. `Ok(false)` means the export was aborted.
async fn wait_ready(
    sink: &dyn EncoderSink,
    kind: MediaKind,
    poll: Duration,
    abort: &AtomicBool,
) -> MontageResult<bool> {
    loop {
        if abort.load(Ordering::Acquire) {
            return Ok(false);
        }
        ensure_writing(sink)?;
        if sink.ready_for_more_data(kind) {
            return Ok(true);
        }
        if poll.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(poll).await;
        }
    }
}

fn ensure_writing(sink: &dyn EncoderSink) -> MontageResult<()> {
    match sink.status() {
        SinkStatus::Writing => Ok(()),
        status => Err(MontageError::export_failed(
            sink.error()
                .unwrap_or_else(|| format!("encoder sink left writing state ({status:?})")),
        )),
    }
}

/// Prefer the sink's own diagnostic over the error returned by the call.
fn sink_failure(sink: &dyn EncoderSink, e: MontageError) -> MontageError {
    match sink.error() {
        Some(msg) => MontageError::export_failed(msg),
        None => match e {
            MontageError::ExportFailed(_) => e,
            other => MontageError::export_failed(other.to_string()),
        },
    }
}

fn fit_frames(pcm: &mut PcmBuffer, frames: usize) {
    let want = frames * usize::from(pcm.format.channels);
    pcm.samples.resize(want, 0.0);
}

fn straight_rgba8(c: Color) -> [u8; 4] {
    let c = c.clamped();
    [unit_to_u8(c.red), unit_to_u8(c.green), unit_to_u8(c.blue), 255]
}

#[cfg(test)]
#[path = "../../tests/unit/export/exporter.rs"]
mod tests;

use std::path::PathBuf;
use std::sync::Mutex;

use crate::audio::pcm::{AudioFormat, PcmBuffer};
use crate::foundation::core::{Fps, Size};
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::math::mul_div255_u16;
use crate::foundation::time::Timestamp;
use crate::render::frame::FrameRGBA;

/// Stream selector for readiness and completion signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

/// Lifecycle of an encoder session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SinkStatus {
    /// Not started yet.
    #[default]
    Idle,
    Writing,
    Completed,
    Failed,
}

/// Stream parameters handed to [`EncoderSink::start`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SinkConfig {
    pub size: Size,
    pub fps: Fps,
    pub audio: Option<AudioFormat>,
}

/// Fixed-size RGBA8 frame buffer recycled by the exporter between frames.
///
/// `opaque` is set once the contents were flattened over a background color; otherwise the
/// buffer holds premultiplied RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub opaque: bool,
}

impl PixelBuffer {
    pub fn new(size: Size) -> Self {
        Self {
            width: size.width,
            height: size.height,
            data: vec![0; size.area() * 4],
            opaque: false,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Overwrite the buffer with `frame`, optionally flattening over `background` (straight RGBA8).
    pub fn load(&mut self, frame: &FrameRGBA, background: Option<[u8; 4]>) -> MontageResult<()> {
        if frame.size() != self.size() {
            return Err(MontageError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }
        match background {
            Some(bg) => {
                flatten_premul_over_bg(&mut self.data, &frame.data, bg)?;
                self.opaque = true;
            }
            None => {
                self.data.copy_from_slice(&frame.data);
                self.opaque = false;
            }
        }
        Ok(())
    }

    /// Pixel at `(x, y)`; transparent outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0; 4];
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }
}

/// Flatten premultiplied RGBA8 over a straight-alpha background into opaque RGBA8.
pub(crate) fn flatten_premul_over_bg(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> MontageResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(MontageError::validation(
            "flatten expects equal-length rgba8 buffers",
        ));
    }

    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            d[c] = (u16::from(s[c]) + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

/// Encoder session consuming ordered video frames and audio windows.
///
/// Every method takes `&self` so the video and audio producers can drive one sink
/// concurrently; implementations serialize internally.
#[async_trait::async_trait]
pub trait EncoderSink: Send + Sync {
    /// Open the session. Moves the status to [`SinkStatus::Writing`].
    fn start(&self, config: SinkConfig) -> MontageResult<()>;

    /// Whether the stream can accept another unit without blocking.
    fn ready_for_more_data(&self, kind: MediaKind) -> bool;

    fn append_video(&self, buffer: &PixelBuffer, pts: Timestamp) -> MontageResult<()>;

    fn append_audio(&self, buffer: &PcmBuffer, pts: Timestamp) -> MontageResult<()>;

    /// No more data will be appended to `kind`.
    fn mark_finished(&self, kind: MediaKind);

    fn status(&self) -> SinkStatus;

    /// Diagnostic message once the status is [`SinkStatus::Failed`].
    fn error(&self) -> Option<String>;

    /// Finalize the container and return its location.
    async fn finish(&self) -> MontageResult<PathBuf>;

    /// Abandon the session. Partial output may be discarded.
    fn cancel(&self) {}
}

/// One recorded video hand-off.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedFrame {
    pub pts: Timestamp,
    pub buffer: PixelBuffer,
}

/// One recorded audio hand-off.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedWindow {
    pub pts: Timestamp,
    pub pcm: PcmBuffer,
}

#[derive(Debug, Default)]
struct Stream {
    finished: bool,
    appended: usize,
    stall_left: usize,
    ready_reported: bool,
    violations: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    config: Option<SinkConfig>,
    status: SinkStatus,
    error: Option<String>,
    video: Stream,
    audio: Stream,
    frames: Vec<RecordedFrame>,
    windows: Vec<RecordedWindow>,
    ready_polls: usize,
    cancelled: bool,
}

impl MemoryState {
    fn stream(&mut self, kind: MediaKind) -> &mut Stream {
        match kind {
            MediaKind::Video => &mut self.video,
            MediaKind::Audio => &mut self.audio,
        }
    }

    fn fail(&mut self, msg: String) {
        self.status = SinkStatus::Failed;
        self.error = Some(msg);
    }
}

/// Sink that records everything in memory, with scriptable readiness and failure.
///
/// Appending while the last readiness poll for that stream answered `false` is counted as a
/// backpressure violation (see [`InMemorySink::backpressure_violations`]).
#[derive(Debug, Default)]
pub struct InMemorySink {
    state: Mutex<MemoryState>,
    keep_pixels: bool,
    stall_every: Option<(usize, usize)>,
    fail_video_after: Option<usize>,
    fail_audio_after: Option<usize>,
    fail_start: Option<String>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self {
            keep_pixels: true,
            ..Self::default()
        }
    }

    /// Record timestamps only, dropping pixel data.
    pub fn without_pixels(mut self) -> Self {
        self.keep_pixels = false;
        self
    }

    /// After every `every` appends on a stream, report not-ready for the next `polls` polls.
    pub fn with_stall(mut self, every: usize, polls: usize) -> Self {
        self.stall_every = Some((every.max(1), polls));
        self
    }

    /// Enter the failed state when video frame number `n` (0-based) is appended.
    pub fn with_video_failure_at(mut self, n: usize) -> Self {
        self.fail_video_after = Some(n);
        self
    }

    /// Enter the failed state when audio window number `n` (0-based) is appended.
    pub fn with_audio_failure_at(mut self, n: usize) -> Self {
        self.fail_audio_after = Some(n);
        self
    }

    /// Refuse to start with `msg`.
    pub fn with_start_failure(mut self, msg: impl Into<String>) -> Self {
        self.fail_start = Some(msg.into());
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.lock().config
    }

    pub fn frames(&self) -> Vec<RecordedFrame> {
        self.lock().frames.clone()
    }

    pub fn frame_times(&self) -> Vec<Timestamp> {
        self.lock().frames.iter().map(|f| f.pts).collect()
    }

    pub fn windows(&self) -> Vec<RecordedWindow> {
        self.lock().windows.clone()
    }

    pub fn is_finished(&self, kind: MediaKind) -> bool {
        self.lock().stream(kind).finished
    }

    /// Number of appends made while the sink had reported not-ready.
    pub fn backpressure_violations(&self) -> usize {
        let st = self.lock();
        st.video.violations + st.audio.violations
    }

    /// Total readiness polls observed.
    pub fn ready_polls(&self) -> usize {
        self.lock().ready_polls
    }

    pub fn was_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    fn check_append(
        &self,
        st: &mut MemoryState,
        kind: MediaKind,
        fail_at: Option<usize>,
    ) -> MontageResult<()> {
        if st.status != SinkStatus::Writing {
            return Err(MontageError::export_failed(format!(
                "append on sink in state {:?}",
                st.status
            )));
        }
        let stall = self.stall_every;
        let s = st.stream(kind);
        if s.finished {
            return Err(MontageError::export_failed(format!(
                "{kind:?} stream already marked finished"
            )));
        }
        if !s.ready_reported {
            s.violations += 1;
        }
        let n = s.appended;
        s.appended += 1;
        if let Some((every, polls)) = stall
            && s.appended.is_multiple_of(every)
        {
            s.stall_left = polls;
        }
        if fail_at == Some(n) {
            st.fail(format!("simulated {kind:?} encoder failure at unit {n}"));
            return Err(MontageError::export_failed(
                st.error.clone().unwrap_or_default(),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EncoderSink for InMemorySink {
    fn start(&self, config: SinkConfig) -> MontageResult<()> {
        let mut st = self.lock();
        if st.status != SinkStatus::Idle {
            return Err(MontageError::export_failed("sink already started"));
        }
        if let Some(msg) = &self.fail_start {
            st.fail(msg.clone());
            return Err(MontageError::export_failed(msg.clone()));
        }
        st.config = Some(config);
        st.status = SinkStatus::Writing;
        st.video.ready_reported = true;
        st.audio.ready_reported = true;
        Ok(())
    }

    fn ready_for_more_data(&self, kind: MediaKind) -> bool {
        let mut st = self.lock();
        st.ready_polls += 1;
        let s = st.stream(kind);
        let ready = if s.stall_left > 0 {
            s.stall_left -= 1;
            false
        } else {
            true
        };
        s.ready_reported = ready;
        ready
    }

    fn append_video(&self, buffer: &PixelBuffer, pts: Timestamp) -> MontageResult<()> {
        let mut st = self.lock();
        self.check_append(&mut st, MediaKind::Video, self.fail_video_after)?;
        if let Some(cfg) = st.config
            && cfg.size != buffer.size()
        {
            let msg = format!(
                "pixel buffer {}x{} does not match session {}x{}",
                buffer.width, buffer.height, cfg.size.width, cfg.size.height
            );
            st.fail(msg.clone());
            return Err(MontageError::export_failed(msg));
        }
        let buffer = if self.keep_pixels {
            buffer.clone()
        } else {
            PixelBuffer {
                width: buffer.width,
                height: buffer.height,
                data: Vec::new(),
                opaque: buffer.opaque,
            }
        };
        st.frames.push(RecordedFrame { pts, buffer });
        Ok(())
    }

    fn append_audio(&self, buffer: &PcmBuffer, pts: Timestamp) -> MontageResult<()> {
        let mut st = self.lock();
        self.check_append(&mut st, MediaKind::Audio, self.fail_audio_after)?;
        st.windows.push(RecordedWindow {
            pts,
            pcm: buffer.clone(),
        });
        Ok(())
    }

    fn mark_finished(&self, kind: MediaKind) {
        self.lock().stream(kind).finished = true;
    }

    fn status(&self) -> SinkStatus {
        self.lock().status
    }

    fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    async fn finish(&self) -> MontageResult<PathBuf> {
        let mut st = self.lock();
        match st.status {
            SinkStatus::Writing => {}
            SinkStatus::Failed => {
                return Err(MontageError::export_failed(
                    st.error.clone().unwrap_or_else(|| "sink failed".to_owned()),
                ));
            }
            other => {
                return Err(MontageError::export_failed(format!(
                    "finish called on sink in state {other:?}"
                )));
            }
        }
        let audio_expected = st.config.is_some_and(|c| c.audio.is_some());
        if !st.video.finished || (audio_expected && !st.audio.finished) {
            let msg = "finish called before every stream was marked finished".to_owned();
            st.fail(msg.clone());
            return Err(MontageError::export_failed(msg));
        }
        st.status = SinkStatus::Completed;
        Ok(PathBuf::from("memory://montage"))
    }

    fn cancel(&self) {
        let mut st = self.lock();
        st.cancelled = true;
        if st.status == SinkStatus::Writing {
            st.fail("cancelled".to_owned());
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;

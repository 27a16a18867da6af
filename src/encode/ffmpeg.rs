use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{SyncSender, sync_channel};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use anyhow::Context as _;
use tracing::{debug, warn};

use crate::audio::pcm::{AudioFormat, PcmBuffer};
use crate::encode::sink::{
    EncoderSink, MediaKind, PixelBuffer, SinkConfig, SinkStatus, flatten_premul_over_bg,
};
use crate::foundation::core::Fps;
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::time::Timestamp;

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// Frames buffered between the producer and the ffmpeg writer thread.
    pub queue_depth: usize,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl FfmpegSinkOpts {
    /// Create options for outputting an MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            queue_depth: 8,
            bg_rgba: [0, 0, 0, 255],
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }

    pub fn with_background(mut self, bg_rgba: [u8; 4]) -> Self {
        self.bg_rgba = bg_rgba;
        self
    }
}

/// Removes intermediate files when dropped.
#[derive(Debug, Default)]
struct TempFiles(Vec<PathBuf>);

impl Drop for TempFiles {
    fn drop(&mut self) {
        for p in &self.0 {
            if let Err(e) = std::fs::remove_file(p)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = %p.display(), error = %e, "failed to remove temp file");
            }
        }
    }
}

struct AudioSpool {
    format: AudioFormat,
    path: PathBuf,
    writer: BufWriter<File>,
    written_frames: u64,
}

struct Session {
    cfg: SinkConfig,
    tx: Option<SyncSender<Vec<u8>>>,
    writer: Option<JoinHandle<std::io::Result<()>>>,
    child: Option<Child>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    video_path: PathBuf,
    audio: Option<AudioSpool>,
    temps: TempFiles,
    scratch: Vec<u8>,
    last_video: Option<Timestamp>,
    video_finished: bool,
    audio_finished: bool,
}

#[derive(Default)]
struct State {
    status: SinkStatus,
    error: Option<String>,
    session: Option<Session>,
}

impl State {
    fn fail(&mut self, msg: impl Into<String>) -> MontageError {
        let msg = msg.into();
        self.status = SinkStatus::Failed;
        self.error = Some(msg.clone());
        MontageError::export_failed(msg)
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw frames to its stdin.
///
/// Frames are handed to a writer thread over a bounded queue; readiness reports whether that
/// queue has room. Audio windows are spooled to a raw `f32le` file and muxed with the encoded
/// video when the session finishes.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    in_flight: Arc<AtomicUsize>,
    state: Mutex<State>,
}

impl std::fmt::Debug for FfmpegSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegSink")
            .field("opts", &self.opts)
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl FfmpegSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            in_flight: Arc::new(AtomicUsize::new(0)),
            state: Mutex::new(State::default()),
        }
    }

    pub fn opts(&self) -> &FfmpegSinkOpts {
        &self.opts
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self, cfg: SinkConfig) -> MontageResult<Session> {
        validate_config(&cfg)?;
        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(MontageError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(MontageError::export_failed(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut temps = TempFiles::default();
        let (video_path, audio) = match cfg.audio {
            Some(format) => {
                let video_path = sibling(&self.opts.out_path, "video.mp4");
                let audio_path = sibling(&self.opts.out_path, "audio.f32le");
                temps.0.push(video_path.clone());
                temps.0.push(audio_path.clone());
                let file = File::create(&audio_path).with_context(|| {
                    format!("failed to create audio spool '{}'", audio_path.display())
                })?;
                let spool = AudioSpool {
                    format,
                    path: audio_path,
                    writer: BufWriter::new(file),
                    written_frames: 0,
                };
                (video_path, Some(spool))
            }
            None => (self.opts.out_path.clone(), None),
        };

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .arg("-y")
            .args([
                "-loglevel",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "-s",
                &format!("{}x{}", cfg.size.width, cfg.size.height),
            ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0"])
            .args([
                "-an",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ])
            .arg(&video_path);

        let mut child = cmd.spawn().map_err(|e| {
            MontageError::export_failed(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MontageError::export_failed("failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| MontageError::export_failed("failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        let (tx, rx) = sync_channel::<Vec<u8>>(self.opts.queue_depth.max(1));
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.store(0, Ordering::SeqCst);
        let writer = std::thread::spawn(move || write_frames(stdin, rx, &in_flight));

        Ok(Session {
            cfg,
            tx: Some(tx),
            writer: Some(writer),
            child: Some(child),
            stderr_drain: Some(stderr_drain),
            video_path,
            audio,
            temps,
            scratch: vec![0; cfg.size.area() * 4],
            last_video: None,
            video_finished: false,
            audio_finished: false,
        })
    }
}

fn write_frames(
    mut stdin: ChildStdin,
    rx: std::sync::mpsc::Receiver<Vec<u8>>,
    in_flight: &AtomicUsize,
) -> std::io::Result<()> {
    for frame in rx {
        let res = stdin.write_all(&frame);
        in_flight.fetch_sub(1, Ordering::SeqCst);
        res?;
    }
    stdin.flush()
}

fn validate_config(cfg: &SinkConfig) -> MontageResult<()> {
    if cfg.fps.num == 0 || cfg.fps.den == 0 {
        return Err(MontageError::validation("fps must be non-zero"));
    }
    if cfg.size.is_empty() {
        return Err(MontageError::validation(
            "ffmpeg sink width/height must be non-zero",
        ));
    }
    if !cfg.size.width.is_multiple_of(2) || !cfg.size.height.is_multiple_of(2) {
        return Err(MontageError::validation(
            "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
        ));
    }
    if let Some(a) = cfg.audio {
        AudioFormat::new(a.sample_rate, a.channels)?;
    }
    Ok(())
}

fn sibling(out: &Path, suffix: &str) -> PathBuf {
    let mut name = out
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "montage".into());
    name.push(format!(".{suffix}.tmp"));
    out.with_file_name(name)
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

/// Close the video pipe and wait for the encoder, then mux audio if any was spooled.
fn finalize(mut session: Session, out_path: &Path) -> MontageResult<()> {
    drop(session.tx.take());
    let write_result = match session.writer.take() {
        Some(handle) => handle
            .join()
            .map_err(|_| MontageError::export_failed("ffmpeg writer thread panicked"))?,
        None => Ok(()),
    };
    let mut child = session
        .child
        .take()
        .ok_or_else(|| MontageError::export_failed("ffmpeg sink not started"))?;
    let status = child
        .wait()
        .map_err(|e| MontageError::export_failed(format!("failed to wait for ffmpeg: {e}")))?;
    let stderr_bytes = match session.stderr_drain.take() {
        Some(handle) => handle
            .join()
            .map_err(|_| MontageError::export_failed("ffmpeg stderr drain thread panicked"))?
            .map_err(|e| MontageError::export_failed(format!("ffmpeg stderr read failed: {e}")))?,
        None => Vec::new(),
    };
    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr_bytes);
        return Err(MontageError::export_failed(format!(
            "ffmpeg exited with status {status}: {}",
            stderr.trim()
        )));
    }
    write_result
        .map_err(|e| MontageError::export_failed(format!("failed to write frames to ffmpeg: {e}")))?;

    let Some(mut spool) = session.audio.take() else {
        return Ok(());
    };
    spool
        .writer
        .flush()
        .map_err(|e| MontageError::export_failed(format!("failed to flush audio spool: {e}")))?;
    drop(spool.writer);

    let output = Command::new("ffmpeg")
        .args(["-y", "-loglevel", "error", "-i"])
        .arg(&session.video_path)
        .args([
            "-f",
            "f32le",
            "-ar",
            &spool.format.sample_rate.to_string(),
            "-ac",
            &spool.format.channels.to_string(),
            "-i",
        ])
        .arg(&spool.path)
        .args([
            "-c:v",
            "copy",
            "-c:a",
            "aac",
            "-shortest",
            "-movflags",
            "+faststart",
        ])
        .arg(out_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| MontageError::export_failed(format!("failed to spawn ffmpeg mux: {e}")))?;
    if !output.status.success() {
        return Err(MontageError::export_failed(format!(
            "ffmpeg mux exited with status {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    debug!(
        out = %out_path.display(),
        audio_frames = spool.written_frames,
        "muxed audio and video"
    );
    Ok(())
}

#[async_trait::async_trait]
impl EncoderSink for FfmpegSink {
    fn start(&self, config: SinkConfig) -> MontageResult<()> {
        let mut st = self.lock();
        if st.status != SinkStatus::Idle {
            return Err(MontageError::export_failed("ffmpeg sink already started"));
        }
        match self.open(config) {
            Ok(session) => {
                st.session = Some(session);
                st.status = SinkStatus::Writing;
                Ok(())
            }
            Err(e) => Err(st.fail(e.to_string())),
        }
    }

    fn ready_for_more_data(&self, kind: MediaKind) -> bool {
        let mut st = self.lock();
        if st.status != SinkStatus::Writing {
            return false;
        }
        match kind {
            MediaKind::Audio => true,
            MediaKind::Video => {
                if st.session.as_ref().is_some_and(|s| s.video_finished) {
                    return false;
                }
                let writer_gone = st
                    .session
                    .as_ref()
                    .and_then(|s| s.writer.as_ref())
                    .is_none_or(JoinHandle::is_finished);
                if writer_gone {
                    st.fail("ffmpeg writer stopped accepting frames");
                    return false;
                }
                self.in_flight.load(Ordering::SeqCst) < self.opts.queue_depth.max(1)
            }
        }
    }

    fn append_video(&self, buffer: &PixelBuffer, pts: Timestamp) -> MontageResult<()> {
        let mut st = self.lock();
        if st.status != SinkStatus::Writing {
            return Err(MontageError::export_failed("ffmpeg sink is not writing"));
        }
        let bg = self.opts.bg_rgba;
        let outcome = match st.session.as_mut() {
            None => Err("ffmpeg sink not started".to_owned()),
            Some(s) => push_video(s, buffer, pts, bg, &self.in_flight),
        };
        outcome.map_err(|msg| st.fail(msg))
    }

    fn append_audio(&self, buffer: &PcmBuffer, pts: Timestamp) -> MontageResult<()> {
        let mut st = self.lock();
        if st.status != SinkStatus::Writing {
            return Err(MontageError::export_failed("ffmpeg sink is not writing"));
        }
        let outcome = match st.session.as_mut().and_then(|s| s.audio.as_mut()) {
            None => Err("ffmpeg sink has no audio stream".to_owned()),
            Some(spool) => push_audio(spool, buffer, pts),
        };
        outcome.map_err(|msg| st.fail(msg))
    }

    fn mark_finished(&self, kind: MediaKind) {
        let mut st = self.lock();
        if let Some(s) = st.session.as_mut() {
            match kind {
                MediaKind::Video => {
                    s.video_finished = true;
                    drop(s.tx.take());
                }
                MediaKind::Audio => s.audio_finished = true,
            }
        }
    }

    fn status(&self) -> SinkStatus {
        self.lock().status
    }

    fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    async fn finish(&self) -> MontageResult<PathBuf> {
        let session = {
            let mut st = self.lock();
            if st.status != SinkStatus::Writing {
                return Err(MontageError::export_failed(
                    st.error
                        .clone()
                        .unwrap_or_else(|| format!("finish called in state {:?}", st.status)),
                ));
            }
            let Some(session) = st.session.take() else {
                return Err(st.fail("ffmpeg sink not started"));
            };
            if !session.video_finished
                || (session.cfg.audio.is_some() && !session.audio_finished)
            {
                st.session = Some(session);
                return Err(st.fail("finish called before every stream was marked finished"));
            }
            session
        };

        let out_path = self.opts.out_path.clone();
        let target = out_path.clone();
        let result = tokio::task::spawn_blocking(move || finalize(session, &target))
            .await
            .map_err(|e| MontageError::export_failed(format!("ffmpeg finalize task failed: {e}")))
            .and_then(|r| r);

        let mut st = self.lock();
        match result {
            Ok(()) => {
                st.status = SinkStatus::Completed;
                Ok(out_path)
            }
            Err(e) => Err(st.fail(e.to_string())),
        }
    }

    fn cancel(&self) {
        let mut st = self.lock();
        if let Some(mut session) = st.session.take() {
            drop(session.tx.take());
            if let Some(mut child) = session.child.take() {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
        if st.status == SinkStatus::Writing {
            st.fail("export cancelled");
        }
    }
}

fn push_video(
    s: &mut Session,
    buffer: &PixelBuffer,
    pts: Timestamp,
    bg: [u8; 4],
    in_flight: &AtomicUsize,
) -> Result<(), String> {
    if s.video_finished {
        return Err("video stream already marked finished".to_owned());
    }
    if s.last_video.is_some_and(|last| pts <= last) {
        return Err("ffmpeg sink received out-of-order frame timestamp".to_owned());
    }
    if buffer.size() != s.cfg.size {
        return Err(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            buffer.width, buffer.height, s.cfg.size.width, s.cfg.size.height
        ));
    }
    if buffer.opaque {
        s.scratch.copy_from_slice(&buffer.data);
    } else {
        flatten_premul_over_bg(&mut s.scratch, &buffer.data, bg).map_err(|e| e.to_string())?;
    }
    let Some(tx) = s.tx.as_ref() else {
        return Err("ffmpeg sink is already finalized".to_owned());
    };
    in_flight.fetch_add(1, Ordering::SeqCst);
    if tx.send(s.scratch.clone()).is_err() {
        in_flight.fetch_sub(1, Ordering::SeqCst);
        return Err("ffmpeg writer stopped accepting frames".to_owned());
    }
    s.last_video = Some(pts);
    Ok(())
}

fn push_audio(spool: &mut AudioSpool, buffer: &PcmBuffer, pts: Timestamp) -> Result<(), String> {
    let pcm = if buffer.format == spool.format {
        std::borrow::Cow::Borrowed(buffer)
    } else {
        std::borrow::Cow::Owned(buffer.converted(spool.format))
    };
    let start = pts.samples_floor(spool.format.sample_rate);
    if start < spool.written_frames {
        return Err(format!(
            "audio window at sample {start} overlaps already written audio ({} frames)",
            spool.written_frames
        ));
    }
    let gap = (start - spool.written_frames) as usize;
    if gap > 0 {
        let pad = PcmBuffer::silence(spool.format, gap);
        spool
            .writer
            .write_all(&pad.to_f32le_bytes())
            .map_err(|e| format!("failed to write audio spool: {e}"))?;
    }
    spool
        .writer
        .write_all(&pcm.to_f32le_bytes())
        .map_err(|e| format!("failed to write audio spool: {e}"))?;
    spool.written_frames = start + pcm.frames() as u64;
    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> MontageResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;

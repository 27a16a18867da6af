//! Video and audio decoding through the `ffprobe`/`ffmpeg` executables.
//!
//! Every entry point funnels through [`run_tool`], which is the only piece gated on the
//! `media-ffmpeg` feature. Without it, each call fails with `SourceUnavailable`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::audio::pcm::{AudioFormat, PcmBuffer};
use crate::foundation::error::{MontageError, MontageResult};
use crate::render::frame::FrameRGBA;

/// Stream metadata of a probed video file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoProbe {
    pub source_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
}

impl VideoProbe {
    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Captured result of one tool invocation.
struct ToolRun {
    ok: bool,
    stdout: Vec<u8>,
    stderr: String,
}

#[cfg(feature = "media-ffmpeg")]
fn run_tool<I, S>(tool: &str, args: I) -> MontageResult<ToolRun>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let out = std::process::Command::new(tool)
        .args(args)
        .output()
        .map_err(|e| MontageError::source_unavailable(format!("cannot launch {tool}: {e}")))?;
    Ok(ToolRun {
        ok: out.status.success(),
        stdout: out.stdout,
        stderr: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
fn run_tool<I, S>(_tool: &str, _args: I) -> MontageResult<ToolRun>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Err(MontageError::source_unavailable(
        "video/audio assets require the 'media-ffmpeg' feature",
    ))
}

#[derive(Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

impl ProbeReport {
    fn first(&self, kind: &str) -> Option<&ProbeStream> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(kind))
    }
}

fn secs_arg(v: f64) -> String {
    format!("{:.9}", v.max(0.0))
}

/// Read dimensions and audio presence of a video file.
pub fn probe_video(source_path: &Path) -> MontageResult<VideoProbe> {
    let run = run_tool(
        "ffprobe",
        [
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-print_format"),
            OsStr::new("json"),
            OsStr::new("-show_streams"),
            source_path.as_os_str(),
        ],
    )?;
    if !run.ok {
        return Err(MontageError::invalid_file(format!(
            "cannot probe '{}': {}",
            source_path.display(),
            run.stderr
        )));
    }

    let report: ProbeReport = serde_json::from_slice(&run.stdout).map_err(|e| {
        MontageError::invalid_file(format!("unreadable probe of '{}': {e}", source_path.display()))
    })?;
    let stream = report.first("video").ok_or_else(|| {
        MontageError::invalid_file(format!("'{}' has no video stream", source_path.display()))
    })?;
    match (stream.width, stream.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => Ok(VideoProbe {
            source_path: source_path.to_path_buf(),
            width,
            height,
            has_audio: report.first("audio").is_some(),
        }),
        _ => Err(MontageError::invalid_file(format!(
            "video stream of '{}' reports no dimensions",
            source_path.display()
        ))),
    }
}

/// Decode the frame presented at `time_sec` as a premultiplied frame.
pub fn decode_video_frame(probe: &VideoProbe, time_sec: f64) -> MontageResult<FrameRGBA> {
    let at = secs_arg(time_sec);
    let run = run_tool(
        "ffmpeg",
        [
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-ss"),
            OsStr::new(&at),
            OsStr::new("-i"),
            probe.source_path.as_os_str(),
            OsStr::new("-frames:v"),
            OsStr::new("1"),
            OsStr::new("-f"),
            OsStr::new("rawvideo"),
            OsStr::new("-pix_fmt"),
            OsStr::new("rgba"),
            OsStr::new("pipe:1"),
        ],
    )?;
    if !run.ok {
        return Err(MontageError::source_unavailable(format!(
            "frame decode of '{}' at {at}s failed: {}",
            probe.source_path.display(),
            run.stderr
        )));
    }

    let want = probe.frame_len();
    let mut data = run.stdout;
    if want == 0 || data.len() < want {
        return Err(MontageError::source_unavailable(format!(
            "'{}' has no frame at {time_sec:.3}s",
            probe.source_path.display()
        )));
    }
    data.truncate(want);
    FrameRGBA::from_straight(probe.width, probe.height, data)
}

/// Decode `duration_sec` of audio starting at `start_sec`, converted to `format`.
///
/// A source without an audio stream yields an empty buffer.
pub fn decode_audio_window(
    path: &Path,
    format: AudioFormat,
    start_sec: f64,
    duration_sec: f64,
) -> MontageResult<PcmBuffer> {
    let (from, len) = (secs_arg(start_sec), secs_arg(duration_sec));
    let (channels, rate) = (format.channels.to_string(), format.sample_rate.to_string());
    let run = run_tool(
        "ffmpeg",
        [
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-ss"),
            OsStr::new(&from),
            OsStr::new("-t"),
            OsStr::new(&len),
            OsStr::new("-i"),
            path.as_os_str(),
            OsStr::new("-vn"),
            OsStr::new("-f"),
            OsStr::new("f32le"),
            OsStr::new("-acodec"),
            OsStr::new("pcm_f32le"),
            OsStr::new("-ac"),
            OsStr::new(&channels),
            OsStr::new("-ar"),
            OsStr::new(&rate),
            OsStr::new("pipe:1"),
        ],
    )?;

    if run.ok {
        return PcmBuffer::from_f32le_bytes(format, &run.stdout);
    }
    if has_no_audio_stream(&run.stderr) {
        return Ok(PcmBuffer::silence(format, 0));
    }
    Err(MontageError::source_unavailable(format!(
        "audio decode of '{}' failed: {}",
        path.display(),
        run.stderr
    )))
}

fn has_no_audio_stream(stderr: &str) -> bool {
    stderr.contains("matches no streams") || stderr.contains("does not contain any stream")
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;

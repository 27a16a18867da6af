use super::*;
use crate::foundation::core::Size;

fn cfg(w: u32, h: u32) -> SinkConfig {
    SinkConfig {
        size: Size::new(w, h),
        fps: Fps { num: 30, den: 1 },
        audio: None,
    }
}

#[test]
fn odd_dimensions_are_rejected() {
    let err = validate_config(&cfg(3, 2)).unwrap_err();
    assert!(err.to_string().contains("even"));
    assert!(validate_config(&cfg(0, 2)).is_err());
    assert!(validate_config(&cfg(4, 2)).is_ok());
}

#[test]
fn zero_fps_is_rejected() {
    let mut c = cfg(2, 2);
    c.fps = Fps { num: 0, den: 1 };
    assert!(validate_config(&c).is_err());
}

#[test]
fn temp_paths_sit_next_to_output() {
    let p = sibling(Path::new("/tmp/out/movie.mp4"), "audio.f32le");
    assert_eq!(p, PathBuf::from("/tmp/out/movie.mp4.audio.f32le.tmp"));
}

#[test]
fn opts_builders() {
    let o = FfmpegSinkOpts::new("x.mp4")
        .with_overwrite(false)
        .with_queue_depth(0)
        .with_background([1, 2, 3, 255]);
    assert!(!o.overwrite);
    assert_eq!(o.queue_depth, 1);
    assert_eq!(o.bg_rgba, [1, 2, 3, 255]);
}

#[test]
fn audio_spool_pads_gaps_and_rejects_overlap() {
    let dir = std::env::temp_dir().join(format!("montage-spool-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("a.f32le");
    let format = AudioFormat::new(4, 1).unwrap();
    let mut spool = AudioSpool {
        format,
        path: path.clone(),
        writer: BufWriter::new(File::create(&path).unwrap()),
        written_frames: 0,
    };
    let one_sec = PcmBuffer::new(format, vec![0.5; 4]).unwrap();
    push_audio(&mut spool, &one_sec, Timestamp::ZERO).unwrap();
    push_audio(&mut spool, &one_sec, Timestamp::seconds(2)).unwrap();
    assert_eq!(spool.written_frames, 12);
    assert!(push_audio(&mut spool, &one_sec, Timestamp::seconds(1)).is_err());

    spool.writer.flush().unwrap();
    let bytes = std::fs::read(&path).unwrap();
    let pcm = PcmBuffer::from_f32le_bytes(format, &bytes).unwrap();
    assert_eq!(pcm.frames(), 12);
    assert_eq!(pcm.samples[4..8], [0.0; 4]);
    assert_eq!(pcm.samples[8], 0.5);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn temp_files_are_removed_on_drop() {
    let path = std::env::temp_dir().join(format!("montage-temp-{}.tmp", std::process::id()));
    std::fs::write(&path, b"x").unwrap();
    drop(TempFiles(vec![path.clone()]));
    assert!(!path.exists());
}

#[test]
fn unstarted_sink_is_not_ready() {
    let sink = FfmpegSink::new(FfmpegSinkOpts::new("unused.mp4"));
    assert_eq!(sink.status(), SinkStatus::Idle);
    assert!(!sink.ready_for_more_data(MediaKind::Video));
}

#[test]
fn encodes_when_ffmpeg_available() {
    if !is_ffmpeg_on_path() {
        return;
    }
    let dir = std::env::temp_dir().join(format!("montage-ffmpeg-{}", std::process::id()));
    let out = dir.join("clip.mp4");
    let sink = FfmpegSink::new(FfmpegSinkOpts::new(&out));
    sink.start(cfg(4, 4)).unwrap();
    let mut buf = PixelBuffer::new(Size::new(4, 4));
    buf.data.fill(255);
    for i in 0..3u64 {
        sink.append_video(&buf, Timestamp::from_frame(i, Fps { num: 30, den: 1 }))
            .unwrap();
    }
    sink.mark_finished(MediaKind::Video);
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let path = rt.block_on(sink.finish()).unwrap();
    assert_eq!(path, out);
    assert!(out.exists());
    assert_eq!(sink.status(), SinkStatus::Completed);
    let _ = std::fs::remove_dir_all(&dir);
}

use super::*;
use crate::foundation::core::Rgba8Premul;

fn config(audio: bool) -> SinkConfig {
    SinkConfig {
        size: Size::new(2, 2),
        fps: Fps { num: 30, den: 1 },
        audio: audio.then_some(AudioFormat::STEREO_48K),
    }
}

#[test]
fn flatten_premul_alpha_0_returns_bg() {
    let src = vec![0u8, 0, 0, 0];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 255]);
}

#[test]
fn flatten_premul_alpha_255_is_identity() {
    let src = vec![1u8, 2, 3, 255];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn pixel_buffer_load_checks_size_and_flattens() {
    let mut buf = PixelBuffer::new(Size::new(2, 2));
    let small = FrameRGBA::transparent(Size::new(1, 1));
    assert!(buf.load(&small, None).is_err());

    let frame = FrameRGBA::filled(Size::new(2, 2), Rgba8Premul::transparent());
    buf.load(&frame, Some([0, 0, 255, 255])).unwrap();
    assert!(buf.opaque);
    assert_eq!(buf.pixel(1, 1), [0, 0, 255, 255]);

    buf.load(&frame, None).unwrap();
    assert!(!buf.opaque);
    assert_eq!(buf.pixel(0, 0), [0, 0, 0, 0]);
}

#[tokio::test]
async fn memory_sink_records_and_completes() {
    let sink = InMemorySink::new();
    assert_eq!(sink.status(), SinkStatus::Idle);
    sink.start(config(false)).unwrap();
    assert_eq!(sink.status(), SinkStatus::Writing);

    let buf = PixelBuffer::new(Size::new(2, 2));
    sink.append_video(&buf, Timestamp::ZERO).unwrap();
    sink.append_video(&buf, Timestamp::millis(33)).unwrap();
    sink.mark_finished(MediaKind::Video);

    let out = sink.finish().await.unwrap();
    assert_eq!(out, PathBuf::from("memory://montage"));
    assert_eq!(sink.status(), SinkStatus::Completed);
    assert_eq!(
        sink.frame_times(),
        vec![Timestamp::ZERO, Timestamp::millis(33)]
    );
}

#[tokio::test]
async fn finish_requires_every_stream_finished() {
    let sink = InMemorySink::new();
    sink.start(config(true)).unwrap();
    sink.mark_finished(MediaKind::Video);
    let err = sink.finish().await.unwrap_err();
    assert!(matches!(err, MontageError::ExportFailed(_)));
    assert_eq!(sink.status(), SinkStatus::Failed);
}

#[test]
fn stall_reports_not_ready_for_configured_polls() {
    let sink = InMemorySink::new().with_stall(2, 3);
    sink.start(config(false)).unwrap();
    let buf = PixelBuffer::new(Size::new(2, 2));

    assert!(sink.ready_for_more_data(MediaKind::Video));
    sink.append_video(&buf, Timestamp::ZERO).unwrap();
    assert!(sink.ready_for_more_data(MediaKind::Video));
    sink.append_video(&buf, Timestamp::millis(1)).unwrap();

    let polls: Vec<bool> = (0..4)
        .map(|_| sink.ready_for_more_data(MediaKind::Video))
        .collect();
    assert_eq!(polls, vec![false, false, false, true]);
    // audio readiness is independent
    assert!(sink.ready_for_more_data(MediaKind::Audio));
    assert_eq!(sink.backpressure_violations(), 0);
}

#[test]
fn append_after_not_ready_counts_violation() {
    let sink = InMemorySink::new().with_stall(1, 1);
    sink.start(config(false)).unwrap();
    let buf = PixelBuffer::new(Size::new(2, 2));
    sink.append_video(&buf, Timestamp::ZERO).unwrap();
    assert!(!sink.ready_for_more_data(MediaKind::Video));
    sink.append_video(&buf, Timestamp::millis(1)).unwrap();
    assert_eq!(sink.backpressure_violations(), 1);
}

#[test]
fn scripted_failure_sets_status_and_message() {
    let sink = InMemorySink::new().with_video_failure_at(1);
    sink.start(config(false)).unwrap();
    let buf = PixelBuffer::new(Size::new(2, 2));
    sink.append_video(&buf, Timestamp::ZERO).unwrap();
    let err = sink.append_video(&buf, Timestamp::millis(1)).unwrap_err();
    assert_eq!(sink.status(), SinkStatus::Failed);
    let msg = sink.error().unwrap();
    assert!(msg.contains("simulated"));
    assert!(err.to_string().contains(&msg));
    assert!(sink.append_video(&buf, Timestamp::millis(2)).is_err());
}

#[test]
fn start_failure_and_double_start() {
    let sink = InMemorySink::new().with_start_failure("disk full");
    assert!(sink.start(config(false)).is_err());
    assert_eq!(sink.error().as_deref(), Some("disk full"));

    let sink = InMemorySink::new();
    sink.start(config(false)).unwrap();
    assert!(sink.start(config(false)).is_err());
}

#[test]
fn mismatched_buffer_size_fails_session() {
    let sink = InMemorySink::new();
    sink.start(config(false)).unwrap();
    let buf = PixelBuffer::new(Size::new(4, 4));
    assert!(sink.append_video(&buf, Timestamp::ZERO).is_err());
    assert_eq!(sink.status(), SinkStatus::Failed);
}

#[test]
fn cancel_marks_failed() {
    let sink = InMemorySink::new();
    sink.start(config(false)).unwrap();
    sink.cancel();
    assert!(sink.was_cancelled());
    assert_eq!(sink.status(), SinkStatus::Failed);
}

#[test]
fn without_pixels_drops_data() {
    let sink = InMemorySink::new().without_pixels();
    sink.start(config(false)).unwrap();
    sink.append_video(&PixelBuffer::new(Size::new(2, 2)), Timestamp::ZERO)
        .unwrap();
    assert!(sink.frames()[0].buffer.data.is_empty());
}

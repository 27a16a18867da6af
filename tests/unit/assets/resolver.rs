use super::*;
use crate::audio::pcm::AudioFormat;
use crate::foundation::core::{Rgba8Premul, Size};
use crate::scene::media::{AudioItem, VideoItem};

fn solid(v: u8) -> FrameRGBA {
    FrameRGBA::filled(Size::new(2, 2), Rgba8Premul::from_straight_rgba(v, v, v, 255))
}

#[tokio::test]
async fn video_frames_follow_elapsed_and_hold_last() {
    let r = MemoryAssetResolver::new().with_video(
        "clip",
        Fps::new(10, 1).unwrap(),
        vec![solid(0), solid(100), solid(200)],
    );
    let item = MediaItem::Video(VideoItem {
        source_ref: "clip".into(),
        duration: Timestamp::seconds(5),
    });
    assert_eq!(r.frame(&item, Timestamp::millis(150)).await.unwrap(), solid(100));
    assert_eq!(r.frame(&item, Timestamp::seconds(4)).await.unwrap(), solid(200));
}

#[tokio::test]
async fn audio_window_is_sliced_and_may_be_short() {
    let fmt = AudioFormat::new(4, 1).unwrap();
    let pcm = PcmBuffer::new(fmt, vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5]).unwrap();
    let r = MemoryAssetResolver::new().with_audio("a", pcm);
    let item = MediaItem::Audio(AudioItem {
        source_ref: "a".into(),
        duration: None,
    });
    let w = TimeRange::new(Timestamp::millis(500), Timestamp::seconds(1)).unwrap();
    let out = r.audio(&item, w).await.unwrap();
    assert_eq!(out.samples, vec![0.2, 0.3, 0.4, 0.5]);
    let w = TimeRange::new(Timestamp::seconds(1), Timestamp::seconds(1)).unwrap();
    assert_eq!(r.audio(&item, w).await.unwrap().samples, vec![0.4, 0.5]);
}

#[tokio::test]
async fn unknown_reference_is_source_unavailable() {
    let r = MemoryAssetResolver::new();
    let item = MediaItem::Audio(AudioItem {
        source_ref: "x".into(),
        duration: None,
    });
    let w = TimeRange::new(Timestamp::ZERO, Timestamp::seconds(1)).unwrap();
    assert!(matches!(
        r.audio(&item, w).await.unwrap_err(),
        MontageError::SourceUnavailable(_)
    ));
}

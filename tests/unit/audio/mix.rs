use super::*;
use crate::assets::resolver::MemoryAssetResolver;
use crate::foundation::core::Size;
use crate::scene::media::{AudioItem, MediaItem};
use crate::scene::model::{Clip, ClipFrame};

const RATE: u32 = 8;

fn audio_clip(id: &str, key: &str, start: i64, dur: i64) -> Clip {
    Clip::new(
        id,
        MediaItem::Audio(AudioItem {
            source_ref: key.into(),
            duration: None,
        }),
        TimeRange::new(Timestamp::seconds(start), Timestamp::seconds(dur)).unwrap(),
        ClipFrame::full(Size::new(1, 1)),
    )
}

fn tone(secs: usize, v: f32) -> PcmBuffer {
    PcmBuffer::new(AudioFormat::new(RATE, 1).unwrap(), vec![v; secs * RATE as usize]).unwrap()
}

fn window(start: i64, dur: i64) -> TimeRange {
    TimeRange::new(Timestamp::seconds(start), Timestamp::seconds(dur)).unwrap()
}

#[tokio::test]
async fn silent_sources_sum_to_zero() {
    let resolver = MemoryAssetResolver::new()
        .with_audio("a", tone(2, 0.0))
        .with_audio("b", tone(2, 0.0));
    let tracks = vec![
        Track::new("t0", TrackType::Audio).with_clip(audio_clip("a", "a", 0, 2)),
        Track::new("t1", TrackType::Audio).with_clip(audio_clip("b", "b", 0, 2)),
    ];
    let out = AudioMixer
        .mix(&tracks, window(0, 1), None, &resolver)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(out.frames(), RATE as usize);
    assert!(out.samples.iter().all(|s| *s == 0.0));
}

#[tokio::test]
async fn short_clip_yields_signal_then_silence() {
    let resolver = MemoryAssetResolver::new().with_audio("tone", tone(4, 1.0));
    let tracks = vec![Track::new("t", TrackType::Audio).with_clip(audio_clip("c", "tone", 0, 1))];
    let out = AudioMixer
        .mix(&tracks, window(0, 2), None, &resolver)
        .await
        .unwrap()
        .unwrap();
    let (head, tail) = out.samples.split_at(RATE as usize);
    assert!(head.iter().all(|s| *s == 1.0));
    assert!(tail.iter().all(|s| *s == 0.0));
}

#[tokio::test]
async fn gain_is_track_volume_times_clip_opacity() {
    let resolver = MemoryAssetResolver::new().with_audio("tone", tone(1, 1.0));
    let tracks = vec![
        Track::new("t", TrackType::Audio)
            .with_volume(0.5)
            .with_clip(audio_clip("c", "tone", 0, 1).with_opacity(0.5)),
    ];
    let out = AudioMixer
        .mix(&tracks, window(0, 1), None, &resolver)
        .await
        .unwrap()
        .unwrap();
    assert!(out.samples.iter().all(|s| *s == 0.25));
}

#[tokio::test]
async fn sums_are_not_clamped() {
    let resolver = MemoryAssetResolver::new().with_audio("tone", tone(1, 0.75));
    let tracks = vec![
        Track::new("a", TrackType::Audio).with_clip(audio_clip("a", "tone", 0, 1)),
        Track::new("b", TrackType::Audio).with_clip(audio_clip("b", "tone", 0, 1)),
    ];
    let out = AudioMixer
        .mix(&tracks, window(0, 1), None, &resolver)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(out.peak(), 1.5);
}

#[tokio::test]
async fn explicit_format_converts_sources() {
    let resolver = MemoryAssetResolver::new().with_audio("tone", tone(1, 0.5));
    let tracks = vec![Track::new("t", TrackType::Audio).with_clip(audio_clip("c", "tone", 0, 1))];
    let target = AudioFormat::new(16, 2).unwrap();
    let out = AudioMixer
        .mix(&tracks, window(0, 1), Some(target), &resolver)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(out.format, target);
    assert_eq!(out.frames(), 16);
    assert!(out.samples.iter().all(|s| *s == 0.5));
}

#[tokio::test]
async fn no_overlap_returns_none() {
    let resolver = MemoryAssetResolver::new().with_audio("tone", tone(1, 1.0));
    let tracks = vec![
        Track::new("t", TrackType::Audio).with_clip(audio_clip("c", "tone", 5, 1)),
        Track::new("off", TrackType::Audio)
            .with_enabled(false)
            .with_clip(audio_clip("d", "tone", 0, 1)),
    ];
    let out = AudioMixer
        .mix(&tracks, window(0, 1), None, &resolver)
        .await
        .unwrap();
    assert!(out.is_none());
}

#[tokio::test]
async fn missing_source_is_mixed_as_silence() {
    let resolver = MemoryAssetResolver::new().with_audio("tone", tone(1, 1.0));
    let tracks = vec![
        Track::new("t", TrackType::Audio)
            .with_clip(audio_clip("gone", "missing", 0, 1))
            .with_clip(audio_clip("c", "tone", 0, 1)),
    ];
    let out = AudioMixer
        .mix(&tracks, window(0, 1), None, &resolver)
        .await
        .unwrap()
        .unwrap();
    assert!(out.samples.iter().all(|s| *s == 1.0));
}

use super::*;
use crate::assets::resolver::MemoryAssetResolver;
use crate::effects::builtin::Filter;
use crate::effects::effect::Effect;
use crate::effects::params::ParameterSet;
use crate::effects::transitions::Transition;
use crate::foundation::core::{Fps, Rgba8Premul};
use crate::foundation::error::MontageError;
use crate::foundation::time::TimeRange;
use crate::scene::media::{ImageItem, ShapeItem, ShapeKind};
use crate::scene::model::ClipFrame;

const SIZE: Size = Size::new(8, 8);
const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn solid(px: [u8; 4]) -> FrameRGBA {
    FrameRGBA::filled(
        SIZE,
        Rgba8Premul::from_straight_rgba(px[0], px[1], px[2], px[3]),
    )
}

fn resolver() -> Arc<MemoryAssetResolver> {
    Arc::new(
        MemoryAssetResolver::new()
            .with_image("red", solid(RED))
            .with_image("blue", solid(BLUE)),
    )
}

fn image_clip(id: &str, key: &str, start: i64, dur: i64) -> Clip {
    Clip::new(
        id,
        MediaItem::Image(ImageItem {
            raster_ref: key.into(),
            duration: Timestamp::seconds(dur),
        }),
        TimeRange::new(Timestamp::seconds(start), Timestamp::seconds(dur)).unwrap(),
        ClipFrame::full(SIZE),
    )
}

fn timeline() -> Timeline {
    Timeline::new("t", SIZE, Fps::new(30, 1).unwrap())
}

#[tokio::test]
async fn later_clip_in_track_is_on_top() {
    let tl = timeline().with_track(
        Track::new("v", TrackType::Video)
            .with_clip(image_clip("b", "blue", 0, 2))
            .with_clip(image_clip("r", "red", 0, 2)),
    );
    let out = Compositor::new(resolver())
        .compose(&tl, Timestamp::seconds(1))
        .await
        .unwrap();
    assert_eq!(out.pixel(4, 4), RED);
}

#[tokio::test]
async fn later_track_is_on_top_and_track_opacity_applies() {
    let tl = timeline()
        .with_track(Track::new("a", TrackType::Video).with_clip(image_clip("b", "blue", 0, 2)))
        .with_track(
            Track::new("b", TrackType::Overlay)
                .with_opacity(0.0)
                .with_clip(image_clip("r", "red", 0, 2)),
        );
    let out = Compositor::new(resolver())
        .compose(&tl, Timestamp::ZERO)
        .await
        .unwrap();
    assert_eq!(out.pixel(0, 0), BLUE);
}

#[tokio::test]
async fn inactive_and_zero_length_clips_show_background() {
    let bg = crate::foundation::core::Color::rgba(0.0, 1.0, 0.0, 1.0);
    let tl = timeline()
        .with_background(bg)
        .with_track(
            Track::new("v", TrackType::Video)
                .with_clip(image_clip("later", "red", 5, 1))
                .with_clip(image_clip("instant", "red", 0, 0)),
        );
    let out = Compositor::new(resolver())
        .compose(&tl, Timestamp::ZERO)
        .await
        .unwrap();
    assert_eq!(out.pixel(3, 3), [0, 255, 0, 255]);
}

#[tokio::test]
async fn missing_source_degrades_unless_strict() {
    let tl = timeline().with_track(
        Track::new("v", TrackType::Video)
            .with_clip(image_clip("ok", "blue", 0, 1))
            .with_clip(image_clip("gone", "missing", 0, 1)),
    );
    let out = Compositor::new(resolver())
        .compose(&tl, Timestamp::ZERO)
        .await
        .unwrap();
    assert_eq!(out.pixel(0, 0), BLUE);

    let strict = Compositor::new(resolver()).with_opts(CompositorOpts::default().with_strict(true));
    let err = strict.compose(&tl, Timestamp::ZERO).await.unwrap_err();
    assert!(matches!(err, MontageError::SourceUnavailable(_)));
}

#[tokio::test]
async fn clip_frame_positions_and_clips_to_canvas() {
    let mut clip = Clip::new(
        "sq",
        MediaItem::Shape(ShapeItem::filled(
            ShapeKind::Rectangle,
            crate::foundation::core::Color::WHITE,
        )),
        TimeRange::new(Timestamp::ZERO, Timestamp::seconds(1)).unwrap(),
        ClipFrame::new(6.0, 6.0, 10.0, 10.0),
    );
    clip.opacity = 1.0;
    let tl = timeline().with_track(Track::new("o", TrackType::Overlay).with_clip(clip));
    let out = Compositor::new(resolver())
        .compose(&tl, Timestamp::ZERO)
        .await
        .unwrap();
    assert_eq!(out.size(), SIZE);
    assert_eq!(out.pixel(7, 7), [255, 255, 255, 255]);
    assert_eq!(out.pixel(5, 5), [0, 0, 0, 255]);
}

#[tokio::test]
async fn effect_track_adjusts_everything_below() {
    let invert = Effect::filter(Filter::Invert, ParameterSet::new());
    let adjust = Clip::new(
        "fx",
        MediaItem::Shape(ShapeItem::filled(
            ShapeKind::Rectangle,
            crate::foundation::core::Color::CLEAR,
        )),
        TimeRange::new(Timestamp::ZERO, Timestamp::seconds(1)).unwrap(),
        ClipFrame::full(SIZE),
    )
    .with_effect(invert);
    let tl = timeline()
        .with_track(Track::new("v", TrackType::Video).with_clip(image_clip("r", "red", 0, 1)))
        .with_track(Track::new("fx", TrackType::Effect).with_clip(adjust));
    let out = Compositor::new(resolver())
        .compose(&tl, Timestamp::ZERO)
        .await
        .unwrap();
    assert_eq!(out.pixel(2, 2), [0, 255, 255, 255]);
}

#[tokio::test]
async fn crossfade_blends_into_next_clip() {
    let tr = Transition::new(TransitionKind::Crossfade, Timestamp::seconds(1)).unwrap();
    let tl = timeline().with_track(
        Track::new("v", TrackType::Video)
            .with_clip(image_clip("a", "red", 0, 2).with_transition(tr))
            .with_clip(image_clip("b", "blue", 2, 2)),
    );
    let c = Compositor::new(resolver());
    assert_eq!(c.compose(&tl, Timestamp::millis(500)).await.unwrap().pixel(1, 1), RED);
    let mid = c.compose(&tl, Timestamp::millis(1500)).await.unwrap().pixel(1, 1);
    assert!(mid[0] > 100 && mid[2] > 100, "{mid:?}");
    assert_eq!(c.compose(&tl, Timestamp::seconds(2)).await.unwrap().pixel(1, 1), BLUE);
}

#[tokio::test]
async fn overlapping_next_clip_is_drawn_once_during_transition() {
    let tr = Transition::new(TransitionKind::Crossfade, Timestamp::seconds(1)).unwrap();
    let tl = timeline().with_track(
        Track::new("v", TrackType::Video)
            .with_clip(image_clip("a", "red", 0, 2).with_transition(tr))
            .with_clip(image_clip("b", "blue", 1, 3)),
    );
    let c = Compositor::new(resolver());
    let mid = c.compose(&tl, Timestamp::millis(1500)).await.unwrap().pixel(1, 1);
    assert_eq!(mid, [127, 0, 128, 255]);
    assert_eq!(c.compose(&tl, Timestamp::millis(2500)).await.unwrap().pixel(1, 1), BLUE);
}

#[tokio::test]
async fn composition_is_deterministic() {
    let grain = Effect::filter(Filter::FilmGrain, ParameterSet::new());
    let tl = timeline().with_track(
        Track::new("v", TrackType::Video).with_clip(image_clip("r", "red", 0, 2).with_effect(grain)),
    );
    let c = Compositor::new(resolver());
    let t = Timestamp::millis(733);
    assert_eq!(
        c.compose(&tl, t).await.unwrap(),
        c.compose(&tl, t).await.unwrap()
    );
}

//! Montage is a timeline compositing and export engine.
//!
//! A [`Timeline`] holds ordered [`Track`]s of timed, positioned [`Clip`]s. The engine turns it
//! into output in three stages:
//!
//! - [`Compositor::compose`] renders the frame presented at any rational [`Timestamp`]
//! - [`AudioMixer::mix`] renders one PCM window across all audio tracks
//! - [`Exporter`] drives both into an [`EncoderSink`] with backpressure and progress reporting
//!
//! Visual effects form a small algebra ([`Effect`]): built-in filters, sequential and parallel
//! composition, time gates and keyframed parameters. Asset decoding and text layout are
//! supplied through the [`AssetResolver`] and [`TextRasterizer`] traits.
#![forbid(unsafe_code)]

mod animation;
mod assets;
mod audio;
mod effects;
mod encode;
mod export;
mod foundation;
mod render;
mod scene;

pub use crate::foundation::core::{
    Affine, BezPath, Color, Fps, Point, Rect, Rgba8Premul, Size, Vec2,
};
pub use crate::foundation::error::{MontageError, MontageResult};
pub use crate::foundation::time::{TimeRange, Timestamp, intersect, overlaps};

pub use crate::animation::keyframes::{
    Interpolation, Keyframe, interpolate, interpolate_float, validate_keyframes,
};

pub use crate::scene::media::{
    AudioItem, FontSpec, ImageItem, MediaItem, ShapeItem, ShapeKind, TextAlignment, TextBehavior,
    TextItem, TextShadow, TextStroke, VideoItem,
};
pub use crate::scene::model::{Clip, ClipFrame, ContentMode, Timeline, Track, TrackType};

pub use crate::effects::blur::gaussian_blur;
pub use crate::effects::builtin::Filter;
pub use crate::effects::composite::{crossfade, over};
pub use crate::effects::context::RenderContext;
pub use crate::effects::effect::{BlendFn, Effect, EffectChain, EffectOp, Gate, apply_chain};
pub use crate::effects::params::{ParamValue, ParameterSet};
pub use crate::effects::transitions::{Transition, TransitionKind, WipeDir};

pub use crate::assets::decode::decode_image;
pub use crate::assets::file::FileAssetResolver;
pub use crate::assets::media::VideoProbe;
pub use crate::assets::resolver::{AssetResolver, MemoryAssetResolver};
pub use crate::assets::text::{BlockTextRasterizer, GlyphMask, TextRasterizer};

pub use crate::render::compositor::{Compositor, CompositorOpts};
pub use crate::render::fit::{FitTransform, fit_into};
pub use crate::render::frame::FrameRGBA;

pub use crate::audio::mix::AudioMixer;
pub use crate::audio::pcm::{AudioFormat, PcmBuffer};

pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use crate::encode::sink::{
    EncoderSink, InMemorySink, MediaKind, PixelBuffer, RecordedFrame, RecordedWindow, SinkConfig,
    SinkStatus,
};

pub use crate::export::exporter::{ExportState, Exporter};
pub use crate::export::progress::{ProgressEmitter, ProgressEvent};
pub use crate::export::settings::{AudioSettings, ExportSettings, VideoSettings};

//! Media item descriptors.

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Color, Point};
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::time::Timestamp;

/// Source content of a clip, discriminated by `type` in JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MediaItem {
    /// Decoded video stream.
    Video(VideoItem),
    /// Still raster.
    Image(ImageItem),
    /// Rendered text run.
    Text(TextItem),
    /// Audio-only source.
    Audio(AudioItem),
    /// Generated vector shape.
    Shape(ShapeItem),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VideoItem {
    /// Asset reference handed to the resolver.
    pub source_ref: String,
    /// Advisory duration; decoded frames may end sooner.
    pub duration: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImageItem {
    /// Asset reference handed to the resolver.
    pub raster_ref: String,
    /// Advisory duration.
    pub duration: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AudioItem {
    /// Asset reference handed to the resolver.
    pub source_ref: String,
    /// Advisory duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Timestamp>,
}

/// Font selection for a text item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FontSpec {
    /// Family or PostScript name understood by the text rasterizer.
    pub name: String,
    /// Point size in output pixels.
    pub size: f32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

/// Outline drawn around the glyph coverage.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextStroke {
    pub color: Color,
    /// Outline width in pixels.
    pub width: f32,
}

/// Blurred drop shadow behind the glyphs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextShadow {
    pub color: Color,
    /// Offset in pixels.
    #[serde(default)]
    pub offset: Point,
    /// Blur radius in pixels.
    #[serde(default)]
    pub radius: f32,
}

/// Time-dependent text presentation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", deny_unknown_fields)]
pub enum TextBehavior {
    /// Fully visible for the whole clip.
    Static {},
    /// Opacity ramps from zero over `duration`.
    FadeIn {
        duration: Timestamp,
    },
    /// Characters appear progressively.
    #[serde(rename_all = "camelCase")]
    Typewriter {
        characters_per_second: f64,
    },
}

impl Default for TextBehavior {
    fn default() -> Self {
        Self::Static {}
    }
}

/// Horizontal alignment of text inside the clip frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextAlignment {
    Leading,
    #[default]
    Center,
    Trailing,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextItem {
    pub string: String,
    pub font: FontSpec,
    pub color: Color,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strokes: Vec<TextStroke>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<TextShadow>,
    #[serde(default)]
    pub behavior: TextBehavior,
    #[serde(default)]
    pub alignment: TextAlignment,
    /// Authoritative duration; nothing renders at or past it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Timestamp>,
}

impl TextItem {
    /// Plain static text.
    pub fn new(string: impl Into<String>, font: FontSpec, color: Color) -> Self {
        Self {
            string: string.into(),
            font,
            color,
            strokes: Vec::new(),
            shadow: None,
            behavior: TextBehavior::Static {},
            alignment: TextAlignment::Center,
            duration: None,
        }
    }

    /// The visible prefix and opacity multiplier at clip-local `elapsed`.
    pub fn visible_at(&self, elapsed: Timestamp) -> (&str, f32) {
        match self.behavior {
            TextBehavior::Static {} => (&self.string, 1.0),
            TextBehavior::FadeIn { duration } => {
                if duration.is_zero() || elapsed >= duration {
                    (&self.string, 1.0)
                } else {
                    (&self.string, elapsed.ratio(duration).clamp(0.0, 1.0) as f32)
                }
            }
            TextBehavior::Typewriter {
                characters_per_second,
            } => {
                let shown = (elapsed.seconds_f64() * characters_per_second).floor().max(0.0);
                let end = self
                    .string
                    .char_indices()
                    .nth(shown as usize)
                    .map_or(self.string.len(), |(i, _)| i);
                (&self.string[..end], 1.0)
            }
        }
    }
}

/// Geometric primitive of a shape item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeKind {
    Rectangle,
    RoundedRectangle,
    Ellipse,
    /// Isosceles triangle with its apex at the top center.
    Triangle,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShapeItem {
    pub kind: ShapeKind,
    pub fill_color: Color,
    #[serde(default = "clear")]
    pub stroke_color: Color,
    #[serde(default)]
    pub stroke_width: f32,
    /// Corner radius for rounded rectangles, in pixels.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub corner_radius: f64,
    /// Authoritative duration; nothing renders at or past it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Timestamp>,
}

fn clear() -> Color {
    Color::CLEAR
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

impl ShapeItem {
    /// Filled shape without an outline.
    pub fn filled(kind: ShapeKind, fill_color: Color) -> Self {
        Self {
            kind,
            fill_color,
            stroke_color: Color::CLEAR,
            stroke_width: 0.0,
            corner_radius: 0.0,
            duration: None,
        }
    }
}

impl MediaItem {
    /// Lower-case variant name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Video(_) => "video",
            Self::Image(_) => "image",
            Self::Text(_) => "text",
            Self::Audio(_) => "audio",
            Self::Shape(_) => "shape",
        }
    }

    /// Asset reference for resolver-backed items.
    pub fn asset_ref(&self) -> Option<&str> {
        match self {
            Self::Video(v) => Some(&v.source_ref),
            Self::Image(i) => Some(&i.raster_ref),
            Self::Audio(a) => Some(&a.source_ref),
            Self::Text(_) | Self::Shape(_) => None,
        }
    }

    /// Declared duration, advisory or authoritative depending on the variant.
    pub fn duration(&self) -> Option<Timestamp> {
        match self {
            Self::Video(v) => Some(v.duration),
            Self::Image(i) => Some(i.duration),
            Self::Audio(a) => a.duration,
            Self::Text(t) => t.duration,
            Self::Shape(s) => s.duration,
        }
    }

    /// Return `true` if the item produces pixels.
    pub fn is_visual(&self) -> bool {
        !matches!(self, Self::Audio(_))
    }

    /// Return `true` if the item produces samples.
    pub fn is_audible(&self) -> bool {
        matches!(self, Self::Audio(_) | Self::Video(_))
    }

    /// Whether an authoritative duration still covers clip-local `elapsed`.
    pub fn renders_at(&self, elapsed: Timestamp) -> bool {
        match self {
            Self::Text(TextItem {
                duration: Some(d), ..
            })
            | Self::Shape(ShapeItem {
                duration: Some(d), ..
            }) => elapsed < *d,
            _ => true,
        }
    }

    pub(crate) fn validate(&self) -> MontageResult<()> {
        match self {
            Self::Text(t) => {
                if !(t.font.size.is_finite() && t.font.size > 0.0) {
                    return Err(MontageError::validation("text font size must be > 0"));
                }
                if let TextBehavior::Typewriter {
                    characters_per_second,
                } = t.behavior
                    && !(characters_per_second.is_finite() && characters_per_second > 0.0)
                {
                    return Err(MontageError::validation(
                        "typewriter characters per second must be > 0",
                    ));
                }
                if t.strokes.iter().any(|s| !(s.width >= 0.0)) {
                    return Err(MontageError::validation("text stroke width must be >= 0"));
                }
            }
            Self::Shape(s) => {
                if !(s.stroke_width >= 0.0) || !(s.corner_radius >= 0.0) {
                    return Err(MontageError::validation(
                        "shape stroke width and corner radius must be >= 0",
                    ));
                }
            }
            Self::Video(_) | Self::Image(_) | Self::Audio(_) => {
                if self.asset_ref().is_some_and(|r| r.trim().is_empty()) {
                    return Err(MontageError::validation(format!(
                        "{} item has an empty asset reference",
                        self.kind_name()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/media.rs"]
mod tests;

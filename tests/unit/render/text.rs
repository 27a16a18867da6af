use super::*;
use crate::assets::text::BlockTextRasterizer;
use crate::foundation::core::Point;
use crate::scene::media::{FontSpec, TextBehavior, TextShadow, TextStroke};

fn item(s: &str) -> TextItem {
    TextItem::new(
        s,
        FontSpec {
            name: "Block".into(),
            size: 4.0,
            bold: false,
            italic: false,
        },
        Color::WHITE,
    )
}

#[test]
fn centered_block_text_fills_middle() {
    let out = render_text(&item("a"), Timestamp::ZERO, Size::new(10, 10), &BlockTextRasterizer)
        .unwrap();
    assert_eq!(out.pixel(4, 4), [255, 255, 255, 255]);
    assert_eq!(out.pixel(0, 0), [0, 0, 0, 0]);
}

#[test]
fn stroke_surrounds_fill() {
    let mut t = item("a");
    t.strokes.push(TextStroke {
        color: Color::rgba(1.0, 0.0, 0.0, 1.0),
        width: 1.0,
    });
    let out = render_text(&t, Timestamp::ZERO, Size::new(10, 10), &BlockTextRasterizer).unwrap();
    assert_eq!(out.pixel(4, 4), [255, 255, 255, 255]);
    assert_eq!(out.pixel(4, 2), [255, 0, 0, 255]);
}

#[test]
fn shadow_is_drawn_behind_at_offset() {
    let mut t = item("a");
    t.shadow = Some(TextShadow {
        color: Color::BLACK,
        offset: Point::new(3.0, 0.0),
        radius: 0.0,
    });
    let out = render_text(&t, Timestamp::ZERO, Size::new(10, 10), &BlockTextRasterizer).unwrap();
    assert_eq!(out.pixel(7, 4), [0, 0, 0, 255]);
    assert_eq!(out.pixel(4, 4), [255, 255, 255, 255]);
}

#[test]
fn fade_in_starts_invisible() {
    let mut t = item("a");
    t.behavior = TextBehavior::FadeIn {
        duration: Timestamp::seconds(1),
    };
    let out = render_text(&t, Timestamp::ZERO, Size::new(10, 10), &BlockTextRasterizer).unwrap();
    assert!(out.data.iter().all(|v| *v == 0));
}

use super::*;
use crate::foundation::core::Color;

#[test]
fn rectangle_fills_everything() {
    let item = ShapeItem::filled(ShapeKind::Rectangle, Color::rgba(0.0, 0.0, 1.0, 1.0));
    let out = render_shape(&item, Size::new(6, 4));
    assert!(out.data.chunks_exact(4).all(|p| p == [0, 0, 255, 255]));
}

#[test]
fn ellipse_leaves_corners_empty() {
    let item = ShapeItem::filled(ShapeKind::Ellipse, Color::WHITE);
    let out = render_shape(&item, Size::new(16, 16));
    assert_eq!(out.pixel(0, 0), [0, 0, 0, 0]);
    assert_eq!(out.pixel(8, 8), [255, 255, 255, 255]);
    assert!(out.pixel(0, 8)[3] > 0);
}

#[test]
fn triangle_apex_at_top_center() {
    let item = ShapeItem::filled(ShapeKind::Triangle, Color::WHITE);
    let out = render_shape(&item, Size::new(16, 16));
    assert_eq!(out.pixel(0, 0)[3], 0);
    assert_eq!(out.pixel(15, 0)[3], 0);
    assert_eq!(out.pixel(8, 15)[3], 255);
}

#[test]
fn stroke_draws_outline_over_fill() {
    let mut item = ShapeItem::filled(ShapeKind::Rectangle, Color::rgba(0.0, 1.0, 0.0, 1.0));
    item.stroke_color = Color::rgba(1.0, 0.0, 0.0, 1.0);
    item.stroke_width = 2.0;
    let out = render_shape(&item, Size::new(12, 12));
    assert_eq!(out.pixel(0, 6), [255, 0, 0, 255]);
    assert_eq!(out.pixel(6, 6), [0, 255, 0, 255]);
}

#[test]
fn empty_size_renders_nothing() {
    let item = ShapeItem::filled(ShapeKind::Ellipse, Color::WHITE);
    assert!(render_shape(&item, Size::new(0, 5)).data.is_empty());
}

use super::*;
use crate::foundation::core::{Fps, Size};
use crate::foundation::error::MontageError;

fn ctx() -> RenderContext {
    RenderContext::new(Size::new(4, 4), Fps { num: 30, den: 1 }, Timestamp::ZERO)
        .with_clip_duration(Timestamp::seconds(10))
}

fn gradient() -> FrameRGBA {
    let mut f = FrameRGBA::transparent(Size::new(4, 4));
    for y in 0..4 {
        for x in 0..4 {
            let v = (x * 60 + y * 3) as u8;
            f.set_pixel(x, y, [v, 255 - v, 40, 255]);
        }
    }
    f
}

fn brightness(amount: f64) -> Effect {
    Effect::filter(
        Filter::Brightness,
        ParameterSet::new().with("amount", ParamValue::Float(amount)),
    )
}

fn invert() -> Effect {
    Effect::filter(Filter::Invert, ParameterSet::new())
}

#[test]
fn sequential_equals_nested_application() {
    let f = gradient();
    let (a, b) = (brightness(0.2), invert());
    let composed = Effect::sequential(a.clone(), b.clone());
    let t = Timestamp::millis(250);
    let expected = b.apply(&a.apply(&f, t, &ctx()).unwrap(), t, &ctx()).unwrap();
    assert_eq!(composed.apply(&f, t, &ctx()).unwrap(), expected);
}

#[test]
fn parallel_applies_both_to_same_input() {
    let f = gradient();
    let (a, b) = (brightness(0.2), invert());
    let blend = BlendFn::Average;
    let composed = Effect::parallel(a.clone(), b.clone(), blend.clone());
    let t = Timestamp::ZERO;
    let fa = a.apply(&f, t, &ctx()).unwrap();
    let fb = b.apply(&f, t, &ctx()).unwrap();
    let expected = blend.combine(&fa, &fb).unwrap();
    assert_eq!(composed.apply(&f, t, &ctx()).unwrap(), expected);
}

#[test]
fn time_gate_passes_through_outside_window() {
    let f = gradient();
    let range = TimeRange::new(Timestamp::seconds(1), Timestamp::seconds(1)).unwrap();
    let gated = Effect::time_gated(invert(), Gate::Within(range));
    let inside = Timestamp::millis(1500);
    assert_eq!(gated.apply(&f, Timestamp::ZERO, &ctx()).unwrap(), f);
    assert_eq!(gated.apply(&f, Timestamp::seconds(2), &ctx()).unwrap(), f);
    assert_eq!(
        gated.apply(&f, inside, &ctx()).unwrap(),
        invert().apply(&f, inside, &ctx()).unwrap()
    );
}

#[test]
fn before_and_after_gates_split_at_boundary() {
    let c = ctx();
    let at = Timestamp::seconds(2);
    assert!(Gate::Before(at).holds(Timestamp::millis(1999), &c));
    assert!(!Gate::Before(at).holds(at, &c));
    assert!(Gate::After(at).holds(at, &c));
    assert!(Gate::custom(|t, _| t.is_zero()).holds(Timestamp::ZERO, &c));
}

#[test]
fn keyframed_overrides_base_parameters() {
    let f = gradient();
    let keys = vec![
        Keyframe::new(
            Timestamp::ZERO,
            ParameterSet::new().with("amount", ParamValue::Float(0.0)),
        ),
        Keyframe::new(
            Timestamp::seconds(2),
            ParameterSet::new().with("amount", ParamValue::Float(0.4)),
        ),
    ];
    let animated = Effect::keyframed(brightness(0.9), keys, Interpolation::Linear).unwrap();
    let mid = Timestamp::seconds(1);
    assert_eq!(
        animated.apply(&f, mid, &ctx()).unwrap(),
        brightness(0.2).apply(&f, mid, &ctx()).unwrap()
    );
    assert_eq!(animated.apply(&f, Timestamp::ZERO, &ctx()).unwrap(), f);
}

#[test]
fn keyframed_rejects_unsorted_keys() {
    let keys = vec![
        Keyframe::new(Timestamp::seconds(2), ParameterSet::new()),
        Keyframe::new(Timestamp::seconds(1), ParameterSet::new()),
    ];
    assert!(Effect::keyframed(invert(), keys, Interpolation::Hold).is_err());
}

#[test]
fn application_is_deterministic() {
    let f = gradient();
    let grain = Effect::filter(Filter::FilmGrain, ParameterSet::new());
    let t = Timestamp::millis(1234);
    assert_eq!(
        grain.apply(&f, t, &ctx()).unwrap(),
        grain.apply(&f, t, &ctx()).unwrap()
    );
}

#[test]
fn bounds_changing_filter_fails() {
    let grow = Effect::custom("grow", ParameterSet::new(), |frame, _, _, _| {
        Ok(FrameRGBA::transparent(Size::new(
            frame.width + 2,
            frame.height,
        )))
    });
    let err = grow
        .apply(&gradient(), Timestamp::ZERO, &ctx())
        .unwrap_err();
    assert!(matches!(err, MontageError::EffectFailure(_)));
}

#[test]
fn framing_custom_effect_is_recropped() {
    let grow = Effect::custom_framing("zoom", ParameterSet::new(), |frame, _, _, _| {
        Ok(FrameRGBA::transparent(Size::new(
            frame.width * 2,
            frame.height * 2,
        )))
    });
    let out = grow.apply(&gradient(), Timestamp::ZERO, &ctx()).unwrap();
    assert_eq!(out.size(), Size::new(4, 4));
}

#[test]
fn empty_chain_is_identity() {
    let f = gradient();
    let id = EffectChain::new().build();
    assert_eq!(id.apply(&f, Timestamp::ZERO, &ctx()).unwrap(), f);
}

#[test]
fn chain_builder_matches_sequential() {
    let f = gradient();
    let chain = EffectChain::new().then(brightness(0.1)).then(invert()).build();
    let seq = Effect::sequential(brightness(0.1), invert());
    assert_eq!(
        chain.apply(&f, Timestamp::ZERO, &ctx()).unwrap(),
        seq.apply(&f, Timestamp::ZERO, &ctx()).unwrap()
    );
    assert_eq!(chain.id(), "brightness>invert");
}

#[test]
fn custom_blend_sees_premultiplied_pixels() {
    let f = FrameRGBA::filled(
        Size::new(1, 1),
        crate::foundation::core::Rgba8Premul::from_straight_rgba(255, 0, 0, 255),
    );
    let take_second = BlendFn::custom(|_, b| b);
    let out = take_second.combine(&f, &FrameRGBA::transparent(Size::new(1, 1))).unwrap();
    assert_eq!(out.pixel(0, 0), [0, 0, 0, 0]);
}

#[test]
fn json_roundtrip_of_composite() {
    let e = Effect::parallel(
        brightness(0.25),
        Effect::time_gated(invert(), Gate::After(Timestamp::seconds(1))),
        BlendFn::Screen,
    );
    let s = serde_json::to_string(&e).unwrap();
    let back: Effect = serde_json::from_str(&s).unwrap();
    let f = gradient();
    let t = Timestamp::seconds(3);
    assert_eq!(back.id(), e.id());
    assert_eq!(
        back.apply(&f, t, &ctx()).unwrap(),
        e.apply(&f, t, &ctx()).unwrap()
    );
}

#[test]
fn custom_effects_do_not_serialize() {
    let e = Effect::custom("noop", ParameterSet::new(), |f, _, _, _| Ok(f.clone()));
    assert!(serde_json::to_string(&e).is_err());
}

#[test]
fn validate_rejects_unsorted_keyframes_anywhere_in_tree() {
    let json = r#"{
        "id": "fade",
        "operation": { "keyframed": {
            "base": { "id": "brightness", "operation": { "filter": "brightness" } },
            "keyframes": [
                { "time": { "seconds": 2.0, "preferredTimescale": 600 },
                  "values": { "amount": { "type": "float", "value": 1.0 } } },
                { "time": { "seconds": 0.0, "preferredTimescale": 600 },
                  "values": { "amount": { "type": "float", "value": 0.0 } } }
            ],
            "interpolation": "linear"
        } }
    }"#;
    let unsorted: Effect = serde_json::from_str(json).unwrap();
    let err = unsorted.validate().unwrap_err();
    assert!(matches!(err, MontageError::Validation(_)), "{err}");

    let nested = Effect::sequential(invert(), unsorted);
    assert!(nested.validate().is_err());
    assert!(Effect::time_gated(brightness(0.1), Gate::Before(Timestamp::seconds(1)))
        .validate()
        .is_ok());
}

#[test]
fn operation_objects_are_closed() {
    let json = r#"{
        "id": "mix",
        "operation": { "parallel": {
            "first": { "id": "invert", "operation": { "filter": "invert" } },
            "second": { "id": "invert", "operation": { "filter": "invert" } },
            "blend": "average",
            "bogus": 1
        } }
    }"#;
    assert!(serde_json::from_str::<Effect>(json).is_err());
}

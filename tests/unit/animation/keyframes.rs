use super::*;

fn key(ms: i64, amount: f64) -> Keyframe {
    Keyframe::new(
        Timestamp::millis(ms),
        ParameterSet::new().with("amount", ParamValue::Float(amount)),
    )
}

fn keys() -> Vec<Keyframe> {
    vec![key(1000, 0.0), key(2000, 1.0), key(4000, 0.5)]
}

#[test]
fn exact_at_keyframe_times() {
    let k = keys();
    for kf in &k {
        assert_eq!(interpolate(&k, kf.time, Interpolation::Linear), kf.values);
        assert_eq!(interpolate(&k, kf.time, Interpolation::EaseInOut), kf.values);
    }
}

#[test]
fn linear_between_keys_is_exact_blend() {
    let k = keys();
    let v = interpolate_float(&k, "amount", Timestamp::millis(1250), Interpolation::Linear);
    assert_eq!(v, Some(0.25));
    let v = interpolate_float(&k, "amount", Timestamp::millis(3000), Interpolation::Linear);
    assert_eq!(v, Some(0.75));
}

#[test]
fn clamps_outside_the_keyed_span() {
    let k = keys();
    assert_eq!(
        interpolate_float(&k, "amount", Timestamp::ZERO, Interpolation::Linear),
        Some(0.0)
    );
    assert_eq!(
        interpolate_float(&k, "amount", Timestamp::seconds(60), Interpolation::Linear),
        Some(0.5)
    );
}

#[test]
fn hold_keeps_previous_value() {
    let k = keys();
    assert_eq!(
        interpolate_float(&k, "amount", Timestamp::millis(1999), Interpolation::Hold),
        Some(0.0)
    );
}

#[test]
fn empty_keys_yield_no_overrides() {
    assert!(interpolate(&[], Timestamp::ZERO, Interpolation::Linear).is_empty());
}

#[test]
fn unsorted_keys_are_rejected() {
    assert!(validate_keyframes(&[key(2000, 0.0), key(1000, 1.0)]).is_err());
    assert!(validate_keyframes(&keys()).is_ok());
}

#[test]
fn ease_in_out_fixes_endpoints_and_midpoint() {
    let e = Interpolation::EaseInOut;
    assert_eq!(e.progress(0.0), 0.0);
    assert_eq!(e.progress(1.0), 1.0);
    assert!((e.progress(0.5) - 0.5).abs() < 1e-12);
    assert!(e.progress(0.25) < 0.25);
    assert!(e.progress(0.75) > 0.75);
}

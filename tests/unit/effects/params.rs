use super::*;

#[test]
fn lookups_fall_back_to_default() {
    let p = ParameterSet::new()
        .with("amount", ParamValue::String("lots".into()))
        .with("radius", ParamValue::Int(3));
    assert_eq!(p.float("amount", 0.25), 0.25);
    assert_eq!(p.float("radius", 0.0), 3.0);
    assert_eq!(p.float("missing", 1.5), 1.5);
    assert!(p.bool("missing", true));
    assert_eq!(p.string("amount", "none"), "lots");
}

#[test]
fn merged_overrides_win() {
    let base = ParameterSet::new()
        .with("a", ParamValue::Float(1.0))
        .with("b", ParamValue::Float(2.0));
    let over = ParameterSet::new().with("b", ParamValue::Float(5.0));
    let m = base.merged(&over);
    assert_eq!(m.float("a", 0.0), 1.0);
    assert_eq!(m.float("b", 0.0), 5.0);
    assert_eq!(base.float("b", 0.0), 2.0);
}

#[test]
fn lerp_numeric_and_step_discrete() {
    assert_eq!(
        ParamValue::Float(0.0).lerp(&ParamValue::Float(10.0), 0.25),
        ParamValue::Float(2.5)
    );
    let a = ParamValue::Bool(false);
    let b = ParamValue::Bool(true);
    assert_eq!(a.lerp(&b, 0.99), a);
    assert_eq!(a.lerp(&b, 1.0), b);
}

#[test]
fn json_values_are_tagged() {
    let p = ParameterSet::new().with("amount", ParamValue::Float(0.5));
    let json = serde_json::to_value(&p).unwrap();
    assert_eq!(json["amount"]["type"], "float");
    assert_eq!(json["amount"]["value"], 0.5);

    let back: ParameterSet = serde_json::from_value(json).unwrap();
    assert_eq!(back, p);
}

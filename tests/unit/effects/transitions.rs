use super::*;

#[test]
fn progress_is_active_only_in_tail() {
    let tr = Transition::new(TransitionKind::Crossfade, Timestamp::seconds(1)).unwrap();
    assert_eq!(tr.progress(Timestamp::seconds(2)), None);
    assert_eq!(tr.progress(Timestamp::seconds(1)), Some(0.0));
    assert_eq!(tr.progress(Timestamp::millis(500)), Some(0.5));
    assert_eq!(tr.progress(Timestamp::ZERO), Some(1.0));
}

#[test]
fn rejects_non_positive_duration() {
    assert!(Transition::new(TransitionKind::FadeToBlack, Timestamp::ZERO).is_err());
    assert!(
        Transition::new(
            TransitionKind::Wipe {
                direction: WipeDir::TopToBottom,
                soft_edge: 2.0
            },
            Timestamp::seconds(1)
        )
        .is_err()
    );
}

#[test]
fn json_shape_is_flat() {
    let tr: Transition = serde_json::from_str(
        r#"{"kind":"wipe","direction":"rightToLeft","softEdge":0.1,
            "duration":{"seconds":0.5,"preferredTimescale":600}}"#,
    )
    .unwrap();
    assert_eq!(
        tr.kind,
        TransitionKind::Wipe {
            direction: WipeDir::RightToLeft,
            soft_edge: 0.1
        }
    );
    assert_eq!(tr.duration, Timestamp::millis(500));
}

#[test]
fn json_objects_are_closed() {
    let extra = r#"{"kind":"crossfade","bogus":1,
        "duration":{"seconds":0.5,"preferredTimescale":600}}"#;
    assert!(serde_json::from_str::<Transition>(extra).is_err());

    let stray_direction = r#"{"kind":"fadeToBlack","direction":"leftToRight",
        "duration":{"seconds":0.5,"preferredTimescale":600}}"#;
    assert!(serde_json::from_str::<Transition>(stray_direction).is_err());
}

#[test]
fn serializes_only_fields_of_its_kind() {
    let fade = Transition::new(TransitionKind::FadeToBlack, Timestamp::seconds(1)).unwrap();
    let v = serde_json::to_value(fade).unwrap();
    assert_eq!(v["kind"], "fadeToBlack");
    assert!(v.get("direction").is_none());

    let wipe = Transition::new(
        TransitionKind::Wipe {
            direction: WipeDir::BottomToTop,
            soft_edge: 0.25,
        },
        Timestamp::seconds(1),
    )
    .unwrap();
    let back: Transition = serde_json::from_value(serde_json::to_value(wipe).unwrap()).unwrap();
    assert_eq!(back, wipe);
}

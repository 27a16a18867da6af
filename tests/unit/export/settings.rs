use super::*;

#[test]
fn defaults() {
    let s = ExportSettings::default();
    assert_eq!(s.audio, Some(AudioSettings::default()));
    assert_eq!(s.audio.unwrap().window_samples, 4096);
    assert_eq!(s.audio.unwrap().format().unwrap(), AudioFormat::STEREO_48K);
    assert_eq!(s.poll_interval(), Duration::from_millis(2));
    assert!(s.background_flatten);
    assert!(s.limiter_ceiling.is_none());
    s.validate().unwrap();
}

#[test]
fn json_fills_absent_fields() {
    let s = ExportSettings::from_json_str(
        r#"{"video":{"frameRate":24},"limiterCeiling":0.9,"pollIntervalMs":5}"#,
    )
    .unwrap();
    assert_eq!(s.video.frame_rate, Some(Fps { num: 24, den: 1 }));
    assert_eq!(s.limiter_ceiling, Some(0.9));
    assert_eq!(s.poll_interval_ms, 5);
    assert_eq!(s.progress_capacity, 64);
    assert!(s.audio.is_some());
}

#[test]
fn null_audio_disables_audio() {
    let s = ExportSettings::from_json_str(r#"{"audio":null}"#).unwrap();
    assert!(s.audio.is_none());
}

#[test]
fn unknown_fields_are_format_errors() {
    let err = ExportSettings::from_json_str(r#"{"codec":"vp9"}"#).unwrap_err();
    assert!(matches!(err, MontageError::FormatError(_)));
}

#[test]
fn invalid_values_rejected() {
    let bad_window = ExportSettings::default()
        .with_audio(Some(AudioSettings::default().with_window_samples(0)));
    assert!(bad_window.validate().is_err());

    let bad_limiter = ExportSettings::default().with_limiter_ceiling(Some(-1.0));
    assert!(bad_limiter.validate().is_err());

    let bad_capacity = ExportSettings::default().with_progress_capacity(0);
    assert!(bad_capacity.validate().is_err());

    let err = ExportSettings::from_json_str(r#"{"audio":{"channels":0}}"#).unwrap_err();
    assert!(matches!(err, MontageError::FormatError(_)));
}

#[test]
fn builders_compose() {
    let s = ExportSettings::default()
        .with_video(VideoSettings::default().with_frame_rate(Fps { num: 60, den: 1 }))
        .with_audio(Some(
            AudioSettings::default().with_format(AudioFormat::new(44_100, 1).unwrap()),
        ))
        .with_poll_interval_ms(0)
        .with_background_flatten(false);
    assert_eq!(s.video.frame_rate.unwrap().num, 60);
    assert_eq!(s.audio.unwrap().sample_rate, 44_100);
    assert!(s.poll_interval().is_zero());
    assert!(!s.background_flatten);
}

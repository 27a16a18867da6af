use super::*;

#[test]
fn probe_report_picks_first_stream_of_kind() {
    let json = br#"{"streams":[
        {"codec_type":"audio"},
        {"codec_type":"video","width":640,"height":360},
        {"codec_type":"video","width":1,"height":1}
    ]}"#;
    let report: ProbeReport = serde_json::from_slice(json).unwrap();
    let v = report.first("video").unwrap();
    assert_eq!((v.width, v.height), (Some(640), Some(360)));
    assert!(report.first("audio").is_some());
    assert!(report.first("subtitle").is_none());
}

#[test]
fn probe_report_tolerates_missing_streams() {
    let report: ProbeReport = serde_json::from_slice(b"{}").unwrap();
    assert!(report.first("video").is_none());
}

#[test]
fn seconds_are_clamped_and_fixed_precision() {
    assert_eq!(secs_arg(-1.0), "0.000000000");
    assert_eq!(secs_arg(1.5), "1.500000000");
}

#[test]
fn missing_audio_stream_is_recognized() {
    assert!(has_no_audio_stream(
        "Stream map '0:a' matches no streams."
    ));
    assert!(has_no_audio_stream(
        "Output file #0 does not contain any stream"
    ));
    assert!(!has_no_audio_stream("Invalid data found when processing input"));
}

#[test]
fn frame_len_is_rgba() {
    let probe = VideoProbe {
        source_path: PathBuf::from("clip.mp4"),
        width: 4,
        height: 3,
        has_audio: false,
    };
    assert_eq!(probe.frame_len(), 48);
}

#[cfg(not(feature = "media-ffmpeg"))]
#[test]
fn decoding_requires_feature() {
    let err = probe_video(Path::new("clip.mp4")).unwrap_err();
    assert!(matches!(err, MontageError::SourceUnavailable(_)));

    let format = AudioFormat::new(48_000, 2).unwrap();
    let err = decode_audio_window(Path::new("clip.mp4"), format, 0.0, 1.0).unwrap_err();
    assert!(matches!(err, MontageError::SourceUnavailable(_)));
}

#[cfg(feature = "media-ffmpeg")]
#[test]
fn probing_missing_file_fails() {
    let err = probe_video(Path::new("/nonexistent/montage/clip.mp4")).unwrap_err();
    assert!(matches!(
        err,
        MontageError::InvalidFile(_) | MontageError::SourceUnavailable(_)
    ));
}

use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        MontageError::invalid_file("x")
            .to_string()
            .contains("invalid file:")
    );
    assert!(
        MontageError::source_unavailable("x")
            .to_string()
            .contains("source unavailable:")
    );
    assert!(
        MontageError::effect_failure("x")
            .to_string()
            .contains("effect failure:")
    );
    assert!(
        MontageError::export_failed("x")
            .to_string()
            .contains("export failed:")
    );
    assert!(MontageError::format("x").to_string().contains("format error:"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = MontageError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert!(err.is_fatal_for_export());
}

#[test]
fn serde_errors_become_format_errors() {
    let err: MontageError = serde_json::from_str::<u32>("\"nope\"").unwrap_err().into();
    assert!(matches!(err, MontageError::FormatError(_)));
}

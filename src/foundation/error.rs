/// Convenience result type used across Montage.
pub type MontageResult<T> = Result<T, MontageError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum MontageError {
    /// A source asset exists but could not be read or decoded.
    #[error("invalid file: {0}")]
    InvalidFile(String),

    /// The asset resolver could not produce a frame or PCM buffer.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// A filter or effect backend failed, or an effect broke the bounds contract.
    #[error("effect failure: {0}")]
    EffectFailure(String),

    /// The encoder sink failed or could not be started.
    #[error("export failed: {0}")]
    ExportFailed(String),

    /// A serialized timeline violates the document schema.
    #[error("format error: {0}")]
    FormatError(String),

    /// Invalid caller-provided values.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MontageError {
    /// Build a [`MontageError::InvalidFile`] value.
    pub fn invalid_file(msg: impl Into<String>) -> Self {
        Self::InvalidFile(msg.into())
    }

    /// Build a [`MontageError::SourceUnavailable`] value.
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Build a [`MontageError::EffectFailure`] value.
    pub fn effect_failure(msg: impl Into<String>) -> Self {
        Self::EffectFailure(msg.into())
    }

    /// Build a [`MontageError::ExportFailed`] value.
    pub fn export_failed(msg: impl Into<String>) -> Self {
        Self::ExportFailed(msg.into())
    }

    /// Build a [`MontageError::FormatError`] value.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::FormatError(msg.into())
    }

    /// Build a [`MontageError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Return `true` for errors that must abort an export rather than degrade one clip.
    pub fn is_fatal_for_export(&self) -> bool {
        matches!(self, Self::ExportFailed(_) | Self::Other(_))
    }
}

impl From<serde_json::Error> for MontageError {
    fn from(e: serde_json::Error) -> Self {
        Self::FormatError(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

use thiserror::Error;

/// Errors produced anywhere in the effect pipeline.
///
/// Validation failures leave every buffer untouched. Decode, render and
/// encode failures abort the apply before anything reaches edit history.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FxError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("unknown effect '{0}'")]
    UnknownEffect(String),
    #[error("could not decode audio: {0}")]
    Decode(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("could not encode audio: {0}")]
    Encode(String),
    #[error("another effect is still being applied to this buffer")]
    Busy,
    #[error("apply was cancelled")]
    Cancelled,
}

impl FxError {
    pub fn validation(message: impl Into<String>) -> Self {
        FxError::Validation(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        FxError::Decode(message.into())
    }

    pub fn render(message: impl Into<String>) -> Self {
        FxError::Render(message.into())
    }

    pub fn encode(message: impl Into<String>) -> Self {
        FxError::Encode(message.into())
    }

    /// True for failures caused by the caller's region or parameters.
    pub fn is_validation(&self) -> bool {
        matches!(self, FxError::Validation(_) | FxError::UnknownEffect(_))
    }
}

/// A failed apply, reported as one message naming the effect.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{effect}: {source}")]
pub struct ApplyError {
    pub effect: String,
    #[source]
    pub source: FxError,
}

impl ApplyError {
    pub fn new(effect: impl Into<String>, source: FxError) -> Self {
        ApplyError {
            effect: effect.into(),
            source,
        }
    }
}

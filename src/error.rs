use thiserror::Error;

/// Errors from the configuration token codec.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Malformed configuration token: {0}")]
    Malformed(String),
}

/// Errors from the model engine collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Customization failed: {0}")]
    CustomizeFailed(String),

    #[error("Engine call timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Errors from the preset store collaborator.
///
/// Out-of-range parameter values never appear here: validation is absorbed
/// by clamping so the control surface stays interactable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Preset is not owned by the caller")]
    Forbidden,

    #[error("Preset name must not be empty")]
    InvalidName,

    #[error("Store error: {0}")]
    Backend(String),
}

impl From<EngineError> for String {
    fn from(err: EngineError) -> Self {
        err.to_string()
    }
}

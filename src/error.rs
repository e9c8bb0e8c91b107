use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkipperError {
    #[error("No video element found after {0} attempt(s)")]
    VideoNotFound(u32),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Player control surface failed: {0}")]
    ControlSurface(String),

    #[error("Playback position update failed: {0}")]
    NativeMutation(String),

    #[error("Frame content is not accessible: {0}")]
    CrossOriginDenied(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Page snapshot error: {0}")]
    Snapshot(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Native message error: {0}")]
    NativeMessage(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SkipperError>;

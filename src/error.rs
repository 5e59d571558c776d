//! Error types for the render/encode/publish pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur anywhere in the pipeline
///
/// Every stage fails the whole request; there is no partial success.
#[derive(Error, Debug)]
pub enum Error {
    /// Empty/missing text or a malformed request body
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The rendering session could not be started
    #[error("Rendering engine unavailable: {0}")]
    RenderEngineUnavailable(String),

    /// Content did not finish loading in time
    #[error("Render did not settle within {0}ms")]
    RenderTimeout(u64),

    /// Render target missing or snapshot extraction failed
    #[error("Capture failed: {0}")]
    CaptureFailure(String),

    /// Frame decode mismatch or encoder-reported error
    #[error("Encoding failed: {0}")]
    EncodingFailure(String),

    /// Non-success response (or transport error) from the object store
    #[error("Upload failed: {0}")]
    UploadFailure(String),

    /// The remote render API answered with an error
    #[error("Render API error ({status}): {message}")]
    RenderApi { status: u16, message: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// HTTP status used when this error is reported by the render API.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::RenderApi { status, .. } => *status,
            _ => 500,
        }
    }

    /// Whether the caller is at fault (no point retrying the same request).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}

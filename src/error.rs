use thiserror::Error;

/// Every way a fetch cycle can end without an image.
///
/// The type is `Clone` so a failure can be held inside [`crate::LoadState`]
/// and handed to any number of observers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("Client not found. The URL might be invalid.")]
    ClientNotConfigured,

    #[error("The response did not contain any images.")]
    NoImagesReturned,

    #[error("Unable to create image from the provided data. ({0})")]
    ImageConstructionFailed(String),

    #[error("HTTP status error: {0}.")]
    HttpStatus(String),

    #[error("{0}")]
    Transport(String),

    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Superseded or detached. Never published as a failure.
    #[error("The image request was cancelled.")]
    Cancelled,
}

impl ImageError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ImageError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, ImageError>;

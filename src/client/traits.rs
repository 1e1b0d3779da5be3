use crate::{
    error::Result,
    models::{GeneratedImage, ImageModel, ImageSize},
};
use async_trait::async_trait;
use reqwest::Url;

/// Produces one image for one prompt. Implementations keep no state between
/// calls; the controller decides which result is current.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, prompt: &str, size: ImageSize, model: ImageModel)
        -> Result<GeneratedImage>;
}

/// Why a POST did not produce a success body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// The server answered with a non-2xx status.
    Status { code: u16, body: Option<Vec<u8>> },
    /// DNS, connect, TLS, request construction and everything else.
    Other(String),
}

/// One JSON POST round trip. Returns the raw success body.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(
        &self,
        url: Url,
        body: Vec<u8>,
        headers: Vec<(String, String)>,
    ) -> std::result::Result<Vec<u8>, TransportFailure>;
}

/// Turns the decoded bytes into whatever the host renders.
pub trait ImageDecoder: Send + Sync {
    fn materialize(&self, bytes: Vec<u8>) -> Result<GeneratedImage>;
}

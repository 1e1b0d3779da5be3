use crate::{
    client::{
        decoder::RasterDecoder,
        traits::{HttpTransport, ImageDecoder, ImageLoader, TransportFailure},
        transport::ReqwestTransport,
    },
    config::EndpointConfig,
    error::{ImageError, Result},
    logger,
    models::{
        ApiErrorEnvelope, GeneratedImage, GenerationRequest, GenerationResponse, ImageModel,
        ImageSize,
    },
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Url;
use std::sync::Arc;
use uuid::Uuid;

pub const MAX_PROMPT_CHARS: usize = 1000;

const UNDECODABLE_BODY: &str = "Unable to decode data";

#[derive(Clone)]
struct Route {
    transport: Arc<dyn HttpTransport>,
    url: Url,
}

/// Default [`ImageLoader`]: one POST to the images endpoint per call.
///
/// Construction never fails. An endpoint whose base URL cannot be parsed
/// yields a loader that answers every call with
/// [`ImageError::ClientNotConfigured`] without touching the network.
#[derive(Clone)]
pub struct OpenAIImageLoader {
    route: Option<Route>,
    api_key: String,
    decoder: Arc<dyn ImageDecoder>,
}

impl OpenAIImageLoader {
    pub fn new(endpoint: EndpointConfig) -> Self {
        let transport = match ReqwestTransport::new(endpoint.timeout) {
            Ok(transport) => Some(Arc::new(transport) as Arc<dyn HttpTransport>),
            Err(e) => {
                log::error!("❌ {}", e);
                None
            }
        };
        Self::build(endpoint, transport)
    }

    pub fn with_transport(endpoint: EndpointConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self::build(endpoint, Some(transport))
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.route.is_some()
    }

    fn build(endpoint: EndpointConfig, transport: Option<Arc<dyn HttpTransport>>) -> Self {
        let url = endpoint_url(&endpoint.base_url, &endpoint.path);
        if url.is_none() {
            log::warn!(
                "⚠️  Image endpoint base URL '{}' is not usable, every load will fail",
                endpoint.base_url
            );
        }

        let route = match (transport, url) {
            (Some(transport), Some(url)) => Some(Route { transport, url }),
            _ => None,
        };

        Self {
            route,
            api_key: endpoint.api_key,
            decoder: Arc::new(RasterDecoder),
        }
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.api_key),
            ),
        ]
    }

    fn image_from(&self, response: &GenerationResponse) -> Result<GeneratedImage> {
        let encoded = response.first_image().ok_or(ImageError::NoImagesReturned)?;

        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ImageError::ImageConstructionFailed(e.to_string()))?;

        self.decoder.materialize(bytes)
    }
}

#[async_trait]
impl ImageLoader for OpenAIImageLoader {
    async fn load(
        &self,
        prompt: &str,
        size: ImageSize,
        model: ImageModel,
    ) -> Result<GeneratedImage> {
        let route = self.route.as_ref().ok_or(ImageError::ClientNotConfigured)?;
        validate_prompt(prompt)?;

        let cycle = Uuid::new_v4();
        let _timer = logger::timer(&format!("image fetch {}", cycle));

        let request = GenerationRequest::single_b64(prompt, size, model);
        let body = serde_json::to_vec(&request)
            .map_err(|e| ImageError::Transport(format!("Failed to encode request: {}", e)))?;

        log::info!("🎨 Generating {} image with {} [cycle:{}]", size, model, cycle);
        log::debug!("Image request prompt length: {} chars", prompt.chars().count());

        let payload = route
            .transport
            .post(route.url.clone(), body, self.headers())
            .await
            .map_err(|failure| {
                let error = classify_failure(failure);
                log::warn!("⚠️  Image fetch failed [cycle:{}]: {}", cycle, error);
                error
            })?;

        let response: GenerationResponse = serde_json::from_slice(&payload)
            .map_err(|e| ImageError::Transport(format!("invalid response payload: {}", e)))?;

        log::debug!(
            "Image response created={} with {} item(s) [cycle:{}]",
            response.created,
            response.data.len(),
            cycle
        );

        self.image_from(&response)
    }
}

fn endpoint_url(base_url: &str, path: &str) -> Option<Url> {
    let base = Url::parse(base_url.trim()).ok()?;
    if base.cannot_be_a_base() {
        return None;
    }

    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).ok()
}

/// Whitespace counts: only a zero-length prompt is empty.
pub fn validate_prompt(prompt: &str) -> Result<()> {
    if prompt.is_empty() {
        return Err(ImageError::InvalidPrompt("prompt is empty".into()));
    }

    let length = prompt.chars().count();
    if length > MAX_PROMPT_CHARS {
        return Err(ImageError::InvalidPrompt(format!(
            "prompt is {} characters, the maximum is {}",
            length, MAX_PROMPT_CHARS
        )));
    }
    Ok(())
}

/// Maps a transport failure onto the error taxonomy.
pub fn classify_failure(failure: TransportFailure) -> ImageError {
    match failure {
        TransportFailure::Status {
            body: Some(body), ..
        } => ImageError::HttpStatus(error_message_from_body(&body)),
        TransportFailure::Status { code, body: None } => {
            ImageError::HttpStatus(format!("HTTP {}", code))
        }
        TransportFailure::Other(cause) => ImageError::Transport(cause),
    }
}

fn error_message_from_body(body: &[u8]) -> String {
    if let Ok(envelope) = serde_json::from_slice::<ApiErrorEnvelope>(body) {
        return envelope.error.message;
    }

    match std::str::from_utf8(body) {
        Ok(text) => text.to_string(),
        Err(_) => UNDECODABLE_BODY.to_string(),
    }
}

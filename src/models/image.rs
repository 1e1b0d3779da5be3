use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::ModelInfo;

/// The size of the generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "256x256")]
    Square256,
    #[serde(rename = "512x512")]
    Square512,
    #[serde(rename = "1024x1024")]
    Square1024,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Square256 => "256x256",
            ImageSize::Square512 => "512x512",
            ImageSize::Square1024 => "1024x1024",
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ImageSize::Square256 => (256, 256),
            ImageSize::Square512 => (512, 512),
            ImageSize::Square1024 => (1024, 1024),
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend generation model. The first variant is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageModel {
    #[default]
    #[serde(rename = "dall-e-2")]
    DallE2,
    #[serde(rename = "dall-e-3")]
    DallE3,
}

impl ImageModel {
    pub fn id(&self) -> &'static str {
        match self {
            ImageModel::DallE2 => "dall-e-2",
            ImageModel::DallE3 => "dall-e-3",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "dall-e-2" => Some(ImageModel::DallE2),
            "dall-e-3" => Some(ImageModel::DallE3),
            _ => None,
        }
    }

    pub fn supported() -> Vec<ModelInfo> {
        vec![
            ModelInfo::image("dall-e-2", "DALL·E 2", "OpenAI"),
            ModelInfo::image("dall-e-3", "DALL·E 3", "OpenAI"),
        ]
    }
}

impl fmt::Display for ImageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    Url,
    B64Json,
}

/// Outbound body for one generation call.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub model: ImageModel,
    pub prompt: String,
    pub size: ImageSize,
    pub response_format: ResponseFormat,
    pub n: u32,
}

impl GenerationRequest {
    /// A single base64 image; the only shape the loader ever asks for.
    pub fn single_b64(prompt: impl Into<String>, size: ImageSize, model: ImageModel) -> Self {
        Self {
            model,
            prompt: prompt.into(),
            size,
            response_format: ResponseFormat::B64Json,
            n: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub created: i64,
    pub data: Vec<ImageDatum>,
}

impl GenerationResponse {
    pub fn first_image(&self) -> Option<&str> {
        self.data.first().map(|d| d.b64_json.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDatum {
    pub b64_json: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// A materialized image as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    bytes: Vec<u8>,
    dimensions: Option<(u32, u32)>,
    format: Option<::image::ImageFormat>,
}

impl GeneratedImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            dimensions: None,
            format: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }

    pub fn with_format(mut self, format: ::image::ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Encoded bytes exactly as returned by the API, after base64 decoding.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn format(&self) -> Option<::image::ImageFormat> {
        self.format
    }

    /// File extension for the detected container, `png` when unknown.
    pub fn extension(&self) -> &'static str {
        self.format
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("png")
    }
}

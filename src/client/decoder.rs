use crate::{
    client::traits::ImageDecoder,
    error::{ImageError, Result},
    models::GeneratedImage,
};

/// Decodes with the `image` crate so corrupt payloads fail here rather than
/// in the renderer. Records the pixel size and container format.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterDecoder;

impl ImageDecoder for RasterDecoder {
    fn materialize(&self, bytes: Vec<u8>) -> Result<GeneratedImage> {
        let format = image::guess_format(&bytes)
            .map_err(|e| ImageError::ImageConstructionFailed(e.to_string()))?;
        let decoded = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| ImageError::ImageConstructionFailed(e.to_string()))?;

        Ok(GeneratedImage::new(bytes)
            .with_dimensions(decoded.width(), decoded.height())
            .with_format(format))
    }
}

/// Hands the bytes through untouched, for hosts with their own native
/// bitmap type.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughDecoder;

impl ImageDecoder for PassthroughDecoder {
    fn materialize(&self, bytes: Vec<u8>) -> Result<GeneratedImage> {
        if bytes.is_empty() {
            return Err(ImageError::ImageConstructionFailed(
                "empty image payload".into(),
            ));
        }
        Ok(GeneratedImage::new(bytes))
    }
}

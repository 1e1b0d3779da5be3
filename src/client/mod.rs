pub mod decoder;
pub mod image_client;
pub mod traits;
pub mod transport;

pub use decoder::{PassthroughDecoder, RasterDecoder};
pub use image_client::{classify_failure, validate_prompt, OpenAIImageLoader, MAX_PROMPT_CHARS};
pub use traits::{HttpTransport, ImageDecoder, ImageLoader, TransportFailure};
pub use transport::ReqwestTransport;

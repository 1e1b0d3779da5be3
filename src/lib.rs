//! Fetch a generated image for a prompt and keep a loading/loaded/failed
//! view model in sync with it.
//!
//! ```rust,no_run
//! use prompt_image::{AsyncImage, AsyncImageConfig, EndpointConfig, ImageSize, LoadState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AsyncImageConfig::new("a red cube").with_size(ImageSize::Square512);
//!     let mut view = AsyncImage::new(config, EndpointConfig::from_env()).unwrap();
//!
//!     view.on_attach();
//!     let mut states = view.subscribe();
//!     if let Ok(LoadState::Loaded(image)) = prompt_image::wait_until_settled(&mut states).await {
//!         println!("{} bytes", image.bytes().len());
//!     }
//! }
//! ```

pub mod client;
pub mod component;
pub mod config;
pub mod controller;
pub mod error;
pub mod logger;
pub mod models;

pub use client::{
    HttpTransport, ImageDecoder, ImageLoader, OpenAIImageLoader, PassthroughDecoder,
    RasterDecoder, ReqwestTransport, TransportFailure,
};
pub use component::{AsyncImage, AsyncImageConfig, DefaultTemplate, RenderTemplate, Rendered};
pub use config::EndpointConfig;
pub use controller::{wait_until_settled, LoadController, ReloadPolicy};
pub use error::{ImageError, Result};
pub use models::{GeneratedImage, ImageModel, ImageSize, LoadState, ModelInfo};

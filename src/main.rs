use futures::StreamExt;
use prompt_image::{
    logger, AsyncImage, AsyncImageConfig, EndpointConfig, ImageModel, ImageSize, LoadState,
    Rendered,
};
use std::env;
use std::fs;

fn parse_size(value: &str) -> Option<ImageSize> {
    match value {
        "256" | "256x256" => Some(ImageSize::Square256),
        "512" | "512x512" => Some(ImageSize::Square512),
        "1024" | "1024x1024" => Some(ImageSize::Square1024),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logger::init_with_config(logger::LoggerConfig::development())?;
    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match dotenv::dotenv() {
        Ok(_) => log::info!("✅ .env file loaded successfully"),
        Err(_) => log::warn!("⚠️  No .env file found, using system environment variables"),
    }

    let mut args = env::args().skip(1);
    let prompt = match args.next() {
        Some(prompt) => prompt,
        None => {
            log::error!("❌ Usage: prompt-image \"<prompt>\" [\"<replacement prompt>\"]");
            return Ok(());
        }
    };
    let replacement = args.next();

    let endpoint = EndpointConfig::from_env_strict()?;
    logger::log_endpoint_info(&endpoint);

    let size = env::var("IMAGE_SIZE")
        .ok()
        .and_then(|s| parse_size(&s))
        .unwrap_or_default();
    let model = env::var("IMAGE_MODEL")
        .ok()
        .and_then(|s| ImageModel::from_id(&s))
        .unwrap_or_default();

    log::info!("🖼️  Available image generation models:");
    for info in ImageModel::supported() {
        log::info!("  {} - {} ({})", info.id, info.name, info.provider);
    }

    let config = AsyncImageConfig::new(prompt)
        .with_size(size)
        .with_model(model);
    let mut view = AsyncImage::new(config, endpoint)?;

    view.on_attach();
    if let Some(replacement) = replacement {
        log::info!("✏️  Prompt changed before the first image arrived");
        view.on_input_change(replacement);
    }

    let mut states = view.states();
    while let Some(state) = states.next().await {
        match &state {
            LoadState::Loading => log::info!("⏳ Loading..."),
            LoadState::Loaded(_) | LoadState::Failed(_) => break,
        }
    }

    match view.render() {
        Rendered::Image(image) => {
            let filename = format!(
                "generated_image_{}.{}",
                chrono::Utc::now().timestamp(),
                image.extension()
            );
            if let Some((width, height)) = image.dimensions() {
                log::info!("📏 Image is {}x{}", width, height);
            }
            fs::write(&filename, image.bytes())?;
            log::info!("💾 Image for '{}' saved to: {}", view.prompt(), filename);
        }
        Rendered::Message(message) => {
            log::error!("❌ {}", message);
        }
        Rendered::Progress => {
            log::warn!("⚠️  State stream closed before the image settled");
        }
    }

    view.on_detach();
    Ok(())
}

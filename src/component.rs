//! Consumer-facing image component.
//!
//! [`AsyncImage`] pairs a [`LoadController`] with the prompt it is bound to
//! and a [`RenderTemplate`] that turns each [`LoadState`] into something the
//! host can draw. The host drives it through three lifecycle hooks:
//! `on_attach`, `on_input_change` and `on_detach`.

use crate::{
    client::{ImageLoader, OpenAIImageLoader},
    config::EndpointConfig,
    controller::{LoadController, ReloadPolicy},
    models::{GeneratedImage, ImageModel, ImageSize, LoadState},
};
use crate::error::Result;
use std::sync::Arc;
use tokio::{runtime::Handle, sync::watch};
use tokio_stream::wrappers::WatchStream;

#[derive(Debug, Clone, PartialEq)]
pub struct AsyncImageConfig {
    pub prompt: String,
    pub size: ImageSize,
    pub model: ImageModel,
    pub reload: ReloadPolicy,
}

impl AsyncImageConfig {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: ImageSize::default(),
            model: ImageModel::default(),
            reload: ReloadPolicy::default(),
        }
    }

    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    pub fn with_model(mut self, model: ImageModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_reload_policy(mut self, reload: ReloadPolicy) -> Self {
        self.reload = reload;
        self
    }
}

/// Per-state presentation.
pub trait RenderTemplate {
    type Output;

    fn render(&self, state: &LoadState) -> Self::Output;
}

impl<F, O> RenderTemplate for F
where
    F: Fn(&LoadState) -> O,
{
    type Output = O;

    fn render(&self, state: &LoadState) -> O {
        self(state)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Progress,
    Image(GeneratedImage),
    Message(String),
}

/// Progress indicator while loading, the image once loaded, the error text
/// on failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTemplate;

impl RenderTemplate for DefaultTemplate {
    type Output = Rendered;

    fn render(&self, state: &LoadState) -> Rendered {
        match state {
            LoadState::Loading => Rendered::Progress,
            LoadState::Loaded(image) => Rendered::Image(image.clone()),
            LoadState::Failed(error) => Rendered::Message(error.to_string()),
        }
    }
}

pub struct AsyncImage<T = DefaultTemplate> {
    config: AsyncImageConfig,
    controller: LoadController,
    template: T,
    attached: bool,
}

impl AsyncImage<DefaultTemplate> {
    /// Uses the default HTTP loader built from `endpoint`, on the runtime of
    /// the calling context.
    pub fn new(config: AsyncImageConfig, endpoint: EndpointConfig) -> Result<Self> {
        Self::with_loader(config, Arc::new(OpenAIImageLoader::new(endpoint)))
    }

    /// Fails with [`crate::ImageError::Config`] outside a Tokio runtime.
    pub fn with_loader(config: AsyncImageConfig, loader: Arc<dyn ImageLoader>) -> Result<Self> {
        let controller = LoadController::new(loader)?;
        Ok(Self::from_controller(config, controller))
    }

    /// For hosts whose event thread is not a runtime thread: fetches are
    /// spawned on `runtime`.
    pub fn with_handle(
        config: AsyncImageConfig,
        loader: Arc<dyn ImageLoader>,
        runtime: Handle,
    ) -> Self {
        Self::from_controller(config, LoadController::with_handle(loader, runtime))
    }

    fn from_controller(config: AsyncImageConfig, controller: LoadController) -> Self {
        Self {
            controller: controller.with_policy(config.reload),
            config,
            template: DefaultTemplate,
            attached: false,
        }
    }
}

impl<T: RenderTemplate> AsyncImage<T> {
    pub fn with_template<U: RenderTemplate>(self, template: U) -> AsyncImage<U> {
        AsyncImage {
            config: self.config,
            controller: self.controller,
            template,
            attached: self.attached,
        }
    }

    pub fn on_attach(&mut self) {
        self.attached = true;
        self.reload();
    }

    /// Restarts the fetch when the prompt actually changed. While detached
    /// the new prompt is only remembered for the next attach.
    pub fn on_input_change(&mut self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        if prompt == self.config.prompt {
            return;
        }
        self.config.prompt = prompt;

        if self.attached {
            self.reload();
        }
    }

    pub fn on_detach(&mut self) {
        self.attached = false;
        self.controller.cancel();
    }

    pub fn render(&self) -> T::Output {
        self.template.render(&self.controller.state())
    }

    pub fn state(&self) -> LoadState {
        self.controller.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.controller.subscribe()
    }

    pub fn states(&self) -> WatchStream<LoadState> {
        self.controller.states()
    }

    pub fn prompt(&self) -> &str {
        &self.config.prompt
    }

    pub fn config(&self) -> &AsyncImageConfig {
        &self.config
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn controller(&self) -> &LoadController {
        &self.controller
    }

    fn reload(&self) {
        self.controller
            .start(self.config.prompt.clone(), self.config.size, self.config.model);
    }
}

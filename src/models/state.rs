use crate::error::ImageError;

use super::image::GeneratedImage;

/// What the presentation layer should show right now.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadState {
    #[default]
    Loading,
    Loaded(GeneratedImage),
    Failed(ImageError),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    /// `Loaded` or `Failed`; stable until the next fetch cycle starts.
    pub fn is_terminal(&self) -> bool {
        !self.is_loading()
    }

    pub fn image(&self) -> Option<&GeneratedImage> {
        match self {
            LoadState::Loaded(image) => Some(image),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ImageError> {
        match self {
            LoadState::Failed(error) => Some(error),
            _ => None,
        }
    }
}

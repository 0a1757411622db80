//! Interior image generation.

use super::{DEFAULT_IMAGE_MODEL, Flow, GenerationConfig};
use crate::llm::Modality;
use crate::prompts::templates;
use crate::schema::{GeneratedImage, ImageInput};

/// Renders a photorealistic interior with a dedicated image model. The
/// model must be asked for both text and image output.
#[derive(Debug, Clone)]
pub struct ImageFlow {
    model: String,
}

impl ImageFlow {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

impl Default for ImageFlow {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_MODEL)
    }
}

impl Flow for ImageFlow {
    type Input = ImageInput;
    type Output = GeneratedImage;
    const NAME: &'static str = templates::ACCOMMODATION_IMAGE;

    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            model: Some(self.model.clone()),
            response_modalities: vec![Modality::Text, Modality::Image],
            ..Default::default()
        }
    }
}

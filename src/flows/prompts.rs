//! Follow-up question flows for the location, amenities and style steps.

use super::{Flow, GenerationConfig};
use crate::prompts::templates;
use crate::schema::{AmenitiesPromptInput, GeneratedPrompt, LocationPromptInput, StylePromptInput};

/// Asks about neighbourhoods in Dublin.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationPromptFlow;

impl Flow for LocationPromptFlow {
    type Input = LocationPromptInput;
    type Output = GeneratedPrompt;
    const NAME: &'static str = templates::LOCATION_PROMPT;

    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig::default()
    }
}

/// Asks which amenities matter.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmenitiesPromptFlow;

impl Flow for AmenitiesPromptFlow {
    type Input = AmenitiesPromptInput;
    type Output = GeneratedPrompt;
    const NAME: &'static str = templates::AMENITIES_PROMPT;

    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig::default()
    }
}

/// Asks about style, noise, views and special needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StylePromptFlow;

impl Flow for StylePromptFlow {
    type Input = StylePromptInput;
    type Output = GeneratedPrompt;
    const NAME: &'static str = templates::STYLE_PROMPT;

    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig::default()
    }
}

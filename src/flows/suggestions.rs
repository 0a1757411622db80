//! Accommodation search.

use super::{Flow, GenerationConfig};
use crate::prompts::templates;
use crate::safety::SafetyPolicy;
use crate::schema::{SuggestionList, SuggestionsInput};

/// Produces up to five ranked accommodation suggestions for a finished
/// profile. This is the only flow that sends explicit safety thresholds.
#[derive(Debug, Clone)]
pub struct SuggestionsFlow {
    safety: SafetyPolicy,
}

impl SuggestionsFlow {
    pub fn new(safety: SafetyPolicy) -> Self {
        Self { safety }
    }

    pub fn safety(&self) -> &SafetyPolicy {
        &self.safety
    }
}

impl Default for SuggestionsFlow {
    fn default() -> Self {
        Self::new(SafetyPolicy::suggestions())
    }
}

impl Flow for SuggestionsFlow {
    type Input = SuggestionsInput;
    type Output = SuggestionList;
    const NAME: &'static str = templates::ACCOMMODATION_SUGGESTIONS;

    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            safety: self.safety.clone(),
            ..Default::default()
        }
    }
}

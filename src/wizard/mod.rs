//! Drives the pipeline the way the wizard screens do.
//!
//! The three stage questions are generated together right after the first
//! step; suggestions need the finished profile; an inquiry needs one of the
//! returned suggestions.

mod retry;

pub use retry::{RetryPolicy, retry};

use tracing::{info, warn};

use crate::error::FlowError;
use crate::flows::Pipeline;
use crate::schema::{
    AccommodationSuggestion, AmenitiesPromptInput, EmailDraft, EmailInquiryInput, GeneratedPrompt,
    PreferenceProfile, SuggestionList, SuggestionsInput, TravellerBrief, Validate,
};

/// Wizard steps that open with a generated question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Location,
    Amenities,
    Style,
}

impl Stage {
    /// Question shown when generation failed.
    pub fn fallback_question(&self) -> &'static str {
        match self {
            Self::Location => "What kind of neighborhood are you looking for?",
            Self::Amenities => "What amenities are essential for your stay?",
            Self::Style => "Finally, what's your preferred style?",
        }
    }
}

/// Outcome of the three concurrent prompt flows. Each branch succeeds or
/// fails independently.
#[derive(Debug)]
pub struct StagePrompts {
    pub location: Result<GeneratedPrompt, FlowError>,
    pub amenities: Result<GeneratedPrompt, FlowError>,
    pub style: Result<GeneratedPrompt, FlowError>,
}

impl StagePrompts {
    pub fn get(&self, stage: Stage) -> &Result<GeneratedPrompt, FlowError> {
        match stage {
            Stage::Location => &self.location,
            Stage::Amenities => &self.amenities,
            Stage::Style => &self.style,
        }
    }

    /// Generated question for `stage`, or `fallback` if that branch failed.
    pub fn text_or<'a>(&'a self, stage: Stage, fallback: &'a str) -> &'a str {
        match self.get(stage) {
            Ok(generated) => generated.prompt.as_str(),
            Err(_) => fallback,
        }
    }

    /// Generated question, or the screen's stock question.
    pub fn text(&self, stage: Stage) -> &str {
        self.text_or(stage, stage.fallback_question())
    }

    pub fn all_succeeded(&self) -> bool {
        self.location.is_ok() && self.amenities.is_ok() && self.style.is_ok()
    }
}

/// Result of a suggestions call that reached the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionOutcome {
    Found(SuggestionList),
    /// The backend answered with an empty list.
    NoneFound,
}

impl SuggestionOutcome {
    pub fn suggestions(&self) -> &[AccommodationSuggestion] {
        match self {
            Self::Found(list) => &list.0,
            Self::NoneFound => &[],
        }
    }
}

/// Generate the location, amenities and style questions concurrently.
///
/// Fails only if the first-step answers are invalid, in which case no
/// backend call is made.
pub async fn generate_stage_prompts(
    pipeline: &Pipeline,
    profile: &PreferenceProfile,
) -> Result<StagePrompts, FlowError> {
    let brief = TravellerBrief::from_profile(profile)?;
    brief.validate()?;
    let amenities = AmenitiesPromptInput::from_profile(profile)?;

    let (location, amenities, style) = tokio::join!(
        pipeline.location_prompt(brief.clone()),
        pipeline.amenities_prompt(amenities),
        pipeline.style_prompt(brief),
    );
    let prompts = StagePrompts {
        location,
        amenities,
        style,
    };

    if !prompts.all_succeeded() {
        warn!(
            location = prompts.location.is_ok(),
            amenities = prompts.amenities.is_ok(),
            style = prompts.style.is_ok(),
            "Some stage prompts failed, using fallbacks"
        );
    }
    Ok(prompts)
}

/// Search for accommodation matching a finished profile.
pub async fn find_accommodations(
    pipeline: &Pipeline,
    profile: &PreferenceProfile,
) -> Result<SuggestionOutcome, FlowError> {
    profile.validate()?;
    let input = SuggestionsInput::from_profile(profile)?;
    let list = pipeline.accommodation_suggestions(input).await?;
    if list.is_empty() {
        info!("No accommodation matched the profile");
        Ok(SuggestionOutcome::NoneFound)
    } else {
        Ok(SuggestionOutcome::Found(list))
    }
}

/// Draft an inquiry email about `suggestion` on behalf of the user.
pub async fn draft_inquiry(
    pipeline: &Pipeline,
    profile: &PreferenceProfile,
    suggestion: &AccommodationSuggestion,
) -> Result<EmailDraft, FlowError> {
    let input = EmailInquiryInput::for_suggestion(profile, suggestion)?;
    pipeline.email_inquiry(input).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompts(location: Result<GeneratedPrompt, FlowError>) -> StagePrompts {
        StagePrompts {
            location,
            amenities: Ok(GeneratedPrompt {
                prompt: "Which amenities?".into(),
            }),
            style: Err(FlowError::incomplete("style_prompt", "blocked")),
        }
    }

    #[test]
    fn text_falls_back_per_stage() {
        let p = prompts(Ok(GeneratedPrompt {
            prompt: "Near the sea?".into(),
        }));
        assert_eq!(p.text(Stage::Location), "Near the sea?");
        assert_eq!(p.text(Stage::Amenities), "Which amenities?");
        assert_eq!(p.text(Stage::Style), "Finally, what's your preferred style?");
        assert_eq!(p.text_or(Stage::Style, "custom"), "custom");
        assert!(!p.all_succeeded());
    }

    #[test]
    fn none_found_has_no_suggestions() {
        assert!(SuggestionOutcome::NoneFound.suggestions().is_empty());
    }
}

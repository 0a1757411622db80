//! Input and output shapes for the six flows.
//!
//! Doc comments on fields double as JSON-schema descriptions: the output
//! schema is shown to the model, so they are written for it as much as for
//! readers.

use std::collections::HashSet;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::Validate;
use super::profile::{
    BudgetUnit, PreferenceProfile, PrimaryType, check_party_and_budget, check_traveller,
};
use crate::error::FlowError;

/// Most suggestions a single response may carry.
pub const MAX_SUGGESTIONS: usize = 5;

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{\{[^{}]*\}\}").ok());

fn require_text(schema: &str, field: &str, value: &str) -> Result<(), FlowError> {
    if value.trim().is_empty() {
        Err(FlowError::schema(schema, format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

fn require_json_object(schema: &str, field: &str, raw: &str) -> Result<(), FlowError> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(_)) => Ok(()),
        Ok(_) => Err(FlowError::schema(schema, format!("{field} must be a JSON object"))),
        Err(e) => Err(FlowError::schema(
            schema,
            format!("{field} is not valid JSON: {e}"),
        )),
    }
}

// ── Inputs ──────────────────────────────────────────────────────────────

/// The traveller's first-step answers, used by the location and style
/// prompt flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TravellerBrief {
    /// The primary user type (Student, Working Individual, or Tourist).
    pub user_primary_type: PrimaryType,
    /// The specific user type (e.g., Undergraduate, Full-time Employee, Short Stay).
    pub user_specific_type: String,
    /// The arrival date (if Tourist), YYYY-MM-DD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbound_date: Option<String>,
    /// The departure date (if Tourist), YYYY-MM-DD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbound_date: Option<String>,
    /// The move-in date (if Student or Working Individual), YYYY-MM-DD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moving_in_date: Option<String>,
    /// The number of adults staying.
    pub adults: u32,
    /// The number of children staying.
    pub children: u32,
    /// The minimum budget in euro.
    pub min_budget: u32,
    /// The maximum budget in euro.
    pub max_budget: u32,
    /// The budget unit (per_night or per_month).
    pub budget_unit: BudgetUnit,
    /// The user-provided initial query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_freeform_query: Option<String>,
}

pub type LocationPromptInput = TravellerBrief;
pub type StylePromptInput = TravellerBrief;

impl TravellerBrief {
    const SCHEMA: &'static str = "TravellerBrief";

    /// Extract the brief from a profile. Fails if no primary type is chosen.
    pub fn from_profile(profile: &PreferenceProfile) -> Result<Self, FlowError> {
        let user_primary_type = profile
            .user_primary_type
            .ok_or_else(|| FlowError::schema(Self::SCHEMA, "userPrimaryType is required"))?;
        let query = profile.initial_freeform_query.trim();
        Ok(Self {
            user_primary_type,
            user_specific_type: profile.user_specific_type.clone(),
            inbound_date: profile.inbound_date.clone(),
            outbound_date: profile.outbound_date.clone(),
            moving_in_date: profile.moving_in_date.clone(),
            adults: profile.adults,
            children: profile.children,
            min_budget: profile.min_budget,
            max_budget: profile.max_budget,
            budget_unit: profile.budget_unit,
            initial_freeform_query: (!query.is_empty()).then(|| query.to_string()),
        })
    }
}

impl Validate for TravellerBrief {
    fn validate(&self) -> Result<(), FlowError> {
        check_traveller(
            Self::SCHEMA,
            self.user_primary_type,
            &self.user_specific_type,
            self.inbound_date.as_deref(),
            self.outbound_date.as_deref(),
            self.moving_in_date.as_deref(),
        )?;
        check_party_and_budget(Self::SCHEMA, self.adults, self.min_budget, self.max_budget)
    }
}

/// Input for the amenities prompt flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AmenitiesPromptInput {
    /// The primary user type (student, working individual, or tourist).
    pub user_primary_type: PrimaryType,
    /// The specific user type.
    pub user_specific_type: String,
}

impl AmenitiesPromptInput {
    pub fn from_profile(profile: &PreferenceProfile) -> Result<Self, FlowError> {
        let user_primary_type = profile.user_primary_type.ok_or_else(|| {
            FlowError::schema("AmenitiesPromptInput", "userPrimaryType is required")
        })?;
        Ok(Self {
            user_primary_type,
            user_specific_type: profile.user_specific_type.clone(),
        })
    }
}

impl Validate for AmenitiesPromptInput {
    fn validate(&self) -> Result<(), FlowError> {
        if self.user_primary_type.allows(&self.user_specific_type) {
            Ok(())
        } else {
            Err(FlowError::schema(
                "AmenitiesPromptInput",
                format!(
                    "'{}' is not a valid specific type for {}",
                    self.user_specific_type, self.user_primary_type
                ),
            ))
        }
    }
}

/// Input for the accommodation suggestions flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsInput {
    /// A JSON string containing the user's refined preferences for accommodation.
    pub refined_preferences_json: String,
}

impl SuggestionsInput {
    pub fn from_profile(profile: &PreferenceProfile) -> Result<Self, FlowError> {
        Ok(Self {
            refined_preferences_json: profile.to_json_string()?,
        })
    }
}

impl Validate for SuggestionsInput {
    fn validate(&self) -> Result<(), FlowError> {
        require_json_object(
            "SuggestionsInput",
            "refinedPreferencesJson",
            &self.refined_preferences_json,
        )
    }
}

/// Input for the accommodation image flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    /// The name of the accommodation.
    pub name: String,
    /// The type of accommodation (e.g., Serviced Apartment, Hotel).
    #[serde(rename = "type")]
    pub property_type: String,
    /// A short description of the accommodation style and features.
    pub description: String,
}

impl ImageInput {
    /// Describe a suggestion by its location snapshot and leading features.
    pub fn for_suggestion(suggestion: &AccommodationSuggestion) -> Self {
        let mut description = suggestion.location_snapshot.trim().to_string();
        if !suggestion.key_features.is_empty() {
            if !description.is_empty() {
                description.push_str(". ");
            }
            description.push_str("Features: ");
            description.push_str(&suggestion.key_features.join(", "));
        }
        Self {
            name: suggestion.name.clone(),
            property_type: suggestion.property_type.clone(),
            description,
        }
    }
}

impl Validate for ImageInput {
    fn validate(&self) -> Result<(), FlowError> {
        require_text("ImageInput", "name", &self.name)?;
        require_text("ImageInput", "type", &self.property_type)?;
        require_text("ImageInput", "description", &self.description)
    }
}

/// Input for the email inquiry flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailInquiryInput {
    /// The user's refined preferences in JSON string format.
    pub refined_preferences_json: String,
    /// The name of the property.
    pub property_name: String,
    /// The type of the property (e.g., Serviced Apartment, Hotel).
    pub property_type: String,
    /// The user's primary type (e.g., Student, Working Individual, Tourist).
    pub user_primary_type: PrimaryType,
    /// The user's specific type (e.g., Undergraduate, Full-time Employee, Short Stay).
    pub user_specific_type: String,
}

impl EmailInquiryInput {
    const SCHEMA: &'static str = "EmailInquiryInput";

    pub fn for_suggestion(
        profile: &PreferenceProfile,
        suggestion: &AccommodationSuggestion,
    ) -> Result<Self, FlowError> {
        let user_primary_type = profile
            .user_primary_type
            .ok_or_else(|| FlowError::schema(Self::SCHEMA, "userPrimaryType is required"))?;
        Ok(Self {
            refined_preferences_json: profile.to_json_string()?,
            property_name: suggestion.name.clone(),
            property_type: suggestion.property_type.clone(),
            user_primary_type,
            user_specific_type: profile.user_specific_type.clone(),
        })
    }
}

impl Validate for EmailInquiryInput {
    fn validate(&self) -> Result<(), FlowError> {
        require_json_object(
            Self::SCHEMA,
            "refinedPreferencesJson",
            &self.refined_preferences_json,
        )?;
        require_text(Self::SCHEMA, "propertyName", &self.property_name)?;
        require_text(Self::SCHEMA, "propertyType", &self.property_type)?;
        if !self.user_primary_type.allows(&self.user_specific_type) {
            return Err(FlowError::schema(
                Self::SCHEMA,
                format!(
                    "'{}' is not a valid specific type for {}",
                    self.user_specific_type, self.user_primary_type
                ),
            ));
        }
        Ok(())
    }
}

// ── Outputs ─────────────────────────────────────────────────────────────

/// A single follow-up question for one wizard stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedPrompt {
    /// The generated question, phrased for the user.
    pub prompt: String,
}

impl Validate for GeneratedPrompt {
    fn validate(&self) -> Result<(), FlowError> {
        require_text("GeneratedPrompt", "prompt", &self.prompt)
    }
}

/// Latitude and longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MapCoordinates {
    pub lat: f64,
    pub lng: f64,
}

impl MapCoordinates {
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Publicly listed ways to reach the property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// One accommodation option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccommodationSuggestion {
    /// The name of the accommodation.
    pub name: String,
    /// The type of accommodation (e.g., Serviced Apartment, Hotel).
    #[serde(rename = "type")]
    pub property_type: String,
    /// A list of key features of the accommodation.
    pub key_features: Vec<String>,
    /// The estimated price range per night or month.
    pub estimated_price_range: String,
    /// A short description of the location.
    pub location_snapshot: String,
    /// An explanation of why this suggestion fits the user's needs.
    pub why_this_suggestion: String,
    /// A direct URL to a high-quality, real image of the property found on the web.
    pub image_url: String,
    /// Latitude and longitude for pinpointing the accommodation on a map.
    pub map_coordinates: MapCoordinates,
    /// Optional contact information for the accommodation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<ContactInfo>,
    /// A unique identifier for this suggestion.
    pub id: String,
}

impl AccommodationSuggestion {
    pub fn contact_email(&self) -> Option<&str> {
        self.contact_info
            .as_ref()
            .and_then(|c| c.email.as_deref())
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

impl Validate for AccommodationSuggestion {
    fn validate(&self) -> Result<(), FlowError> {
        require_text("AccommodationSuggestion", "id", &self.id)?;
        if !self.map_coordinates.is_valid() {
            return Err(FlowError::schema(
                "AccommodationSuggestion",
                format!(
                    "'{}' has out-of-range coordinates ({}, {})",
                    self.name, self.map_coordinates.lat, self.map_coordinates.lng
                ),
            ));
        }
        Ok(())
    }
}

/// Ranked accommodation suggestions, most relevant first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SuggestionList(pub Vec<AccommodationSuggestion>);

impl SuggestionList {
    /// Cap the list at [`MAX_SUGGESTIONS`] and give every entry a unique,
    /// non-empty id. Order is preserved.
    pub fn normalized(self) -> Self {
        let mut items = self.0;
        if items.len() > MAX_SUGGESTIONS {
            warn!(
                returned = items.len(),
                kept = MAX_SUGGESTIONS,
                "Model returned too many suggestions, truncating"
            );
            items.truncate(MAX_SUGGESTIONS);
        }

        let mut seen = HashSet::new();
        for item in &mut items {
            let id = item.id.trim().to_string();
            if id.is_empty() || !seen.insert(id.clone()) {
                let fresh = Uuid::new_v4().to_string();
                warn!(name = %item.name, old_id = %id, new_id = %fresh, "Reassigning suggestion id");
                seen.insert(fresh.clone());
                item.id = fresh;
            } else {
                item.id = id;
            }
        }
        Self(items)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AccommodationSuggestion> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<AccommodationSuggestion> {
        self.0
    }
}

impl Validate for SuggestionList {
    fn validate(&self) -> Result<(), FlowError> {
        if self.0.len() > MAX_SUGGESTIONS {
            return Err(FlowError::schema(
                "SuggestionList",
                format!("{} suggestions exceeds the limit of {MAX_SUGGESTIONS}", self.0.len()),
            ));
        }
        let mut seen = HashSet::new();
        for item in &self.0 {
            item.validate()?;
            if !seen.insert(item.id.as_str()) {
                return Err(FlowError::schema(
                    "SuggestionList",
                    format!("duplicate suggestion id '{}'", item.id),
                ));
            }
        }
        Ok(())
    }
}

/// A generated interior image for one suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    /// A data URI for the generated image.
    pub image_url: String,
}

impl GeneratedImage {
    /// Decoded image bytes.
    pub fn decode(&self) -> Result<Vec<u8>, FlowError> {
        let incomplete = |reason: String| FlowError::incomplete("accommodation_image", reason);
        let rest = self
            .image_url
            .strip_prefix("data:")
            .ok_or_else(|| incomplete("image is not a data URI".into()))?;
        let (_, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| incomplete("data URI is not base64-encoded".into()))?;
        BASE64_STANDARD
            .decode(payload.trim())
            .map_err(|e| incomplete(format!("image payload does not decode: {e}")))
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.image_url
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
    }
}

impl Validate for GeneratedImage {
    fn validate(&self) -> Result<(), FlowError> {
        if self.decode()?.is_empty() {
            return Err(FlowError::incomplete(
                "accommodation_image",
                "image payload is empty",
            ));
        }
        Ok(())
    }
}

/// A drafted inquiry email body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailDraft {
    /// The generated email body for the inquiry, as plain prose.
    pub email_body: String,
}

/// A ready-to-send inquiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InquiryEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailDraft {
    /// Address the draft to a suggestion. `None` when the property lists no
    /// contact email.
    pub fn compose_for(&self, suggestion: &AccommodationSuggestion) -> Option<InquiryEmail> {
        let to = suggestion.contact_email()?;
        Some(InquiryEmail {
            to: to.to_string(),
            subject: format!("Inquiry about {}", suggestion.name),
            body: self.email_body.clone(),
        })
    }
}

impl Validate for EmailDraft {
    fn validate(&self) -> Result<(), FlowError> {
        require_text("EmailDraft", "emailBody", &self.email_body)?;
        let unresolved = PLACEHOLDER
            .as_ref()
            .and_then(|re| re.find(&self.email_body));
        if let Some(found) = unresolved {
            return Err(FlowError::schema(
                "EmailDraft",
                format!("email body contains unresolved placeholder {}", found.as_str()),
            ));
        }
        Ok(())
    }
}

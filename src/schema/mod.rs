//! Typed shapes for everything that crosses a flow boundary.

pub mod flows;
pub mod profile;

pub use flows::*;
pub use profile::{BudgetUnit, PreferenceProfile, PrimaryType, StayDates, PROFILE_STORAGE_KEY};

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::error::FlowError;

/// Checks that serde cannot express on its own: cross-field rules,
/// value ranges, allowed combinations.
pub trait Validate {
    fn validate(&self) -> Result<(), FlowError>;
}

/// Deserialize and validate an untrusted JSON value.
pub fn parse_input<T>(schema: &str, value: serde_json::Value) -> Result<T, FlowError>
where
    T: DeserializeOwned + Validate,
{
    let parsed: T =
        serde_json::from_value(value).map_err(|e| FlowError::schema(schema, e.to_string()))?;
    parsed.validate()?;
    Ok(parsed)
}

/// Pretty-printed JSON schema for `T`, as shown to the model.
pub fn json_schema_for<T: JsonSchema>() -> String {
    let schema = schemars::schema_for!(T);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_input_rejects_wrong_shape() {
        let err = parse_input::<AmenitiesPromptInput>(
            "AmenitiesPromptInput",
            json!({"userPrimaryType": "Astronaut", "userSpecificType": "Other"}),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "schema_violation");
    }

    #[test]
    fn parse_input_runs_validation() {
        let err = parse_input::<AmenitiesPromptInput>(
            "AmenitiesPromptInput",
            json!({"userPrimaryType": "Tourist", "userSpecificType": "Undergraduate"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Undergraduate"));

        let ok: AmenitiesPromptInput = parse_input(
            "AmenitiesPromptInput",
            json!({"userPrimaryType": "Tourist", "userSpecificType": "Short Stay"}),
        )
        .unwrap();
        assert_eq!(ok.user_primary_type, PrimaryType::Tourist);
    }

    #[test]
    fn schema_text_carries_field_descriptions() {
        let schema = json_schema_for::<SuggestionList>();
        assert!(schema.contains("mapCoordinates"));
        assert!(schema.contains("A unique identifier for this suggestion."));
    }
}

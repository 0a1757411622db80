//! Binds flow inputs into instruction templates.

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use tracing::debug;

use super::templates;
use crate::error::FlowError;

/// A read-only set of compiled templates. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct PromptRenderer {
    env: Environment<'static>,
}

impl PromptRenderer {
    /// Compile the built-in templates.
    pub fn new() -> Result<Self, FlowError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::SemiStrict);
        for &(name, source) in templates::ALL {
            env.add_template(name, source)
                .map_err(|e| FlowError::template(name, e.to_string()))?;
        }
        Ok(Self { env })
    }

    /// Render `name` with the fields of `input`.
    ///
    /// `null` fields are removed first so that absent optionals are
    /// undefined rather than the string `"none"`.
    pub fn render<I: Serialize>(&self, name: &str, input: &I) -> Result<String, FlowError> {
        let template = self
            .env
            .get_template(name)
            .map_err(|e| FlowError::template(name, e.to_string()))?;

        let mut context =
            serde_json::to_value(input).map_err(|e| FlowError::template(name, e.to_string()))?;
        if let serde_json::Value::Object(ref mut fields) = context {
            fields.retain(|_, v| !v.is_null());
        }

        let rendered = template
            .render(minijinja::Value::from_serialize(&context))
            .map_err(|e| FlowError::template(name, render_error_detail(&e)))?;
        debug!(template = name, chars = rendered.len(), "Rendered instruction");
        Ok(rendered)
    }
}

fn render_error_detail(err: &minijinja::Error) -> String {
    match err.line() {
        Some(line) => format!("{err} (line {line})"),
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BudgetUnit, EmailInquiryInput, ImageInput, PrimaryType, TravellerBrief};
    use serde_json::json;

    fn brief() -> TravellerBrief {
        TravellerBrief {
            user_primary_type: PrimaryType::Tourist,
            user_specific_type: "Short Stay".into(),
            inbound_date: Some("2025-06-10".into()),
            outbound_date: Some("2025-06-15".into()),
            moving_in_date: None,
            adults: 2,
            children: 1,
            min_budget: 100,
            max_budget: 250,
            budget_unit: BudgetUnit::PerNight,
            initial_freeform_query: Some("quiet, near Trinity".into()),
        }
    }

    #[test]
    fn all_templates_compile() {
        let renderer = PromptRenderer::new().unwrap();
        for (name, _) in templates::ALL {
            assert!(renderer.env.get_template(name).is_ok(), "{name} missing");
        }
    }

    #[test]
    fn tourist_dates_render_as_range() {
        let renderer = PromptRenderer::new().unwrap();
        let text = renderer.render(templates::LOCATION_PROMPT, &brief()).unwrap();
        assert!(text.contains("User Type: Tourist - Short Stay"));
        assert!(text.contains("Dates: 2025-06-10 to 2025-06-15,"));
        assert!(text.contains("Budget Range: €100-€250 per night"));
        assert!(text.contains("Initial Query: 'quiet, near Trinity'"));
        assert!(!text.contains("{{"));
    }

    #[test]
    fn resident_dates_render_as_move_in() {
        let renderer = PromptRenderer::new().unwrap();
        let brief = TravellerBrief {
            user_primary_type: PrimaryType::Student,
            user_specific_type: "Undergraduate".into(),
            inbound_date: None,
            outbound_date: None,
            moving_in_date: Some("2025-09-01".into()),
            budget_unit: BudgetUnit::PerMonth,
            initial_freeform_query: None,
            ..brief()
        };
        let text = renderer.render(templates::STYLE_PROMPT, &brief).unwrap();
        assert!(text.contains("Dates: Moving In: 2025-09-01,"));
        assert!(text.contains("Initial Query: 'Not provided'"));
        assert!(text.contains("per month"));
    }

    #[test]
    fn missing_dates_fall_back() {
        let renderer = PromptRenderer::new().unwrap();
        let brief = TravellerBrief {
            inbound_date: None,
            outbound_date: None,
            ..brief()
        };
        let text = renderer.render(templates::LOCATION_PROMPT, &brief).unwrap();
        assert!(text.contains("Dates: Not provided,"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let renderer = PromptRenderer::new().unwrap();
        let a = renderer.render(templates::STYLE_PROMPT, &brief()).unwrap();
        let b = renderer.render(templates::STYLE_PROMPT, &brief()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn image_and_email_bind_their_fields() {
        let renderer = PromptRenderer::new().unwrap();
        let image = ImageInput {
            name: "Liffey Loft".into(),
            property_type: "Apartment".into(),
            description: "bright, riverside".into(),
        };
        let text = renderer.render(templates::ACCOMMODATION_IMAGE, &image).unwrap();
        assert!(text.contains("interior of a Apartment called \"Liffey Loft\""));

        let email = EmailInquiryInput {
            refined_preferences_json: r#"{"adults":1}"#.into(),
            property_name: "Liffey Loft".into(),
            property_type: "Apartment".into(),
            user_primary_type: PrimaryType::WorkingIndividual,
            user_specific_type: "Remote Worker".into(),
        };
        let text = renderer.render(templates::EMAIL_INQUIRY, &email).unwrap();
        assert!(text.contains(r#"{"adults":1}"#));
        assert!(text.contains("The user is a 'Working Individual'"));
    }

    #[test]
    fn unbound_placeholder_is_a_binding_error() {
        let renderer = PromptRenderer::new().unwrap();
        let err = renderer
            .render(templates::AMENITIES_PROMPT, &json!({"userPrimaryType": "Student"}))
            .unwrap_err();
        assert_eq!(err.kind(), "template_binding_error");
    }

    #[test]
    fn unknown_template_is_a_binding_error() {
        let renderer = PromptRenderer::new().unwrap();
        let err = renderer.render("nope", &json!({})).unwrap_err();
        assert_eq!(err.kind(), "template_binding_error");
    }
}

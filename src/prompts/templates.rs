//! Instruction templates, one per flow.
//!
//! Placeholders use the camelCase field names of the flow inputs. Optional
//! fields are either tested with `{% if %}` or printed through
//! `default("Not provided")`; printing a missing field without a fallback
//! fails the render.

pub const LOCATION_PROMPT: &str = "location_prompt";
pub const AMENITIES_PROMPT: &str = "amenities_prompt";
pub const STYLE_PROMPT: &str = "style_prompt";
pub const ACCOMMODATION_SUGGESTIONS: &str = "accommodation_suggestions";
pub const ACCOMMODATION_IMAGE: &str = "accommodation_image";
pub const EMAIL_INQUIRY: &str = "email_inquiry";

/// Shared partial: `<in> to <out>`, `Moving In: <date>` or `Not provided`.
pub const STAY_DATES: &str = "stay_dates";

const STAY_DATES_SOURCE: &str = "\
{%- if inboundDate -%}
{{ inboundDate }} to {{ outboundDate | default(\"Not provided\") }}
{%- elif movingInDate -%}
Moving In: {{ movingInDate }}
{%- else -%}
Not provided
{%- endif -%}";

/// Shared partial: the traveller brief as one line.
pub const TRAVELLER_SUMMARY: &str = "traveller_summary";

const TRAVELLER_SUMMARY_SOURCE: &str = "\
User Type: {{ userPrimaryType }} - {{ userSpecificType }}, \
Dates: {% include \"stay_dates\" %}, \
Adults: {{ adults }}, Children: {{ children }}, \
Budget Range: €{{ minBudget }}-€{{ maxBudget }} {{ budgetUnit | replace(\"_\", \" \") }}, \
Initial Query: '{{ initialFreeformQuery | default(\"Not provided\") }}'";

const LOCATION_PROMPT_SOURCE: &str = "\
Based on the user's initial input ({% include \"traveller_summary\" %}), generate a concise, conversational \
question to help them refine their location and neighborhood preferences in Dublin. \
Emphasize options relevant to their user type and specific situation.";

const STYLE_PROMPT_SOURCE: &str = "\
Based on the user's initial input ({% include \"traveller_summary\" %}), generate a concise, conversational \
question to help them refine their accommodation style preferences and any special needs they \
might have. Emphasize options relevant to their user type and specific situation. Consider \
aspects like desired aesthetic, noise level preferences, view preferences, and any specific \
local amenities they might be interested in. Provide example amenities tailored to the user \
type in the prompt.";

const AMENITIES_PROMPT_SOURCE: &str = "\
Based on the user type {{ userPrimaryType }} (specifically {{ userSpecificType }}), generate a \
concise, conversational question to help them refine their essential amenities preferences for \
accommodation. The prompt should be tailored to their user type. Examples:

- For a Working Professional: \"To ensure a comfortable and productive stay, which amenities are \
most crucial for you? Think about work-related facilities, personal comfort, and convenience.\"
- For a Student: \"For your student accommodation, which amenities are essential to make your \
living situation easy and enjoyable? Consider things like study space, communal areas, or \
laundry facilities.\"
- For a Tourist: \"Now, let's talk about the features that will make your stay truly \
comfortable as a tourist. Please select all that apply, keeping in mind your short or longer \
visit.\"

Ensure the prompt is engaging and helps the user think about their needs. The output should be \
a single question.";

const SUGGESTIONS_SOURCE: &str = "\
Given these detailed preferences for accommodation in Dublin: {{ refinedPreferencesJson }}. \
Find 3-5 unique, current, and highly suitable accommodation options in Dublin that match these \
criteria. For each option, provide: 'name', 'type', 'keyFeatures' (short bullet points), \
'estimatedPriceRange' (with unit per night/month), 'locationSnapshot', 'whyThisSuggestion' (a \
concise explanation of why it fits the user's needs), 'imageUrl' (a direct URL to a \
high-quality, real image of the property), 'mapCoordinates' (latitude and longitude as an \
object {lat: number, lng: number} for pinpointing on a map), and 'contactInfo' (email and phone \
number if publicly available). Prioritize options with real-time availability information if \
possible. Format the output as a JSON array of objects, most relevant first. The 'id' field of \
each object must be a unique identifier.";

const IMAGE_SOURCE: &str = "\
A high-quality, photorealistic image of the interior of a {{ type }} called \"{{ name }}\". \
It is described as: {{ description }}. The image should not contain any text or people.";

const EMAIL_SOURCE: &str = "\
Generate a polite, professional email body for a user inquiring about accommodation \
availability. The user's preferences are: {{ refinedPreferencesJson }}. The property they are \
inquiring about is named '{{ propertyName }}' and is a '{{ propertyType }}'. The user is a \
'{{ userPrimaryType }}' (specifically a '{{ userSpecificType }}'). Include details about their \
dates (moving in date for students/workers, inbound/outbound for tourists), number of people, \
budget range, and a specific reason for their interest in *this* property based on their \
refined preferences. Write finished prose: do not leave placeholders in curly braces.";

/// Every template as `(name, source)`.
pub const ALL: &[(&str, &str)] = &[
    (STAY_DATES, STAY_DATES_SOURCE),
    (TRAVELLER_SUMMARY, TRAVELLER_SUMMARY_SOURCE),
    (LOCATION_PROMPT, LOCATION_PROMPT_SOURCE),
    (AMENITIES_PROMPT, AMENITIES_PROMPT_SOURCE),
    (STYLE_PROMPT, STYLE_PROMPT_SOURCE),
    (ACCOMMODATION_SUGGESTIONS, SUGGESTIONS_SOURCE),
    (ACCOMMODATION_IMAGE, IMAGE_SOURCE),
    (EMAIL_INQUIRY, EMAIL_SOURCE),
];

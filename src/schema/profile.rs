//! The accumulated wizard state: who is travelling, when, and what they want.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use super::Validate;
use crate::error::FlowError;

/// Key the browser uses for the serialized profile in local storage.
pub const PROFILE_STORAGE_KEY: &str = "dublinpad-ai-form";

/// Date format used for every date field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA: &str = "PreferenceProfile";

/// Primary traveller type chosen on the first wizard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum PrimaryType {
    Student,
    #[serde(rename = "Working Individual")]
    WorkingIndividual,
    Tourist,
}

impl PrimaryType {
    /// Specific types that are valid under this primary type.
    pub fn specific_types(&self) -> &'static [&'static str] {
        match self {
            Self::Student => &[
                "Undergraduate",
                "Postgraduate",
                "Intern",
                "Erasmus Student",
                "Other Student",
            ],
            Self::WorkingIndividual => &[
                "Full-time Employee",
                "Intern",
                "Contractor",
                "Remote Worker",
                "Business Traveler",
                "Other Professional",
            ],
            Self::Tourist => &["Short Stay", "Longer Visit"],
        }
    }

    pub fn allows(&self, specific: &str) -> bool {
        self.specific_types().contains(&specific)
    }

    /// Residents give a moving-in date; tourists give arrival and departure.
    pub fn is_resident(&self) -> bool {
        !matches!(self, Self::Tourist)
    }

    /// Budget unit the wizard preselects for this type.
    pub fn default_budget_unit(&self) -> BudgetUnit {
        if self.is_resident() {
            BudgetUnit::PerMonth
        } else {
            BudgetUnit::PerNight
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::WorkingIndividual => "Working Individual",
            Self::Tourist => "Tourist",
        }
    }
}

impl fmt::Display for PrimaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrimaryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Student" => Ok(Self::Student),
            "Working Individual" => Ok(Self::WorkingIndividual),
            "Tourist" => Ok(Self::Tourist),
            other => Err(format!("unknown traveller type '{other}'")),
        }
    }
}

/// Unit the budget range is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BudgetUnit {
    PerNight,
    #[default]
    PerMonth,
}

impl fmt::Display for BudgetUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerNight => write!(f, "per_night"),
            Self::PerMonth => write!(f, "per_month"),
        }
    }
}

/// Stay dates, resolved from the mutually exclusive date fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StayDates<'a> {
    Visit {
        inbound: &'a str,
        outbound: Option<&'a str>,
    },
    MoveIn {
        date: &'a str,
    },
    Unspecified,
}

/// Everything the user has told the wizard so far.
///
/// Serialized as the same camelCase JSON object the browser keeps under
/// [`PROFILE_STORAGE_KEY`]. Missing keys fall back to the wizard's initial
/// values, and an empty `userPrimaryType` means "not chosen yet".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreferenceProfile {
    #[serde(deserialize_with = "blank_as_none")]
    pub user_primary_type: Option<PrimaryType>,
    pub user_specific_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbound_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbound_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moving_in_date: Option<String>,
    pub adults: u32,
    pub children: u32,
    pub min_budget: u32,
    pub max_budget: u32,
    pub budget_unit: BudgetUnit,
    pub initial_freeform_query: String,
    pub preferred_location: Vec<String>,
    pub neighborhood_vibe: Vec<String>,
    pub specific_landmarks: String,
    pub amenities: Vec<String>,
    pub accommodation_style: String,
    pub sound_preference: String,
    pub view_preference: Vec<String>,
    pub local_amenities_interest: String,
    pub additional_notes: String,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,
}

impl Default for PreferenceProfile {
    fn default() -> Self {
        Self {
            user_primary_type: None,
            user_specific_type: String::new(),
            inbound_date: None,
            outbound_date: None,
            moving_in_date: None,
            adults: 1,
            children: 0,
            min_budget: 500,
            max_budget: 2500,
            budget_unit: BudgetUnit::PerMonth,
            initial_freeform_query: String::new(),
            preferred_location: Vec::new(),
            neighborhood_vibe: Vec::new(),
            specific_landmarks: String::new(),
            amenities: Vec::new(),
            accommodation_style: String::new(),
            sound_preference: "Flexible".to_string(),
            view_preference: Vec::new(),
            local_amenities_interest: String::new(),
            additional_notes: String::new(),
            user_name: String::new(),
            user_email: String::new(),
            user_phone: String::new(),
        }
    }
}

impl PreferenceProfile {
    /// Choose the primary type.
    ///
    /// Resets the specific type, preselects the matching budget unit and
    /// drops dates that belong to the other traveller variant.
    pub fn with_primary_type(mut self, primary: PrimaryType) -> Self {
        self.user_primary_type = Some(primary);
        self.user_specific_type.clear();
        self.budget_unit = primary.default_budget_unit();
        self.normalized()
    }

    pub fn with_specific_type(mut self, specific: impl Into<String>) -> Self {
        self.user_specific_type = specific.into();
        self
    }

    pub fn with_visit_dates(mut self, inbound: impl Into<String>, outbound: impl Into<String>) -> Self {
        self.inbound_date = Some(inbound.into());
        self.outbound_date = Some(outbound.into());
        self.moving_in_date = None;
        self
    }

    pub fn with_moving_in_date(mut self, date: impl Into<String>) -> Self {
        self.moving_in_date = Some(date.into());
        self.inbound_date = None;
        self.outbound_date = None;
        self
    }

    pub fn with_party(mut self, adults: u32, children: u32) -> Self {
        self.adults = adults;
        self.children = children;
        self
    }

    pub fn with_budget(mut self, min: u32, max: u32, unit: BudgetUnit) -> Self {
        self.min_budget = min;
        self.max_budget = max;
        self.budget_unit = unit;
        self
    }

    /// Drop blank dates and dates that do not apply to the chosen type.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.inbound_date,
            &mut self.outbound_date,
            &mut self.moving_in_date,
        ] {
            if field.as_deref().is_some_and(|d| d.trim().is_empty()) {
                *field = None;
            }
        }
        match self.user_primary_type {
            Some(PrimaryType::Tourist) => self.moving_in_date = None,
            Some(_) => {
                self.inbound_date = None;
                self.outbound_date = None;
            }
            None => {}
        }
        self
    }

    /// Resolve which date variant the profile currently carries.
    pub fn stay(&self) -> StayDates<'_> {
        stay_dates(
            self.inbound_date.as_deref(),
            self.outbound_date.as_deref(),
            self.moving_in_date.as_deref(),
        )
    }

    /// Opaque JSON handed to later-stage flows and to browser storage.
    pub fn to_json_string(&self) -> Result<String, FlowError> {
        serde_json::to_string(self).map_err(|e| FlowError::schema(SCHEMA, e.to_string()))
    }

    /// Parse a stored profile; irrelevant or blank dates are dropped.
    pub fn from_json_str(raw: &str) -> Result<Self, FlowError> {
        serde_json::from_str::<Self>(raw)
            .map(Self::normalized)
            .map_err(|e| FlowError::schema(SCHEMA, e.to_string()))
    }
}

impl Validate for PreferenceProfile {
    fn validate(&self) -> Result<(), FlowError> {
        let Some(primary) = self.user_primary_type else {
            return Err(FlowError::schema(SCHEMA, "userPrimaryType is required"));
        };
        check_traveller(
            SCHEMA,
            primary,
            &self.user_specific_type,
            self.inbound_date.as_deref(),
            self.outbound_date.as_deref(),
            self.moving_in_date.as_deref(),
        )?;
        check_party_and_budget(SCHEMA, self.adults, self.min_budget, self.max_budget)
    }
}

pub(crate) fn stay_dates<'a>(
    inbound: Option<&'a str>,
    outbound: Option<&'a str>,
    moving_in: Option<&'a str>,
) -> StayDates<'a> {
    let present = |d: Option<&'a str>| d.filter(|s| !s.trim().is_empty());
    match (present(inbound), present(moving_in)) {
        (Some(inbound), _) => StayDates::Visit {
            inbound,
            outbound: present(outbound),
        },
        (None, Some(date)) => StayDates::MoveIn { date },
        (None, None) => StayDates::Unspecified,
    }
}

/// Type/date rules shared by the profile and the traveller brief.
pub(crate) fn check_traveller(
    schema: &str,
    primary: PrimaryType,
    specific: &str,
    inbound: Option<&str>,
    outbound: Option<&str>,
    moving_in: Option<&str>,
) -> Result<(), FlowError> {
    if !primary.allows(specific) {
        return Err(FlowError::schema(
            schema,
            format!("'{specific}' is not a valid specific type for {primary}"),
        ));
    }

    let present = |d: Option<&str>| d.is_some_and(|s| !s.trim().is_empty());

    if primary.is_resident() {
        if present(inbound) || present(outbound) {
            return Err(FlowError::schema(
                schema,
                format!("{primary} stays use movingInDate, not inbound/outbound dates"),
            ));
        }
        let date = moving_in
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| FlowError::schema(schema, "movingInDate is required"))?;
        parse_date(schema, "movingInDate", date)?;
    } else {
        if present(moving_in) {
            return Err(FlowError::schema(
                schema,
                "Tourist stays use inbound/outbound dates, not movingInDate",
            ));
        }
        let inbound = inbound
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| FlowError::schema(schema, "inboundDate is required"))?;
        let outbound = outbound
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| FlowError::schema(schema, "outboundDate is required"))?;
        let arrive = parse_date(schema, "inboundDate", inbound)?;
        let leave = parse_date(schema, "outboundDate", outbound)?;
        if leave < arrive {
            return Err(FlowError::schema(
                schema,
                format!("outboundDate {outbound} is before inboundDate {inbound}"),
            ));
        }
    }
    Ok(())
}

pub(crate) fn check_party_and_budget(
    schema: &str,
    adults: u32,
    min_budget: u32,
    max_budget: u32,
) -> Result<(), FlowError> {
    if adults < 1 {
        return Err(FlowError::schema(schema, "at least one adult is required"));
    }
    if min_budget > max_budget {
        return Err(FlowError::schema(
            schema,
            format!("minBudget {min_budget} exceeds maxBudget {max_budget}"),
        ));
    }
    Ok(())
}

fn parse_date(schema: &str, field: &str, value: &str) -> Result<NaiveDate, FlowError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        FlowError::schema(schema, format!("{field} '{value}' is not a YYYY-MM-DD date"))
    })
}

/// The browser stores `""` for an unanswered type question.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<PrimaryType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

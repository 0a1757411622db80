//! Content-safety policy: per-category block thresholds sent with a request.
//!
//! The policy is a plain table so thresholds can change (in code or from the
//! environment) without touching the flows that use it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Harm categories the backend can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
}

impl HarmCategory {
    pub const ALL: [HarmCategory; 4] = [
        Self::HateSpeech,
        Self::DangerousContent,
        Self::Harassment,
        Self::SexuallyExplicit,
    ];

    /// Suffix used for `DUBLINPAD_SAFETY_<KEY>` overrides.
    pub fn env_key(&self) -> &'static str {
        match self {
            Self::HateSpeech => "HATE_SPEECH",
            Self::DangerousContent => "DANGEROUS_CONTENT",
            Self::Harassment => "HARASSMENT",
            Self::SexuallyExplicit => "SEXUALLY_EXPLICIT",
        }
    }
}

/// How aggressively a category is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

impl fmt::Display for HarmBlockThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockNone => write!(f, "BLOCK_NONE"),
            Self::BlockOnlyHigh => write!(f, "BLOCK_ONLY_HIGH"),
            Self::BlockMediumAndAbove => write!(f, "BLOCK_MEDIUM_AND_ABOVE"),
            Self::BlockLowAndAbove => write!(f, "BLOCK_LOW_AND_ABOVE"),
        }
    }
}

impl FromStr for HarmBlockThreshold {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BLOCK_NONE" => Ok(Self::BlockNone),
            "BLOCK_ONLY_HIGH" => Ok(Self::BlockOnlyHigh),
            "BLOCK_MEDIUM_AND_ABOVE" => Ok(Self::BlockMediumAndAbove),
            "BLOCK_LOW_AND_ABOVE" => Ok(Self::BlockLowAndAbove),
            other => Err(format!("unknown block threshold '{other}'")),
        }
    }
}

/// One row of the policy table, in the backend's wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Thresholds used by the accommodation suggestions flow.
const SUGGESTION_THRESHOLDS: [SafetySetting; 4] = [
    SafetySetting {
        category: HarmCategory::HateSpeech,
        threshold: HarmBlockThreshold::BlockOnlyHigh,
    },
    SafetySetting {
        category: HarmCategory::DangerousContent,
        threshold: HarmBlockThreshold::BlockNone,
    },
    SafetySetting {
        category: HarmCategory::Harassment,
        threshold: HarmBlockThreshold::BlockMediumAndAbove,
    },
    SafetySetting {
        category: HarmCategory::SexuallyExplicit,
        threshold: HarmBlockThreshold::BlockLowAndAbove,
    },
];

/// Category → threshold table.
///
/// At most one row per category; setting a category again replaces its row
/// in place so the table order stays stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafetyPolicy {
    settings: Vec<SafetySetting>,
}

impl SafetyPolicy {
    /// Empty policy: the backend's own defaults apply.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default policy for accommodation suggestions.
    pub fn suggestions() -> Self {
        Self {
            settings: SUGGESTION_THRESHOLDS.to_vec(),
        }
    }

    pub fn with_threshold(mut self, category: HarmCategory, threshold: HarmBlockThreshold) -> Self {
        match self.settings.iter_mut().find(|s| s.category == category) {
            Some(existing) => existing.threshold = threshold,
            None => self.settings.push(SafetySetting {
                category,
                threshold,
            }),
        }
        self
    }

    pub fn threshold(&self, category: HarmCategory) -> Option<HarmBlockThreshold> {
        self.settings
            .iter()
            .find(|s| s.category == category)
            .map(|s| s.threshold)
    }

    pub fn settings(&self) -> &[SafetySetting] {
        &self.settings
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

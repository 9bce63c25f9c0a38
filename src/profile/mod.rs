//! Profile store: the editable identity fields that prime the assistant.
//!
//! Fields start from built-in defaults, are overridden by the `[profile]`
//! section of the config file, and are edited during a session through
//! [`ProfileFields::set`]. No history is kept.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod document;

/// Errors raised when editing the profile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    /// The field name is not one of the editable fields.
    #[error("unknown profile field '{0}' (expected one of: name, roles, organizations, interests, achievements, tone)")]
    UnknownField(String),
    /// The tone value is not one of the supported tones.
    #[error("unknown tone '{0}' (expected one of: professional, warm, crisp, enthusiastic)")]
    UnknownTone(String),
}

/// Response tone requested from the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Tone {
    /// Measured, businesslike.
    #[default]
    Professional,
    /// Friendly and personable.
    Warm,
    /// Short, to the point.
    Crisp,
    /// Upbeat and energetic.
    Enthusiastic,
}

impl Tone {
    /// All tones in display order.
    pub const ALL: [Tone; 4] = [
        Tone::Professional,
        Tone::Warm,
        Tone::Crisp,
        Tone::Enthusiastic,
    ];

    /// Human-readable label interpolated into the prompt.
    pub fn label(self) -> &'static str {
        match self {
            Self::Professional => "Professional",
            Self::Warm => "Warm",
            Self::Crisp => "Crisp & concise",
            Self::Enthusiastic => "Enthusiastic",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tone {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "professional" => Ok(Self::Professional),
            "warm" => Ok(Self::Warm),
            "crisp" | "concise" | "crisp & concise" | "crisp-and-concise" => Ok(Self::Crisp),
            "enthusiastic" => Ok(Self::Enthusiastic),
            _ => Err(ProfileError::UnknownTone(s.to_owned())),
        }
    }
}

impl TryFrom<String> for Tone {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Tone> for String {
    fn from(tone: Tone) -> Self {
        tone.label().to_owned()
    }
}

/// Editable profile field selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    /// Display name.
    Name,
    /// Roles or titles.
    Roles,
    /// Organisations or sectors.
    Organizations,
    /// Interests or domains.
    Interests,
    /// Key achievements, usually a bulleted list.
    Achievements,
    /// Response tone.
    Tone,
}

impl FromStr for ProfileField {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "roles" | "role" | "titles" => Ok(Self::Roles),
            "organizations" | "organisations" | "orgs" | "sectors" => Ok(Self::Organizations),
            "interests" | "domains" => Ok(Self::Interests),
            "achievements" => Ok(Self::Achievements),
            "tone" => Ok(Self::Tone),
            _ => Err(ProfileError::UnknownField(s.to_owned())),
        }
    }
}

/// Current values of the user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileFields {
    /// Display name.
    pub name: String,
    /// Roles or titles.
    pub roles: String,
    /// Organisations or sectors.
    #[serde(alias = "organisations", alias = "organizations_sectors")]
    pub organizations: String,
    /// Interests or domains.
    pub interests: String,
    /// Key achievements.
    pub achievements: String,
    /// Requested response tone.
    pub tone: Tone,
    /// Structured profile record loaded from an external JSON document.
    #[serde(skip)]
    pub record: Option<Map<String, Value>>,
}

impl Default for ProfileFields {
    fn default() -> Self {
        Self {
            name: "Your Name".to_owned(),
            roles: "Engineering Lead".to_owned(),
            organizations: "Analytical Instruments; Aerospace; Consumer goods".to_owned(),
            interests: "Organizational Strategy; Quantum computing; AI & data; \
                        Operations & supply chain; Sustainability"
                .to_owned(),
            achievements: "- Led cross-functional R&D teams\n\
                           - Designed analytics instrumentation improvements\n\
                           - MBA projects on quantum and supply chain"
                .to_owned(),
            tone: Tone::Professional,
            record: None,
        }
    }
}

impl ProfileFields {
    /// Update one field from its textual value.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::UnknownTone`] when setting an unsupported tone.
    pub fn set(&mut self, field: ProfileField, value: &str) -> Result<(), ProfileError> {
        let value = value.trim();
        match field {
            ProfileField::Name => self.name = value.to_owned(),
            ProfileField::Roles => self.roles = value.to_owned(),
            ProfileField::Organizations => self.organizations = value.to_owned(),
            ProfileField::Interests => self.interests = value.to_owned(),
            ProfileField::Achievements => self.achievements = value.to_owned(),
            ProfileField::Tone => self.tone = value.parse()?,
        }
        Ok(())
    }

    /// Editable fields as a JSON object, for prompts and previews.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "roles": self.roles,
            "organizations_sectors": self.organizations,
            "interests": self.interests,
            "achievements": self.achievements,
            "tone": self.tone.label(),
        })
    }
}

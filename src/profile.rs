// src/profile.rs
//! Influencer persona data, validated once at the state-construction boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Persona archetypes: values (Skeptic, Conservative, Community) and
/// format (News, Culture, Educator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfluencerTag {
    Skeptic,
    Conservative,
    Community,
    News,
    Culture,
    Educator,
}

impl InfluencerTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skeptic => "Skeptic",
            Self::Conservative => "Conservative",
            Self::Community => "Community",
            Self::News => "News",
            Self::Culture => "Culture",
            Self::Educator => "Educator",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InfluencerProfile {
    pub id: String,
    pub name: String,
    /// Multi-dimensional persona; order is kept, duplicates are dropped.
    pub archetypes: Vec<InfluencerTag>,
    /// Historical "par" lead volume.
    #[serde(default)]
    pub avg_lead_volume: Option<u64>,
}

impl InfluencerProfile {
    /// Shape-check a caller-supplied JSON value.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        if !value.is_object() {
            return Err(ValidationError::Field {
                field: "influencer_profile",
                reason: "expected a JSON object".to_string(),
            });
        }
        let mut profile: InfluencerProfile = serde_json::from_value(value)?;

        let mut seen = Vec::with_capacity(profile.archetypes.len());
        profile.archetypes.retain(|tag| {
            if seen.contains(tag) {
                false
            } else {
                seen.push(*tag);
                true
            }
        });

        Ok(profile)
    }

    pub fn archetype_labels(&self) -> Vec<&'static str> {
        self.archetypes.iter().map(InfluencerTag::as_str).collect()
    }
}

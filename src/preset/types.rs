use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::param::ConfigState;

/// Id of the synthetic Default preset. Never stored.
pub const DEFAULT_PRESET_ID: &str = "default";

/// Opaque identifier of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// A saved configuration snapshot for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub model_id: String,
    /// Sparse values, merged over the model's defaults on apply.
    pub values: ConfigState,
    #[serde(default)]
    pub is_favorite: bool,
    /// True only for the synthetic Default preset.
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Preset {
    /// The synthetic Default preset for a model: empty values, so applying
    /// it resolves to the model's defaults.
    pub fn synthetic_default(model_id: &str) -> Self {
        Self {
            id: DEFAULT_PRESET_ID.to_string(),
            name: "Default".to_string(),
            model_id: model_id.to_string(),
            values: ConfigState::new(),
            is_favorite: false,
            is_default: true,
            created_at: DateTime::UNIX_EPOCH,
        }
    }
}

/// Payload for creating a preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPreset {
    pub model_id: String,
    pub name: String,
    pub values: ConfigState,
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresetUpdate {
    pub name: Option<String>,
    pub values: Option<ConfigState>,
    pub is_favorite: Option<bool>,
}

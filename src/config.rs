//! Model catalog.
//!
//! Deployments configure the available models through environment
//! variables: `CONFIGURATOR_MODEL_<n>_TICKET` and `..._URL` declare a
//! model (n = 1..=8), with optional `..._NAME`, `..._DESCRIPTION`, and
//! `..._THUMBNAIL`. A legacy single-model pair `CONFIGURATOR_TICKET` /
//! `CONFIGURATOR_MODEL_VIEW_URL` is checked first and keeps the id
//! `default`.

use serde::{Deserialize, Serialize};

const PLACEHOLDER_TICKET: &str = "your-ticket-here";
const MAX_NUMBERED_MODELS: usize = 8;

/// One configured model: the ticket and view URL the engine needs to open
/// a session, plus display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    pub name: String,
    pub ticket: String,
    pub model_view_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl ModelConfig {
    /// A model is usable when it has a real ticket and a view URL.
    pub fn is_valid(&self) -> bool {
        !self.ticket.is_empty()
            && self.ticket != PLACEHOLDER_TICKET
            && !self.model_view_url.is_empty()
    }
}

/// All models available to this deployment, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: Vec<ModelConfig>,
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelConfig>) -> Self {
        Self { models }
    }

    /// Read the catalog from the process environment.
    pub fn from_env() -> Self {
        let mut models = Vec::new();

        if let (Some(ticket), Some(url)) = (
            env_var("CONFIGURATOR_TICKET"),
            env_var("CONFIGURATOR_MODEL_VIEW_URL"),
        ) {
            models.push(ModelConfig {
                id: "default".to_string(),
                name: env_var("CONFIGURATOR_MODEL_NAME")
                    .unwrap_or_else(|| "Default Model".to_string()),
                ticket,
                model_view_url: url,
                description: env_var("CONFIGURATOR_MODEL_DESCRIPTION").unwrap_or_default(),
                thumbnail: None,
            });
        }

        for n in 1..=MAX_NUMBERED_MODELS {
            let ticket = env_var(&format!("CONFIGURATOR_MODEL_{}_TICKET", n));
            let url = env_var(&format!("CONFIGURATOR_MODEL_{}_URL", n));
            if let (Some(ticket), Some(model_view_url)) = (ticket, url) {
                models.push(ModelConfig {
                    id: format!("model-{}", n),
                    name: env_var(&format!("CONFIGURATOR_MODEL_{}_NAME", n))
                        .unwrap_or_else(|| format!("Model {}", n)),
                    ticket,
                    model_view_url,
                    description: env_var(&format!("CONFIGURATOR_MODEL_{}_DESCRIPTION", n))
                        .unwrap_or_default(),
                    thumbnail: env_var(&format!("CONFIGURATOR_MODEL_{}_THUMBNAIL", n)),
                });
            }
        }

        Self { models }
    }

    pub fn models(&self) -> &[ModelConfig] {
        &self.models
    }

    /// The model shown on first load: the first configured one.
    pub fn default_model(&self) -> Option<&ModelConfig> {
        self.models.first()
    }

    pub fn get(&self, id: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.id == id)
    }

    /// At least one usable model is configured.
    pub fn is_valid(&self) -> bool {
        self.models.iter().any(|m| m.is_valid())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

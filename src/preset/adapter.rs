//! Preset store adapter.
//!
//! The backing store enforces ownership itself; this layer decides what
//! the control surface sees. Listing failures degrade to the synthetic
//! Default preset alone, and ownership rejections on update/delete are
//! absorbed as no-ops, so preset trouble never blocks configuring.

use std::future::Future;

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::param::{ConfigState, ParameterRegistry};

use super::types::{NewPreset, Preset, PresetUpdate, UserId};

/// Source of the current authenticated identity.
pub trait AuthProvider: Send + Sync + 'static {
    /// `None` while signed out.
    fn current_user_id(&self) -> Option<UserId>;
}

/// The external preset store.
///
/// `list` returns the caller's presets newest-first. Ownership is the
/// store's job: mutating someone else's preset yields [`StoreError::Forbidden`].
pub trait PresetStore: Send + Sync + 'static {
    fn list(
        &self,
        user: &UserId,
        model_id: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Preset>, StoreError>> + Send;

    fn insert(
        &self,
        user: &UserId,
        preset: NewPreset,
    ) -> impl Future<Output = Result<Preset, StoreError>> + Send;

    fn update(
        &self,
        user: &UserId,
        preset_id: &str,
        update: PresetUpdate,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete(
        &self,
        user: &UserId,
        preset_id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Preset operations as the control surface consumes them.
pub struct PresetManager<S, A> {
    store: S,
    auth: A,
}

impl<S: PresetStore, A: AuthProvider> PresetManager<S, A> {
    pub fn new(store: S, auth: A) -> Self {
        Self { store, auth }
    }

    /// Presets for one model: the synthetic Default first, then the user's
    /// saved presets newest-first. Signed-out users and store failures both
    /// degrade to the Default alone.
    pub async fn list(&self, model_id: &str) -> Vec<Preset> {
        let mut out = vec![Preset::synthetic_default(model_id)];

        let Some(user) = self.auth.current_user_id() else {
            return out;
        };
        match self.store.list(&user, Some(model_id)).await {
            Ok(mut saved) => {
                saved.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                out.extend(saved);
            }
            Err(e) => warn!(model_id, "Listing presets failed: {}", e),
        }
        out
    }

    /// Every saved preset of the current user, across models, newest-first.
    pub async fn list_all(&self) -> Result<Vec<Preset>, StoreError> {
        let user = self.auth.current_user_id().ok_or(StoreError::Unauthenticated)?;
        let mut saved = self.store.list(&user, None).await?;
        saved.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(saved)
    }

    /// Save the given values under a new preset name.
    pub async fn create(&self, preset: NewPreset) -> Result<Preset, StoreError> {
        let user = self.auth.current_user_id().ok_or(StoreError::Unauthenticated)?;
        let name = preset.name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidName);
        }
        let preset = NewPreset {
            name: name.to_string(),
            ..preset
        };
        self.store.insert(&user, preset).await
    }

    /// Apply a partial update. An ownership rejection from the store is a
    /// no-op, not an error.
    pub async fn update(&self, preset_id: &str, update: PresetUpdate) -> Result<(), StoreError> {
        let user = self.auth.current_user_id().ok_or(StoreError::Unauthenticated)?;
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(StoreError::InvalidName);
            }
        }
        match self.store.update(&user, preset_id, update).await {
            Err(StoreError::Forbidden) => {
                debug!(preset_id, "Update refused by store, ignoring");
                Ok(())
            }
            other => other,
        }
    }

    /// Delete a preset. Ownership rejections are no-ops.
    pub async fn delete(&self, preset_id: &str) -> Result<(), StoreError> {
        let user = self.auth.current_user_id().ok_or(StoreError::Unauthenticated)?;
        match self.store.delete(&user, preset_id).await {
            Err(StoreError::Forbidden) => {
                debug!(preset_id, "Delete refused by store, ignoring");
                Ok(())
            }
            other => other,
        }
    }

    pub async fn toggle_favorite(
        &self,
        preset_id: &str,
        is_favorite: bool,
    ) -> Result<(), StoreError> {
        self.update(
            preset_id,
            PresetUpdate {
                is_favorite: Some(is_favorite),
                ..Default::default()
            },
        )
        .await
    }
}

/// Resolve a preset into a full configuration state: the registry's
/// defaults with the preset's sparse values merged on top. Entries for
/// parameters the registry no longer knows are dropped. The synthetic
/// Default resolves to the defaults alone.
pub fn apply_preset(preset: &Preset, registry: &ParameterRegistry) -> ConfigState {
    let mut state = registry.defaults();
    if preset.is_default {
        return state;
    }
    for (id, value) in preset.values.iter() {
        if let Some(def) = registry.get(id) {
            state.insert(id.clone(), crate::param::clamp_value(def, value));
        }
    }
    state
}

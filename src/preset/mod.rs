//! Named configuration presets.
//!
//! Presets are per-user rows in an external store; the synthetic
//! "Default" preset (the model's factory values) exists only client-side
//! and is prepended to every listing.

mod adapter;
mod types;

pub use adapter::{apply_preset, AuthProvider, PresetManager, PresetStore};
pub use types::{NewPreset, Preset, PresetUpdate, UserId, DEFAULT_PRESET_ID};

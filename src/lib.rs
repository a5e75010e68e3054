//! Core logic for the parametric model configurator.
//!
//! The "hard" part of the configurator is not geometry -- that lives in the
//! remote model engine -- but keeping UI state synchronized with it: mapping
//! the engine's dynamic parameter set onto typed controls, debouncing and
//! batching parameter writes, serializing a configuration to a shareable
//! token, and persisting named presets per user and model. This crate owns
//! exactly that layer. Rendering, authentication, and persistence stay
//! behind collaborator traits ([`engine`], [`preset`]).

pub mod codec;
pub mod config;
pub mod engine;
mod error;
pub mod mutator;
pub mod param;
pub mod preset;
pub mod session;
pub mod share;

pub use error::{ConfigError, EngineError, StoreError};
pub use param::{
    ConfigState, ParamType, ParamValue, ParameterDefinition, ParameterGroup, ParameterRegistry,
};

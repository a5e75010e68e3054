//! Collaborator traits for the remote model engine.
//!
//! The engine owns the parametric geometry: it exposes a dynamic parameter
//! set, regenerates output when values change, and renders into a surface
//! this crate never touches directly. Everything here is a seam; the crate
//! ships no engine implementation beyond test doubles.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::param::ParamValue;

/// A parameter exactly as the engine reports it, before typing.
///
/// `type` is a free-form string and `value`/`defval` arrive as untyped JSON;
/// [`crate::param::ParameterRegistry::from_engine`] folds this into the
/// closed typed model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawParameter {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub displayname: Option<String>,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub defval: Option<Value>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub decimalplaces: Option<u32>,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub group: Option<RawParameterGroup>,
    #[serde(default)]
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawParameterGroup {
    pub id: String,
    pub name: String,
}

/// A derived artifact (export or computed output) exposed by a session.
/// Pass-through only; this crate does not interpret the content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineArtifact {
    pub id: String,
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub content: Value,
}

/// Opaque handle to the display surface a viewport renders into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceTarget(pub String);

/// Factory for engine connections.
pub trait ModelEngine: Send + Sync + 'static {
    type Session: EngineSession;
    type Viewport: EngineViewport;

    fn create_session(
        &self,
        ticket: &str,
        model_view_url: &str,
    ) -> impl Future<Output = Result<Self::Session, EngineError>> + Send;

    fn create_viewport(
        &self,
        surface: SurfaceTarget,
    ) -> impl Future<Output = Result<Self::Viewport, EngineError>> + Send;
}

/// A live connection to one model.
pub trait EngineSession: Send + Sync + 'static {
    /// Snapshot of the parameter definitions the engine currently exposes.
    fn parameters(&self) -> Vec<RawParameter>;

    /// Write one live parameter value. Unknown ids are ignored.
    fn set_parameter_value(&self, id: &str, value: &ParamValue);

    /// Trigger regeneration using the currently-set parameter values.
    fn customize(&self) -> impl Future<Output = Result<(), EngineError>> + Send;

    fn exports(&self) -> Vec<EngineArtifact>;

    fn outputs(&self) -> Vec<EngineArtifact>;

    /// Idempotent teardown of the remote session.
    fn close(&self) -> Result<(), EngineError>;
}

/// A rendering viewport bound to a surface.
pub trait EngineViewport: Send + Sync + 'static {
    /// Idempotent teardown of the viewport and its surface binding.
    fn close(&self) -> Result<(), EngineError>;
}

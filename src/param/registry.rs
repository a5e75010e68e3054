//! Typed, ordered view over the engine's parameter set.
//!
//! Built once per session from the raw definitions the engine exposes.
//! Hidden parameters are dropped at the door; everything that remains is
//! typed, clamped, and projectable into ordered UI groups.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use crate::engine::RawParameter;

use super::clamp::clamp_value;
use super::types::{ConfigState, ParamType, ParamValue, ParameterDefinition};

/// Name of the implicit group for parameters without one. Sorts first.
pub const GENERAL_GROUP: &str = "General";

/// An ordered group of parameters, as rendered by the control panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGroup {
    pub name: String,
    pub parameters: Vec<ParameterDefinition>,
}

/// The registry view over a session's visible parameters.
pub struct ParameterRegistry {
    params: Vec<ParameterDefinition>,
    index: HashMap<String, usize>,
}

impl ParameterRegistry {
    /// Build the registry from the engine's raw parameter list.
    ///
    /// Hidden parameters are excluded entirely. Incoming current and default
    /// values are clamped so the registry never holds an out-of-range value.
    /// Duplicate ids keep the first occurrence.
    pub fn from_engine(raw: impl IntoIterator<Item = RawParameter>) -> Self {
        let mut params = Vec::new();
        let mut index = HashMap::new();

        for r in raw {
            if r.hidden {
                continue;
            }
            if index.contains_key(&r.id) {
                warn!(id = %r.id, "Duplicate parameter id from engine, keeping first");
                continue;
            }
            let def = definition_from_raw(r);
            index.insert(def.id.clone(), params.len());
            params.push(def);
        }

        Self { params, index }
    }

    /// Project into ordered groups: "General" first, remaining groups
    /// alphabetical; within each group by `order` ascending, ties keeping
    /// the engine's original ordering.
    pub fn project(&self) -> Vec<ParameterGroup> {
        let mut by_name: BTreeMap<String, Vec<ParameterDefinition>> = BTreeMap::new();
        for p in &self.params {
            let name = p.group.clone().unwrap_or_else(|| GENERAL_GROUP.to_string());
            by_name.entry(name).or_default().push(p.clone());
        }

        let mut out = Vec::with_capacity(by_name.len());
        if let Some(parameters) = by_name.remove(GENERAL_GROUP) {
            out.push(ParameterGroup {
                name: GENERAL_GROUP.to_string(),
                parameters,
            });
        }
        for (name, parameters) in by_name {
            out.push(ParameterGroup { name, parameters });
        }

        for group in &mut out {
            // Stable, so ties stay in registry order.
            group.parameters.sort_by_key(|p| p.order);
        }
        out
    }

    pub fn get(&self, id: &str) -> Option<&ParameterDefinition> {
        self.index.get(id).map(|&i| &self.params[i])
    }

    pub fn params(&self) -> &[ParameterDefinition] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Full state mapping every parameter to its default value.
    pub fn defaults(&self) -> ConfigState {
        self.params
            .iter()
            .map(|p| (p.id.clone(), p.default_value.clone()))
            .collect()
    }

    /// Full state mapping every parameter to its current value.
    pub fn current(&self) -> ConfigState {
        self.params
            .iter()
            .map(|p| (p.id.clone(), p.value.clone()))
            .collect()
    }

    /// Clamp `raw` against the parameter's definition and record it as the
    /// current value. Returns the clamped value, or `None` for unknown ids.
    pub fn set_value(&mut self, id: &str, raw: &ParamValue) -> Option<ParamValue> {
        let &i = self.index.get(id)?;
        let clamped = clamp_value(&self.params[i], raw);
        self.params[i].value = clamped.clone();
        Some(clamped)
    }

    /// Apply a configuration state: unknown parameter ids are ignored,
    /// known values are clamped and recorded. Returns the applied
    /// assignments, ready to forward to the engine.
    pub fn apply(&mut self, state: &ConfigState) -> Vec<(String, ParamValue)> {
        let mut applied = Vec::new();
        for (id, value) in state.iter() {
            if let Some(clamped) = self.set_value(id, value) {
                applied.push((id.clone(), clamped));
            }
        }
        applied
    }
}

fn definition_from_raw(raw: RawParameter) -> ParameterDefinition {
    let param_type = ParamType::from_engine_type(&raw.param_type, !raw.choices.is_empty());

    let seed = type_seed(param_type, raw.min);
    let default_value = raw
        .defval
        .as_ref()
        .and_then(ParamValue::from_json)
        .unwrap_or_else(|| seed.clone());
    let value = ParamValue::from_json(&raw.value).unwrap_or_else(|| default_value.clone());

    let name = raw.name;
    let mut def = ParameterDefinition {
        id: raw.id,
        display_name: raw.displayname.unwrap_or_else(|| name.clone()),
        name,
        param_type,
        value,
        default_value,
        min: raw.min,
        max: raw.max,
        decimal_places: raw.decimalplaces,
        choices: raw.choices,
        group: raw.group.map(|g| g.name),
        order: raw.order.unwrap_or(0),
        tooltip: raw.tooltip,
    };

    let default = def.default_value.clone();
    def.default_value = clamp_value(&def, &default);
    let current = def.value.clone();
    def.value = clamp_value(&def, &current);
    def
}

/// Starting value for a parameter whose engine definition carries neither
/// a value nor a default.
fn type_seed(param_type: ParamType, min: Option<f64>) -> ParamValue {
    match param_type {
        ParamType::Bool => ParamValue::Bool(false),
        ParamType::Int => ParamValue::Int(min.unwrap_or(0.0) as i64),
        ParamType::Float => ParamValue::Float(min.unwrap_or(0.0)),
        ParamType::Choice => ParamValue::Int(0),
        ParamType::Color => ParamValue::Text("ffffff".to_string()),
        ParamType::Text => ParamValue::Text(String::new()),
    }
}

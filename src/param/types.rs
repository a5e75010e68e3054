//! Typed parameter model.
//!
//! The engine reports parameter types as free-form strings. At this
//! boundary they are folded into a closed enum so everything downstream
//! (projection, clamping, presets) is total over engine input.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of parameter types the configurator renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Bool,
    Int,
    Float,
    Color,
    Text,
    Choice,
}

impl ParamType {
    /// Map an engine type string to a typed variant.
    ///
    /// `Even` and `Odd` are numeric parameters with an integer step, so they
    /// render as integers. A `String` parameter that carries choices is a
    /// dropdown. Anything unrecognized falls back to plain text, which keeps
    /// this a total function over whatever the engine reports.
    pub fn from_engine_type(engine_type: &str, has_choices: bool) -> Self {
        match engine_type {
            "Bool" => Self::Bool,
            "Int" | "Even" | "Odd" => Self::Int,
            "Float" => Self::Float,
            "Color" => Self::Color,
            "StringList" => Self::Choice,
            "String" if has_choices => Self::Choice,
            _ => Self::Text,
        }
    }
}

/// A parameter value as carried through configuration states, tokens,
/// and presets.
///
/// Serializes untagged, so tokens contain plain JSON scalars. Choice
/// values are carried as integer indexes into the parameter's choices
/// (the engine convention).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }

    /// Convert a raw JSON scalar from the engine. Arrays, objects, and
    /// nulls have no value representation and yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Equality is numeric across `Int`/`Float`, so a token that carries `75`
/// matches a default of `75.0`.
impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

/// The textual form written to engines that take string values.
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// A fully typed parameter definition, as held by the registry.
///
/// Hidden parameters are filtered out before this type is ever built, so
/// there is no `hidden` flag here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDefinition {
    /// Stable identifier, unique within a session.
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub param_type: ParamType,
    /// Current value. Always within `[min, max]` for numeric types and a
    /// valid choice index for choices, after any mutation.
    pub value: ParamValue,
    /// Value the parameter reverts to.
    pub default_value: ParamValue,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Float precision; integers round to whole steps.
    pub decimal_places: Option<u32>,
    pub choices: Vec<String>,
    /// Group name for UI organization; `None` lands in the implicit
    /// "General" group.
    pub group: Option<String>,
    pub order: i64,
    pub tooltip: Option<String>,
}

/// A parameter-id to value mapping.
///
/// Two variants in practice: *full* (every visible parameter present) and
/// *sparse* (only values differing from defaults, as produced by
/// [`crate::codec::diff`]). Keys are ordered so serialization is canonical.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigState(BTreeMap<String, ParamValue>);

impl ConfigState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, value: ParamValue) -> Option<ParamValue> {
        self.0.insert(id.into(), value)
    }

    pub fn get(&self, id: &str) -> Option<&ParamValue> {
        self.0.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<ParamValue> {
        self.0.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }
}

impl FromIterator<(String, ParamValue)> for ConfigState {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ConfigState {
    type Item = (String, ParamValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

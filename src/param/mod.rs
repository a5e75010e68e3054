mod clamp;
mod registry;
mod types;

pub use clamp::clamp_value;
pub use registry::{ParameterGroup, ParameterRegistry, GENERAL_GROUP};
pub use types::{ConfigState, ParamType, ParamValue, ParameterDefinition};

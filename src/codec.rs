//! Configuration token codec.
//!
//! A token is the canonical JSON serialization of a sparse configuration
//! state, base64url-encoded without padding so it can ride in a URL query
//! parameter untouched. The codec is a pure serialization layer: it does
//! not validate values against any registry -- clamping happens at apply
//! time.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;

use crate::error::ConfigError;
use crate::param::{ConfigState, ParamValue};

/// Encode a configuration state to a URL-safe token.
///
/// Callers normally pass a sparse state (see [`diff`]) to keep tokens short.
pub fn encode(state: &ConfigState) -> String {
    let json = serde_json::to_vec(state).unwrap_or_else(|_| b"{}".to_vec());
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a token back into a configuration state.
///
/// Tokens minted by older clients used the standard base64 alphabet with
/// padding; those still decode. Entries whose values are not JSON scalars
/// are skipped. Unknown parameter ids are preserved here and ignored at
/// apply time, so a token generated against model version N still applies
/// against version N+1.
pub fn decode(token: &str) -> Result<ConfigState, ConfigError> {
    let token = token.trim();
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .or_else(|_| STANDARD.decode(token))
        .map_err(|e| ConfigError::Malformed(format!("invalid encoding: {}", e)))?;

    let payload: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| ConfigError::Malformed(format!("invalid JSON: {}", e)))?;

    let serde_json::Value::Object(map) = payload else {
        return Err(ConfigError::Malformed(
            "payload is not an object".to_string(),
        ));
    };

    let mut state = ConfigState::new();
    for (id, value) in map {
        if let Some(v) = ParamValue::from_json(&value) {
            state.insert(id, v);
        }
    }
    Ok(state)
}

/// Keep only the entries of `full` whose value differs from `defaults`.
/// A key missing from `defaults` counts as differing.
pub fn diff(full: &ConfigState, defaults: &ConfigState) -> ConfigState {
    full.iter()
        .filter(|(id, value)| defaults.get(id).map_or(true, |d| d != *value))
        .map(|(id, value)| (id.clone(), value.clone()))
        .collect()
}

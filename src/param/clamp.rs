//! Per-type value coercion.
//!
//! Clamping is the only validation this crate performs, and it never
//! fails: unparseable input falls back to the parameter's current value,
//! out-of-range numbers are pulled to the nearest bound. The UI never
//! sees a validation error.

use super::types::{ParamType, ParamValue, ParameterDefinition};

/// Coerce a raw value into a valid value for `def`.
pub fn clamp_value(def: &ParameterDefinition, raw: &ParamValue) -> ParamValue {
    match def.param_type {
        ParamType::Bool => clamp_bool(def, raw),
        ParamType::Int => clamp_number(def, raw, false),
        ParamType::Float => clamp_number(def, raw, true),
        ParamType::Choice => clamp_choice(def, raw),
        ParamType::Color => clamp_color(def, raw),
        ParamType::Text => match raw {
            ParamValue::Text(s) => ParamValue::Text(s.clone()),
            other => ParamValue::Text(other.to_string()),
        },
    }
}

/// The value to fall back to when input cannot be interpreted: the current
/// value if it already inhabits the parameter's type, otherwise a typed zero.
fn fallback(def: &ParameterDefinition) -> ParamValue {
    match (def.param_type, &def.value) {
        (ParamType::Bool, v @ ParamValue::Bool(_)) => v.clone(),
        (ParamType::Int, v @ ParamValue::Int(_)) => v.clone(),
        (ParamType::Float, v @ ParamValue::Float(_)) => v.clone(),
        (ParamType::Float, v @ ParamValue::Int(_)) => v.clone(),
        (ParamType::Choice, v @ ParamValue::Int(_)) => v.clone(),
        (ParamType::Color, v @ ParamValue::Text(_)) => v.clone(),
        (ParamType::Text, v) => v.clone(),
        (ParamType::Bool, _) => ParamValue::Bool(false),
        (ParamType::Int, _) => ParamValue::Int(def.min.unwrap_or(0.0) as i64),
        (ParamType::Float, _) => ParamValue::Float(def.min.unwrap_or(0.0)),
        (ParamType::Choice, _) => ParamValue::Int(0),
        (ParamType::Color, _) => ParamValue::Text("ffffff".to_string()),
    }
}

fn clamp_bool(def: &ParameterDefinition, raw: &ParamValue) -> ParamValue {
    match raw {
        ParamValue::Bool(b) => ParamValue::Bool(*b),
        ParamValue::Int(i) => ParamValue::Bool(*i != 0),
        ParamValue::Float(f) => ParamValue::Bool(*f != 0.0),
        ParamValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => ParamValue::Bool(true),
            "false" | "0" | "no" | "off" => ParamValue::Bool(false),
            _ => fallback(def),
        },
    }
}

fn clamp_number(def: &ParameterDefinition, raw: &ParamValue, is_float: bool) -> ParamValue {
    let parsed = match raw {
        ParamValue::Int(_) | ParamValue::Float(_) => raw.as_f64(),
        ParamValue::Text(s) => s.trim().parse::<f64>().ok(),
        ParamValue::Bool(_) => None,
    };

    let Some(v) = parsed.filter(|v| v.is_finite()) else {
        return fallback(def);
    };

    let lo = def.min.unwrap_or(f64::NEG_INFINITY);
    let hi = def.max.unwrap_or(f64::INFINITY);
    let v = if v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    };

    if is_float {
        ParamValue::Float(round_to_places(v, def.decimal_places.unwrap_or(2)))
    } else {
        ParamValue::Int(v.round() as i64)
    }
}

fn clamp_choice(def: &ParameterDefinition, raw: &ParamValue) -> ParamValue {
    if def.choices.is_empty() {
        return ParamValue::Int(0);
    }
    let last = (def.choices.len() - 1) as i64;

    let index = match raw {
        ParamValue::Int(i) => *i,
        ParamValue::Float(f) => f.round() as i64,
        ParamValue::Text(s) => match s.trim().parse::<i64>() {
            Ok(i) => i,
            // Not an index; resolve by matching choice text, else 0.
            Err(_) => def
                .choices
                .iter()
                .position(|c| c == s.trim())
                .map(|p| p as i64)
                .unwrap_or(0),
        },
        ParamValue::Bool(_) => 0,
    };

    ParamValue::Int(index.clamp(0, last))
}

fn clamp_color(def: &ParameterDefinition, raw: &ParamValue) -> ParamValue {
    match raw {
        ParamValue::Text(s) => match normalize_color(s) {
            Some(hex) => ParamValue::Text(hex),
            None => fallback(def),
        },
        _ => fallback(def),
    }
}

/// Normalize a textual color to the canonical engine form: lowercase hex
/// digits, no `#` or `0x` prefix. Accepts 3/4-digit shorthand and 6/8-digit
/// (rgba) forms.
pub(crate) fn normalize_color(input: &str) -> Option<String> {
    let s = input.trim();
    let s = s
        .strip_prefix('#')
        .or_else(|| s.strip_prefix("0x"))
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);

    if s.is_empty() || !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match s.len() {
        3 | 4 => Some(
            s.chars()
                .flat_map(|c| [c, c])
                .collect::<String>()
                .to_ascii_lowercase(),
        ),
        6 | 8 => Some(s.to_ascii_lowercase()),
        _ => None,
    }
}

fn round_to_places(v: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (v * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_def(min: f64, max: f64, current: i64) -> ParameterDefinition {
        ParameterDefinition {
            id: "p".into(),
            name: "p".into(),
            display_name: "p".into(),
            param_type: ParamType::Int,
            value: ParamValue::Int(current),
            default_value: ParamValue::Int(current),
            min: Some(min),
            max: Some(max),
            decimal_places: None,
            choices: vec![],
            group: None,
            order: 0,
            tooltip: None,
        }
    }

    fn float_def(min: f64, max: f64, places: u32) -> ParameterDefinition {
        ParameterDefinition {
            param_type: ParamType::Float,
            value: ParamValue::Float(min),
            default_value: ParamValue::Float(min),
            decimal_places: Some(places),
            ..int_def(min, max, 0)
        }
    }

    fn choice_def(choices: &[&str], current: i64) -> ParameterDefinition {
        ParameterDefinition {
            param_type: ParamType::Choice,
            value: ParamValue::Int(current),
            default_value: ParamValue::Int(current),
            min: None,
            max: None,
            choices: choices.iter().map(|s| s.to_string()).collect(),
            ..int_def(0.0, 0.0, 0)
        }
    }

    #[test]
    fn test_int_clamps_to_bounds() {
        let def = int_def(0.0, 10.0, 5);
        assert_eq!(clamp_value(&def, &ParamValue::Int(15)), ParamValue::Int(10));
        assert_eq!(clamp_value(&def, &ParamValue::Int(-5)), ParamValue::Int(0));
        assert_eq!(clamp_value(&def, &ParamValue::Int(7)), ParamValue::Int(7));
    }

    #[test]
    fn test_unparseable_falls_back_to_current() {
        let def = int_def(0.0, 10.0, 5);
        assert_eq!(
            clamp_value(&def, &ParamValue::Text("abc".into())),
            ParamValue::Int(5)
        );
    }

    #[test]
    fn test_numeric_string_input_parses() {
        let def = int_def(0.0, 10.0, 5);
        assert_eq!(
            clamp_value(&def, &ParamValue::Text(" 8 ".into())),
            ParamValue::Int(8)
        );
    }

    #[test]
    fn test_int_rounds_to_whole_step() {
        let def = int_def(0.0, 10.0, 5);
        assert_eq!(clamp_value(&def, &ParamValue::Float(6.7)), ParamValue::Int(7));
    }

    #[test]
    fn test_float_rounds_to_decimal_places() {
        let def = float_def(0.0, 100.0, 2);
        assert_eq!(
            clamp_value(&def, &ParamValue::Float(33.333_33)),
            ParamValue::Float(33.33)
        );
        assert_eq!(
            clamp_value(&def, &ParamValue::Float(150.0)),
            ParamValue::Float(100.0)
        );
    }

    #[test]
    fn test_non_finite_floats_fall_back() {
        let def = float_def(0.0, 100.0, 2);
        let current = def.value.clone();
        assert_eq!(clamp_value(&def, &ParamValue::Float(f64::NAN)), current);
        assert_eq!(clamp_value(&def, &ParamValue::Float(f64::INFINITY)), current);
    }

    #[test]
    fn test_bool_coercion() {
        let def = ParameterDefinition {
            param_type: ParamType::Bool,
            value: ParamValue::Bool(true),
            default_value: ParamValue::Bool(true),
            ..int_def(0.0, 0.0, 0)
        };
        assert_eq!(
            clamp_value(&def, &ParamValue::Text("TRUE".into())),
            ParamValue::Bool(true)
        );
        assert_eq!(
            clamp_value(&def, &ParamValue::Text("false".into())),
            ParamValue::Bool(false)
        );
        assert_eq!(clamp_value(&def, &ParamValue::Int(0)), ParamValue::Bool(false));
        // Garbage keeps the current value
        assert_eq!(
            clamp_value(&def, &ParamValue::Text("maybe".into())),
            ParamValue::Bool(true)
        );
    }

    #[test]
    fn test_choice_index_clamps() {
        let def = choice_def(&["small", "medium", "large"], 1);
        assert_eq!(clamp_value(&def, &ParamValue::Int(5)), ParamValue::Int(2));
        assert_eq!(clamp_value(&def, &ParamValue::Int(-1)), ParamValue::Int(0));
        assert_eq!(clamp_value(&def, &ParamValue::Int(2)), ParamValue::Int(2));
    }

    #[test]
    fn test_choice_resolves_by_text() {
        let def = choice_def(&["small", "medium", "large"], 0);
        assert_eq!(
            clamp_value(&def, &ParamValue::Text("medium".into())),
            ParamValue::Int(1)
        );
        assert_eq!(
            clamp_value(&def, &ParamValue::Text("2".into())),
            ParamValue::Int(2)
        );
        // No match falls back to index 0
        assert_eq!(
            clamp_value(&def, &ParamValue::Text("gigantic".into())),
            ParamValue::Int(0)
        );
    }

    #[test]
    fn test_color_normalization() {
        assert_eq!(normalize_color("#FF8800"), Some("ff8800".to_string()));
        assert_eq!(normalize_color("0xFF8800"), Some("ff8800".to_string()));
        assert_eq!(normalize_color("ff8800"), Some("ff8800".to_string()));
        assert_eq!(normalize_color("#abc"), Some("aabbcc".to_string()));
        assert_eq!(normalize_color("ff8800ff"), Some("ff8800ff".to_string()));
        assert_eq!(normalize_color("#gg0000"), None);
        assert_eq!(normalize_color(""), None);
        assert_eq!(normalize_color("ff88"), Some("ffff8888".to_string()));
        assert_eq!(normalize_color("ff880"), None);
    }

    #[test]
    fn test_color_invalid_keeps_current() {
        let def = ParameterDefinition {
            param_type: ParamType::Color,
            value: ParamValue::Text("ffffff".into()),
            default_value: ParamValue::Text("ffffff".into()),
            ..int_def(0.0, 0.0, 0)
        };
        assert_eq!(
            clamp_value(&def, &ParamValue::Text("not-a-color".into())),
            ParamValue::Text("ffffff".into())
        );
        assert_eq!(
            clamp_value(&def, &ParamValue::Text("#012ABC".into())),
            ParamValue::Text("012abc".into())
        );
    }

    #[test]
    fn test_text_passes_through() {
        let def = ParameterDefinition {
            param_type: ParamType::Text,
            value: ParamValue::Text("old".into()),
            default_value: ParamValue::Text("old".into()),
            ..int_def(0.0, 0.0, 0)
        };
        assert_eq!(
            clamp_value(&def, &ParamValue::Text("anything at all".into())),
            ParamValue::Text("anything at all".into())
        );
        assert_eq!(
            clamp_value(&def, &ParamValue::Int(42)),
            ParamValue::Text("42".into())
        );
    }
}

//! Caller parameter validation against a flow's declarations

use crate::errors::FlowError;
use botflow_core_types::{Flow, FlowParam, ParamType};
use serde_json::{Map, Value};

/// Check `supplied` against the flow's parameter declarations and merge in
/// declared defaults.
///
/// Parameters the flow does not declare pass through untouched.
pub fn resolve_params(flow: &Flow, supplied: Map<String, Value>) -> Result<Map<String, Value>, FlowError> {
    let mut params = supplied;
    for (name, decl) in &flow.params {
        let provided = params.get(name).filter(|v| !v.is_null()).cloned();
        let value = match provided.or_else(|| decl.default_value().cloned()) {
            Some(value) => value,
            None if decl.required => {
                return Err(FlowError::validation(
                    &flow.flow_id,
                    format!("Missing required parameter: {name}"),
                ))
            }
            None => continue,
        };
        check_value(name, decl, &value)
            .map_err(|detail| FlowError::validation(&flow.flow_id, detail))?;
        params.insert(name.clone(), value);
    }
    Ok(params)
}

fn check_value(name: &str, decl: &FlowParam, value: &Value) -> Result<(), String> {
    match decl.param_type {
        ParamType::String => Ok(()),
        ParamType::Boolean => match value {
            Value::Bool(_) => Ok(()),
            Value::String(s) if matches!(s.as_str(), "true" | "false") => Ok(()),
            other => Err(format!("Parameter '{name}' must be a boolean, got {other}")),
        },
        ParamType::Enum => {
            let Some(allowed) = &decl.values else {
                return Ok(());
            };
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if allowed.iter().any(|v| *v == text) {
                Ok(())
            } else {
                Err(format!(
                    "Parameter '{name}' must be one of [{}], got '{text}'",
                    allowed.join(", ")
                ))
            }
        }
        ParamType::Number => {
            let number = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
            .ok_or_else(|| format!("Parameter '{name}' must be a number, got {value}"))?;
            if let Some(min) = decl.min {
                if number < min {
                    return Err(format!("Parameter '{name}' must be >= {min}, got {number}"));
                }
            }
            if let Some(max) = decl.max {
                if number > max {
                    return Err(format!("Parameter '{name}' must be <= {max}, got {number}"));
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flow() -> Flow {
        serde_json::from_value(json!({
            "flow_id": "bet",
            "site": "example.com",
            "params": {
                "username": {"type": "string"},
                "stake": {"type": "number", "min": 1, "max": 100},
                "market": {"type": "enum", "values": ["win", "place"], "default": "win"},
                "note": {"type": "string", "required": false},
                "legacy": {"type": "string", "default": null}
            },
            "steps": [{"id": "s1", "action": "navigate", "url": "https://example.com"}]
        }))
        .unwrap()
    }

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_defaults_are_merged() {
        let params = resolve_params(
            &flow(),
            map(json!({"username": "ada", "stake": 5, "legacy": "x"})),
        )
        .unwrap();
        assert_eq!(params["market"], json!("win"));
        assert!(!params.contains_key("note"));
    }

    #[test]
    fn test_missing_required_fails() {
        let err = resolve_params(&flow(), map(json!({"stake": 5, "legacy": "x"}))).unwrap_err();
        assert!(err.to_string().contains("Missing required parameter: username"));

        // a null default does not satisfy a required parameter
        let err = resolve_params(&flow(), map(json!({"username": "ada", "stake": 5}))).unwrap_err();
        assert!(err.to_string().contains("legacy"));
    }

    #[test]
    fn test_enum_and_range_checks() {
        let base = json!({"username": "ada", "legacy": "x"});
        let mut bad_enum = map(base.clone());
        bad_enum.insert("stake".into(), json!(5));
        bad_enum.insert("market".into(), json!("show"));
        assert!(resolve_params(&flow(), bad_enum).is_err());

        let mut too_big = map(base.clone());
        too_big.insert("stake".into(), json!(500));
        let err = resolve_params(&flow(), too_big).unwrap_err();
        assert!(err.to_string().contains("<= 100"));

        let mut textual = map(base);
        textual.insert("stake".into(), json!("12.5"));
        assert!(resolve_params(&flow(), textual).is_ok());
    }
}

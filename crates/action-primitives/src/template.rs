//! `{{params.x}}` / `{{extracted.x}}` substitution.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::errors::ActionError;
use crate::types::ExecutionContext;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("placeholder regex"));

/// Variables visible to templates.
pub struct TemplateScope<'a> {
    pub params: &'a Map<String, Value>,
    pub extracted: &'a BTreeMap<String, Value>,
}

impl<'a> TemplateScope<'a> {
    pub fn new(params: &'a Map<String, Value>, extracted: &'a BTreeMap<String, Value>) -> Self {
        Self { params, extracted }
    }

    pub fn of(ctx: &'a ExecutionContext) -> Self {
        Self::new(&ctx.params, &ctx.extracted)
    }

    /// Look up a dotted path such as `params.user` or `extracted.order.id`.
    pub fn lookup(&self, path: &str) -> Result<&'a Value, ActionError> {
        let mut parts = path.split('.');
        let root = parts.next().unwrap_or_default();
        let key = parts
            .next()
            .ok_or_else(|| ActionError::template(format!("incomplete variable '{path}'")))?;
        let mut value = match root {
            "params" => self.params.get(key),
            "extracted" => self.extracted.get(key),
            other => {
                return Err(ActionError::template(format!(
                    "unknown namespace '{other}' in '{path}'"
                )))
            }
        }
        .ok_or_else(|| ActionError::template(format!("unknown variable '{path}'")))?;

        for part in parts {
            value = value
                .get(part)
                .ok_or_else(|| ActionError::template(format!("unknown variable '{path}'")))?;
        }
        Ok(value)
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Replace every placeholder in `template` with its value rendered as text.
pub fn render_template(template: &str, scope: &TemplateScope<'_>) -> Result<String, ActionError> {
    let mut failure = None;
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        match scope.lookup(&caps[1]) {
            Ok(value) => display(value),
            Err(err) => {
                failure.get_or_insert(err);
                String::new()
            }
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(rendered.into_owned()),
    }
}

/// Evaluate a `returns_mapping` entry.
///
/// Strings holding placeholders are rendered; a string that is exactly one
/// placeholder yields the referenced value unchanged. Anything else is a
/// literal.
pub fn render_value(template: &Value, scope: &TemplateScope<'_>) -> Result<Value, ActionError> {
    let Value::String(text) = template else {
        return Ok(template.clone());
    };
    if !text.contains("{{") {
        return Ok(template.clone());
    }
    if let Some(caps) = PLACEHOLDER.captures(text.trim()) {
        if caps.get(0).map(|m| m.as_str().len()) == Some(text.trim().len()) {
            return scope.lookup(&caps[1]).cloned();
        }
    }
    render_template(text, scope).map(Value::String)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixtures() -> (Map<String, Value>, BTreeMap<String, Value>) {
        let params = json!({"user": "ada", "amount": 12.5, "account": {"id": "A-1"}})
            .as_object()
            .cloned()
            .unwrap();
        let mut extracted = BTreeMap::new();
        extracted.insert("balance".to_string(), json!("1,024.00"));
        (params, extracted)
    }

    #[test]
    fn test_render_template_substitutes() {
        let (params, extracted) = fixtures();
        let scope = TemplateScope::new(&params, &extracted);
        let out = render_template(
            "Hi {{params.user}}, bet {{ params.amount }} on {{params.account.id}}; had {{extracted.balance}}",
            &scope,
        )
        .unwrap();
        assert_eq!(out, "Hi ada, bet 12.5 on A-1; had 1,024.00");
        assert_eq!(render_template("no placeholders", &scope).unwrap(), "no placeholders");
    }

    #[test]
    fn test_render_template_unknown_variable() {
        let (params, extracted) = fixtures();
        let scope = TemplateScope::new(&params, &extracted);
        let err = render_template("{{params.missing}}", &scope).unwrap_err();
        assert!(err.to_string().contains("params.missing"));
        assert!(render_template("{{env.HOME}}", &scope).is_err());
    }

    #[test]
    fn test_render_value_keeps_types() {
        let (params, extracted) = fixtures();
        let scope = TemplateScope::new(&params, &extracted);
        assert_eq!(render_value(&json!("{{params.amount}}"), &scope).unwrap(), json!(12.5));
        assert_eq!(
            render_value(&json!("total: {{params.amount}}"), &scope).unwrap(),
            json!("total: 12.5")
        );
        assert_eq!(render_value(&json!(42), &scope).unwrap(), json!(42));
        assert_eq!(render_value(&json!("plain"), &scope).unwrap(), json!("plain"));
    }
}

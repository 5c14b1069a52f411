//! Lenient recovery of a JSON object from free-form model output.
//!
//! Models wrap answers in code fences or surround them with prose. Recovery
//! runs in order: strip fences, parse directly, then scan for the first
//! balanced `{...}` block. Anything else is an error carrying a short excerpt.

use serde_json::{Map, Value};

use crate::errors::JsonRecoveryError;

const EXCERPT_CHARS: usize = 200;

/// Parse the first JSON object found in `raw`.
pub fn parse_json_object(raw: &str) -> Result<Map<String, Value>, JsonRecoveryError> {
    let stripped = strip_code_fences(raw);

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(stripped) {
        return Ok(map);
    }

    if let Some(candidate) = extract_json_object(stripped) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) {
            return Ok(map);
        }
    }

    Err(JsonRecoveryError {
        excerpt: raw.chars().take(EXCERPT_CHARS).collect(),
    })
}

/// Remove a surrounding Markdown code fence (with optional language tag).
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// First balanced `{...}` block in `raw`, ignoring braces inside strings.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_block() {
        let input = "```json\n{\"css\": \"#submit\", \"confidence\": 90}\n```";
        let map = parse_json_object(input).unwrap();
        assert_eq!(map["css"], "#submit");
    }

    #[test]
    fn parses_object_inside_prose() {
        let input = "Sure! Here is the selector: {\"css\": \"a[href='{x}']\", \"reasoning\": \"brace } in text\"} hope it helps";
        let map = parse_json_object(input).unwrap();
        assert_eq!(map["css"], "a[href='{x}']");
        assert_eq!(map["reasoning"], "brace } in text");
    }

    #[test]
    fn rejects_non_object_and_truncates_excerpt() {
        let input = "x".repeat(500);
        let err = parse_json_object(&input).unwrap_err();
        assert_eq!(err.excerpt.len(), 200);

        assert!(parse_json_object("[1, 2, 3]").is_err());
    }

    #[test]
    fn strips_plain_fence() {
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {} "), "{}");
    }
}

//! HTML reduction for LLM consumption.

use once_cell::sync::Lazy;
use regex::Regex;

/// Upper bound on the simplified DOM, in characters.
pub const MAX_DOM_CHARS: usize = 50_000;

const TRUNCATION_MARKER: &str = "\n... [truncated] ...\n";

static NOISE_BLOCKS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["script", "style", "svg", "noscript"]
        .iter()
        .filter_map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).ok())
        .collect()
});

static COMMENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!--[\s\S]*?-->").expect("static comment regex"));

static INLINE_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\s+style="[^"]*""#).expect("static style regex"));

static BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n+").expect("static blank-line regex"));

/// Strip scripts, styles, SVGs, comments and inline styles, collapse blank
/// lines and cap the result at [`MAX_DOM_CHARS`] keeping head and tail.
pub fn simplify_dom(html: &str) -> String {
    let mut result = html.to_string();
    for block in NOISE_BLOCKS.iter() {
        result = block.replace_all(&result, "").into_owned();
    }
    result = COMMENTS.replace_all(&result, "").into_owned();
    result = INLINE_STYLE.replace_all(&result, "").into_owned();
    result = BLANK_LINES.replace_all(&result, "\n").trim().to_string();
    truncate_middle(&result, MAX_DOM_CHARS)
}

/// Keep the first and last `max / 2` characters around a marker.
pub fn truncate_middle(text: &str, max: usize) -> String {
    let total = text.chars().count();
    if total <= max {
        return text.to_string();
    }
    let half = max / 2;
    let head: String = text.chars().take(half).collect();
    let tail: String = text.chars().skip(total - half).collect();
    format!("{head}{TRUNCATION_MARKER}{tail}")
}

/// Keep at most `max` characters from the front.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_noise() {
        let html = r#"<html><head><script type="x">var a = "<b>";</script>
<STYLE>.a{}</STYLE></head>
<!-- tracking -->


<body><div style="color:red" id="main">Hi<svg><path/></svg></div><noscript>no</noscript></body></html>"#;
        let out = simplify_dom(html);
        assert!(!out.contains("script"));
        assert!(!out.to_lowercase().contains("style"));
        assert!(!out.contains("tracking"));
        assert!(!out.contains("<svg"));
        assert!(!out.contains("noscript"));
        assert!(out.contains(r#"<div id="main">Hi</div>"#));
        assert!(!out.contains("\n\n"));
    }

    #[test]
    fn test_truncates_keeping_head_and_tail() {
        let body = format!("{}{}", "a".repeat(40_000), "z".repeat(40_000));
        let out = simplify_dom(&body);
        assert!(out.starts_with(&"a".repeat(25_000)));
        assert!(out.ends_with(&"z".repeat(25_000)));
        assert!(out.contains("[truncated]"));
        assert_eq!(out.chars().count(), MAX_DOM_CHARS + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```[A-Za-z0-9_+-]*").expect("valid regex"))
}

fn marker_pattern() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"(?i)^\s*JSON:\s*").expect("valid regex"))
}

/// Remove code fences (with or without a language tag) and a leading `JSON:` marker.
pub fn clean_model_text(raw: &str) -> String {
    let unfenced = fence_pattern().replace_all(raw, "");
    marker_pattern().replace(unfenced.trim(), "").trim().to_string()
}

/// First `open` to last `close`, no balance check.
fn outer_span(text: &str, open: char, close: char) -> Option<&str> {
    match (text.find(open), text.rfind(close)) {
        (Some(start), Some(end)) if end > start => Some(&text[start..=end]),
        _ => None,
    }
}

/// Pull one JSON object out of free-form model output.
///
/// The span from the first `{` to the last `}` is parsed as is; prose with
/// stray braces around the object therefore fails to parse. Without any brace
/// span the whole cleaned text is tried. Anything that is not an object is `None`.
pub fn extract_json(raw: &str) -> Option<Value> {
    extract_json_span(raw).map(|(value, _)| value)
}

/// Like [`extract_json`], also returning the exact text that was parsed.
pub fn extract_json_span(raw: &str) -> Option<(Value, String)> {
    let text = clean_model_text(raw);
    let candidate = outer_span(&text, '{', '}').unwrap_or(&text);
    let value = serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(Value::is_object)?;
    Some((value, candidate.to_string()))
}

/// Items of the first `[` .. last `]` span of cleaned model output.
pub fn extract_json_array(raw: &str) -> Option<Vec<Value>> {
    let text = clean_model_text(raw);
    serde_json::from_str(outer_span(&text, '[', ']')?).ok()
}

/// Suggestions come back as a JSON array of strings. Non-string entries are
/// dropped; output that is not an array is returned whole as one suggestion.
pub fn parse_suggestions(raw: &str) -> Vec<String> {
    let text = clean_model_text(raw);
    let parsed = extract_json_array(&text);

    match parsed {
        Some(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            })
            .collect(),
        None if text.is_empty() => Vec::new(),
        None => vec![text],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_fenced_json() {
        let raw = "```json\n{\"entities\": []}\n```";
        assert_eq!(extract_json(raw), Some(json!({"entities": []})));

        let bare_fence = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json(bare_fence), Some(json!({"a": 1})));
    }

    #[test]
    fn strips_json_marker_and_prose() {
        assert_eq!(extract_json("json: {\"a\": 1}"), Some(json!({"a": 1})));
        assert_eq!(
            extract_json("Aquí está el diagrama:\n{\"name\": \"Ventas\"}\nEspero que sirva."),
            Some(json!({"name": "Ventas"}))
        );
    }

    #[test]
    fn nested_braces_survive() {
        let raw = r#"{"entities": [{"name": "A", "position": {"x": 1}}]}"#;
        assert_eq!(extract_json(raw).unwrap()["entities"][0]["position"]["x"], json!(1));
    }

    #[test]
    fn stray_braces_in_prose_fail() {
        assert_eq!(extract_json("use {braces} then {\"a\": 1}"), None);
    }

    #[test]
    fn rejects_non_objects_and_garbage() {
        assert_eq!(extract_json("[1, 2]"), None);
        assert_eq!(extract_json("42"), None);
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json(""), None);
        assert_eq!(extract_json("{\"a\": "), None);
    }

    #[test]
    fn span_is_the_parsed_object_only() {
        let (value, span) =
            extract_json_span("```json\nHere you go: {\"name\": \"Ventas\"} hope it helps\n```").unwrap();
        assert_eq!(value, json!({"name": "Ventas"}));
        assert_eq!(span, r#"{"name": "Ventas"}"#);
    }

    #[test]
    fn array_items_ignore_surrounding_prose() {
        assert_eq!(
            extract_json_array("Ideas: [\"a\", 2] fin"),
            Some(vec![json!("a"), json!(2)])
        );
        assert_eq!(extract_json_array("] nothing ["), None);
        assert_eq!(extract_json_array("[1, 2"), None);
    }

    #[test]
    fn suggestions_from_array_or_text() {
        assert_eq!(
            parse_suggestions("```json\n[\"Agrega BaseEntity\", 3, \"Usa enums\"]\n```"),
            vec!["Agrega BaseEntity", "Usa enums"]
        );
        assert_eq!(parse_suggestions("Todo bien."), vec!["Todo bien."]);
        assert!(parse_suggestions("  ").is_empty());
    }
}

use std::fmt;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};

const FENCE: &str = "```";

/// Top-level JSON value the caller expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Array,
    Object,
}

impl JsonShape {
    fn delimiters(self) -> (char, char) {
        match self {
            Self::Array => ('[', ']'),
            Self::Object => ('{', '}'),
        }
    }
}

impl fmt::Display for JsonShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array => f.write_str("array"),
            Self::Object => f.write_str("object"),
        }
    }
}

/// Parse `text` as `T`, tolerating code fences and surrounding prose.
///
/// Tries a strict parse, then the first fenced code block, then the
/// outermost bracket-delimited substring.
/// `what` names the payload in the resulting [`Error::Parse`].
pub fn parse_lenient<T: DeserializeOwned>(text: &str, shape: JsonShape, what: &str) -> Result<T> {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let unfenced = strip_code_fences(trimmed);
    if let Some(inner) = unfenced {
        if let Ok(value) = serde_json::from_str(inner) {
            debug!(what, "parsed JSON from fenced block");
            return Ok(value);
        }
    }

    let candidate = unfenced.unwrap_or(trimmed);
    let Some(slice) = bracketed(candidate, shape) else {
        return Err(Error::parse(what, format!("no JSON {shape} found")));
    };

    serde_json::from_str(slice).map_err(|e| Error::parse(what, e))
}

/// Contents of the first fenced code block, language tag removed.
///
/// An unterminated fence yields everything after the opening line.
pub fn strip_code_fences(text: &str) -> Option<&str> {
    let start = text.find(FENCE)? + FENCE.len();
    let rest = &text[start..];

    // language tag runs to the end of the opening line
    let body = match rest.find('\n') {
        Some(nl) if !rest[..nl].contains(FENCE) => &rest[nl + 1..],
        _ => rest,
    };

    let inner = match body.find(FENCE) {
        Some(end) => &body[..end],
        None => body,
    };
    Some(inner.trim())
}

/// Outermost substring starting at the first opening delimiter and ending
/// at the last closing one.
fn bracketed(text: &str, shape: JsonShape) -> Option<&str> {
    let (open, close) = shape.delimiters();
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn parses_strict_json() {
        let parsed: Vec<String> = parse_lenient(r#"["a", "b"]"#, JsonShape::Array, "queries").unwrap();
        assert_eq!(parsed, vec!["a", "b"]);
    }

    #[test]
    fn parses_fenced_block_with_language_tag() {
        let text = "```json\n[\"a\", \"b\"]\n```";
        let parsed: Vec<String> = parse_lenient(text, JsonShape::Array, "queries").unwrap();
        assert_eq!(parsed, vec!["a", "b"]);
    }

    #[test]
    fn parses_fenced_block_inside_prose() {
        let text = "Here are the results:\n```\n{\"exa\": 1}\n```\nLet me know!";
        let parsed: HashMap<String, u8> = parse_lenient(text, JsonShape::Object, "judgment").unwrap();
        assert_eq!(parsed["exa"], 1);
    }

    #[test]
    fn extracts_bracketed_substring_from_prose() {
        let text = r#"Sure! [{"url": "https://a.com"}] Hope that helps."#;
        let parsed: Vec<serde_json::Value> = parse_lenient(text, JsonShape::Array, "hits").unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["url"], "https://a.com");
    }

    #[test]
    fn extracts_bracketed_substring_after_fence_strip() {
        let text = "```json\nResults: [\"x\"] (end)\n```";
        let parsed: Vec<String> = parse_lenient(text, JsonShape::Array, "queries").unwrap();
        assert_eq!(parsed, vec!["x"]);
    }

    #[test]
    fn fails_without_json() {
        let err = parse_lenient::<Vec<String>>("I could not search the web.", JsonShape::Array, "hits")
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("no JSON array found"));
    }

    #[test]
    fn fails_on_malformed_json() {
        let err = parse_lenient::<HashMap<String, u8>>("{\"exa\": }", JsonShape::Object, "judgment")
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse judgment"));
    }

    #[test]
    fn strips_unterminated_fence() {
        assert_eq!(strip_code_fences("```json\n[1, 2]"), Some("[1, 2]"));
        assert_eq!(strip_code_fences("[1, 2]"), None);
    }
}

//! Strict JSON extraction from oracle output
//!
//! Generators often wrap their answer in prose or code fences. We take the
//! first balanced object or array and deserialize it strictly.

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Locate the first balanced `{...}` or `[...]` in `text`.
///
/// Brackets inside string literals (including escaped quotes) are ignored.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
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
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Deserialize the first JSON structure in `text` into `T`.
pub fn parse_strict<T: DeserializeOwned>(text: &str) -> Result<T> {
    let json = extract_json(text)
        .ok_or_else(|| Error::MalformedResponse("no JSON structure found".to_string()))?;
    serde_json::from_str(json).map_err(|e| Error::MalformedResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Answer {
        value: u32,
    }

    #[test]
    fn test_extracts_fenced_array() {
        let text = "Here you go:\n```json\n[{\"a\": 1}, {\"b\": [2, 3]}]\n```\nDone.";
        assert_eq!(extract_json(text), Some("[{\"a\": 1}, {\"b\": [2, 3]}]"));
    }

    #[test]
    fn test_ignores_brackets_in_strings() {
        let text = r#"{"title": "use } and ] freely \" still in"} trailing"#;
        assert_eq!(
            extract_json(text),
            Some(r#"{"title": "use } and ] freely \" still in"}"#)
        );
    }

    #[test]
    fn test_unbalanced_returns_none() {
        assert_eq!(extract_json("[1, 2"), None);
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn test_parse_strict() {
        let answer: Answer = parse_strict("sure! {\"value\": 4}").unwrap();
        assert_eq!(answer, Answer { value: 4 });

        let err = parse_strict::<Answer>("{\"value\": \"four\"}").unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));

        let err = parse_strict::<Answer>("nothing").unwrap_err();
        assert!(err.is_oracle_error());
    }
}

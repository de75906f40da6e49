//! Extracts the first balanced `{...}` object from free-form LLM text.
//!
//! Uses a recursive-descent brace scan rather than a regex, so nested objects and braces
//! inside string literals are handled correctly.

/// Strips a leading ```json or ``` code fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else {
        trimmed
    }
}

/// Finds the first balanced `{...}` substring, honoring string literals (so a `{` or `}`
/// inside a quoted string doesn't affect brace counting) and escape sequences.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let text = strip_code_fence(text);
    let bytes = text.as_bytes();
    let start = text.find('{')?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Convenience wrapper: extracts and parses as [`serde_json::Value`].
pub fn extract_and_parse(text: &str) -> Option<serde_json::Value> {
    extract_json_object(text).and_then(|s| serde_json::from_str(s).ok())
}

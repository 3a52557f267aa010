//! Strict parsing of model output into typed responses.

use serde::de::DeserializeOwned;

use super::InferenceError;

/// Extracts JSON from a response that might be wrapped in markdown code
/// blocks or surrounded by prose.
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    // ```json ... ``` or ``` ... ```
    if trimmed.starts_with("```") {
        if let Some(start) = trimmed.find('\n') {
            let rest = &trimmed[start + 1..];
            if let Some(end) = rest.rfind("```") {
                return rest[..end].trim();
            }
        }
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }

    // Prose around a single object or array, whichever opens first
    let (open, close) = match (trimmed.find('{'), trimmed.find('[')) {
        (Some(brace), Some(bracket)) if bracket < brace => ('[', ']'),
        (None, Some(_)) => ('[', ']'),
        _ => ('{', '}'),
    };
    match (trimmed.find(open), trimmed.rfind(close)) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Parses a model response into `T`, quoting at most `context_len`
/// characters of the response in the error.
pub fn parse_json<T: DeserializeOwned>(
    response: &str,
    context_len: usize,
) -> Result<T, InferenceError> {
    let json_str = extract_json(response);
    serde_json::from_str(json_str).map_err(|e| InferenceError::Unparseable {
        reason: e.to_string(),
        excerpt: excerpt(json_str, context_len),
    })
}

/// First `max_chars` characters of `text`, marked when truncated.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

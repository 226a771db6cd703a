use crate::domain::recommendation::RecommendationRecord;
use anyhow::Context;
use serde_json::Value;

/// Removes a Markdown fence wrapper (```` ```json ... ``` ```` or ```` ``` ... ``` ````) if present.
/// Either delimiter may be missing; unfenced text is only trimmed.
pub fn strip_fences(text: &str) -> &str {
    let mut inner = text.trim();
    if let Some(rest) = inner.strip_prefix("```") {
        // Drop the optional language tag on the opening fence.
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        inner = &rest[tag_len..];
    }
    if let Some(rest) = inner.trim_end().strip_suffix("```") {
        inner = rest;
    }
    inner.trim()
}

/// Parses a model answer as a JSON list of objects. Entries are not checked for required keys.
pub fn parse_records(text: &str) -> anyhow::Result<Vec<RecommendationRecord>> {
    let json_str = strip_fences(text);
    let parsed = serde_json::from_str::<Value>(json_str)
        .with_context(|| format!("model output is not valid JSON: {json_str}"))?;

    let Value::Array(items) = parsed else {
        anyhow::bail!("model output is not a JSON list: {json_str}");
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(fields) => Ok(RecommendationRecord::from_fields(fields)),
            other => anyhow::bail!("list entry {i} is not an object: {other}"),
        })
        .collect()
}

//! Request envelope types shared by the API client and its callers.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Per-call overrides layered on top of the client defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Extra headers applied after `Content-Type` (and so able to replace it).
    /// `Authorization` is always set last from the stored token when present.
    pub headers: Vec<(String, String)>,
    /// Body sent verbatim when the verb is called without a JSON body.
    pub raw_body: Option<String>,
}

impl RequestOptions {
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn raw_body(mut self, body: impl Into<String>) -> Self {
        self.raw_body = Some(body.into());
        self
    }
}

/// Render a JSON scalar id (`7` or `"NV07"`) as text.
///
/// The backend is inconsistent about numeric vs string identifiers, so
/// anything that is not a string or number reads as absent.
#[must_use]
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Deserialize an optional id field that may arrive as a number or a string.
pub fn deserialize_scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_text))
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

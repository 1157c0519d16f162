pub mod ai_response;
pub mod json_ld;

pub use ai_response::{from_ai_response, validate_recipe};
pub use json_ld::{extract_json_ld_from_html, find_recipe_in_json_ld, from_json_ld};

use serde_json::Value;

/// Loose string view of a JSON scalar: strings are trimmed, numbers and
/// booleans are rendered, everything else is empty.
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Integer prefix of a JSON string or number ("6 servings" -> 6, 4.5 -> 4).
pub(crate) fn value_to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => crate::lexicon::leading_int(s),
        _ => None,
    }
}

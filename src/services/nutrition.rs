use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::models::NUTRIENT_FIELDS;

pub const NOT_AVAILABLE: &str = "N/A";

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?i)```(?:json)?\s*").expect("valid fence regex"))
}

fn number_regex() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(r"\d+\.?\d*").expect("valid number regex"))
}

/// Removes Markdown code fences the model sometimes wraps around its JSON.
pub fn strip_code_fences(raw: &str) -> String {
    fence_regex().replace_all(raw.trim(), "").trim().to_string()
}

/// Converts one per-100g nutrient string ("31g") into a per-gram one ("0.31g").
pub fn rescale_nutrient(value: &str) -> String {
    number_regex()
        .find(value)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|per_100g| format!("{:.2}g", per_100g / 100.0))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Rescales every string nutrient of every item under `foods`.
///
/// Must run exactly once on the raw model output; running it again divides
/// by 100 a second time. Returns the number of fields rewritten.
pub fn rescale_foods(data: &mut Value) -> usize {
    let Some(foods) = data.get_mut("foods").and_then(Value::as_array_mut) else {
        return 0;
    };

    let mut rewritten = 0;
    for food in foods.iter_mut().filter_map(Value::as_object_mut) {
        for field in NUTRIENT_FIELDS {
            if let Some(Value::String(value)) = food.get_mut(field) {
                *value = rescale_nutrient(value);
                rewritten += 1;
            }
        }
    }
    rewritten
}

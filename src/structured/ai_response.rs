use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use super::{value_to_int, value_to_text};
use crate::models::{
    Ingredient, IngredientCategory, ParsedRecipe, RecipeCategory, DEFAULT_SERVINGS,
    UNTITLED_RECIPE,
};

pub const EXTRACTION_PROMPT: &str = r#"You are a recipe extraction assistant. Extract a structured recipe from the provided input.
The input may be messy text, OCR output, a blog post, or an image of a recipe card.
If multiple recipes are present, extract the first/main one.

Return ONLY valid JSON in this exact format (no markdown, no explanation, no code fences):
{
  "name": "Recipe Name",
  "category": "dinner",
  "servings": 4,
  "ingredients": [
    { "qty": "2", "unit": "cups", "item": "flour", "category": "pantry" }
  ],
  "steps": ["Step 1", "Step 2"]
}

Rules:
- category must be one of: breakfast, lunch, dinner, snack, dessert. Infer from context if not stated.
- servings must be an integer. Default to 4 if not stated.
- qty is a STRING (supports fractions like "1/2", ranges like "2-3").
- unit is a STRING (cups, tbsp, tsp, lb, oz, g, kg, ml, L, cloves, sprigs, etc.). Use empty string if no unit.
- ingredient category must be one of: produce, dairy, meat, pantry, frozen, other.
  Categorize intelligently: fruits/vegetables/herbs = produce, cheese/milk/butter/cream/yogurt = dairy,
  chicken/beef/pork/fish/seafood/bacon = meat, flour/sugar/oil/spices/canned/rice/pasta/soy sauce = pantry,
  frozen items = frozen, everything else = other.
- Clean up OCR artifacts (misread characters, broken words).
- steps should be clear, concise instructions as an array of strings.
- If the input is in another language, extract in that language.
- Return ONLY the JSON object. No other text."#;

const STRICT_SUFFIX: &str = "\n\nCRITICAL: Your previous response was not valid JSON. Return ONLY the raw JSON object. No markdown code fences. No backticks. No explanation. Just the JSON starting with { and ending with }.";

/// Prompt for the second and last attempt after an unusable first response.
pub fn strict_extraction_prompt() -> String {
    format!("{}{}", EXTRACTION_PROMPT, STRICT_SUFFIX)
}

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```json\s*").expect("valid fence regex"));
static BARE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```\s*").expect("valid fence regex"));

/// Outermost `{ ... }` span: first opening brace to last closing brace.
fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Recover a recipe from the raw text of an AI reply.
///
/// Tries the text as-is, then with markdown fences removed, then the
/// outermost brace span. The first candidate that parses as JSON decides the
/// outcome: a parsed object that fails validation is not retried against
/// later candidates.
pub fn from_ai_response(raw: &str) -> Option<ParsedRecipe> {
    if raw.trim().is_empty() {
        return None;
    }

    let unfenced = BARE_FENCE
        .replace_all(&JSON_FENCE.replace_all(raw, ""), "")
        .trim()
        .to_string();

    let candidates = [Some(raw), Some(unfenced.as_str()), object_span(raw)];
    for candidate in candidates.into_iter().flatten() {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            let recipe = validate_recipe(&value);
            if recipe.is_none() {
                tracing::debug!("ai response parsed but failed validation");
            }
            return recipe;
        }
    }

    tracing::debug!("no json object found in ai response");
    None
}

fn validate_ingredient(value: &Value) -> Option<Ingredient> {
    let obj = value.as_object()?;
    let field = |key: &str| obj.get(key).map(value_to_text).unwrap_or_default();

    let item = field("item");
    if item.is_empty() {
        return None;
    }
    Some(Ingredient {
        qty: field("qty"),
        unit: field("unit"),
        item,
        category: obj
            .get("category")
            .and_then(Value::as_str)
            .and_then(IngredientCategory::from_label)
            .unwrap_or_default(),
    })
}

/// Coerce a loosely shaped recipe object into a `ParsedRecipe`.
///
/// Returns `None` for non-objects and for recipes carrying no name, no
/// ingredients and no steps.
pub fn validate_recipe(value: &Value) -> Option<ParsedRecipe> {
    let obj = value.as_object()?;

    let name = obj.get("name").map(value_to_text).unwrap_or_default();
    let name = if name.is_empty() {
        UNTITLED_RECIPE.to_string()
    } else {
        name
    };

    let category = obj
        .get("category")
        .and_then(Value::as_str)
        .and_then(RecipeCategory::from_label)
        .unwrap_or_default();

    let servings = obj
        .get("servings")
        .and_then(value_to_int)
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(DEFAULT_SERVINGS);

    let ingredients: Vec<Ingredient> = obj
        .get("ingredients")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(validate_ingredient).collect())
        .unwrap_or_default();

    let steps: Vec<String> = obj
        .get("steps")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(value_to_text)
                .filter(|step| !step.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if name == UNTITLED_RECIPE && ingredients.is_empty() && steps.is_empty() {
        return None;
    }

    Some(ParsedRecipe {
        name,
        category,
        servings,
        ingredients,
        steps,
    })
}

use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;

use super::{value_to_int, value_to_text};
use crate::ingredient_parser::parse_ingredient_string;
use crate::models::{ParsedRecipe, RecipeCategory, DEFAULT_SERVINGS, UNTITLED_RECIPE};

static LD_JSON_SCRIPT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid ld+json selector")
});

fn is_recipe_node(node: &Value) -> bool {
    match node.get("@type") {
        Some(Value::String(t)) => t == "Recipe",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("Recipe")),
        _ => false,
    }
}

/// Depth-first search for the first schema.org Recipe node, looking through
/// arrays and `@graph` containers.
pub fn find_recipe_in_json_ld(data: &Value) -> Option<&Value> {
    match data {
        Value::Array(nodes) => nodes.iter().find_map(find_recipe_in_json_ld),
        Value::Object(map) => {
            if is_recipe_node(data) {
                Some(data)
            } else {
                map.get("@graph").and_then(find_recipe_in_json_ld)
            }
        }
        _ => None,
    }
}

fn category_of(node: &Value) -> RecipeCategory {
    let raw = match node.get("recipeCategory") {
        Some(Value::String(s)) => s.to_lowercase(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase(),
        _ => String::new(),
    };
    RecipeCategory::ALL
        .into_iter()
        .find(|c| raw.contains(c.as_str()))
        .unwrap_or_default()
}

fn servings_of(node: &Value) -> u32 {
    let yield_value = match node.get("recipeYield") {
        Some(Value::Array(items)) => items.first(),
        other => other,
    };
    yield_value
        .and_then(value_to_int)
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(DEFAULT_SERVINGS)
}

fn push_instruction(entry: &Value, steps: &mut Vec<String>) {
    match entry {
        Value::String(s) => steps.push(s.trim().to_string()),
        Value::Object(map) => {
            if let Some(text) = map.get("text").and_then(Value::as_str) {
                if !text.trim().is_empty() {
                    steps.push(text.trim().to_string());
                    return;
                }
            }
            let is_section = map.get("@type").and_then(Value::as_str) == Some("HowToSection");
            if let (true, Some(Value::Array(items))) = (is_section, map.get("itemListElement")) {
                for item in items {
                    match item {
                        Value::String(s) => steps.push(s.trim().to_string()),
                        Value::Object(sub) => {
                            if let Some(text) = sub.get("text").and_then(Value::as_str) {
                                steps.push(text.trim().to_string());
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        _ => {}
    }
}

fn steps_of(node: &Value) -> Vec<String> {
    let mut steps = Vec::new();
    match node.get("recipeInstructions") {
        Some(Value::Array(entries)) => {
            for entry in entries {
                push_instruction(entry, &mut steps);
            }
        }
        Some(Value::String(block)) => {
            steps.extend(block.lines().map(str::trim).map(str::to_string));
        }
        _ => {}
    }
    steps.retain(|step| !step.is_empty());
    steps
}

/// Convert the first Recipe node found in a parsed JSON-LD document.
pub fn from_json_ld(document: &Value) -> Option<ParsedRecipe> {
    let node = find_recipe_in_json_ld(document)?;

    let name = node
        .get("name")
        .map(value_to_text)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNTITLED_RECIPE.to_string());

    let ingredients = match node.get("recipeIngredient") {
        Some(Value::Array(lines)) => lines
            .iter()
            .map(value_to_text)
            .filter_map(|line| parse_ingredient_string(&line))
            .collect(),
        _ => Vec::new(),
    };

    Some(ParsedRecipe {
        name,
        category: category_of(node),
        servings: servings_of(node),
        ingredients,
        steps: steps_of(node),
    })
}

/// Scan every `application/ld+json` script block of an HTML page and return
/// the first Recipe found. Blocks that fail to parse are skipped.
pub fn extract_json_ld_from_html(html: &str) -> Option<ParsedRecipe> {
    let document = Html::parse_document(html);
    document.select(&LD_JSON_SCRIPT).find_map(|script| {
        let raw = script.text().collect::<String>();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(data) => from_json_ld(&data),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed ld+json block");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IngredientCategory;
    use serde_json::json;

    fn sample_recipe() -> Value {
        json!({
            "@context": "https://schema.org",
            "@type": "Recipe",
            "name": "Weeknight Chili",
            "recipeCategory": "Main Dish, Dinner",
            "recipeYield": ["6", "6 bowls"],
            "recipeIngredient": ["1 lb ground beef", "2 (15 oz) cans kidney beans", "Salt"],
            "recipeInstructions": [
                {"@type": "HowToStep", "text": "Brown the beef."},
                {
                    "@type": "HowToSection",
                    "name": "Simmer",
                    "itemListElement": [
                        {"@type": "HowToStep", "text": "Add the beans."},
                        "Simmer for 30 minutes."
                    ]
                },
                "  Serve hot. "
            ]
        })
    }

    #[test]
    fn test_from_json_ld_maps_fields() {
        let recipe = from_json_ld(&sample_recipe()).unwrap();
        assert_eq!(recipe.name, "Weeknight Chili");
        assert_eq!(recipe.category, RecipeCategory::Dinner);
        assert_eq!(recipe.servings, 6);
        assert_eq!(recipe.ingredients.len(), 3);
        assert_eq!(recipe.ingredients[0].unit, "lb");
        assert_eq!(recipe.ingredients[0].category, IngredientCategory::Meat);
        assert_eq!(recipe.ingredients[1].unit, "(15 oz) cans");
        assert_eq!(recipe.ingredients[2].item, "Salt");
        assert_eq!(
            recipe.steps,
            vec!["Brown the beef.", "Add the beans.", "Simmer for 30 minutes.", "Serve hot."]
        );
    }

    #[test]
    fn test_recipe_found_inside_graph() {
        let doc = json!({
            "@context": "https://schema.org",
            "@graph": [
                {"@type": "WebPage", "name": "Home"},
                {"@type": ["Recipe", "NewsArticle"], "name": "Granola", "recipeCategory": ["Breakfast"]}
            ]
        });
        let recipe = from_json_ld(&doc).unwrap();
        assert_eq!(recipe.name, "Granola");
        assert_eq!(recipe.category, RecipeCategory::Breakfast);
        assert_eq!(recipe.servings, 4);
        assert!(recipe.ingredients.is_empty());
    }

    #[test]
    fn test_non_recipe_documents() {
        assert!(from_json_ld(&json!({"@type": "Article", "name": "News"})).is_none());
        assert!(from_json_ld(&json!([1, "two", null])).is_none());
    }

    #[test]
    fn test_string_instructions_and_yield() {
        let doc = json!({
            "@type": "Recipe",
            "recipeYield": "Serves 4 people",
            "recipeInstructions": "Boil water.\n\nCook pasta.\n"
        });
        let recipe = from_json_ld(&doc).unwrap();
        assert_eq!(recipe.name, "Untitled Recipe");
        assert_eq!(recipe.servings, 4);
        assert_eq!(recipe.steps, vec!["Boil water.", "Cook pasta."]);

        let doc = json!({"@type": "Recipe", "recipeYield": 0});
        assert_eq!(from_json_ld(&doc).unwrap().servings, 4);
        let doc = json!({"@type": "Recipe", "recipeYield": 12});
        assert_eq!(from_json_ld(&doc).unwrap().servings, 12);
    }

    #[test]
    fn test_extract_from_html_skips_broken_blocks() {
        let html = format!(
            r#"<html><head>
            <script type="application/ld+json">{{ not json </script>
            <script type="application/ld+json">{{"@type":"Organization","name":"Site"}}</script>
            </head><body><p>Chili &amp; cornbread</p>
            <script id="recipe-schema" type="application/ld+json">{}</script>
            </body></html>"#,
            sample_recipe()
        );
        let recipe = extract_json_ld_from_html(&html).unwrap();
        assert_eq!(recipe.name, "Weeknight Chili");
        assert!(extract_json_ld_from_html("<p>no data</p>").is_none());
    }
}

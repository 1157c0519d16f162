use regex::Regex;
use std::sync::LazyLock;

use crate::ingredient_parser::{parse_line, strip_bullet, BULLET};
use crate::lexicon::FRACTION_CHARS;
use crate::models::{ParsedRecipe, RecipeCategory, UNTITLED_RECIPE};

const MAX_NAME_LEN: usize = 120;
const MIN_STEP_LEN: usize = 5;
const LONG_PROSE_LEN: usize = 60;
const FLAT_STEP_LEN: usize = 15;
const NAME_SCAN_LINES: usize = 5;
const SERVINGS_RANGE: std::ops::RangeInclusive<i64> = 1..=100;

static INGREDIENT_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:ingredients|what you(?:'ll| will)?\s*need|shopping list|you will need|grocery list)[:\s]*$",
    )
    .expect("valid ingredient header regex")
});

static STEP_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:instructions|directions|steps|method|preparation|how to (?:make|cook|prepare)|procedure|cooking (?:instructions|method|steps|directions))[:\s]*$",
    )
    .expect("valid step header regex")
});

static NOTES_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:notes?|tips?|variations?|nutrition|nutritional|per serving|calories)[:\s]*$")
        .expect("valid notes header regex")
});

static NAME_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:recipe(?:\s*name)?|title)[:\s]+(.+)").expect("valid name header regex")
});

static NAME_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:recipe|title)[:\s]*").expect("valid name prefix regex"));

static SERVINGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:serves?|servings?|makes?|yield|portions?)[:\s]*(\d+)")
        .expect("valid servings regex")
});

static NUMBERED_STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:step\s*)?\d+[.):\-]\s*").expect("valid numbered step regex")
});

static QTY_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^[\d{}]", FRACTION_CHARS)).expect("valid quantity start regex")
});

static NAME_MARKDOWN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#+\s*").expect("valid heading regex"));
static NAME_TRAILING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[:\-]+$").expect("valid trailing regex"));

/// Keyword groups scanned against the whole text, in priority order. Dinner
/// is the fallback.
const CATEGORY_KEYWORDS: &[(RecipeCategory, &[&str])] = &[
    (
        RecipeCategory::Breakfast,
        &[
            "breakfast", "pancake", "waffle", "omelet", "omelette", "scrambl", "french toast",
            "cereal", "oatmeal", "granola", "muffin", "bagel", "toast", "eggs benedict",
            "frittata", "crepe", "brunch", "hashbrown", "hash brown", "smoothie bowl",
            "breakfast burrito", "bacon and eggs", "morning",
        ],
    ),
    (
        RecipeCategory::Lunch,
        &[
            "sandwich", "wrap", "salad", "soup", "lunch", "panini", "sub", "quesadilla",
            "burger", "hot dog", "pita", "club",
        ],
    ),
    (
        RecipeCategory::Dessert,
        &[
            "dessert", "cake", "cookie", "brownie", "pie", "tart", "pastry", "pudding",
            "ice cream", "custard", "fudge", "truffle", "mousse", "cheesecake", "cupcake",
            "macaron", "cobbler", "crisp", "crumble", "sorbet", "gelato", "donut", "doughnut",
            "sweet", "frosting", "icing", "chocolate", "candy", "confection", "meringue",
            "souffl",
        ],
    ),
    (
        RecipeCategory::Snack,
        &[
            "snack", "dip", "appetizer", "finger food", "popcorn", "nachos", "guacamole",
            "hummus", "bruschetta", "trail mix", "energy bar", "energy ball", "chips",
            "crackers", "bites",
        ],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Unknown,
    Ingredients,
    Steps,
    Notes,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn is_section_header(line: &str) -> bool {
    INGREDIENT_HEADER.is_match(line) || STEP_HEADER.is_match(line) || NOTES_HEADER.is_match(line)
}

/// Servings stated in `text`, if any and within range.
fn servings_in(text: &str) -> Option<u32> {
    let caps = SERVINGS.captures(text)?;
    let value = caps[1].parse::<i64>().ok()?;
    if SERVINGS_RANGE.contains(&value) {
        u32::try_from(value).ok()
    } else {
        tracing::debug!(value, "ignoring out-of-range servings");
        None
    }
}

/// A line that says nothing but the servings ("Serves 4", "Yield: 12").
fn is_servings_only(line: &str) -> bool {
    SERVINGS.is_match(line) && char_len(SERVINGS.replace(line, "").trim()) < 5
}

pub fn detect_category(text: &str) -> RecipeCategory {
    let lowered = text.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, terms)| terms.iter().any(|term| lowered.contains(term)))
        .map(|(category, _)| *category)
        .unwrap_or_default()
}

fn looks_like_title(line: &str) -> bool {
    let len = char_len(line);
    len > 1
        && len < MAX_NAME_LEN
        && !QTY_START.is_match(line)
        && !NUMBERED_STEP.is_match(line)
}

fn clean_name(name: &str) -> String {
    let name = NAME_MARKDOWN.replace(name, "");
    NAME_TRAILING.replace(&name, "").trim().to_string()
}

/// Segment a free-form recipe text into name, servings, category,
/// ingredients and steps.
///
/// Never fails. Text with nothing recognisable yields the default recipe
/// (untitled, dinner, 4 servings, no ingredients, no steps) and callers treat
/// emptiness as the "looks incomplete" signal.
pub fn parse_recipe_text(text: &str) -> ParsedRecipe {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut recipe = ParsedRecipe::default();
    if lines.is_empty() {
        return recipe;
    }

    if let Some(servings) = servings_in(text) {
        recipe.servings = servings;
    }
    recipe.category = detect_category(text);

    let mut section = Section::Unknown;
    let mut explicit_ingredients = false;
    let mut name: Option<String> = None;

    for &line in &lines {
        if char_len(line) <= 1 {
            continue;
        }

        if name.is_none() {
            if let Some(caps) = NAME_HEADER.captures(line) {
                name = Some(caps[1].trim().to_string());
                continue;
            }
        }

        if INGREDIENT_HEADER.is_match(line) {
            section = Section::Ingredients;
            explicit_ingredients = true;
            continue;
        }
        if STEP_HEADER.is_match(line) {
            section = Section::Steps;
            continue;
        }
        if NOTES_HEADER.is_match(line) {
            section = Section::Notes;
            continue;
        }

        if SERVINGS.is_match(line) {
            if let Some(servings) = servings_in(line) {
                recipe.servings = servings;
            }
            if is_servings_only(line) {
                continue;
            }
        }

        if section == Section::Notes {
            continue;
        }

        if name.is_none()
            && section == Section::Unknown
            && looks_like_title(line)
            && !BULLET.is_match(line)
        {
            name = Some(NAME_PREFIX.replace(line, "").to_string());
            continue;
        }

        if matches!(section, Section::Unknown | Section::Ingredients) {
            if let Some(ingredient) = parse_line(line) {
                section = Section::Ingredients;
                recipe.ingredients.push(ingredient);
                continue;
            }
        }

        if matches!(section, Section::Unknown | Section::Steps) {
            if let Some(prefix) = NUMBERED_STEP.find(line) {
                let step = line[prefix.end()..].trim();
                if char_len(step) > MIN_STEP_LEN {
                    section = Section::Steps;
                    recipe.steps.push(step.to_string());
                    continue;
                }
                // Short numbered steps ("1. Mix.") count once under a steps header.
                if section == Section::Steps && !step.is_empty() {
                    recipe.steps.push(step.to_string());
                    continue;
                }
            }

            if section == Section::Steps {
                let step = strip_bullet(line);
                if char_len(step) > MIN_STEP_LEN {
                    recipe.steps.push(step.to_string());
                    continue;
                }
            }
        }

        // Long prose (over LONG_PROSE_LEN chars) once ingredients exist starts
        // the steps. This applies before any header and also inside an
        // ingredient section that was entered without an "Ingredients"
        // header. Under an explicit ingredients header the line is dropped.
        let unlabelled = section == Section::Unknown
            || (section == Section::Ingredients && !explicit_ingredients);
        if unlabelled && char_len(line) > LONG_PROSE_LEN && !recipe.ingredients.is_empty() {
            section = Section::Steps;
            recipe.steps.push(line.to_string());
        }
    }

    let name = name.filter(|n| !n.is_empty()).or_else(|| {
        lines
            .iter()
            .take(NAME_SCAN_LINES)
            .find(|line| {
                looks_like_title(line)
                    && !INGREDIENT_HEADER.is_match(line)
                    && !STEP_HEADER.is_match(line)
            })
            .map(|line| line.to_string())
    });
    let name = clean_name(name.as_deref().unwrap_or(UNTITLED_RECIPE));
    recipe.name = if name.is_empty() {
        UNTITLED_RECIPE.to_string()
    } else {
        name
    };

    if recipe.ingredients.is_empty() && recipe.steps.is_empty() && lines.len() > 2 {
        tracing::debug!("no sections recognised, classifying lines one by one");
        flat_pass(&lines, &mut recipe);
    }

    recipe
}

/// Last resort for text without any usable structure: every line is judged
/// on its own.
fn flat_pass(lines: &[&str], recipe: &mut ParsedRecipe) {
    for &line in lines {
        if line == recipe.name || is_section_header(line) || is_servings_only(line) {
            continue;
        }
        if let Some(ingredient) = parse_line(line) {
            recipe.ingredients.push(ingredient);
        } else if char_len(line) > FLAT_STEP_LEN {
            let without_number = NUMBERED_STEP.replace(line, "");
            let step = strip_bullet(&without_number);
            if char_len(step) > MIN_STEP_LEN {
                recipe.steps.push(step.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_gives_default_recipe() {
        let recipe = parse_recipe_text("");
        assert_eq!(recipe, ParsedRecipe::default());
        assert_eq!(parse_recipe_text("  \n\n \t"), ParsedRecipe::default());
    }

    #[test]
    fn test_headers_split_sections() {
        let text = "Ingredients:\n2 cups flour\n1 egg\nSteps:\n1. Mix.\n2. Bake.";
        let recipe = parse_recipe_text(text);
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.ingredients[0].item, "flour");
        assert_eq!(recipe.ingredients[1].item, "egg");
        assert_eq!(recipe.steps, vec!["Mix.", "Bake."]);
        assert_eq!(recipe.name, "Untitled Recipe");
    }

    #[test]
    fn test_full_recipe() {
        let text = "\
# Lemon Garlic Chicken
Serves 6

Ingredients
- 2 lb chicken thighs
- 4 cloves garlic, minced
- 1 lemon
- Salt and pepper to taste

Directions
1. Rub the chicken with garlic and lemon juice.
2. Season generously and roast for 40 minutes.

Notes:
Leftovers keep for three days in the fridge.
";
        let recipe = parse_recipe_text(text);
        assert_eq!(recipe.name, "Lemon Garlic Chicken");
        assert_eq!(recipe.servings, 6);
        assert_eq!(recipe.category, RecipeCategory::Dinner);
        assert_eq!(recipe.ingredients.len(), 4);
        assert_eq!(recipe.ingredients[1].unit, "cloves");
        assert_eq!(recipe.ingredients[3].qty, "");
        assert_eq!(recipe.steps.len(), 2);
        assert_eq!(recipe.steps[1], "Season generously and roast for 40 minutes.");
        assert!(recipe.is_complete());
    }

    #[test]
    fn test_servings_range() {
        assert_eq!(parse_recipe_text("Pasta\nServes 6\n1 lb pasta").servings, 6);
        assert_eq!(parse_recipe_text("Pasta\nServes 500\n1 lb pasta").servings, 4);
        assert_eq!(parse_recipe_text("Pasta\nYield: 12\n1 lb pasta").servings, 12);
    }

    #[test]
    fn test_category_priority() {
        assert_eq!(detect_category("Blueberry Pancakes"), RecipeCategory::Breakfast);
        assert_eq!(detect_category("Chicken salad with chocolate dressing"), RecipeCategory::Lunch);
        assert_eq!(detect_category("Chocolate Fudge"), RecipeCategory::Dessert);
        assert_eq!(detect_category("Spicy guacamole"), RecipeCategory::Snack);
        assert_eq!(detect_category("Beef stew"), RecipeCategory::Dinner);
    }

    #[test]
    fn test_name_header_and_cleanup() {
        let recipe = parse_recipe_text("Recipe: Tomato Soup\n2 cups tomatoes");
        assert_eq!(recipe.name, "Tomato Soup");

        let recipe = parse_recipe_text("Grandma's Stew:\n1 lb beef");
        assert_eq!(recipe.name, "Grandma's Stew");
    }

    #[test]
    fn test_long_prose_after_ingredients_becomes_steps() {
        let text = "\
Quick Rice
1 cup rice
2 cups water
Bring the water to a boil, add the rice, cover and simmer for eighteen minutes.
Fluff with a fork.";
        let recipe = parse_recipe_text(text);
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.steps.len(), 2);
        assert_eq!(recipe.steps[1], "Fluff with a fork.");
    }

    #[test]
    fn test_long_prose_under_ingredients_header_is_dropped() {
        let text = "\
Quick Rice
Ingredients
1 cup rice
2 cups water
Bring the water to a boil, add the rice, cover and simmer for eighteen minutes.";
        let recipe = parse_recipe_text(text);
        assert_eq!(recipe.ingredients.len(), 2);
        assert!(recipe.steps.is_empty());
    }

    #[test]
    fn test_notes_are_discarded() {
        let text = "Toast\nIngredients:\n2 slices bread\nTips:\n1 tbsp butter makes it better";
        let recipe = parse_recipe_text(text);
        assert_eq!(recipe.ingredients.len(), 1);
        assert!(recipe.steps.is_empty());
    }

    #[test]
    fn test_flat_pass_without_structure() {
        let text = "\
Serves 2
Whisk everything in a large bowl until smooth.
Pour into a hot skillet and cook both sides.
Serve right away with syrup.";
        let recipe = parse_recipe_text(text);
        assert_eq!(recipe.servings, 2);
        assert_eq!(recipe.name, "Whisk everything in a large bowl until smooth.");
        assert!(recipe.ingredients.is_empty());
        assert_eq!(recipe.steps.len(), 2);
        assert_eq!(recipe.steps[0], "Pour into a hot skillet and cook both sides.");
    }
}

//! Static vocabulary shared by every parser: measurement units, unicode
//! fractions, and the keyword lists used to put ingredients in aisles.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::IngredientCategory;

/// Unicode vulgar fractions and their decimal values.
pub const UNICODE_FRACTIONS: &[(char, f64)] = &[
    ('\u{00BD}', 0.5),   // ½
    ('\u{2153}', 0.333), // ⅓
    ('\u{00BC}', 0.25),  // ¼
    ('\u{2154}', 0.667), // ⅔
    ('\u{00BE}', 0.75),  // ¾
    ('\u{2155}', 0.2),   // ⅕
    ('\u{2156}', 0.4),   // ⅖
    ('\u{2157}', 0.6),   // ⅗
    ('\u{2158}', 0.8),   // ⅘
    ('\u{2159}', 0.167), // ⅙
    ('\u{215A}', 0.833), // ⅚
    ('\u{215B}', 0.125), // ⅛
    ('\u{215C}', 0.375), // ⅜
    ('\u{215D}', 0.625), // ⅝
    ('\u{215E}', 0.875), // ⅞
];

/// The same characters, ready to drop into a regex character class.
pub const FRACTION_CHARS: &str = "½⅓¼⅔¾⅕⅖⅗⅘⅙⅚⅛⅜⅝⅞";

/// (numerator, denominator, decimal) used to turn a decimal back into "n/d".
const FRACTION_TABLE: &[(u32, u32, f64)] = &[
    (1, 2, 0.5),
    (1, 3, 0.333),
    (2, 3, 0.667),
    (1, 4, 0.25),
    (3, 4, 0.75),
    (1, 5, 0.2),
    (2, 5, 0.4),
    (3, 5, 0.6),
    (4, 5, 0.8),
    (1, 6, 0.167),
    (5, 6, 0.833),
    (1, 8, 0.125),
    (3, 8, 0.375),
    (5, 8, 0.625),
    (7, 8, 0.875),
];

const FRACTION_TOLERANCE: f64 = 0.01;

/// Regex alternation of every recognised unit spelling. Callers wrap it in a
/// group and follow it with whitespace, so short spellings such as `g` or `l`
/// only match as whole words.
pub const UNIT_ALTERNATION: &str = concat!(
    r"cups?|tbsps?|tbs|tablespoons?|tsp|teaspoons?|oz|ounces?|lbs?|pounds?|",
    r"grams?|g|kg|kilograms?|ml|milliliters?|millilitres?|liters?|litres?|l|",
    r"cloves?|sprigs?|cans?|packages?|pkg|pieces?|pcs?|slices?|",
    r"pinch(?:es)?|dash(?:es)?|bunch(?:es)?|heads?|stalks?|sticks?|",
    r"whole|large|medium|small|quarts?|qt|pints?|pt|gallons?|gal|",
    r"drops?|handfuls?|containers?|bottles?|jars?|bags?|box(?:es)?|c"
);

/// Packaging words that may follow a parenthetical size, as in
/// "1 (14 oz) can diced tomatoes".
pub const CONTAINER_ALTERNATION: &str =
    r"cans?|jars?|bottles?|packages?|pkg|bags?|box(?:es)?|containers?";

struct UnitDef {
    /// Spellings sharing a key are the same unit for merging purposes.
    key: &'static str,
    singular: &'static str,
    plural: &'static str,
}

const UNIT_DEFS: &[UnitDef] = &[
    UnitDef { key: "cup", singular: "cup", plural: "cups" },
    UnitDef { key: "cup", singular: "c", plural: "c" },
    UnitDef { key: "cup", singular: "c.", plural: "c." },
    UnitDef { key: "tbsp", singular: "tbsp", plural: "tbsp" },
    UnitDef { key: "tbsp", singular: "tbsps", plural: "tbsps" },
    UnitDef { key: "tbsp", singular: "tbs", plural: "tbs" },
    UnitDef { key: "tbsp", singular: "tablespoon", plural: "tablespoons" },
    UnitDef { key: "tsp", singular: "tsp", plural: "tsp" },
    UnitDef { key: "tsp", singular: "teaspoon", plural: "teaspoons" },
    UnitDef { key: "oz", singular: "oz", plural: "oz" },
    UnitDef { key: "oz", singular: "ounce", plural: "ounces" },
    UnitDef { key: "lb", singular: "lb", plural: "lbs" },
    UnitDef { key: "lb", singular: "pound", plural: "pounds" },
    UnitDef { key: "g", singular: "g", plural: "g" },
    UnitDef { key: "g", singular: "gram", plural: "grams" },
    UnitDef { key: "kg", singular: "kg", plural: "kg" },
    UnitDef { key: "kg", singular: "kilogram", plural: "kilograms" },
    UnitDef { key: "ml", singular: "ml", plural: "ml" },
    UnitDef { key: "ml", singular: "milliliter", plural: "milliliters" },
    UnitDef { key: "ml", singular: "millilitre", plural: "millilitres" },
    UnitDef { key: "l", singular: "l", plural: "l" },
    UnitDef { key: "l", singular: "liter", plural: "liters" },
    UnitDef { key: "l", singular: "litre", plural: "litres" },
    UnitDef { key: "clove", singular: "clove", plural: "cloves" },
    UnitDef { key: "sprig", singular: "sprig", plural: "sprigs" },
    UnitDef { key: "can", singular: "can", plural: "cans" },
    UnitDef { key: "package", singular: "package", plural: "packages" },
    UnitDef { key: "package", singular: "pkg", plural: "pkg" },
    UnitDef { key: "piece", singular: "piece", plural: "pieces" },
    UnitDef { key: "piece", singular: "pc", plural: "pcs" },
    UnitDef { key: "slice", singular: "slice", plural: "slices" },
    UnitDef { key: "pinch", singular: "pinch", plural: "pinches" },
    UnitDef { key: "dash", singular: "dash", plural: "dashes" },
    UnitDef { key: "bunch", singular: "bunch", plural: "bunches" },
    UnitDef { key: "head", singular: "head", plural: "heads" },
    UnitDef { key: "stalk", singular: "stalk", plural: "stalks" },
    UnitDef { key: "stick", singular: "stick", plural: "sticks" },
    UnitDef { key: "whole", singular: "whole", plural: "whole" },
    UnitDef { key: "large", singular: "large", plural: "large" },
    UnitDef { key: "medium", singular: "medium", plural: "medium" },
    UnitDef { key: "small", singular: "small", plural: "small" },
    UnitDef { key: "quart", singular: "quart", plural: "quarts" },
    UnitDef { key: "quart", singular: "qt", plural: "qt" },
    UnitDef { key: "pint", singular: "pint", plural: "pints" },
    UnitDef { key: "pint", singular: "pt", plural: "pt" },
    UnitDef { key: "gallon", singular: "gallon", plural: "gallons" },
    UnitDef { key: "gallon", singular: "gal", plural: "gal" },
    UnitDef { key: "drop", singular: "drop", plural: "drops" },
    UnitDef { key: "handful", singular: "handful", plural: "handfuls" },
    UnitDef { key: "container", singular: "container", plural: "containers" },
    UnitDef { key: "bottle", singular: "bottle", plural: "bottles" },
    UnitDef { key: "jar", singular: "jar", plural: "jars" },
    UnitDef { key: "bag", singular: "bag", plural: "bags" },
    UnitDef { key: "box", singular: "box", plural: "boxes" },
];

fn find_unit(unit: &str) -> Option<&'static UnitDef> {
    let lower = unit.trim().to_lowercase();
    UNIT_DEFS
        .iter()
        .find(|def| def.singular == lower || def.plural == lower)
}

/// Key under which two unit strings are considered the same unit.
/// Unknown units compare by their lowercased, trimmed text.
pub fn canonical_unit(unit: &str) -> String {
    match find_unit(unit) {
        Some(def) => def.key.to_string(),
        None => unit.trim().to_lowercase(),
    }
}

/// Spelling of `unit` agreeing in number with `total`.
pub fn unit_for_total(unit: &str, total: f64) -> String {
    match find_unit(unit) {
        Some(def) if (total - 1.0).abs() < f64::EPSILON => def.singular.to_string(),
        Some(def) => def.plural.to_string(),
        None => unit.trim().to_string(),
    }
}

/// Display form of a summed quantity: whole numbers without a decimal point,
/// anything else rounded to two places.
pub fn format_quantity(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        rounded.to_string()
    }
}

pub fn decimal_to_fraction(value: f64) -> String {
    FRACTION_TABLE
        .iter()
        .find(|(_, _, decimal)| (value - decimal).abs() < FRACTION_TOLERANCE)
        .map(|(n, d, _)| format!("{}/{}", n, d))
        .unwrap_or_else(|| value.to_string())
}

/// Rewrite unicode fractions as ASCII "n/d", separating them from a
/// preceding whole number: "1⅓" becomes "1 1/3".
pub fn normalize_qty(qty: &str) -> String {
    let mut result = String::new();
    for ch in qty.trim().chars() {
        match UNICODE_FRACTIONS.iter().find(|(c, _)| *c == ch) {
            Some((_, value)) => {
                if !result.is_empty() && !result.ends_with(' ') {
                    result.push(' ');
                }
                result.push_str(&decimal_to_fraction(*value));
            }
            None => result.push(ch),
        }
    }
    result.trim().to_string()
}

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid number regex")
});

static LEADING_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[+-]?\d+").expect("valid integer regex"));

/// Numeric value of the longest numeric prefix: "1/2" reads as 1, "2-3" as 2,
/// "a pinch" as nothing.
pub fn leading_number(text: &str) -> Option<f64> {
    LEADING_NUMBER
        .find(text)
        .and_then(|m| m.as_str().trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Integer value of the leading digits: "6 servings" reads as 6.
pub fn leading_int(text: &str) -> Option<i64> {
    LEADING_INT
        .find(text)
        .and_then(|m| m.as_str().trim().parse::<i64>().ok())
}

// Category term lists. Checked frozen, dairy, meat, produce, pantry; the
// first list containing a substring of the item wins.

const FROZEN_TERMS: &[&str] = &["frozen", "ice cream", "popsicle"];
/// Frozen terms that only count as whole words, so "rice" and "spice" stay
/// in the pantry.
const FROZEN_WORDS: &[&str] = &["ice"];

const DAIRY_TERMS: &[&str] = &[
    "milk", "cream", "cheese", "butter", "yogurt", "sour cream", "ricotta", "mozzarella",
    "parmesan", "cheddar", "whipping cream", "half and half", "half-and-half",
    "cottage cheese", "cream cheese", "ghee", "buttermilk",
];

const MEAT_TERMS: &[&str] = &[
    "chicken", "beef", "pork", "lamb", "turkey", "fish", "salmon", "tuna", "shrimp", "prawn",
    "crab", "lobster", "clam", "mussel", "oyster", "scallop", "bacon", "sausage", "ham",
    "steak", "veal", "duck", "venison", "bison", "anchov", "sardine", "cod", "halibut",
    "tilapia", "trout", "mahi", "sea bass", "squid", "octopus", "chorizo", "pancetta",
    "prosciutto", "pepperoni", "salami",
];

const PRODUCE_TERMS: &[&str] = &[
    "lettuce", "tomato", "onion", "garlic", "pepper", "carrot", "celery", "potato", "apple",
    "banana", "lemon", "lime", "orange", "herb", "basil", "cilantro", "parsley", "mint",
    "thyme", "rosemary", "dill", "chive", "ginger", "avocado", "spinach", "kale", "broccoli",
    "cauliflower", "cucumber", "zucchini", "squash", "mushroom", "corn", "peas", "beans",
    "cabbage", "beet", "radish", "turnip", "scallion", "shallot", "leek", "asparagus",
    "artichoke", "eggplant", "jalape", "berry", "strawberr", "blueberr", "raspberr",
    "blackberr", "peach", "pear", "mango", "pineapple", "grape", "melon", "watermelon",
    "cantaloupe", "fig", "plum", "cherry", "cranberr", "fresh",
];

const PANTRY_TERMS: &[&str] = &[
    "flour", "sugar", "salt", "pepper", "oil", "vinegar", "soy sauce", "sauce", "paste",
    "can ", "canned", "rice", "pasta", "noodle", "bread", "tortilla", "spice", "seasoning",
    "cumin", "paprika", "cinnamon", "nutmeg", "oregano", "powder", "baking", "yeast",
    "cornstarch", "broth", "stock", "bouillon", "honey", "maple", "syrup", "jam", "jelly",
    "mustard", "ketchup", "mayo", "mayonnaise", "sriracha", "hot sauce", "worcestershire",
    "extract", "vanilla", "cocoa", "chocolate", "chip", "nut", "almond", "walnut", "pecan",
    "peanut", "cashew", "pistachio", "seed", "sesame", "oat", "cereal", "granola", "cracker",
    "crumb", "panko", "breadcrumb", "coconut", "lentil", "chickpea", "bean", "dried", "wine",
    "beer", "liquor", "rum", "whiskey",
];

const CATEGORY_TERMS: &[(IngredientCategory, &[&str])] = &[
    (IngredientCategory::Frozen, FROZEN_TERMS),
    (IngredientCategory::Dairy, DAIRY_TERMS),
    (IngredientCategory::Meat, MEAT_TERMS),
    (IngredientCategory::Produce, PRODUCE_TERMS),
    (IngredientCategory::Pantry, PANTRY_TERMS),
];

pub fn guess_category(item: &str) -> IngredientCategory {
    let lower = item.to_lowercase();
    if lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| FROZEN_WORDS.contains(&word))
    {
        return IngredientCategory::Frozen;
    }
    CATEGORY_TERMS
        .iter()
        .find(|(_, terms)| terms.iter().any(|term| lower.contains(term)))
        .map(|(category, _)| *category)
        .unwrap_or(IngredientCategory::Other)
}

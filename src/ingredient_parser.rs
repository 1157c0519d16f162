use regex::Regex;
use std::sync::LazyLock;

use crate::lexicon::{
    guess_category, normalize_qty, CONTAINER_ALTERNATION, FRACTION_CHARS, UNIT_ALTERNATION,
};
use crate::models::Ingredient;

/// Longest quantity token accepted when no unit follows it.
const MAX_BARE_QTY_LEN: usize = 10;
const MAX_BARE_ITEM_LEN: usize = 100;

/// A quantity starts and ends with a digit or fraction; digits, spaces,
/// slashes, dots and dashes may sit in between ("1 1/2", "2-3", "1.5").
fn qty_pattern() -> String {
    format!(
        r"[\d{f}](?:[\d\s{f}/.\-]*[\d{f}])?",
        f = FRACTION_CHARS
    )
}

pub(crate) static BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\u{2022}\u{2023}\u{25E6}\u{2043}\u{2219}\-*\u{2013}\u{2014}]\s*")
        .expect("valid bullet regex")
});

static PARENTHETICAL_CONTAINER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?P<qty>{qty})\s*\((?P<paren>[^)]+)\)\s*(?:(?P<container>{containers})\.?)?\s+(?P<item>.+)$",
        qty = qty_pattern(),
        containers = CONTAINER_ALTERNATION
    ))
    .expect("valid parenthetical regex")
});

static QUANTITY_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?P<qty>{qty})\s*(?P<unit>{units})\.?\s+(?P<item>.+)$",
        qty = qty_pattern(),
        units = UNIT_ALTERNATION
    ))
    .expect("valid unit regex")
});

static BARE_QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?P<qty>{qty})\s+(?P<item>.+)$", qty = qty_pattern()))
        .expect("valid bare quantity regex")
});

static NO_QUANTITY_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:salt|pepper|oil|spray|water|ice|garnish|optional|pinch|dash|drizzle|splash)")
        .expect("valid no-quantity regex")
});

static TO_TASTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)to taste|as needed|for (?:garnish|serving|drizzling|greasing)")
        .expect("valid to-taste regex")
});

type Rule = fn(&str) -> Option<Ingredient>;

/// Matchers in priority order; the first one that accepts the line wins.
const RULES: &[(&str, Rule)] = &[
    ("parenthetical_container", parenthetical_container),
    ("quantity_unit", quantity_unit),
    ("bare_quantity", bare_quantity),
    ("no_quantity", no_quantity),
];

/// "1 (14 oz) can diced tomatoes": the size note and the container become the
/// unit, the container also counts towards the category guess.
fn parenthetical_container(line: &str) -> Option<Ingredient> {
    let caps = PARENTHETICAL_CONTAINER.captures(line)?;
    let container = caps.name("container").map_or("", |m| m.as_str().trim());
    let item = caps["item"].trim();
    let unit = format!("({}) {}", caps["paren"].trim(), container);
    let display = if container.is_empty() {
        item.to_string()
    } else {
        format!("{} {}", container, item)
    };
    Some(Ingredient {
        qty: normalize_qty(&caps["qty"]),
        unit: unit.trim().to_string(),
        item: item.to_string(),
        category: guess_category(&display),
    })
}

fn quantity_unit(line: &str) -> Option<Ingredient> {
    let caps = QUANTITY_UNIT.captures(line)?;
    Some(Ingredient::new(
        normalize_qty(&caps["qty"]),
        caps["unit"].trim(),
        caps["item"].trim(),
    ))
}

fn bare_quantity(line: &str) -> Option<Ingredient> {
    let caps = BARE_QUANTITY.captures(line)?;
    let qty = normalize_qty(&caps["qty"]);
    let item = caps["item"].trim();
    if qty.chars().count() > MAX_BARE_QTY_LEN
        || item.is_empty()
        || item.chars().count() >= MAX_BARE_ITEM_LEN
    {
        return None;
    }
    Some(Ingredient::new(qty, "", item))
}

/// "salt and pepper to taste", "olive oil for drizzling".
fn no_quantity(line: &str) -> Option<Ingredient> {
    if NO_QUANTITY_START.is_match(line) || TO_TASTE.is_match(line) {
        Some(Ingredient::new("", "", line))
    } else {
        None
    }
}

pub fn strip_bullet(line: &str) -> &str {
    match BULLET.find(line) {
        Some(m) => line[m.end()..].trim(),
        None => line.trim(),
    }
}

/// Parse one freeform line into an ingredient, or `None` when the line does
/// not look like one.
pub fn parse_line(line: &str) -> Option<Ingredient> {
    let cleaned = strip_bullet(line);
    if cleaned.is_empty() {
        return None;
    }
    RULES.iter().find_map(|(name, rule)| {
        let parsed = rule(cleaned);
        if parsed.is_some() {
            tracing::trace!(rule = *name, line = cleaned, "ingredient rule matched");
        }
        parsed
    })
}

/// Lenient variant for sources that already know the text is an ingredient
/// (schema.org `recipeIngredient`): unmatched text becomes the item itself.
pub fn parse_ingredient_string(text: &str) -> Option<Ingredient> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(parse_line(&collapsed).unwrap_or_else(|| Ingredient::new("", "", collapsed)))
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const UNTITLED_RECIPE: &str = "Untitled Recipe";
pub const DEFAULT_SERVINGS: u32 = 4;

/// Meal slot a recipe belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecipeCategory {
    Breakfast,
    Lunch,
    #[default]
    Dinner,
    Snack,
    Dessert,
}

impl RecipeCategory {
    pub const ALL: [RecipeCategory; 5] = [
        RecipeCategory::Breakfast,
        RecipeCategory::Lunch,
        RecipeCategory::Dinner,
        RecipeCategory::Snack,
        RecipeCategory::Dessert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeCategory::Breakfast => "breakfast",
            RecipeCategory::Lunch => "lunch",
            RecipeCategory::Dinner => "dinner",
            RecipeCategory::Snack => "snack",
            RecipeCategory::Dessert => "dessert",
        }
    }

    /// Exact (case-insensitive) match against the five labels.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == wanted)
    }
}

impl fmt::Display for RecipeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grocery-aisle grouping used to bucket the shopping list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IngredientCategory {
    Produce,
    Dairy,
    Meat,
    Pantry,
    Frozen,
    #[default]
    Other,
}

impl IngredientCategory {
    /// Bucket order of the shopping list.
    pub const ALL: [IngredientCategory; 6] = [
        IngredientCategory::Produce,
        IngredientCategory::Dairy,
        IngredientCategory::Meat,
        IngredientCategory::Pantry,
        IngredientCategory::Frozen,
        IngredientCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IngredientCategory::Produce => "produce",
            IngredientCategory::Dairy => "dairy",
            IngredientCategory::Meat => "meat",
            IngredientCategory::Pantry => "pantry",
            IngredientCategory::Frozen => "frozen",
            IngredientCategory::Other => "other",
        }
    }

    pub fn heading(&self) -> &'static str {
        match self {
            IngredientCategory::Produce => "Produce",
            IngredientCategory::Dairy => "Dairy",
            IngredientCategory::Meat => "Meat & Seafood",
            IngredientCategory::Pantry => "Pantry",
            IngredientCategory::Frozen => "Frozen",
            IngredientCategory::Other => "Other",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == wanted)
    }
}

impl fmt::Display for IngredientCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ingredient line. `qty` stays a string so "1/2", "2-3" and
/// "a pinch of" survive untouched.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Ingredient {
    #[serde(default)]
    pub qty: String,
    #[serde(default)]
    pub unit: String,
    pub item: String,
    #[serde(default)]
    pub category: IngredientCategory,
}

impl Ingredient {
    pub fn new(qty: impl Into<String>, unit: impl Into<String>, item: impl Into<String>) -> Self {
        let item = item.into();
        let category = crate::lexicon::guess_category(&item);
        Self {
            qty: qty.into(),
            unit: unit.into(),
            item,
            category,
        }
    }
}

/// Recipe fields as produced by any extraction path, before it is given an
/// identity and stored.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ParsedRecipe {
    pub name: String,
    pub category: RecipeCategory,
    pub servings: u32,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
}

impl Default for ParsedRecipe {
    fn default() -> Self {
        Self {
            name: UNTITLED_RECIPE.to_string(),
            category: RecipeCategory::default(),
            servings: DEFAULT_SERVINGS,
            ingredients: Vec::new(),
            steps: Vec::new(),
        }
    }
}

impl ParsedRecipe {
    /// A recipe can be saved only once it has both ingredients and steps.
    pub fn is_complete(&self) -> bool {
        !self.ingredients.is_empty() && !self.steps.is_empty()
    }

    pub fn into_recipe(self) -> Recipe {
        Recipe {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name,
            category: self.category,
            servings: self.servings,
            ingredients: self.ingredients,
            steps: self.steps,
            image: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: RecipeCategory,
    #[serde(default = "default_servings")]
    pub servings: u32,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default = "created_now")]
    pub created_at: DateTime<Utc>,
}

fn default_servings() -> u32 {
    DEFAULT_SERVINGS
}

fn created_now() -> DateTime<Utc> {
    Utc::now()
}

/// A recipe scheduled on a date. `recipe_id` is a weak reference; entries
/// whose recipe no longer exists are skipped by consumers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntry {
    pub id: String,
    pub date: NaiveDate,
    pub recipe_id: String,
}

/// One occurrence of a recipe on the plan, resolved from a `PlanEntry`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledRecipe<'a> {
    pub date: NaiveDate,
    pub recipe: &'a Recipe,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    pub id: String,
    pub qty: String,
    pub unit: String,
    pub item: String,
    pub category: IngredientCategory,
    pub recipe_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookPhase {
    Prep,
    Oven,
    Cooking,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CookStep {
    pub number: usize,
    pub text: String,
    pub recipes: Vec<String>,
    pub phase: CookPhase,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parsed_recipe() {
        let recipe = ParsedRecipe::default();
        assert_eq!(recipe.name, "Untitled Recipe");
        assert_eq!(recipe.category, RecipeCategory::Dinner);
        assert_eq!(recipe.servings, 4);
        assert!(!recipe.is_complete());
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(RecipeCategory::from_label(" Dessert "), Some(RecipeCategory::Dessert));
        assert_eq!(RecipeCategory::from_label("supper"), None);
        assert_eq!(IngredientCategory::from_label("frozen"), Some(IngredientCategory::Frozen));
    }

    #[test]
    fn test_recipe_deserializes_with_defaults() {
        let recipe: Recipe = serde_json::from_str(
            r#"{"id":"r1","name":"Toast","ingredients":[{"item":"bread"}],"steps":["Toast it"]}"#,
        )
        .unwrap();
        assert_eq!(recipe.servings, 4);
        assert_eq!(recipe.category, RecipeCategory::Dinner);
        assert_eq!(recipe.ingredients[0].category, IngredientCategory::Other);
        assert_eq!(recipe.ingredients[0].qty, "");
    }

    #[test]
    fn test_plan_entry_uses_iso_dates() {
        let entry: PlanEntry =
            serde_json::from_str(r#"{"id":"p1","date":"2024-03-05","recipeId":"r1"}"#).unwrap();
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"recipeId\":\"r1\""));
    }
}

use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

use crate::cook_guide::CookSelection;
use crate::models::{ParsedRecipe, PlanEntry, Recipe, RecipeCategory, ScheduledRecipe};
use crate::shopping_list::{aggregate, CheckedState, ItemIdStrategy, ShoppingList};

pub const DEFAULT_WEEK_LENGTH: u32 = 7;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("no recipe with id {0}")]
    UnknownRecipe(String),
    #[error("could not read or write backup: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid backup data: {0}")]
    InvalidBackup(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerSettings {
    #[serde(default = "default_week_length")]
    pub week_length: u32,
    #[serde(default = "today")]
    pub week_start_date: NaiveDate,
}

fn default_week_length() -> u32 {
    DEFAULT_WEEK_LENGTH
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            week_length: DEFAULT_WEEK_LENGTH,
            week_start_date: today(),
        }
    }
}

impl PlannerSettings {
    pub fn date_range(&self) -> Vec<NaiveDate> {
        date_range(self.week_start_date, self.week_length)
    }
}

/// `days` consecutive dates starting at `start`. Zero days means the default
/// week length.
pub fn date_range(start: NaiveDate, days: u32) -> Vec<NaiveDate> {
    let days = if days == 0 { DEFAULT_WEEK_LENGTH } else { days };
    (0..days)
        .filter_map(|offset| start.checked_add_days(Days::new(u64::from(offset))))
        .collect()
}

/// On-disk backup document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(default)]
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub plans: Vec<PlanEntry>,
    #[serde(default)]
    pub settings: PlannerSettings,
    #[serde(default)]
    pub shopping_checked: CheckedState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<DateTime<Utc>>,
}

/// Recipe collection plus the dated plan referencing it.
#[derive(Debug, Clone, Default)]
pub struct MealPlan {
    pub recipes: Vec<Recipe>,
    pub plans: Vec<PlanEntry>,
    pub settings: PlannerSettings,
    pub shopping_checked: CheckedState,
}

impl MealPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recipe(&self, id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == id)
    }

    pub fn add_recipe(&mut self, parsed: ParsedRecipe) -> &Recipe {
        let recipe = parsed.into_recipe();
        tracing::info!(id = %recipe.id, name = %recipe.name, "recipe added");
        self.recipes.push(recipe);
        &self.recipes[self.recipes.len() - 1]
    }

    /// Replace a recipe's content, keeping its id, image and creation time.
    pub fn update_recipe(&mut self, id: &str, parsed: ParsedRecipe) -> Result<&Recipe, PlannerError> {
        let recipe = self
            .recipes
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PlannerError::UnknownRecipe(id.to_string()))?;
        recipe.name = parsed.name;
        recipe.category = parsed.category;
        recipe.servings = parsed.servings;
        recipe.ingredients = parsed.ingredients;
        recipe.steps = parsed.steps;
        Ok(&*recipe)
    }

    /// Remove a recipe together with every plan entry pointing at it.
    pub fn delete_recipe(&mut self, id: &str) -> bool {
        let before = self.recipes.len();
        self.recipes.retain(|r| r.id != id);
        let removed = self.recipes.len() != before;
        let plans_before = self.plans.len();
        self.plans.retain(|p| p.recipe_id != id);
        if removed {
            tracing::info!(id, plans_removed = plans_before - self.plans.len(), "recipe deleted");
        }
        removed
    }

    /// Recipes whose name contains `term` (case-insensitive), optionally
    /// restricted to one category.
    pub fn filter_recipes(&self, term: &str, category: Option<RecipeCategory>) -> Vec<&Recipe> {
        let term = term.trim().to_lowercase();
        self.recipes
            .iter()
            .filter(|r| term.is_empty() || r.name.to_lowercase().contains(&term))
            .filter(|r| category.map_or(true, |c| r.category == c))
            .collect()
    }

    pub fn add_plan(&mut self, date: NaiveDate, recipe_id: &str) -> Result<&PlanEntry, PlannerError> {
        if self.recipe(recipe_id).is_none() {
            return Err(PlannerError::UnknownRecipe(recipe_id.to_string()));
        }
        self.plans.push(PlanEntry {
            id: uuid::Uuid::new_v4().to_string(),
            date,
            recipe_id: recipe_id.to_string(),
        });
        Ok(&self.plans[self.plans.len() - 1])
    }

    pub fn remove_plan(&mut self, plan_id: &str) -> bool {
        let before = self.plans.len();
        self.plans.retain(|p| p.id != plan_id);
        self.plans.len() != before
    }

    pub fn plans_for_date(&self, date: NaiveDate) -> impl Iterator<Item = &PlanEntry> {
        self.plans.iter().filter(move |p| p.date == date)
    }

    /// Every recipe occurrence within the dates, in date then insertion
    /// order. Entries pointing at deleted recipes are skipped.
    pub fn scheduled(&self, dates: &[NaiveDate]) -> Vec<ScheduledRecipe<'_>> {
        let mut scheduled = Vec::new();
        for &date in dates {
            for plan in self.plans_for_date(date) {
                match self.recipe(&plan.recipe_id) {
                    Some(recipe) => scheduled.push(ScheduledRecipe { date, recipe }),
                    None => tracing::debug!(plan = %plan.id, recipe = %plan.recipe_id, "skipping dangling plan entry"),
                }
            }
        }
        scheduled
    }

    /// How often each recipe is planned within the dates, in first-seen
    /// order. These counts become the cook guide multipliers.
    pub fn recipe_counts(&self, dates: &[NaiveDate]) -> Vec<(&Recipe, u32)> {
        let mut counts: Vec<(&Recipe, u32)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for occurrence in self.scheduled(dates) {
            match index.get(occurrence.recipe.id.as_str()) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(occurrence.recipe.id.as_str(), counts.len());
                    counts.push((occurrence.recipe, 1));
                }
            }
        }
        counts
    }

    pub fn cook_selections(&self, dates: &[NaiveDate]) -> Vec<CookSelection<'_>> {
        self.recipe_counts(dates)
            .into_iter()
            .map(|(recipe, count)| CookSelection::new(recipe, count))
            .collect()
    }

    pub fn shopping_list(&self, dates: &[NaiveDate], strategy: ItemIdStrategy) -> ShoppingList {
        aggregate(&self.scheduled(dates), strategy)
    }

    pub fn to_backup(&self) -> Backup {
        Backup {
            recipes: self.recipes.clone(),
            plans: self.plans.clone(),
            settings: self.settings.clone(),
            shopping_checked: self.shopping_checked.clone(),
            export_date: Some(Utc::now()),
        }
    }

    pub fn from_backup(backup: Backup) -> Self {
        Self {
            recipes: backup.recipes,
            plans: backup.plans,
            settings: backup.settings,
            shopping_checked: backup.shopping_checked,
        }
    }

    pub fn export_json(&self) -> Result<String, PlannerError> {
        Ok(serde_json::to_string_pretty(&self.to_backup())?)
    }

    /// Replace everything with the content of a backup document.
    pub fn import_json(json: &str) -> Result<Self, PlannerError> {
        let backup: Backup = serde_json::from_str(json)?;
        tracing::info!(
            recipes = backup.recipes.len(),
            plans = backup.plans.len(),
            "backup imported"
        );
        Ok(Self::from_backup(backup))
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PlannerError> {
        let content = fs::read_to_string(path.as_ref()).await?;
        Self::import_json(&content)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), PlannerError> {
        fs::write(path.as_ref(), self.export_json()?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ingredient;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn parsed(name: &str, category: RecipeCategory) -> ParsedRecipe {
        ParsedRecipe {
            name: name.to_string(),
            category,
            ingredients: vec![Ingredient::new("1", "cup", "rice")],
            steps: vec!["Cook the rice.".to_string()],
            ..Default::default()
        }
    }

    fn sample_plan() -> (MealPlan, String, String) {
        let mut plan = MealPlan::new();
        let curry = plan.add_recipe(parsed("Chicken Curry", RecipeCategory::Dinner)).id.clone();
        let oats = plan.add_recipe(parsed("Overnight Oats", RecipeCategory::Breakfast)).id.clone();
        plan.add_plan(date(1), &curry).unwrap();
        plan.add_plan(date(1), &oats).unwrap();
        plan.add_plan(date(3), &curry).unwrap();
        plan.add_plan(date(9), &oats).unwrap();
        (plan, curry, oats)
    }

    #[test]
    fn test_date_range() {
        let dates = date_range(date(30), 3);
        assert_eq!(
            dates,
            vec![date(30), date(31), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()]
        );
        assert_eq!(date_range(date(1), 0).len(), 7);
    }

    #[test]
    fn test_recipe_counts_follow_first_appearance() {
        let (plan, curry, oats) = sample_plan();
        let counts = plan.recipe_counts(&date_range(date(1), 7));
        let summary: Vec<(&str, u32)> = counts.iter().map(|(r, c)| (r.id.as_str(), *c)).collect();
        assert_eq!(summary, vec![(curry.as_str(), 2), (oats.as_str(), 1)]);

        let selections = plan.cook_selections(&date_range(date(1), 7));
        assert_eq!(selections[0].label(), "Chicken Curry ×2");
    }

    #[test]
    fn test_dangling_plans_are_skipped() {
        let (mut plan, curry, _) = sample_plan();
        plan.plans.push(PlanEntry {
            id: "p-x".into(),
            date: date(2),
            recipe_id: "missing".into(),
        });
        let scheduled = plan.scheduled(&date_range(date(1), 7));
        assert_eq!(scheduled.len(), 3);
        assert_eq!(scheduled[2].recipe.id, curry);
        assert_eq!(scheduled[2].date, date(3));
    }

    #[test]
    fn test_delete_recipe_removes_its_plans() {
        let (mut plan, curry, oats) = sample_plan();
        assert!(plan.delete_recipe(&curry));
        assert!(!plan.delete_recipe(&curry));
        assert!(plan.plans.iter().all(|p| p.recipe_id == oats));
        assert_eq!(plan.plans.len(), 2);
    }

    #[test]
    fn test_add_and_remove_plan() {
        let (mut plan, curry, _) = sample_plan();
        assert!(matches!(
            plan.add_plan(date(2), "nope"),
            Err(PlannerError::UnknownRecipe(_))
        ));
        let id = plan.add_plan(date(2), &curry).unwrap().id.clone();
        assert_eq!(plan.plans_for_date(date(2)).count(), 1);
        assert!(plan.remove_plan(&id));
        assert!(!plan.remove_plan(&id));
    }

    #[test]
    fn test_filter_recipes() {
        let (plan, _, _) = sample_plan();
        assert_eq!(plan.filter_recipes("CURRY", None).len(), 1);
        assert_eq!(plan.filter_recipes("", Some(RecipeCategory::Breakfast)).len(), 1);
        assert_eq!(plan.filter_recipes("oats", Some(RecipeCategory::Dinner)).len(), 0);
        assert_eq!(plan.filter_recipes("  ", None).len(), 2);
    }

    #[test]
    fn test_update_recipe_keeps_identity() {
        let (mut plan, curry, _) = sample_plan();
        let created = plan.recipe(&curry).unwrap().created_at;
        let updated = plan
            .update_recipe(&curry, parsed("Thai Curry", RecipeCategory::Dinner))
            .unwrap();
        assert_eq!(updated.name, "Thai Curry");
        assert_eq!(updated.id, curry);
        assert_eq!(updated.created_at, created);
    }

    #[test]
    fn test_shopping_list_over_range() {
        let (plan, _, _) = sample_plan();
        let list = plan.shopping_list(&date_range(date(1), 7), ItemIdStrategy::StableKey);
        let rice = list.iter().next().unwrap();
        assert_eq!(rice.qty, "3");
        assert_eq!(rice.unit, "cups");
        assert_eq!(rice.recipe_names, vec!["Chicken Curry", "Overnight Oats"]);
    }

    #[test]
    fn test_import_fills_missing_fields() {
        let plan = MealPlan::import_json(
            r#"{"recipes":[{"id":"r1","name":"Toast"}],"plans":[{"id":"p1","date":"2024-01-02","recipeId":"r1"}]}"#,
        )
        .unwrap();
        assert_eq!(plan.recipes.len(), 1);
        assert_eq!(plan.settings.week_length, 7);
        assert!(plan.shopping_checked.is_empty());
        assert!(matches!(
            MealPlan::import_json("not json"),
            Err(PlannerError::InvalidBackup(_))
        ));
    }

    #[tokio::test]
    async fn test_backup_round_trip_on_disk() {
        let (mut plan, _, _) = sample_plan();
        plan.shopping_checked.toggle("pantry:rice");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");

        plan.save(&path).await.unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"shoppingChecked\""));
        assert!(raw.contains("\"exportDate\""));
        assert!(raw.contains("\"weekLength\""));

        let loaded = MealPlan::load(&path).await.unwrap();
        assert_eq!(loaded.recipes, plan.recipes);
        assert_eq!(loaded.plans, plan.plans);
        assert!(loaded.shopping_checked.is_checked("pantry:rice"));
    }
}

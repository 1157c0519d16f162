use chrono::NaiveDate;
use meal_planner::cook_guide::synthesize;
use meal_planner::models::{CookPhase, IngredientCategory};
use meal_planner::planner::{date_range, MealPlan};
use meal_planner::recipe_parser::parse_recipe_text;
use meal_planner::shopping_list::ItemIdStrategy;

const PANCAKES: &str = "Fluffy Pancakes\n\
Ingredients\n\
1 cup flour\n\
2 eggs\n\
1 cup milk\n\
Directions\n\
Whisk everything together until smooth.\n\
Cook on a hot griddle until golden on both sides.";

const MUFFINS: &str = "Blueberry Muffins\n\
Ingredients\n\
2 cups flour\n\
1 egg\n\
1 cup blueberries\n\
Instructions\n\
Preheat oven to 375°F.\n\
Fold the blueberries into the batter.\n\
Bake for 25 minutes.";

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

fn planned_week() -> MealPlan {
    let mut plan = MealPlan::new();
    let pancakes = plan.add_recipe(parse_recipe_text(PANCAKES)).id.clone();
    let muffins = plan.add_recipe(parse_recipe_text(MUFFINS)).id.clone();
    plan.settings.week_start_date = day(6);
    plan.add_plan(day(6), &pancakes).unwrap();
    plan.add_plan(day(8), &pancakes).unwrap();
    plan.add_plan(day(9), &muffins).unwrap();
    plan.add_plan(day(20), &muffins).unwrap();
    plan
}

#[test]
fn test_week_shopping_list() {
    let plan = planned_week();
    let dates = plan.settings.date_range();
    let list = plan.shopping_list(&dates, ItemIdStrategy::StableKey);

    let pantry = list.items(IngredientCategory::Pantry);
    let flour = pantry.iter().find(|i| i.item == "flour").unwrap();
    assert_eq!(flour.qty, "4");
    assert_eq!(flour.unit, "cups");
    assert_eq!(flour.recipe_names, vec!["Fluffy Pancakes", "Blueberry Muffins"]);

    let dairy = list.items(IngredientCategory::Dairy);
    let milk = dairy.iter().find(|i| i.item == "milk").unwrap();
    assert_eq!(milk.qty, "2");

    // unitless quantities are listed, not summed; "egg" is its own key
    let other = list.items(IngredientCategory::Other);
    assert!(other.iter().any(|i| i.item == "eggs" && i.qty == "2, 2"));
    assert!(other.iter().any(|i| i.item == "egg" && i.qty == "1"));
}

#[test]
fn test_week_cook_guide() {
    let plan = planned_week();
    let selections = plan.cook_selections(&date_range(day(6), 7));
    assert_eq!(selections.len(), 2);
    assert_eq!(selections[0].multiplier(), 2);
    assert_eq!(selections[1].multiplier(), 1);

    let steps = synthesize(&selections).unwrap();
    assert_eq!(
        steps[0].text,
        "Prepare 4 cups flour (for Fluffy Pancakes ×2, Blueberry Muffins)"
    );
    let oven: Vec<_> = steps.iter().filter(|s| s.phase == CookPhase::Oven).collect();
    assert_eq!(oven.len(), 1);
    assert_eq!(oven[0].text, "Preheat oven to 375°F (needed for Blueberry Muffins)");
    assert_eq!(
        steps.last().unwrap().text,
        "Bake for 25 minutes."
    );
}

#[test]
fn test_empty_window_has_nothing_to_cook() {
    let plan = planned_week();
    let selections = plan.cook_selections(&date_range(day(27), 3));
    assert!(selections.is_empty());
    assert!(synthesize(&selections).is_err());
}

#[tokio::test]
async fn test_backup_survives_round_trip_on_disk() {
    let mut plan = planned_week();
    let dates = plan.settings.date_range();
    let list = plan.shopping_list(&dates, ItemIdStrategy::StableKey);
    let first_id = list.iter().next().unwrap().id.clone();
    plan.shopping_checked.toggle(&first_id);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backup.json");
    plan.save(&path).await.unwrap();

    let restored = MealPlan::load(&path).await.unwrap();
    assert_eq!(restored.recipes, plan.recipes);
    assert_eq!(restored.plans.len(), 4);
    assert_eq!(restored.settings.week_start_date, day(6));
    assert!(restored.shopping_checked.is_checked(&first_id));

    let raw = tokio::fs::read_to_string(&path).await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(json.get("exportDate").is_some());
    assert!(json.get("shoppingChecked").is_some());
}

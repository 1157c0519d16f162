use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::lexicon::{canonical_unit, format_quantity, leading_number, unit_for_total};
use crate::models::{IngredientCategory, ScheduledRecipe, ShoppingItem};

/// How shopping item ids are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemIdStrategy {
    /// A fresh id per generation, taken from the first contributing
    /// ingredient. Checked state only lines up within one generation.
    #[default]
    Ephemeral,
    /// `category:item-key`, stable across generations while the item keeps
    /// its name and first-seen category.
    StableKey,
}

/// Shopping list bucketed by aisle. Every category is present, in aisle
/// order, even when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ShoppingList {
    buckets: BTreeMap<IngredientCategory, Vec<ShoppingItem>>,
}

impl ShoppingList {
    fn empty() -> Self {
        Self {
            buckets: IngredientCategory::ALL
                .into_iter()
                .map(|category| (category, Vec::new()))
                .collect(),
        }
    }

    pub fn items(&self, category: IngredientCategory) -> &[ShoppingItem] {
        self.buckets.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Non-empty buckets in aisle order.
    pub fn categories(&self) -> impl Iterator<Item = (IngredientCategory, &[ShoppingItem])> {
        self.buckets
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(category, items)| (*category, items.as_slice()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShoppingItem> {
        self.buckets.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Entry {
    id: String,
    qty: String,
    unit: String,
}

struct Group {
    item: String,
    category: IngredientCategory,
    entries: Vec<Entry>,
    recipe_ids: HashSet<String>,
    recipe_names: Vec<String>,
}

/// Merge the quantities of one group into a `(qty, unit)` display pair.
fn merge_quantities(entries: &[Entry]) -> (String, String) {
    if let [only] = entries {
        return (only.qty.clone(), only.unit.clone());
    }

    let units: Vec<&str> = entries
        .iter()
        .map(|e| e.unit.as_str())
        .filter(|u| !u.trim().is_empty())
        .collect();
    let distinct: HashSet<String> = units.iter().map(|u| canonical_unit(u)).collect();

    if distinct.len() == 1 {
        let unit = units[0];
        let sum: f64 = entries
            .iter()
            .map(|e| leading_number(&e.qty).unwrap_or(0.0))
            .sum();
        if sum > 0.0 {
            return (format_quantity(sum), unit_for_total(unit, sum));
        }
        let joined = entries
            .iter()
            .map(|e| e.qty.as_str())
            .filter(|q| !q.is_empty())
            .collect::<Vec<_>>()
            .join(" + ");
        return (joined, unit.to_string());
    }

    let listed = entries
        .iter()
        .map(|e| format!("{} {}", e.qty, e.unit).trim().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    (listed, String::new())
}

/// Case- and accent-insensitive sort key, so "Éclair" files under "e".
fn collation_key(item: &str) -> String {
    item.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Merge every ingredient of every scheduled recipe into one list.
///
/// Ingredients group by lowercased, trimmed item name. Quantities are summed
/// only when all non-empty units are the same unit; otherwise each original
/// "qty unit" pair is listed. A group keeps the category of its first
/// ingredient.
pub fn aggregate(scheduled: &[ScheduledRecipe<'_>], strategy: ItemIdStrategy) -> ShoppingList {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Group> = HashMap::new();

    for occurrence in scheduled {
        let recipe = occurrence.recipe;
        for ingredient in &recipe.ingredients {
            let key = ingredient.item.trim().to_lowercase();
            let group = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                Group {
                    item: ingredient.item.clone(),
                    category: ingredient.category,
                    entries: Vec::new(),
                    recipe_ids: HashSet::new(),
                    recipe_names: Vec::new(),
                }
            });

            group.entries.push(Entry {
                id: uuid::Uuid::new_v4().to_string(),
                qty: ingredient.qty.clone(),
                unit: ingredient.unit.clone(),
            });
            if group.recipe_ids.insert(recipe.id.clone()) {
                group.recipe_names.push(recipe.name.clone());
            }
        }
    }

    let mut list = ShoppingList::empty();
    for key in order {
        let Some(group) = groups.remove(&key) else {
            continue;
        };
        let (qty, unit) = merge_quantities(&group.entries);
        let id = match strategy {
            ItemIdStrategy::Ephemeral => group.entries[0].id.clone(),
            ItemIdStrategy::StableKey => format!("{}:{}", group.category, key),
        };
        list.buckets.entry(group.category).or_default().push(ShoppingItem {
            id,
            qty,
            unit,
            item: group.item,
            category: group.category,
            recipe_names: group.recipe_names,
        });
    }

    for items in list.buckets.values_mut() {
        items.sort_by_cached_key(|i| (collation_key(&i.item), i.item.clone()));
    }

    tracing::debug!(items = list.len(), occurrences = scheduled.len(), "shopping list built");
    list
}

/// Set of checked shopping item ids. Serialises as a plain JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckedState {
    ids: BTreeSet<String>,
}

impl CheckedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip an item; returns whether it is now checked.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        }
    }

    pub fn is_checked(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Forget ids that no longer appear in `list`.
    pub fn retain_present(&mut self, list: &ShoppingList) {
        let present: HashSet<&str> = list.iter().map(|item| item.id.as_str()).collect();
        self.ids.retain(|id| present.contains(id.as_str()));
    }
}

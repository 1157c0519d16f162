use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use thiserror::Error;

use crate::lexicon::{format_quantity, leading_number, unit_for_total};
use crate::models::{CookPhase, CookStep, Recipe};

const OVEN_TEMP_RANGE: std::ops::RangeInclusive<u32> = 200..=600;

static FAHRENHEIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*°?\s*f").expect("valid fahrenheit regex"));
static DEGREES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*degrees").expect("valid degrees regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CookGuideError {
    #[error("select at least one recipe to cook")]
    NoSelection,
}

/// A recipe picked for a cooking session, cooked `multiplier` times.
#[derive(Debug, Clone, Copy)]
pub struct CookSelection<'a> {
    recipe: &'a Recipe,
    multiplier: u32,
}

impl<'a> CookSelection<'a> {
    pub fn new(recipe: &'a Recipe, multiplier: u32) -> Self {
        Self {
            recipe,
            multiplier: multiplier.max(1),
        }
    }

    pub fn recipe(&self) -> &'a Recipe {
        self.recipe
    }

    /// Batches to cook, never below 1.
    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// "Lasagna ×2", or just the name for a single batch.
    pub fn label(&self) -> String {
        if self.multiplier > 1 {
            format!("{} ×{}", self.recipe.name, self.multiplier)
        } else {
            self.recipe.name.clone()
        }
    }
}

#[derive(Default)]
struct PrepGroup {
    item: String,
    unit: String,
    total: f64,
    numeric: bool,
    raw_qtys: Vec<String>,
    sources: Vec<String>,
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// First oven temperature in a step that falls in a plausible range.
/// Fahrenheit mentions are tried before bare "degrees".
fn oven_temperature(step: &str) -> Option<u32> {
    FAHRENHEIT
        .captures_iter(step)
        .chain(DEGREES.captures_iter(step))
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .find(|temp| {
            let plausible = OVEN_TEMP_RANGE.contains(temp);
            if !plausible {
                tracing::debug!(temp, "ignoring implausible oven temperature");
            }
            plausible
        })
}

fn prep_steps(selections: &[CookSelection<'_>]) -> Vec<(String, Vec<String>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, PrepGroup> = HashMap::new();

    for selection in selections {
        let label = selection.label();
        for ingredient in &selection.recipe.ingredients {
            let key = ingredient.item.trim().to_lowercase();
            let group = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                PrepGroup {
                    item: ingredient.item.clone(),
                    numeric: true,
                    ..Default::default()
                }
            });

            match leading_number(&ingredient.qty) {
                Some(value) => group.total += value * f64::from(selection.multiplier),
                None => group.numeric = false,
            }
            if !ingredient.qty.trim().is_empty() {
                group.raw_qtys.push(ingredient.qty.trim().to_string());
            }
            if group.unit.is_empty() && !ingredient.unit.trim().is_empty() {
                group.unit = ingredient.unit.trim().to_string();
            }
            push_unique(&mut group.sources, label.clone());
        }
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .map(|group| {
            let qty_text = if group.numeric && group.total > 0.0 {
                let unit = unit_for_total(&group.unit, group.total);
                format!("{} {}", format_quantity(group.total), unit)
                    .trim()
                    .to_string()
            } else if group.numeric {
                String::new()
            } else {
                group.raw_qtys.join(" + ")
            };
            let text = if qty_text.is_empty() {
                format!("Prepare {} (for {})", group.item, group.sources.join(", "))
            } else {
                format!(
                    "Prepare {} {} (for {})",
                    qty_text,
                    group.item,
                    group.sources.join(", ")
                )
            };
            (text, group.sources)
        })
        .collect()
}

fn oven_steps(selections: &[CookSelection<'_>]) -> Vec<(String, Vec<String>)> {
    let mut temps: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for selection in selections {
        for step in &selection.recipe.steps {
            if let Some(temp) = oven_temperature(step) {
                push_unique(temps.entry(temp).or_default(), selection.label());
            }
        }
    }
    temps
        .into_iter()
        .map(|(temp, sources)| {
            (
                format!("Preheat oven to {}°F (needed for {})", temp, sources.join(", ")),
                sources,
            )
        })
        .collect()
}

/// Build one batch-cooking sequence for several recipes: all prep first,
/// then one preheat per distinct oven temperature, then every recipe's own
/// steps in order.
pub fn synthesize(selections: &[CookSelection<'_>]) -> Result<Vec<CookStep>, CookGuideError> {
    if selections.is_empty() {
        return Err(CookGuideError::NoSelection);
    }

    let cooking = selections.iter().flat_map(|selection| {
        let label = selection.label();
        let batches = if selection.multiplier > 1 {
            format!(" [×{} batches]", selection.multiplier)
        } else {
            String::new()
        };
        selection
            .recipe
            .steps
            .iter()
            .map(move |step| (format!("{}{}", step, batches), vec![label.clone()]))
    });

    let phases = prep_steps(selections)
        .into_iter()
        .map(|(text, recipes)| (CookPhase::Prep, text, recipes))
        .chain(
            oven_steps(selections)
                .into_iter()
                .map(|(text, recipes)| (CookPhase::Oven, text, recipes)),
        )
        .chain(cooking.map(|(text, recipes)| (CookPhase::Cooking, text, recipes)));

    let steps: Vec<CookStep> = phases
        .enumerate()
        .map(|(index, (phase, text, recipes))| CookStep {
            number: index + 1,
            text,
            recipes,
            phase,
        })
        .collect();

    tracing::debug!(recipes = selections.len(), steps = steps.len(), "cook guide built");
    Ok(steps)
}

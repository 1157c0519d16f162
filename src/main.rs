use anyhow::{bail, Context, Result};
use meal_planner::cli::{parse_args, Command, ImportArgs, RangeArgs};
use meal_planner::config::AiSettings;
use meal_planner::importer::{load_image, ImportSource, RecipeImporter};
use meal_planner::models::CookPhase;
use meal_planner::planner::{date_range, MealPlan};
use meal_planner::recipe_parser::parse_recipe_text;
use meal_planner::shopping_list::ItemIdStrategy;
use meal_planner::text_cleanup::clean_ocr_text;
use std::path::Path;
use tokio::fs;
use tracing_subscriber::EnvFilter;

async fn load_plan(path: &Path) -> Result<MealPlan> {
    MealPlan::load(path)
        .await
        .with_context(|| format!("Failed to load meal plan from '{}'", path.display()))
}

fn window(plan: &MealPlan, range: &RangeArgs) -> Vec<chrono::NaiveDate> {
    date_range(
        range.start.unwrap_or(plan.settings.week_start_date),
        range.days.unwrap_or(plan.settings.week_length),
    )
}

async fn run_parse(file: &Path, ocr: bool) -> Result<()> {
    let content = fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read recipe file '{}'", file.display()))?;
    let text = if ocr { clean_ocr_text(&content) } else { content };

    let recipe = parse_recipe_text(&text);
    if !recipe.is_complete() {
        eprintln!("Warning: the recipe looks incomplete, check the ingredients and steps.");
    }
    println!("{}", serde_json::to_string_pretty(&recipe)?);
    Ok(())
}

async fn run_import(args: ImportArgs) -> Result<()> {
    let settings = AiSettings::from_env().context("Invalid AI settings")?;
    let importer = RecipeImporter::from_settings(&settings);
    if importer.has_ai() {
        tracing::info!(provider = %settings.provider, model = settings.effective_model(), "AI extraction enabled");
    }

    let source = if let Some(url) = args.url {
        ImportSource::Url(url)
    } else if let Some(path) = &args.text_file {
        let text = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read recipe file '{}'", path.display()))?;
        ImportSource::Text(text)
    } else {
        let mut images = Vec::with_capacity(args.image.len());
        for path in &args.image {
            images.push(load_image(path).await?);
        }
        ImportSource::Images(images)
    };

    let progress_callback = |message: String| {
        eprintln!("{}", message);
    };
    let outcome = importer
        .import(source, progress_callback)
        .await
        .context("Recipe import failed")?;

    if !outcome.is_complete() {
        eprintln!("Warning: the recipe looks incomplete, check the ingredients and steps.");
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if let Some(path) = &args.save {
        let mut plan = if fs::try_exists(path).await.unwrap_or(false) {
            load_plan(path).await?
        } else {
            MealPlan::new()
        };
        let id = plan.add_recipe(outcome.recipe).id.clone();
        plan.save(path)
            .await
            .with_context(|| format!("Failed to save meal plan to '{}'", path.display()))?;
        eprintln!("Saved recipe {} to {}", id, path.display());
    }
    Ok(())
}

async fn run_shopping(range: RangeArgs) -> Result<()> {
    let plan = load_plan(&range.data).await?;
    let dates = window(&plan, &range);
    let list = plan.shopping_list(&dates, ItemIdStrategy::StableKey);

    if list.is_empty() {
        println!("Nothing planned between {} and {}.", dates[0], dates[dates.len() - 1]);
        return Ok(());
    }
    for (category, items) in list.categories() {
        println!("{}", category.heading());
        for item in items {
            let mark = if plan.shopping_checked.is_checked(&item.id) { "x" } else { " " };
            let amount = format!("{} {}", item.qty, item.unit);
            let amount = amount.trim();
            if amount.is_empty() {
                println!("  [{}] {} ({})", mark, item.item, item.recipe_names.join(", "));
            } else {
                println!(
                    "  [{}] {} {} ({})",
                    mark,
                    amount,
                    item.item,
                    item.recipe_names.join(", ")
                );
            }
        }
    }
    Ok(())
}

async fn run_cook(range: RangeArgs) -> Result<()> {
    let plan = load_plan(&range.data).await?;
    let dates = window(&plan, &range);
    let selections = plan.cook_selections(&dates);
    if selections.is_empty() {
        bail!("Nothing planned between {} and {}", dates[0], dates[dates.len() - 1]);
    }

    let steps = meal_planner::cook_guide::synthesize(&selections)?;
    let mut phase = None;
    for step in &steps {
        if phase != Some(step.phase) {
            phase = Some(step.phase);
            println!(
                "\n{}",
                match step.phase {
                    CookPhase::Prep => "Prep",
                    CookPhase::Oven => "Oven",
                    CookPhase::Cooking => "Cooking",
                }
            );
        }
        println!("{:>3}. {}", step.number, step.text);
    }
    Ok(())
}

async fn run_models() -> Result<()> {
    let settings = AiSettings::from_env().context("Invalid AI settings")?;
    let Some(provider) = settings.provider() else {
        bail!("No API key configured; set MEAL_PLANNER_AI_KEY");
    };
    let models = provider
        .list_models()
        .await
        .with_context(|| format!("Failed to list models for {}", settings.provider))?;
    for model in models {
        println!("{}\t{}", model.id, model.name);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli_args = parse_args();
    match cli_args.command {
        Command::Parse { file, ocr } => run_parse(&file, ocr).await,
        Command::Import(args) => run_import(args).await,
        Command::Shopping(range) => run_shopping(range).await,
        Command::Cook(range) => run_cook(range).await,
        Command::Models => run_models().await,
    }
}

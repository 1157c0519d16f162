use chrono::NaiveDate;
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "meal-planner", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a recipe text file locally and print it as JSON
    Parse {
        /// Path to the recipe text file
        #[arg(short, long)]
        file: PathBuf,
        /// Treat the file as raw OCR output and clean it up first
        #[arg(long)]
        ocr: bool,
    },
    /// Import a recipe from a URL, a text file or photos
    Import(ImportArgs),
    /// Print the shopping list for a planning window
    Shopping(RangeArgs),
    /// Print one batch-cooking guide for everything planned in a window
    Cook(RangeArgs),
    /// List the models offered by the configured AI provider
    Models,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["url", "text_file", "image"])))]
pub struct ImportArgs {
    /// Recipe page URL (https:// is added when missing)
    #[arg(long)]
    pub url: Option<String>,
    /// Plain text file holding the recipe
    #[arg(long)]
    pub text_file: Option<PathBuf>,
    /// Photo(s) of a recipe; needs an AI provider
    #[arg(long, num_args = 1..)]
    pub image: Vec<PathBuf>,
    /// Add the imported recipe to this backup file (created if missing)
    #[arg(long)]
    pub save: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RangeArgs {
    /// Backup file holding recipes and plans
    #[arg(short, long)]
    pub data: PathBuf,
    /// First day of the window (YYYY-MM-DD); defaults to the saved week start
    #[arg(long)]
    pub start: Option<NaiveDate>,
    /// Number of days in the window; defaults to the saved week length
    #[arg(long)]
    pub days: Option<u32>,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

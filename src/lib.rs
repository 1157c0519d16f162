pub mod api_connection;
pub mod cli;
pub mod config;
pub mod cook_guide;
pub mod importer;
pub mod ingredient_parser;
pub mod lexicon;
pub mod models;
pub mod planner;
pub mod recipe_parser;
pub mod shopping_list;
pub mod structured;
pub mod text_cleanup;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::recipe::{DietaryPreference, DifficultyFilter, DEFAULT_MAX_COOKING_TIME};

#[derive(Parser, Debug)]
#[command(author, version, about = "Find recipes for the ingredients you have", long_about = None)]
pub struct Cli {
    /// Favorites file (overrides PANTRY_CHEF_FAVORITES)
    #[arg(long, global = true)]
    pub favorites_file: Option<PathBuf>,

    /// CSV file with a `Name` column replacing the built-in ingredient list
    #[arg(long, global = true)]
    pub vocabulary: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate recipes from selected ingredients
    Generate {
        /// Ingredient you have (repeatable)
        #[arg(short, long = "ingredient")]
        ingredients: Vec<String>,

        /// Dietary preference (repeatable)
        #[arg(short, long = "diet", value_enum)]
        diet: Vec<DietaryPreference>,

        #[arg(long, value_enum, default_value_t = DifficultyFilter::Any)]
        difficulty: DifficultyFilter,

        /// Maximum cooking time in minutes
        #[arg(long, default_value_t = DEFAULT_MAX_COOKING_TIME, value_parser = clap::value_parser!(u32).range(15..=120))]
        max_time: u32,

        /// Photo to scan for extra ingredients before generating
        #[arg(long)]
        scan: Option<PathBuf>,

        /// Toggle the favorite flag of the result at this 1-based position (repeatable)
        #[arg(long = "favorite")]
        favorite: Vec<usize>,

        /// Print ingredients, instructions and nutrition for every result
        #[arg(long)]
        details: bool,
    },
    /// Identify ingredients in a photo and merge them into a selection
    Scan {
        /// JPEG image to identify
        image: PathBuf,

        /// Ingredients already selected (repeatable)
        #[arg(short, long = "ingredient")]
        ingredients: Vec<String>,
    },
    /// Manage saved recipes
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// List the known ingredient names
    Ingredients,
}

#[derive(Subcommand, Debug)]
pub enum FavoritesAction {
    /// List saved recipes
    List,
    /// Print one saved recipe in full
    Show { id: String },
    /// Remove a saved recipe
    Remove { id: String },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

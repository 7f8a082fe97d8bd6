use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use pantry_chef::api_connection::endpoints::Provider;
use pantry_chef::app_state::{generate_recipes, scan_ingredients, AppState, SearchPhase};
use pantry_chef::capture::ImageFileCamera;
use pantry_chef::cli::{parse_args, Command, FavoritesAction};
use pantry_chef::config::Config;
use pantry_chef::favorites::FavoritesStore;
use pantry_chef::ingredients::{load_ingredient_vocabulary, IngredientVocabulary};
use pantry_chef::match_scorer::rounded_percentage;
use pantry_chef::recipe::{DietaryPreference, DifficultyFilter, Recipe};
use pantry_chef::recipe_generator::GeminiRecipeService;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_vocabulary(config: &Config) -> Result<IngredientVocabulary> {
    match &config.vocabulary_path {
        Some(path) => load_ingredient_vocabulary(path)
            .with_context(|| format!("Failed to load ingredient vocabulary from {:?}", path)),
        None => Ok(IngredientVocabulary::default()),
    }
}

fn build_service(config: &Config) -> GeminiRecipeService {
    let provider = Provider::gemini(&config.api_key_env_var, &config.model);
    GeminiRecipeService::new(provider).with_recipe_count(config.recipe_count)
}

fn print_recipe_summary(position: usize, recipe: &Recipe, is_favorite: bool) {
    let heart = if is_favorite { "♥" } else { " " };
    let match_label = recipe
        .match_percentage
        .map(|pct| format!("{:>3}% match", rounded_percentage(pct)))
        .unwrap_or_default();
    println!(
        "{:>2}. {} {} [{}] {} | {} min | {} | serves {}",
        position, heart, recipe.name, recipe.id, match_label, recipe.cooking_time, recipe.difficulty, recipe.servings
    );
    println!("      {}", recipe.description);
}

fn print_recipe_details(recipe: &Recipe) {
    println!("{} [{}]", recipe.name, recipe.id);
    println!("{}", recipe.description);
    println!(
        "\n{} min | {} | serves {}",
        recipe.cooking_time, recipe.difficulty, recipe.servings
    );
    print_recipe_body(recipe);
}

fn print_recipe_body(recipe: &Recipe) {
    let n = &recipe.nutritional_info;
    println!(
        "Per serving: {} | protein {} | carbs {} | fat {}",
        n.calories, n.protein, n.carbs, n.fat
    );
    println!("\nIngredients:");
    for ingredient in &recipe.ingredients {
        println!("  - {}", ingredient);
    }
    println!("\nInstructions:");
    for (step, instruction) in recipe.instructions.iter().enumerate() {
        println!("  {}. {}", step + 1, instruction);
    }
}

fn select_all(state: &mut AppState, ingredients: &[String]) -> Result<()> {
    for ingredient in ingredients {
        state
            .select_ingredient(ingredient)
            .with_context(|| "Run `pantry-chef ingredients` to see the known names")?;
    }
    Ok(())
}

/// Runs the capture flow against an image file. Failures are reported and the
/// surface closed; the caller decides whether that is fatal.
async fn run_scan(state: &mut AppState, image: PathBuf, service: &GeminiRecipeService) -> bool {
    let camera = ImageFileCamera::new(image);
    match scan_ingredients(state, &camera, service).await {
        Ok(identified) => {
            println!("Identified: {}", if identified.is_empty() { "(nothing)".to_string() } else { identified.join(", ") });
            true
        }
        Err(e) => {
            let message = state.capture.error().map(str::to_string).unwrap_or_else(|| e.to_string());
            eprintln!("{}", message);
            state.capture.close();
            false
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_generate(
    config: &Config,
    vocabulary: IngredientVocabulary,
    favorites: &mut FavoritesStore,
    ingredients: Vec<String>,
    diet: Vec<DietaryPreference>,
    difficulty: DifficultyFilter,
    max_time: u32,
    scan: Option<PathBuf>,
    favorite_positions: Vec<usize>,
    details: bool,
) -> Result<ExitCode> {
    let service = build_service(config);
    let mut state = AppState::new(vocabulary);
    select_all(&mut state, &ingredients)?;
    for preference in diet {
        if !state.filters.dietary_preferences.contains(&preference) {
            state.toggle_dietary(preference);
        }
    }
    state.filters.difficulty = difficulty;
    state.filters.max_cooking_time = max_time;

    if let Some(image) = scan {
        run_scan(&mut state, image, &service).await;
    }

    if generate_recipes(&mut state, &service).await.is_err() {
        eprintln!("{}", state.message().unwrap_or_default());
        return Ok(ExitCode::FAILURE);
    }

    match state.phase() {
        SearchPhase::Failed => {
            eprintln!("{}", state.message().unwrap_or_default());
            return Ok(ExitCode::FAILURE);
        }
        _ if state.recipes().is_empty() => {
            println!("{}", state.message().unwrap_or_default());
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    println!("Recipes for: {}\n", state.selection().join(", "));
    for position in favorite_positions {
        match state.recipes().get(position.wrapping_sub(1)) {
            Some(recipe) => {
                let saved = favorites
                    .toggle(recipe)
                    .with_context(|| format!("Failed to update favorite '{}'", recipe.id))?;
                println!("{} '{}'", if saved { "Saved" } else { "Removed" }, recipe.name);
            }
            None => warn!(position, "No result at this position, skipping favorite"),
        }
    }
    for (index, recipe) in state.recipes().iter().enumerate() {
        print_recipe_summary(index + 1, recipe, favorites.is_favorite(&recipe.id));
        if details {
            // Results are gone once the process exits, so print everything inline.
            print_recipe_body(recipe);
            println!();
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_favorites(favorites: &mut FavoritesStore, action: FavoritesAction) -> Result<ExitCode> {
    match action {
        FavoritesAction::List => {
            if favorites.is_empty() {
                println!("No favorite recipes yet. Save one with `generate --favorite <N>`.");
            }
            for (index, recipe) in favorites.recipes().iter().enumerate() {
                print_recipe_summary(index + 1, recipe, true);
            }
        }
        FavoritesAction::Show { id } => match favorites.get(&id) {
            Some(recipe) => print_recipe_details(recipe),
            None => {
                eprintln!("No favorite with id '{}'", id);
                return Ok(ExitCode::FAILURE);
            }
        },
        FavoritesAction::Remove { id } => match favorites.remove(&id)? {
            Some(recipe) => println!("Removed '{}'", recipe.name),
            None => {
                eprintln!("No favorite with id '{}'", id);
                return Ok(ExitCode::FAILURE);
            }
        },
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = parse_args();
    let config = Config::load().with_overrides(cli.favorites_file, cli.vocabulary);
    let vocabulary = load_vocabulary(&config)?;
    let mut favorites = FavoritesStore::load(&config.favorites_path);

    match cli.command {
        Command::Generate {
            ingredients,
            diet,
            difficulty,
            max_time,
            scan,
            favorite,
            details,
        } => {
            run_generate(
                &config,
                vocabulary,
                &mut favorites,
                ingredients,
                diet,
                difficulty,
                max_time,
                scan,
                favorite,
                details,
            )
            .await
        }
        Command::Scan { image, ingredients } => {
            let service = build_service(&config);
            let mut state = AppState::new(vocabulary);
            select_all(&mut state, &ingredients)?;
            if !run_scan(&mut state, image, &service).await {
                return Ok(ExitCode::FAILURE);
            }
            println!("Selection: {}", state.selection().join(", "));
            Ok(ExitCode::SUCCESS)
        }
        Command::Favorites { action } => run_favorites(&mut favorites, action),
        Command::Ingredients => {
            for name in vocabulary.names() {
                println!("{}", name);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

use thiserror::Error;
use tracing::{error, info, warn};

use crate::api_connection::connection::ApiConnectionError;
use crate::capture::{Camera, CaptureError, CaptureSurface};
use crate::ingredient_identifier::IngredientIdentifier;
use crate::ingredients::{normalize_ingredient, IngredientVocabulary};
use crate::match_scorer::{score_recipes, sort_by_match};
use crate::recipe::{DietaryPreference, DifficultyFilter, Recipe, DEFAULT_MAX_COOKING_TIME};
use crate::recipe_generator::{RecipeProvider, RecipeQuery};

pub const NO_INGREDIENTS_MESSAGE: &str = "Please select at least one ingredient.";
pub const NO_RESULTS_MESSAGE: &str = "No recipes found for your criteria. Try adjusting your filters!";
pub const GENERATION_FAILED_MESSAGE: &str =
    "An error occurred while generating recipes. Please try again later.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select at least one ingredient.")]
    NoIngredients,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("'{0}' is not a known ingredient")]
    UnknownIngredient(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Idle,
    Loading,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveTab {
    #[default]
    Search,
    Favorites,
}

/// Filters applied to the next generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilters {
    pub dietary_preferences: Vec<DietaryPreference>,
    pub difficulty: DifficultyFilter,
    pub max_cooking_time: u32,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            dietary_preferences: Vec::new(),
            difficulty: DifficultyFilter::Any,
            max_cooking_time: DEFAULT_MAX_COOKING_TIME,
        }
    }
}

/// Session state. All mutation goes through the action methods below.
#[derive(Debug)]
pub struct AppState {
    vocabulary: IngredientVocabulary,
    selection: Vec<String>,
    pub filters: SearchFilters,
    phase: SearchPhase,
    recipes: Vec<Recipe>,
    message: Option<String>,
    has_searched: bool,
    pub active_tab: ActiveTab,
    pub capture: CaptureSurface,
}

impl AppState {
    pub fn new(vocabulary: IngredientVocabulary) -> Self {
        Self {
            vocabulary,
            selection: Vec::new(),
            filters: SearchFilters::default(),
            phase: SearchPhase::Idle,
            recipes: Vec::new(),
            message: None,
            has_searched: false,
            active_tab: ActiveTab::Search,
            capture: CaptureSurface::new(),
        }
    }

    pub fn vocabulary(&self) -> &IngredientVocabulary {
        &self.vocabulary
    }

    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    /// Current results, best match first.
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Inline validation, empty-result or failure message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn has_searched(&self) -> bool {
        self.has_searched
    }

    /// Adds the ingredient if absent, removes it otherwise. Returns whether it
    /// is selected afterwards.
    pub fn toggle_ingredient(&mut self, name: &str) -> Result<bool, SelectionError> {
        let name = normalize_ingredient(name);
        if !self.vocabulary.contains(&name) {
            return Err(SelectionError::UnknownIngredient(name));
        }
        if let Some(index) = self.selection.iter().position(|s| *s == name) {
            self.selection.remove(index);
            Ok(false)
        } else {
            self.selection.push(name);
            Ok(true)
        }
    }

    /// Selects the ingredient, leaving the selection unchanged if it already is.
    pub fn select_ingredient(&mut self, name: &str) -> Result<(), SelectionError> {
        let normalized = normalize_ingredient(name);
        if self.selection.contains(&normalized) {
            return Ok(());
        }
        self.toggle_ingredient(&normalized).map(|_| ())
    }

    pub fn toggle_dietary(&mut self, preference: DietaryPreference) {
        let prefs = &mut self.filters.dietary_preferences;
        if let Some(index) = prefs.iter().position(|p| *p == preference) {
            prefs.remove(index);
        } else {
            prefs.push(preference);
        }
    }

    /// Unions identified names into the selection. Names are lowercased and
    /// anything outside the vocabulary is dropped.
    pub fn merge_identified<S: AsRef<str>>(&mut self, identified: &[S]) {
        // Existing selection first, so identified names only ever append.
        let mut merged: Vec<String> = Vec::with_capacity(self.selection.len() + identified.len());
        let candidates = self
            .selection
            .iter()
            .map(|s| normalize_ingredient(s))
            .chain(identified.iter().map(|s| normalize_ingredient(s.as_ref())));
        for name in candidates {
            if merged.contains(&name) {
                continue;
            }
            if self.vocabulary.contains(&name) {
                merged.push(name);
            } else {
                info!(ingredient = %name, "Dropping identified ingredient outside vocabulary");
            }
        }
        self.selection = merged;
    }

    /// Starts a generation request, or rejects it when nothing is selected.
    pub fn begin_generation(&mut self) -> Result<RecipeQuery, ValidationError> {
        if self.selection.is_empty() {
            self.message = Some(NO_INGREDIENTS_MESSAGE.to_string());
            return Err(ValidationError::NoIngredients);
        }
        self.phase = SearchPhase::Loading;
        self.message = None;
        self.has_searched = true;
        self.active_tab = ActiveTab::Search;
        Ok(RecipeQuery {
            ingredients: self.selection.clone(),
            dietary_preferences: self.filters.dietary_preferences.clone(),
            difficulty: self.filters.difficulty,
            max_cooking_time: self.filters.max_cooking_time,
        })
    }

    /// Applies a provider outcome for `query`. Results replace whatever was
    /// there before, so the last completion wins.
    pub fn complete_generation(
        &mut self,
        query: &RecipeQuery,
        outcome: Result<Vec<Recipe>, ApiConnectionError>,
    ) {
        match outcome {
            Ok(mut recipes) => {
                score_recipes(&mut recipes, query.ingredients.as_slice());
                sort_by_match(&mut recipes);
                self.message = if recipes.is_empty() {
                    Some(NO_RESULTS_MESSAGE.to_string())
                } else {
                    None
                };
                self.recipes = recipes;
                self.phase = SearchPhase::Success;
            }
            Err(e) => {
                error!(error = %e, "Error generating recipes");
                self.recipes.clear();
                self.message = Some(GENERATION_FAILED_MESSAGE.to_string());
                self.phase = SearchPhase::Failed;
            }
        }
    }
}

/// Runs one generation request end to end.
pub async fn generate_recipes(
    state: &mut AppState,
    provider: &dyn RecipeProvider,
) -> Result<(), ValidationError> {
    let query = state.begin_generation()?;
    info!(ingredients = ?query.ingredients, "Requesting recipes");
    let outcome = provider.generate_recipes(&query).await;
    state.complete_generation(&query, outcome);
    Ok(())
}

/// Opens the capture surface, identifies ingredients in one frame and merges
/// them into the selection. Returns the raw identified names on success.
///
/// On any failure the surface is left open with its inline message, as a user
/// would see it; callers that give up should `close()` it.
pub async fn scan_ingredients(
    state: &mut AppState,
    camera: &dyn Camera,
    identifier: &dyn IngredientIdentifier,
) -> Result<Vec<String>, CaptureError> {
    state.capture.open(camera);
    let encoded = state.capture.begin_identify()?;
    let outcome = identifier.identify_ingredients(&encoded).await;
    match state.capture.finish_identify(outcome) {
        Some(names) => {
            state.merge_identified(names.as_slice());
            Ok(names)
        }
        None => {
            warn!("Identification failed, capture surface left open");
            Err(CaptureError::IdentificationFailed)
        }
    }
}

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::recipe::Recipe;

pub const DEFAULT_FAVORITES_FILE: &str = "favorite_recipes.json";

/// Saved recipe snapshots, unique by id, kept in insertion order and mirrored
/// to a JSON file after every mutation.
#[derive(Debug)]
pub struct FavoritesStore {
    path: PathBuf,
    recipes: Vec<Recipe>,
}

impl FavoritesStore {
    /// Loads favorites from `path`. Never fails: a missing, unreadable or
    /// corrupt file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let recipes = match read_favorites(&path) {
            Ok(Some(recipes)) => {
                info!(count = recipes.len(), path = %path.display(), "Loaded favorites");
                recipes
            }
            Ok(None) => {
                debug!(path = %path.display(), "No favorites file yet");
                Vec::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{:#}", e), "Failed to load favorites, starting empty");
                Vec::new()
            }
        };
        Self { path, recipes }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.recipes.iter().any(|r| r.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == id)
    }

    /// Removes the recipe if a favorite with its id exists, otherwise stores a
    /// snapshot of it. Returns whether the recipe is a favorite afterwards.
    ///
    /// The file is rewritten before returning. On a failed write the in-memory
    /// collection is restored and the error is returned.
    pub fn toggle(&mut self, recipe: &Recipe) -> Result<bool> {
        // Snapshot so a failed write leaves memory matching the file on disk.
        let previous = self.recipes.clone();
        let now_favorite = match self.recipes.iter().position(|r| r.id == recipe.id) {
            Some(index) => {
                self.recipes.remove(index);
                false
            }
            None => {
                self.recipes.push(recipe.clone());
                true
            }
        };

        if let Err(e) = self.persist() {
            self.recipes = previous;
            return Err(e);
        }
        debug!(id = %recipe.id, favorite = now_favorite, "Toggled favorite");
        Ok(now_favorite)
    }

    /// Removes the favorite with `id`, if any.
    pub fn remove(&mut self, id: &str) -> Result<Option<Recipe>> {
        let Some(index) = self.recipes.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        let removed = self.recipes.remove(index);
        if let Err(e) = self.persist() {
            // Put it back where it was so list order survives the failure.
            self.recipes.insert(index, removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    fn persist(&self) -> Result<()> {
        // A bare file name has an empty parent; nothing to create then.
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create favorites directory {:?}", parent))?;
        }
        let serialized = serde_json::to_string_pretty(&self.recipes)
            .context("Failed to serialize favorites")?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write favorites file {:?}", self.path))?;
        Ok(())
    }
}

fn read_favorites(path: &Path) -> Result<Option<Vec<Recipe>>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read favorites file {:?}", path))?;
    let recipes = serde_json::from_str(&raw)
        .with_context(|| format!("Favorites file {:?} is not a recipe array", path))?;
    Ok(Some(recipes))
}

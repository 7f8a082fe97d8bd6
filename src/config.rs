use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

use crate::api_connection::endpoints::DEFAULT_GEMINI_MODEL;
use crate::favorites::DEFAULT_FAVORITES_FILE;
use crate::recipe_generator::DEFAULT_RECIPE_COUNT;

/// Name of the environment variable holding the Gemini API key. The key
/// itself is only read when a request is sent.
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

const MODEL_ENV_VAR: &str = "PANTRY_CHEF_MODEL";
const FAVORITES_ENV_VAR: &str = "PANTRY_CHEF_FAVORITES";
const VOCABULARY_ENV_VAR: &str = "PANTRY_CHEF_VOCABULARY";
const RECIPE_COUNT_ENV_VAR: &str = "PANTRY_CHEF_RECIPE_COUNT";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key_env_var: String,
    pub model: String,
    pub favorites_path: PathBuf,
    pub vocabulary_path: Option<PathBuf>,
    pub recipe_count: usize,
}

impl Config {
    /// Reads configuration from the environment (after `.env` is loaded).
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self {
            api_key_env_var: API_KEY_ENV_VAR.to_string(),
            model: try_load(MODEL_ENV_VAR, DEFAULT_GEMINI_MODEL.to_string()),
            favorites_path: PathBuf::from(try_load(FAVORITES_ENV_VAR, DEFAULT_FAVORITES_FILE.to_string())),
            vocabulary_path: var(VOCABULARY_ENV_VAR).map(PathBuf::from),
            recipe_count: try_load(RECIPE_COUNT_ENV_VAR, DEFAULT_RECIPE_COUNT),
        }
    }

    /// Applies command-line overrides on top of the environment.
    pub fn with_overrides(mut self, favorites_path: Option<PathBuf>, vocabulary_path: Option<PathBuf>) -> Self {
        if let Some(path) = favorites_path {
            self.favorites_path = path;
        }
        if vocabulary_path.is_some() {
            self.vocabulary_path = vocabulary_path;
        }
        self
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = var(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };
    raw.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value '{raw}': {e}, using default: {default}");
        default
    })
}

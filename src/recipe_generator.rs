use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

use crate::api_connection::connection::{strip_code_fences, ApiConnectionError};
use crate::api_connection::endpoints::{GenerateContentRequest, Part, Provider, ResponseSchema};
use crate::recipe::{DietaryPreference, DifficultyFilter, Recipe};

pub const DEFAULT_RECIPE_COUNT: usize = 3;

/// Everything the provider needs to generate recipes for one search.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeQuery {
    pub ingredients: Vec<String>,
    pub dietary_preferences: Vec<DietaryPreference>,
    pub difficulty: DifficultyFilter,
    pub max_cooking_time: u32,
}

/// Source of candidate recipes.
#[async_trait]
pub trait RecipeProvider: Send + Sync {
    async fn generate_recipes(&self, query: &RecipeQuery) -> Result<Vec<Recipe>, ApiConnectionError>;
}

/// Gemini-backed implementation of both provider traits.
#[derive(Debug, Clone)]
pub struct GeminiRecipeService {
    pub(crate) provider: Provider,
    recipe_count: usize,
}

impl GeminiRecipeService {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            recipe_count: DEFAULT_RECIPE_COUNT,
        }
    }

    pub fn with_recipe_count(mut self, recipe_count: usize) -> Self {
        self.recipe_count = recipe_count.max(1);
        self
    }
}

pub fn build_recipe_prompt(query: &RecipeQuery, recipe_count: usize) -> String {
    let mut prompt = format!(
        "Generate {} unique and creative recipes based on the following criteria.\n\n\
         Available ingredients: {}. You can include a few common pantry staples not on this list (like salt, pepper, water).\n\n",
        recipe_count,
        query.ingredients.join(", ")
    );

    if !query.dietary_preferences.is_empty() {
        let prefs: Vec<String> = query.dietary_preferences.iter().map(|p| p.to_string()).collect();
        prompt.push_str(&format!("Dietary requirements: {}.\n", prefs.join(", ")));
    }
    if let Some(difficulty) = query.difficulty.constraint() {
        prompt.push_str(&format!("Difficulty level: {}.\n", difficulty));
    }
    prompt.push_str(&format!("Maximum cooking time: {} minutes.\n", query.max_cooking_time));
    prompt.push_str(
        "For each recipe, provide a detailed breakdown. The difficulty must be one of 'Easy', 'Medium', or 'Hard'. \
         The response must be a JSON array of recipe objects.",
    );
    prompt
}

fn string_array(description: &str) -> ResponseSchema {
    ResponseSchema {
        items: Some(Box::new(ResponseSchema::of_type("STRING"))),
        ..ResponseSchema::of_type("ARRAY").described(description)
    }
}

pub fn recipe_response_schema() -> ResponseSchema {
    let mut nutrition = BTreeMap::new();
    nutrition.insert("calories".to_string(), ResponseSchema::of_type("STRING").described("e.g., '350 kcal'"));
    nutrition.insert("protein".to_string(), ResponseSchema::of_type("STRING").described("e.g., '15g'"));
    nutrition.insert("carbs".to_string(), ResponseSchema::of_type("STRING").described("e.g., '30g'"));
    nutrition.insert("fat".to_string(), ResponseSchema::of_type("STRING").described("e.g., '20g'"));

    let mut properties = BTreeMap::new();
    properties.insert(
        "id".to_string(),
        ResponseSchema::of_type("STRING").described("A unique identifier for the recipe, e.g., a UUID."),
    );
    properties.insert("name".to_string(), ResponseSchema::of_type("STRING").described("The name of the recipe."));
    properties.insert(
        "description".to_string(),
        ResponseSchema::of_type("STRING").described("A brief, appealing description of the dish."),
    );
    properties.insert(
        "ingredients".to_string(),
        string_array("A list of all ingredients required for the recipe."),
    );
    properties.insert("instructions".to_string(), string_array("Step-by-step cooking instructions."));
    properties.insert(
        "cookingTime".to_string(),
        ResponseSchema::of_type("INTEGER").described("Total cooking time in minutes."),
    );
    properties.insert(
        "difficulty".to_string(),
        ResponseSchema {
            r#enum: Some(vec!["Easy".to_string(), "Medium".to_string(), "Hard".to_string()]),
            ..ResponseSchema::of_type("STRING").described("Difficulty level, one of: 'Easy', 'Medium', 'Hard'.")
        },
    );
    properties.insert(
        "servings".to_string(),
        ResponseSchema::of_type("INTEGER").described("The number of servings the recipe yields."),
    );
    properties.insert(
        "nutritionalInfo".to_string(),
        ResponseSchema {
            properties: Some(nutrition),
            required: Some(vec![
                "calories".to_string(),
                "protein".to_string(),
                "carbs".to_string(),
                "fat".to_string(),
            ]),
            ..ResponseSchema::of_type("OBJECT").described("Approximate nutritional information per serving.")
        },
    );

    let recipe = ResponseSchema {
        properties: Some(properties),
        required: Some(
            [
                "id",
                "name",
                "description",
                "ingredients",
                "instructions",
                "cookingTime",
                "difficulty",
                "servings",
                "nutritionalInfo",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        ),
        ..ResponseSchema::of_type("OBJECT")
    };

    ResponseSchema {
        items: Some(Box::new(recipe)),
        ..ResponseSchema::of_type("ARRAY")
    }
}

/// Parses and validates the provider's text output. Any provider-supplied
/// match percentage is dropped.
pub fn parse_recipes_response(content: &str) -> Result<Vec<Recipe>, ApiConnectionError> {
    let json = strip_code_fences(content);
    if json.is_empty() {
        return Err(ApiConnectionError::EmptyResponse);
    }

    let mut recipes: Vec<Recipe> = serde_json::from_str(json).map_err(|e| {
        debug!(error = %e, content = %json, "Recipe payload failed to deserialize");
        ApiConnectionError::SchemaViolation(e.to_string())
    })?;

    for recipe in recipes.iter_mut() {
        recipe.validate().map_err(ApiConnectionError::SchemaViolation)?;
        recipe.match_percentage = None;
    }
    Ok(recipes)
}

#[async_trait]
impl RecipeProvider for GeminiRecipeService {
    #[instrument(skip(self, query), fields(ingredients = query.ingredients.len()))]
    async fn generate_recipes(&self, query: &RecipeQuery) -> Result<Vec<Recipe>, ApiConnectionError> {
        let prompt = build_recipe_prompt(query, self.recipe_count);
        let request = GenerateContentRequest::json_request(vec![Part::Text { text: prompt }], recipe_response_schema());

        let content = self.provider.call_generate_content(&request).await?;
        let recipes = parse_recipes_response(&content)?;
        info!(count = recipes.len(), "Provider returned recipes");
        Ok(recipes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> RecipeQuery {
        RecipeQuery {
            ingredients: vec!["egg".to_string(), "rice".to_string()],
            dietary_preferences: vec![],
            difficulty: DifficultyFilter::Any,
            max_cooking_time: 45,
        }
    }

    const VALID_PAYLOAD: &str = r#"[
        {
            "id": "fried-rice",
            "name": "Egg Fried Rice",
            "description": "Quick weeknight rice.",
            "ingredients": ["2 eggs", "3 cups cooked rice"],
            "instructions": ["Scramble eggs.", "Add rice."],
            "cookingTime": 15,
            "difficulty": "Easy",
            "servings": 2,
            "nutritionalInfo": {"calories": "450 kcal", "protein": "14g", "carbs": "60g", "fat": "15g"},
            "matchPercentage": 12
        }
    ]"#;

    #[test]
    fn test_prompt_omits_unconstrained_filters() {
        let prompt = build_recipe_prompt(&query(), 3);
        assert!(prompt.starts_with("Generate 3 unique"));
        assert!(prompt.contains("Available ingredients: egg, rice."));
        assert!(prompt.contains("Maximum cooking time: 45 minutes."));
        assert!(!prompt.contains("Dietary requirements"));
        assert!(!prompt.contains("Difficulty level"));
    }

    #[test]
    fn test_prompt_includes_constraints() {
        let mut q = query();
        q.dietary_preferences = vec![DietaryPreference::Vegan, DietaryPreference::GlutenFree];
        q.difficulty = DifficultyFilter::Hard;
        let prompt = build_recipe_prompt(&q, 5);
        assert!(prompt.contains("Dietary requirements: Vegan, Gluten-Free."));
        assert!(prompt.contains("Difficulty level: Hard."));
        assert!(prompt.starts_with("Generate 5 unique"));
    }

    #[test]
    fn test_schema_requires_every_recipe_field() {
        let schema = serde_json::to_value(recipe_response_schema()).unwrap();
        assert_eq!(schema["type"], "ARRAY");
        let required = schema["items"]["required"].as_array().unwrap();
        assert_eq!(required.len(), 9);
        assert_eq!(schema["items"]["properties"]["ingredients"]["items"]["type"], "STRING");
    }

    #[test]
    fn test_parse_drops_provider_match_percentage() {
        let recipes = parse_recipes_response(VALID_PAYLOAD).unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].id, "fried-rice");
        assert!(recipes[0].match_percentage.is_none());
    }

    #[test]
    fn test_parse_accepts_fenced_output() {
        let fenced = format!("```json\n{}\n```", VALID_PAYLOAD);
        assert_eq!(parse_recipes_response(&fenced).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_rejects_bad_difficulty() {
        let bad = VALID_PAYLOAD.replace("\"Easy\"", "\"Trivial\"");
        assert!(matches!(
            parse_recipes_response(&bad),
            Err(ApiConnectionError::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_parse_rejects_zero_servings() {
        let bad = VALID_PAYLOAD.replace("\"servings\": 2", "\"servings\": 0");
        let err = parse_recipes_response(&bad).unwrap_err();
        assert!(err.to_string().contains("zero servings"));
    }

    #[test]
    fn test_parse_empty_array_is_ok() {
        assert!(parse_recipes_response("[]").unwrap().is_empty());
        assert!(matches!(parse_recipes_response("   "), Err(ApiConnectionError::EmptyResponse)));
    }
}

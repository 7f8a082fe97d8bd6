use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NutritionalInfo {
    pub calories: String,
    pub protein: String,
    pub carbs: String,
    pub fat: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        };
        f.write_str(label)
    }
}

/// Difficulty constraint for a search. `Any` leaves it unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DifficultyFilter {
    #[default]
    Any,
    Easy,
    Medium,
    Hard,
}

impl DifficultyFilter {
    pub fn constraint(self) -> Option<Difficulty> {
        match self {
            DifficultyFilter::Any => None,
            DifficultyFilter::Easy => Some(Difficulty::Easy),
            DifficultyFilter::Medium => Some(Difficulty::Medium),
            DifficultyFilter::Hard => Some(Difficulty::Hard),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum DietaryPreference {
    Vegetarian,
    Vegan,
    #[serde(rename = "Gluten-Free")]
    #[value(name = "gluten-free")]
    GlutenFree,
    #[serde(rename = "Dairy-Free")]
    #[value(name = "dairy-free")]
    DairyFree,
}

impl fmt::Display for DietaryPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DietaryPreference::Vegetarian => "Vegetarian",
            DietaryPreference::Vegan => "Vegan",
            DietaryPreference::GlutenFree => "Gluten-Free",
            DietaryPreference::DairyFree => "Dairy-Free",
        };
        f.write_str(label)
    }
}

pub const DIETARY_PREFERENCES: &[DietaryPreference] = &[
    DietaryPreference::Vegetarian,
    DietaryPreference::Vegan,
    DietaryPreference::GlutenFree,
    DietaryPreference::DairyFree,
];

pub const COOKING_TIMES: &[u32] = &[15, 30, 45, 60, 90, 120];
pub const DEFAULT_MAX_COOKING_TIME: u32 = 60;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    /// Minutes.
    pub cooking_time: u32,
    pub difficulty: Difficulty,
    pub servings: u32,
    pub nutritional_info: NutritionalInfo,
    /// Computed locally from the selection, never taken from the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_percentage: Option<f64>,
}

impl Recipe {
    /// Checks the constraints serde cannot express on its own.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err(format!("recipe '{}' has an empty id", self.name));
        }
        if self.cooking_time == 0 {
            return Err(format!("recipe '{}' has a zero cooking time", self.id));
        }
        if self.servings == 0 {
            return Err(format!("recipe '{}' has zero servings", self.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_json() -> serde_json::Value {
        json!({
            "id": "r-1",
            "name": "Shakshuka",
            "description": "Eggs poached in spiced tomatoes.",
            "ingredients": ["4 eggs", "1 can tomatoes"],
            "instructions": ["Simmer tomatoes.", "Crack eggs in."],
            "cookingTime": 25,
            "difficulty": "Easy",
            "servings": 2,
            "nutritionalInfo": { "calories": "320 kcal", "protein": "18g", "carbs": "20g", "fat": "17g" }
        })
    }

    #[test]
    fn test_recipe_deserializes_camel_case() {
        let recipe: Recipe = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(recipe.cooking_time, 25);
        assert_eq!(recipe.difficulty, Difficulty::Easy);
        assert_eq!(recipe.nutritional_info.protein, "18g");
        assert!(recipe.match_percentage.is_none());
        assert!(recipe.validate().is_ok());

        let back = serde_json::to_value(&recipe).unwrap();
        assert!(back.get("matchPercentage").is_none());
        assert_eq!(back["cookingTime"], 25);
    }

    #[test]
    fn test_unknown_difficulty_is_rejected() {
        let mut value = sample_json();
        value["difficulty"] = json!("Impossible");
        assert!(serde_json::from_value::<Recipe>(value).is_err());
    }

    #[test]
    fn test_negative_cooking_time_is_rejected() {
        let mut value = sample_json();
        value["cookingTime"] = json!(-5);
        assert!(serde_json::from_value::<Recipe>(value).is_err());
    }

    #[test]
    fn test_validate_catches_zero_servings_and_blank_id() {
        let mut recipe: Recipe = serde_json::from_value(sample_json()).unwrap();
        recipe.servings = 0;
        assert!(recipe.validate().unwrap_err().contains("zero servings"));

        recipe.servings = 2;
        recipe.id = "  ".to_string();
        assert!(recipe.validate().unwrap_err().contains("empty id"));
    }

    #[test]
    fn test_dietary_preference_wire_names() {
        assert_eq!(
            serde_json::to_value(DietaryPreference::GlutenFree).unwrap(),
            json!("Gluten-Free")
        );
        assert_eq!(DietaryPreference::DairyFree.to_string(), "Dairy-Free");
        assert_eq!(DifficultyFilter::Any.constraint(), None);
        assert_eq!(DifficultyFilter::Hard.constraint(), Some(Difficulty::Hard));
    }
}

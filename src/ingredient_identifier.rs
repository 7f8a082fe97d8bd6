use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{info, instrument};

use crate::api_connection::connection::{strip_code_fences, ApiConnectionError};
use crate::api_connection::endpoints::{GenerateContentRequest, InlineData, Part, ResponseSchema};
use crate::recipe_generator::GeminiRecipeService;

const IDENTIFY_PROMPT: &str = "Identify the food ingredients in this image. Respond with a JSON object that has a single key 'ingredients' which is an array of strings. List only the names of the ingredients. If there are no food items, return an empty array for the 'ingredients' key.";

/// Recognizes ingredient names in a still image.
#[async_trait]
pub trait IngredientIdentifier: Send + Sync {
    /// `jpeg_base64` is a base64 encoded JPEG frame.
    async fn identify_ingredients(&self, jpeg_base64: &str) -> Result<Vec<String>, ApiConnectionError>;
}

#[derive(Debug, Deserialize)]
struct IdentificationResponse {
    #[serde(default)]
    ingredients: Option<Vec<String>>,
}

pub fn identification_response_schema() -> ResponseSchema {
    let mut properties = BTreeMap::new();
    properties.insert(
        "ingredients".to_string(),
        ResponseSchema {
            items: Some(Box::new(ResponseSchema::of_type("STRING"))),
            ..ResponseSchema::of_type("ARRAY")
        },
    );
    ResponseSchema {
        properties: Some(properties),
        required: Some(vec!["ingredients".to_string()]),
        ..ResponseSchema::of_type("OBJECT")
    }
}

/// Parses the `{ "ingredients": [...] }` payload. A null or absent list is empty.
pub fn parse_identification_response(content: &str) -> Result<Vec<String>, ApiConnectionError> {
    let json = strip_code_fences(content);
    if json.is_empty() {
        return Err(ApiConnectionError::EmptyResponse);
    }
    let parsed: IdentificationResponse =
        serde_json::from_str(json).map_err(|e| ApiConnectionError::SchemaViolation(e.to_string()))?;
    Ok(parsed.ingredients.unwrap_or_default())
}

#[async_trait]
impl IngredientIdentifier for GeminiRecipeService {
    #[instrument(skip(self, jpeg_base64), fields(encoded_len = jpeg_base64.len()))]
    async fn identify_ingredients(&self, jpeg_base64: &str) -> Result<Vec<String>, ApiConnectionError> {
        let parts = vec![
            Part::InlineData {
                inline_data: InlineData {
                    mime_type: "image/jpeg".to_string(),
                    data: jpeg_base64.to_string(),
                },
            },
            Part::Text {
                text: IDENTIFY_PROMPT.to_string(),
            },
        ];
        let request = GenerateContentRequest::json_request(parts, identification_response_schema());

        let content = self.provider.call_generate_content(&request).await?;
        let ingredients = parse_identification_response(&content)?;
        info!(count = ingredients.len(), "Identified ingredients");
        Ok(ingredients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identification_list() {
        let names = parse_identification_response(r#"{"ingredients": ["Egg", "tomatoes"]}"#).unwrap();
        assert_eq!(names, vec!["Egg".to_string(), "tomatoes".to_string()]);
    }

    #[test]
    fn test_missing_or_null_list_is_empty() {
        assert!(parse_identification_response("{}").unwrap().is_empty());
        assert!(parse_identification_response(r#"{"ingredients": null}"#).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_shape_is_schema_violation() {
        assert!(matches!(
            parse_identification_response(r#"{"ingredients": "egg"}"#),
            Err(ApiConnectionError::SchemaViolation(_))
        ));
        assert!(matches!(
            parse_identification_response(r#"["egg"]"#),
            Err(ApiConnectionError::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_schema_shape() {
        let schema = serde_json::to_value(identification_response_schema()).unwrap();
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["required"][0], "ingredients");
    }
}

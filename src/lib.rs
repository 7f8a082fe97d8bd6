pub mod api_connection;
pub mod app_state;
pub mod capture;
pub mod cli;
pub mod config;
pub mod favorites;
pub mod ingredient_identifier;
pub mod ingredients;
pub mod match_scorer;
pub mod recipe;
pub mod recipe_generator;

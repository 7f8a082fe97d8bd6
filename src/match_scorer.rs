use crate::recipe::Recipe;

/// Share of `selected` ingredients found in `recipe_ingredients`, from 0 to 100.
///
/// Matching is case-insensitive and loose: a selected ingredient counts when it
/// is a substring of any recipe ingredient line, so "egg" matches "eggplant".
/// An empty selection scores 0.
pub fn match_percentage<R, S>(recipe_ingredients: &[R], selected: &[S]) -> f64
where
    R: AsRef<str>,
    S: AsRef<str>,
{
    if selected.is_empty() {
        return 0.0;
    }

    let recipe_lower: Vec<String> = recipe_ingredients
        .iter()
        .map(|ing| ing.as_ref().to_lowercase())
        .collect();

    let matched = selected
        .iter()
        .map(|sel| sel.as_ref().to_lowercase())
        .filter(|sel| recipe_lower.iter().any(|ing| ing.contains(sel.as_str())))
        .count();

    // matched <= selected.len(); duplicates in the selection each count.
    let percentage = matched as f64 / selected.len() as f64 * 100.0;
    percentage.min(100.0)
}

/// Overwrites each recipe's match percentage with one computed from `selected`.
pub fn score_recipes<S: AsRef<str>>(recipes: &mut [Recipe], selected: &[S]) {
    for recipe in recipes.iter_mut() {
        recipe.match_percentage = Some(match_percentage(recipe.ingredients.as_slice(), selected));
    }
}

/// Whole-number percentage for display. Halves round up, so 12.5 shows as 13.
pub fn rounded_percentage(percentage: f64) -> u32 {
    percentage.clamp(0.0, 100.0).round() as u32
}

/// Orders recipes by descending match percentage. The sort is stable, so ties
/// keep provider order. Unscored recipes sort as 0.
pub fn sort_by_match(recipes: &mut [Recipe]) {
    recipes.sort_by(|a, b| {
        let a_score = a.match_percentage.unwrap_or(0.0);
        let b_score = b.match_percentage.unwrap_or(0.0);
        b_score.total_cmp(&a_score)
    });
}

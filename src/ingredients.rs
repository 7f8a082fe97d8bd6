use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::path::Path;

const NAME_COL: &str = "Name";

pub const AVAILABLE_INGREDIENTS: &[&str] = &[
    "beans", "beef", "broth", "butter", "cabbage", "cheese", "chickpeas",
    "chili", "corn", "dough", "egg", "eggplant", "fish", "flour", "lamb",
    "lentils", "meat", "olive oil", "peanuts", "pork", "potatoes", "rice",
    "rice noodles", "saffron", "seafood", "seaweed", "spices", "tahini",
    "teff flour", "tofu", "tomatoes", "vegetables", "yeast", "yogurt",
];

/// Canonical form used for selection and vocabulary lookups.
pub fn normalize_ingredient(name: &str) -> String {
    name.trim().to_lowercase()
}

/// The set of ingredient names a user may select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientVocabulary {
    names: Vec<String>,
}

impl Default for IngredientVocabulary {
    fn default() -> Self {
        Self::from_names(AVAILABLE_INGREDIENTS.iter().copied())
    }
}

impl IngredientVocabulary {
    /// Builds a vocabulary, normalizing names and dropping blanks and repeats.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for name in names {
            let name = normalize_ingredient(name.as_ref());
            if !name.is_empty() && !normalized.contains(&name) {
                normalized.push(name);
            }
        }
        Self { names: normalized }
    }

    pub fn contains(&self, name: &str) -> bool {
        let name = normalize_ingredient(name);
        self.names.iter().any(|n| *n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Loads a vocabulary from a CSV file with a `Name` column.
pub fn load_ingredient_vocabulary(csv_path: &Path) -> Result<IngredientVocabulary> {
    if !csv_path.exists() {
        return Err(anyhow::anyhow!("Ingredient CSV file not found at: {:?}", csv_path));
    }

    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open ingredient CSV file at {:?}", csv_path))?;
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

    let headers = rdr.headers()?.clone();
    let name_idx = headers
        .iter()
        .position(|h| h.trim() == NAME_COL)
        .ok_or_else(|| anyhow::anyhow!("Column '{}' not found", NAME_COL))?;

    let mut names = Vec::new();
    for (row_index, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read record at row index {}", row_index))?;
        if let Some(name) = record.get(name_idx) {
            names.push(name.to_string());
        }
    }

    // Blank and repeated names collapse here, so check emptiness afterwards.
    let vocabulary = IngredientVocabulary::from_names(names);
    if vocabulary.is_empty() {
        return Err(anyhow::anyhow!("No ingredient names loaded from {:?}", csv_path));
    }
    Ok(vocabulary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_vocabulary_is_normalized() {
        let vocabulary = IngredientVocabulary::default();
        assert_eq!(vocabulary.len(), AVAILABLE_INGREDIENTS.len());
        assert!(vocabulary.contains("EGG"));
        assert!(vocabulary.contains(" olive oil "));
        assert!(!vocabulary.contains("banana"));
    }

    #[test]
    fn test_load_vocabulary_success() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "Name,Category")?;
        writeln!(file, "Apple,fruit")?;
        writeln!(file, " BANANA ,fruit")?;
        writeln!(file, ",empty")?;
        writeln!(file, "apple,duplicate")?;
        file.flush()?;

        let vocabulary = load_ingredient_vocabulary(file.path())?;
        assert_eq!(vocabulary.names(), &["apple".to_string(), "banana".to_string()][..]);
        Ok(())
    }

    #[test]
    fn test_load_vocabulary_missing_column() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "Ingredient")?;
        writeln!(file, "Apple")?;
        file.flush()?;

        let result = load_ingredient_vocabulary(file.path());
        assert!(result.unwrap_err().to_string().contains("Column 'Name' not found"));
        Ok(())
    }

    #[test]
    fn test_load_vocabulary_headers_only() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "Name")?;
        file.flush()?;

        let result = load_ingredient_vocabulary(file.path());
        assert!(result.unwrap_err().to_string().contains("No ingredient names loaded"));
        Ok(())
    }

    #[test]
    fn test_load_vocabulary_file_not_found() {
        let result = load_ingredient_vocabulary(Path::new("this_file_does_not_exist.csv"));
        assert!(result.unwrap_err().to_string().contains("Ingredient CSV file not found"));
    }
}

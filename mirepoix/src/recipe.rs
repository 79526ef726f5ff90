//! Recipe corpus records and loaders.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::errors::{MirepoixError, Result};
use crate::label::{RawTags, TagSet};

/// Row of a corpus file. Every column is optional.
#[derive(Debug, Default, Deserialize)]
struct RecipeRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    ingredients: Option<String>,
    #[serde(default)]
    steps: Option<String>,
    #[serde(default)]
    tags: RawTags,
}

/// One recipe of the corpus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recipe {
    name: String,
    description: String,
    ingredients: String,
    steps: String,
    tags: Vec<String>,

    ingredients_lower: String,
    tags_lower: String,
}

impl Recipe {
    /// Creates a recipe.
    ///
    /// # Arguments
    ///
    /// * `name` - Recipe name.
    /// * `description` - Free-text description.
    /// * `ingredients` - Ingredient list as a single string.
    /// * `steps` - Cooking steps as a single string.
    /// * `tags` - Tags in either of the accepted shapes.
    pub fn new<S>(name: S, description: S, ingredients: S, steps: S, tags: RawTags) -> Self
    where
        S: Into<String>,
    {
        let ingredients = ingredients.into();
        let tags_lower = match &tags {
            RawTags::Joined(text) => text.to_lowercase(),
            RawTags::List(items) => items.join(", ").to_lowercase(),
            RawTags::Malformed => String::new(),
        };
        Self {
            name: name.into(),
            description: description.into(),
            ingredients_lower: ingredients.to_lowercase(),
            ingredients,
            steps: steps.into(),
            tags_lower,
            tags: tags.normalize(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn ingredients(&self) -> &str {
        &self.ingredients
    }

    pub fn steps(&self) -> &str {
        &self.steps
    }

    /// Gets the normalized (trimmed, lowercase) tags.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn tag_set(&self) -> TagSet {
        self.tags.iter().collect()
    }

    /// Concatenates all text fields into the document used for training.
    ///
    /// # Examples
    ///
    /// ```
    /// use mirepoix::{RawTags, Recipe};
    ///
    /// let r = Recipe::new("Soup", "Warm", "leek", "Boil", RawTags::Malformed);
    /// assert_eq!(
    ///     "Soup. Description: Warm. Ingredients: leek. Steps: Boil",
    ///     r.document_text(),
    /// );
    /// ```
    pub fn document_text(&self) -> String {
        format!(
            "{}. Description: {}. Ingredients: {}. Steps: {}",
            self.name, self.description, self.ingredients, self.steps
        )
    }

    pub(crate) fn ingredients_lower(&self) -> &str {
        &self.ingredients_lower
    }

    pub(crate) fn tags_lower(&self) -> &str {
        &self.tags_lower
    }
}

impl From<RecipeRecord> for Recipe {
    fn from(record: RecipeRecord) -> Self {
        if record.tags == RawTags::Malformed {
            debug!(name = ?record.name, "recipe has no usable tags");
        }
        Self::new(
            record.name.unwrap_or_default(),
            record.description.unwrap_or_default(),
            record.ingredients.unwrap_or_default(),
            record.steps.unwrap_or_default(),
            record.tags,
        )
    }
}

/// File format of a corpus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorpusFormat {
    /// Comma separated values with a header row.
    Csv,

    /// One JSON object per line.
    JsonLines,
}

impl CorpusFormat {
    /// Guesses the format from the file extension.
    ///
    /// # Errors
    ///
    /// [`MirepoixError::InvalidArgument`] will be returned if the extension is not one of
    /// `csv`, `jsonl`, `ndjson`.
    pub fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("jsonl" | "ndjson") => Ok(Self::JsonLines),
            _ => Err(MirepoixError::invalid_argument(
                "path",
                format!(
                    "unsupported corpus file `{}`; expected .csv, .jsonl or .ndjson",
                    path.as_ref().display()
                ),
            )),
        }
    }
}

/// Reads a CSV corpus.
///
/// A `tags` cell that is not a string degrades to no tags; any other undecodable row fails
/// the whole corpus.
///
/// # Errors
///
/// I/O errors of `rdr` are returned as is. [`MirepoixError::DataIntegrity`] will be returned
/// if a row cannot be decoded.
pub fn read_csv<R>(rdr: R) -> Result<Vec<Recipe>>
where
    R: Read,
{
    let mut rdr = csv::Reader::from_reader(rdr);
    let mut recipes = vec![];
    for (i, result) in rdr.deserialize::<RecipeRecord>().enumerate() {
        match result {
            Ok(record) => recipes.push(record.into()),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                return Err(MirepoixError::data_integrity(format!(
                    "corpus row {}: {}",
                    i + 1,
                    e
                )))
            }
        }
    }
    Ok(recipes)
}

/// Reads a JSON Lines corpus. Blank lines are ignored.
///
/// # Errors
///
/// I/O errors of `rdr` are returned as is. [`MirepoixError::DataIntegrity`] will be returned
/// if a line cannot be decoded.
pub fn read_jsonl<R>(rdr: R) -> Result<Vec<Recipe>>
where
    R: BufRead,
{
    let mut recipes = vec![];
    for (i, line) in rdr.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str::<RecipeRecord>(&line).map_err(|e| {
            MirepoixError::data_integrity(format!("corpus line {}: {}", i + 1, e))
        })?;
        recipes.push(record.into());
    }
    Ok(recipes)
}

/// Loads a corpus file, choosing the format by its extension.
pub fn load_corpus<P>(path: P) -> Result<Vec<Recipe>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let format = CorpusFormat::from_path(path)?;
    let file = File::open(path)?;
    let recipes = match format {
        CorpusFormat::Csv => read_csv(file)?,
        CorpusFormat::JsonLines => read_jsonl(BufReader::new(file))?,
    };
    debug!(n_recipes = recipes.len(), path = %path.display(), "loaded corpus");
    Ok(recipes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv() {
        let data = "\
name,description,ingredients,steps,tags
Chicken Rice,Easy,\"chicken, rice\",Boil,\"Dinner, Chicken\"
Toast,,bread,Toast it,
";
        let recipes = read_csv(data.as_bytes()).unwrap();

        assert_eq!(2, recipes.len());
        assert_eq!("Chicken Rice", recipes[0].name());
        assert_eq!("chicken, rice", recipes[0].ingredients());
        assert_eq!(&["dinner".to_string(), "chicken".to_string()], recipes[0].tags());
        assert_eq!("", recipes[1].description());
        assert!(recipes[1].tags().is_empty());
    }

    #[test]
    fn test_read_csv_missing_columns() {
        let data = "name,ingredients\nSalad,Lettuce\n";
        let recipes = read_csv(data.as_bytes()).unwrap();

        assert_eq!(1, recipes.len());
        assert_eq!("lettuce", recipes[0].ingredients_lower());
        assert_eq!("", recipes[0].steps());
    }

    #[test]
    fn test_read_csv_rejects_malformed_row() {
        let data = "name,ingredients\nA,salt\nB,beef,extra\nC,rice\n";

        assert!(matches!(
            read_csv(data.as_bytes()),
            Err(MirepoixError::DataIntegrity(_))
        ));
    }

    #[test]
    fn test_read_jsonl() {
        let data = r#"{"name": "A", "ingredients": "chicken, rice", "steps": "cook", "tags": ["Dinner", 1]}

{"name": "B", "description": null, "ingredients": "beef", "tags": {"bad": true}}
{"name": "C", "tags": "Lunch,Quick"}
"#;
        let recipes = read_jsonl(data.as_bytes()).unwrap();

        assert_eq!(3, recipes.len());
        assert_eq!(&["dinner".to_string()], recipes[0].tags());
        assert!(recipes[1].tags().is_empty());
        assert_eq!("", recipes[1].description());
        assert_eq!(&["lunch".to_string(), "quick".to_string()], recipes[2].tags());
        assert_eq!("lunch,quick", recipes[2].tags_lower());
    }

    #[test]
    fn test_read_jsonl_rejects_malformed_line() {
        let data = "{\"name\": \"A\"}\n{broken\n";
        let err = read_jsonl(data.as_bytes()).unwrap_err();

        assert!(matches!(err, MirepoixError::DataIntegrity(_)));
        assert!(err.to_string().starts_with("DataIntegrityError: corpus line 2:"));
    }

    #[test]
    fn test_tag_set() {
        let r = Recipe::new(
            "A",
            "",
            "",
            "",
            RawTags::Joined("Dinner, Chicken".to_string()),
        );
        let tags = r.tag_set();

        assert!(tags.contains("chicken"));
        assert!(tags.contains("DINNER"));
        assert_eq!(2, tags.len());
    }

    #[test]
    fn test_corpus_format_from_path() {
        assert_eq!(
            CorpusFormat::Csv,
            CorpusFormat::from_path("data/recipes.CSV").unwrap()
        );
        assert_eq!(
            CorpusFormat::JsonLines,
            CorpusFormat::from_path("recipes.jsonl").unwrap()
        );
        assert_eq!(
            "InvalidArgumentError: path: unsupported corpus file `recipes.parquet`; expected .csv, .jsonl or .ndjson",
            CorpusFormat::from_path("recipes.parquet")
                .unwrap_err()
                .to_string()
        );
    }
}

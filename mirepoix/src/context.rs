use serde::Serialize;
use tracing::debug;

use crate::label::OUTSIDE;
use crate::matcher::{match_recipes_with_rng, split_query, Query};
use crate::model::Model;
use crate::predictor::Predictor;
use crate::recipe::Recipe;

/// One search hit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub name: String,
    pub ingredients: String,
    pub steps: String,
}

impl From<&Recipe> for SearchResult {
    fn from(recipe: &Recipe) -> Self {
        Self {
            name: recipe.name().to_string(),
            ingredients: recipe.ingredients().to_string(),
            steps: recipe.steps().to_string(),
        }
    }
}

/// Trained model and recipe corpus, loaded once and shared by all queries.
///
/// Searching never mutates the context, so a single instance can serve concurrent requests
/// behind an [`std::sync::Arc`].
pub struct SearchContext {
    predictor: Predictor,
    corpus: Vec<Recipe>,
}

impl SearchContext {
    pub fn new(model: Model, corpus: Vec<Recipe>) -> Self {
        Self {
            predictor: Predictor::new(model),
            corpus,
        }
    }

    pub fn corpus(&self) -> &[Recipe] {
        &self.corpus
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    /// Extracts the query words labeled as something other than `O`.
    pub fn predicted_tags<'q>(&self, text: &'q str) -> Vec<&'q str> {
        let tokens = split_query(text);
        let labels = self.predictor.decode_single(&tokens);
        tokens
            .into_iter()
            .zip(labels)
            .filter(|&(_, label)| label != OUTSIDE)
            .map(|(token, _)| token)
            .collect()
    }

    /// Runs the full search pipeline for a query.
    pub fn search(&self, query: &Query) -> Vec<SearchResult> {
        self.search_with_rng(query, &mut rand::thread_rng())
    }

    pub(crate) fn search_with_rng<R>(&self, query: &Query, rng: &mut R) -> Vec<SearchResult>
    where
        R: rand::Rng + ?Sized,
    {
        let tags = self.predicted_tags(&query.text);
        debug!(query = %query.text, ?tags, "decoded query");
        match_recipes_with_rng(
            &tags,
            &query.text,
            &self.corpus,
            query.limit,
            query.randomize,
            rng,
        )
        .into_iter()
        .map(SearchResult::from)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::label::RawTags;
    use crate::model::AttributeWeights;

    fn model() -> Model {
        Model::new(
            vec!["ING".to_string(), "O".to_string()],
            vec![
                AttributeWeights {
                    attribute: "bias".to_string(),
                    weights: vec![(1, 0.5)],
                },
                AttributeWeights {
                    attribute: "word.lower()=beef".to_string(),
                    weights: vec![(0, 2.0)],
                },
            ],
            vec![0.0; 4],
        )
        .unwrap()
    }

    fn context() -> SearchContext {
        SearchContext::new(
            model(),
            vec![
                Recipe::new(
                    "A",
                    "",
                    "chicken, rice",
                    "Boil.",
                    RawTags::Joined("dinner".into()),
                ),
                Recipe::new(
                    "B",
                    "",
                    "potato",
                    "Bake.",
                    RawTags::Joined("beef, lunch".into()),
                ),
            ],
        )
    }

    #[test]
    fn test_predicted_tags() {
        let ctx = context();

        assert_eq!(vec!["Beef"], ctx.predicted_tags("Beef, tofu"));
        assert!(ctx.predicted_tags("").is_empty());
    }

    #[test]
    fn test_search_by_ingredients() {
        let ctx = context();
        let results = ctx.search(&Query::new("chicken, rice", 3, false));

        assert_eq!(
            vec![SearchResult {
                name: "A".to_string(),
                ingredients: "chicken, rice".to_string(),
                steps: "Boil.".to_string(),
            }],
            results
        );
    }

    #[test]
    fn test_search_by_predicted_tag() {
        let ctx = context();
        let results = ctx.search(&Query::new("beef, tofu", 3, false));

        assert_eq!(1, results.len());
        assert_eq!("B", results[0].name);
    }

    #[test]
    fn test_search_empty_query() {
        let ctx = context();
        let mut rng = StdRng::seed_from_u64(42);
        let results = ctx.search_with_rng(&Query::new("", 1, true), &mut rng);

        assert_eq!(1, results.len());
    }
}

use rand::seq::SliceRandom;
use rand::Rng;

use crate::recipe::Recipe;

/// Separator of ingredients in a query.
pub const QUERY_SEPARATOR: &str = ", ";

/// Default maximum number of results.
pub const DEFAULT_LIMIT: usize = 3;

/// A search request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub limit: usize,
    pub randomize: bool,
}

impl Query {
    /// Creates a query. `limit` is clamped to at least 1.
    pub fn new<S>(text: S, limit: usize, randomize: bool) -> Self
    where
        S: Into<String>,
    {
        Self {
            text: text.into(),
            limit: limit.max(1),
            randomize,
        }
    }

    /// Builds a query from loosely typed request parameters.
    ///
    /// # Arguments
    ///
    /// * `text` - Comma separated ingredients.
    /// * `limit` - Maximum number of results; [`DEFAULT_LIMIT`] if missing.
    /// * `randomize` - `"true"` in any letter case enables shuffling; anything else disables it.
    ///
    /// # Examples
    ///
    /// ```
    /// use mirepoix::Query;
    ///
    /// let q = Query::from_params("chicken, rice", Some(0), Some("TRUE"));
    /// assert_eq!(1, q.limit);
    /// assert!(q.randomize);
    /// ```
    pub fn from_params<S>(text: S, limit: Option<i64>, randomize: Option<&str>) -> Self
    where
        S: Into<String>,
    {
        let limit = limit.map_or(DEFAULT_LIMIT, |l| usize::try_from(l).unwrap_or(0));
        let randomize = randomize.map_or(false, |r| r.eq_ignore_ascii_case("true"));
        Self::new(text, limit, randomize)
    }

    /// Splits the query text into ingredients.
    ///
    /// An empty text yields no ingredients.
    pub fn ingredients(&self) -> Vec<&str> {
        split_query(&self.text)
    }
}

pub(crate) fn split_query(text: &str) -> Vec<&str> {
    if text.is_empty() {
        vec![]
    } else {
        text.split(QUERY_SEPARATOR).collect()
    }
}

/// Selects recipes matching the query.
///
/// A recipe is selected when every ingredient of the query is a case-insensitive substring of
/// its ingredients, or when any predicted tag is a case-insensitive substring of its tags
/// text as written in the corpus.
/// An empty query selects every recipe. Selected recipes keep the corpus order unless
/// `randomize` is set, in which case they are shuffled. At most `limit` recipes (at least one)
/// are returned.
///
/// # Examples
///
/// ```
/// use mirepoix::{match_recipes, RawTags, Recipe};
///
/// let corpus = vec![
///     Recipe::new("A", "", "chicken, rice", "", RawTags::Joined("dinner".into())),
///     Recipe::new("B", "", "beef, potato", "", RawTags::Joined("lunch".into())),
/// ];
/// let found = match_recipes::<&str>(&[], "chicken, rice", &corpus, 3, false);
///
/// assert_eq!(1, found.len());
/// assert_eq!("A", found[0].name());
/// ```
pub fn match_recipes<'a, S>(
    predicted_tags: &[S],
    query_text: &str,
    corpus: &'a [Recipe],
    limit: usize,
    randomize: bool,
) -> Vec<&'a Recipe>
where
    S: AsRef<str>,
{
    match_recipes_with_rng(
        predicted_tags,
        query_text,
        corpus,
        limit,
        randomize,
        &mut rand::thread_rng(),
    )
}

pub(crate) fn match_recipes_with_rng<'a, S, R>(
    predicted_tags: &[S],
    query_text: &str,
    corpus: &'a [Recipe],
    limit: usize,
    randomize: bool,
    rng: &mut R,
) -> Vec<&'a Recipe>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    let ingredients: Vec<String> = split_query(query_text)
        .into_iter()
        .map(str::to_lowercase)
        .collect();
    let tags: Vec<String> = predicted_tags
        .iter()
        .map(|t| t.as_ref().to_lowercase())
        .collect();

    let mut selected: Vec<&Recipe> = if ingredients.is_empty() {
        corpus.iter().collect()
    } else {
        corpus
            .iter()
            .filter(|r| {
                let ingredient_match = ingredients
                    .iter()
                    .all(|i| r.ingredients_lower().contains(i.as_str()));
                let tag_match = tags.iter().any(|t| r.tags_lower().contains(t.as_str()));
                ingredient_match || tag_match
            })
            .collect()
    };
    if randomize {
        selected.shuffle(rng);
    }
    selected.truncate(limit.max(1));
    selected
}

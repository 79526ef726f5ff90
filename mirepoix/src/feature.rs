use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::label::TagSet;
use crate::sentence::Sentence;

pub const BIAS: &str = "bias";
pub const WORD_LOWER: &str = "word.lower()";
pub const WORD_SUFFIX3: &str = "word[-3:]";
pub const WORD_SUFFIX2: &str = "word[-2:]";
pub const WORD_IS_UPPER: &str = "word.isupper()";
pub const WORD_IS_TITLE: &str = "word.istitle()";
pub const WORD_IS_DIGIT: &str = "word.isdigit()";
pub const POS: &str = "postag";
pub const POS_PREFIX2: &str = "postag[:2]";
pub const IN_TAGS: &str = "in_tags";
pub const PREV_WORD_LOWER: &str = "-1:word.lower()";
pub const PREV_POS: &str = "-1:postag";
pub const NEXT_WORD_LOWER: &str = "+1:word.lower()";
pub const NEXT_POS: &str = "+1:postag";
pub const BOS: &str = "BOS";
pub const EOS: &str = "EOS";

/// Value of a single feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Bool(bool),
    Str(String),
    Float(f64),
}

impl FeatureValue {
    /// Converts a named feature into a model attribute and its value.
    ///
    /// Strings become a binary attribute `name=value`, booleans and floats keep the name and
    /// carry their numeric value. Attributes with a zero value do not affect any score, so
    /// `None` is returned for them.
    pub(crate) fn to_attribute<'a>(&'a self, name: &'a str) -> Option<(Cow<'a, str>, f64)> {
        match self {
            Self::Str(s) => Some((Cow::Owned(format!("{name}={s}")), 1.0)),
            Self::Bool(true) => Some((Cow::Borrowed(name), 1.0)),
            Self::Bool(false) => None,
            Self::Float(v) if *v == 0.0 => None,
            Self::Float(v) => Some((Cow::Borrowed(name), *v)),
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

/// Features of one token, keyed by feature name.
pub type FeatureMap = BTreeMap<String, FeatureValue>;

/// Returns the last `n` characters of `word`, or the whole word if it is shorter.
fn suffix(word: &str, n: usize) -> &str {
    word.char_indices()
        .rev()
        .nth(n.saturating_sub(1))
        .map_or(word, |(i, _)| &word[i..])
}

/// Returns the first `n` characters of `word`, or the whole word if it is shorter.
fn prefix(word: &str, n: usize) -> &str {
    word.char_indices().nth(n).map_or(word, |(i, _)| &word[..i])
}

/// At least one cased character, and no lowercase ones.
fn is_upper(word: &str) -> bool {
    let mut cased = false;
    for c in word.chars() {
        if c.is_lowercase() {
            return false;
        }
        cased |= c.is_uppercase();
    }
    cased
}

/// Uppercase characters only follow uncased ones and lowercase characters only follow cased
/// ones, e.g. `Salt` or `Jack-O-Lantern`.
fn is_title(word: &str) -> bool {
    let mut cased = false;
    let mut prev_cased = false;
    for c in word.chars() {
        if c.is_uppercase() {
            if prev_cased {
                return false;
            }
            prev_cased = true;
            cased = true;
        } else if c.is_lowercase() {
            if !prev_cased {
                return false;
            }
            prev_cased = true;
            cased = true;
        } else {
            prev_cased = false;
        }
    }
    cased
}

fn is_digit(word: &str) -> bool {
    !word.is_empty() && word.chars().all(char::is_numeric)
}

/// Extracts a feature map for every token of a sentence.
///
/// Each map holds the bias, the lowercase word, its 3 and 2 character suffixes, casing and
/// digit flags, the part-of-speech tag and its first two characters, and whether the word is
/// one of `tag_set`. The lowercase word and tag of the neighbours are added with `-1:` and
/// `+1:` prefixes; `BOS` and `EOS` stand in for a missing neighbour.
///
/// # Examples
///
/// ```
/// use mirepoix::{extract_features, FeatureValue, Sentence, TagSet};
///
/// let s = Sentence::from_tagged("Add/VERB Salt/NOUN").unwrap();
/// let tags: TagSet = ["salt"].into_iter().collect();
/// let features = extract_features(&s, &tags);
///
/// assert_eq!(Some(&FeatureValue::Bool(true)), features[0].get("BOS"));
/// assert_eq!(Some(&FeatureValue::Bool(true)), features[1].get("in_tags"));
/// ```
pub fn extract_features(sentence: &Sentence, tag_set: &TagSet) -> Vec<FeatureMap> {
    let tokens = sentence.tokens();
    let mut result = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        let word = token.text();
        let lower = word.to_lowercase();
        let mut features = FeatureMap::new();
        features.insert(BIAS.into(), FeatureValue::Float(1.0));
        features.insert(WORD_SUFFIX3.into(), suffix(word, 3).into());
        features.insert(WORD_SUFFIX2.into(), suffix(word, 2).into());
        features.insert(WORD_IS_UPPER.into(), is_upper(word).into());
        features.insert(WORD_IS_TITLE.into(), is_title(word).into());
        features.insert(WORD_IS_DIGIT.into(), is_digit(word).into());
        features.insert(POS.into(), token.pos().into());
        features.insert(POS_PREFIX2.into(), prefix(token.pos(), 2).into());
        features.insert(IN_TAGS.into(), tag_set.contains(&lower).into());
        features.insert(WORD_LOWER.into(), lower.into());

        if let Some(prev) = i.checked_sub(1).map(|j| &tokens[j]) {
            features.insert(PREV_WORD_LOWER.into(), prev.text().to_lowercase().into());
            features.insert(PREV_POS.into(), prev.pos().into());
        } else {
            features.insert(BOS.into(), true.into());
        }
        if let Some(next) = tokens.get(i + 1) {
            features.insert(NEXT_WORD_LOWER.into(), next.text().to_lowercase().into());
            features.insert(NEXT_POS.into(), next.pos().into());
        } else {
            features.insert(EOS.into(), true.into());
        }
        result.push(features);
    }
    result
}

/// Builds reduced feature maps holding only the bias and the lowercase word.
///
/// Used for inputs without part-of-speech tags or context, such as a short user query.
pub fn minimal_features<I, S>(words: I) -> Vec<FeatureMap>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| {
            let mut features = FeatureMap::new();
            features.insert(BIAS.into(), FeatureValue::Float(1.0));
            features.insert(WORD_LOWER.into(), w.as_ref().to_lowercase().into());
            features
        })
        .collect()
}

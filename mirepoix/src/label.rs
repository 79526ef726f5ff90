use std::fmt;

use hashbrown::HashSet;
use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};

use crate::sentence::Sentence;

/// Label of tokens outside of any ingredient mention.
pub const OUTSIDE: &str = "O";

/// Label of ingredient tokens.
pub const INGREDIENT: &str = "ING";

/// Tag field of a corpus record as it arrives from storage.
///
/// Depending on the source, tags are either a single comma separated string or an already
/// split sequence. Anything else is kept as [`RawTags::Malformed`] and yields no tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RawTags {
    /// Comma separated tags, e.g. `"dinner, chicken"`.
    Joined(String),

    /// Already split tags.
    List(Vec<String>),

    /// Neither a string nor a sequence.
    #[default]
    Malformed,
}

impl RawTags {
    /// Splits and normalizes tags into trimmed lowercase strings.
    ///
    /// Empty items are dropped; the order of appearance is kept.
    ///
    /// # Examples
    ///
    /// ```
    /// use mirepoix::RawTags;
    ///
    /// let tags = RawTags::Joined("Dinner, Chicken ,".to_string());
    /// assert_eq!(vec!["dinner", "chicken"], tags.normalize());
    /// ```
    pub fn normalize(&self) -> Vec<String> {
        let items: Box<dyn Iterator<Item = &str>> = match self {
            Self::Joined(text) => Box::new(text.split(',')),
            Self::List(tags) => Box::new(tags.iter().map(String::as_str)),
            Self::Malformed => return vec![],
        };
        items
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum TagItem {
    Text(String),
    #[allow(dead_code)]
    Other(IgnoredAny),
}

struct RawTagsVisitor;

impl<'de> Visitor<'de> for RawTagsVisitor {
    type Value = RawTags;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a comma separated string or a sequence of strings")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(RawTags::Joined(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(RawTags::Joined(v))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut tags = vec![];
        while let Some(item) = seq.next_element::<TagItem>()? {
            if let TagItem::Text(tag) = item {
                tags.push(tag);
            }
        }
        Ok(RawTags::List(tags))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(RawTags::Malformed)
    }

    fn visit_bool<E>(self, _v: bool) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(RawTags::Malformed)
    }

    fn visit_i64<E>(self, _v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(RawTags::Malformed)
    }

    fn visit_u64<E>(self, _v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(RawTags::Malformed)
    }

    fn visit_f64<E>(self, _v: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(RawTags::Malformed)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(RawTags::Malformed)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(RawTags::Malformed)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Deserialize<'de> for RawTags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RawTagsVisitor)
    }
}

/// Set of lowercase tags attached to one recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: HashSet<String>,
}

impl TagSet {
    /// Creates an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks whether `word` is one of the tags, ignoring case.
    pub fn contains(&self, word: &str) -> bool {
        self.tags.contains(word.to_lowercase().as_str())
    }

    /// Gets the number of distinct tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` if there are no tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl<S> FromIterator<S> for TagSet
where
    S: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            tags: iter
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

impl From<&RawTags> for TagSet {
    fn from(raw: &RawTags) -> Self {
        raw.normalize().into_iter().collect()
    }
}

/// Generates gold labels of a sentence for training.
///
/// A token is labeled [`INGREDIENT`] when its lowercase surface is one of the tags and
/// [`OUTSIDE`] otherwise. Multi-word tags never match as a whole; only their single-word
/// tags are found.
///
/// # Examples
///
/// ```
/// use mirepoix::{encode_labels, Sentence, TagSet};
///
/// let s = Sentence::from_tagged("Add/VERB Salt/NOUN").unwrap();
/// let tags: TagSet = ["salt"].into_iter().collect();
/// assert_eq!(vec!["O", "ING"], encode_labels(&s, &tags));
/// ```
pub fn encode_labels(sentence: &Sentence, tag_set: &TagSet) -> Vec<&'static str> {
    sentence
        .words()
        .map(|w| {
            if tag_set.contains(w) {
                INGREDIENT
            } else {
                OUTSIDE
            }
        })
        .collect()
}

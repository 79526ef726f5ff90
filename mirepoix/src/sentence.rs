use crate::errors::{MirepoixError, Result};

/// A word with its part-of-speech tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub(crate) text: String,
    pub(crate) pos: String,
    pub(crate) index: usize,
}

impl Token {
    /// Gets the surface string of the token.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Gets the part-of-speech tag of the token.
    pub fn pos(&self) -> &str {
        &self.pos
    }

    /// Gets the position of the token in its sentence.
    pub const fn index(&self) -> usize {
        self.index
    }
}

/// Sequence of tagged tokens produced by a [`Tagger`](crate::Tagger).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    pub(crate) tokens: Vec<Token>,
}

impl Sentence {
    /// Creates a new [`Sentence`] from `(word, part-of-speech)` pairs.
    ///
    /// # Arguments
    ///
    /// * `pairs` - Words and their tags in order of appearance.
    ///
    /// # Returns
    ///
    /// A new [`Sentence`].
    pub fn new<I, W, P>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (W, P)>,
        W: Into<String>,
        P: Into<String>,
    {
        let tokens = pairs
            .into_iter()
            .enumerate()
            .map(|(index, (text, pos))| Token {
                text: text.into(),
                pos: pos.into(),
                index,
            })
            .collect();
        Self { tokens }
    }

    /// Creates a new [`Sentence`] from a pre-tagged string.
    ///
    /// # Arguments
    ///
    /// * `tagged_text` - Whitespace separated tokens, each written as `word/POS`.
    ///
    /// # Returns
    ///
    /// A new [`Sentence`].
    ///
    /// # Errors
    ///
    /// This function will return an error variant when:
    ///
    /// * `tagged_text` is empty.
    /// * a token has no `/` separator.
    /// * a token has an empty word or an empty tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use mirepoix::Sentence;
    ///
    /// let s = Sentence::from_tagged("Add/VERB salt/NOUN").unwrap();
    /// assert_eq!(2, s.len());
    /// assert_eq!("NOUN", s.tokens()[1].pos());
    ///
    /// assert!(Sentence::from_tagged("Add salt").is_err());
    /// ```
    pub fn from_tagged<S>(tagged_text: S) -> Result<Self>
    where
        S: AsRef<str>,
    {
        let tagged_text = tagged_text.as_ref();
        if tagged_text.trim().is_empty() {
            return Err(MirepoixError::invalid_argument(
                "tagged_text",
                "`tagged_text` is empty",
            ));
        }
        let mut pairs = vec![];
        for item in tagged_text.split_whitespace() {
            let (word, pos) = item.rsplit_once('/').ok_or_else(|| {
                MirepoixError::invalid_argument(
                    "tagged_text",
                    format!("token `{item}` has no part-of-speech tag"),
                )
            })?;
            if word.is_empty() || pos.is_empty() {
                return Err(MirepoixError::invalid_argument(
                    "tagged_text",
                    format!("token `{item}` has an empty word or tag"),
                ));
            }
            pairs.push((word, pos));
        }
        Ok(Self::new(pairs))
    }

    /// Gets the tokens.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Gets the number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if the sentence has no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterates over surface strings.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|t| t.text.as_str())
    }

    /// Formats tokens with the given labels as `word/LABEL` pairs.
    ///
    /// # Errors
    ///
    /// If the number of labels differs from the number of tokens, an error variant will be
    /// returned.
    pub fn to_labeled_string<L>(&self, labels: &[L]) -> Result<String>
    where
        L: AsRef<str>,
    {
        if labels.len() != self.tokens.len() {
            return Err(MirepoixError::data_integrity(format!(
                "{} tokens but {} labels",
                self.tokens.len(),
                labels.len()
            )));
        }
        let mut result = String::new();
        for (token, label) in self.tokens.iter().zip(labels) {
            if !result.is_empty() {
                result.push(' ');
            }
            result.push_str(&token.text);
            result.push('/');
            result.push_str(label.as_ref());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_new_assigns_indices() {
        let s = Sentence::new([("Add", "VERB"), ("salt", "NOUN")]);

        assert_eq!(
            vec![
                Token {
                    text: "Add".to_string(),
                    pos: "VERB".to_string(),
                    index: 0,
                },
                Token {
                    text: "salt".to_string(),
                    pos: "NOUN".to_string(),
                    index: 1,
                },
            ],
            s.tokens
        );
    }

    #[test]
    fn test_sentence_from_tagged() {
        let s = Sentence::from_tagged("Add/VERB 1/2/NUM cup/NOUN").unwrap();

        assert_eq!(vec!["Add", "1/2", "cup"], s.words().collect::<Vec<_>>());
        assert_eq!("NUM", s.tokens()[1].pos());
        assert_eq!(2, s.tokens()[2].index());
    }

    #[test]
    fn test_sentence_from_tagged_empty() {
        let s = Sentence::from_tagged("  ");

        assert!(s.is_err());
        assert_eq!(
            "InvalidArgumentError: tagged_text: `tagged_text` is empty",
            &s.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_sentence_from_tagged_missing_tag() {
        let s = Sentence::from_tagged("Add/VERB salt");

        assert_eq!(
            "InvalidArgumentError: tagged_text: token `salt` has no part-of-speech tag",
            &s.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_sentence_from_tagged_empty_tag() {
        let s = Sentence::from_tagged("salt/");

        assert!(s.is_err());
    }

    #[test]
    fn test_sentence_to_labeled_string() {
        let s = Sentence::from_tagged("Add/VERB salt/NOUN").unwrap();

        assert_eq!("Add/O salt/ING", s.to_labeled_string(&["O", "ING"]).unwrap());
        assert!(s.to_labeled_string(&["O"]).is_err());
    }
}

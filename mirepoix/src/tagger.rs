use unicode_segmentation::UnicodeSegmentation;

use crate::sentence::Sentence;

/// Tokenizer and part-of-speech tagger.
///
/// Any external analyzer can be plugged in by implementing this trait; the
/// feature extractor only sees the resulting [`Sentence`].
pub trait Tagger {
    /// Splits `text` into tokens and assigns a part-of-speech tag to each of them.
    fn tag(&self, text: &str) -> Sentence;
}

/// Rule based stand-in for a statistical tagger.
///
/// Words are split on Unicode word boundaries (UAX #29). Tags follow the universal
/// part-of-speech tag set: closed-class words are looked up in a small lexicon, numbers,
/// punctuation and symbols are detected from their characters, and everything else is
/// tagged `X`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleTagger;

impl RuleTagger {
    fn closed_class(word: &str) -> Option<&'static str> {
        let tag = match word {
            "a" | "an" | "the" | "this" | "that" | "these" | "those" | "each" | "every"
            | "some" | "any" | "all" | "no" => "DET",
            "of" | "in" | "on" | "at" | "to" | "for" | "with" | "into" | "from" | "over"
            | "by" | "about" | "under" | "after" | "before" | "until" | "without" => "ADP",
            "and" | "or" | "but" | "nor" => "CCONJ",
            "if" | "while" | "when" | "because" | "once" => "SCONJ",
            "i" | "you" | "he" | "she" | "it" | "we" | "they" | "them" | "us" | "me" => "PRON",
            "is" | "are" | "was" | "were" | "be" | "been" | "will" | "can" | "should" | "may" => {
                "AUX"
            }
            "not" | "n't" => "PART",
            _ => return None,
        };
        Some(tag)
    }

    fn classify(word: &str) -> &'static str {
        let lower = word.to_lowercase();
        if let Some(tag) = Self::closed_class(&lower) {
            return tag;
        }
        if word.chars().any(char::is_numeric)
            && word
                .chars()
                .all(|c| c.is_numeric() || c == '.' || c == ',')
        {
            return "NUM";
        }
        if word.chars().all(|c| !c.is_alphanumeric()) {
            if word.chars().any(Self::is_symbol) {
                return "SYM";
            }
            return "PUNCT";
        }
        "X"
    }

    const fn is_symbol(c: char) -> bool {
        matches!(
            c,
            '+' | '<' | '=' | '>' | '^' | '|' | '~' | '$' | '%' | '&' | '*' | '#' | '@' | '°'
        )
    }
}

impl Tagger for RuleTagger {
    fn tag(&self, text: &str) -> Sentence {
        Sentence::new(
            text.split_word_bounds()
                .filter(|w| !w.trim().is_empty())
                .map(|w| (w, Self::classify(w))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_tagger_splits_words_and_punctuation() {
        let s = RuleTagger.tag("Chicken soup. Add 2 cups of rice!");

        assert_eq!(
            vec!["Chicken", "soup", ".", "Add", "2", "cups", "of", "rice", "!"],
            s.words().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_rule_tagger_tags() {
        let s = RuleTagger.tag("Stir the 1.5 eggs and salt, 20%");
        let tags: Vec<_> = s.tokens().iter().map(|t| t.pos()).collect();

        assert_eq!(
            vec!["X", "DET", "NUM", "X", "CCONJ", "X", "PUNCT", "NUM", "SYM"],
            tags
        );
    }

    #[test]
    fn test_rule_tagger_empty() {
        let s = RuleTagger.tag("   ");

        assert!(s.is_empty());
    }
}

use hashbrown::HashMap;

use crate::feature::{extract_features, minimal_features, FeatureMap};
use crate::label::TagSet;
use crate::lattice::Lattice;
use crate::model::Model;
use crate::sentence::Sentence;

/// Predictor.
pub struct Predictor {
    model: Model,
    attribute_ids: HashMap<String, usize>,
}

impl Predictor {
    /// Creates a new predictor.
    ///
    /// # Arguments
    ///
    /// * `model` - A model data.
    ///
    /// # Returns
    ///
    /// A new predictor.
    pub fn new(model: Model) -> Self {
        let attribute_ids = model
            .attributes
            .iter()
            .enumerate()
            .map(|(i, a)| (a.attribute.clone(), i))
            .collect();
        Self {
            model,
            attribute_ids,
        }
    }

    /// Gets the underlying model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Labels a sequence of feature maps with the most probable label path.
    ///
    /// Attributes unknown to the model contribute nothing to the scores. Ties are broken
    /// towards the lexicographically smallest label.
    ///
    /// # Arguments
    ///
    /// * `features` - Feature maps of the tokens.
    ///
    /// # Returns
    ///
    /// One label per feature map.
    pub fn predict(&self, features: &[FeatureMap]) -> Vec<&str> {
        let n_labels = self.model.classes.len();
        let mut lattice = Lattice::new(n_labels, features.len(), &self.model.transitions);
        for (t, map) in features.iter().enumerate() {
            for (name, value) in map {
                let Some((attr, v)) = value.to_attribute(name) else {
                    continue;
                };
                if let Some(&id) = self.attribute_ids.get(&*attr) {
                    for &(y, w) in &self.model.attributes[id].weights {
                        lattice.add_state(t, y as usize, w * v);
                    }
                }
            }
        }
        let (path, _) = lattice.viterbi();
        path.into_iter()
            .map(|y| self.model.classes[y].as_str())
            .collect()
    }

    /// Labels a tagged sentence using the full feature set.
    pub fn predict_sentence(&self, sentence: &Sentence, tag_set: &TagSet) -> Vec<&str> {
        self.predict(&extract_features(sentence, tag_set))
    }

    /// Labels raw tokens that have no part-of-speech tags or context.
    ///
    /// Only the bias and the lowercase word are used as features, so the result relies on
    /// the vocabulary learned by the model.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::fs::File;
    ///
    /// use mirepoix::{Model, Predictor};
    ///
    /// let mut f = File::open("model.bin").unwrap();
    /// let predictor = Predictor::new(Model::read(&mut f).unwrap());
    /// let labels = predictor.decode_single(&["chicken", "rice"]);
    /// ```
    pub fn decode_single<S>(&self, tokens: &[S]) -> Vec<&str>
    where
        S: AsRef<str>,
    {
        self.predict(&minimal_features(tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::feature::FeatureValue;
    use crate::model::AttributeWeights;

    fn weights(attribute: &str, weights: &[(u32, f64)]) -> AttributeWeights {
        AttributeWeights {
            attribute: attribute.to_string(),
            weights: weights.to_vec(),
        }
    }

    // Labels: 0 = ING, 1 = O
    fn sample_model() -> Model {
        Model::new(
            vec!["ING".to_string(), "O".to_string()],
            vec![
                weights("bias", &[(1, 0.5)]),
                weights("in_tags", &[(0, 1.0)]),
                weights("word.lower()=chicken", &[(0, 2.0)]),
                weights("word.lower()=rice", &[(0, 1.5)]),
            ],
            vec![0.0, 0.0, 0.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_decode_single() {
        let predictor = Predictor::new(sample_model());

        assert_eq!(
            vec!["ING", "O", "ING"],
            predictor.decode_single(&["Chicken", "with", "RICE"])
        );
    }

    #[test]
    fn test_decode_single_empty() {
        let predictor = Predictor::new(sample_model());

        assert!(predictor.decode_single::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_unknown_attributes_are_ignored() {
        let predictor = Predictor::new(sample_model());
        let mut map = FeatureMap::new();
        map.insert("bias".to_string(), FeatureValue::Float(1.0));
        map.insert("postag".to_string(), FeatureValue::from("NOUN"));
        map.insert("unseen".to_string(), FeatureValue::Bool(true));

        assert_eq!(vec!["O"], predictor.predict(&[map]));
    }

    #[test]
    fn test_ties_prefer_smaller_label() {
        let model = Model::new(
            vec!["ING".to_string(), "O".to_string()],
            vec![],
            vec![0.0; 4],
        )
        .unwrap();
        let predictor = Predictor::new(model);

        assert_eq!(vec!["ING", "ING"], predictor.decode_single(&["a", "b"]));
    }

    #[test]
    fn test_forbidden_transition() {
        let model = Model::new(
            vec!["ING".to_string(), "O".to_string()],
            vec![
                weights("bias", &[(1, 0.1)]),
                weights("word.lower()=chicken", &[(0, 2.0)]),
                weights("word.lower()=stock", &[(0, 0.5)]),
            ],
            vec![f64::NEG_INFINITY, 0.0, 0.0, 0.0],
        )
        .unwrap();
        let predictor = Predictor::new(model);

        assert_eq!(
            vec!["ING", "O"],
            predictor.decode_single(&["chicken", "stock"])
        );
    }

    #[test]
    fn test_predict_sentence_uses_tags() {
        let predictor = Predictor::new(sample_model());
        let s = Sentence::from_tagged("add/VERB beef/NOUN").unwrap();
        let tags: TagSet = ["beef"].into_iter().collect();

        assert_eq!(vec!["O", "ING"], predictor.predict_sentence(&s, &tags));
    }
}

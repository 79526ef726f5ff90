use std::io::{Read, Write};

use bincode::{Decode, Encode};

use crate::errors::{MirepoixError, Result};
use crate::label::OUTSIDE;

/// Non-zero emission weights of one attribute.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub(crate) struct AttributeWeights {
    pub(crate) attribute: String,

    /// Pairs of a label index and its weight.
    pub(crate) weights: Vec<(u32, f64)>,
}

/// Model data.
///
/// Labels are stored in lexicographic order. Transition scores are indexed by
/// `[prev * n_labels + cur]`; a transition that was never learnable is stored as
/// negative infinity.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub struct Model {
    pub(crate) classes: Vec<String>,
    pub(crate) attributes: Vec<AttributeWeights>,
    pub(crate) transitions: Vec<f64>,
}

impl Model {
    pub(crate) fn new(
        classes: Vec<String>,
        attributes: Vec<AttributeWeights>,
        transitions: Vec<f64>,
    ) -> Result<Self> {
        let model = Self {
            classes,
            attributes,
            transitions,
        };
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let n_labels = self.classes.len();
        if !self.classes.iter().any(|c| c == OUTSIDE) {
            return Err(MirepoixError::invalid_model(format!(
                "label `{}` is missing",
                OUTSIDE
            )));
        }
        if self.classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MirepoixError::invalid_model(
                "labels must be unique and sorted",
            ));
        }
        if self.transitions.len() != n_labels * n_labels {
            return Err(MirepoixError::invalid_model(format!(
                "transition matrix must have {} elements, but got {}",
                n_labels * n_labels,
                self.transitions.len()
            )));
        }
        for attr in &self.attributes {
            for &(label, _) in &attr.weights {
                if label as usize >= n_labels {
                    return Err(MirepoixError::invalid_model(format!(
                        "attribute `{}` refers to undefined label {}",
                        attr.attribute, label
                    )));
                }
            }
        }
        Ok(())
    }

    /// Gets the label set in lexicographic order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Gets the number of attributes with at least one non-zero weight.
    pub fn n_attributes(&self) -> usize {
        self.attributes.len()
    }

    /// Gets the emission weight of an attribute for a label.
    ///
    /// Unknown attributes and labels have zero weight.
    pub fn state_weight(&self, attribute: &str, label: &str) -> f64 {
        let Some(label_id) = self.label_id(label) else {
            return 0.0;
        };
        self.attributes
            .binary_search_by(|a| a.attribute.as_str().cmp(attribute))
            .ok()
            .and_then(|i| {
                self.attributes[i]
                    .weights
                    .iter()
                    .find(|&&(y, _)| y as usize == label_id)
            })
            .map_or(0.0, |&(_, w)| w)
    }

    /// Gets the transition score from `prev` to `cur`.
    ///
    /// Returns [`None`] if either label is unknown or the transition is not allowed.
    pub fn transition(&self, prev: &str, cur: &str) -> Option<f64> {
        let i = self.label_id(prev)?;
        let j = self.label_id(cur)?;
        let score = self.transitions[i * self.classes.len() + j];
        (score != f64::NEG_INFINITY).then_some(score)
    }

    fn label_id(&self, label: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()
    }

    /// Exports the model data.
    ///
    /// # Arguments
    ///
    /// * `wtr` - Byte-oriented sink object.
    ///
    /// # Errors
    ///
    /// When `wtr` generates an error, it will be returned as is.
    pub fn write<W>(&self, wtr: &mut W) -> Result<()>
    where
        W: Write,
    {
        bincode::encode_into_std_write(self, wtr, bincode::config::standard())?;
        Ok(())
    }

    /// Creates a model from a reader.
    ///
    /// # Arguments
    ///
    /// * `rdr` - A data source.
    ///
    /// # Returns
    ///
    /// A model data read from `rdr`.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error, it will be returned as is.
    /// [`MirepoixError::InvalidModel`] will be returned if the decoded data is inconsistent.
    pub fn read<R>(rdr: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let model: Self = bincode::decode_from_std_read(rdr, bincode::config::standard())?;
        model.validate()?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> Model {
        Model::new(
            vec!["ING".to_string(), "O".to_string()],
            vec![
                AttributeWeights {
                    attribute: "bias".to_string(),
                    weights: vec![(1, 0.5)],
                },
                AttributeWeights {
                    attribute: "word.lower()=salt".to_string(),
                    weights: vec![(0, 2.0), (1, -1.0)],
                },
            ],
            vec![f64::NEG_INFINITY, 0.3, 0.1, 0.2],
        )
        .unwrap()
    }

    #[test]
    fn test_write_read() {
        let model = sample_model();
        let mut buf = vec![];
        model.write(&mut buf).unwrap();
        let restored = Model::read(&mut buf.as_slice()).unwrap();

        assert_eq!(model, restored);
    }

    #[test]
    fn test_lookup() {
        let model = sample_model();

        assert_eq!(2.0, model.state_weight("word.lower()=salt", "ING"));
        assert_eq!(0.0, model.state_weight("bias", "ING"));
        assert_eq!(0.0, model.state_weight("word.lower()=egg", "O"));
        assert_eq!(0.0, model.state_weight("bias", "B-ING"));
        assert_eq!(None, model.transition("ING", "ING"));
        assert_eq!(Some(0.3), model.transition("ING", "O"));
        assert_eq!(None, model.transition("X", "O"));
    }

    #[test]
    fn test_missing_outside_label() {
        let result = Model::new(vec!["ING".to_string()], vec![], vec![0.0]);

        assert_eq!(
            "InvalidModelError: label `O` is missing",
            result.unwrap_err().to_string()
        );
    }

    #[test]
    fn test_read_rejects_bad_transition_matrix() {
        let model = Model {
            classes: vec!["ING".to_string(), "O".to_string()],
            attributes: vec![],
            transitions: vec![0.0; 3],
        };
        let mut buf = vec![];
        model.write(&mut buf).unwrap();
        let result = Model::read(&mut buf.as_slice());

        assert_eq!(
            "InvalidModelError: transition matrix must have 4 elements, but got 3",
            result.unwrap_err().to_string()
        );
    }

    #[test]
    fn test_read_rejects_undefined_label() {
        let model = Model {
            classes: vec!["O".to_string()],
            attributes: vec![AttributeWeights {
                attribute: "bias".to_string(),
                weights: vec![(3, 1.0)],
            }],
            transitions: vec![0.0],
        };
        let mut buf = vec![];
        model.write(&mut buf).unwrap();

        assert!(matches!(
            Model::read(&mut buf.as_slice()),
            Err(MirepoixError::InvalidModel(_))
        ));
    }
}

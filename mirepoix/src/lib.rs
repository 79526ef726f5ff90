#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Mirepoix
//!
//! Mirepoix finds ingredient mentions in recipe text with a linear-chain conditional random
//! field and retrieves recipes matching a list of ingredients.
//!
//! ## Examples
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::{prelude::*, stdin, BufReader};
//!
//! use mirepoix::{load_corpus, Model, Query, SearchContext};
//!
//! let mut f = BufReader::new(File::open("model.bin").unwrap());
//! let model = Model::read(&mut f).unwrap();
//! let corpus = load_corpus("recipes.csv").unwrap();
//! let context = SearchContext::new(model, corpus);
//!
//! for line in stdin().lock().lines() {
//!     for result in context.search(&Query::new(line.unwrap(), 3, false)) {
//!         println!("{}: {}", result.name, result.ingredients);
//!     }
//! }
//! ```
//!
//! Training requires **crate feature** `train`. For more details, see [`Trainer`].

pub mod errors;

mod context;
mod feature;
mod label;
mod lattice;
mod matcher;
mod model;
mod predictor;
mod recipe;
mod sentence;
mod tagger;

#[cfg(feature = "train")]
mod dataset;
#[cfg(feature = "train")]
mod evaluation;
#[cfg(feature = "train")]
mod optimizer;
#[cfg(feature = "train")]
mod trainer;
#[cfg(feature = "train")]
mod utils;

pub use context::{SearchContext, SearchResult};
pub use feature::{extract_features, minimal_features, FeatureMap, FeatureValue};
pub use label::{encode_labels, RawTags, TagSet, INGREDIENT, OUTSIDE};
pub use matcher::{match_recipes, Query, DEFAULT_LIMIT, QUERY_SEPARATOR};
pub use model::Model;
pub use predictor::Predictor;
pub use recipe::{load_corpus, read_csv, read_jsonl, CorpusFormat, Recipe};
pub use sentence::{Sentence, Token};
pub use tagger::{RuleTagger, Tagger};

#[cfg(feature = "train")]
pub use dataset::{sample, train_test_split};
#[cfg(feature = "train")]
pub use evaluation::{flat_accuracy, flat_classification_report, ClassificationReport, LabelScore};
#[cfg(feature = "train")]
pub use trainer::{fit, LabeledSequence, TrainParams, Trainer};

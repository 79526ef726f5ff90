use tracing::{debug, info};

use crate::errors::{MirepoixError, Result};
use crate::feature::{extract_features, FeatureMap};
use crate::label::{encode_labels, TagSet, OUTSIDE};
use crate::lattice::Lattice;
use crate::model::{AttributeWeights, Model};
use crate::optimizer::{self, LbfgsParams, Objective};
use crate::sentence::Sentence;
use crate::utils::Indexer;

/// Hyperparameters of CRF training.
#[derive(Clone, Debug)]
pub struct TrainParams {
    /// L1 regularization coefficient.
    pub c1: f64,

    /// L2 regularization coefficient.
    pub c2: f64,

    /// Maximum number of L-BFGS iterations.
    pub max_iterations: usize,

    /// If `true`, every label pair gets a transition weight. Otherwise only label pairs seen
    /// in the training data are learned and all other transitions keep a zero score.
    pub all_possible_transitions: bool,

    /// Number of correction pairs kept by L-BFGS.
    pub num_memories: usize,

    /// Convergence tolerance of the gradient norm.
    pub epsilon: f64,

    /// Distance in iterations of the objective improvement test.
    pub period: usize,

    /// Minimum relative improvement of the objective over `period` iterations.
    pub delta: f64,

    /// Maximum number of trial steps per line search.
    pub max_linesearch: usize,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            c1: 0.1,
            c2: 0.1,
            max_iterations: 100,
            all_possible_transitions: true,
            num_memories: 6,
            epsilon: 1e-5,
            period: 10,
            delta: 1e-5,
            max_linesearch: 20,
        }
    }
}

impl TrainParams {
    fn lbfgs(&self) -> LbfgsParams {
        LbfgsParams {
            num_memories: self.num_memories,
            epsilon: self.epsilon,
            period: self.period,
            delta: self.delta,
            max_iterations: self.max_iterations,
            max_linesearch: self.max_linesearch,
            c1: self.c1,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.c1.is_nan() || self.c1 < 0.0 {
            return Err(MirepoixError::invalid_argument("c1", "must be non-negative"));
        }
        if self.c2.is_nan() || self.c2 < 0.0 {
            return Err(MirepoixError::invalid_argument("c2", "must be non-negative"));
        }
        if self.num_memories == 0 {
            return Err(MirepoixError::invalid_argument(
                "num_memories",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Feature maps of one sequence together with its gold labels.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabeledSequence {
    pub features: Vec<FeatureMap>,
    pub labels: Vec<String>,
}

impl LabeledSequence {
    pub fn new(features: Vec<FeatureMap>, labels: Vec<String>) -> Self {
        Self { features, labels }
    }

    /// Extracts features of a tagged sentence and labels its tokens with the recipe tags.
    pub fn from_sentence(sentence: &Sentence, tag_set: &TagSet) -> Self {
        Self {
            features: extract_features(sentence, tag_set),
            labels: encode_labels(sentence, tag_set)
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

struct Instance {
    items: Vec<Vec<(usize, f64)>>,
    labels: Vec<usize>,
}

/// Training data indexed for optimization.
struct Problem {
    classes: Vec<String>,
    attributes: Vec<String>,
    instances: Vec<Instance>,

    /// Pairs of a label and a feature ID for each attribute.
    state_features: Vec<Vec<(usize, usize)>>,

    /// Feature ID of each label pair, `[prev * n_labels + cur]`. Pairs without a feature keep
    /// a fixed zero score.
    transition_features: Vec<Option<usize>>,

    n_features: usize,
}

impl Problem {
    fn objective(&self, c2: f64) -> CrfObjective<'_> {
        CrfObjective {
            problem: self,
            c2,
            transitions: vec![0.0; self.transition_features.len()],
        }
    }

    fn into_model(self, x: &[f64]) -> Result<Model> {
        let mut attributes: Vec<_> = self
            .attributes
            .into_iter()
            .zip(&self.state_features)
            .filter_map(|(attribute, refs)| {
                let mut weights: Vec<_> = refs
                    .iter()
                    .filter(|&&(_, fid)| x[fid] != 0.0)
                    .map(|&(y, fid)| (y as u32, x[fid]))
                    .collect();
                if weights.is_empty() {
                    return None;
                }
                weights.sort_unstable_by_key(|&(y, _)| y);
                Some(AttributeWeights { attribute, weights })
            })
            .collect();
        attributes.sort_unstable_by(|a, b| a.attribute.cmp(&b.attribute));
        let transitions = self
            .transition_features
            .iter()
            .map(|fid| fid.map_or(0.0, |fid| x[fid]))
            .collect();
        Model::new(self.classes, attributes, transitions)
    }
}

/// Negative conditional log-likelihood with the L2 penalty.
struct CrfObjective<'a> {
    problem: &'a Problem,
    c2: f64,
    transitions: Vec<f64>,
}

impl CrfObjective<'_> {
    fn fill_lattice(&self, lattice: &mut Lattice<'_>, inst: &Instance, x: &[f64]) {
        for (t, item) in inst.items.iter().enumerate() {
            for &(aid, v) in item {
                for &(y, fid) in &self.problem.state_features[aid] {
                    lattice.add_state(t, y, x[fid] * v);
                }
            }
        }
    }
}

impl Objective for CrfObjective<'_> {
    fn evaluate(&mut self, x: &[f64], g: &mut [f64]) -> f64 {
        let problem = self.problem;
        let n_labels = problem.classes.len();
        for (score, fid) in self.transitions.iter_mut().zip(&problem.transition_features) {
            *score = fid.map_or(0.0, |fid| x[fid]);
        }
        g.fill(0.0);

        let mut loss = 0.0;
        for inst in &problem.instances {
            let mut lattice = Lattice::new(n_labels, inst.labels.len(), &self.transitions);
            self.fill_lattice(&mut lattice, inst, x);
            let marginals = lattice.marginals();
            loss += marginals.log_z - lattice.path_score(&inst.labels);

            for (t, item) in inst.items.iter().enumerate() {
                let gold = inst.labels[t];
                for &(aid, v) in item {
                    for &(y, fid) in &problem.state_features[aid] {
                        let observed = if y == gold { 1.0 } else { 0.0 };
                        g[fid] += v * (marginals.state[t * n_labels + y] - observed);
                    }
                }
            }
            for (expected, fid) in marginals.transition.iter().zip(&problem.transition_features) {
                if let Some(fid) = *fid {
                    g[fid] += expected;
                }
            }
            for w in inst.labels.windows(2) {
                if let Some(fid) = problem.transition_features[w[0] * n_labels + w[1]] {
                    g[fid] -= 1.0;
                }
            }
        }

        if self.c2 > 0.0 {
            for (gi, xi) in g.iter_mut().zip(x) {
                loss += self.c2 * xi * xi;
                *gi += 2.0 * self.c2 * xi;
            }
        }
        loss
    }
}

/// CRF trainer.
///
/// # Examples
///
/// ```
/// use mirepoix::{LabeledSequence, Sentence, TagSet, TrainParams, Trainer};
///
/// let tags: TagSet = ["salt"].into_iter().collect();
/// let mut trainer = Trainer::new();
/// for text in ["Add/VERB salt/NOUN", "Stir/VERB well/ADV", "Taste/VERB the/DET salt/NOUN"] {
///     let seq = LabeledSequence::from_sentence(&Sentence::from_tagged(text).unwrap(), &tags);
///     trainer.push_sequence(&seq.features, &seq.labels).unwrap();
/// }
/// let model = trainer.train(&TrainParams::default()).unwrap();
///
/// assert_eq!(&["ING", "O"], model.classes());
/// ```
pub struct Trainer {
    attributes: Indexer<String>,
    labels: Indexer<String>,
    instances: Vec<Instance>,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Trainer {
    /// Creates an empty trainer.
    ///
    /// The label `O` is always part of the label set, even if no training token carries it.
    pub fn new() -> Self {
        let mut labels = Indexer::new();
        labels.get_id(OUTSIDE);
        Self {
            attributes: Indexer::new(),
            labels,
            instances: vec![],
        }
    }

    /// Adds a labeled sequence to the dataset.
    ///
    /// Empty sequences carry no information and are skipped.
    ///
    /// # Errors
    ///
    /// [`MirepoixError::DataIntegrity`] will be returned if the numbers of feature maps and
    /// labels differ.
    pub fn push_sequence<S>(&mut self, features: &[FeatureMap], labels: &[S]) -> Result<()>
    where
        S: AsRef<str>,
    {
        if features.len() != labels.len() {
            return Err(MirepoixError::data_integrity(format!(
                "sequence has {} feature maps but {} labels",
                features.len(),
                labels.len()
            )));
        }
        if features.is_empty() {
            debug!("skipped an empty sequence");
            return Ok(());
        }
        let mut items = Vec::with_capacity(features.len());
        for map in features {
            let mut item = vec![];
            for (name, value) in map {
                if let Some((attr, v)) = value.to_attribute(name) {
                    item.push((self.attributes.get_id(&*attr), v));
                }
            }
            items.push(item);
        }
        let labels = labels
            .iter()
            .map(|l| self.labels.get_id(l.as_ref()))
            .collect();
        self.instances.push(Instance { items, labels });
        Ok(())
    }

    /// Gets the number of non-empty sequences.
    pub fn n_sequences(&self) -> usize {
        self.instances.len()
    }

    /// Gets the number of distinct attributes.
    pub fn n_attributes(&self) -> usize {
        self.attributes.len()
    }

    /// Gets the number of distinct labels.
    pub fn n_labels(&self) -> usize {
        self.labels.len()
    }

    fn into_problem(self, all_possible_transitions: bool) -> Problem {
        // Labels are renumbered in lexicographic order.
        let old_labels = self.labels.into_keys();
        let n_labels = old_labels.len();
        let mut order: Vec<usize> = (0..n_labels).collect();
        order.sort_unstable_by(|&a, &b| old_labels[a].cmp(&old_labels[b]));
        let mut new_ids = vec![0; n_labels];
        for (new_id, &old_id) in order.iter().enumerate() {
            new_ids[old_id] = new_id;
        }
        let classes = order.iter().map(|&i| old_labels[i].clone()).collect();

        let mut instances = self.instances;
        for inst in &mut instances {
            for y in &mut inst.labels {
                *y = new_ids[*y];
            }
        }

        let attributes = self.attributes.into_keys();
        let mut n_features = 0;
        let mut state_features: Vec<Vec<(usize, usize)>> = vec![vec![]; attributes.len()];
        for inst in &instances {
            for (item, &y) in inst.items.iter().zip(&inst.labels) {
                for &(aid, _) in item {
                    let refs = &mut state_features[aid];
                    if !refs.iter().any(|&(label, _)| label == y) {
                        refs.push((y, n_features));
                        n_features += 1;
                    }
                }
            }
        }

        let mut transition_features = vec![None; n_labels * n_labels];
        if all_possible_transitions {
            for fid in &mut transition_features {
                *fid = Some(n_features);
                n_features += 1;
            }
        } else {
            for inst in &instances {
                for w in inst.labels.windows(2) {
                    let fid = &mut transition_features[w[0] * n_labels + w[1]];
                    if fid.is_none() {
                        *fid = Some(n_features);
                        n_features += 1;
                    }
                }
            }
        }

        Problem {
            classes,
            attributes,
            instances,
            state_features,
            transition_features,
            n_features,
        }
    }

    /// Trains a model.
    ///
    /// # Arguments
    ///
    /// * `params` - Hyperparameters.
    ///
    /// # Returns
    ///
    /// A trained model.
    ///
    /// # Errors
    ///
    /// [`MirepoixError::InvalidArgument`] will be returned if no sequence has been given or
    /// a parameter is out of range.
    pub fn train(self, params: &TrainParams) -> Result<Model> {
        params.validate()?;
        if self.instances.is_empty() {
            return Err(MirepoixError::invalid_argument(
                "sequences",
                "no non-empty sequence was given",
            ));
        }
        let problem = self.into_problem(params.all_possible_transitions);
        info!(
            n_sequences = problem.instances.len(),
            n_labels = problem.classes.len(),
            n_attributes = problem.attributes.len(),
            n_features = problem.n_features,
            "start training"
        );

        let mut x = vec![0.0; problem.n_features];
        let (termination, loss) = {
            let mut objective = problem.objective(params.c2);
            optimizer::minimize(&mut objective, &mut x, &params.lbfgs())
        };
        let active = x.iter().filter(|&&w| w != 0.0).count();
        info!(%termination, loss, active_features = active, "finished training");

        problem.into_model(&x)
    }
}

/// Trains a model from labeled sequences.
///
/// # Errors
///
/// See [`Trainer::push_sequence`] and [`Trainer::train`].
pub fn fit<'a, I>(sequences: I, params: &TrainParams) -> Result<Model>
where
    I: IntoIterator<Item = &'a LabeledSequence>,
{
    let mut trainer = Trainer::new();
    for seq in sequences {
        trainer.push_sequence(&seq.features, &seq.labels)?;
    }
    trainer.train(params)
}

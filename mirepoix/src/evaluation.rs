//! Token-level evaluation of label sequences.

use std::fmt;

use crate::errors::{MirepoixError, Result};

/// Scores of one label.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl LabelScore {
    fn new(label: String, n_true_pos: usize, n_pred: usize, support: usize) -> Self {
        let precision = ratio(n_true_pos, n_pred);
        let recall = ratio(n_true_pos, support);
        Self {
            label,
            precision,
            recall,
            f1: f1(precision, recall),
            support,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Per-label precision, recall and F1 over all tokens of all sequences.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationReport {
    scores: Vec<LabelScore>,
    micro: LabelScore,
    macro_avg: LabelScore,
    weighted: LabelScore,
    digits: usize,
}

impl ClassificationReport {
    /// Scores of the evaluated labels, in the requested order.
    pub fn scores(&self) -> &[LabelScore] {
        &self.scores
    }

    /// Scores computed from the pooled counts of all evaluated labels.
    pub fn micro_avg(&self) -> &LabelScore {
        &self.micro
    }

    /// Unweighted mean of the per-label scores.
    pub fn macro_avg(&self) -> &LabelScore {
        &self.macro_avg
    }

    /// Mean of the per-label scores weighted by support.
    pub fn weighted_avg(&self) -> &LabelScore {
        &self.weighted
    }

    /// Sets the number of decimal digits used by [`fmt::Display`].
    pub fn with_digits(mut self, digits: usize) -> Self {
        self.digits = digits;
        self
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let width = self
            .scores
            .iter()
            .map(|s| s.label.chars().count())
            .max()
            .unwrap_or(0)
            .max("weighted avg".len());
        let digits = self.digits;
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        let row = |f: &mut fmt::Formatter, s: &LabelScore| {
            writeln!(
                f,
                "{:>width$}  {:>9.digits$} {:>9.digits$} {:>9.digits$} {:>9}",
                s.label, s.precision, s.recall, s.f1, s.support
            )
        };
        for s in &self.scores {
            row(f, s)?;
        }
        writeln!(f)?;
        row(f, &self.micro)?;
        row(f, &self.macro_avg)?;
        row(f, &self.weighted)
    }
}

fn check_lengths<S>(y_true: &[Vec<S>], y_pred: &[Vec<S>]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(MirepoixError::data_integrity(format!(
            "{} reference sequences but {} predicted sequences",
            y_true.len(),
            y_pred.len()
        )));
    }
    for (i, (t, p)) in y_true.iter().zip(y_pred).enumerate() {
        if t.len() != p.len() {
            return Err(MirepoixError::data_integrity(format!(
                "sequence {} has {} reference labels but {} predicted labels",
                i,
                t.len(),
                p.len()
            )));
        }
    }
    Ok(())
}

/// Builds a classification report over the flattened label sequences.
///
/// Only `labels` are reported; the others (typically `O`) still count as wrong predictions
/// of the reported labels.
///
/// # Errors
///
/// [`MirepoixError::DataIntegrity`] will be returned if the shapes of `y_true` and `y_pred`
/// differ.
///
/// # Examples
///
/// ```
/// use mirepoix::flat_classification_report;
///
/// let y_true = vec![vec!["O", "ING", "ING"]];
/// let y_pred = vec![vec!["O", "ING", "O"]];
/// let report = flat_classification_report(&y_true, &y_pred, &["ING"]).unwrap();
///
/// assert_eq!(1.0, report.scores()[0].precision);
/// assert_eq!(0.5, report.scores()[0].recall);
/// ```
pub fn flat_classification_report<S, L>(
    y_true: &[Vec<S>],
    y_pred: &[Vec<S>],
    labels: &[L],
) -> Result<ClassificationReport>
where
    S: AsRef<str>,
    L: AsRef<str>,
{
    check_lengths(y_true, y_pred)?;
    let n = labels.len();
    let mut n_true_pos = vec![0; n];
    let mut n_pred = vec![0; n];
    let mut support = vec![0; n];
    let position = |y: &S| labels.iter().position(|l| l.as_ref() == y.as_ref());
    for (t, p) in y_true.iter().flatten().zip(y_pred.iter().flatten()) {
        let ti = position(t);
        let pi = position(p);
        if let Some(i) = ti {
            support[i] += 1;
        }
        if let Some(i) = pi {
            n_pred[i] += 1;
            if ti == pi {
                n_true_pos[i] += 1;
            }
        }
    }

    let scores: Vec<_> = labels
        .iter()
        .enumerate()
        .map(|(i, l)| LabelScore::new(l.as_ref().to_string(), n_true_pos[i], n_pred[i], support[i]))
        .collect();
    let total_support: usize = support.iter().sum();
    let micro = LabelScore::new(
        "micro avg".to_string(),
        n_true_pos.iter().sum(),
        n_pred.iter().sum(),
        total_support,
    );
    let mean = |name: &str, weight: &dyn Fn(&LabelScore) -> f64| {
        let total: f64 = scores.iter().map(weight).sum();
        let avg = |value: fn(&LabelScore) -> f64| {
            if total == 0.0 {
                0.0
            } else {
                scores.iter().map(|s| value(s) * weight(s)).sum::<f64>() / total
            }
        };
        LabelScore {
            label: name.to_string(),
            precision: avg(|s| s.precision),
            recall: avg(|s| s.recall),
            f1: avg(|s| s.f1),
            support: total_support,
        }
    };
    let macro_avg = mean("macro avg", &|_| 1.0);
    let weighted = mean("weighted avg", &|s| s.support as f64);

    Ok(ClassificationReport {
        scores,
        micro,
        macro_avg,
        weighted,
        digits: 2,
    })
}

/// Computes the ratio of correctly labeled tokens over all sequences.
///
/// Returns zero for an empty input.
///
/// # Errors
///
/// [`MirepoixError::DataIntegrity`] will be returned if the shapes of `y_true` and `y_pred`
/// differ.
pub fn flat_accuracy<S>(y_true: &[Vec<S>], y_pred: &[Vec<S>]) -> Result<f64>
where
    S: AsRef<str>,
{
    check_lengths(y_true, y_pred)?;
    let mut total = 0;
    let mut correct = 0;
    for (t, p) in y_true.iter().flatten().zip(y_pred.iter().flatten()) {
        total += 1;
        if t.as_ref() == p.as_ref() {
            correct += 1;
        }
    }
    Ok(ratio(correct, total))
}

//! Scoring lattice of a linear-chain CRF.
//!
//! A lattice holds the emission scores of one sequence (`len × n_labels`, row-major) and
//! borrows the transition scores (`n_labels × n_labels`, indexed `[prev * n_labels + cur]`).
//! A transition score of negative infinity forbids that label pair.

/// Computes `log(sum(exp(x)))` without overflow.
#[cfg(feature = "train")]
pub(crate) fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max + xs.iter().map(|&x| (x - max).exp()).sum::<f64>().ln()
}

/// Expected feature counts of one sequence.
#[cfg(feature = "train")]
#[derive(Debug)]
pub(crate) struct Marginals {
    /// Logarithm of the partition function.
    pub log_z: f64,

    /// Probability of each label at each position (`len × n_labels`).
    pub state: Vec<f64>,

    /// Expected number of occurrences of each label pair (`n_labels × n_labels`).
    pub transition: Vec<f64>,
}

pub(crate) struct Lattice<'a> {
    n_labels: usize,
    len: usize,
    state: Vec<f64>,
    transition: &'a [f64],
}

impl<'a> Lattice<'a> {
    pub fn new(n_labels: usize, len: usize, transition: &'a [f64]) -> Self {
        debug_assert_eq!(n_labels * n_labels, transition.len());
        Self {
            n_labels,
            len,
            state: vec![0.0; len * n_labels],
            transition,
        }
    }

    /// Adds `score` to the emission score of `label` at position `t`.
    #[inline(always)]
    pub fn add_state(&mut self, t: usize, label: usize, score: f64) {
        self.state[t * self.n_labels + label] += score;
    }

    #[inline(always)]
    fn trans(&self, prev: usize, cur: usize) -> f64 {
        self.transition[prev * self.n_labels + cur]
    }

    /// Computes the unnormalized log score of a label path.
    #[cfg(any(test, feature = "train"))]
    pub fn path_score(&self, path: &[usize]) -> f64 {
        let mut score = 0.0;
        for (t, &y) in path.iter().enumerate() {
            score += self.state[t * self.n_labels + y];
            if t > 0 {
                score += self.trans(path[t - 1], y);
            }
        }
        score
    }

    /// Finds the highest scoring label path.
    ///
    /// Labels are compared by index, and a candidate replaces the current best one only if
    /// it scores strictly higher. Ties therefore resolve to the smallest index.
    ///
    /// # Returns
    ///
    /// The best path and its score.
    pub fn viterbi(&self) -> (Vec<usize>, f64) {
        let l = self.n_labels;
        if self.len == 0 {
            return (vec![], 0.0);
        }
        let mut score = self.state[..l].to_vec();
        let mut back = vec![0; self.len * l];
        let mut next = vec![0.0; l];
        for t in 1..self.len {
            for (j, next_score) in next.iter_mut().enumerate() {
                let mut best = score[0] + self.trans(0, j);
                let mut best_i = 0;
                for (i, &s) in score.iter().enumerate().skip(1) {
                    let v = s + self.trans(i, j);
                    if v > best {
                        best = v;
                        best_i = i;
                    }
                }
                *next_score = best + self.state[t * l + j];
                back[t * l + j] = best_i;
            }
            std::mem::swap(&mut score, &mut next);
        }
        let mut best_j = 0;
        for j in 1..l {
            if score[j] > score[best_j] {
                best_j = j;
            }
        }
        let best_score = score[best_j];
        let mut path = vec![0; self.len];
        path[self.len - 1] = best_j;
        for t in (1..self.len).rev() {
            path[t - 1] = back[t * l + path[t]];
        }
        (path, best_score)
    }

    /// Runs the forward-backward algorithm in log space.
    #[cfg(feature = "train")]
    pub fn marginals(&self) -> Marginals {
        let l = self.n_labels;
        let n = self.len;
        let mut state = vec![0.0; n * l];
        let mut transition = vec![0.0; l * l];
        if n == 0 {
            return Marginals {
                log_z: 0.0,
                state,
                transition,
            };
        }

        let mut buf = vec![0.0; l];
        let mut alpha = vec![0.0; n * l];
        alpha[..l].copy_from_slice(&self.state[..l]);
        for t in 1..n {
            for j in 0..l {
                for (i, b) in buf.iter_mut().enumerate() {
                    *b = alpha[(t - 1) * l + i] + self.trans(i, j);
                }
                alpha[t * l + j] = self.state[t * l + j] + log_sum_exp(&buf);
            }
        }
        let log_z = log_sum_exp(&alpha[(n - 1) * l..]);

        let mut beta = vec![0.0; n * l];
        for t in (0..n - 1).rev() {
            for i in 0..l {
                for (j, b) in buf.iter_mut().enumerate() {
                    *b = self.trans(i, j) + self.state[(t + 1) * l + j] + beta[(t + 1) * l + j];
                }
                beta[t * l + i] = log_sum_exp(&buf);
            }
        }

        if !log_z.is_finite() {
            return Marginals {
                log_z,
                state,
                transition,
            };
        }

        for (p, (a, b)) in state.iter_mut().zip(alpha.iter().zip(&beta)) {
            *p = (a + b - log_z).exp();
        }
        for t in 1..n {
            for i in 0..l {
                let a = alpha[(t - 1) * l + i];
                for j in 0..l {
                    let v = a + self.trans(i, j) + self.state[t * l + j] + beta[t * l + j];
                    transition[i * l + j] += (v - log_z).exp();
                }
            }
        }
        Marginals {
            log_z,
            state,
            transition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn all_paths(n_labels: usize, len: usize) -> Vec<Vec<usize>> {
        let mut paths = vec![vec![]];
        for _ in 0..len {
            let mut new_paths = vec![];
            for p in &paths {
                for y in 0..n_labels {
                    let mut q = p.clone();
                    q.push(y);
                    new_paths.push(q);
                }
            }
            paths = new_paths;
        }
        paths
    }

    fn sample_lattice(transition: &[f64]) -> Lattice<'_> {
        let mut lattice = Lattice::new(3, 4, transition);
        let scores = [
            [0.5, -0.2, 1.0],
            [0.1, 0.9, -1.3],
            [-0.4, 0.3, 0.2],
            [1.1, 0.0, -0.7],
        ];
        for (t, row) in scores.iter().enumerate() {
            for (y, &s) in row.iter().enumerate() {
                lattice.add_state(t, y, s);
            }
        }
        lattice
    }

    const TRANSITION: [f64; 9] = [0.2, -0.5, 0.3, 0.7, 0.1, -0.9, -0.2, 0.4, 0.0];

    #[cfg(feature = "train")]
    #[test]
    fn test_log_sum_exp() {
        assert!((log_sum_exp(&[0.0, 0.0]) - 2f64.ln()).abs() < EPS);
        assert!((log_sum_exp(&[1000.0, 1000.0]) - (1000.0 + 2f64.ln())).abs() < EPS);
        assert_eq!(f64::NEG_INFINITY, log_sum_exp(&[f64::NEG_INFINITY; 2]));
        assert!((log_sum_exp(&[f64::NEG_INFINITY, 3.0]) - 3.0).abs() < EPS);
    }

    #[test]
    fn test_viterbi_matches_exhaustive_search() {
        let lattice = sample_lattice(&TRANSITION);
        let (path, score) = lattice.viterbi();

        let mut best = f64::NEG_INFINITY;
        let mut best_path = vec![];
        for p in all_paths(3, 4) {
            let s = lattice.path_score(&p);
            if s > best {
                best = s;
                best_path = p;
            }
        }
        assert_eq!(best_path, path);
        assert!((best - score).abs() < EPS);
    }

    #[test]
    fn test_viterbi_ties_prefer_smaller_label() {
        let transition = [0.0; 4];
        let lattice = Lattice::new(2, 3, &transition);

        assert_eq!(vec![0, 0, 0], lattice.viterbi().0);
    }

    #[test]
    fn test_viterbi_forbidden_transition() {
        let transition = [0.0, f64::NEG_INFINITY, 0.0, 0.0];
        let mut lattice = Lattice::new(2, 2, &transition);
        lattice.add_state(0, 0, 1.0);
        lattice.add_state(1, 1, 1.5);

        // 0 -> 1 would score 2.5 but is forbidden.
        assert_eq!(vec![1, 1], lattice.viterbi().0);
    }

    #[test]
    fn test_viterbi_empty() {
        let transition = [0.0; 4];
        let lattice = Lattice::new(2, 0, &transition);

        assert_eq!((vec![], 0.0), lattice.viterbi());
    }

    #[cfg(feature = "train")]
    #[test]
    fn test_marginals_match_exhaustive_sum() {
        let lattice = sample_lattice(&TRANSITION);
        let m = lattice.marginals();

        let paths = all_paths(3, 4);
        let scores: Vec<f64> = paths.iter().map(|p| lattice.path_score(p)).collect();
        let log_z = log_sum_exp(&scores);
        assert!((log_z - m.log_z).abs() < EPS);

        let mut state = vec![0.0; 12];
        let mut transition = vec![0.0; 9];
        for (p, s) in paths.iter().zip(&scores) {
            let prob = (s - log_z).exp();
            for (t, &y) in p.iter().enumerate() {
                state[t * 3 + y] += prob;
                if t > 0 {
                    transition[p[t - 1] * 3 + y] += prob;
                }
            }
        }
        for (expected, actual) in state.iter().zip(&m.state) {
            assert!((expected - actual).abs() < EPS);
        }
        for (expected, actual) in transition.iter().zip(&m.transition) {
            assert!((expected - actual).abs() < EPS);
        }
    }

    #[cfg(feature = "train")]
    #[test]
    fn test_marginals_normalized() {
        let lattice = sample_lattice(&TRANSITION);
        let m = lattice.marginals();

        for t in 0..4 {
            let total: f64 = m.state[t * 3..(t + 1) * 3].iter().sum();
            assert!((total - 1.0).abs() < EPS);
        }
        let total: f64 = m.transition.iter().sum();
        assert!((total - 3.0).abs() < EPS);
    }

    #[cfg(feature = "train")]
    #[test]
    fn test_marginals_forbidden_transition() {
        let transition = [0.0, f64::NEG_INFINITY, 0.0, 0.0];
        let lattice = Lattice::new(2, 2, &transition);
        let m = lattice.marginals();

        assert!((m.log_z - 3f64.ln()).abs() < EPS);
        assert_eq!(0.0, m.transition[1]);
    }
}

//! Limited-memory BFGS.
//!
//! When an L1 coefficient is given, the orthant-wise variant (OWL-QN) is used: the search
//! direction follows the pseudo-gradient of `f(x) + c1 * |x|_1` and every trial point is
//! projected back onto the orthant of the current point, which drives weights to exact zeros.

use std::collections::VecDeque;
use std::fmt;

use tracing::debug;

/// Function to be minimized.
pub(crate) trait Objective {
    /// Evaluates the function at `x` and stores its gradient into `g`.
    fn evaluate(&mut self, x: &[f64], g: &mut [f64]) -> f64;
}

/// Parameters of [`minimize`].
#[derive(Clone, Debug)]
pub(crate) struct LbfgsParams {
    /// Number of correction pairs kept for the Hessian approximation.
    pub num_memories: usize,

    /// The run converges when `|g| / max(1, |x|) < epsilon`.
    pub epsilon: f64,

    /// Distance in iterations of the objective improvement test.
    pub period: usize,

    /// The run stops when the objective improved by less than this ratio over `period`
    /// iterations.
    pub delta: f64,

    pub max_iterations: usize,

    /// Maximum number of trial steps per line search.
    pub max_linesearch: usize,

    /// L1 regularization coefficient.
    pub c1: f64,
}

const FTOL: f64 = 1e-4;

/// Reason the optimizer stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Termination {
    Converged,
    Stalled,
    MaxIterations,
    LineSearchFailed,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Converged => write!(f, "converged"),
            Self::Stalled => write!(f, "objective stopped improving"),
            Self::MaxIterations => write!(f, "reached the maximum number of iterations"),
            Self::LineSearchFailed => write!(f, "line search failed"),
        }
    }
}

#[inline(always)]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline(always)]
fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

fn l1_norm(a: &[f64]) -> f64 {
    a.iter().map(|v| v.abs()).sum()
}

/// Computes the pseudo-gradient of `f(x) + c1 * |x|_1`.
fn pseudo_gradient(pg: &mut [f64], x: &[f64], g: &[f64], c1: f64) {
    for ((p, &xi), &gi) in pg.iter_mut().zip(x).zip(g) {
        *p = if xi < 0.0 {
            gi - c1
        } else if xi > 0.0 {
            gi + c1
        } else if gi < -c1 {
            gi + c1
        } else if gi > c1 {
            gi - c1
        } else {
            0.0
        };
    }
}

struct Correction {
    s: Vec<f64>,
    y: Vec<f64>,
    ys: f64,
    yy: f64,
}

struct LineSearch<'a> {
    params: &'a LbfgsParams,
    xp: &'a [f64],
    fx_init: f64,
    // Gradient (or pseudo-gradient) at `xp`.
    gp: &'a [f64],
}

impl LineSearch<'_> {
    /// Backtracks from `step` along `d` until the sufficient decrease condition holds.
    ///
    /// On success, `x` and `g` hold the accepted point and its gradient.
    fn run<O>(
        &self,
        obj: &mut O,
        x: &mut [f64],
        g: &mut [f64],
        d: &[f64],
        mut step: f64,
    ) -> Option<f64>
    where
        O: Objective,
    {
        let orthantwise = self.params.c1 > 0.0;
        let dginit = dot(self.gp, d);
        if dginit >= 0.0 {
            return None;
        }
        for _ in 0..self.params.max_linesearch {
            for ((xi, &xpi), &di) in x.iter_mut().zip(self.xp).zip(d) {
                *xi = xpi + step * di;
            }
            if orthantwise {
                for ((xi, &xpi), &gpi) in x.iter_mut().zip(self.xp).zip(self.gp) {
                    let sign = if xpi == 0.0 { -gpi } else { xpi };
                    if *xi * sign <= 0.0 {
                        *xi = 0.0;
                    }
                }
            }
            let mut fx = obj.evaluate(x, g);
            let dgtest = if orthantwise {
                fx += self.params.c1 * l1_norm(x);
                x.iter()
                    .zip(self.xp)
                    .zip(self.gp)
                    .map(|((xi, xpi), gpi)| (xi - xpi) * gpi)
                    .sum::<f64>()
            } else {
                step * dginit
            };
            if fx <= self.fx_init + FTOL * dgtest {
                return Some(fx);
            }
            step *= 0.5;
        }
        None
    }
}

/// Minimizes `obj` starting from `x`.
///
/// # Returns
///
/// The reason of the termination and the final objective value, including the L1 term.
/// `x` holds the best point found.
pub(crate) fn minimize<O>(obj: &mut O, x: &mut [f64], params: &LbfgsParams) -> (Termination, f64)
where
    O: Objective,
{
    let n = x.len();
    let orthantwise = params.c1 > 0.0;
    let mut g = vec![0.0; n];
    let mut fx = obj.evaluate(x, &mut g);
    let mut pg = g.clone();
    if orthantwise {
        fx += params.c1 * l1_norm(x);
        pseudo_gradient(&mut pg, x, &g, params.c1);
    }

    if norm(&pg) / norm(x).max(1.0) <= params.epsilon {
        return (Termination::Converged, fx);
    }

    let period = params.period.max(1);
    let mut past_fx = vec![fx; period];
    let mut history: VecDeque<Correction> = VecDeque::with_capacity(params.num_memories);
    let mut d: Vec<f64> = pg.iter().map(|v| -v).collect();
    let mut step = 1.0 / norm(&d);
    let mut xp = vec![0.0; n];
    let mut gp = vec![0.0; n];
    let mut pgp = vec![0.0; n];
    let mut alphas = vec![0.0; params.num_memories];

    for k in 1..=params.max_iterations {
        xp.copy_from_slice(x);
        gp.copy_from_slice(&g);
        pgp.copy_from_slice(&pg);

        let search = LineSearch {
            params,
            xp: &xp,
            fx_init: fx,
            gp: &pgp,
        };
        match search.run(obj, x, &mut g, &d, step) {
            Some(new_fx) => fx = new_fx,
            None => {
                x.copy_from_slice(&xp);
                return (Termination::LineSearchFailed, fx);
            }
        }
        if orthantwise {
            pseudo_gradient(&mut pg, x, &g, params.c1);
        } else {
            pg.copy_from_slice(&g);
        }

        let xnorm = norm(x);
        let gnorm = norm(&pg);
        debug!(
            iteration = k,
            loss = fx,
            feature_norm = xnorm,
            error_norm = gnorm,
            active_features = x.iter().filter(|&&v| v != 0.0).count(),
            "lbfgs iteration"
        );

        if gnorm / xnorm.max(1.0) <= params.epsilon {
            return (Termination::Converged, fx);
        }
        if k >= period && fx != 0.0 {
            let rate = (past_fx[k % period] - fx) / fx;
            if rate.abs() < params.delta {
                return (Termination::Stalled, fx);
            }
        }
        past_fx[k % period] = fx;
        if k == params.max_iterations {
            break;
        }

        let s: Vec<f64> = x.iter().zip(&xp).map(|(a, b)| a - b).collect();
        let y: Vec<f64> = g.iter().zip(&gp).map(|(a, b)| a - b).collect();
        let ys = dot(&y, &s);
        let yy = dot(&y, &y);
        if ys > 0.0 && yy > 0.0 {
            if history.len() == params.num_memories {
                history.pop_front();
            }
            history.push_back(Correction { s, y, ys, yy });
        }

        // Two-loop recursion.
        for (di, pgi) in d.iter_mut().zip(&pg) {
            *di = -pgi;
        }
        for (c, alpha) in history.iter().zip(alphas.iter_mut()).rev() {
            *alpha = dot(&c.s, &d) / c.ys;
            for (di, yi) in d.iter_mut().zip(&c.y) {
                *di -= *alpha * yi;
            }
        }
        if let Some(last) = history.back() {
            let scale = last.ys / last.yy;
            for di in d.iter_mut() {
                *di *= scale;
            }
        }
        for (c, alpha) in history.iter().zip(&alphas) {
            let beta = dot(&c.y, &d) / c.ys;
            for (di, si) in d.iter_mut().zip(&c.s) {
                *di += (alpha - beta) * si;
            }
        }
        if orthantwise {
            for (di, pgi) in d.iter_mut().zip(&pg) {
                if *di * pgi >= 0.0 {
                    *di = 0.0;
                }
            }
        }
        step = 1.0;
    }
    (Termination::MaxIterations, fx)
}

#[cfg(test)]
mod tests {
    use super::*;

    // f(x) = 0.5 * x^T A x - b^T x with a symmetric positive definite A.
    struct Quadratic {
        a: Vec<Vec<f64>>,
        b: Vec<f64>,
    }

    impl Objective for Quadratic {
        fn evaluate(&mut self, x: &[f64], g: &mut [f64]) -> f64 {
            let mut f = 0.0;
            for (i, gi) in g.iter_mut().enumerate() {
                let ax: f64 = self.a[i].iter().zip(x).map(|(a, x)| a * x).sum();
                *gi = ax - self.b[i];
                f += 0.5 * x[i] * ax - self.b[i] * x[i];
            }
            f
        }
    }

    // f(x) = sum((x_i - c_i)^2)
    struct Separable {
        c: Vec<f64>,
    }

    impl Objective for Separable {
        fn evaluate(&mut self, x: &[f64], g: &mut [f64]) -> f64 {
            let mut f = 0.0;
            for ((gi, xi), ci) in g.iter_mut().zip(x).zip(&self.c) {
                *gi = 2.0 * (xi - ci);
                f += (xi - ci) * (xi - ci);
            }
            f
        }
    }

    fn params(c1: f64) -> LbfgsParams {
        LbfgsParams {
            num_memories: 6,
            epsilon: 1e-6,
            period: 10,
            delta: 0.0,
            max_iterations: 200,
            max_linesearch: 40,
            c1,
        }
    }

    #[test]
    fn test_minimize_quadratic() {
        let mut obj = Quadratic {
            a: vec![vec![4.0, 1.0], vec![1.0, 3.0]],
            b: vec![1.0, 2.0],
        };
        let mut x = vec![0.0, 0.0];
        minimize(&mut obj, &mut x, &params(0.0));

        // A^-1 b = [1/11, 7/11]
        assert!((x[0] - 1.0 / 11.0).abs() < 1e-5);
        assert!((x[1] - 7.0 / 11.0).abs() < 1e-5);
    }

    #[test]
    fn test_minimize_l1_soft_threshold() {
        let mut obj = Separable {
            c: vec![3.0, -0.2, 0.1, -2.0],
        };
        let mut x = vec![0.0; 4];
        minimize(&mut obj, &mut x, &params(1.0));

        // argmin (x - c)^2 + |x| = sign(c) * max(|c| - 0.5, 0)
        assert!((x[0] - 2.5).abs() < 1e-5);
        assert_eq!(0.0, x[1]);
        assert_eq!(0.0, x[2]);
        assert!((x[3] + 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_minimize_already_optimal() {
        let mut obj = Separable { c: vec![0.0; 3] };
        let mut x = vec![0.0; 3];
        let (termination, fx) = minimize(&mut obj, &mut x, &params(0.0));

        assert_eq!(Termination::Converged, termination);
        assert_eq!(0.0, fx);
    }

    #[test]
    fn test_minimize_max_iterations() {
        let mut obj = Quadratic {
            a: vec![vec![4.0, 1.0], vec![1.0, 3.0]],
            b: vec![1.0, 2.0],
        };
        let mut x = vec![0.0, 0.0];
        let mut p = params(0.0);
        p.max_iterations = 1;
        let (termination, _) = minimize(&mut obj, &mut x, &p);

        assert_eq!(Termination::MaxIterations, termination);
    }

    #[test]
    fn test_pseudo_gradient() {
        let mut pg = vec![0.0; 5];
        pseudo_gradient(
            &mut pg,
            &[1.0, -1.0, 0.0, 0.0, 0.0],
            &[0.5, 0.5, -2.0, 2.0, 0.3],
            1.0,
        );

        assert_eq!(vec![1.5, -0.5, -1.0, 1.0, 0.0], pg);
    }
}

//! Reproducible sampling and splitting of datasets.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::errors::{MirepoixError, Result};

/// Draws a random subset of `items`.
///
/// The result holds `round(frac * n)` items in shuffled order; the same seed always selects
/// the same items.
///
/// # Errors
///
/// [`MirepoixError::InvalidArgument`] will be returned unless `0 < frac <= 1`.
pub fn sample<T>(mut items: Vec<T>, frac: f64, seed: u64) -> Result<Vec<T>> {
    if !(frac > 0.0 && frac <= 1.0) {
        return Err(MirepoixError::invalid_argument(
            "sample_frac",
            "must be in the range (0, 1]",
        ));
    }
    let n = (items.len() as f64 * frac).round() as usize;
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
    items.truncate(n);
    Ok(items)
}

/// Shuffles `items` and splits them into a training part and a test part.
///
/// The test part holds `ceil(test_size * n)` items.
///
/// # Returns
///
/// A tuple `(train, test)`.
///
/// # Errors
///
/// [`MirepoixError::InvalidArgument`] will be returned unless `0 < test_size < 1`, or if the
/// training part would be empty.
pub fn train_test_split<T>(
    mut items: Vec<T>,
    test_size: f64,
    seed: u64,
) -> Result<(Vec<T>, Vec<T>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(MirepoixError::invalid_argument(
            "test_size",
            "must be in the range (0, 1)",
        ));
    }
    let n = items.len();
    let n_test = (n as f64 * test_size).ceil() as usize;
    if n_test >= n {
        return Err(MirepoixError::invalid_argument(
            "test_size",
            format!("{} items leave no training data", n),
        ));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
    let train = items.split_off(n_test);
    debug!(n_train = train.len(), n_test, "split dataset");
    Ok((train, items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_size() {
        let items: Vec<usize> = (0..10).collect();

        assert_eq!(5, sample(items.clone(), 0.5, 42).unwrap().len());
        assert_eq!(3, sample(items.clone(), 0.25, 42).unwrap().len());
        assert_eq!(10, sample(items, 1.0, 42).unwrap().len());
    }

    #[test]
    fn test_sample_is_reproducible() {
        let items: Vec<usize> = (0..100).collect();

        assert_eq!(
            sample(items.clone(), 0.3, 42).unwrap(),
            sample(items, 0.3, 42).unwrap()
        );
    }

    #[test]
    fn test_sample_invalid_fraction() {
        assert_eq!(
            "InvalidArgumentError: sample_frac: must be in the range (0, 1]",
            sample(vec![1, 2, 3], 0.0, 42).unwrap_err().to_string()
        );
        assert!(sample(vec![1, 2, 3], 1.5, 42).is_err());
        assert!(sample(vec![1, 2, 3], f64::NAN, 42).is_err());
    }

    #[test]
    fn test_train_test_split_sizes() {
        let items: Vec<usize> = (0..11).collect();
        let (train, test) = train_test_split(items, 0.2, 42).unwrap();

        assert_eq!(8, train.len());
        assert_eq!(3, test.len());

        let mut all: Vec<_> = train.into_iter().chain(test).collect();
        all.sort_unstable();
        assert_eq!((0..11).collect::<Vec<_>>(), all);
    }

    #[test]
    fn test_train_test_split_is_reproducible() {
        let items: Vec<usize> = (0..50).collect();

        assert_eq!(
            train_test_split(items.clone(), 0.3, 7).unwrap(),
            train_test_split(items, 0.3, 7).unwrap()
        );
    }

    #[test]
    fn test_train_test_split_too_small() {
        assert_eq!(
            "InvalidArgumentError: test_size: 1 items leave no training data",
            train_test_split(vec![1], 0.2, 42).unwrap_err().to_string()
        );
        assert!(train_test_split(Vec::<usize>::new(), 0.2, 42).is_err());
    }
}

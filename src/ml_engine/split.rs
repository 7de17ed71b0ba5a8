//! Seeded train/test split

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::PipelineError;

/// Row indices of the two partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Number of rows held out for testing: `ceil(n * test_fraction)`, kept
/// within `1..n` so neither partition is empty.
pub fn test_size(n: usize, test_fraction: f64) -> usize {
    let raw = (n as f64 * test_fraction).ceil() as usize;
    raw.clamp(1, n.saturating_sub(1).max(1))
}

/// Shuffle `0..n` with a seeded RNG and cut it into train and test indices.
///
/// Identical `(n, test_fraction, seed)` always yields the same split.
pub fn train_test_split(
    n: usize,
    test_fraction: f64,
    seed: u64,
    min_rows: usize,
) -> Result<SplitIndices, PipelineError> {
    let required = min_rows.max(2);
    if n < required {
        return Err(PipelineError::InsufficientData { rows: n, required });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = test_size(n, test_fraction);
    let train = indices.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: indices,
    })
}

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;

use crate::tensor::Tensor;

#[derive(Error, Debug)]
pub enum InitError {
    #[error("invalid normal distribution: {0}")]
    Distribution(#[from] rand_distr::NormalError),
    #[error("empty truncation interval [{lower}, {upper}]")]
    EmptyInterval { lower: f32, upper: f32 },
}

/// Weight-initialization strategy injected into layers at construction.
///
/// Anything offering this operation can stand in for [`RandomInit`], e.g. a
/// pretrained-weight loader built on [`Tensor::fill`].
pub trait Initializer {
    /// Fill every element with an independent draw from
    /// `Normal(mean, stddev)`, redrawing any sample outside
    /// `[lower, upper]`. Sampling is done in `f32`, the storage precision.
    fn fill_truncated_normal(
        &mut self,
        tensor: &mut Tensor<f32>,
        stddev: f32,
        mean: f32,
        lower: f32,
        upper: f32,
    ) -> Result<(), InitError>;
}

/// Default initializer, backed by a [`StdRng`].
pub struct RandomInit {
    rng: StdRng,
}

impl RandomInit {
    /// Seeds from OS entropy, so separate runs do not produce bit-identical
    /// weights.
    pub fn new() -> Self {
        RandomInit {
            rng: StdRng::from_entropy(),
        }
    }

    /// Fixed seed for reproducible fills.
    pub fn with_seed(seed: u64) -> Self {
        RandomInit {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomInit {
    fn default() -> Self {
        Self::new()
    }
}

impl Initializer for RandomInit {
    fn fill_truncated_normal(
        &mut self,
        tensor: &mut Tensor<f32>,
        stddev: f32,
        mean: f32,
        lower: f32,
        upper: f32,
    ) -> Result<(), InitError> {
        // A degenerate interval could make the rejection loop spin forever.
        if !(lower < upper) {
            return Err(InitError::EmptyInterval { lower, upper });
        }
        let normal = Normal::new(mean, stddev)?;
        for element in tensor.as_mut_slice() {
            *element = loop {
                let sample = normal.sample(&mut self.rng);
                if sample >= lower && sample <= upper {
                    break sample;
                }
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_stay_in_bounds() {
        let mut init = RandomInit::with_seed(42);
        let mut t = Tensor::new(&[8, 16]);
        init.fill_truncated_normal(&mut t, 3.0, 0.0, -0.5, 0.5)
            .unwrap();
        assert!(t.as_slice().iter().all(|&v| (-0.5..=0.5).contains(&v)));
    }

    #[test]
    fn test_seed_reproducibility() {
        let mut a = Tensor::new(&[4, 4]);
        let mut b = Tensor::new(&[4, 4]);
        RandomInit::with_seed(7)
            .fill_truncated_normal(&mut a, 1.0, 0.0, -2.0, 2.0)
            .unwrap();
        RandomInit::with_seed(7)
            .fill_truncated_normal(&mut b, 1.0, 0.0, -2.0, 2.0)
            .unwrap();
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn test_nonzero_mean() {
        let mut init = RandomInit::with_seed(1);
        let mut t = Tensor::new(&[64]);
        init.fill_truncated_normal(&mut t, 0.1, 5.0, 4.0, 6.0)
            .unwrap();
        assert!(t.as_slice().iter().all(|&v| (4.0..=6.0).contains(&v)));
        let mean: f32 = t.as_slice().iter().sum::<f32>() / 64.0;
        assert!((mean - 5.0).abs() < 0.5);
    }

    #[test]
    fn test_invalid_parameters() {
        let mut init = RandomInit::with_seed(0);
        let mut t = Tensor::new(&[4]);
        assert!(matches!(
            init.fill_truncated_normal(&mut t, 1.0, 0.0, 2.0, -2.0),
            Err(InitError::EmptyInterval { .. })
        ));
        assert!(matches!(
            init.fill_truncated_normal(&mut t, -1.0, 0.0, -2.0, 2.0),
            Err(InitError::Distribution(_))
        ));
    }
}

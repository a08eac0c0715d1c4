use rand::thread_rng;
use rand_distr::{Distribution, Normal};

use super::ActionDistribution;
use crate::policy::{ActionSampler, ScoreFunction};

/// A normal distribution over a continuous action, parameterized by `[mean, std]`
///
/// The policy approximator for `std` should have a positive output activation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Gaussian;

impl ScoreFunction<f64> for Gaussian {
    fn score(&self, action: &f64, params: &[f64]) -> Vec<f64> {
        let (mean, std) = (params[0], params[1]);
        let dev = action - mean;
        let var = std * std;
        vec![dev / var, (dev * dev - var) / (var * std)]
    }
}

impl ActionSampler<f64> for Gaussian {
    /// **Panics** if `std` is negative or not finite
    fn sample(&self, params: &[f64], n: usize) -> Vec<f64> {
        let dist = Normal::new(params[0], params[1])
            .expect("standard deviation must be finite and non-negative");
        let mut rng = thread_rng();
        (0..n).map(|_| dist.sample(&mut rng)).collect()
    }
}

impl ActionDistribution<f64> for Gaussian {
    fn num_params(&self) -> usize {
        2
    }
}

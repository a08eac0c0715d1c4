use rand::{distributions::Distribution, thread_rng};

use super::ActionDistribution;
use crate::policy::{ActionSampler, ScoreFunction};

/// A distribution over two actions, parameterized by the probability `p` of `on`
#[derive(Debug, Clone, PartialEq)]
pub struct Bernoulli<A> {
    on: A,
    off: A,
}

impl<A> Bernoulli<A> {
    pub fn new(on: A, off: A) -> Self {
        Self { on, off }
    }
}

impl<A: PartialEq> ScoreFunction<A> for Bernoulli<A> {
    /// ∂/∂p log P(action) is `1/p` for `on` and `1/(p - 1)` for `off`
    fn score(&self, action: &A, params: &[f64]) -> Vec<f64> {
        let p = params[0];
        if *action == self.on {
            vec![1.0 / p]
        } else {
            vec![1.0 / (p - 1.0)]
        }
    }
}

impl<A: Clone> ActionSampler<A> for Bernoulli<A> {
    /// `p` is clamped to `[0, 1]`
    fn sample(&self, params: &[f64], n: usize) -> Vec<A> {
        let dist = rand::distributions::Bernoulli::new(params[0].clamp(0.0, 1.0))
            .expect("`p` is clamped to [0, 1]");
        let mut rng = thread_rng();
        (0..n)
            .map(|_| {
                if dist.sample(&mut rng) {
                    self.on.clone()
                } else {
                    self.off.clone()
                }
            })
            .collect()
    }
}

impl<A: Clone + PartialEq> ActionDistribution<A> for Bernoulli<A> {
    fn num_params(&self) -> usize {
        1
    }
}

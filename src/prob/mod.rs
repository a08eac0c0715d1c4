use crate::policy::{ActionSampler, ScoreFunction};

mod bernoulli;
mod gaussian;

pub use bernoulli::Bernoulli;
pub use gaussian::Gaussian;

/// A parametric action distribution usable by a policy gradient learner
///
/// It both samples actions given its parameters and provides the score (the
/// gradient of the log-probability of an action with respect to the parameters).
pub trait ActionDistribution<A>: ScoreFunction<A> + ActionSampler<A> {
    /// Number of distribution parameters, i.e. of policy approximators needed
    fn num_params(&self) -> usize;
}

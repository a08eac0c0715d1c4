/// Implemented RL algorithms
pub mod algo;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Markov decision process abstraction
pub mod env;

/// Episode rollouts
pub mod episode;

/// Function approximation
pub mod fa;

/// Stochastic policies and their collaborators
pub mod policy;

/// Parametric action distributions
pub mod prob;

/// Testing environments
#[cfg(feature = "gym")]
pub mod gym;

mod error;
mod util;

pub use error::Error;

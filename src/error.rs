use thiserror::Error;

/// Errors raised while constructing the crate's building blocks
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A decay schedule whose endpoints disagree with the sign of its rate
    #[error("`vi - vf` must have same sign as `rate` (rate: {rate}, vi: {vi}, vf: {vf})")]
    InvalidDecay { rate: f64, vi: f64, vf: f64 },

    /// A function approximator spec without any input features
    #[error("a function approximator needs at least one feature function")]
    NoFeatures,

    /// Action weights that do not form a distribution
    #[error("invalid action distribution: {0}")]
    InvalidDistribution(String),

    /// A finite MDP table that is not a valid probability model
    #[error("invalid MDP: {0}")]
    InvalidMdp(String),
}

use std::{collections::HashMap, hash::Hash};

use rand::{
    distributions::{Distribution, WeightedIndex},
    thread_rng,
};

use crate::{fa::FuncApprox, Error};

/// Draws a requested number of actions from a fixed action distribution
pub type Sampler<'a, A> = Box<dyn Fn(usize) -> Vec<A> + 'a>;

/// A stochastic policy
///
/// Binding the policy to a state does the per-state work once; the returned
/// [`Sampler`] can then be asked for any number of actions.
pub trait Policy<S, A> {
    fn at(&self, state: &S) -> Sampler<'_, A>;
}

/// Gradient of the log-probability of an action with respect to the parameters of
/// the distribution it was drawn from
///
/// Returns one component per distribution parameter.
pub trait ScoreFunction<A> {
    fn score(&self, action: &A, params: &[f64]) -> Vec<f64>;
}

impl<A, F> ScoreFunction<A> for F
where
    F: Fn(&A, &[f64]) -> Vec<f64>,
{
    fn score(&self, action: &A, params: &[f64]) -> Vec<f64> {
        self(action, params)
    }
}

/// Draws `n` actions from the distribution described by `params`
pub trait ActionSampler<A> {
    fn sample(&self, params: &[f64], n: usize) -> Vec<A>;
}

impl<A, F> ActionSampler<A> for F
where
    F: Fn(&[f64], usize) -> Vec<A>,
{
    fn sample(&self, params: &[f64], n: usize) -> Vec<A> {
        self(params, n)
    }
}

/// The policy represented by a set of distribution-parameter approximators
///
/// Approximator `i` maps a state to the `i`-th parameter of the action
/// distribution at that state.
pub struct StochasticPolicy<'a, S, A> {
    pol_fa: &'a [Box<dyn FuncApprox<S>>],
    sampler: &'a dyn ActionSampler<A>,
}

impl<'a, S, A> StochasticPolicy<'a, S, A> {
    pub fn new(pol_fa: &'a [Box<dyn FuncApprox<S>>], sampler: &'a dyn ActionSampler<A>) -> Self {
        Self { pol_fa, sampler }
    }

    /// Distribution parameters at `state`
    pub fn params(&self, state: &S) -> Vec<f64> {
        pdf_params(self.pol_fa, state)
    }
}

impl<S, A> Policy<S, A> for StochasticPolicy<'_, S, A> {
    fn at(&self, state: &S) -> Sampler<'_, A> {
        let params = self.params(state);
        let sampler = self.sampler;
        Box::new(move |n| sampler.sample(&params, n))
    }
}

pub(crate) fn pdf_params<S>(pol_fa: &[Box<dyn FuncApprox<S>>], state: &S) -> Vec<f64> {
    pol_fa.iter().map(|f| f.evaluate(state)).collect()
}

/// A policy given as an explicit action distribution per state
#[derive(Debug, Clone)]
pub struct TabularPolicy<S, A> {
    table: HashMap<S, (Vec<A>, WeightedIndex<f64>)>,
}

impl<S, A> TabularPolicy<S, A>
where
    S: Eq + Hash,
{
    /// **Errors** with [`Error::InvalidDistribution`] if a state's weights are empty,
    /// negative or all zero
    pub fn new(table: HashMap<S, Vec<(A, f64)>>) -> Result<Self, Error> {
        let table = table
            .into_iter()
            .map(|(s, entries)| {
                let (actions, weights): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
                let dist = WeightedIndex::new(weights)
                    .map_err(|e| Error::InvalidDistribution(e.to_string()))?;
                Ok((s, (actions, dist)))
            })
            .collect::<Result<_, Error>>()?;
        Ok(Self { table })
    }
}

impl<S, A> Policy<S, A> for TabularPolicy<S, A>
where
    S: Eq + Hash,
    A: Clone,
{
    /// **Panics** if `state` is not in the table
    fn at(&self, state: &S) -> Sampler<'_, A> {
        let (actions, dist) = self
            .table
            .get(state)
            .unwrap_or_else(|| panic!("No action distribution for the given state"));
        Box::new(move |n| {
            let mut rng = thread_rng();
            (0..n)
                .map(|_| actions[dist.sample(&mut rng)].clone())
                .collect()
        })
    }
}

/// Empirical distribution of a sample of actions
///
/// Actions are listed in the order they first appear in `actions`.
pub fn action_probs<A: PartialEq>(actions: Vec<A>) -> Vec<(A, f64)> {
    let n = actions.len() as f64;
    let mut counts: Vec<(A, usize)> = Vec::new();
    for a in actions {
        match counts.iter_mut().find(|(b, _)| *b == a) {
            Some((_, c)) => *c += 1,
            None => counts.push((a, 1)),
        }
    }
    counts.into_iter().map(|(a, c)| (a, c as f64 / n)).collect()
}

/// The most probable action, preferring the earliest entry among ties
pub fn greedy_action<A>(probs: Vec<(A, f64)>) -> Option<A> {
    probs
        .into_iter()
        .reduce(|best, next| if next.1 > best.1 { next } else { best })
        .map(|(a, _)| a)
}

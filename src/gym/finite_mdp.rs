use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
};

use rand::{
    distributions::{Distribution, WeightedIndex},
    seq::SliceRandom,
    thread_rng,
};

use crate::{env::MdpRep, Error};

const PROB_TOLERANCE: f64 = 1e-8;

/// Transition table of a finite MDP: state → action → next state → `(probability, reward)`
pub type MdpTable<S, A> = HashMap<S, HashMap<A, HashMap<S, (f64, f64)>>>;

#[derive(Debug, Clone)]
struct Row<S> {
    /// `(next_state, reward)`
    outcomes: Vec<(S, f64)>,
    dist: WeightedIndex<f64>,
}

/// An MDP with finitely many states and actions, given by its full transition table
///
/// A state is terminal when every action leads back to it with probability 1 and
/// reward 0. Episodes start from a uniformly drawn non-terminal state.
#[derive(Debug, Clone)]
pub struct FiniteMdp<S, A> {
    rows: HashMap<S, HashMap<A, Row<S>>>,
    non_terminal: Vec<S>,
    terminal: HashSet<S>,
    gamma: f64,
}

impl<S, A> FiniteMdp<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone + Eq + Hash,
{
    /// **Errors** with [`Error::InvalidMdp`] if `gamma` is not in `(0, 1]`, a state has no
    /// actions, a transition leads to an unknown state, probabilities do not sum to
    /// 1, or every state is terminal
    pub fn new(table: MdpTable<S, A>, gamma: f64) -> Result<Self, Error> {
        if !(gamma > 0.0 && gamma <= 1.0) {
            return Err(Error::InvalidMdp(format!(
                "discount factor {gamma} is not in (0, 1]"
            )));
        }

        let mut rows = HashMap::with_capacity(table.len());
        let mut non_terminal = Vec::new();
        let mut terminal = HashSet::new();

        for (state, actions) in &table {
            if actions.is_empty() {
                return Err(Error::InvalidMdp("a state has no actions".into()));
            }

            let mut state_rows = HashMap::with_capacity(actions.len());
            let mut absorbing = true;
            for (action, transitions) in actions {
                let mut outcomes = Vec::with_capacity(transitions.len());
                let mut probs = Vec::with_capacity(transitions.len());
                for (next, &(prob, reward)) in transitions {
                    if !table.contains_key(next) {
                        return Err(Error::InvalidMdp(
                            "a transition leads to an unknown state".into(),
                        ));
                    }
                    absorbing &= next == state && reward == 0.0;
                    outcomes.push((next.clone(), reward));
                    probs.push(prob);
                }

                let total: f64 = probs.iter().sum();
                if (total - 1.0).abs() > PROB_TOLERANCE {
                    return Err(Error::InvalidMdp(format!(
                        "transition probabilities sum to {total}"
                    )));
                }
                let dist =
                    WeightedIndex::new(probs).map_err(|e| Error::InvalidMdp(e.to_string()))?;
                state_rows.insert(action.clone(), Row { outcomes, dist });
            }

            if absorbing {
                terminal.insert(state.clone());
            } else {
                non_terminal.push(state.clone());
            }
            rows.insert(state.clone(), state_rows);
        }

        if non_terminal.is_empty() {
            return Err(Error::InvalidMdp("every state is terminal".into()));
        }

        Ok(Self {
            rows,
            non_terminal,
            terminal,
            gamma,
        })
    }

    /// Actions available in `state`, in no particular order
    pub fn actions(&self, state: &S) -> Vec<A> {
        self.rows
            .get(state)
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Non-terminal states, in no particular order
    pub fn non_terminal_states(&self) -> &[S] {
        &self.non_terminal
    }
}

impl<S, A> MdpRep for FiniteMdp<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone + Eq + Hash,
{
    type State = S;
    type Action = A;

    fn gamma(&self) -> f64 {
        self.gamma
    }

    fn init_state(&self) -> S {
        self.non_terminal
            .choose(&mut thread_rng())
            .cloned()
            .expect("There is always at least one non-terminal state")
    }

    fn is_terminal(&self, state: &S) -> bool {
        self.terminal.contains(state)
    }

    /// **Panics** if the state-action pair is not in the table
    fn step(&self, state: &S, action: &A) -> (S, f64) {
        let row = self
            .rows
            .get(state)
            .and_then(|r| r.get(action))
            .unwrap_or_else(|| panic!("Unknown state-action pair"));
        let (next, reward) = &row.outcomes[row.dist.sample(&mut thread_rng())];
        (next.clone(), *reward)
    }
}

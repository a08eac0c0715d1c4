/// Represents a Markov decision process as seen by a model-free learner
///
/// The learner never inspects the dynamics directly: it can only draw an initial
/// state, ask whether a state is terminal, and sample a transition.
pub trait MdpRep {
    /// A representation of the state of the process
    ///
    /// States are stored for the length of an episode, so cloning should be cheap.
    type State: Clone;

    /// A representation of an action that an agent can take
    type Action: Clone + PartialEq;

    /// The discount factor γ, in the interval `(0, 1]`
    fn gamma(&self) -> f64;

    /// Sample a state to start an episode from
    fn init_state(&self) -> Self::State;

    /// Determine if a state is terminal
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Sample the response of the process to taking `action` in `state`
    ///
    /// **Returns** `(next_state, reward)`
    fn step(&self, state: &Self::State, action: &Self::Action) -> (Self::State, f64);
}

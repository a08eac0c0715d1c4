use log::trace;

use crate::env::MdpRep;

/// A single transition observed during a rollout
///
/// ### Type parameters
/// - `S`: State
/// - `A`: Action
#[derive(Debug, Clone, PartialEq)]
pub struct Exp<S, A> {
    /// The state the action was taken in
    pub state: S,
    /// The action taken in `state`
    pub action: A,
    /// The reward received after taking the action
    pub reward: f64,
    /// The state of the process after the action is taken
    pub next_state: S,
}

/// The ordered transitions of one episode
pub type Episode<S, A> = Vec<Exp<S, A>>;

/// Roll out one episode of `mdp`, choosing actions with `act`
///
/// The episode starts from [`MdpRep::init_state`] and ends once `max_steps`
/// transitions were taken or the state just acted from is terminal. At least one
/// transition is always recorded.
pub fn rollout<M, F>(mdp: &M, max_steps: usize, mut act: F) -> Episode<M::State, M::Action>
where
    M: MdpRep,
    F: FnMut(&M::State) -> M::Action,
{
    let mut episode = Vec::new();
    let mut state = mdp.init_state();

    loop {
        let action = act(&state);
        let (next_state, reward) = mdp.step(&state, &action);
        let terminate = episode.len() + 1 >= max_steps || mdp.is_terminal(&state);
        episode.push(Exp {
            state,
            action,
            reward,
            next_state: next_state.clone(),
        });
        if terminate {
            break;
        }
        state = next_state;
    }

    trace!(
        "Episode finished after {} steps, return {:.4}",
        episode.len(),
        total_reward(&episode)
    );
    episode
}

/// Undiscounted sum of the rewards of an episode
pub fn total_reward<S, A>(episode: &[Exp<S, A>]) -> f64 {
    episode.iter().map(|e| e.reward).sum()
}

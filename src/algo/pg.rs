use log::{debug, info};

use crate::{
    assert_interval,
    env::MdpRep,
    episode::{rollout, total_reward},
    fa::{ApproxSpec, FuncApprox, Gradient},
    policy::{
        action_probs, greedy_action, pdf_params, ActionSampler, Policy, ScoreFunction,
        StochasticPolicy,
    },
    util::{powers, transpose_iter},
};

/// Configuration for the [`PolicyGradient`] learner
///
/// Every field is required; there are no defaults.
pub struct PolicyGradientConfig<M: MdpRep> {
    /// The process to learn from
    pub mdp: M,
    /// Number of episodes whose policy gradients are averaged into one update
    pub batch_size: usize,
    /// Number of policy updates
    pub num_batches: usize,
    /// Upper bound on the length of an episode
    pub max_steps: usize,
    /// Trace decay λ of the actor
    pub actor_lambda: f64,
    /// Trace decay λ of the critic
    pub critic_lambda: f64,
    /// Score of an action under the distribution parameters it was drawn with
    pub score_func: Box<dyn ScoreFunction<M::Action>>,
    /// Sampler of actions given distribution parameters
    pub action_sampler: Box<dyn ActionSampler<M::Action>>,
    /// Builds the value and action-value approximators
    pub fa_spec: Box<dyn ApproxSpec<M::State, M::Action>>,
    /// Builds one approximator per distribution parameter
    pub pol_fa_specs: Vec<Box<dyn ApproxSpec<M::State, M::Action>>>,
}

/// Actor-critic policy gradient with eligibility traces
///
/// The critic is a state-value approximator trained by TD(λ). The actor is a set of
/// approximators, one per parameter of the action distribution, trained by
/// gradient ascent on the expected return, with the TD error as the advantage
/// estimate.
///
/// ### Generics
/// - `M` - The [`MdpRep`] the learner samples episodes from
pub struct PolicyGradient<M: MdpRep> {
    mdp: M,
    batch_size: usize,
    num_batches: usize,
    max_steps: usize,
    actor_lambda: f64,
    critic_lambda: f64,
    score_func: Box<dyn ScoreFunction<M::Action>>,
    action_sampler: Box<dyn ActionSampler<M::Action>>,
    vf_fa: Box<dyn FuncApprox<M::State>>,
    qvf_fa: Box<dyn FuncApprox<(M::State, M::Action)>>,
    pol_fa: Vec<Box<dyn FuncApprox<M::State>>>,
}

/// A learned action-value function, evaluated one state at a time
pub struct ActValueFunc<'a, S, A> {
    qvf_fa: &'a dyn FuncApprox<(S, A)>,
}

impl<'a, S: Clone + 'a, A: Clone + 'a> ActValueFunc<'a, S, A> {
    /// Q(`state`, ·)
    pub fn at(&self, state: &S) -> impl Fn(&A) -> f64 + 'a {
        let qvf_fa = self.qvf_fa;
        let state = state.clone();
        move |action: &A| qvf_fa.evaluate(&(state.clone(), action.clone()))
    }
}

impl<M: MdpRep> PolicyGradient<M> {
    /// Number of actions sampled per state when extracting a deterministic policy
    pub const NUM_ACTION_SAMPLES: usize = 100;

    /// Initialize a new `PolicyGradient` learner, building its approximators from the
    /// specs in `config`
    ///
    /// **Panics** if `batch_size`, `num_batches` or `max_steps` is zero, if
    /// `actor_lambda` or `critic_lambda` is not in the interval `[0,1]`, or if no
    /// policy approximator spec is given
    pub fn new(config: PolicyGradientConfig<M>) -> Self {
        assert!(config.batch_size > 0, "`batch_size` must be positive");
        assert!(config.num_batches > 0, "`num_batches` must be positive");
        assert!(config.max_steps > 0, "`max_steps` must be positive");
        assert_interval!(config.actor_lambda, 0.0, 1.0);
        assert_interval!(config.critic_lambda, 0.0, 1.0);
        assert!(
            !config.pol_fa_specs.is_empty(),
            "At least one policy approximator spec is required"
        );

        info!(
            "Policy gradient: {} batches of {} episodes, at most {} steps each, {} policy parameters",
            config.num_batches,
            config.batch_size,
            config.max_steps,
            config.pol_fa_specs.len()
        );

        Self {
            vf_fa: config.fa_spec.vf_approx(),
            qvf_fa: config.fa_spec.qvf_approx(),
            pol_fa: config.pol_fa_specs.iter().map(|s| s.vf_approx()).collect(),
            mdp: config.mdp,
            batch_size: config.batch_size,
            num_batches: config.num_batches,
            max_steps: config.max_steps,
            actor_lambda: config.actor_lambda,
            critic_lambda: config.critic_lambda,
            score_func: config.score_func,
            action_sampler: config.action_sampler,
        }
    }

    /// The process episodes are sampled from
    pub fn mdp(&self) -> &M {
        &self.mdp
    }

    /// Current critic estimate of the value of `state`
    pub fn state_value(&self, state: &M::State) -> f64 {
        self.vf_fa.evaluate(state)
    }

    /// Estimate the state-value function of `policy` by TD(λ)
    ///
    /// Runs `num_batches * batch_size` episodes and updates the critic after each one
    /// with its eligibility-trace loss gradient averaged over the episode's steps.
    pub fn value_func(
        &mut self,
        policy: &dyn Policy<M::State, M::Action>,
    ) -> impl Fn(&M::State) -> f64 + '_ {
        self.fit_value_func(Some(policy));
        let vf_fa = &self.vf_fa;
        move |s: &M::State| vf_fa.evaluate(s)
    }

    /// Estimate the state-value function of the learned stochastic policy, as
    /// [`value_func`](Self::value_func) would for [`stoch_policy`](Self::stoch_policy)
    pub fn learned_policy_value_func(&mut self) -> impl Fn(&M::State) -> f64 + '_ {
        self.fit_value_func(None);
        let vf_fa = &self.vf_fa;
        move |s: &M::State| vf_fa.evaluate(s)
    }

    /// Estimate the action-value function of `policy` by TD(λ)
    ///
    /// Targets bootstrap from the state-value approximator, not from the action-value
    /// approximator being trained.
    pub fn act_value_func(
        &mut self,
        policy: &dyn Policy<M::State, M::Action>,
    ) -> ActValueFunc<'_, M::State, M::Action> {
        self.fit_act_value_func(Some(policy));
        ActValueFunc {
            qvf_fa: self.qvf_fa.as_ref(),
        }
    }

    /// Estimate the action-value function of the learned stochastic policy, as
    /// [`act_value_func`](Self::act_value_func) would for
    /// [`stoch_policy`](Self::stoch_policy)
    pub fn learned_policy_act_value_func(&mut self) -> ActValueFunc<'_, M::State, M::Action> {
        self.fit_act_value_func(None);
        ActValueFunc {
            qvf_fa: self.qvf_fa.as_ref(),
        }
    }

    /// TD(λ) updates of the critic; `None` follows the learned stochastic policy
    fn fit_value_func(&mut self, policy: Option<&dyn Policy<M::State, M::Action>>) {
        let learned;
        let policy: &dyn Policy<M::State, M::Action> = match policy {
            Some(p) => p,
            None => {
                learned = StochasticPolicy::new(&self.pol_fa, self.action_sampler.as_ref());
                &learned
            }
        };

        let gamma = self.mdp.gamma();
        for _ in 0..self.num_batches * self.batch_size {
            let episode = rollout(&self.mdp, self.max_steps, |s| first_action(policy.at(s)(1)));
            let states = episode.iter().map(|e| e.state.clone()).collect::<Vec<_>>();
            let targets = episode
                .iter()
                .map(|e| e.reward + gamma * self.vf_fa.evaluate(&e.next_state))
                .collect::<Vec<_>>();

            let mut grad = self
                .vf_fa
                .el_tr_sum_loss_gradient(&states, &targets, gamma * self.critic_lambda);
            grad /= states.len() as f64;
            self.vf_fa.update_params_from_gradient(&grad);
        }
    }

    /// TD(λ) updates of the action-value approximator; `None` follows the learned
    /// stochastic policy
    fn fit_act_value_func(&mut self, policy: Option<&dyn Policy<M::State, M::Action>>) {
        let learned;
        let policy: &dyn Policy<M::State, M::Action> = match policy {
            Some(p) => p,
            None => {
                learned = StochasticPolicy::new(&self.pol_fa, self.action_sampler.as_ref());
                &learned
            }
        };

        let gamma = self.mdp.gamma();
        for _ in 0..self.num_batches * self.batch_size {
            let episode = rollout(&self.mdp, self.max_steps, |s| first_action(policy.at(s)(1)));
            let pairs = episode
                .iter()
                .map(|e| (e.state.clone(), e.action.clone()))
                .collect::<Vec<_>>();
            let targets = episode
                .iter()
                .map(|e| e.reward + gamma * self.vf_fa.evaluate(&e.next_state))
                .collect::<Vec<_>>();

            let mut grad = self
                .qvf_fa
                .el_tr_sum_loss_gradient(&pairs, &targets, gamma * self.critic_lambda);
            grad /= pairs.len() as f64;
            self.qvf_fa.update_params_from_gradient(&grad);
        }
    }

    /// The stochastic policy currently represented by the policy approximators
    pub fn stoch_policy(&self) -> StochasticPolicy<'_, M::State, M::Action> {
        StochasticPolicy::new(&self.pol_fa, self.action_sampler.as_ref())
    }

    /// Train actor and critic together, returning the learned stochastic policy
    ///
    /// The critic is updated after every episode; the actor gradients are summed over
    /// a batch of episodes and their average is applied once per batch.
    pub fn optimal_stoch_policy(&mut self) -> StochasticPolicy<'_, M::State, M::Action> {
        for batch in 0..self.num_batches {
            let mut pol_grads = self
                .pol_fa
                .iter()
                .map(|f| f.zero_gradient())
                .collect::<Vec<_>>();
            let (mut steps, mut returns) = (0, 0.0);

            for _ in 0..self.batch_size {
                let (len, ret) = self.train_episode(&mut pol_grads);
                steps += len;
                returns += ret;
            }

            for (fa, mut grad) in self.pol_fa.iter_mut().zip(pol_grads) {
                grad /= self.batch_size as f64;
                fa.update_params_from_gradient(&grad);
            }

            debug!(
                "Batch {}/{}: mean episode length {:.2}, mean return {:.4}",
                batch + 1,
                self.num_batches,
                steps as f64 / self.batch_size as f64,
                returns / self.batch_size as f64
            );
        }

        self.stoch_policy()
    }

    /// Roll out one episode under the current policy, update the critic, and add the
    /// episode's policy gradients to `pol_grads`
    ///
    /// **Returns** the episode's length and undiscounted return
    fn train_episode(&mut self, pol_grads: &mut [Gradient]) -> (usize, f64) {
        let gamma = self.mdp.gamma();
        let mut gamma_pow = 1.0;
        let mut disc_scores = Vec::new();

        let episode = {
            let (pol_fa, sampler, score_func) =
                (&self.pol_fa, &self.action_sampler, &self.score_func);
            rollout(&self.mdp, self.max_steps, |s| {
                let params = pdf_params(pol_fa, s);
                let action = first_action(sampler.sample(&params, 1));
                let score = score_func.score(&action, &params);
                assert_eq!(
                    score.len(),
                    pol_fa.len(),
                    "The score function must return one component per policy approximator"
                );
                disc_scores.push(score.into_iter().map(|x| gamma_pow * x).collect::<Vec<_>>());
                gamma_pow *= gamma;
                action
            })
        };

        let states = episode.iter().map(|e| e.state.clone()).collect::<Vec<_>>();
        let neg_deltas = episode
            .iter()
            .map(|e| {
                let delta = e.reward + gamma * self.vf_fa.evaluate(&e.next_state)
                    - self.vf_fa.evaluate(&e.state);
                -delta
            })
            .collect::<Vec<_>>();

        let critic_grad = self.vf_fa.el_tr_sum_objective_gradient(
            &states,
            &powers(gamma, states.len()),
            &neg_deltas,
            gamma * self.critic_lambda,
        );
        self.vf_fa.update_params_from_gradient(&critic_grad);

        for ((fa, acc), weights) in self
            .pol_fa
            .iter()
            .zip(pol_grads.iter_mut())
            .zip(transpose_iter(&disc_scores))
        {
            *acc += &fa.el_tr_sum_objective_gradient(
                &states,
                &weights,
                &neg_deltas,
                gamma * self.actor_lambda,
            );
        }

        (episode.len(), total_reward(&episode))
    }

    /// Train actor and critic, then act greedily with respect to the empirical
    /// action frequencies of the learned stochastic policy
    ///
    /// Each query draws [`NUM_ACTION_SAMPLES`](Self::NUM_ACTION_SAMPLES) actions; ties
    /// go to the action sampled first.
    pub fn optimal_det_policy(&mut self) -> impl Fn(&M::State) -> M::Action + '_ {
        let policy = self.optimal_stoch_policy();
        move |s: &M::State| {
            let actions = policy.at(s)(Self::NUM_ACTION_SAMPLES);
            greedy_action(action_probs(actions)).expect("The sampler returns at least one action")
        }
    }
}

fn first_action<A>(actions: Vec<A>) -> A {
    actions
        .into_iter()
        .next()
        .expect("The action sampler must return the requested number of actions")
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        rc::Rc,
    };

    use ndarray::array;

    use super::*;
    use crate::{
        episode::tests::Corridor,
        fa::{DnnSpec, FeatureFn, FuncApproxSpec, OptimizerSpec},
        prob::Bernoulli,
    };

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Loss {
            role: &'static str,
            len: usize,
            targets: Vec<f64>,
            decay: f64,
        },
        Objective {
            role: &'static str,
            weights: Vec<f64>,
            signed: Vec<f64>,
            decay: f64,
        },
        Update {
            role: &'static str,
            grad: Gradient,
        },
    }

    type Log = Rc<RefCell<Vec<Call>>>;

    /// A constant function whose gradient routines replay a fixed list of gradients
    struct MockFa {
        role: &'static str,
        value: f64,
        grads: Vec<Gradient>,
        calls: Cell<usize>,
        params: Rc<RefCell<Gradient>>,
        log: Log,
    }

    impl MockFa {
        fn next_grad(&self) -> Gradient {
            let k = self.calls.get();
            self.calls.set(k + 1);
            self.grads[k % self.grads.len()].clone()
        }
    }

    impl<X> FuncApprox<X> for MockFa {
        fn evaluate(&self, _x: &X) -> f64 {
            self.value
        }

        fn gradient(&self, _x: &X) -> Gradient {
            self.zero_gradient_shape()
        }

        fn zero_gradient(&self) -> Gradient {
            self.zero_gradient_shape()
        }

        fn update_params_from_gradient(&mut self, gradient: &Gradient) {
            self.params.borrow_mut().add_scaled(-1.0, gradient);
            self.log.borrow_mut().push(Call::Update {
                role: self.role,
                grad: gradient.clone(),
            });
        }

        fn el_tr_sum_loss_gradient(&self, xs: &[X], targets: &[f64], decay: f64) -> Gradient {
            self.log.borrow_mut().push(Call::Loss {
                role: self.role,
                len: xs.len(),
                targets: targets.to_vec(),
                decay,
            });
            self.next_grad()
        }

        fn el_tr_sum_objective_gradient(
            &self,
            xs: &[X],
            weights: &[f64],
            signed: &[f64],
            decay: f64,
        ) -> Gradient {
            assert_eq!(xs.len(), weights.len());
            self.log.borrow_mut().push(Call::Objective {
                role: self.role,
                weights: weights.to_vec(),
                signed: signed.to_vec(),
                decay,
            });
            self.next_grad()
        }
    }

    impl MockFa {
        fn zero_gradient_shape(&self) -> Gradient {
            Gradient::zeros(&[[1, 2]])
        }
    }

    struct MockSpec {
        role: &'static str,
        value: f64,
        grads: Vec<Gradient>,
        params: Rc<RefCell<Gradient>>,
        log: Log,
    }

    impl MockSpec {
        fn new(role: &'static str, value: f64, grads: Vec<Gradient>, log: &Log) -> Self {
            Self {
                role,
                value,
                grads,
                params: Rc::new(RefCell::new(Gradient::new(vec![array![[1.0, -1.0]]]))),
                log: Rc::clone(log),
            }
        }

        fn build(&self, role: &'static str) -> MockFa {
            MockFa {
                role,
                value: self.value,
                grads: self.grads.clone(),
                calls: Cell::new(0),
                params: Rc::clone(&self.params),
                log: Rc::clone(&self.log),
            }
        }
    }

    impl<S, A> ApproxSpec<S, A> for MockSpec {
        fn vf_approx(&self) -> Box<dyn FuncApprox<S>> {
            Box::new(self.build(self.role))
        }

        fn qvf_approx(&self) -> Box<dyn FuncApprox<(S, A)>> {
            Box::new(self.build("qvf"))
        }
    }

    fn grad(a: f64, b: f64) -> Gradient {
        Gradient::new(vec![array![[a, b]]])
    }

    fn corridor_config(
        mdp: Corridor,
        fa_spec: MockSpec,
        pol_fa_specs: Vec<MockSpec>,
    ) -> PolicyGradientConfig<Corridor> {
        PolicyGradientConfig {
            mdp,
            batch_size: 1,
            num_batches: 1,
            max_steps: 3,
            actor_lambda: 0.6,
            critic_lambda: 0.8,
            score_func: Box::new(|_: &i32, _: &[f64]| vec![1.0, 2.0]),
            action_sampler: Box::new(|_: &[f64], n: usize| vec![1; n]),
            fa_spec: Box::new(fa_spec),
            pol_fa_specs: pol_fa_specs
                .into_iter()
                .map(|s| Box::new(s) as Box<dyn ApproxSpec<i32, i32>>)
                .collect(),
        }
    }

    fn objectives(log: &Log, role: &str) -> Vec<(Vec<f64>, Vec<f64>, f64)> {
        log.borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Objective {
                    role: r,
                    weights,
                    signed,
                    decay,
                } if *r == role => Some((weights.clone(), signed.clone(), *decay)),
                _ => None,
            })
            .collect()
    }

    fn updates(log: &Log, role: &str) -> Vec<Gradient> {
        log.borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Update { role: r, grad } if *r == role => Some(grad.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn discounted_scores_and_negated_deltas() {
        let log = Log::default();
        let zero = vec![grad(0.0, 0.0)];
        let mut config = corridor_config(
            Corridor::new(1000, 0.5),
            MockSpec::new("vf", 2.0, zero.clone(), &log),
            vec![
                MockSpec::new("pol0", 0.25, zero.clone(), &log),
                MockSpec::new("pol1", 0.75, zero, &log),
            ],
        );
        config.score_func = Box::new(|_: &i32, p: &[f64]| {
            assert_eq!(p, &[0.25, 0.75]);
            vec![1.0, 2.0]
        });
        let mut pg = PolicyGradient::new(config);
        pg.optimal_stoch_policy();

        // Rewards are the visited states 0, 1, 2, so delta = r + 0.5 * 2 - 2 = r - 1
        let neg_deltas = vec![1.0, 0.0, -1.0];
        assert_eq!(
            objectives(&log, "vf"),
            vec![(vec![1.0, 0.5, 0.25], neg_deltas.clone(), 0.4)]
        );
        assert_eq!(
            objectives(&log, "pol0"),
            vec![(vec![1.0, 0.5, 0.25], neg_deltas.clone(), 0.3)]
        );
        assert_eq!(
            objectives(&log, "pol1"),
            vec![(vec![2.0, 1.0, 0.5], neg_deltas, 0.3)]
        );
    }

    #[test]
    fn actor_gradients_are_batch_averaged() {
        let log = Log::default();
        let mut config = corridor_config(
            Corridor::new(1000, 0.9),
            MockSpec::new("vf", 0.0, vec![grad(0.5, 0.5)], &log),
            vec![MockSpec::new(
                "pol0",
                0.5,
                vec![grad(1.0, 2.0), grad(3.0, -6.0)],
                &log,
            )],
        );
        config.batch_size = 2;
        config.score_func = Box::new(|_: &i32, _: &[f64]| vec![1.0]);
        let mut pg = PolicyGradient::new(config);
        pg.optimal_stoch_policy();

        assert_eq!(objectives(&log, "pol0").len(), 2);
        assert_eq!(updates(&log, "pol0"), vec![grad(2.0, -2.0)]);
        // The critic is updated after each episode, unaveraged
        assert_eq!(updates(&log, "vf"), vec![grad(0.5, 0.5), grad(0.5, 0.5)]);
    }

    #[test]
    fn one_actor_update_per_batch() {
        let log = Log::default();
        let mut config = corridor_config(
            Corridor::new(1000, 0.9),
            MockSpec::new("vf", 0.0, vec![grad(0.0, 0.0)], &log),
            vec![MockSpec::new("pol0", 0.5, vec![grad(1.0, 1.0)], &log)],
        );
        config.batch_size = 3;
        config.num_batches = 4;
        config.score_func = Box::new(|_: &i32, _: &[f64]| vec![1.0]);
        let mut pg = PolicyGradient::new(config);
        pg.optimal_stoch_policy();

        assert_eq!(updates(&log, "vf").len(), 12);
        assert_eq!(updates(&log, "pol0"), vec![grad(1.0, 1.0); 4]);
    }

    #[test]
    fn zero_gradients_leave_params() {
        let log = Log::default();
        let pol = MockSpec::new("pol0", 0.5, vec![grad(0.0, 0.0)], &log);
        let vf = MockSpec::new("vf", 1.0, vec![grad(0.0, 0.0)], &log);
        let (pol_params, vf_params) = (Rc::clone(&pol.params), Rc::clone(&vf.params));
        let before = pol_params.borrow().clone();

        let mut config = corridor_config(Corridor::new(5, 0.9), vf, vec![pol]);
        config.batch_size = 3;
        config.num_batches = 5;
        config.score_func = Box::new(|_: &i32, _: &[f64]| vec![1.0]);
        let mut pg = PolicyGradient::new(config);
        pg.optimal_stoch_policy();
        let _ = pg.value_func(&pg_fixed_policy());

        assert_eq!(updates(&log, "pol0").len(), 5);
        assert_eq!(*pol_params.borrow(), before);
        assert_eq!(*vf_params.borrow(), before);
    }

    fn pg_fixed_policy() -> impl Policy<i32, i32> {
        struct AlwaysRight;
        impl Policy<i32, i32> for AlwaysRight {
            fn at(&self, _state: &i32) -> crate::policy::Sampler<'_, i32> {
                Box::new(|n| vec![1; n])
            }
        }
        AlwaysRight
    }

    #[test]
    fn episodes_respect_max_steps_and_terminal_states() {
        let log = Log::default();
        let mut config = corridor_config(
            Corridor::new(2, 0.9),
            MockSpec::new("vf", 0.0, vec![grad(0.0, 0.0)], &log),
            vec![MockSpec::new("pol0", 0.5, vec![grad(0.0, 0.0)], &log)],
        );
        config.max_steps = 100;
        config.score_func = Box::new(|_: &i32, _: &[f64]| vec![1.0]);
        let mut pg = PolicyGradient::new(config);
        pg.optimal_stoch_policy();
        // States 0 and 1 are not terminal, 2 is acted from and found terminal
        assert_eq!(objectives(&log, "vf")[0].0.len(), 3);

        let log = Log::default();
        let mut config = corridor_config(
            Corridor::new(1000, 0.9),
            MockSpec::new("vf", 0.0, vec![grad(0.0, 0.0)], &log),
            vec![MockSpec::new("pol0", 0.5, vec![grad(0.0, 0.0)], &log)],
        );
        config.max_steps = 4;
        config.batch_size = 5;
        config.score_func = Box::new(|_: &i32, _: &[f64]| vec![1.0]);
        let mut pg = PolicyGradient::new(config);
        pg.optimal_stoch_policy();
        assert_eq!(pg.mdp().steps.get(), 20);
        assert!(objectives(&log, "vf").iter().all(|o| o.0.len() == 4));
    }

    #[test]
    fn value_func_averages_loss_gradient_per_episode() {
        let log = Log::default();
        let mut config = corridor_config(
            Corridor::new(1000, 0.5),
            MockSpec::new("vf", 2.0, vec![grad(3.0, -3.0)], &log),
            vec![MockSpec::new("pol0", 0.5, vec![grad(0.0, 0.0)], &log)],
        );
        config.batch_size = 2;
        config.num_batches = 2;
        let mut pg = PolicyGradient::new(config);
        let vf = pg.value_func(&pg_fixed_policy());
        assert_eq!(vf(&17), 2.0);

        let calls = log.borrow();
        let losses = calls
            .iter()
            .filter(|c| matches!(c, Call::Loss { .. }))
            .collect::<Vec<_>>();
        assert_eq!(losses.len(), 4);
        assert_eq!(
            losses[0],
            &Call::Loss {
                role: "vf",
                len: 3,
                targets: vec![1.0, 2.0, 3.0],
                decay: 0.4,
            }
        );
        drop(calls);
        assert_eq!(updates(&log, "vf"), vec![grad(1.0, -1.0); 4]);
        assert!(updates(&log, "qvf").is_empty());
    }

    #[test]
    fn act_value_func_bootstraps_from_state_values() {
        let log = Log::default();
        let mut config = corridor_config(
            Corridor::new(1000, 0.5),
            MockSpec::new("vf", 2.0, vec![grad(4.0, 2.0)], &log),
            vec![MockSpec::new("pol0", 0.5, vec![grad(0.0, 0.0)], &log)],
        );
        config.max_steps = 2;
        let mut pg = PolicyGradient::new(config);
        let qvf = pg.act_value_func(&pg_fixed_policy());
        assert_eq!(qvf.at(&3)(&1), 2.0);

        assert_eq!(
            log.borrow()[0],
            Call::Loss {
                role: "qvf",
                len: 2,
                targets: vec![1.0, 2.0],
                decay: 0.4,
            }
        );
        assert_eq!(updates(&log, "qvf"), vec![grad(2.0, 1.0)]);
        assert!(updates(&log, "vf").is_empty());
    }

    #[test]
    fn det_policy_picks_most_frequent_action() {
        let log = Log::default();
        let config = PolicyGradientConfig {
            mdp: Corridor::new(1000, 0.9),
            batch_size: 1,
            num_batches: 1,
            max_steps: 2,
            actor_lambda: 0.5,
            critic_lambda: 0.5,
            score_func: Box::new(Bernoulli::new(1, -1)),
            action_sampler: Box::new(Bernoulli::new(1, -1)),
            fa_spec: Box::new(MockSpec::new("vf", 0.0, vec![grad(0.0, 0.0)], &log)),
            pol_fa_specs: vec![Box::new(MockSpec::new(
                "pol0",
                0.2,
                vec![grad(0.0, 0.0)],
                &log,
            ))],
        };
        let mut pg = PolicyGradient::new(config);
        let policy = pg.optimal_det_policy();
        for s in 0..10 {
            assert_eq!(policy(&s), -1);
        }
    }

    #[test]
    fn stoch_policy_sampler_returns_requested_count() {
        let log = Log::default();
        let config = corridor_config(
            Corridor::new(1000, 0.9),
            MockSpec::new("vf", 0.0, vec![grad(0.0, 0.0)], &log),
            vec![
                MockSpec::new("pol0", 0.5, vec![grad(0.0, 0.0)], &log),
                MockSpec::new("pol1", 0.5, vec![grad(0.0, 0.0)], &log),
            ],
        );
        let pg = PolicyGradient::new(config);
        let policy = pg.stoch_policy();
        for n in [0, 1, 3, 250] {
            assert_eq!(policy.at(&0)(n).len(), n);
        }
        assert_eq!(policy.params(&0), vec![0.5, 0.5]);
    }

    #[test]
    #[should_panic(expected = "Invalid value for `config.critic_lambda`")]
    fn critic_lambda_must_be_in_unit_interval() {
        let log = Log::default();
        let mut config = corridor_config(
            Corridor::new(1000, 0.9),
            MockSpec::new("vf", 0.0, vec![grad(0.0, 0.0)], &log),
            vec![MockSpec::new("pol0", 0.5, vec![grad(0.0, 0.0)], &log)],
        );
        config.critic_lambda = 1.5;
        PolicyGradient::new(config);
    }

    #[test]
    #[should_panic(expected = "one component per policy approximator")]
    fn score_must_match_policy_approximators() {
        let log = Log::default();
        let config = corridor_config(
            Corridor::new(1000, 0.9),
            MockSpec::new("vf", 0.0, vec![grad(0.0, 0.0)], &log),
            vec![MockSpec::new("pol0", 0.5, vec![grad(0.0, 0.0)], &log)],
        );
        // The default score function returns two components
        PolicyGradient::new(config).optimal_stoch_policy();
    }

    type SeenParams = Rc<RefCell<Vec<Vec<f64>>>>;

    fn recording_sampler(seen: &SeenParams) -> Box<dyn ActionSampler<i32>> {
        let seen = Rc::clone(seen);
        Box::new(move |params: &[f64], n: usize| {
            seen.borrow_mut().push(params.to_vec());
            vec![1; n]
        })
    }

    #[test]
    fn learned_policy_drives_value_estimation() {
        let log = Log::default();
        let seen = SeenParams::default();
        let mut config = corridor_config(
            Corridor::new(1000, 0.5),
            MockSpec::new("vf", 2.0, vec![grad(3.0, -3.0)], &log),
            vec![
                MockSpec::new("pol0", 0.25, vec![grad(0.0, 0.0)], &log),
                MockSpec::new("pol1", 0.75, vec![grad(0.0, 0.0)], &log),
            ],
        );
        config.batch_size = 2;
        config.action_sampler = recording_sampler(&seen);
        let mut pg = PolicyGradient::new(config);

        let vf = pg.learned_policy_value_func();
        assert_eq!(vf(&0), 2.0);
        // Two episodes of three steps, one draw per step
        assert_eq!(*seen.borrow(), vec![vec![0.25, 0.75]; 6]);
        assert_eq!(updates(&log, "vf"), vec![grad(1.0, -1.0); 2]);
        assert!(updates(&log, "pol0").is_empty());
        assert!(updates(&log, "qvf").is_empty());
    }

    #[test]
    fn learned_policy_drives_act_value_estimation() {
        let log = Log::default();
        let seen = SeenParams::default();
        let mut config = corridor_config(
            Corridor::new(1000, 0.5),
            MockSpec::new("vf", 2.0, vec![grad(4.0, 2.0)], &log),
            vec![MockSpec::new("pol0", 0.3, vec![grad(0.0, 0.0)], &log)],
        );
        config.max_steps = 2;
        config.action_sampler = recording_sampler(&seen);
        let mut pg = PolicyGradient::new(config);

        let qvf = pg.learned_policy_act_value_func();
        assert_eq!(qvf.at(&5)(&1), 2.0);
        assert_eq!(*seen.borrow(), vec![vec![0.3]; 2]);
        assert_eq!(updates(&log, "qvf"), vec![grad(2.0, 1.0)]);
        assert!(updates(&log, "vf").is_empty());
    }

    /// A single state looping onto itself with a constant reward
    struct SelfLoop {
        reward: f64,
        gamma: f64,
    }

    impl MdpRep for SelfLoop {
        type State = ();
        type Action = ();

        fn gamma(&self) -> f64 {
            self.gamma
        }

        fn init_state(&self) {}

        fn is_terminal(&self, _state: &()) -> bool {
            false
        }

        fn step(&self, _state: &(), _action: &()) -> ((), f64) {
            ((), self.reward)
        }
    }

    fn self_loop_config(num_batches: usize) -> PolicyGradientConfig<SelfLoop> {
        let bias: Vec<FeatureFn<()>> = vec![Rc::new(|_: &()| 1.0)];
        let spec = || {
            FuncApproxSpec::new(
                bias.clone(),
                Vec::new(),
                DnnSpec::linear(),
                OptimizerSpec::sgd(0.05),
            )
            .unwrap()
        };
        PolicyGradientConfig {
            mdp: SelfLoop {
                reward: 1.0,
                gamma: 0.5,
            },
            batch_size: 1,
            num_batches,
            max_steps: 10,
            actor_lambda: 0.5,
            critic_lambda: 0.5,
            score_func: Box::new(|_: &(), _: &[f64]| vec![0.0]),
            action_sampler: Box::new(|_: &[f64], n: usize| vec![(); n]),
            fa_spec: Box::new(spec()),
            pol_fa_specs: vec![Box::new(spec())],
        }
    }

    #[test]
    fn critic_converges_on_self_loop() {
        let mut pg = PolicyGradient::new(self_loop_config(1000));
        let always = TabularAlways;
        let vf = pg.value_func(&always);
        let v = vf(&());
        assert!((v - 2.0).abs() < 1e-3, "V = {v}");
    }

    #[test]
    fn actor_critic_value_converges_on_self_loop() {
        let mut pg = PolicyGradient::new(self_loop_config(2000));
        pg.optimal_stoch_policy();
        let v = pg.state_value(&());
        assert!((v - 2.0).abs() < 1e-3, "V = {v}");
    }

    fn value_of_learned_policy<M: MdpRep>(pg: &mut PolicyGradient<M>, state: &M::State) -> f64 {
        pg.learned_policy_value_func()(state)
    }

    #[test]
    fn learned_policy_value_converges_on_self_loop() {
        let mut pg = PolicyGradient::new(self_loop_config(1000));
        pg.optimal_stoch_policy();
        let v = value_of_learned_policy(&mut pg, &());
        assert!((v - 2.0).abs() < 1e-3, "V = {v}");
    }

    struct TabularAlways;

    impl Policy<(), ()> for TabularAlways {
        fn at(&self, _state: &()) -> crate::policy::Sampler<'_, ()> {
            Box::new(|n| vec![(); n])
        }
    }
}

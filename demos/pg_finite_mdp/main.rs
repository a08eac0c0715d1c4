use std::{collections::HashMap, error::Error, rc::Rc};

use rl_pg::{
    algo::{PolicyGradient, PolicyGradientConfig},
    fa::{Activation, DnnSpec, FeatureFn, FuncApproxSpec, OptimizerSpec},
    gym::{FiniteMdp, MdpTable},
    prob::Bernoulli,
};

const STATES: [u8; 3] = [1, 2, 3];
const ACTIONS: [char; 2] = ['a', 'b'];

fn table() -> MdpTable<u8, char> {
    HashMap::from([
        (
            1,
            HashMap::from([
                (
                    'a',
                    HashMap::from([(1, (0.3, 9.2)), (2, (0.6, 4.5)), (3, (0.1, 5.0))]),
                ),
                ('b', HashMap::from([(2, (0.3, -0.5)), (3, (0.7, 2.6))])),
            ]),
        ),
        (
            2,
            HashMap::from([
                (
                    'a',
                    HashMap::from([(1, (0.3, 9.8)), (2, (0.6, 6.7)), (3, (0.1, 1.8))]),
                ),
                (
                    'b',
                    HashMap::from([(1, (0.3, 19.8)), (2, (0.6, 16.7)), (3, (0.1, 1.8))]),
                ),
            ]),
        ),
        (
            3,
            HashMap::from([
                ('a', HashMap::from([(3, (1.0, 0.0))])),
                ('b', HashMap::from([(3, (1.0, 0.0))])),
            ]),
        ),
    ])
}

fn one_hot<T: PartialEq + Copy + 'static>(values: &[T]) -> Vec<FeatureFn<T>> {
    values
        .iter()
        .map(|&v| Rc::new(move |x: &T| if *x == v { 1.0 } else { 0.0 }) as FeatureFn<T>)
        .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mdp = FiniteMdp::new(table(), 0.9)?;
    let dnn = |output_activation| DnnSpec {
        neurons: vec![2],
        hidden_activation: Activation::Relu,
        output_activation,
    };
    let critic = FuncApproxSpec::new(
        one_hot(&STATES),
        one_hot(&ACTIONS),
        dnn(Activation::Identity),
        OptimizerSpec::adam(0.1),
    )?;
    let actor = FuncApproxSpec::new(
        one_hot(&STATES),
        one_hot(&ACTIONS),
        dnn(Activation::Sigmoid),
        OptimizerSpec::adam(0.003),
    )?;

    let mut pg = PolicyGradient::new(PolicyGradientConfig {
        mdp,
        batch_size: 10,
        num_batches: 1000,
        max_steps: 100,
        actor_lambda: 0.95,
        critic_lambda: 0.95,
        score_func: Box::new(Bernoulli::new('a', 'b')),
        action_sampler: Box::new(Bernoulli::new('a', 'b')),
        fa_spec: Box::new(critic),
        pol_fa_specs: vec![Box::new(actor)],
    });

    {
        let det_policy = pg.optimal_det_policy();
        for s in STATES {
            println!("Deterministic policy at {s}: {}", det_policy(&s));
        }
    }

    let stoch_policy = pg.stoch_policy();
    for s in STATES {
        println!("Policy parameters at {s}: {:?}", stoch_policy.params(&s));
    }

    let vf = pg.learned_policy_value_func();
    for s in STATES {
        println!("Value of {s}: {:.3}", vf(&s));
    }

    Ok(())
}

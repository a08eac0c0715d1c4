use std::rc::Rc;

use ndarray::{Array2, Zip};

use super::Gradient;
use crate::decay::{self, Decay};

const ADAM_EPSILON: f64 = 1e-8;

/// Configuration of the optimizer a function approximator descends its gradients with
#[derive(Debug, Clone)]
pub enum OptimizerSpec {
    /// Plain stochastic gradient descent
    Sgd { learning_rate: Rc<dyn Decay> },
    /// Adam with bias-corrected moment estimates
    Adam {
        learning_rate: Rc<dyn Decay>,
        beta1: f64,
        beta2: f64,
    },
}

impl OptimizerSpec {
    /// Gradient descent with a constant learning rate
    pub fn sgd(learning_rate: f64) -> Self {
        Self::Sgd {
            learning_rate: Rc::new(decay::Constant::new(learning_rate)),
        }
    }

    /// Adam with a constant learning rate and the decay rates `β1 = 0.9`, `β2 = 0.99`
    pub fn adam(learning_rate: f64) -> Self {
        Self::Adam {
            learning_rate: Rc::new(decay::Constant::new(learning_rate)),
            beta1: 0.9,
            beta2: 0.99,
        }
    }

    /// Initialize the optimizer state for parameter tensors of the given shapes
    pub fn init(&self, shapes: &[[usize; 2]]) -> Optimizer {
        let moments = match self {
            Self::Sgd { .. } => None,
            Self::Adam { .. } => Some((Gradient::zeros(shapes), Gradient::zeros(shapes))),
        };
        Optimizer {
            spec: self.clone(),
            moments,
            updates: 0,
        }
    }
}

/// Optimizer state owned by a single function approximator
#[derive(Debug, Clone)]
pub struct Optimizer {
    spec: OptimizerSpec,
    moments: Option<(Gradient, Gradient)>,
    updates: u32,
}

impl Optimizer {
    /// Number of updates applied so far
    pub fn updates(&self) -> u32 {
        self.updates
    }

    /// Move `params` one step against `gradient`
    ///
    /// **Panics** if the gradient is not shaped like `params`
    pub fn step(&mut self, params: &mut [Array2<f64>], gradient: &Gradient) {
        let grads = gradient.tensors();
        assert_eq!(
            params.len(),
            grads.len(),
            "One gradient tensor per parameter"
        );
        let t = self.updates as f64;
        self.updates += 1;

        match (&self.spec, &mut self.moments) {
            (OptimizerSpec::Sgd { learning_rate }, _) => {
                let lr = learning_rate.evaluate(t);
                for (p, g) in params.iter_mut().zip(grads) {
                    assert_eq!(p.shape(), g.shape());
                    p.scaled_add(-lr, g);
                }
            }
            (
                OptimizerSpec::Adam {
                    learning_rate,
                    beta1,
                    beta2,
                },
                Some((m, v)),
            ) => {
                let (lr, b1, b2) = (learning_rate.evaluate(t), *beta1, *beta2);
                let n = self.updates as i32;
                let (c1, c2) = (1.0 - b1.powi(n), 1.0 - b2.powi(n));
                m.scale(b1);
                m.add_scaled(1.0 - b1, gradient);
                v.scale(b2);
                v.add_scaled(1.0 - b2, &squared(gradient));
                for ((p, m), v) in params.iter_mut().zip(m.tensors()).zip(v.tensors()) {
                    assert_eq!(p.shape(), m.shape());
                    Zip::from(p).and(m).and(v).for_each(|p, &m, &v| {
                        *p -= lr * (m / c1) / ((v / c2).sqrt() + ADAM_EPSILON);
                    });
                }
            }
            (OptimizerSpec::Adam { .. }, None) => {
                unreachable!("Adam moments are allocated by `OptimizerSpec::init`")
            }
        }
    }
}

fn squared(gradient: &Gradient) -> Gradient {
    Gradient::new(
        gradient
            .tensors()
            .iter()
            .map(|t| t.mapv(|x| x * x))
            .collect(),
    )
}

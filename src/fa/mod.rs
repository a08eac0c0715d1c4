use std::ops::{AddAssign, DivAssign};

use ndarray::Array2;

mod dnn;
mod optim;
mod spec;
pub mod trace;

pub use dnn::{Activation, DnnApprox, DnnSpec};
pub use optim::{Optimizer, OptimizerSpec};
pub use spec::{ApproxSpec, FeatureFn, FuncApproxSpec};

/// A gradient (or a gradient accumulator) with one entry per parameter tensor of a
/// function approximator
///
/// Every tensor has an explicit two-dimensional shape. Arithmetic between
/// gradients is strictly elementwise and panics on a shape mismatch instead of
/// broadcasting.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    tensors: Vec<Array2<f64>>,
}

impl Gradient {
    pub fn new(tensors: Vec<Array2<f64>>) -> Self {
        Self { tensors }
    }

    /// A zero gradient with the given tensor shapes
    pub fn zeros(shapes: &[[usize; 2]]) -> Self {
        Self {
            tensors: shapes.iter().map(|&s| Array2::zeros(s)).collect(),
        }
    }

    /// A zero gradient with the same shapes as `self`
    pub fn zeros_like(&self) -> Self {
        Self::zeros(&self.shapes())
    }

    pub fn tensors(&self) -> &[Array2<f64>] {
        &self.tensors
    }

    pub fn shapes(&self) -> Vec<[usize; 2]> {
        self.tensors
            .iter()
            .map(|t| [t.nrows(), t.ncols()])
            .collect()
    }

    /// `self += alpha * other`
    ///
    /// **Panics** if the shapes of `self` and `other` differ
    pub fn add_scaled(&mut self, alpha: f64, other: &Gradient) {
        assert_eq!(
            self.shapes(),
            other.shapes(),
            "Gradient shapes must match exactly"
        );
        for (t, o) in self.tensors.iter_mut().zip(&other.tensors) {
            t.scaled_add(alpha, o);
        }
    }

    /// Multiply every entry by `alpha`
    pub fn scale(&mut self, alpha: f64) {
        for t in &mut self.tensors {
            *t *= alpha;
        }
    }

    pub fn is_zero(&self) -> bool {
        self.tensors.iter().all(|t| t.iter().all(|&x| x == 0.0))
    }
}

impl AddAssign<&Gradient> for Gradient {
    fn add_assign(&mut self, rhs: &Gradient) {
        self.add_scaled(1.0, rhs);
    }
}

impl DivAssign<f64> for Gradient {
    fn div_assign(&mut self, rhs: f64) {
        for t in &mut self.tensors {
            *t /= rhs;
        }
    }
}

/// A differentiable, trainable function approximator `X -> f64`
///
/// The approximator owns its parameters: learners only read it through
/// [`evaluate`](FuncApprox::evaluate) and the gradient routines, and only change it
/// through [`update_params_from_gradient`](FuncApprox::update_params_from_gradient).
pub trait FuncApprox<X> {
    /// Evaluate the function at `x`
    fn evaluate(&self, x: &X) -> f64;

    /// Gradient of the output at `x` with respect to every parameter tensor
    fn gradient(&self, x: &X) -> Gradient;

    /// A zero gradient shaped like the parameter tensors
    fn zero_gradient(&self) -> Gradient;

    /// Apply a gradient descent step with the approximator's own optimizer
    fn update_params_from_gradient(&mut self, gradient: &Gradient);

    /// Eligibility-trace weighted gradient of the squared loss against `targets`
    ///
    /// Σ<sub>t</sub> e<sub>t</sub> (f(x<sub>t</sub>) - y<sub>t</sub>), with
    /// e<sub>t</sub> = decay · e<sub>t-1</sub> + ∇f(x<sub>t</sub>)
    ///
    /// **Panics** if `xs` and `targets` differ in length
    fn el_tr_sum_loss_gradient(&self, xs: &[X], targets: &[f64], decay: f64) -> Gradient {
        assert_eq!(xs.len(), targets.len());
        trace::el_tr_sum(
            self.zero_gradient(),
            decay,
            xs.iter()
                .zip(targets)
                .map(|(x, &y)| (self.gradient(x), 1.0, self.evaluate(x) - y)),
        )
    }

    /// Eligibility-trace weighted gradient of an objective
    ///
    /// Σ<sub>t</sub> e<sub>t</sub> signed<sub>t</sub>, with
    /// e<sub>t</sub> = decay · e<sub>t-1</sub> + weight<sub>t</sub> ∇f(x<sub>t</sub>)
    ///
    /// Descending this gradient ascends the objective whose per-step derivative is
    /// `-signed`.
    ///
    /// **Panics** if `xs`, `weights` and `signed` differ in length
    fn el_tr_sum_objective_gradient(
        &self,
        xs: &[X],
        weights: &[f64],
        signed: &[f64],
        decay: f64,
    ) -> Gradient {
        assert_eq!(xs.len(), weights.len());
        assert_eq!(xs.len(), signed.len());
        trace::el_tr_sum(
            self.zero_gradient(),
            decay,
            xs.iter()
                .zip(weights.iter().zip(signed))
                .map(|(x, (&w, &d))| (self.gradient(x), w, d)),
        )
    }
}

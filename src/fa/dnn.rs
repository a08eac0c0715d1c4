use std::fmt;

use ndarray::{s, Array1, Array2, Axis};
use rand::thread_rng;
use rand_distr::{Distribution, Normal};

use super::{FeatureFn, FuncApprox, Gradient, Optimizer, OptimizerSpec};

/// Elementwise activation function of a network layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Identity,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    pub fn apply(self, z: f64) -> f64 {
        match self {
            Self::Identity => z,
            Self::Relu => z.max(0.0),
            Self::Sigmoid => 1.0 / (1.0 + (-z).exp()),
            Self::Tanh => z.tanh(),
        }
    }

    /// Derivative with respect to the pre-activation `z`
    pub fn deriv(self, z: f64) -> f64 {
        match self {
            Self::Identity => 1.0,
            Self::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Sigmoid => {
                let s = Self::Sigmoid.apply(z);
                s * (1.0 - s)
            }
            Self::Tanh => 1.0 - z.tanh().powi(2),
        }
    }
}

/// Architecture of a fully connected network with a single output
#[derive(Debug, Clone, PartialEq)]
pub struct DnnSpec {
    /// Width of each hidden layer
    pub neurons: Vec<usize>,
    pub hidden_activation: Activation,
    pub output_activation: Activation,
}

impl DnnSpec {
    /// A linear model in the features: no hidden layers, identity output
    pub fn linear() -> Self {
        Self {
            neurons: Vec::new(),
            hidden_activation: Activation::Identity,
            output_activation: Activation::Identity,
        }
    }

    /// Shapes of the weight tensors for `num_features` inputs
    ///
    /// Each layer maps `in` values to `out` values through an `[in + 1, out]` tensor
    /// whose last row holds the biases.
    pub fn shapes(&self, num_features: usize) -> Vec<[usize; 2]> {
        let mut widths = vec![num_features];
        widths.extend(&self.neurons);
        widths.push(1);
        widths.windows(2).map(|w| [w[0] + 1, w[1]]).collect()
    }
}

/// A fully connected network over hand-crafted features of its input
///
/// The input `x` is first mapped to a feature vector by the feature functions, then
/// passed through the layers described by a [`DnnSpec`].
pub struct DnnApprox<X> {
    features: Vec<FeatureFn<X>>,
    spec: DnnSpec,
    layers: Vec<Array2<f64>>,
    optimizer: Optimizer,
}

impl<X> fmt::Debug for DnnApprox<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnnApprox")
            .field("num_features", &self.features.len())
            .field("spec", &self.spec)
            .field("layers", &self.layers)
            .finish()
    }
}

impl<X> DnnApprox<X> {
    /// Initialize a network with weights drawn from N(0, 1/fan_in)
    pub fn new(features: Vec<FeatureFn<X>>, spec: DnnSpec, optimizer: &OptimizerSpec) -> Self {
        let shapes = spec.shapes(features.len());
        let mut rng = thread_rng();
        let layers = shapes
            .iter()
            .map(|&[rows, cols]| {
                let dist =
                    Normal::new(0.0, (1.0 / rows as f64).sqrt()).expect("fan-in is positive");
                Array2::from_shape_fn((rows, cols), |_| dist.sample(&mut rng))
            })
            .collect();
        Self {
            features,
            spec,
            layers,
            optimizer: optimizer.init(&shapes),
        }
    }

    /// Replace the weights, e.g. to start from known values
    ///
    /// **Panics** if the shapes differ from the architecture's
    pub fn with_params(mut self, layers: Vec<Array2<f64>>) -> Self {
        let shapes = layers
            .iter()
            .map(|l| [l.nrows(), l.ncols()])
            .collect::<Vec<_>>();
        assert_eq!(shapes, self.spec.shapes(self.features.len()));
        self.layers = layers;
        self
    }

    pub fn params(&self) -> &[Array2<f64>] {
        &self.layers
    }

    fn activation(&self, layer: usize) -> Activation {
        if layer + 1 == self.layers.len() {
            self.spec.output_activation
        } else {
            self.spec.hidden_activation
        }
    }

    /// Returns the bias-extended input and the pre-activation of every layer
    fn forward(&self, x: &X) -> (Vec<Array1<f64>>, Vec<Array1<f64>>) {
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut pre = Vec::with_capacity(self.layers.len());
        let mut a = self.features.iter().map(|f| f(x)).collect::<Vec<_>>();
        for (l, w) in self.layers.iter().enumerate() {
            a.push(1.0);
            let input = Array1::from(a);
            let z = input.dot(w);
            let act = self.activation(l);
            a = z.iter().map(|&v| act.apply(v)).collect();
            inputs.push(input);
            pre.push(z);
        }
        (inputs, pre)
    }
}

impl<X> FuncApprox<X> for DnnApprox<X> {
    fn evaluate(&self, x: &X) -> f64 {
        let (_, pre) = self.forward(x);
        let out = pre.last().expect("a network has at least one layer")[0];
        self.spec.output_activation.apply(out)
    }

    fn gradient(&self, x: &X) -> Gradient {
        let (inputs, pre) = self.forward(x);
        let n = self.layers.len();
        let mut grads = Vec::with_capacity(n);
        let mut delta = pre[n - 1].mapv(|z| self.spec.output_activation.deriv(z));

        for l in (0..n).rev() {
            let input = inputs[l].view().insert_axis(Axis(1));
            grads.push(input.dot(&delta.view().insert_axis(Axis(0))));
            if l > 0 {
                let w = &self.layers[l];
                let back = w.slice(s![..w.nrows() - 1, ..]).dot(&delta);
                delta = back * pre[l - 1].mapv(|z| self.spec.hidden_activation.deriv(z));
            }
        }

        grads.reverse();
        Gradient::new(grads)
    }

    fn zero_gradient(&self) -> Gradient {
        Gradient::zeros(&self.spec.shapes(self.features.len()))
    }

    fn update_params_from_gradient(&mut self, gradient: &Gradient) {
        self.optimizer.step(&mut self.layers, gradient);
    }
}

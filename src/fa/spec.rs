use std::rc::Rc;

use super::{DnnApprox, DnnSpec, FuncApprox, OptimizerSpec};
use crate::Error;

/// A scalar feature of an input
pub type FeatureFn<X> = Rc<dyn Fn(&X) -> f64>;

/// Builds the function approximators a learner trains
///
/// ### Type parameters
/// - `S`: State
/// - `A`: Action
pub trait ApproxSpec<S, A> {
    /// A fresh approximator of a function of the state
    fn vf_approx(&self) -> Box<dyn FuncApprox<S>>;

    /// A fresh approximator of a function of a state-action pair
    fn qvf_approx(&self) -> Box<dyn FuncApprox<(S, A)>>;
}

/// Feature-based network specification
///
/// State functions see the state features; state-action functions see the state
/// features of the state followed by the action features of the action.
#[derive(Clone)]
pub struct FuncApproxSpec<S, A> {
    state_features: Vec<FeatureFn<S>>,
    action_features: Vec<FeatureFn<A>>,
    dnn: DnnSpec,
    optimizer: OptimizerSpec,
}

impl<S, A> FuncApproxSpec<S, A> {
    /// **Errors** with [`Error::NoFeatures`] if `state_features` is empty
    pub fn new(
        state_features: Vec<FeatureFn<S>>,
        action_features: Vec<FeatureFn<A>>,
        dnn: DnnSpec,
        optimizer: OptimizerSpec,
    ) -> Result<Self, Error> {
        if state_features.is_empty() {
            return Err(Error::NoFeatures);
        }
        Ok(Self {
            state_features,
            action_features,
            dnn,
            optimizer,
        })
    }
}

impl<S: 'static, A: 'static> ApproxSpec<S, A> for FuncApproxSpec<S, A> {
    fn vf_approx(&self) -> Box<dyn FuncApprox<S>> {
        Box::new(DnnApprox::new(
            self.state_features.clone(),
            self.dnn.clone(),
            &self.optimizer,
        ))
    }

    fn qvf_approx(&self) -> Box<dyn FuncApprox<(S, A)>> {
        let state = self.state_features.iter().map(|f| {
            let f = Rc::clone(f);
            Rc::new(move |x: &(S, A)| f(&x.0)) as FeatureFn<(S, A)>
        });
        let action = self.action_features.iter().map(|g| {
            let g = Rc::clone(g);
            Rc::new(move |x: &(S, A)| g(&x.1)) as FeatureFn<(S, A)>
        });
        Box::new(DnnApprox::new(
            state.chain(action).collect(),
            self.dnn.clone(),
            &self.optimizer,
        ))
    }
}

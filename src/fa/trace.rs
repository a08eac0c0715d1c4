//! Eligibility-trace accumulation shared by every function approximator

use super::Gradient;

/// Fold per-step gradients into an eligibility-trace weighted sum
///
/// Each step is `(gradient, weight, error)`. The trace decays by `decay` at every
/// step before the weighted step gradient is added, and the running sum collects
/// the trace scaled by the step's error:
///
/// e<sub>t</sub> = decay · e<sub>t-1</sub> + weight<sub>t</sub> · g<sub>t</sub>
///
/// sum = Σ<sub>t</sub> error<sub>t</sub> · e<sub>t</sub>
pub fn el_tr_sum<I>(zero: Gradient, decay: f64, steps: I) -> Gradient
where
    I: IntoIterator<Item = (Gradient, f64, f64)>,
{
    let mut trace = zero.clone();
    let mut sum = zero;
    for (gradient, weight, error) in steps {
        trace.scale(decay);
        trace.add_scaled(weight, &gradient);
        sum.add_scaled(error, &trace);
    }
    sum
}

pub mod pg;

pub use pg::{ActValueFunc, PolicyGradient, PolicyGradientConfig};

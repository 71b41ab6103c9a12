//! Feature preprocessing module

mod scaler;

pub use scaler::ScalingParameters;

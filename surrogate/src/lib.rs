//! Surrogate models: Gaussian process kernels/regressor and the
//! feed-forward neural-network co-surrogate.

pub mod adaptive;
pub mod gp;
pub mod kernel;
pub mod matrix;
pub mod nn;

pub use gp::{GaussianProcess, SurrogateError, SurrogateResult};
pub use kernel::{Kernel, MaternNu};
pub use nn::NeuralNetworkSurrogate;

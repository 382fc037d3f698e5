//! Gaussian process regressor.

use crate::kernel::Kernel;
use crate::matrix::{self, Matrix};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SurrogateError {
    #[error("gaussian process must be fit before prediction")]
    NotFitted,
    #[error("kernel matrix is numerically singular and could not be inverted")]
    SingularKernelMatrix,
}

pub type SurrogateResult<T> = Result<T, SurrogateError>;

const VARIANCE_FLOOR: f64 = 1e-10;

/// Stores the training matrix, targets, and the inverse of `K + sigma^2*I`.
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    kernel: Kernel,
    noise: f64,
    x_train: Vec<Vec<f64>>,
    y_train: Vec<f64>,
    k_inv: Option<Matrix>,
}

impl GaussianProcess {
    pub fn new(kernel: Kernel, noise: f64) -> Self {
        Self {
            kernel,
            noise,
            x_train: Vec::new(),
            y_train: Vec::new(),
            k_inv: None,
        }
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn set_kernel(&mut self, kernel: Kernel) {
        self.kernel = kernel;
    }

    pub fn is_fitted(&self) -> bool {
        self.k_inv.is_some()
    }

    /// Recomputes `K_sigma^{-1}` for the given training set. On numerical
    /// failure the previous fit (if any) is left untouched and an error is
    /// returned so the caller can fall back to random sampling for this
    /// iteration.
    pub fn fit(&mut self, x: Vec<Vec<f64>>, y: Vec<f64>) -> SurrogateResult<()> {
        let mut k = self.kernel.matrix(&x, &x);
        matrix::add_diagonal(&mut k, self.noise * self.noise);

        match matrix::invert(&k) {
            Some(k_inv) => {
                self.x_train = x;
                self.y_train = y;
                self.k_inv = Some(k_inv);
                Ok(())
            }
            None => {
                warn!("gaussian process kernel matrix is singular; keeping previous fit");
                Err(SurrogateError::SingularKernelMatrix)
            }
        }
    }

    /// `mu = K_*,X^T K_sigma^{-1} y`, `sigma^2 = diag(K_** - K_*,X^T K_sigma^{-1} K_*,X)`,
    /// variance floored at `1e-10`.
    pub fn predict(&self, x_star: &[Vec<f64>]) -> SurrogateResult<(Vec<f64>, Vec<f64>)> {
        let k_inv = self.k_inv.as_ref().ok_or(SurrogateError::NotFitted)?;

        let k_s = self.kernel.matrix(&self.x_train, x_star); // n x m
        let k_s_t = matrix::transpose(&k_s); // m x n
        let k_ss = self.kernel.matrix(x_star, x_star); // m x m

        let alpha = matrix::matvec(k_inv, &self.y_train); // n
        let mu: Vec<f64> = k_s_t
            .iter()
            .map(|row| row.iter().zip(alpha.iter()).map(|(a, b)| a * b).sum())
            .collect();

        let k_inv_k_s = matrix::matmul(k_inv, &k_s); // n x m
        let mut variance = Vec::with_capacity(x_star.len());
        for j in 0..x_star.len() {
            let reduction: f64 = (0..self.x_train.len()).map(|i| k_s[i][j] * k_inv_k_s[i][j]).sum();
            let v = (k_ss[j][j] - reduction).max(VARIANCE_FLOOR);
            variance.push(v);
        }
        let sigma: Vec<f64> = variance.into_iter().map(f64::sqrt).collect();

        Ok((mu, sigma))
    }

    pub fn sample_count(&self) -> usize {
        self.x_train.len()
    }

    pub fn targets(&self) -> &[f64] {
        &self.y_train
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_and_predicts_training_points_with_low_error() {
        let mut gp = GaussianProcess::new(Kernel::Rbf { length_scale: 0.5 }, 1e-6);
        let x = vec![vec![0.0], vec![0.5], vec![1.0]];
        let y = vec![0.0, 1.0, 0.0];
        gp.fit(x.clone(), y.clone()).unwrap();

        let (mu, sigma) = gp.predict(&x).unwrap();
        for (predicted, actual) in mu.iter().zip(y.iter()) {
            assert!((predicted - actual).abs() < 0.05);
        }
        for s in sigma {
            assert!(s >= 0.0);
        }
    }

    #[test]
    fn variance_is_floored() {
        let mut gp = GaussianProcess::new(Kernel::Rbf { length_scale: 1.0 }, 1e-6);
        gp.fit(vec![vec![0.0]], vec![1.0]).unwrap();
        let (_, sigma) = gp.predict(&[vec![0.0]]).unwrap();
        assert!(sigma[0] * sigma[0] >= 1e-10 - 1e-15);
    }

    #[test]
    fn predict_before_fit_errors() {
        let gp = GaussianProcess::new(Kernel::Rbf { length_scale: 1.0 }, 1e-6);
        assert!(matches!(gp.predict(&[vec![0.0]]), Err(SurrogateError::NotFitted)));
    }
}

//! Covariance kernels.

use crate::matrix::Matrix;
use serde::{Deserialize, Serialize};

/// The Matérn smoothness parameter. Only the three closed forms with
/// well-known covariance expressions are supported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaternNu {
    Half,
    ThreeHalves,
    FiveHalves,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Kernel {
    Rbf { length_scale: f64 },
    Matern { nu: MaternNu, length_scale: f64 },
    Periodic { length_scale: f64, period: f64 },
    Combined { length_scale: f64, period: f64 },
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::Rbf { length_scale: 1.0 }
    }
}

impl Kernel {
    /// Escalation order used by adaptive kernel switching: RBF -> Matérn ->
    /// Combined.
    pub fn escalate(self) -> Kernel {
        match self {
            Kernel::Rbf { length_scale } => Kernel::Matern {
                nu: MaternNu::ThreeHalves,
                length_scale,
            },
            Kernel::Matern { length_scale, .. } => Kernel::Combined {
                length_scale,
                period: 1.0,
            },
            other => other,
        }
    }

    pub fn reset_to_rbf(self) -> Kernel {
        let length_scale = match self {
            Kernel::Rbf { length_scale }
            | Kernel::Matern { length_scale, .. }
            | Kernel::Periodic { length_scale, .. }
            | Kernel::Combined { length_scale, .. } => length_scale,
        };
        Kernel::Rbf { length_scale }
    }

    fn eval_distance(&self, d: f64) -> f64 {
        match self {
            Kernel::Rbf { length_scale } => (-d * d / (2.0 * length_scale * length_scale)).exp(),
            Kernel::Matern { nu, length_scale } => matern(d, *nu, *length_scale),
            Kernel::Periodic {
                length_scale,
                period,
            } => periodic(d, *length_scale, *period),
            Kernel::Combined {
                length_scale,
                period,
            } => {
                let rbf = (-d * d / (2.0 * length_scale * length_scale)).exp();
                let per = periodic(d, *length_scale, *period);
                0.7 * rbf + 0.3 * per
            }
        }
    }

    /// Pairwise covariance matrix between two sets of normalized vectors.
    pub fn matrix(&self, x1: &[Vec<f64>], x2: &[Vec<f64>]) -> Matrix {
        x1.iter()
            .map(|a| {
                x2.iter()
                    .map(|b| self.eval_distance(euclidean(a, b)))
                    .collect()
            })
            .collect()
    }
}

fn matern(d: f64, nu: MaternNu, length_scale: f64) -> f64 {
    match nu {
        MaternNu::Half => (-d / length_scale).exp(),
        MaternNu::ThreeHalves => {
            let s = (3.0f64).sqrt() * d / length_scale;
            (1.0 + s) * (-s).exp()
        }
        MaternNu::FiveHalves => {
            let s = (5.0f64).sqrt() * d / length_scale;
            (1.0 + s + 5.0 * d * d / (3.0 * length_scale * length_scale)) * (-s).exp()
        }
    }
}

fn periodic(d: f64, length_scale: f64, period: f64) -> f64 {
    let s = (std::f64::consts::PI * d / period).sin();
    (-2.0 * s * s / (length_scale * length_scale)).exp()
}

pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rbf_self_distance_is_one() {
        let k = Kernel::Rbf { length_scale: 1.0 };
        let x = vec![0.2, 0.4];
        assert!((k.eval_distance(0.0) - 1.0).abs() < 1e-12);
        let m = k.matrix(&[x.clone()], &[x]);
        assert!((m[0][0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn escalation_order() {
        let rbf = Kernel::Rbf { length_scale: 1.0 };
        let matern = rbf.escalate();
        assert!(matches!(matern, Kernel::Matern { .. }));
        let combined = matern.escalate();
        assert!(matches!(combined, Kernel::Combined { .. }));
        // Combined is the terminal escalation step.
        assert!(matches!(combined.escalate(), Kernel::Combined { .. }));
    }

    #[test]
    fn reset_preserves_length_scale() {
        let combined = Kernel::Combined {
            length_scale: 2.5,
            period: 3.0,
        };
        let reset = combined.reset_to_rbf();
        assert_eq!(reset, Kernel::Rbf { length_scale: 2.5 });
    }
}

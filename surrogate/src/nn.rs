//! Feed-forward neural-network co-surrogate.
//!
//! One hidden layer, ReLU activation, MSE loss, vanilla gradient descent —
//! trained on the full sample buffer each call, no minibatching. Its
//! predicted value is a bias correction folded into the Advanced Bayesian
//! acquisition blend; it is never a replacement for the GP.

use rand::Rng;

/// Fixed dummy uncertainty returned alongside every prediction.
const DUMMY_UNCERTAINTY: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct NeuralNetworkSurrogate {
    input_dim: usize,
    hidden_dim: usize,
    weights1: Vec<Vec<f64>>, // input_dim x hidden_dim
    bias1: Vec<f64>,
    weights2: Vec<f64>, // hidden_dim (output_dim == 1)
    bias2: f64,
    learning_rate: f64,
}

impl NeuralNetworkSurrogate {
    pub fn new(input_dim: usize, hidden_dim: usize) -> Self {
        let mut rng = rand::thread_rng();
        let weights1 = (0..input_dim)
            .map(|_| (0..hidden_dim).map(|_| rng.gen_range(-1.0..1.0) * 0.1).collect())
            .collect();
        let weights2 = (0..hidden_dim).map(|_| rng.gen_range(-1.0..1.0) * 0.1).collect();
        Self {
            input_dim,
            hidden_dim,
            weights1,
            bias1: vec![0.0; hidden_dim],
            weights2,
            bias2: 0.0,
            learning_rate: 0.01,
        }
    }

    fn forward(&self, x: &[f64]) -> (Vec<f64>, f64) {
        let z1: Vec<f64> = (0..self.hidden_dim)
            .map(|h| {
                let mut s = self.bias1[h];
                for (i, &xi) in x.iter().enumerate() {
                    s += xi * self.weights1[i][h];
                }
                s
            })
            .collect();
        let a1: Vec<f64> = z1.iter().map(|&v| v.max(0.0)).collect();
        let out: f64 = self.bias2
            + a1.iter().zip(self.weights2.iter()).map(|(a, w)| a * w).sum::<f64>();
        (a1, out)
    }

    /// Trains on the full buffer for `epochs` passes of batch gradient
    /// descent (no minibatching required per spec).
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64], epochs: usize) {
        if x.is_empty() {
            return;
        }
        let n = x.len() as f64;

        for _ in 0..epochs {
            let mut grad_w1 = vec![vec![0.0; self.hidden_dim]; self.input_dim];
            let mut grad_b1 = vec![0.0; self.hidden_dim];
            let mut grad_w2 = vec![0.0; self.hidden_dim];
            let mut grad_b2 = 0.0;

            for (xi, &yi) in x.iter().zip(y.iter()) {
                let (a1, pred) = self.forward(xi);
                let d_loss_d_out = 2.0 * (pred - yi) / n;

                for h in 0..self.hidden_dim {
                    grad_w2[h] += a1[h] * d_loss_d_out;
                }
                grad_b2 += d_loss_d_out;

                for h in 0..self.hidden_dim {
                    let d_a1 = d_loss_d_out * self.weights2[h];
                    let d_z1 = if a1[h] > 0.0 { d_a1 } else { 0.0 };
                    grad_b1[h] += d_z1;
                    for (i, &xij) in xi.iter().enumerate() {
                        grad_w1[i][h] += xij * d_z1;
                    }
                }
            }

            for h in 0..self.hidden_dim {
                self.weights2[h] -= self.learning_rate * grad_w2[h];
                self.bias1[h] -= self.learning_rate * grad_b1[h];
                for i in 0..self.input_dim {
                    self.weights1[i][h] -= self.learning_rate * grad_w1[i][h];
                }
            }
            self.bias2 -= self.learning_rate * grad_b2;
        }
    }

    /// Predicts scalar fitness with a fixed dummy uncertainty.
    pub fn predict(&self, x: &[f64]) -> (f64, f64) {
        let (_, out) = self.forward(x);
        (out, DUMMY_UNCERTAINTY)
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learns_a_simple_linear_target() {
        let mut nn = NeuralNetworkSurrogate::new(1, 8);
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64 / 20.0]).collect();
        let y: Vec<f64> = x.iter().map(|v| v[0] * 2.0).collect();

        nn.fit(&x, &y, 400);

        let (pred, unc) = nn.predict(&[0.5]);
        assert!((pred - 1.0).abs() < 0.5);
        assert_eq!(unc, 0.1);
    }

    #[test]
    fn empty_training_set_is_a_no_op() {
        let mut nn = NeuralNetworkSurrogate::new(2, 4);
        nn.fit(&[], &[], 10);
        let (_, unc) = nn.predict(&[0.1, 0.2]);
        assert_eq!(unc, 0.1);
    }
}

//! Expected Improvement acquisition function and candidate search.

use holomesh_surrogate::GaussianProcess;
use rand::Rng;
use tracing::debug;

const XI: f64 = 0.01;
const CANDIDATE_COUNT: usize = 50;
const PERTURBATION_SIGMA: f64 = 0.1;

/// Standard normal CDF approximation: `Phi(x) ~= 1/2 (1 + tanh(x / sqrt(2)))`.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + (x / std::f64::consts::SQRT_2).tanh())
}

/// Standard normal PDF, `phi(x) = (1/sqrt(2*pi)) * exp(-x^2/2)`.
pub fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// `EI(x) = (mu(x) - y* - xi) * Phi(Z) + sigma(x) * phi(Z)`,
/// `Z = (mu(x) - y* - xi) / sigma(x)`; returns 0 when `sigma(x) == 0`.
pub fn expected_improvement(mu: f64, sigma: f64, best_so_far: f64) -> f64 {
    if sigma <= 0.0 {
        return 0.0;
    }
    let improvement = mu - best_so_far - XI;
    let z = improvement / sigma;
    improvement * normal_cdf(z) + sigma * normal_pdf(z)
}

/// Draws `N=50` uniform random candidates in `[0,1]^d`, evaluates EI under
/// the fitted GP, and returns the argmax. If the maximum EI is non-positive,
/// perturbs the current best point by Gaussian noise (sigma=0.1) clamped to
/// `[0,1]` and returns that instead.
pub fn search_next_point(
    gp: &GaussianProcess,
    dims: usize,
    best_so_far: f64,
    current_best_point: &[f64],
) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    let candidates: Vec<Vec<f64>> = (0..CANDIDATE_COUNT)
        .map(|_| (0..dims).map(|_| rng.gen_range(0.0..=1.0)).collect())
        .collect();

    let Ok((mu, sigma)) = gp.predict(&candidates) else {
        debug!("gp prediction failed during candidate search, perturbing best point");
        return perturb(current_best_point, &mut rng);
    };

    let mut best_idx = 0;
    let mut best_ei = f64::MIN;
    for (i, (&m, &s)) in mu.iter().zip(sigma.iter()).enumerate() {
        let ei = expected_improvement(m, s, best_so_far);
        if ei > best_ei {
            best_ei = ei;
            best_idx = i;
        }
    }

    if best_ei <= 0.0 {
        perturb(current_best_point, &mut rng)
    } else {
        candidates[best_idx].clone()
    }
}

fn perturb(point: &[f64], rng: &mut impl Rng) -> Vec<f64> {
    point
        .iter()
        .map(|&v| {
            let noise = gaussian_noise(rng) * PERTURBATION_SIGMA;
            (v + noise).clamp(0.0, 1.0)
        })
        .collect()
}

/// Box-Muller transform; no external distribution crate needed for one
/// standard normal sample.
fn gaussian_noise(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

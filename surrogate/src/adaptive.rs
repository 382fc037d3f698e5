//! Adaptive kernel switching for the Advanced Bayesian strategy.

use crate::kernel::Kernel;
use crate::matrix::std_dev;
use tracing::info;

/// Checks whether this iteration is a kernel-adaptation checkpoint: every 5
/// evaluations once at least 6 samples have been observed.
pub fn is_adaptation_checkpoint(iteration: usize, sample_count: usize) -> bool {
    iteration % 5 == 0 && sample_count > 5
}

/// `convergence_rate = max(0, avg(y[i] - y[i-1]) over the last up to 5
/// diffs)`; `stability = 1 / (1 + std(last 5 y))`.
pub fn performance_metrics(y_samples: &[f64]) -> (f64, f64) {
    let window_start = y_samples.len().saturating_sub(6);
    let window = &y_samples[window_start..];
    let diffs: Vec<f64> = window.windows(2).map(|w| w[1] - w[0]).collect();
    let avg_improvement = if diffs.is_empty() {
        0.0
    } else {
        diffs.iter().sum::<f64>() / diffs.len() as f64
    };
    let convergence_rate = avg_improvement.max(0.0);

    let tail_start = y_samples.len().saturating_sub(5);
    let stability = 1.0 / (1.0 + std_dev(&y_samples[tail_start..]));

    (convergence_rate, stability)
}

/// Escalates `RBF -> Matérn -> Combined` when convergence is slow, or resets
/// to `RBF` when the surrogate has become unstable. Convergence is checked
/// first, so an unstable-and-slow reading escalates rather than resets.
pub fn adapt_kernel(kernel: Kernel, convergence_rate: f64, stability: f64) -> Kernel {
    let adapted = if convergence_rate < 0.7 {
        kernel.escalate()
    } else if stability < 0.8 {
        kernel.reset_to_rbf()
    } else {
        kernel
    };
    if adapted != kernel {
        info!(?kernel, ?adapted, convergence_rate, stability, "adapted surrogate kernel");
    }
    adapted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_requires_five_multiple_and_six_samples() {
        assert!(!is_adaptation_checkpoint(5, 5));
        assert!(is_adaptation_checkpoint(5, 6));
        assert!(!is_adaptation_checkpoint(6, 6));
        assert!(is_adaptation_checkpoint(10, 7));
    }

    #[test]
    fn slow_convergence_escalates() {
        let y = vec![0.1, 0.1, 0.1, 0.1, 0.1, 0.1];
        let (conv, stab) = performance_metrics(&y);
        assert_eq!(conv, 0.0);
        let next = adapt_kernel(Kernel::Rbf { length_scale: 1.0 }, conv, stab);
        assert!(matches!(next, Kernel::Matern { .. }));
    }

    #[test]
    fn fast_and_stable_convergence_keeps_kernel() {
        // One big early jump then five identical scores: strong average
        // improvement across the window and zero variance in the tail.
        let y = vec![0.0, 10.0, 10.0, 10.0, 10.0, 10.0];
        let (conv, stab) = performance_metrics(&y);
        assert!(conv >= 0.7);
        assert!(stab >= 0.8);
        let kernel = Kernel::Matern {
            nu: crate::kernel::MaternNu::ThreeHalves,
            length_scale: 1.0,
        };
        let next = adapt_kernel(kernel, conv, stab);
        assert_eq!(next, kernel);
    }
}

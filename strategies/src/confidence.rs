//! Confidence scoring.

use holomesh_types::{InteractionMode, Strategy};

/// `Bayesian`/`AdvancedBayesian` use `min(0.95, 0.7 + 0.01*iterations)`; the
/// remaining strategies use a fixed base. `+0.05` when the interaction mode
/// is `semi_automatic`, `+0.03` when `manual`, both still capped at `0.95`.
pub fn confidence_score(strategy: Strategy, iterations: usize, mode: InteractionMode) -> f64 {
    let base = match strategy {
        Strategy::Bayesian | Strategy::AdvancedBayesian => (0.7 + 0.01 * iterations as f64).min(0.95),
        Strategy::TransferLearning => 0.85,
        Strategy::Ensemble => 0.9,
        Strategy::SemiAutomatic => 0.8,
        Strategy::Manual => 0.75,
    };
    let bonus = match mode {
        InteractionMode::SemiAutomatic => 0.05,
        InteractionMode::Manual => 0.03,
        _ => 0.0,
    };
    (base + bonus).min(0.95)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bayesian_confidence_grows_with_iterations_and_caps() {
        let low = confidence_score(Strategy::Bayesian, 1, InteractionMode::Professional);
        let high = confidence_score(Strategy::Bayesian, 100, InteractionMode::Professional);
        assert!(low < high);
        assert!(high <= 0.95);
    }

    #[test]
    fn mode_bonus_is_applied_and_capped() {
        let plain = confidence_score(Strategy::Manual, 0, InteractionMode::Professional);
        let bonused = confidence_score(Strategy::Manual, 0, InteractionMode::Manual);
        assert!((bonused - (plain + 0.03)).abs() < 1e-9);
        assert!(bonused <= 0.95);
    }

    #[test]
    fn all_strategies_stay_within_bounds() {
        for strategy in [
            Strategy::Bayesian,
            Strategy::AdvancedBayesian,
            Strategy::TransferLearning,
            Strategy::Ensemble,
            Strategy::SemiAutomatic,
            Strategy::Manual,
        ] {
            for mode in [
                InteractionMode::Professional,
                InteractionMode::Innovative,
                InteractionMode::SemiAutomatic,
                InteractionMode::Manual,
            ] {
                let score = confidence_score(strategy, 500, mode);
                assert!((0.0..=0.95).contains(&score));
            }
        }
    }
}

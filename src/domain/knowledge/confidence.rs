//! Advisory confidence scoring.

use super::Strategy;

const PER_DOCUMENT_BONUS: f64 = 0.05;
const MAX_DOCUMENT_BONUS: f64 = 0.15;
const MIN_CONFIDENCE: f64 = 0.1;
const MAX_CONFIDENCE: f64 = 0.95;

fn base_confidence(strategy: Strategy) -> f64 {
    match strategy {
        Strategy::Remote => 0.8,
        Strategy::Hybrid => 0.75,
        Strategy::Fallback => 0.6,
        Strategy::None => 0.3,
        Strategy::Transfer => 1.0,
    }
}

/// Deterministic score from strategy and evidence count.
///
/// Transfer answers always score 1.0; every other strategy is clamped to
/// `[0.1, 0.95]`.
pub fn calculate_confidence(strategy: Strategy, document_count: usize) -> f64 {
    if strategy == Strategy::Transfer {
        return 1.0;
    }
    let bonus = (document_count as f64 * PER_DOCUMENT_BONUS).min(MAX_DOCUMENT_BONUS);
    (base_confidence(strategy) + bonus).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::Strategy;
    use proptest::prelude::*;

    const SCORED: [Strategy; 4] = [
        Strategy::Remote,
        Strategy::Hybrid,
        Strategy::Fallback,
        Strategy::None,
    ];

    #[test]
    fn base_values() {
        assert!((calculate_confidence(Strategy::Remote, 0) - 0.8).abs() < 1e-9);
        assert!((calculate_confidence(Strategy::Fallback, 0) - 0.6).abs() < 1e-9);
        assert!((calculate_confidence(Strategy::None, 0) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn bonus_is_capped() {
        assert!((calculate_confidence(Strategy::Fallback, 3) - 0.75).abs() < 1e-9);
        assert!((calculate_confidence(Strategy::Fallback, 30) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn remote_with_many_documents_is_clamped() {
        assert!((calculate_confidence(Strategy::Remote, 10) - 0.95).abs() < 1e-9);
    }

    #[test]
    fn transfer_is_always_one() {
        assert_eq!(calculate_confidence(Strategy::Transfer, 0), 1.0);
        assert_eq!(calculate_confidence(Strategy::Transfer, 9), 1.0);
    }

    proptest! {
        #[test]
        fn always_within_bounds(idx in 0usize..4, docs in 0usize..1000) {
            let c = calculate_confidence(SCORED[idx], docs);
            prop_assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&c));
        }

        #[test]
        fn non_decreasing_in_document_count(idx in 0usize..4, docs in 0usize..1000) {
            let s = SCORED[idx];
            prop_assert!(calculate_confidence(s, docs + 1) >= calculate_confidence(s, docs));
        }

        #[test]
        fn remote_with_evidence_beats_bare_fallback(docs in 1usize..1000) {
            prop_assert!(
                calculate_confidence(Strategy::Remote, docs)
                    > calculate_confidence(Strategy::Fallback, 0)
            );
        }
    }
}

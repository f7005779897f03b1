//! Deterministic winner selection

use super::metrics::Metrics;
use super::model::ModelKind;

/// Two R² values within this distance are considered tied
pub const R2_EPSILON: f64 = 1e-9;

/// Pick exactly one winner from the trained candidates.
///
/// Ranking rule: highest R² wins; R² ties (within [`R2_EPSILON`]) break by
/// lowest RMSE; remaining ties break by the fixed algorithm priority
/// (linear < ridge < random_forest < svr < knn). The result never depends
/// on the order of the input slice.
pub fn select_winner(results: &[(ModelKind, Metrics)]) -> Option<ModelKind> {
    if results.is_empty() {
        return None;
    }

    let best_r2 = results
        .iter()
        .map(|(_, m)| m.r2)
        .fold(f64::NEG_INFINITY, f64::max);

    // Contenders: everything within epsilon of the best R²
    let contenders: Vec<&(ModelKind, Metrics)> = results
        .iter()
        .filter(|(_, m)| (best_r2 - m.r2) <= R2_EPSILON)
        .collect();

    let best_rmse = contenders
        .iter()
        .map(|(_, m)| m.rmse)
        .fold(f64::INFINITY, f64::min);

    contenders
        .into_iter()
        .filter(|(_, m)| (m.rmse - best_rmse) <= R2_EPSILON)
        .map(|(kind, _)| *kind)
        .min_by_key(|kind| kind.priority())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(r2: f64, rmse: f64) -> Metrics {
        Metrics {
            r2,
            mae: rmse * 0.8,
            rmse,
        }
    }

    #[test]
    fn test_highest_r2_wins() {
        let results = vec![
            (ModelKind::Linear, metrics(0.5, 10.0)),
            (ModelKind::RandomForest, metrics(0.9, 5.0)),
            (ModelKind::Knn, metrics(0.7, 7.0)),
        ];
        assert_eq!(select_winner(&results), Some(ModelKind::RandomForest));
    }

    #[test]
    fn test_r2_tie_breaks_by_rmse() {
        let results = vec![
            (ModelKind::Svr, metrics(0.8, 4.0)),
            (ModelKind::Ridge, metrics(0.8, 6.0)),
        ];
        assert_eq!(select_winner(&results), Some(ModelKind::Svr));
    }

    #[test]
    fn test_full_tie_breaks_by_priority() {
        let results = vec![
            (ModelKind::Knn, metrics(0.8, 4.0)),
            (ModelKind::Ridge, metrics(0.8, 4.0)),
            (ModelKind::Svr, metrics(0.8, 4.0)),
        ];
        assert_eq!(select_winner(&results), Some(ModelKind::Ridge));
    }

    #[test]
    fn test_independent_of_input_order() {
        let mut results = vec![
            (ModelKind::Linear, metrics(0.91, 5.1)),
            (ModelKind::Ridge, metrics(0.91 + 0.5e-9, 5.0)),
            (ModelKind::RandomForest, metrics(0.85, 6.0)),
            (ModelKind::Svr, metrics(0.4, 12.0)),
            (ModelKind::Knn, metrics(-0.2, 20.0)),
        ];

        let expected = select_winner(&results);
        assert!(expected.is_some());

        // Every rotation yields the same winner
        for _ in 0..results.len() {
            results.rotate_left(1);
            assert_eq!(select_winner(&results), expected);
        }
        results.reverse();
        assert_eq!(select_winner(&results), expected);
    }

    #[test]
    fn test_negative_r2_still_selects() {
        let results = vec![
            (ModelKind::Linear, metrics(-0.5, 30.0)),
            (ModelKind::Knn, metrics(-0.1, 25.0)),
        ];
        assert_eq!(select_winner(&results), Some(ModelKind::Knn));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(select_winner(&[]), None);
    }
}

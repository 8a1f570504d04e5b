//! Top-K component selection
//!
//! Significant bins are ranked by descending magnitude; equal magnitudes fall
//! back to ascending bin index so the ranking is a total order and never
//! depends on sort stability. The first `min(K, |significant|)` ranks win.
//!
//! Asking for more bins than are significant is fine: every significant bin
//! is returned, and the level renders the same as any other saturated level.

use std::cmp::Ordering;

/// Rank `significant` bins and keep the top `k`.
///
/// Indices outside `magnitude` are ignored. The returned indices are unique
/// and in rank order.
pub fn select(magnitude: &[f64], significant: &[usize], k: usize) -> Vec<usize> {
    let mut ranked: Vec<usize> = significant
        .iter()
        .copied()
        .filter(|&bin| bin < magnitude.len())
        .collect();
    ranked.sort_unstable();
    ranked.dedup();

    ranked.sort_unstable_by(|&a, &b| rank_order(magnitude, a, b));

    if k < ranked.len() {
        ranked.truncate(k);
    } else {
        log::trace!(
            "Level {} saturates: only {} significant bins available",
            k,
            ranked.len()
        );
    }
    ranked
}

/// Descending magnitude, then ascending index
fn rank_order(magnitude: &[f64], a: usize, b: usize) -> Ordering {
    magnitude[b]
        .total_cmp(&magnitude[a])
        .then_with(|| a.cmp(&b))
}

/// Full ranking of the significant set, strongest first
pub fn rank(magnitude: &[f64], significant: &[usize]) -> Vec<usize> {
    select(magnitude, significant, usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // RANKING TESTS
    // ==========================================================================
    //
    // Selection must be reproducible byte-for-byte across runs and platforms,
    // so ties are broken explicitly instead of relying on whatever order an
    // unstable sort happens to leave equal keys in.
    // ==========================================================================

    #[test]
    fn test_select_orders_by_magnitude() {
        let magnitude = [0.0, 5.0, 1.0, 9.0, 3.0];
        let significant = [1, 2, 3, 4];
        assert_eq!(select(&magnitude, &significant, 2), vec![3, 1]);
        assert_eq!(select(&magnitude, &significant, 4), vec![3, 1, 4, 2]);
    }

    #[test]
    fn test_ties_break_by_ascending_index() {
        let magnitude = [2.0, 7.0, 7.0, 7.0, 1.0];
        let significant = [4, 3, 2, 1, 0];
        assert_eq!(select(&magnitude, &significant, 3), vec![1, 2, 3]);
        assert_eq!(select(&magnitude, &significant, 2), vec![1, 2]);
    }

    #[test]
    fn test_only_significant_bins_compete() {
        // Bin 0 is the loudest but not in the significant set
        let magnitude = [100.0, 5.0, 1.0];
        assert_eq!(select(&magnitude, &[1, 2], 1), vec![1]);
    }

    #[test]
    fn test_saturation_returns_all_significant() {
        let magnitude = [0.0, 5.0, 1.0, 9.0];
        let significant = [1, 3];
        let saturated = select(&magnitude, &significant, 10);
        assert_eq!(saturated, vec![3, 1]);
        assert_eq!(saturated, select(&magnitude, &significant, 2));
    }

    #[test]
    fn test_zero_budget_selects_nothing() {
        assert!(select(&[1.0, 2.0], &[0, 1], 0).is_empty());
    }

    #[test]
    fn test_empty_significant_set() {
        assert!(select(&[0.0; 8], &[], 5).is_empty());
    }

    #[test]
    fn test_duplicates_and_out_of_range_ignored() {
        let magnitude = [1.0, 2.0, 3.0];
        assert_eq!(select(&magnitude, &[2, 2, 1, 7], 5), vec![2, 1]);
    }

    #[test]
    fn test_smaller_budget_is_prefix_of_larger() {
        let magnitude: Vec<f64> = (0..50).map(|i| ((i * 37) % 11) as f64).collect();
        let significant: Vec<usize> = (0..50).collect();
        let full = rank(&magnitude, &significant);
        for k in 0..=50 {
            assert_eq!(select(&magnitude, &significant, k), full[..k].to_vec());
        }
    }
}

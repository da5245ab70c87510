//! Assignment solvers
//!
//! Given one candidate list per phrase token, pick one value per token such
//! that no sentence position is used twice, minimizing the spread of the
//! chosen positions. Negative values are "leave unmapped" sentinels.

use crate::AssignmentSolver;

/// Mean absolute distance of every value from the centroid of the
/// non-negative ones.
///
/// Sentinels take part in the mean (they are far below zero) so declining
/// is only chosen when mapping would repeat a position.
pub fn mean_distance_from_centroid(cluster: &[i64]) -> f64 {
    if cluster.is_empty() {
        return 0.0;
    }

    let positive: Vec<i64> = cluster.iter().copied().filter(|&x| x >= 0).collect();
    let centroid = if positive.is_empty() {
        0.0
    } else {
        positive.iter().sum::<i64>() as f64 / positive.len() as f64
    };

    cluster
        .iter()
        .map(|&p| (p as f64 - centroid).abs())
        .sum::<f64>()
        / cluster.len() as f64
}

/// True iff no non-negative value occurs twice
fn is_injective(assignment: &[i64]) -> bool {
    let mut seen = Vec::with_capacity(assignment.len());
    for &value in assignment.iter().filter(|&&v| v >= 0) {
        if seen.contains(&value) {
            return false;
        }
        seen.push(value);
    }
    true
}

/// Number of assignments in the Cartesian product, saturating
pub fn search_space(candidates: &[Vec<i64>]) -> u64 {
    candidates
        .iter()
        .fold(1u64, |acc, opts| acc.saturating_mul(opts.len() as u64))
}

// ============================================================================
// Brute force
// ============================================================================

/// Exhaustive search over the Cartesian product of candidate lists.
///
/// Enumerates in lexicographic order (last token varies fastest) and keeps
/// the first assignment reaching the minimal cost. Searches larger than
/// `max_search_space` are delegated to the greedy solver.
#[derive(Debug, Clone)]
pub struct BruteForceSolver {
    max_search_space: u64,
    fallback: GreedyCentroidSolver,
}

impl BruteForceSolver {
    pub fn new(max_search_space: u64) -> Self {
        Self {
            max_search_space,
            fallback: GreedyCentroidSolver,
        }
    }
}

impl Default for BruteForceSolver {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

impl AssignmentSolver for BruteForceSolver {
    fn solve(&self, candidates: &[Vec<i64>]) -> Option<Vec<i64>> {
        if candidates.iter().any(|opts| opts.is_empty()) {
            return None;
        }

        let space = search_space(candidates);
        if space > self.max_search_space {
            tracing::warn!(
                space,
                limit = self.max_search_space,
                "Alignment search space too large, using greedy assignment"
            );
            return self.fallback.solve(candidates);
        }

        let mut odometer = vec![0usize; candidates.len()];
        let mut current = vec![0i64; candidates.len()];
        let mut best: Option<(Vec<i64>, f64)> = None;

        loop {
            for (slot, (opts, &i)) in current.iter_mut().zip(candidates.iter().zip(&odometer)) {
                *slot = opts[i];
            }

            if is_injective(&current) {
                let cost = mean_distance_from_centroid(&current);
                if best.as_ref().map_or(true, |(_, b)| cost < *b) {
                    best = Some((current.clone(), cost));
                }
            }

            // Advance the odometer; done once every digit wrapped
            let mut pos = candidates.len();
            loop {
                if pos == 0 {
                    return best.map(|(assignment, _)| assignment);
                }
                pos -= 1;
                odometer[pos] += 1;
                if odometer[pos] < candidates[pos].len() {
                    break;
                }
                odometer[pos] = 0;
            }
        }
    }

    fn name(&self) -> &str {
        "brute-force"
    }
}

// ============================================================================
// Greedy
// ============================================================================

/// Linear-time approximation: tokens are assigned in order, each taking the
/// unused candidate nearest to the centroid of the positions chosen so far.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyCentroidSolver;

impl AssignmentSolver for GreedyCentroidSolver {
    fn solve(&self, candidates: &[Vec<i64>]) -> Option<Vec<i64>> {
        let mut chosen: Vec<i64> = Vec::with_capacity(candidates.len());
        let mut used: Vec<i64> = Vec::new();

        for opts in candidates {
            let centroid = if used.is_empty() {
                None
            } else {
                Some(used.iter().sum::<i64>() as f64 / used.len() as f64)
            };

            let pick = opts
                .iter()
                .copied()
                .filter(|&v| v >= 0 && !used.contains(&v))
                .min_by(|a, b| {
                    let da = centroid.map_or(0.0, |c| (*a as f64 - c).abs());
                    let db = centroid.map_or(0.0, |c| (*b as f64 - c).abs());
                    da.total_cmp(&db)
                });

            match pick {
                Some(v) => {
                    used.push(v);
                    chosen.push(v);
                }
                None => chosen.push(opts.iter().copied().find(|&v| v < 0).unwrap_or(-1)),
            }
        }

        Some(chosen)
    }

    fn name(&self) -> &str {
        "greedy-centroid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_distance_from_centroid() {
        assert_eq!(mean_distance_from_centroid(&[3, 5]), 1.0);
        assert_eq!(mean_distance_from_centroid(&[4]), 0.0);
        // Sentinel sits far from the centroid of the real positions
        assert_eq!(mean_distance_from_centroid(&[3, -7]), 5.0);
        assert_eq!(mean_distance_from_centroid(&[]), 0.0);
    }

    #[test]
    fn test_brute_force_prefers_tight_cluster() {
        let solver = BruteForceSolver::default();
        let candidates = vec![vec![1, 9], vec![2], vec![10, 3]];
        assert_eq!(solver.solve(&candidates), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_brute_force_rejects_duplicates() {
        let solver = BruteForceSolver::default();
        let candidates = vec![vec![4, -10], vec![4, -10]];
        // Both orders cost the same; the first one enumerated wins
        assert_eq!(solver.solve(&candidates), Some(vec![4, -10]));
    }

    #[test]
    fn test_brute_force_with_sentinel_from_reference_case() {
        let solver = BruteForceSolver::default();
        let candidates = vec![vec![1, -100], vec![5], vec![6], vec![-4]];
        let assignment = solver.solve(&candidates).unwrap();
        assert_eq!(assignment, vec![1, 5, 6, -4]);
    }

    #[test]
    fn test_brute_force_empty_input() {
        let solver = BruteForceSolver::default();
        assert_eq!(solver.solve(&[]), Some(vec![]));
        assert_eq!(solver.solve(&[vec![]]), None);
    }

    #[test]
    fn test_falls_back_to_greedy_when_too_large() {
        let solver = BruteForceSolver::new(3);
        let candidates = vec![vec![1, 9], vec![2, 8]];
        assert_eq!(search_space(&candidates), 4);
        // Greedy takes the first token's first option, then stays close to it
        assert_eq!(solver.solve(&candidates), Some(vec![1, 2]));
    }

    #[test]
    fn test_greedy_declines_when_exhausted() {
        let candidates = vec![vec![4], vec![4, -12]];
        assert_eq!(GreedyCentroidSolver.solve(&candidates), Some(vec![4, -12]));
    }
}

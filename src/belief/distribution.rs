//! Per-piece probability distribution over ranks.

use crate::board::{Rank, RankSet, ALL_RANKS, RANK_COUNT};

/// A probability distribution over the twelve ranks.
///
/// Always normalised: constructors that could produce an all-zero vector
/// return `None` instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankDistribution([f64; RANK_COUNT]);

impl RankDistribution {
    /// Certainty on a single rank.
    pub fn point(rank: Rank) -> RankDistribution {
        let mut p = [0.0; RANK_COUNT];
        p[rank.index()] = 1.0;
        RankDistribution(p)
    }

    /// Equal weight on every rank of `set`. An empty set is treated as
    /// every rank.
    pub fn uniform(set: RankSet) -> RankDistribution {
        let set = if set.is_empty() { RankSet::ALL } else { set };
        let share = 1.0 / set.len() as f64;
        let mut p = [0.0; RANK_COUNT];
        for r in set.iter() {
            p[r.index()] = share;
        }
        RankDistribution(p)
    }

    /// Normalises non-negative weights. Returns `None` if they sum to zero.
    pub fn from_weights(weights: [f64; RANK_COUNT]) -> Option<RankDistribution> {
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 || !total.is_finite() {
            return None;
        }
        Some(RankDistribution(
            weights.map(|w| if w > 0.0 { w / total } else { 0.0 }),
        ))
    }

    pub fn probability(&self, rank: Rank) -> f64 {
        self.0[rank.index()]
    }

    /// Ranks with non-zero probability, in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (Rank, f64)> + '_ {
        ALL_RANKS
            .into_iter()
            .map(|r| (r, self.0[r.index()]))
            .filter(|&(_, p)| p > 0.0)
    }

    /// Ranks with non-zero probability.
    pub fn support(&self) -> RankSet {
        self.iter().map(|(r, _)| r).collect()
    }

    /// Probability mass on `set`.
    pub fn mass(&self, set: RankSet) -> f64 {
        set.iter().map(|r| self.0[r.index()]).sum()
    }

    /// The distribution restricted to `set` and renormalised.
    pub fn conditioned(&self, set: RankSet) -> Option<RankDistribution> {
        let mut w = [0.0; RANK_COUNT];
        for r in set.iter() {
            w[r.index()] = self.0[r.index()];
        }
        RankDistribution::from_weights(w)
    }

    /// The rank if the distribution is a point mass.
    pub fn certain(&self) -> Option<Rank> {
        self.support().only()
    }

    /// Expectation of `f` over the distribution.
    pub fn expect<F: Fn(Rank) -> f64>(&self, f: F) -> f64 {
        self.iter().map(|(r, p)| p * f(r)).sum()
    }

    pub(crate) fn weights(&self) -> &[f64; RANK_COUNT] {
        &self.0
    }
}

//! Combat resolution.
//!
//! The fixed resolution table plus an expectation form used by search
//! when one or both ranks are only known as a distribution.

use crate::belief::RankDistribution;
use crate::board::piece::{Rank, ALL_RANKS};

/// The result of a move, from the mover's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombatOutcome {
    /// The destination was empty.
    NoContact,
    /// The defender is removed and the attacker takes its station.
    AttackerWins,
    /// The attacker is removed.
    DefenderWins,
    /// Both pieces are removed.
    Mutual,
    /// The defender was the flag; the game ends.
    FlagCaptured,
}

impl CombatOutcome {
    pub const ALL: [CombatOutcome; 5] = [
        CombatOutcome::NoContact,
        CombatOutcome::AttackerWins,
        CombatOutcome::DefenderWins,
        CombatOutcome::Mutual,
        CombatOutcome::FlagCaptured,
    ];

    const fn slot(self) -> usize {
        self as usize
    }

    /// Returns true if the attacking piece is still on the board afterwards.
    pub const fn attacker_survives(self) -> bool {
        matches!(
            self,
            CombatOutcome::NoContact | CombatOutcome::AttackerWins | CombatOutcome::FlagCaptured
        )
    }

    /// Returns true if the defending piece is still on the board afterwards.
    pub const fn defender_survives(self) -> bool {
        matches!(self, CombatOutcome::DefenderWins)
    }
}

/// Resolves an attack between two known ranks.
pub fn resolve_combat(attacker: Rank, defender: Rank) -> CombatOutcome {
    match (attacker, defender) {
        (_, Rank::Flag) => CombatOutcome::FlagCaptured,
        (Rank::Bomb, _) | (_, Rank::Bomb) => CombatOutcome::Mutual,
        (Rank::Engineer, Rank::Landmine) => CombatOutcome::AttackerWins,
        (_, Rank::Landmine) => CombatOutcome::DefenderWins,
        _ => match (attacker.order(), defender.order()) {
            (Some(a), Some(d)) if a > d => CombatOutcome::AttackerWins,
            (Some(a), Some(d)) if a == d => CombatOutcome::Mutual,
            _ => CombatOutcome::DefenderWins,
        },
    }
}

/// Defender ranks consistent with `attacker` producing `outcome`.
pub fn defenders_consistent_with(
    attacker: Rank,
    outcome: CombatOutcome,
) -> impl Iterator<Item = Rank> {
    ALL_RANKS
        .into_iter()
        .filter(move |&d| resolve_combat(attacker, d) == outcome)
}

/// Attacker ranks consistent with hitting `defender` and producing `outcome`.
pub fn attackers_consistent_with(
    defender: Rank,
    outcome: CombatOutcome,
) -> impl Iterator<Item = Rank> {
    ALL_RANKS
        .into_iter()
        .filter(move |&a| a.is_mobile() && resolve_combat(a, defender) == outcome)
}

/// Probability of each combat outcome, indexed like `CombatOutcome::ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OutcomeOdds([f64; 5]);

impl OutcomeOdds {
    pub fn probability(&self, outcome: CombatOutcome) -> f64 {
        self.0[outcome.slot()]
    }

    /// Outcomes with non-zero probability, in `CombatOutcome::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (CombatOutcome, f64)> + '_ {
        CombatOutcome::ALL
            .into_iter()
            .map(|o| (o, self.0[o.slot()]))
            .filter(|&(_, p)| p > 0.0)
    }
}

/// Combines two independent rank distributions into outcome odds.
pub fn outcome_odds(attacker: &RankDistribution, defender: &RankDistribution) -> OutcomeOdds {
    let mut odds = [0.0; 5];
    for (a, pa) in attacker.iter() {
        for (d, pd) in defender.iter() {
            odds[resolve_combat(a, d).slot()] += pa * pd;
        }
    }
    OutcomeOdds(odds)
}

//! Utility-based goal selection.
//!
//! Each goal gets a table-driven raw utility from the Blackboard. The five
//! values are normalized by their sum (a linear "softmax", not exponential)
//! and the maximum wins. Exact ties resolve in the order
//! Flee > StealthDeliver > BossDuel > Recover > Race.

use serde::{Deserialize, Serialize};

use crate::ai::blackboard::Blackboard;

pub const SELECTION_EPSILON: f32 = 0.01;
pub const FLEE_THREAT_THRESHOLD: f32 = 0.65;
pub const RECOVER_DAMAGE_THRESHOLD: f32 = 0.6;
pub const RECOVER_FUEL_THRESHOLD: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Race,
    StealthDeliver,
    Flee,
    BossDuel,
    Recover,
}

impl Goal {
    /// Comparison order used for selection; earlier entries win exact ties.
    pub const SELECTION_ORDER: [Goal; 5] = [
        Goal::Flee,
        Goal::StealthDeliver,
        Goal::BossDuel,
        Goal::Recover,
        Goal::Race,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Goal::Race => "race",
            Goal::StealthDeliver => "stealth_deliver",
            Goal::Flee => "flee",
            Goal::BossDuel => "boss_duel",
            Goal::Recover => "recover",
        }
    }
}

/// High value when the goal's condition holds, low otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtilityRange {
    pub high: f32,
    pub low: f32,
}

impl UtilityRange {
    const fn new(high: f32, low: f32) -> Self {
        Self { high, low }
    }

    #[inline]
    fn pick(&self, condition: bool) -> f32 {
        if condition { self.high } else { self.low }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtilityTable {
    pub race: UtilityRange,
    pub stealth_deliver: UtilityRange,
    pub flee: UtilityRange,
    pub boss_duel: UtilityRange,
    pub recover: UtilityRange,
}

impl Default for UtilityTable {
    fn default() -> Self {
        Self {
            race: UtilityRange::new(0.7, 0.4),
            stealth_deliver: UtilityRange::new(0.8, 0.2),
            flee: UtilityRange::new(0.9, 0.1),
            boss_duel: UtilityRange::new(0.85, 0.1),
            recover: UtilityRange::new(0.75, 0.15),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GoalScores {
    pub race: f32,
    pub stealth_deliver: f32,
    pub flee: f32,
    pub boss_duel: f32,
    pub recover: f32,
}

impl GoalScores {
    pub fn get(&self, goal: Goal) -> f32 {
        match goal {
            Goal::Race => self.race,
            Goal::StealthDeliver => self.stealth_deliver,
            Goal::Flee => self.flee,
            Goal::BossDuel => self.boss_duel,
            Goal::Recover => self.recover,
        }
    }

    pub fn sum(&self) -> f32 {
        self.race + self.stealth_deliver + self.flee + self.boss_duel + self.recover
    }

    /// Divide every score by the total. Returns `None` below the epsilon.
    pub fn normalized(&self) -> Option<GoalScores> {
        let sum = self.sum();
        if !(sum >= SELECTION_EPSILON) {
            return None;
        }
        Some(GoalScores {
            race: self.race / sum,
            stealth_deliver: self.stealth_deliver / sum,
            flee: self.flee / sum,
            boss_duel: self.boss_duel / sum,
            recover: self.recover / sum,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UtilityScorer {
    pub table: UtilityTable,
}

impl UtilityScorer {
    pub fn new(table: UtilityTable) -> Self {
        Self { table }
    }

    pub fn scores(&self, bb: &Blackboard) -> GoalScores {
        let t = &self.table;
        GoalScores {
            race: t.race.pick(bb.mission_active && !bb.has_cargo),
            stealth_deliver: t.stealth_deliver.pick(bb.has_cargo),
            flee: t.flee.pick(bb.threat_level > FLEE_THREAT_THRESHOLD),
            boss_duel: t.boss_duel.pick(bb.boss_engaged),
            recover: t.recover.pick(
                bb.damage_pct > RECOVER_DAMAGE_THRESHOLD || bb.fuel_pct < RECOVER_FUEL_THRESHOLD,
            ),
        }
    }

    pub fn select(&self, bb: &Blackboard) -> Goal {
        Self::select_from(&self.scores(bb))
    }

    /// Pick the best goal from raw scores.
    pub fn select_from(raw: &GoalScores) -> Goal {
        let Some(norm) = raw.normalized() else {
            return Goal::Race;
        };

        let mut best = Goal::SELECTION_ORDER[0];
        let mut best_value = norm.get(best);
        for goal in Goal::SELECTION_ORDER.into_iter().skip(1) {
            let value = norm.get(goal);
            if value > best_value {
                best = goal;
                best_value = value;
            }
        }
        best
    }
}

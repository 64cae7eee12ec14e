// ==============================================================================
// threat.rs — THREAT EVALUATION + PERIODIC THREAT SERVICE
// ------------------------------------------------------------------------------
// threat = w_rival  * 1/max(1, d_rival)
//        + w_police * 1/max(1, d_police)
//        + w_speed  * clamp01(speed / max_speed)
//        + w_damage * clamp01(damage)
// clamped to [0, 1]. With several police cars only the closest one counts.
//
// ThreatService re-evaluates on a jittered interval and writes the result,
// speed and motif intensity into the agent's Blackboard.
// ==============================================================================

use nalgebra::Point3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ai::blackboard::Blackboard;
use crate::curve::clamp01;

pub const DEFAULT_MAX_SPEED_KMH: f32 = 220.0;
pub const SERVICE_INTERVAL: f32 = 0.5;           // s
pub const SERVICE_RANDOM_DEVIATION: f32 = 0.1;   // s

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreatWeights {
    pub rival: f32,
    pub police: f32,
    pub speed: f32,
    pub damage: f32,
}

impl Default for ThreatWeights {
    fn default() -> Self {
        Self {
            rival: 0.45,
            police: 0.35,
            speed: 0.15,
            damage: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreatEvaluator {
    pub weights: ThreatWeights,
    pub max_speed_kmh: f32,
}

impl Default for ThreatEvaluator {
    fn default() -> Self {
        Self {
            weights: ThreatWeights::default(),
            max_speed_kmh: DEFAULT_MAX_SPEED_KMH,
        }
    }
}

/// Inverse proximity with the denominator floored at one unit.
#[inline]
pub fn proximity(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    1.0 / distance.max(1.0)
}

/// World context for one threat evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ThreatScene<'a> {
    pub self_position: Point3<f32>,
    pub speed_kmh: f32,
    pub damage: f32,
    pub rival_position: Option<Point3<f32>>,
    pub police_positions: &'a [Point3<f32>],
}

impl ThreatEvaluator {
    pub fn evaluate(&self, rival_distance: f32, police_distance: f32, speed_kmh: f32, damage: f32) -> f32 {
        self.combine(proximity(rival_distance), proximity(police_distance), speed_kmh, damage)
    }

    /// Closest police car dominates; an absent rival or empty police list
    /// contributes nothing.
    pub fn evaluate_multi(&self, rival_distance: Option<f32>, police_distances: &[f32], speed_kmh: f32, damage: f32) -> f32 {
        let rival = rival_distance.map_or(0.0, proximity);
        let police = police_distances
            .iter()
            .map(|d| proximity(*d))
            .fold(0.0_f32, f32::max);
        self.combine(rival, police, speed_kmh, damage)
    }

    pub fn evaluate_scene(&self, scene: &ThreatScene<'_>) -> f32 {
        let rival = scene
            .rival_position
            .map(|p| nalgebra::distance(&scene.self_position, &p));
        let police: Vec<f32> = scene
            .police_positions
            .iter()
            .map(|p| nalgebra::distance(&scene.self_position, p))
            .collect();
        self.evaluate_multi(rival, &police, scene.speed_kmh, scene.damage)
    }

    fn combine(&self, rival_prox: f32, police_prox: f32, speed_kmh: f32, damage: f32) -> f32 {
        let w = &self.weights;
        let speed_risk = clamp01(speed_kmh / self.max_speed_kmh.max(1e-3));
        let damage_risk = clamp01(damage);

        let threat = w.rival * rival_prox
            + w.police * police_prox
            + w.speed * speed_risk
            + w.damage * damage_risk;

        clamp01(threat)
    }
}

/// Overlay intensity driven by threat (performance scaled downstream).
#[inline]
pub fn motif_intensity(threat: f32) -> f32 {
    clamp01(0.4 + threat * 0.6)
}

// ============================================
// periodic service
// ============================================

#[derive(Debug, Clone)]
pub struct ThreatService {
    pub evaluator: ThreatEvaluator,
    pub interval: f32,
    pub random_deviation: f32,
    countdown: f32,
}

impl Default for ThreatService {
    fn default() -> Self {
        Self::new(ThreatEvaluator::default())
    }
}

impl ThreatService {
    pub fn new(evaluator: ThreatEvaluator) -> Self {
        Self {
            evaluator,
            interval: SERVICE_INTERVAL,
            random_deviation: SERVICE_RANDOM_DEVIATION,
            countdown: 0.0,
        }
    }

    /// Advance the service clock. When due, evaluate and write the blackboard;
    /// returns the new threat in that case.
    pub fn tick<R: Rng>(
        &mut self,
        dt: f32,
        scene: &ThreatScene<'_>,
        blackboard: &mut Blackboard,
        rng: &mut R,
    ) -> Option<f32> {
        self.countdown -= dt.max(0.0);
        if self.countdown > 0.0 {
            return None;
        }

        let jitter = if self.random_deviation > 0.0 {
            rng.gen_range(-self.random_deviation..=self.random_deviation)
        } else {
            0.0
        };
        self.countdown = (self.interval + jitter).max(0.0);

        let threat = self.evaluator.evaluate_scene(scene);
        blackboard.set_threat_level(threat);
        blackboard.speed_kmh = scene.speed_kmh;
        blackboard.set_motif_intensity(motif_intensity(threat));

        let nearest_police = scene.police_positions.iter().copied().min_by(|a, b| {
            nalgebra::distance_squared(&scene.self_position, a)
                .total_cmp(&nalgebra::distance_squared(&scene.self_position, b))
        });
        if let Some(p) = nearest_police.or(scene.rival_position) {
            blackboard.last_threat_position = Some(p);
        }

        Some(threat)
    }
}

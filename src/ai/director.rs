// ==============================================================================
// director.rs — HEIST TENSION DIRECTOR
// ------------------------------------------------------------------------------
// target  = 0.7 * clamp01(heat / 50) + 0.3 * clamp01(elapsed / 600)
// raw     = lerp(raw, target, min(1, dt / smooth_time))
// tension = response_curve(raw)                (only when a curve is set)
//
// Only `raw` is state; the curve is applied on the way out.
//
// enemy_density   = lerp(min_density, max_density, tension) * aggression
// chase_intensity = lerp(min_chase,   max_chase,   tension) * aggression
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::curve::{Curve, clamp01, lerp};

pub const HEAT_SATURATION: f32 = 50.0;      // heat at which the heat factor hits 1
pub const TIME_SATURATION: f32 = 600.0;     // s
pub const HEAT_WEIGHT: f32 = 0.7;
pub const TIME_WEIGHT: f32 = 0.3;
pub const DEFAULT_AGGRESSION: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorConfig {
    pub smooth_time: f32, // s
    pub min_enemy_density: f32,
    pub max_enemy_density: f32,
    pub min_chase_intensity: f32,
    pub max_chase_intensity: f32,
    #[serde(default)]
    pub response_curve: Option<Curve>,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            smooth_time: 3.0,
            min_enemy_density: 0.2,
            max_enemy_density: 1.0,
            min_chase_intensity: 0.3,
            max_chase_intensity: 1.0,
            response_curve: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeistDirector {
    pub config: DirectorConfig,
    raw_tension: f32, // smoothed, before the response curve
    heat: f32,
    elapsed: f32,
    aggression: f32,
}

impl Default for HeistDirector {
    fn default() -> Self {
        Self::new(DirectorConfig::default())
    }
}

impl HeistDirector {
    pub fn new(config: DirectorConfig) -> Self {
        Self {
            config,
            raw_tension: 0.0,
            heat: 0.0,
            elapsed: 0.0,
            aggression: DEFAULT_AGGRESSION,
        }
    }

    /// Tension the director is moving toward for the current heat and clock.
    pub fn target_tension(&self) -> f32 {
        let heat_factor = clamp01(self.heat / HEAT_SATURATION);
        let time_factor = clamp01(self.elapsed / TIME_SATURATION);
        HEAT_WEIGHT * heat_factor + TIME_WEIGHT * time_factor
    }

    pub fn tick(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        self.elapsed += dt;

        let target = self.target_tension();
        let alpha = if self.config.smooth_time > 0.0 {
            (dt / self.config.smooth_time).min(1.0)
        } else {
            1.0
        };
        self.raw_tension = clamp01(lerp(self.raw_tension, target, alpha));
    }

    /// Smoothed tension before the response curve.
    pub fn raw_tension(&self) -> f32 { self.raw_tension }

    pub fn current_tension(&self) -> f32 {
        match self.config.response_curve.as_ref().filter(|c| !c.is_empty()) {
            Some(curve) => clamp01(curve.evaluate(self.raw_tension)),
            None => self.raw_tension,
        }
    }

    pub fn heat(&self) -> f32 { self.heat }
    pub fn elapsed(&self) -> f32 { self.elapsed }
    pub fn aggression(&self) -> f32 { self.aggression }

    pub fn enemy_density(&self) -> f32 {
        let c = &self.config;
        lerp(c.min_enemy_density, c.max_enemy_density, self.current_tension()) * self.aggression
    }

    pub fn chase_intensity(&self) -> f32 {
        let c = &self.config;
        lerp(c.min_chase_intensity, c.max_chase_intensity, self.current_tension()) * self.aggression
    }

    pub fn set_heat(&mut self, heat: f32) {
        self.heat = if heat.is_finite() { heat.max(0.0) } else { 0.0 };
    }

    pub fn add_heat(&mut self, amount: f32) {
        self.set_heat(self.heat + amount);
    }

    /// Sticks until `reset_aggression`.
    pub fn set_aggression(&mut self, multiplier: f32) {
        if multiplier.is_finite() {
            self.aggression = multiplier.max(0.0);
        }
    }

    pub fn reset_aggression(&mut self) {
        self.aggression = DEFAULT_AGGRESSION;
    }

    /// Mission restart.
    pub fn reset(&mut self) {
        self.raw_tension = 0.0;
        self.heat = 0.0;
        self.elapsed = 0.0;
        self.aggression = DEFAULT_AGGRESSION;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_start_is_calm() {
        let d = HeistDirector::default();
        assert_eq!(d.current_tension(), 0.0);
        assert_eq!(d.aggression(), 1.0);
        assert!((d.enemy_density() - 0.2).abs() < 1e-6);
        assert!((d.chase_intensity() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn tension_converges_toward_target() {
        let mut d = HeistDirector::default();
        d.set_heat(50.0);
        let mut last = 0.0;
        for _ in 0..600 {
            d.tick(1.0 / 60.0);
            assert!(d.current_tension() >= last);
            last = d.current_tension();
        }
        // heat is saturated, time factor is ~10 s / 600 s
        assert!(last > 0.65 && last <= 1.0, "tension {last}");
    }

    #[test]
    fn smoothing_step_matches_lerp() {
        let mut d = HeistDirector::default();
        d.set_heat(100.0);
        d.tick(0.5);
        let target = 0.7 + 0.3 * (0.5 / 600.0);
        let expected = target * (0.5 / 3.0);
        assert!((d.current_tension() - expected).abs() < 1e-6);
    }

    #[test]
    fn large_dt_snaps_without_overshoot() {
        let mut d = HeistDirector::default();
        d.set_heat(1_000.0);
        d.tick(10.0);
        let expected = 0.7 + 0.3 * (10.0 / 600.0);
        assert!((d.current_tension() - expected).abs() < 1e-6);
    }

    #[test]
    fn response_curve_remaps_tension() {
        let config = DirectorConfig {
            smooth_time: 0.0,
            response_curve: Some(Curve::new(&[(0.0, 0.0), (1.0, 0.5)])),
            ..DirectorConfig::default()
        };
        let mut d = HeistDirector::new(config);
        d.set_heat(50.0);
        d.tick(0.001);
        let raw = 0.7 + 0.3 * (0.001 / 600.0);
        assert!((d.current_tension() - raw * 0.5).abs() < 1e-5);
    }

    #[test]
    fn smoothed_curve_settles_at_curve_of_target_for_any_rate() {
        let run = |hz: u32| {
            let config = DirectorConfig {
                response_curve: Some(Curve::new(&[(0.0, 0.0), (1.0, 0.5)])),
                ..DirectorConfig::default()
            };
            let mut d = HeistDirector::new(config);
            d.set_heat(50.0);
            for _ in 0..(600 * hz) {
                d.tick(1.0 / hz as f32);
            }
            d
        };

        let fast = run(60);
        let slow = run(30);
        // heat and clock both saturated: target 1.0, curve(1.0) = 0.5
        assert!((fast.raw_tension() - 1.0).abs() < 1e-3, "raw {}", fast.raw_tension());
        assert!((fast.current_tension() - 0.5).abs() < 1e-3, "tension {}", fast.current_tension());
        assert!((fast.current_tension() - slow.current_tension()).abs() < 1e-3);
        assert!((fast.enemy_density() - lerp(0.2, 1.0, 0.5)).abs() < 1e-3);
    }

    #[test]
    fn aggression_scales_outputs_until_reset() {
        let mut d = HeistDirector::default();
        d.set_aggression(1.5);
        d.tick(1.0);
        d.tick(1.0);
        assert_eq!(d.aggression(), 1.5);
        assert!((d.enemy_density() - lerp(0.2, 1.0, d.current_tension()) * 1.5).abs() < 1e-6);
        d.reset_aggression();
        assert_eq!(d.aggression(), 1.0);
    }

    #[test]
    fn bad_dt_is_ignored() {
        let mut d = HeistDirector::default();
        d.set_heat(50.0);
        d.tick(f32::NAN);
        d.tick(-1.0);
        d.tick(0.0);
        assert_eq!(d.current_tension(), 0.0);
        assert_eq!(d.elapsed(), 0.0);
    }

    #[test]
    fn reset_clears_mission_state() {
        let mut d = HeistDirector::default();
        d.add_heat(30.0);
        d.set_aggression(2.0);
        d.tick(5.0);
        d.reset();
        assert_eq!(d.heat(), 0.0);
        assert_eq!(d.elapsed(), 0.0);
        assert_eq!(d.current_tension(), 0.0);
        assert_eq!(d.aggression(), 1.0);
    }
}

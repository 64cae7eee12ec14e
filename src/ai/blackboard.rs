//! Per-agent perception / decision memory.

use nalgebra::Point3;
use serde::Serialize;
use uuid::Uuid;

use crate::curve::clamp01;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blackboard {
    pub target_waypoint: Option<Point3<f32>>,
    pub rival: Option<Uuid>,
    pub cargo: Option<Uuid>,
    pub last_threat_position: Option<Point3<f32>>,

    pub threat_level: f32,    // 0..1
    pub speed_kmh: f32,
    pub fuel_pct: f32,        // 0..1
    pub damage_pct: f32,      // 0..1
    pub motif_intensity: f32, // 0..1

    pub has_cargo: bool,
    pub mission_active: bool,
    pub boss_engaged: bool,
    pub in_stealth_zone: bool,
}

impl Default for Blackboard {
    fn default() -> Self {
        Self {
            target_waypoint: None,
            rival: None,
            cargo: None,
            last_threat_position: None,
            threat_level: 0.0,
            speed_kmh: 0.0,
            fuel_pct: 1.0,
            damage_pct: 0.0,
            motif_intensity: 0.0,
            has_cargo: false,
            mission_active: false,
            boss_engaged: false,
            in_stealth_zone: false,
        }
    }
}

impl Blackboard {
    /// Back to defaults (mission start / respawn).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn set_threat_level(&mut self, v: f32) {
        self.threat_level = clamp01(v);
    }

    pub fn set_fuel_pct(&mut self, v: f32) {
        self.fuel_pct = clamp01(v);
    }

    pub fn set_damage_pct(&mut self, v: f32) {
        self.damage_pct = clamp01(v);
    }

    pub fn set_motif_intensity(&mut self, v: f32) {
        self.motif_intensity = clamp01(v);
    }

    pub fn pick_up_cargo(&mut self, cargo: Uuid) {
        self.cargo = Some(cargo);
        self.has_cargo = true;
    }

    pub fn drop_cargo(&mut self) {
        self.cargo = None;
        self.has_cargo = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_clamp_fractions() {
        let mut bb = Blackboard::default();
        bb.set_threat_level(3.0);
        bb.set_fuel_pct(-1.0);
        bb.set_damage_pct(f32::NAN);
        bb.set_motif_intensity(0.4);
        assert_eq!(bb.threat_level, 1.0);
        assert_eq!(bb.fuel_pct, 0.0);
        assert_eq!(bb.damage_pct, 0.0);
        assert_eq!(bb.motif_intensity, 0.4);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut bb = Blackboard::default();
        bb.mission_active = true;
        bb.pick_up_cargo(Uuid::new_v4());
        bb.target_waypoint = Some(Point3::new(1.0, 0.0, 2.0));
        bb.reset();
        assert_eq!(bb, Blackboard::default());
    }

    #[test]
    fn cargo_flag_tracks_cargo_id() {
        let mut bb = Blackboard::default();
        let id = Uuid::new_v4();
        bb.pick_up_cargo(id);
        assert!(bb.has_cargo);
        assert_eq!(bb.cargo, Some(id));
        bb.drop_cargo();
        assert!(!bb.has_cargo && bb.cargo.is_none());
    }
}

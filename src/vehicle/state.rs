//! Per-vehicle mutable state, control input, and wheel identification.

use std::fmt;

use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::vehicle::profile::VehicleProfile;

/// Ambient engine temperature, also the spawn temperature.
pub const AMBIENT_ENGINE_HEAT: f32 = 90.0;
pub const MAX_STRUCTURAL_DAMAGE: f32 = 100.0;

// ============================================
// Wheel identification
// ============================================

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum WheelId { FL, FR, RL, RR }

impl WheelId {
    pub const ALL: [WheelId; 4] = [WheelId::FL, WheelId::FR, WheelId::RL, WheelId::RR];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            WheelId::FL => 0,
            WheelId::FR => 1,
            WheelId::RL => 2,
            WheelId::RR => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WheelId::FL => "FL",
            WheelId::FR => "FR",
            WheelId::RL => "RL",
            WheelId::RR => "RR",
        }
    }

    pub fn is_front(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::FR)
    }

    pub fn is_rear(&self) -> bool {
        matches!(self, WheelId::RL | WheelId::RR)
    }
}

impl fmt::Display for WheelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// ----- control input ------------------------
// ============================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    pub throttle: f32,  // 0..1
    pub brake: f32,     // 0..1
    pub steering: f32,  // -1 (full left) .. 1 (full right)
    pub nitro: bool,
}

impl ControlInput {
    pub fn new(throttle: f32, brake: f32, steering: f32, nitro: bool) -> Self {
        Self {
            throttle: clamp_axis(throttle, 0.0, 1.0),
            brake: clamp_axis(brake, 0.0, 1.0),
            steering: clamp_axis(steering, -1.0, 1.0),
            nitro,
        }
    }

    /// Re-apply the documented ranges (for values deserialized off the wire).
    pub fn clamped(self) -> Self {
        Self::new(self.throttle, self.brake, self.steering, self.nitro)
    }
}

#[inline]
pub(crate) fn clamp_axis(v: f32, lo: f32, hi: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(lo, hi) }
}

// ============================================
// ----- vehicle state ------------------------
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleState {
    pub position: Point3<f32>,
    pub orientation: UnitQuaternion<f32>,
    pub linear_velocity: Vector3<f32>,
    pub angular_velocity: Vector3<f32>,

    pub engine_rpm: f32,
    pub current_gear: usize,

    pub tire_wear: [f32; 4],     // 1 = fresh
    pub brake_fade: [f32; 4],    // 1 = fresh
    pub structural_damage: f32,  // 0..100
    pub engine_heat: f32,        // °C-like

    pub spoiler_deployed: bool,
    pub speed_kmh: f32,
    pub wheel_torque: [f32; 4],  // last distributed drive torque, N·m
}

impl VehicleState {
    /// Fresh state at spawn: full tires, fresh brakes, no damage, idle rpm, first gear.
    pub fn spawn(profile: &VehicleProfile) -> Self {
        Self {
            position: Point3::origin(),
            orientation: UnitQuaternion::identity(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            engine_rpm: profile.idle_rpm,
            current_gear: 0,
            tire_wear: [1.0; 4],
            brake_fade: [1.0; 4],
            structural_damage: 0.0,
            engine_heat: AMBIENT_ENGINE_HEAT,
            spoiler_deployed: false,
            speed_kmh: 0.0,
            wheel_torque: [0.0; 4],
        }
    }

    pub fn average_tire_wear(&self) -> f32 {
        self.tire_wear.iter().sum::<f32>() / self.tire_wear.len() as f32
    }

    /// Damage as a fraction of the structural maximum.
    pub fn damage_fraction(&self) -> f32 {
        (self.structural_damage / MAX_STRUCTURAL_DAMAGE).clamp(0.0, 1.0)
    }

    /// Chassis forward axis in world space (+Z forward).
    pub fn forward(&self) -> Vector3<f32> {
        self.orientation * Vector3::z()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_input_clamps_ranges() {
        let c = ControlInput::new(1.7, -0.2, -3.0, true);
        assert_eq!(c.throttle, 1.0);
        assert_eq!(c.brake, 0.0);
        assert_eq!(c.steering, -1.0);
        assert!(c.nitro);
    }

    #[test]
    fn nan_axes_become_zero() {
        let c = ControlInput::new(f32::NAN, f32::NAN, f32::NAN, false);
        assert_eq!(c, ControlInput::default());
    }

    #[test]
    fn spawn_state_is_fresh() {
        let p = VehicleProfile::street_racer();
        let s = VehicleState::spawn(&p);
        assert_eq!(s.engine_rpm, p.idle_rpm);
        assert_eq!(s.current_gear, 0);
        assert_eq!(s.average_tire_wear(), 1.0);
        assert_eq!(s.brake_fade, [1.0; 4]);
        assert_eq!(s.structural_damage, 0.0);
    }

    #[test]
    fn wheel_ids_index_in_order() {
        for (i, w) in WheelId::ALL.iter().enumerate() {
            assert_eq!(w.index(), i);
        }
        assert!(WheelId::FL.is_front() && WheelId::RR.is_rear());
        assert_eq!(WheelId::RL.to_string(), "RL");
    }
}

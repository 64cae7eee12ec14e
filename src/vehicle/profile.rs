// ==============================================================================
// profile.rs — VEHICLE ARCHETYPE CONFIGURATION (IMMUTABLE)
// ------------------------------------------------------------------------------
// A VehicleProfile is shared read-only (Arc) by every simulator of the same
// archetype. Nothing in the tick path mutates it.
//
// Presets:
// - street_racer(): light RWD coupe with an active spoiler
// - heist_van():    heavy FWD cargo van, no spoiler
// - interceptor():  AWD police pursuit car
// ==============================================================================

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::curve::Curve;
use crate::error::{SimError, SimResult};

/// Which axle(s) receive engine torque.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Drivetrain {
    Front,
    Rear,
    /// `front_share` of the torque goes to the front axle, the rest to the rear.
    AllWheel { front_share: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleProfile {
    pub name: String,
    pub mass: f32,                 // kg
    pub horsepower: f32,           // hp (informational)
    pub max_torque: f32,           // N·m at curve multiplier 1.0
    pub idle_rpm: f32,
    pub max_rpm: f32,
    pub torque_curve: Curve,       // rpm fraction (0..1) -> multiplier
    pub drivetrain: Drivetrain,
    pub gear_ratios: Vec<f32>,
    pub final_drive: f32,
    pub wheel_radius: f32,         // m

    // --- Aero ---
    pub drag_coefficient: f32,     // N per (m/s)^2
    pub downforce_coefficient: f32,// N per (m/s)^2
    pub active_spoiler: bool,

    // --- Brakes / steering ---
    pub brake_force: f32,          // N·m per wheel at full pedal
    pub max_steering_angle: f32,   // degrees

    // --- Nitro / engine ---
    pub nitro_multiplier: f32,
    pub nitro_heat_rate: f32,      // °C per second while nitro is active
    pub rpm_response: f32,         // 1/s, rpm smoothing rate

    // --- Suspension / tires ---
    pub suspension_rest_length: f32, // m
    pub suspension_stiffness: f32,   // N/m
    pub suspension_damping: f32,     // N·s/m
    pub tire_grip: f32,              // base friction coefficient

    // --- Chassis ---
    #[serde(default = "default_wheelbase")]
    pub wheelbase: f32,              // m, front to rear axle
}

pub const DEFAULT_WHEELBASE: f32 = 2.7;

fn default_wheelbase() -> f32 {
    DEFAULT_WHEELBASE
}

impl VehicleProfile {
    pub fn street_racer() -> Self {
        Self {
            name: "street_racer".into(),
            mass: 1350.0,
            horsepower: 420.0,
            max_torque: 480.0,
            idle_rpm: 1000.0,
            max_rpm: 8000.0,
            torque_curve: Curve::new(&[(0.0, 0.55), (0.35, 0.85), (0.7, 1.0), (1.0, 0.8)]),
            drivetrain: Drivetrain::Rear,
            gear_ratios: vec![3.5, 2.5, 1.8, 1.3, 1.0, 0.8, 0.6],
            final_drive: 3.4,
            wheel_radius: 0.34,
            drag_coefficient: 0.42,
            downforce_coefficient: 0.9,
            active_spoiler: true,
            brake_force: 2600.0,
            max_steering_angle: 34.0,
            nitro_multiplier: 1.6,
            nitro_heat_rate: 6.0,
            rpm_response: 8.0,
            suspension_rest_length: 0.5,
            suspension_stiffness: 66_000.0,
            suspension_damping: 5_400.0,
            tire_grip: 1.1,
            wheelbase: 2.6,
        }
    }

    pub fn heist_van() -> Self {
        Self {
            name: "heist_van".into(),
            mass: 2400.0,
            horsepower: 260.0,
            max_torque: 420.0,
            idle_rpm: 800.0,
            max_rpm: 6000.0,
            torque_curve: Curve::new(&[(0.0, 0.7), (0.4, 1.0), (1.0, 0.75)]),
            drivetrain: Drivetrain::Front,
            gear_ratios: vec![3.8, 2.3, 1.5, 1.0, 0.78],
            final_drive: 3.9,
            wheel_radius: 0.38,
            drag_coefficient: 0.75,
            downforce_coefficient: 0.2,
            active_spoiler: false,
            brake_force: 3400.0,
            max_steering_angle: 38.0,
            nitro_multiplier: 1.3,
            nitro_heat_rate: 9.0,
            rpm_response: 6.0,
            suspension_rest_length: 0.55,
            suspension_stiffness: 90_000.0,
            suspension_damping: 8_000.0,
            tire_grip: 0.95,
            wheelbase: 3.2,
        }
    }

    pub fn interceptor() -> Self {
        Self {
            name: "interceptor".into(),
            mass: 1650.0,
            horsepower: 500.0,
            max_torque: 560.0,
            idle_rpm: 900.0,
            max_rpm: 7200.0,
            torque_curve: Curve::new(&[(0.0, 0.6), (0.5, 1.0), (1.0, 0.85)]),
            drivetrain: Drivetrain::AllWheel { front_share: 0.4 },
            gear_ratios: vec![3.3, 2.2, 1.6, 1.2, 0.95, 0.75],
            final_drive: 3.5,
            wheel_radius: 0.35,
            drag_coefficient: 0.5,
            downforce_coefficient: 0.6,
            active_spoiler: false,
            brake_force: 3000.0,
            max_steering_angle: 32.0,
            nitro_multiplier: 1.4,
            nitro_heat_rate: 5.0,
            rpm_response: 8.0,
            suspension_rest_length: 0.5,
            suspension_stiffness: 75_000.0,
            suspension_damping: 6_200.0,
            tire_grip: 1.05,
            wheelbase: 2.9,
        }
    }

    /// Load a profile from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> SimResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let profile: VehicleProfile = serde_json::from_str(&text)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> SimResult<()> {
        let bad = |reason: &str| Err(SimError::invalid_profile(&self.name, reason));

        if self.gear_ratios.is_empty() {
            return bad("gear ratio table is empty");
        }
        if self.gear_ratios.iter().any(|r| !(r.is_finite() && *r > 0.0)) {
            return bad("gear ratios must be positive");
        }
        if !(self.final_drive > 0.0) {
            return bad("final drive must be positive");
        }
        if !(self.idle_rpm > 0.0 && self.idle_rpm < self.max_rpm) {
            return bad("idle rpm must be positive and below max rpm");
        }
        if !(self.mass > 0.0) || !(self.wheel_radius > 0.0) {
            return bad("mass and wheel radius must be positive");
        }
        if !(self.wheelbase.is_finite() && self.wheelbase > 0.0) {
            return bad("wheelbase must be positive");
        }
        if self.torque_curve.is_empty() {
            return bad("torque curve has no keyframes");
        }
        if let Drivetrain::AllWheel { front_share } = self.drivetrain {
            if !(0.0..=1.0).contains(&front_share) {
                return bad("all-wheel front share must be within [0, 1]");
            }
        }
        Ok(())
    }

    #[inline]
    pub fn top_gear(&self) -> usize {
        self.gear_ratios.len().saturating_sub(1)
    }

    #[inline]
    pub fn max_steering_radians(&self) -> f32 {
        self.max_steering_angle.to_radians()
    }
}

impl Default for VehicleProfile {
    fn default() -> Self {
        Self::street_racer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for p in [
            VehicleProfile::street_racer(),
            VehicleProfile::heist_van(),
            VehicleProfile::interceptor(),
        ] {
            p.validate().unwrap();
        }
    }

    #[test]
    fn rejects_empty_gearbox() {
        let mut p = VehicleProfile::street_racer();
        p.gear_ratios.clear();
        let err = p.validate().unwrap_err();
        assert!(matches!(err, SimError::InvalidProfile { .. }));
    }

    #[test]
    fn rejects_inverted_rpm_band() {
        let mut p = VehicleProfile::street_racer();
        p.idle_rpm = 9000.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_awd_share_out_of_range() {
        let mut p = VehicleProfile::interceptor();
        p.drivetrain = Drivetrain::AllWheel { front_share: 1.4 };
        assert!(p.validate().is_err());
    }

    #[test]
    fn json_round_trip_keeps_drivetrain_tag() {
        let p = VehicleProfile::interceptor();
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["drivetrain"]["kind"], "all_wheel");
        let back: VehicleProfile = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn rejects_non_positive_wheelbase() {
        let mut p = VehicleProfile::street_racer();
        p.wheelbase = 0.0;
        assert!(matches!(p.validate(), Err(SimError::InvalidProfile { .. })));
    }

    #[test]
    fn missing_wheelbase_uses_default() {
        let mut json = serde_json::to_value(VehicleProfile::heist_van()).unwrap();
        json.as_object_mut().unwrap().remove("wheelbase");
        let p: VehicleProfile = serde_json::from_value(json).unwrap();
        assert_eq!(p.wheelbase, DEFAULT_WHEELBASE);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn loads_profile_from_disk() {
        let path = std::env::temp_dir().join(format!("soulvan-profile-{}.json", std::process::id()));
        std::fs::write(&path, serde_json::to_string(&VehicleProfile::heist_van()).unwrap()).unwrap();
        let loaded = VehicleProfile::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.name, "heist_van");
    }
}

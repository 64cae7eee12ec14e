// ==============================================================================
// engine.rs — TORQUE CURVE, RPM RESPONSE, AUTO-SHIFT
// ------------------------------------------------------------------------------
// engine_torque():  curve(rpm fraction) * max torque, nitro boost + heat
// update_rpm():     exponential blend toward wheel-driven rpm, clamped
// auto_shift():     one gear per tick max, upshift checked before downshift
// ==============================================================================

use std::f32::consts::PI;

use serde::Serialize;

use crate::curve::lerp;
use crate::vehicle::profile::VehicleProfile;
use crate::vehicle::state::{AMBIENT_ENGINE_HEAT, VehicleState};

pub const UPSHIFT_FRACTION: f32 = 0.9;
pub const DOWNSHIFT_FRACTION: f32 = 0.3;
/// °C per second shed while nitro is off.
pub const ENGINE_COOLING_RATE: f32 = 3.0;

const RAD_PER_SEC_TO_RPM: f32 = 60.0 / (2.0 * PI);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GearShift {
    pub from: usize,
    pub to: usize,
}

impl GearShift {
    pub fn is_upshift(&self) -> bool {
        self.to > self.from
    }
}

/// Position of `rpm` between idle and redline, clamped to [0, 1].
#[inline]
pub fn rpm_fraction(profile: &VehicleProfile, rpm: f32) -> f32 {
    let band = (profile.max_rpm - profile.idle_rpm).max(1.0);
    ((rpm - profile.idle_rpm) / band).clamp(0.0, 1.0)
}

/// Engine output torque for this tick. Nitro multiplies torque and heats the
/// engine; otherwise the engine cools toward ambient.
pub fn engine_torque(profile: &VehicleProfile, state: &mut VehicleState, nitro: bool, dt: f32) -> f32 {
    let multiplier = profile.torque_curve.evaluate(rpm_fraction(profile, state.engine_rpm));
    let mut torque = multiplier * profile.max_torque;

    if nitro {
        torque *= profile.nitro_multiplier;
        state.engine_heat += profile.nitro_heat_rate * dt;
    } else if state.engine_heat > AMBIENT_ENGINE_HEAT {
        state.engine_heat = (state.engine_heat - ENGINE_COOLING_RATE * dt).max(AMBIENT_ENGINE_HEAT);
    }

    torque
}

/// Combined gear and final-drive ratio for the current gear.
#[inline]
pub fn overall_ratio(profile: &VehicleProfile, gear: usize) -> f32 {
    let ratio = profile.gear_ratios.get(gear).copied().unwrap_or(1.0);
    ratio * profile.final_drive
}

/// Blend rpm toward the wheel-driven target and clamp to [idle, max].
pub fn update_rpm(profile: &VehicleProfile, state: &mut VehicleState, wheel_omega: f32, dt: f32) {
    let target = wheel_omega.abs() * overall_ratio(profile, state.current_gear) * RAD_PER_SEC_TO_RPM;
    let t = (dt * profile.rpm_response).clamp(0.0, 1.0);
    let rpm = lerp(state.engine_rpm, target, t);
    state.engine_rpm = rpm.clamp(profile.idle_rpm, profile.max_rpm);
}

/// Shift at most one gear. Upshift has priority over downshift.
pub fn auto_shift(profile: &VehicleProfile, state: &mut VehicleState) -> Option<GearShift> {
    let from = state.current_gear.min(profile.top_gear());
    state.current_gear = from;

    let to = if state.engine_rpm > profile.max_rpm * UPSHIFT_FRACTION && from < profile.top_gear() {
        from + 1
    } else if state.engine_rpm < profile.max_rpm * DOWNSHIFT_FRACTION && from > 0 {
        from - 1
    } else {
        return None;
    };

    state.current_gear = to;
    Some(GearShift { from, to })
}

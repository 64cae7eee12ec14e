// ==============================================================================
// aero.rs — DOWNFORCE / DRAG + ACTIVE SPOILER HYSTERESIS
// ------------------------------------------------------------------------------
// downforce = c_down * v^2 (x1.5 while the spoiler is deployed), along -up
// drag      = c_drag * v^2, opposing velocity
//
// The spoiler deploys above SPOILER_DEPLOY_KMH and retracts below
// SPOILER_RETRACT_KMH. Inside the band it keeps whatever state it had.
// ==============================================================================

use nalgebra::{UnitQuaternion, Vector3};
use serde::Serialize;

use crate::vehicle::profile::VehicleProfile;

pub const SPOILER_DEPLOY_KMH: f32 = 100.0;
pub const SPOILER_RETRACT_KMH: f32 = 60.0;
pub const SPOILER_DOWNFORCE_GAIN: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpoilerChange {
    Deployed,
    Retracted,
}

/// Advance the spoiler state machine. Returns the transition, if any.
pub fn update_spoiler(profile: &VehicleProfile, deployed: &mut bool, speed_kmh: f32) -> Option<SpoilerChange> {
    if !profile.active_spoiler {
        *deployed = false;
        return None;
    }

    if !*deployed && speed_kmh > SPOILER_DEPLOY_KMH {
        *deployed = true;
        Some(SpoilerChange::Deployed)
    } else if *deployed && speed_kmh < SPOILER_RETRACT_KMH {
        *deployed = false;
        Some(SpoilerChange::Retracted)
    } else {
        None
    }
}

pub struct AeroForces {
    pub downforce: Vector3<f32>,
    pub drag: Vector3<f32>,
}

pub fn aero_forces(
    profile: &VehicleProfile,
    rotation: &UnitQuaternion<f32>,
    velocity: &Vector3<f32>,
    spoiler_deployed: bool,
) -> AeroForces {
    let speed = velocity.norm();
    let speed_sq = speed * speed;

    let mut downforce = profile.downforce_coefficient * speed_sq;
    if spoiler_deployed {
        downforce *= SPOILER_DOWNFORCE_GAIN;
    }
    let up = rotation * Vector3::y();

    let drag = if speed > 1e-4 {
        -(velocity / speed) * (profile.drag_coefficient * speed_sq)
    } else {
        Vector3::zeros()
    };

    AeroForces {
        downforce: -up * downforce,
        drag,
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ai::motif::MotifMix;
use crate::ai::utility::Goal;
use crate::vehicle::simulator::VehicleSimulator;
use crate::vehicle::state::ControlInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleRole {
    Player,
    Rival,
    Police,
}

impl VehicleRole {
    /// AI-driven roles own an agent (blackboard, threat service, goal).
    pub fn is_ai(&self) -> bool {
        !matches!(self, VehicleRole::Player)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSnapshot {
    pub id: Uuid,
    pub role: VehicleRole,
    pub profile: String,
    pub position: [f32; 3],
    pub rotation: [f32; 4], // quaternion i, j, k, w
    pub speed_kmh: f32,
    pub rpm: f32,
    pub gear: usize,
    pub engine_heat: f32,
    pub structural_damage: f32,
    pub average_tire_wear: f32,
    pub spoiler_deployed: bool,
    pub input: ControlInput,
    pub goal: Option<Goal>,
    pub threat: Option<f32>,
}

impl VehicleSnapshot {
    pub fn capture(id: Uuid, role: VehicleRole, sim: &VehicleSimulator, goal: Option<Goal>, threat: Option<f32>) -> Self {
        let state = sim.state();
        let q = state.orientation.quaternion();
        Self {
            id,
            role,
            profile: sim.profile().name.clone(),
            position: [state.position.x, state.position.y, state.position.z],
            rotation: [q.i, q.j, q.k, q.w],
            speed_kmh: state.speed_kmh,
            rpm: state.engine_rpm,
            gear: state.current_gear,
            engine_heat: state.engine_heat,
            structural_damage: state.structural_damage,
            average_tire_wear: state.average_tire_wear(),
            spoiler_deployed: state.spoiler_deployed,
            input: sim.input(),
            goal,
            threat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub time: f32, // s
    pub tension: f32,
    pub enemy_density: f32,
    pub chase_intensity: f32,
    pub heat: f32,
    pub aggression: f32,
    pub time_remaining: Option<f32>,
    pub motif: MotifMix,
    pub vehicles: Vec<VehicleSnapshot>,
}

impl WorldSnapshot {
    pub fn vehicle(&self, id: Uuid) -> Option<&VehicleSnapshot> {
        self.vehicles.iter().find(|v| v.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::profile::VehicleProfile;
    use std::sync::Arc;

    #[test]
    fn capture_reflects_simulator_state() {
        let sim = VehicleSimulator::new(Arc::new(VehicleProfile::interceptor()));
        let id = Uuid::new_v4();
        let snap = VehicleSnapshot::capture(id, VehicleRole::Police, &sim, Some(Goal::Race), Some(0.3));
        assert_eq!(snap.id, id);
        assert_eq!(snap.profile, "interceptor");
        assert_eq!(snap.gear, 0);
        assert_eq!(snap.rpm, 900.0);
        assert_eq!(snap.rotation, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(snap.average_tire_wear, 1.0);
    }

    #[test]
    fn roles_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&VehicleRole::Police).unwrap(), "\"police\"");
        assert!(VehicleRole::Rival.is_ai());
        assert!(!VehicleRole::Player.is_ai());
    }
}

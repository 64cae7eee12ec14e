// ==============================================================================
// world.rs — HEIST WORLD (COMPOSITION ROOT)
// ------------------------------------------------------------------------------
// Owns every vehicle (simulator + rapier rig), the AI agents, the mission, the
// tension director and the event bus. No globals: everything downstream gets
// what it needs through `step`.
//
// Tick order:
// 1) perception   threat service per agent (jittered), blackboard refresh
// 2) decision     utility scorer -> goal (changes published)
// 3) control      goal behavior -> ControlInput; players keep their last input
// 4) vehicles     simulator + tire forces per chassis (shifts / spoiler published)
// 5) physics      rapier pipeline step, runaway reset
// 6) mission      police-proximity heat, escalation, director smoothing
// 7) telemetry    snapshot every `snapshot_every` ticks
// ==============================================================================

use std::sync::Arc;

use nalgebra::{Point3, UnitQuaternion, Vector3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::ai::behavior::{AgentView, plan};
use crate::ai::blackboard::Blackboard;
use crate::ai::director::{DirectorConfig, HeistDirector};
use crate::ai::mission::{HeistMission, MissionEvent};
use crate::ai::motif::{Motif, MotifMix};
use crate::ai::threat::{ThreatEvaluator, ThreatScene, ThreatService, motif_intensity};
use crate::ai::utility::{Goal, UtilityScorer, UtilityTable};
use crate::error::{SimError, SimResult};
use crate::events::{DEFAULT_EVENT_CAPACITY, EventBus, SimEvent};
use crate::physics::{PhysicsWorld, RapierVehicle};
use crate::state::{VehicleRole, VehicleSnapshot, WorldSnapshot};
use crate::vehicle::profile::VehicleProfile;
use crate::vehicle::simulator::VehicleSimulator;
use crate::vehicle::state::{ControlInput, VehicleState};

pub const PURSUIT_RADIUS: f32 = 40.0;   // m, police closer than this heat up the mission
pub const HEAT_PER_SECOND: f32 = 5.0;   // at zero distance, per police car
pub const BOSS_RANGE: f32 = 30.0;       // m, rival engages the player inside this

#[derive(Debug, Clone)]
pub struct WorldSettings {
    pub director: DirectorConfig,
    pub utility: UtilityTable,
    pub threat: ThreatEvaluator,
    pub time_limit: Option<f32>, // s
    pub seed: Option<u64>,
    pub snapshot_every: u64,     // ticks
    pub event_capacity: usize,
    pub motif: Motif,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            director: DirectorConfig::default(),
            utility: UtilityTable::default(),
            threat: ThreatEvaluator::default(),
            time_limit: None,
            seed: None,
            snapshot_every: 3,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            motif: Motif::Storm,
        }
    }
}

/// Perception and decision state of one AI-driven vehicle.
#[derive(Debug, Clone)]
pub struct Agent {
    pub blackboard: Blackboard,
    pub threat: ThreatService,
    pub goal: Option<Goal>,
}

struct VehicleEntry {
    id: Uuid,
    role: VehicleRole,
    sim: VehicleSimulator,
    rig: RapierVehicle,
    agent: Option<Agent>,
}

/// Pose summary used while the entry list is borrowed mutably.
#[derive(Clone, Copy)]
struct Sighting {
    id: Uuid,
    role: VehicleRole,
    position: Point3<f32>,
}

pub struct HeistWorld {
    physics: PhysicsWorld,
    vehicles: Vec<VehicleEntry>,
    director: HeistDirector,
    mission: HeistMission,
    scorer: UtilityScorer,
    evaluator: ThreatEvaluator,
    rng: StdRng,
    bus: EventBus,
    motif: Motif,
    snapshot_every: u64,
    tick: u64,
    time: f32,
}

impl Default for HeistWorld {
    fn default() -> Self {
        Self::new(WorldSettings::default())
    }
}

impl HeistWorld {
    pub fn new(settings: WorldSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            physics: PhysicsWorld::new(),
            vehicles: Vec::new(),
            director: HeistDirector::new(settings.director),
            mission: HeistMission::new(settings.time_limit),
            scorer: UtilityScorer::new(settings.utility),
            evaluator: settings.threat,
            rng,
            bus: EventBus::new(settings.event_capacity),
            motif: settings.motif,
            snapshot_every: settings.snapshot_every.max(1),
            tick: 0,
            time: 0.0,
        }
    }

    // ------------------------------------------------------------------
    // population
    // ------------------------------------------------------------------

    pub fn spawn_vehicle(&mut self, role: VehicleRole, profile: Arc<VehicleProfile>, position: Point3<f32>) -> Uuid {
        self.spawn_vehicle_facing(role, profile, position, 0.0)
    }

    pub fn spawn_vehicle_facing(
        &mut self,
        role: VehicleRole,
        profile: Arc<VehicleProfile>,
        position: Point3<f32>,
        yaw: f32,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let rig = self.physics.spawn_chassis(&profile, position, yaw);

        let mut state = VehicleState::spawn(&profile);
        match self.physics.pose(rig.body) {
            Some((position, orientation)) => {
                state.position = position;
                state.orientation = orientation;
            }
            None => state.orientation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw),
        }
        let sim = VehicleSimulator::with_state(profile, state);

        let agent = role.is_ai().then(|| Agent {
            blackboard: Blackboard {
                mission_active: true,
                ..Blackboard::default()
            },
            threat: ThreatService::new(self.evaluator),
            goal: None,
        });

        self.vehicles.push(VehicleEntry { id, role, sim, rig, agent });
        tracing::info!(%id, ?role, x = position.x, z = position.z, "vehicle spawned");
        self.bus.publish(SimEvent::VehicleSpawned { vehicle_id: id, role });
        id
    }

    pub fn despawn(&mut self, id: Uuid) -> SimResult<()> {
        let idx = self.index_of(id)?;
        let entry = self.vehicles.remove(idx);
        self.physics.remove_chassis(entry.rig.body);
        tracing::info!(%id, role = ?entry.role, "vehicle removed");
        self.bus.publish(SimEvent::VehicleRemoved { vehicle_id: id });
        Ok(())
    }

    pub fn set_player_input(&mut self, id: Uuid, input: ControlInput) -> SimResult<()> {
        let idx = self.index_of(id)?;
        let entry = &mut self.vehicles[idx];
        if entry.role != VehicleRole::Player {
            return Err(SimError::NotPlayerControlled(id));
        }
        entry.sim.apply_input(input);
        Ok(())
    }

    /// Route an AI agent toward a waypoint (delivery point, checkpoint).
    pub fn set_waypoint(&mut self, id: Uuid, waypoint: Option<Point3<f32>>) -> SimResult<()> {
        let idx = self.index_of(id)?;
        let agent = self.vehicles[idx].agent.as_mut().ok_or(SimError::NoAgent(id))?;
        agent.blackboard.target_waypoint = waypoint;
        Ok(())
    }

    pub fn set_motif(&mut self, motif: Motif) {
        self.motif = motif;
    }

    // ------------------------------------------------------------------
    // accessors
    // ------------------------------------------------------------------

    pub fn subscribe(&self) -> broadcast::Receiver<SimEvent> {
        self.bus.subscribe()
    }

    pub fn tick_count(&self) -> u64 { self.tick }
    pub fn time(&self) -> f32 { self.time }
    pub fn director(&self) -> &HeistDirector { &self.director }
    pub fn mission(&self) -> &HeistMission { &self.mission }
    pub fn vehicle_count(&self) -> usize { self.vehicles.len() }

    pub fn vehicle(&self, id: Uuid) -> Option<&VehicleSimulator> {
        self.vehicles.iter().find(|v| v.id == id).map(|v| &v.sim)
    }

    pub fn agent(&self, id: Uuid) -> Option<&Agent> {
        self.vehicles.iter().find(|v| v.id == id).and_then(|v| v.agent.as_ref())
    }

    pub fn agent_mut(&mut self, id: Uuid) -> Option<&mut Agent> {
        self.vehicles.iter_mut().find(|v| v.id == id).and_then(|v| v.agent.as_mut())
    }

    pub fn role(&self, id: Uuid) -> Option<VehicleRole> {
        self.vehicles.iter().find(|v| v.id == id).map(|v| v.role)
    }

    fn index_of(&self, id: Uuid) -> SimResult<usize> {
        self.vehicles
            .iter()
            .position(|v| v.id == id)
            .ok_or(SimError::UnknownVehicle(id))
    }

    // ------------------------------------------------------------------
    // tick
    // ------------------------------------------------------------------

    pub fn step(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }

        let sightings: Vec<Sighting> = self
            .vehicles
            .iter()
            .map(|v| Sighting { id: v.id, role: v.role, position: v.sim.state().position })
            .collect();

        // 1-3) agents
        for entry in self.vehicles.iter_mut() {
            let Some(agent) = entry.agent.as_mut() else { continue };
            let state = entry.sim.state();
            let position = state.position;

            let player = nearest(&sightings, position, |s| s.id != entry.id && s.role == VehicleRole::Player);
            let police: Vec<Point3<f32>> = sightings
                .iter()
                .filter(|s| s.id != entry.id && s.role == VehicleRole::Police)
                .map(|s| s.position)
                .collect();

            // police chase the player; rivals race to their waypoint and duel up close
            let bb = &mut agent.blackboard;
            bb.set_damage_pct(state.damage_fraction());
            bb.rival = player.map(|p| p.id);
            match entry.role {
                VehicleRole::Police => bb.target_waypoint = player.map(|p| p.position),
                VehicleRole::Rival => {
                    bb.boss_engaged = player
                        .is_some_and(|p| nalgebra::distance(&p.position, &position) < BOSS_RANGE);
                }
                VehicleRole::Player => {}
            }

            let scene = ThreatScene {
                self_position: position,
                speed_kmh: state.speed_kmh,
                damage: state.damage_fraction(),
                rival_position: player.map(|p| p.position),
                police_positions: if entry.role == VehicleRole::Police { &[] } else { police.as_slice() },
            };
            agent.threat.tick(dt, &scene, bb, &mut self.rng);

            let goal = self.scorer.select(bb);
            if agent.goal != Some(goal) {
                tracing::debug!(id = %entry.id, from = ?agent.goal, to = ?goal, "goal changed");
                self.bus.publish(SimEvent::GoalChanged { vehicle_id: entry.id, from: agent.goal, to: goal });
                agent.goal = Some(goal);
            }

            let view = AgentView {
                position,
                forward: state.forward(),
                speed_kmh: state.speed_kmh,
                rival_position: player.map(|p| p.position),
            };
            let input = plan(goal, &view, bb);
            entry.sim.apply_input(input);
        }

        // 4) vehicles
        for entry in self.vehicles.iter_mut() {
            let Some(report) = self.physics.drive(&mut entry.rig, &mut entry.sim, dt) else {
                continue;
            };
            for event in SimEvent::from_report(entry.id, &report) {
                self.bus.publish(event);
            }
        }

        // 5) physics
        for handle in self.physics.step(dt) {
            if let Some(entry) = self.vehicles.iter().find(|v| v.rig.body == handle) {
                tracing::warn!(id = %entry.id, "vehicle reset after leaving the world");
            }
        }

        // 6) mission
        self.mission.add_heat(pursuit_heat(&sightings, dt));
        for event in self.mission.tick(dt, &mut self.director) {
            self.bus.publish(match event {
                MissionEvent::Escalated { heat, aggression } => SimEvent::Escalated { heat, aggression },
                MissionEvent::TimedOut { elapsed } => SimEvent::MissionTimedOut { elapsed },
            });
        }
        self.director.tick(dt);

        // 7) telemetry
        self.tick += 1;
        self.time += dt;
        if self.tick % self.snapshot_every == 0 {
            self.bus.publish(SimEvent::Snapshot(self.snapshot()));
        }
    }

    /// Threat as seen from the first player car; drives the motif mix.
    fn player_threat(&self) -> f32 {
        let Some(player) = self.vehicles.iter().find(|v| v.role == VehicleRole::Player) else {
            return 0.0;
        };
        let state = player.sim.state();
        let rival = self
            .vehicles
            .iter()
            .filter(|v| v.role == VehicleRole::Rival)
            .map(|v| v.sim.state().position)
            .min_by(|a, b| {
                nalgebra::distance_squared(&state.position, a).total_cmp(&nalgebra::distance_squared(&state.position, b))
            });
        let police: Vec<Point3<f32>> = self
            .vehicles
            .iter()
            .filter(|v| v.role == VehicleRole::Police)
            .map(|v| v.sim.state().position)
            .collect();

        self.evaluator.evaluate_scene(&ThreatScene {
            self_position: state.position,
            speed_kmh: state.speed_kmh,
            damage: state.damage_fraction(),
            rival_position: rival,
            police_positions: &police,
        })
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let vehicles = self
            .vehicles
            .iter()
            .map(|v| {
                let (goal, threat) = match &v.agent {
                    Some(a) => (a.goal, Some(a.blackboard.threat_level)),
                    None => (None, None),
                };
                VehicleSnapshot::capture(v.id, v.role, &v.sim, goal, threat)
            })
            .collect();

        WorldSnapshot {
            tick: self.tick,
            time: self.time,
            tension: self.director.current_tension(),
            enemy_density: self.director.enemy_density(),
            chase_intensity: self.director.chase_intensity(),
            heat: self.mission.heat(),
            aggression: self.director.aggression(),
            time_remaining: self.mission.remaining(),
            motif: MotifMix::new(self.motif, motif_intensity(self.player_threat())),
            vehicles,
        }
    }

    /// Mission restart: clear heat, clock and aggression, respawn-fresh every car.
    pub fn restart_mission(&mut self) {
        self.mission.reset(&mut self.director);
        for entry in self.vehicles.iter_mut() {
            if !self.physics.respawn_chassis(entry.rig.body) {
                tracing::warn!(id = %entry.id, "no chassis to respawn");
            }
            entry.rig.reset_wheels();
            match self.physics.pose(entry.rig.body) {
                Some((position, orientation)) => entry.sim.respawn_at(position, orientation),
                None => entry.sim.reset(),
            }
            if let Some(agent) = entry.agent.as_mut() {
                agent.blackboard.reset();
                agent.blackboard.mission_active = true;
                agent.goal = None;
            }
        }
    }
}

fn nearest(sightings: &[Sighting], from: Point3<f32>, keep: impl Fn(&Sighting) -> bool) -> Option<Sighting> {
    sightings
        .iter()
        .filter(|s| keep(s))
        .min_by(|a, b| {
            nalgebra::distance_squared(&from, &a.position).total_cmp(&nalgebra::distance_squared(&from, &b.position))
        })
        .copied()
}

/// Heat gained this tick from police cars near any player.
fn pursuit_heat(sightings: &[Sighting], dt: f32) -> f32 {
    let players = sightings.iter().filter(|s| s.role == VehicleRole::Player);
    let mut heat = 0.0;
    for player in players {
        for cop in sightings.iter().filter(|s| s.role == VehicleRole::Police) {
            let d = nalgebra::distance(&player.position, &cop.position);
            if d < PURSUIT_RADIUS {
                heat += HEAT_PER_SECOND * (1.0 - d / PURSUIT_RADIUS) * dt;
            }
        }
    }
    heat
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> HeistWorld {
        HeistWorld::new(WorldSettings { seed: Some(11), ..WorldSettings::default() })
    }

    #[test]
    fn spawn_and_despawn_publish_events() {
        let mut world = seeded();
        let mut rx = world.subscribe();
        let id = world.spawn_vehicle(VehicleRole::Player, Arc::new(VehicleProfile::street_racer()), Point3::origin());
        assert_eq!(world.vehicle_count(), 1);
        assert!(matches!(rx.try_recv(), Ok(SimEvent::VehicleSpawned { vehicle_id, role: VehicleRole::Player }) if vehicle_id == id));

        world.despawn(id).unwrap();
        assert_eq!(world.vehicle_count(), 0);
        assert!(matches!(rx.try_recv(), Ok(SimEvent::VehicleRemoved { vehicle_id }) if vehicle_id == id));
        assert!(matches!(world.despawn(id), Err(SimError::UnknownVehicle(_))));
    }

    #[test]
    fn player_input_only_for_player_vehicles() {
        let mut world = seeded();
        let player = world.spawn_vehicle(VehicleRole::Player, Arc::new(VehicleProfile::street_racer()), Point3::origin());
        let cop = world.spawn_vehicle(VehicleRole::Police, Arc::new(VehicleProfile::interceptor()), Point3::new(20.0, 0.0, 0.0));

        world.set_player_input(player, ControlInput::new(3.0, 0.0, 0.0, false)).unwrap();
        assert_eq!(world.vehicle(player).unwrap().input().throttle, 1.0);
        assert!(matches!(
            world.set_player_input(cop, ControlInput::default()),
            Err(SimError::NotPlayerControlled(_))
        ));
        assert!(matches!(world.set_waypoint(player, None), Err(SimError::NoAgent(_))));
        assert!(world.set_player_input(Uuid::new_v4(), ControlInput::default()).is_err());
    }

    #[test]
    fn agents_pick_goals_on_first_tick() {
        let mut world = seeded();
        world.spawn_vehicle(VehicleRole::Player, Arc::new(VehicleProfile::street_racer()), Point3::origin());
        let cop = world.spawn_vehicle(VehicleRole::Police, Arc::new(VehicleProfile::interceptor()), Point3::new(0.0, 0.0, -60.0));
        let mut rx = world.subscribe();

        world.step(1.0 / 60.0);

        assert_eq!(world.agent(cop).unwrap().goal, Some(Goal::Race));
        let mut saw_goal = false;
        while let Ok(ev) = rx.try_recv() {
            if let SimEvent::GoalChanged { vehicle_id, from: None, to: Goal::Race } = ev {
                saw_goal |= vehicle_id == cop;
            }
        }
        assert!(saw_goal);
    }

    #[test]
    fn close_police_heat_up_the_mission() {
        let sightings = [
            Sighting { id: Uuid::new_v4(), role: VehicleRole::Player, position: Point3::origin() },
            Sighting { id: Uuid::new_v4(), role: VehicleRole::Police, position: Point3::new(0.0, 0.0, 10.0) },
            Sighting { id: Uuid::new_v4(), role: VehicleRole::Police, position: Point3::new(0.0, 0.0, 100.0) },
        ];
        let heat = pursuit_heat(&sightings, 1.0);
        assert!((heat - HEAT_PER_SECOND * 0.75).abs() < 1e-5);
    }

    #[test]
    fn snapshots_follow_cadence() {
        let mut world = HeistWorld::new(WorldSettings { seed: Some(3), snapshot_every: 2, ..WorldSettings::default() });
        world.spawn_vehicle(VehicleRole::Player, Arc::new(VehicleProfile::street_racer()), Point3::origin());
        let mut rx = world.subscribe();

        for _ in 0..6 {
            world.step(1.0 / 60.0);
        }
        let mut ticks = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if let SimEvent::Snapshot(s) = ev {
                ticks.push(s.tick);
            }
        }
        assert_eq!(ticks, vec![2, 4, 6]);
    }

    #[test]
    fn invalid_dt_does_not_advance() {
        let mut world = seeded();
        world.step(0.0);
        world.step(f32::NAN);
        assert_eq!(world.tick_count(), 0);
    }

    #[test]
    fn restart_clears_mission_state() {
        let mut world = seeded();
        let player = world.spawn_vehicle(VehicleRole::Player, Arc::new(VehicleProfile::street_racer()), Point3::origin());
        world.spawn_vehicle(VehicleRole::Police, Arc::new(VehicleProfile::interceptor()), Point3::new(0.0, 0.0, 5.0));
        world.set_player_input(player, ControlInput::new(1.0, 0.0, 0.0, false)).unwrap();
        for _ in 0..30 {
            world.step(1.0 / 60.0);
        }
        assert!(world.mission().heat() > 0.0);

        world.restart_mission();
        assert_eq!(world.mission().heat(), 0.0);
        assert_eq!(world.director().current_tension(), 0.0);
        assert_eq!(world.vehicle(player).unwrap().input(), ControlInput::default());
    }
}

// src/physics.rs
// ==============================================================================
// RAPIER RIG — RAYCAST-SUSPENSION VEHICLES ON A FLAT GROUND PLANE
// ------------------------------------------------------------------------------
// Per vehicle, per tick:
// 1) raycast suspension contacts            (suspension_contact.rs)
// 2) VehicleSimulator::step                 (aero forces + wheel commands)
// 3) tire forces at each contact point      (normal + long + lateral)
// 4) anti-roll bars per axle
// Then, once per tick for the whole world:
// 5) angular damping, rapier pipeline step, runaway-body reset
// ==============================================================================

use std::collections::HashMap;

use nalgebra::{Point3, Quaternion, UnitQuaternion, Vector3};
use rapier3d::prelude::*;

use crate::suspension_contact::{SuspensionContact, WheelMount, build_suspension_contact, slip_components, wheel_basis_world};
use crate::vehicle::body::{MAX_FORWARD_SLIP, PhysicsBody, WheelContact, WheelSlip};
use crate::vehicle::profile::VehicleProfile;
use crate::vehicle::simulator::{TickReport, VehicleSimulator};
use crate::vehicle::state::WheelId;

const GROUP_GROUND: Group  = Group::from_bits_truncate(0b0001);
const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);

pub const GRAVITY: f32 = 9.81;
pub const SPAWN_HEIGHT: f32 = 1.3;                       // m above the requested point
pub const WORLD_LIMIT: f32 = 1_000.0;                    // |coord| beyond this is a runaway
pub const CHASSIS_HALF_EXTENTS: [f32; 3] = [1.0, 0.35, 2.1];
pub const CHASSIS_COM_OFFSET: [f32; 3] = [0.0, -0.15, 0.0];
const WHEEL_MOUNT_X: f32 = 0.8;                          // +X is left
const WHEEL_MOUNT_Y: f32 = -0.3;
const ARB_FRONT: f32 = 18_000.0;                         // N/m
const ARB_REAR: f32 = 12_000.0;                          // N/m
const ANGULAR_DAMPING_PER_SEC: f32 = 2.0;
const LOW_SPEED_YAW_DAMPING: f32 = 6.0;

// ============================================
// nalgebra <-> rapier conversions
// ============================================

#[inline] fn na_vec(v: &Vector<Real>) -> Vector3<f32> { Vector3::new(v.x, v.y, v.z) }
#[inline] fn rp_vec(v: &Vector3<f32>) -> Vector<Real> { vector![v.x, v.y, v.z] }
#[inline] fn na_point(t: &Vector<Real>) -> Point3<f32> { Point3::new(t.x, t.y, t.z) }
#[inline] fn na_rot(r: &Rotation<Real>) -> UnitQuaternion<f32> {
    UnitQuaternion::from_quaternion(Quaternion::new(r.w, r.i, r.j, r.k))
}

// ============================================
// wheel contact
// ============================================

#[derive(Debug, Clone)]
pub struct RaycastWheel {
    pub mount: WheelMount,
    pub forward_stiffness: f32,
    pub steer_angle: f32,  // rad, positive = right
    pub motor_torque: f32, // N·m
    pub brake_torque: f32, // N·m
    pub slip: WheelSlip,
    pub contact: Option<SuspensionContact>,
}

impl RaycastWheel {
    pub fn new(mount: WheelMount) -> Self {
        Self {
            mount,
            forward_stiffness: 1.0,
            steer_angle: 0.0,
            motor_torque: 0.0,
            brake_torque: 0.0,
            slip: WheelSlip::default(),
            contact: None,
        }
    }

    pub fn grounded(&self) -> bool {
        self.contact.is_some()
    }
}

impl WheelContact for RaycastWheel {
    fn slip(&self) -> WheelSlip { self.slip }
    fn set_forward_stiffness(&mut self, stiffness: f32) { self.forward_stiffness = stiffness; }
    fn set_steer_angle(&mut self, angle: f32) { self.steer_angle = angle; }
    fn set_motor_torque(&mut self, torque: f32) { self.motor_torque = torque; }
    fn set_brake_torque(&mut self, torque: f32) { self.brake_torque = torque.max(0.0); }
}

// ============================================
// chassis adapter
// ============================================

/// Borrowed view of a chassis body for one simulator step.
pub struct RapierChassis<'a> {
    body: &'a mut RigidBody,
}

impl PhysicsBody for RapierChassis<'_> {
    fn position(&self) -> Point3<f32> { na_point(self.body.translation()) }
    fn rotation(&self) -> UnitQuaternion<f32> { na_rot(self.body.rotation()) }
    fn linear_velocity(&self) -> Vector3<f32> { na_vec(self.body.linvel()) }
    fn angular_velocity(&self) -> Vector3<f32> { na_vec(self.body.angvel()) }

    fn apply_force(&mut self, force: Vector3<f32>) {
        if force.iter().all(|c| c.is_finite()) {
            self.body.add_force(rp_vec(&force), true);
        }
    }

    fn apply_torque(&mut self, torque: Vector3<f32>) {
        if torque.iter().all(|c| c.is_finite()) {
            self.body.add_torque(rp_vec(&torque), true);
        }
    }
}

/// A rapier chassis plus its four wheels, in `WheelId` order.
#[derive(Debug, Clone)]
pub struct RapierVehicle {
    pub body: RigidBodyHandle,
    pub wheels: [RaycastWheel; 4],
}

impl RapierVehicle {
    pub fn grounded_wheels(&self) -> usize {
        self.wheels.iter().filter(|w| w.grounded()).count()
    }

    /// Drop wheel commands, slip and contacts (respawn).
    pub fn reset_wheels(&mut self) {
        for wheel in self.wheels.iter_mut() {
            *wheel = RaycastWheel::new(wheel.mount.clone());
        }
    }
}

fn wheel_mounts(profile: &VehicleProfile) -> [WheelMount; 4] {
    WheelId::ALL.map(|id| {
        let x = if matches!(id, WheelId::FL | WheelId::RL) { WHEEL_MOUNT_X } else { -WHEEL_MOUNT_X };
        let half_base = (profile.wheelbase * 0.5).min(CHASSIS_HALF_EXTENTS[2]);
        let z = if id.is_front() { half_base } else { -half_base };
        WheelMount {
            id,
            offset: point![x, WHEEL_MOUNT_Y, z],
            rest_length: profile.suspension_rest_length,
            max_travel: profile.suspension_rest_length,
            radius: profile.wheel_radius,
            stiffness: profile.suspension_stiffness,
            damping: profile.suspension_damping,
        }
    })
}

// ============================================
// world
// ============================================

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub query_pipeline: QueryPipeline,
    spawn_points: HashMap<RigidBodyHandle, SpawnPose>, // chassis -> respawn pose
}

#[derive(Debug, Clone, Copy)]
struct SpawnPose {
    translation: Vector<Real>,
    rotation: Rotation<Real>,
}

/// Teleport to `pose` at rest, with no pending forces.
fn place_at(body: &mut RigidBody, pose: &SpawnPose) {
    body.set_translation(pose.translation, true);
    body.set_rotation(pose.rotation, true);
    body.set_linvel(vector![0.0, 0.0, 0.0], true);
    body.set_angvel(vector![0.0, 0.0, 0.0], true);
    body.reset_forces(true);
    body.reset_torques(true);
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // Static ground slab, top surface exactly at y = 0.
        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -0.1, 0.0])
            .build();
        let ground_handle = bodies.insert(ground_rb);

        let ground_collider = ColliderBuilder::cuboid(WORLD_LIMIT, 0.1, WORLD_LIMIT)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .restitution(0.0)
            .build();
        colliders.insert_with_parent(ground_collider, ground_handle, &mut bodies);

        let mut query_pipeline = QueryPipeline::new();
        query_pipeline.update(&colliders);

        tracing::debug!(bodies = bodies.len(), colliders = colliders.len(), "ground inserted");

        Self {
            gravity: vector![0.0, -GRAVITY, 0.0],
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline,
            spawn_points: HashMap::new(),
        }
    }

    /// Dynamic box chassis, dropped `SPAWN_HEIGHT` above `position`.
    pub fn spawn_chassis(&mut self, profile: &VehicleProfile, position: Point3<f32>, yaw: f32) -> RapierVehicle {
        let translation = vector![position.x, position.y.max(0.0) + SPAWN_HEIGHT, position.z];
        let [hx, hy, hz] = CHASSIS_HALF_EXTENTS;
        let [cx, cy, cz] = CHASSIS_COM_OFFSET;
        let volume = 8.0 * hx * hy * hz;
        let density = profile.mass / volume;

        let rb = RigidBodyBuilder::dynamic()
            .translation(translation)
            .rotation(vector![0.0, yaw, 0.0])
            .linear_damping(0.08)
            .angular_damping(0.6)
            .ccd_enabled(true)
            .build();

        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .translation(vector![cx, cy, cz])
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND))
            .active_events(ActiveEvents::empty())
            .density(density)
            .friction(0.0)
            .restitution(0.0)
            .build();

        let handle = self.bodies.insert(rb);
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        self.query_pipeline.update(&self.colliders);
        self.spawn_points.insert(
            handle,
            SpawnPose {
                translation,
                rotation: Rotation::from_scaled_axis(vector![0.0, yaw, 0.0]),
            },
        );

        tracing::debug!(?handle, profile = %profile.name, "chassis spawned");

        RapierVehicle {
            body: handle,
            wheels: wheel_mounts(profile).map(RaycastWheel::new),
        }
    }

    pub fn remove_chassis(&mut self, handle: RigidBodyHandle) {
        self.spawn_points.remove(&handle);
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Run one simulator step against this chassis and push tire forces.
    /// Returns `None` when the chassis no longer exists.
    pub fn drive(&mut self, vehicle: &mut RapierVehicle, sim: &mut VehicleSimulator, dt: Real) -> Option<TickReport> {
        let handle = vehicle.body;

        // 1) contacts
        {
            let body = self.bodies.get(handle)?;
            for wheel in vehicle.wheels.iter_mut() {
                wheel.contact = build_suspension_contact(
                    &wheel.mount,
                    wheel.steer_angle,
                    body,
                    &self.query_pipeline,
                    &self.bodies,
                    &self.colliders,
                    handle,
                );
            }
        }

        let body = self.bodies.get_mut(handle)?;
        body.reset_forces(true);
        body.reset_torques(true);

        // 2) simulator (aero forces land on the chassis here)
        let report = {
            let mut chassis = RapierChassis { body: &mut *body };
            sim.step(&mut chassis, &mut vehicle.wheels, dt)
        };

        if dt > 0.0 && dt.is_finite() {
            // 3) tires
            apply_tire_forces(body, &mut vehicle.wheels, sim.profile().tire_grip, sim.profile().wheel_radius, dt);
            // 4) anti-roll
            apply_anti_roll(body, &vehicle.wheels);
        }

        Some(report)
    }

    /// Advance the rapier pipeline. Returns the chassis handles that had to be
    /// reset after leaving the world bounds.
    pub fn step(&mut self, dt: Real) -> Vec<RigidBodyHandle> {
        if !(dt.is_finite() && dt > 0.0) {
            return Vec::new();
        }

        self.apply_angular_damping(dt);

        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        self.reset_runaways()
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// Chassis pose in simulator types.
    pub fn pose(&self, handle: RigidBodyHandle) -> Option<(Point3<f32>, UnitQuaternion<f32>)> {
        let body = self.bodies.get(handle)?;
        Some((na_point(body.translation()), na_rot(body.rotation())))
    }

    /// Put a chassis back where it was spawned, at rest. False for unknown handles.
    pub fn respawn_chassis(&mut self, handle: RigidBodyHandle) -> bool {
        let Some(pose) = self.spawn_points.get(&handle) else { return false };
        let Some(body) = self.bodies.get_mut(handle) else { return false };
        place_at(body, pose);
        true
    }

    fn apply_angular_damping(&mut self, dt: Real) {
        for handle in self.spawn_points.keys() {
            let Some(body) = self.bodies.get_mut(*handle) else { continue };
            let angvel = *body.angvel();
            if body.linvel().magnitude() < 1.0 {
                let factor = (-LOW_SPEED_YAW_DAMPING * dt).exp();
                body.set_angvel(vector![0.0, angvel.y * factor, 0.0], true);
            } else {
                let factor = (-ANGULAR_DAMPING_PER_SEC * dt).exp();
                body.set_angvel(angvel * factor, true);
            }
        }
    }

    fn reset_runaways(&mut self) -> Vec<RigidBodyHandle> {
        let mut reset = Vec::new();
        for (handle, spawn) in self.spawn_points.iter() {
            let Some(body) = self.bodies.get_mut(*handle) else { continue };
            let pos = *body.translation();

            let bad = !pos.iter().all(|c| c.is_finite()) || pos.iter().any(|c| c.abs() > WORLD_LIMIT);
            if bad {
                place_at(body, spawn);
                tracing::warn!(?handle, x = pos.x, y = pos.y, z = pos.z, "reset runaway chassis to spawn");
                reset.push(*handle);
            }
        }
        reset
    }
}

// ============================================
// per-wheel force passes
// ============================================

/// Normal, longitudinal and lateral forces at each grounded contact.
///
/// capacity = grip * normal_force (* forward stiffness for the long axis)
/// brakes never push harder than needed to stop the wheel this tick, and the
/// lateral force is the one that would cancel sideways speed, clamped.
fn apply_tire_forces(body: &mut RigidBody, wheels: &mut [RaycastWheel; 4], tire_grip: f32, wheel_radius: f32, dt: Real) {
    let mass_share = body.mass() / 4.0;
    let rot = *body.rotation();
    let radius = wheel_radius.max(1e-3);

    for wheel in wheels.iter_mut() {
        let Some(contact) = wheel.contact.as_ref() else {
            wheel.slip = WheelSlip::default();
            continue;
        };

        let (forward, side) = wheel_basis_world(&rot, wheel.steer_angle);
        let (v_long, v_lat) = slip_components(contact.point_vel, forward, side);
        let load = contact.normal_force;

        let long_capacity = (tire_grip * load * wheel.forward_stiffness).max(1e-3);
        let lat_capacity = tire_grip * load;

        let drive = wheel.motor_torque / radius;
        let brake_demand = wheel.brake_torque / radius;
        let stop_force = v_long.abs() * mass_share / dt;
        let brake = if v_long.abs() > 1e-3 {
            -v_long.signum() * brake_demand.min(stop_force)
        } else {
            0.0
        };

        let f_long = (drive + brake).clamp(-long_capacity, long_capacity);
        let f_lat = (-v_lat * mass_share / dt).clamp(-lat_capacity, lat_capacity);

        let excess = (drive.abs() + brake_demand - long_capacity).max(0.0);
        wheel.slip = WheelSlip {
            forward: (excess / long_capacity).min(MAX_FORWARD_SLIP),
            sideways: v_lat.abs() / v_long.abs().max(1.0),
        };

        let force = contact.ground_normal * load + forward * f_long + side * f_lat;
        if force.iter().all(|c| c.is_finite()) {
            body.add_force_at_point(force, contact.hit_point, true);
        }
    }
}

fn apply_anti_roll(body: &mut RigidBody, wheels: &[RaycastWheel; 4]) {
    let axles = [
        (WheelId::FL, WheelId::FR, ARB_FRONT),
        (WheelId::RL, WheelId::RR, ARB_REAR),
    ];
    for (left, right, stiffness) in axles {
        let (Some(cl), Some(cr)) = (
            wheels[left.index()].contact.as_ref(),
            wheels[right.index()].contact.as_ref(),
        ) else {
            continue;
        };

        let delta = cl.compression - cr.compression;
        if delta.abs() < 1e-4 {
            continue;
        }

        // the more compressed side is pushed up, the other pulled down
        let force = vector![0.0, 1.0, 0.0] * (stiffness * delta);
        body.add_force_at_point(force, cl.hit_point, true);
        body.add_force_at_point(-force, cr.hit_point, true);
    }
}

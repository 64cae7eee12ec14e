// ==============================================================================
// suspension_contact.rs — RAYCAST SUSPENSION + CONTACT PATCH KINEMATICS
// ------------------------------------------------------------------------------
// Per wheel, cast a ray from the mount straight down (chassis frame) and build a
// SuspensionContact:
// - geometry:   hit point, ground normal
// - suspension: compression, compression ratio, suspension velocity,
//               normal force from spring + damper
// - kinematics: contact point velocity (linvel + ω×r)
// - wheel basis (forward / side) after applying the steer angle
// - slip velocities (v_long, v_lat) consumed by the tire force pass
//
// Nothing here applies forces; physics.rs owns that.
// Ground normal is assumed flat-up.
// ==============================================================================

use rapier3d::prelude::*;

use crate::vehicle::state::WheelId;

/// Hard cap on a single wheel's support force (N).
pub const MAX_SUSPENSION_FORCE: f32 = 25_000.0;
const RAY_START_CLEARANCE: f32 = 0.02;

/// Static geometry of one raycast wheel, in chassis space.
#[derive(Debug, Clone)]
pub struct WheelMount {
    pub id: WheelId,
    pub offset: Point<Real>,   // chassis local
    pub rest_length: Real,     // suspension neutral length
    pub max_travel: Real,      // max compression
    pub radius: Real,
    pub stiffness: Real,       // N/m
    pub damping: Real,         // N·s/m
}

#[derive(Debug, Clone)]
pub struct SuspensionContact {
    pub wheel_id: WheelId,

    // geometry
    pub hit_point: Point<Real>,
    pub ground_normal: Vector<Real>,

    // suspension state
    pub compression: f32,
    pub compression_ratio: f32,
    pub suspension_vel: f32,
    pub normal_force: f32,

    // kinematics
    pub point_vel: Vector<Real>,

    // wheel basis (world)
    pub forward: Vector<Real>,
    pub side: Vector<Real>, // points left

    // slip velocities
    pub v_long: f32,
    pub v_lat: f32,
}

/// Spring + damper with a small deadzone and soft rebound.
pub(crate) fn compute_suspension_force(
    compression: f32,
    suspension_vel: f32,
    k: f32,
    c: f32,
) -> f32 {
    // Deadzone
    let v = if suspension_vel.abs() < 0.05 { 0.0 } else { suspension_vel };

    // Rebound gets only part of the damping
    let v = if v > 0.0 { v * 0.4 } else { v };

    let spring = k * compression;
    let damper = (-c * v).clamp(-spring * 0.6, spring * 0.6);

    (spring + damper).clamp(0.0, MAX_SUSPENSION_FORCE)
}

/// Wheel forward/side axes in world space. Positive steer turns the wheel to
/// the right, which is a negative rotation about +Y in this frame.
pub fn wheel_basis_world(chassis_rot: &Rotation<Real>, steer_angle: f32) -> (Vector<Real>, Vector<Real>) {
    let steer = Rotation::<Real>::from_axis_angle(&Vector::<Real>::y_axis(), -steer_angle);
    let local = steer * vector![0.0, 0.0, 1.0];
    let forward = chassis_rot * local;
    let side = vector![0.0, 1.0, 0.0].cross(&forward);
    let side = if side.norm() > 1e-6 { side.normalize() } else { chassis_rot * vector![1.0, 0.0, 0.0] };
    (forward, side)
}

#[inline]
pub fn slip_components(point_vel: Vector<Real>, forward: Vector<Real>, side: Vector<Real>) -> (f32, f32) {
    (point_vel.dot(&forward), point_vel.dot(&side))
}

pub fn build_suspension_contact(
    mount: &WheelMount,
    steer_angle: f32,
    body: &RigidBody,
    query: &QueryPipeline,
    bodies: &RigidBodySet,
    colliders: &ColliderSet,
    handle: RigidBodyHandle,
) -> Option<SuspensionContact> {
    let pos = body.position();
    let linvel = *body.linvel();
    let angvel = *body.angvel();
    let com = *body.center_of_mass();

    // ray starts just above the mount: toi = clearance + spring length + radius
    let origin = pos * (mount.offset + vector![0.0, RAY_START_CLEARANCE, 0.0]);
    let dir = pos.rotation * vector![0.0, -1.0, 0.0];
    let ground_n = vector![0.0, 1.0, 0.0];

    let ray = Ray::new(origin, dir);
    let max_dist = RAY_START_CLEARANCE + mount.rest_length + mount.radius;
    let filter = QueryFilter::default().exclude_rigid_body(handle);

    let (_hit, toi) = query.cast_ray(bodies, colliders, &ray, max_dist, true, filter)?;

    let suspension_length = toi - RAY_START_CLEARANCE - mount.radius;
    let compression = (mount.rest_length - suspension_length).clamp(0.0, mount.max_travel);
    if compression <= 0.0 {
        return None;
    }

    let hit_point = origin + dir * toi;
    let r = hit_point.coords - com.coords;
    let point_vel = linvel + angvel.cross(&r);
    let suspension_vel = point_vel.dot(&ground_n);

    let normal_force = compute_suspension_force(compression, suspension_vel, mount.stiffness, mount.damping);

    let (forward, side) = wheel_basis_world(&pos.rotation, steer_angle);
    let (v_long, v_lat) = slip_components(point_vel, forward, side);

    Some(SuspensionContact {
        wheel_id: mount.id,
        hit_point,
        ground_normal: ground_n,
        compression,
        compression_ratio: compression / mount.max_travel.max(1e-3),
        suspension_vel,
        normal_force,
        point_vel,
        forward,
        side,
        v_long,
        v_lat,
    })
}

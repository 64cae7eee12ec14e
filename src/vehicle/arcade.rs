// ==============================================================================
// arcade.rs — HEADLESS PLANAR BACKEND (NO RIGID-BODY ENGINE)
// ------------------------------------------------------------------------------
// A flat-ground point-mass chassis plus four friction-limited wheels. Used by
// tests and offline tooling where a full rapier world is unnecessary.
//
// Per wheel:  grip = mu * (weight + downforce) / 4 * forward_stiffness
//             drive = clamp(motor / radius, ±grip)
//             brake = min(brake / radius, grip), never reverses travel
// Slip:       forward  = excess demand over grip, relative to grip
//             sideways = |v_lat| / max(|v_long|, 1)
// Yaw:        bicycle model on the mean front steer angle
// ==============================================================================

use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::vehicle::body::{MAX_FORWARD_SLIP, PhysicsBody, WheelContact, WheelSlip};
use crate::vehicle::simulator::{TickReport, VehicleSimulator};

const GRAVITY: f32 = 9.81;

#[derive(Debug, Clone)]
pub struct ArcadeBody {
    pub position: Point3<f32>,
    pub yaw: f32,               // radians about +Y, positive = left
    pub velocity: Vector3<f32>, // planar (y = 0)
    pub yaw_rate: f32,          // rad/s
    pub mass: f32,              // kg
    force: Vector3<f32>,
    torque: Vector3<f32>,
}

impl ArcadeBody {
    pub fn new(mass: f32, position: Point3<f32>, yaw: f32) -> Self {
        Self {
            position,
            yaw,
            velocity: Vector3::zeros(),
            yaw_rate: 0.0,
            mass: mass.max(1.0),
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.rotation() * Vector3::z()
    }
}

impl PhysicsBody for ArcadeBody {
    fn position(&self) -> Point3<f32> { self.position }

    fn rotation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.yaw)
    }

    fn linear_velocity(&self) -> Vector3<f32> { self.velocity }

    fn angular_velocity(&self) -> Vector3<f32> { Vector3::new(0.0, self.yaw_rate, 0.0) }

    fn apply_force(&mut self, force: Vector3<f32>) { self.force += force; }

    fn apply_torque(&mut self, torque: Vector3<f32>) { self.torque += torque; }
}

#[derive(Debug, Clone, Copy)]
pub struct ArcadeWheel {
    pub stiffness: f32,
    pub steer_angle: f32,
    pub motor_torque: f32,
    pub brake_torque: f32,
    pub slip: WheelSlip,
}

impl Default for ArcadeWheel {
    fn default() -> Self {
        Self {
            stiffness: 1.0,
            steer_angle: 0.0,
            motor_torque: 0.0,
            brake_torque: 0.0,
            slip: WheelSlip::default(),
        }
    }
}

impl WheelContact for ArcadeWheel {
    fn slip(&self) -> WheelSlip { self.slip }
    fn set_forward_stiffness(&mut self, stiffness: f32) { self.stiffness = stiffness; }
    fn set_steer_angle(&mut self, angle: f32) { self.steer_angle = angle; }
    fn set_motor_torque(&mut self, torque: f32) { self.motor_torque = torque; }
    fn set_brake_torque(&mut self, torque: f32) { self.brake_torque = torque.max(0.0); }
}

/// Chassis + wheels driven by one simulator.
#[derive(Debug, Clone)]
pub struct ArcadeRig {
    pub body: ArcadeBody,
    pub wheels: [ArcadeWheel; 4],
    pub wheelbase: f32, // m, starts at the profile's
}

impl ArcadeRig {
    pub fn new(sim: &VehicleSimulator, position: Point3<f32>, yaw: f32) -> Self {
        Self {
            body: ArcadeBody::new(sim.profile().mass, position, yaw),
            wheels: [ArcadeWheel::default(); 4],
            wheelbase: sim.profile().wheelbase,
        }
    }

    /// Run the simulator for one tick, then integrate the chassis.
    pub fn step(&mut self, sim: &mut VehicleSimulator, dt: f32) -> TickReport {
        let report = sim.step(&mut self.body, &mut self.wheels, dt);
        if dt.is_finite() && dt > 0.0 {
            self.integrate(sim, dt);
        }
        report
    }

    fn integrate(&mut self, sim: &VehicleSimulator, dt: f32) {
        let profile = sim.profile();
        let radius = profile.wheel_radius.max(1e-3);
        let body = &mut self.body;
        let mass = body.mass;

        let forward = body.forward();
        let v_long = body.velocity.dot(&forward);
        let lateral = body.velocity - forward * v_long;

        // Downforce shows up as extra normal load.
        let downforce = (-body.force.y).max(0.0);
        let load_per_wheel = (mass * GRAVITY + downforce) / 4.0;

        let mut drive_total = 0.0;
        let mut brake_total = 0.0;
        let sideways = lateral.norm() / v_long.abs().max(1.0);

        for wheel in self.wheels.iter_mut() {
            let grip = (profile.tire_grip * load_per_wheel * wheel.stiffness).max(1e-3);

            let drive_demand = wheel.motor_torque / radius;
            let brake_demand = wheel.brake_torque / radius;
            let drive = drive_demand.clamp(-grip, grip);
            let brake = brake_demand.min(grip);

            let excess = (drive_demand.abs() + brake_demand - grip).max(0.0);
            wheel.slip = WheelSlip {
                forward: (excess / grip).min(MAX_FORWARD_SLIP),
                sideways,
            };

            drive_total += drive;
            brake_total += brake;
        }

        // ---------------------------------------
        // Longitudinal
        // ---------------------------------------
        let aero_long = body.force.dot(&forward);
        let resist = brake_total * v_long.signum();
        let a_long = (drive_total - resist + aero_long) / mass;
        let mut new_v_long = v_long + a_long * dt;
        if drive_total.abs() < 1e-3 && new_v_long * v_long < 0.0 {
            // brakes and drag stop the car, they never reverse it
            new_v_long = 0.0;
        }
        if v_long == 0.0 && drive_total.abs() < 1e-3 {
            new_v_long = 0.0;
        }

        // ---------------------------------------
        // Lateral: friction bleeds sideways speed
        // ---------------------------------------
        let lat_speed = lateral.norm();
        let lat_capacity = profile.tire_grip * load_per_wheel * 4.0 / mass * dt;
        let new_lateral = if lat_speed > lat_capacity {
            lateral * (1.0 - lat_capacity / lat_speed)
        } else {
            Vector3::zeros()
        };

        // ---------------------------------------
        // Yaw (bicycle model, positive steer = right)
        // ---------------------------------------
        let steer = (self.wheels[0].steer_angle + self.wheels[1].steer_angle) * 0.5;
        let inertia = mass * 1.5;
        body.yaw_rate = -new_v_long * steer.tan() / self.wheelbase.max(0.5) + body.torque.y / inertia * dt;
        body.yaw += body.yaw_rate * dt;

        let new_forward = body.forward();
        body.velocity = new_forward * new_v_long + new_lateral;
        body.velocity.y = 0.0;
        body.position += body.velocity * dt;

        body.force = Vector3::zeros();
        body.torque = Vector3::zeros();
    }
}

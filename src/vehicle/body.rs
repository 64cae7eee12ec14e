//! Capability boundary between the simulator and a physics backend.
//!
//! The simulator never talks to a rigid-body engine directly. A backend hands
//! it one [`PhysicsBody`] (the chassis) and four [`WheelContact`]s per tick.

use nalgebra::{Point3, UnitQuaternion, Vector3};

pub trait PhysicsBody {
    fn position(&self) -> Point3<f32>;
    fn rotation(&self) -> UnitQuaternion<f32>;
    fn linear_velocity(&self) -> Vector3<f32>;
    fn angular_velocity(&self) -> Vector3<f32>;

    /// World-space force at the center of mass, held for the current tick.
    fn apply_force(&mut self, force: Vector3<f32>);
    /// World-space torque, held for the current tick.
    fn apply_torque(&mut self, torque: Vector3<f32>);
}

/// Upper bound on reported forward slip (wheelspin / lockup).
pub const MAX_FORWARD_SLIP: f32 = 5.0;

/// Slip reported by a wheel contact (dimensionless).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelSlip {
    pub forward: f32,
    pub sideways: f32,
}

impl WheelSlip {
    #[inline]
    pub fn magnitude(&self) -> f32 {
        self.forward.abs() + self.sideways.abs()
    }
}

pub trait WheelContact {
    fn slip(&self) -> WheelSlip;
    /// Forward friction stiffness multiplier (1.0 = nominal).
    fn set_forward_stiffness(&mut self, stiffness: f32);
    /// Steer angle in radians, positive = right (matches steering input sign).
    fn set_steer_angle(&mut self, angle: f32);
    /// Drive torque in N·m.
    fn set_motor_torque(&mut self, torque: f32);
    /// Brake torque in N·m (always >= 0).
    fn set_brake_torque(&mut self, torque: f32);
}

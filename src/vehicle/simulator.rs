// ==============================================================================
// simulator.rs — ONE FIXED-TIMESTEP VEHICLE UPDATE
// ==============================================================================
// Order per tick:
// 1) kinematics      (pose, velocity, speed, wheel angular speed)
// 2) engine torque   (curve, nitro, heat)
// 3) transmission    (gear * final drive * throttle, drivetrain split)
// 4) rpm update      (smoothed toward wheel-driven rpm)
// 5) auto-shift      (max one gear, upshift first)
// 6) aerodynamics    (spoiler hysteresis, downforce, drag)
// 7) wear            (tires -> friction stiffness, brake fade, heat damage)
// 8) wheel commands  (motor torque, brake torque, front steer angle)
// ==============================================================================

use std::sync::Arc;

use nalgebra::{Point3, UnitQuaternion};
use serde::Serialize;

use crate::vehicle::aero::{SpoilerChange, aero_forces, update_spoiler};
use crate::vehicle::body::{PhysicsBody, WheelContact};
use crate::vehicle::drivetrain::{distribute, driveline_torque};
use crate::vehicle::engine::{GearShift, auto_shift, engine_torque, update_rpm};
use crate::vehicle::profile::VehicleProfile;
use crate::vehicle::state::{ControlInput, VehicleState, WheelId, clamp_axis};
use crate::vehicle::wear::{update_brake_fade, update_heat_damage, wear_tire};

pub const MS_TO_KMH: f32 = 3.6;

/// Discrete things that happened during one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub shift: Option<GearShift>,
    pub spoiler: Option<SpoilerChange>,
}

pub struct VehicleSimulator {
    profile: Arc<VehicleProfile>,
    state: VehicleState,
    input: ControlInput,
}

impl VehicleSimulator {
    pub fn new(profile: Arc<VehicleProfile>) -> Self {
        let state = VehicleState::spawn(&profile);
        Self::with_state(profile, state)
    }

    pub fn with_state(profile: Arc<VehicleProfile>, mut state: VehicleState) -> Self {
        state.current_gear = state.current_gear.min(profile.top_gear());
        Self {
            profile,
            state,
            input: ControlInput::default(),
        }
    }

    // ------------------------------------------------------------------
    // inputs (clamped at the boundary)
    // ------------------------------------------------------------------

    pub fn set_throttle(&mut self, throttle: f32) {
        self.input.throttle = clamp_axis(throttle, 0.0, 1.0);
    }

    pub fn set_brake(&mut self, brake: f32) {
        self.input.brake = clamp_axis(brake, 0.0, 1.0);
    }

    pub fn set_steering(&mut self, steering: f32) {
        self.input.steering = clamp_axis(steering, -1.0, 1.0);
    }

    pub fn set_nitro(&mut self, nitro: bool) {
        self.input.nitro = nitro;
    }

    pub fn apply_input(&mut self, input: ControlInput) {
        self.input = input.clamped();
    }

    // ------------------------------------------------------------------
    // read accessors
    // ------------------------------------------------------------------

    /// Speed in km/h.
    pub fn speed(&self) -> f32 { self.state.speed_kmh }
    pub fn rpm(&self) -> f32 { self.state.engine_rpm }
    pub fn gear(&self) -> usize { self.state.current_gear }
    pub fn engine_heat(&self) -> f32 { self.state.engine_heat }
    pub fn average_tire_wear(&self) -> f32 { self.state.average_tire_wear() }
    pub fn structural_damage(&self) -> f32 { self.state.structural_damage }
    pub fn spoiler_deployed(&self) -> bool { self.state.spoiler_deployed }
    pub fn state(&self) -> &VehicleState { &self.state }
    pub fn profile(&self) -> &Arc<VehicleProfile> { &self.profile }
    pub fn input(&self) -> ControlInput { self.input }

    /// Put the vehicle back to spawn condition (respawn).
    pub fn reset(&mut self) {
        self.state = VehicleState::spawn(&self.profile);
        self.input = ControlInput::default();
    }

    /// `reset`, then stand at `position` facing `orientation`.
    pub fn respawn_at(&mut self, position: Point3<f32>, orientation: UnitQuaternion<f32>) {
        self.reset();
        self.state.position = position;
        self.state.orientation = orientation;
    }

    // ------------------------------------------------------------------
    // tick
    // ------------------------------------------------------------------

    pub fn step<B, W>(&mut self, body: &mut B, wheels: &mut [W; 4], dt: f32) -> TickReport
    where
        B: PhysicsBody + ?Sized,
        W: WheelContact,
    {
        let mut report = TickReport::default();
        if !(dt.is_finite() && dt > 0.0) {
            return report;
        }

        let profile = Arc::clone(&self.profile);
        let input = self.input;
        let state = &mut self.state;

        // 1) kinematics
        state.position = body.position();
        state.orientation = body.rotation();
        state.linear_velocity = body.linear_velocity();
        state.angular_velocity = body.angular_velocity();

        let speed = state.linear_velocity.norm();
        state.speed_kmh = speed * MS_TO_KMH;
        let wheel_omega = speed / profile.wheel_radius.max(1e-3);

        // 2) engine torque
        let torque = engine_torque(&profile, state, input.nitro, dt);

        // 3) transmission
        let total = driveline_torque(&profile, torque, state.current_gear, input.throttle);
        state.wheel_torque = distribute(profile.drivetrain, total);

        // 4) rpm
        update_rpm(&profile, state, wheel_omega, dt);

        // 5) auto-shift
        report.shift = auto_shift(&profile, state);
        if let Some(shift) = report.shift {
            tracing::debug!(from = shift.from, to = shift.to, rpm = state.engine_rpm, "gear shift");
        }

        // 6) aerodynamics
        report.spoiler = update_spoiler(&profile, &mut state.spoiler_deployed, state.speed_kmh);
        let aero = aero_forces(&profile, &state.orientation, &state.linear_velocity, state.spoiler_deployed);
        body.apply_force(aero.downforce);
        body.apply_force(aero.drag);

        // 7) wear
        for id in WheelId::ALL {
            let i = id.index();
            let stiffness = wear_tire(&mut state.tire_wear[i], wheels[i].slip(), dt);
            wheels[i].set_forward_stiffness(stiffness);
        }
        update_brake_fade(&mut state.brake_fade, input.brake, dt);
        update_heat_damage(state, dt);

        // 8) wheel commands
        let steer_angle = input.steering * profile.max_steering_radians();
        for id in WheelId::ALL {
            let i = id.index();
            let wheel = &mut wheels[i];
            wheel.set_motor_torque(state.wheel_torque[i]);
            wheel.set_brake_torque(profile.brake_force * input.brake * state.brake_fade[i]);
            wheel.set_steer_angle(if id.is_front() { steer_angle } else { 0.0 });
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::body::WheelSlip;
    use nalgebra::{Point3, UnitQuaternion, Vector3};

    #[derive(Default)]
    struct StubBody {
        velocity: Vector3<f32>,
        forces: Vec<Vector3<f32>>,
    }

    impl PhysicsBody for StubBody {
        fn position(&self) -> Point3<f32> { Point3::origin() }
        fn rotation(&self) -> UnitQuaternion<f32> { UnitQuaternion::identity() }
        fn linear_velocity(&self) -> Vector3<f32> { self.velocity }
        fn angular_velocity(&self) -> Vector3<f32> { Vector3::zeros() }
        fn apply_force(&mut self, force: Vector3<f32>) { self.forces.push(force); }
        fn apply_torque(&mut self, _torque: Vector3<f32>) {}
    }

    #[derive(Default, Clone, Copy)]
    struct StubWheel {
        slip: WheelSlip,
        stiffness: f32,
        steer: f32,
        motor: f32,
        brake: f32,
    }

    impl WheelContact for StubWheel {
        fn slip(&self) -> WheelSlip { self.slip }
        fn set_forward_stiffness(&mut self, stiffness: f32) { self.stiffness = stiffness; }
        fn set_steer_angle(&mut self, angle: f32) { self.steer = angle; }
        fn set_motor_torque(&mut self, torque: f32) { self.motor = torque; }
        fn set_brake_torque(&mut self, torque: f32) { self.brake = torque; }
    }

    fn racer() -> VehicleSimulator {
        VehicleSimulator::new(Arc::new(VehicleProfile::street_racer()))
    }

    #[test]
    fn setters_clamp_inputs() {
        let mut sim = racer();
        sim.set_throttle(2.0);
        sim.set_brake(-1.0);
        sim.set_steering(-5.0);
        sim.set_nitro(true);
        assert_eq!(sim.input(), ControlInput { throttle: 1.0, brake: 0.0, steering: -1.0, nitro: true });
    }

    #[test]
    fn rear_drive_torque_reaches_rear_wheels_only() {
        let mut sim = racer();
        sim.set_throttle(1.0);
        let mut body = StubBody::default();
        let mut wheels = [StubWheel::default(); 4];
        sim.step(&mut body, &mut wheels, 1.0 / 60.0);

        assert_eq!(wheels[0].motor, 0.0);
        assert_eq!(wheels[1].motor, 0.0);
        assert!(wheels[2].motor > 0.0);
        assert_eq!(wheels[2].motor, wheels[3].motor);
    }

    #[test]
    fn steering_only_on_front_axle() {
        let mut sim = racer();
        sim.set_steering(0.5);
        let mut body = StubBody::default();
        let mut wheels = [StubWheel::default(); 4];
        sim.step(&mut body, &mut wheels, 1.0 / 60.0);

        let expected = 0.5 * 34.0_f32.to_radians();
        assert!((wheels[0].steer - expected).abs() < 1e-6);
        assert!((wheels[1].steer - expected).abs() < 1e-6);
        assert_eq!(wheels[2].steer, 0.0);
        assert_eq!(wheels[3].steer, 0.0);
    }

    #[test]
    fn brake_torque_scales_with_fade() {
        let mut sim = racer();
        sim.set_brake(1.0);
        let mut body = StubBody::default();
        let mut wheels = [StubWheel::default(); 4];
        let dt = 1.0;
        sim.step(&mut body, &mut wheels, dt);

        let fade = sim.state().brake_fade[0];
        assert!(fade < 1.0);
        let expected = sim.profile().brake_force * fade;
        assert!((wheels[0].brake - expected).abs() < 1e-3);
    }

    #[test]
    fn slip_wears_tires_and_sets_stiffness() {
        let mut sim = racer();
        let mut body = StubBody::default();
        let mut wheels = [StubWheel::default(); 4];
        wheels[2].slip = WheelSlip { forward: 2.0, sideways: 1.0 };
        sim.step(&mut body, &mut wheels, 1.0);

        assert!(sim.state().tire_wear[2] < 1.0);
        assert_eq!(sim.state().tire_wear[0], 1.0);
        assert!(wheels[2].stiffness < wheels[0].stiffness);
    }

    #[test]
    fn aero_forces_are_applied_to_body() {
        let mut sim = racer();
        let mut body = StubBody { velocity: Vector3::new(0.0, 0.0, 30.0), ..Default::default() };
        let mut wheels = [StubWheel::default(); 4];
        let report = sim.step(&mut body, &mut wheels, 1.0 / 60.0);

        assert!((sim.speed() - 108.0).abs() < 1e-3);
        assert_eq!(report.spoiler, Some(SpoilerChange::Deployed));
        let net: Vector3<f32> = body.forces.iter().sum();
        assert!(net.y < 0.0, "downforce pushes the chassis down");
        assert!(net.z < 0.0, "drag opposes travel");
    }

    #[test]
    fn invalid_dt_is_a_no_op() {
        let mut sim = racer();
        sim.set_throttle(1.0);
        let before = sim.state().clone();
        let mut body = StubBody::default();
        let mut wheels = [StubWheel::default(); 4];
        for dt in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert_eq!(sim.step(&mut body, &mut wheels, dt), TickReport::default());
        }
        assert_eq!(sim.state(), &before);
        assert!(body.forces.is_empty());
    }

    #[test]
    fn reset_restores_spawn_state() {
        let mut sim = racer();
        sim.set_throttle(1.0);
        let mut body = StubBody { velocity: Vector3::new(0.0, 0.0, 40.0), ..Default::default() };
        let mut wheels = [StubWheel::default(); 4];
        sim.step(&mut body, &mut wheels, 0.5);
        sim.reset();
        assert_eq!(sim.state(), &VehicleState::spawn(sim.profile()));
        assert_eq!(sim.input(), ControlInput::default());
    }

    #[test]
    fn respawn_keeps_only_the_new_pose() {
        let mut sim = racer();
        let mut body = StubBody { velocity: Vector3::new(0.0, 0.0, 40.0), ..Default::default() };
        let mut wheels = [StubWheel::default(); 4];
        sim.set_throttle(1.0);
        sim.step(&mut body, &mut wheels, 0.5);

        let at = Point3::new(4.0, 1.3, -9.0);
        let facing = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 1.0);
        sim.respawn_at(at, facing);

        let mut expected = VehicleState::spawn(sim.profile());
        expected.position = at;
        expected.orientation = facing;
        assert_eq!(sim.state(), &expected);
        assert_eq!(sim.speed(), 0.0);
    }
}

// ==============================================================================
// behavior.rs — GOAL -> CONTROL INPUT
// ------------------------------------------------------------------------------
// Frame: +Z forward, +Y up, +X left. Steering input is positive to the right,
// so a target on the left (positive heading error) gives negative steering.
//
// steering = clamp(-heading_error / 45deg, -1, 1)
// Inside ARRIVE_RADIUS of the target the agent idles (no input).
// ==============================================================================

use std::f32::consts::{FRAC_PI_4, PI};

use nalgebra::{Point3, Vector3};

use crate::ai::blackboard::Blackboard;
use crate::ai::utility::Goal;
use crate::vehicle::state::ControlInput;

pub const ARRIVE_RADIUS: f32 = 1.5;               // m
pub const STEER_FULL_LOCK_ERROR: f32 = FRAC_PI_4; // 45 deg of error = full lock
pub const STRAIGHT_ERROR: f32 = 0.17;             // ~10 deg
pub const STRAIGHT_MIN_DISTANCE: f32 = 80.0;      // m
pub const STEALTH_THROTTLE: f32 = 0.6;
pub const STEALTH_ZONE_THROTTLE: f32 = 0.4;
pub const RECOVER_THROTTLE: f32 = 0.3;
pub const RECOVER_MAX_KMH: f32 = 60.0;
pub const RECOVER_BRAKE: f32 = 0.5;

/// What an agent knows about its own vehicle when planning.
#[derive(Debug, Clone, Copy)]
pub struct AgentView {
    pub position: Point3<f32>,
    pub forward: Vector3<f32>,
    pub speed_kmh: f32,
    pub rival_position: Option<Point3<f32>>,
}

enum Steer {
    Toward(Point3<f32>),
    Straight,
    Arrived,
}

/// Heading of a planar direction, radians about +Y (positive = left).
#[inline]
fn heading(v: &Vector3<f32>) -> f32 {
    v.x.atan2(v.z)
}

#[inline]
fn wrap_angle(a: f32) -> f32 {
    let mut a = a % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Signed heading error and planar distance to `target`.
fn heading_error(view: &AgentView, target: &Point3<f32>) -> (f32, f32) {
    let mut offset = target - view.position;
    offset.y = 0.0;
    let distance = offset.norm();
    let dir = offset / distance.max(1.0);

    let mut fwd = view.forward;
    fwd.y = 0.0;
    if fwd.norm_squared() < 1e-8 {
        fwd = Vector3::z();
    }
    (wrap_angle(heading(&dir) - heading(&fwd)), distance)
}

fn steer_for(error: f32) -> f32 {
    let s = -error / STEER_FULL_LOCK_ERROR;
    if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 }
}

fn resolve(view: &AgentView, target: Option<Point3<f32>>) -> (Steer, f32, f32) {
    match target {
        None => (Steer::Straight, 0.0, f32::INFINITY),
        Some(t) => {
            let (error, distance) = heading_error(view, &t);
            if distance < ARRIVE_RADIUS {
                (Steer::Arrived, 0.0, distance)
            } else {
                (Steer::Toward(t), error, distance)
            }
        }
    }
}

fn drive(view: &AgentView, target: Option<Point3<f32>>, throttle: f32, nitro_on_straight: bool) -> ControlInput {
    let (steer, error, distance) = resolve(view, target);
    match steer {
        Steer::Arrived => ControlInput::default(),
        Steer::Straight => ControlInput::new(throttle, 0.0, 0.0, nitro_on_straight),
        Steer::Toward(_) => {
            let straight = error.abs() < STRAIGHT_ERROR && distance > STRAIGHT_MIN_DISTANCE;
            ControlInput::new(throttle, 0.0, steer_for(error), nitro_on_straight && straight)
        }
    }
}

/// Turn a goal into one tick of control.
pub fn plan(goal: Goal, view: &AgentView, bb: &Blackboard) -> ControlInput {
    match goal {
        Goal::Race => drive(view, bb.target_waypoint, 1.0, true),

        Goal::StealthDeliver => {
            let cap = if bb.in_stealth_zone { STEALTH_ZONE_THROTTLE } else { STEALTH_THROTTLE };
            drive(view, bb.target_waypoint, cap, false)
        }

        Goal::Flee => {
            // mirror the threat through our own position and run for it
            let away = bb.last_threat_position.and_then(|threat| {
                let mut offset = view.position - threat;
                offset.y = 0.0;
                (offset.norm() >= 1e-3).then(|| view.position + offset / offset.norm().max(1.0) * 50.0)
            });
            match away {
                Some(target) => {
                    let (error, _) = heading_error(view, &target);
                    ControlInput::new(1.0, 0.0, steer_for(error), true)
                }
                None => ControlInput::new(1.0, 0.0, 0.0, true),
            }
        }

        Goal::BossDuel => drive(view, view.rival_position.or(bb.target_waypoint), 1.0, false),

        Goal::Recover => {
            let mut input = drive(view, bb.target_waypoint, RECOVER_THROTTLE, false);
            if view.speed_kmh > RECOVER_MAX_KMH {
                input.throttle = 0.0;
                input.brake = RECOVER_BRAKE;
            }
            input
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_at_origin() -> AgentView {
        AgentView {
            position: Point3::origin(),
            forward: Vector3::z(),
            speed_kmh: 50.0,
            rival_position: None,
        }
    }

    fn board_with_target(target: Point3<f32>) -> Blackboard {
        Blackboard {
            target_waypoint: Some(target),
            ..Blackboard::default()
        }
    }

    #[test]
    fn race_full_throttle_and_nitro_on_long_straight() {
        let bb = board_with_target(Point3::new(0.0, 0.0, 200.0));
        let input = plan(Goal::Race, &view_at_origin(), &bb);
        assert_eq!(input.throttle, 1.0);
        assert_eq!(input.steering, 0.0);
        assert!(input.nitro);
    }

    #[test]
    fn race_no_nitro_when_turning() {
        let bb = board_with_target(Point3::new(100.0, 0.0, 100.0));
        let input = plan(Goal::Race, &view_at_origin(), &bb);
        assert!(!input.nitro);
        // target is 45deg to the left
        assert!((input.steering + 1.0).abs() < 1e-5);
    }

    #[test]
    fn target_on_the_right_steers_right() {
        let bb = board_with_target(Point3::new(-10.0, 0.0, 40.0));
        let input = plan(Goal::Race, &view_at_origin(), &bb);
        assert!(input.steering > 0.0 && input.steering < 1.0);
    }

    #[test]
    fn target_behind_is_full_lock() {
        let bb = board_with_target(Point3::new(0.5, 0.0, -30.0));
        let input = plan(Goal::Race, &view_at_origin(), &bb);
        assert_eq!(input.steering.abs(), 1.0);
    }

    #[test]
    fn arrival_is_a_no_op() {
        let bb = board_with_target(Point3::origin());
        assert_eq!(plan(Goal::Race, &view_at_origin(), &bb), ControlInput::default());
        let bb = board_with_target(Point3::new(0.5, 0.0, 0.5));
        assert_eq!(plan(Goal::StealthDeliver, &view_at_origin(), &bb), ControlInput::default());
    }

    #[test]
    fn stealth_caps_throttle() {
        let mut bb = board_with_target(Point3::new(0.0, 0.0, 300.0));
        let input = plan(Goal::StealthDeliver, &view_at_origin(), &bb);
        assert_eq!(input.throttle, STEALTH_THROTTLE);
        assert!(!input.nitro);

        bb.in_stealth_zone = true;
        let input = plan(Goal::StealthDeliver, &view_at_origin(), &bb);
        assert_eq!(input.throttle, STEALTH_ZONE_THROTTLE);
    }

    #[test]
    fn flee_turns_away_from_threat() {
        let bb = Blackboard {
            last_threat_position: Some(Point3::new(10.0, 0.0, 10.0)),
            ..Blackboard::default()
        };
        let input = plan(Goal::Flee, &view_at_origin(), &bb);
        assert_eq!(input.throttle, 1.0);
        assert!(input.nitro);
        // threat is front-left, so run right
        assert!(input.steering > 0.0);
    }

    #[test]
    fn flee_without_threat_drives_straight() {
        let input = plan(Goal::Flee, &view_at_origin(), &Blackboard::default());
        assert_eq!(input, ControlInput::new(1.0, 0.0, 0.0, true));
    }

    #[test]
    fn boss_duel_seeks_rival() {
        let mut view = view_at_origin();
        view.rival_position = Some(Point3::new(20.0, 0.0, 20.0));
        let bb = board_with_target(Point3::new(-100.0, 0.0, 0.0));
        let input = plan(Goal::BossDuel, &view, &bb);
        assert_eq!(input.throttle, 1.0);
        assert!(input.steering < 0.0);
    }

    #[test]
    fn recover_eases_off_and_brakes_when_fast() {
        let bb = board_with_target(Point3::new(0.0, 0.0, 100.0));
        let mut view = view_at_origin();
        view.speed_kmh = 40.0;
        let slow = plan(Goal::Recover, &view, &bb);
        assert_eq!(slow.throttle, RECOVER_THROTTLE);
        assert_eq!(slow.brake, 0.0);

        view.speed_kmh = 90.0;
        let fast = plan(Goal::Recover, &view, &bb);
        assert_eq!(fast.throttle, 0.0);
        assert_eq!(fast.brake, RECOVER_BRAKE);
    }

    #[test]
    fn degenerate_forward_falls_back_to_z() {
        let mut view = view_at_origin();
        view.forward = Vector3::zeros();
        let bb = board_with_target(Point3::new(0.0, 0.0, 50.0));
        assert_eq!(plan(Goal::Race, &view, &bb).steering, 0.0);
    }
}

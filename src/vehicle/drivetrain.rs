//! Drive torque distribution across the four wheels (FL, FR, RL, RR).

use crate::vehicle::engine::overall_ratio;
use crate::vehicle::profile::{Drivetrain, VehicleProfile};

/// Engine torque through the gearbox and final drive, scaled by throttle.
pub fn driveline_torque(profile: &VehicleProfile, engine_torque: f32, gear: usize, throttle: f32) -> f32 {
    engine_torque * overall_ratio(profile, gear) * throttle
}

/// Split `total` between the axles, then 50/50 within each axle.
pub fn distribute(drivetrain: Drivetrain, total: f32) -> [f32; 4] {
    let front_share = match drivetrain {
        Drivetrain::Front => 1.0,
        Drivetrain::Rear => 0.0,
        Drivetrain::AllWheel { front_share } => front_share.clamp(0.0, 1.0),
    };

    let front = total * front_share * 0.5;
    let rear = total * (1.0 - front_share) * 0.5;
    [front, front, rear, rear]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rear_drive_feeds_rear_pair_only() {
        assert_eq!(distribute(Drivetrain::Rear, 100.0), [0.0, 0.0, 50.0, 50.0]);
    }

    #[test]
    fn front_drive_feeds_front_pair_only() {
        assert_eq!(distribute(Drivetrain::Front, 100.0), [50.0, 50.0, 0.0, 0.0]);
    }

    #[test]
    fn all_wheel_uses_configured_split() {
        let t = distribute(Drivetrain::AllWheel { front_share: 0.4 }, 100.0);
        assert!((t[0] - 20.0).abs() < 1e-4 && (t[1] - 20.0).abs() < 1e-4);
        assert!((t[2] - 30.0).abs() < 1e-4 && (t[3] - 30.0).abs() < 1e-4);
        assert!((t.iter().sum::<f32>() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn driveline_scales_with_ratio_and_throttle() {
        let p = VehicleProfile::street_racer();
        let t = driveline_torque(&p, 100.0, 0, 0.5);
        assert!((t - 100.0 * 3.5 * 3.4 * 0.5).abs() < 1e-2);
        assert_eq!(driveline_torque(&p, 100.0, 0, 0.0), 0.0);
    }
}

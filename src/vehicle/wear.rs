//! Tire wear, brake fade, and heat damage. All outputs stay in range.

use crate::curve::lerp;
use crate::vehicle::body::WheelSlip;
use crate::vehicle::state::{MAX_STRUCTURAL_DAMAGE, VehicleState};

pub const TIRE_WEAR_RATE: f32 = 0.002;
pub const BRAKE_FADE_RATE: f32 = 0.1;
pub const BRAKE_RECOVERY_RATE: f32 = 0.05;
pub const HARD_BRAKE_THRESHOLD: f32 = 0.5;
pub const OVERHEAT_THRESHOLD: f32 = 110.0;
pub const HEAT_DAMAGE_RATE: f32 = 2.5;

const MIN_FORWARD_STIFFNESS: f32 = 0.5;
const MAX_FORWARD_STIFFNESS: f32 = 1.5;

/// Wear one tire by its slip and return the new forward friction stiffness.
pub fn wear_tire(wear: &mut f32, slip: WheelSlip, dt: f32) -> f32 {
    let slip = slip.magnitude();
    let slip = if slip.is_finite() { slip } else { 0.0 };
    *wear = (*wear - slip * TIRE_WEAR_RATE * dt).clamp(0.0, 1.0);
    lerp(MIN_FORWARD_STIFFNESS, MAX_FORWARD_STIFFNESS, *wear)
}

/// Fade brakes under hard braking, recover otherwise.
pub fn update_brake_fade(fade: &mut [f32; 4], brake: f32, dt: f32) {
    for f in fade.iter_mut() {
        let next = if brake > HARD_BRAKE_THRESHOLD {
            *f - BRAKE_FADE_RATE * brake * dt
        } else {
            *f + BRAKE_RECOVERY_RATE * dt
        };
        *f = next.clamp(0.0, 1.0);
    }
}

pub fn update_heat_damage(state: &mut VehicleState, dt: f32) {
    if state.engine_heat > OVERHEAT_THRESHOLD {
        state.structural_damage += HEAT_DAMAGE_RATE * dt;
    }
    state.structural_damage = state.structural_damage.clamp(0.0, MAX_STRUCTURAL_DAMAGE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::profile::VehicleProfile;

    #[test]
    fn fresh_tire_has_max_stiffness() {
        let mut wear = 1.0;
        let k = wear_tire(&mut wear, WheelSlip::default(), 0.016);
        assert_eq!(wear, 1.0);
        assert!((k - 1.5).abs() < 1e-6);
    }

    #[test]
    fn slip_wears_tire_and_softens_grip() {
        let mut wear = 1.0;
        let slip = WheelSlip { forward: 0.6, sideways: -0.4 };
        let k = wear_tire(&mut wear, slip, 10.0);
        assert!((wear - (1.0 - 1.0 * TIRE_WEAR_RATE * 10.0)).abs() < 1e-6);
        assert!(k < 1.5);
    }

    #[test]
    fn worn_out_tire_clamps_at_zero() {
        let mut wear = 0.001;
        let k = wear_tire(&mut wear, WheelSlip { forward: 50.0, sideways: 50.0 }, 1.0);
        assert_eq!(wear, 0.0);
        assert!((k - 0.5).abs() < 1e-6);
    }

    #[test]
    fn hard_braking_fades_light_braking_recovers() {
        let mut fade = [1.0; 4];
        update_brake_fade(&mut fade, 1.0, 2.0);
        assert!(fade.iter().all(|f| (*f - 0.8).abs() < 1e-5));

        update_brake_fade(&mut fade, 0.3, 2.0);
        assert!(fade.iter().all(|f| (*f - 0.9).abs() < 1e-5));

        update_brake_fade(&mut fade, 0.0, 100.0);
        assert_eq!(fade, [1.0; 4]);
    }

    #[test]
    fn overheating_accrues_bounded_damage() {
        let p = VehicleProfile::street_racer();
        let mut s = VehicleState::spawn(&p);
        update_heat_damage(&mut s, 1.0);
        assert_eq!(s.structural_damage, 0.0);

        s.engine_heat = 130.0;
        update_heat_damage(&mut s, 4.0);
        assert!((s.structural_damage - 10.0).abs() < 1e-5);

        update_heat_damage(&mut s, 1_000.0);
        assert_eq!(s.structural_damage, MAX_STRUCTURAL_DAMAGE);
    }
}

//! Input-driven displacement: moving the stack drags the shells the opposite
//! way, idle stacks settle downward.

use glam::Vec3;

use super::params::clamp_unit;
use crate::host::InputState;

/// Displacement change per unit of movement direction per second.
pub const DISPLACEMENT_RESPONSE: f32 = 10.0;
/// Downward drift per second while there is no directional input.
pub const SETTLE_RATE: f32 = 5.0;

/// Normalized movement direction for the held axes; zero when nothing is held
/// or opposing axes cancel out.
pub fn input_direction(input: InputState) -> Vec3 {
    let axis = |pos: InputState, neg: InputState| -> f32 {
        (input.contains(pos) as i32 - input.contains(neg) as i32) as f32
    };
    Vec3::new(
        axis(InputState::RIGHT, InputState::LEFT),
        axis(InputState::UP, InputState::DOWN),
        axis(InputState::FORWARD, InputState::BACK),
    )
    .normalize_or_zero()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionState {
    pub position: Vec3,
    /// Always within the unit ball.
    pub displacement: Vec3,
}

impl MotionState {
    pub fn new(displacement: Vec3) -> Self { Self { position: Vec3::ZERO, displacement: clamp_unit(displacement) } }

    pub fn integrate(&mut self, elapsed_seconds: f32, input: InputState, velocity: f32) {
        let direction = input_direction(input);
        self.position += direction * velocity * elapsed_seconds;
        self.displacement -= direction * elapsed_seconds * DISPLACEMENT_RESPONSE;
        if direction == Vec3::ZERO {
            self.displacement.y -= SETTLE_RATE * elapsed_seconds;
        }
        self.displacement = clamp_unit(self.displacement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposing_axes_cancel() {
        assert_eq!(input_direction(InputState::LEFT | InputState::RIGHT), Vec3::ZERO);
        assert_eq!(input_direction(InputState::empty()), Vec3::ZERO);
    }

    #[test]
    fn diagonal_input_is_normalized() {
        let d = input_direction(InputState::FORWARD | InputState::RIGHT);
        assert!((d.length() - 1.0).abs() < 1e-6);
        assert!(d.x > 0.0 && d.z > 0.0 && d.y == 0.0);
    }

    #[test]
    fn idle_settles_downward() {
        let mut m = MotionState::default();
        m.integrate(0.1, InputState::empty(), 1.0);
        assert!((m.displacement - Vec3::new(0.0, -0.5, 0.0)).length() < 1e-6);
        assert_eq!(m.position, Vec3::ZERO);
    }

    #[test]
    fn moving_drags_the_other_way_without_settling() {
        let mut m = MotionState::default();
        m.integrate(0.05, InputState::FORWARD, 2.0);
        assert!((m.position - Vec3::new(0.0, 0.0, 0.1)).length() < 1e-6);
        assert!((m.displacement - Vec3::new(0.0, 0.0, -0.5)).length() < 1e-6);
    }

    #[test]
    fn displacement_never_leaves_the_unit_ball() {
        let mut m = MotionState::new(Vec3::new(5.0, 0.0, 0.0));
        assert!((m.displacement.length() - 1.0).abs() < 1e-6);
        for _ in 0..50 {
            m.integrate(0.3, InputState::LEFT | InputState::UP, 1.0);
            assert!(m.displacement.length() <= 1.0 + 1e-5);
        }
    }
}

/// Player controller - maps filtered input onto one simulated object

use prism_3d_engine::glam::Vec3;
use prism_3d_engine::prism3d::sim::{GameObjectSimulator, ObjectKey};

use crate::input::FilteredInput;

/// Upward impulse applied by a jump
pub const JUMP_STRENGTH: f32 = 10.0;
/// Horizontal velocity applied while strafing
pub const STRAFE_STRENGTH: f32 = 5.0;

/// Binds one player's input to one game object
pub struct PlayerController {
    object: ObjectKey,
}

impl PlayerController {
    pub fn new(object: ObjectKey) -> Self {
        Self { object }
    }

    pub fn object(&self) -> ObjectKey {
        self.object
    }

    /// Apply this frame's input: a jump only from rest, strafing always
    pub fn update(&self, sim: &mut GameObjectSimulator, input: &FilteredInput) {
        if input.up && sim.is_resting(self.object) {
            // Up is negative y in the y-down world
            sim.trigger_impulse(self.object, Vec3::new(0.0, -1.0, 0.0), JUMP_STRENGTH);
        }
        if input.left {
            sim.trigger_strafe(self.object, -STRAFE_STRENGTH);
        }
        if input.right {
            sim.trigger_strafe(self.object, STRAFE_STRENGTH);
        }
    }
}

#[cfg(test)]
mod player_tests {
    use super::*;
    use prism_3d_engine::prism3d::sim::DEFAULT_FLOOR_Y;

    fn resting_player() -> (GameObjectSimulator, PlayerController) {
        let mut sim = GameObjectSimulator::new(DEFAULT_FLOOR_Y);
        // Spawn directly on the floor: box bottom at the floor constant
        let key = sim.spawn(Vec3::new(0.0, DEFAULT_FLOOR_Y - 1.0, -10.0), Vec3::ONE);
        (sim, PlayerController::new(key))
    }

    #[test]
    fn test_jump_from_rest() {
        let (mut sim, player) = resting_player();
        let input = FilteredInput {
            up: true,
            ..Default::default()
        };
        player.update(&mut sim, &input);
        assert_eq!(sim.object(player.object()).unwrap().velocity.y, -JUMP_STRENGTH);
    }

    #[test]
    fn test_jump_ignored_in_air() {
        let (mut sim, player) = resting_player();
        // Leave the floor first
        player.update(
            &mut sim,
            &FilteredInput {
                up: true,
                ..Default::default()
            },
        );
        sim.step(0.1);
        assert!(!sim.is_resting(player.object()));

        let velocity_before = sim.object(player.object()).unwrap().velocity;
        player.update(
            &mut sim,
            &FilteredInput {
                up: true,
                ..Default::default()
            },
        );
        assert_eq!(sim.object(player.object()).unwrap().velocity, velocity_before);
    }

    #[test]
    fn test_strafe_left_and_right() {
        let (mut sim, player) = resting_player();
        player.update(
            &mut sim,
            &FilteredInput {
                left: true,
                ..Default::default()
            },
        );
        assert_eq!(sim.object(player.object()).unwrap().velocity.x, -STRAFE_STRENGTH);

        player.update(
            &mut sim,
            &FilteredInput {
                right: true,
                ..Default::default()
            },
        );
        assert_eq!(sim.object(player.object()).unwrap().velocity.x, STRAFE_STRENGTH);
    }
}

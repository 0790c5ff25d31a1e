//! Integration tests for the game-object simulation
//!
//! These drive the simulator across many frames the way the demo's frame
//! loop does: controllers gate impulses on rest, the simulator steps at a
//! fixed delta, and the committed positions feed the model transforms.

use prism_3d_engine::glam::{Mat4, Vec3, Vec4Swizzles};
use prism_3d_engine::prism3d::sim::{GameObjectSimulator, ObjectKey, DEFAULT_FLOOR_Y};

const DT: f32 = 1.0 / 60.0;

fn settled_two_player_sim() -> (GameObjectSimulator, ObjectKey, ObjectKey) {
    let mut sim = GameObjectSimulator::new(DEFAULT_FLOOR_Y);
    let p0 = sim.spawn(Vec3::new(-3.0, -7.0, -10.0), Vec3::ONE);
    let p1 = sim.spawn(Vec3::new(3.0, -7.0, -10.0), Vec3::ONE);
    for _ in 0..900 {
        sim.step(DT);
    }
    (sim, p0, p1)
}

#[test]
fn test_both_players_settle_on_the_floor() {
    let (sim, p0, p1) = settled_two_player_sim();
    assert!(sim.is_resting(p0));
    assert!(sim.is_resting(p1));
    // Horizontal positions never moved: no input, no collisions
    assert_eq!(sim.object(p0).unwrap().position.x, -3.0);
    assert_eq!(sim.object(p1).unwrap().position.x, 3.0);
}

#[test]
fn test_jump_arc_returns_to_rest() {
    let (mut sim, p0, _) = settled_two_player_sim();
    let rest_y = sim.object(p0).unwrap().position.y;

    sim.trigger_impulse(p0, Vec3::new(0.0, -1.0, 0.0), 10.0);

    // The object leaves the floor, rises (y decreases), then falls back
    let mut peak_y = rest_y;
    let mut left_floor = false;
    for _ in 0..600 {
        sim.step(DT);
        let y = sim.object(p0).unwrap().position.y;
        peak_y = peak_y.min(y);
        if !sim.is_resting(p0) {
            left_floor = true;
        }
    }
    assert!(left_floor, "jump never left the floor");
    assert!(peak_y < rest_y - 1.0, "jump arc too shallow: peak {}", peak_y);
    assert!(sim.is_resting(p0), "object did not return to rest");
}

#[test]
fn test_strafing_player_slides_and_stops() {
    let (mut sim, p0, _) = settled_two_player_sim();

    // Hold strafe for half a second, then release
    for _ in 0..30 {
        sim.trigger_strafe(p0, 5.0);
        sim.step(DT);
    }
    let x_after_hold = sim.object(p0).unwrap().position.x;
    assert!(x_after_hold > -3.0, "strafe did not move the player");

    // Exponential damping bleeds the velocity off after release
    for _ in 0..600 {
        sim.step(DT);
    }
    assert!(sim.object(p0).unwrap().velocity.x.abs() < 0.01);
}

#[test]
fn test_model_matrix_tracks_committed_position() {
    let (mut sim, p0, _) = settled_two_player_sim();
    sim.trigger_impulse(p0, Vec3::new(0.0, -1.0, 0.0), 10.0);
    sim.step(DT);

    let position = sim.object(p0).unwrap().position;
    let matrix: Mat4 = sim.model_matrix(p0);
    assert_eq!(matrix.w_axis.xyz(), position);
}

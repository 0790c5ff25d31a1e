use super::*;

const FAR_FLOOR: f32 = 1000.0;

fn two_player_setup() -> (GameObjectSimulator, ObjectKey, ObjectKey) {
    // The demo's start state: players at x = -3 and x = +3, floor at y = 2
    let mut sim = GameObjectSimulator::new(DEFAULT_FLOOR_Y);
    let p0 = sim.spawn(Vec3::new(-3.0, -7.0, -10.0), Vec3::ONE);
    let p1 = sim.spawn(Vec3::new(3.0, -7.0, -10.0), Vec3::ONE);
    (sim, p0, p1)
}

// ============================================================================
// START STATE
// ============================================================================

#[test]
fn test_players_do_not_collide_on_first_step() {
    let (mut sim, p0, p1) = two_player_setup();
    sim.step(1.0 / 60.0);
    assert!(!sim.object(p0).unwrap().collided);
    assert!(!sim.object(p1).unwrap().collided);
}

#[test]
fn test_spawned_objects_have_zero_velocity() {
    let (sim, p0, p1) = two_player_setup();
    assert_eq!(sim.object(p0).unwrap().velocity, Vec3::ZERO);
    assert_eq!(sim.object(p1).unwrap().velocity, Vec3::ZERO);
}

// ============================================================================
// GRAVITY AND FLOOR
// ============================================================================

#[test]
fn test_gravity_pulls_toward_floor() {
    let (mut sim, p0, _) = two_player_setup();
    let y_before = sim.object(p0).unwrap().position.y;
    sim.step(0.1);
    sim.step(0.1);
    let obj = sim.object(p0).unwrap();
    assert!(obj.velocity.y > 0.0, "gravity is +y in the y-down world");
    assert!(obj.position.y > y_before);
}

#[test]
fn test_falling_object_comes_to_rest_on_floor() {
    let (mut sim, p0, _) = two_player_setup();
    for _ in 0..600 {
        sim.step(1.0 / 60.0);
    }
    assert!(sim.is_resting(p0));
    let obj = sim.object(p0).unwrap();
    assert!((obj.aabb().bottom() - sim.floor_y()).abs() < 1e-4);
}

#[test]
fn test_floor_contact_inverts_and_damps_vertical_velocity() {
    let mut sim = GameObjectSimulator::new(DEFAULT_FLOOR_Y);
    // Just above the floor, falling fast
    let key = sim.spawn(Vec3::new(0.0, 0.9, 0.0), Vec3::ONE);
    sim.trigger_strafe(key, 0.0);
    if let Some(obj) = sim.objects.get_mut(key) {
        obj.velocity.y = 10.0;
    }

    sim.step(0.1);

    let obj = sim.object(key).unwrap();
    assert!(obj.collided);
    assert!((obj.aabb().bottom() - sim.floor_y()).abs() < 1e-4);
    assert!((obj.velocity.y - (-BOUNCE_DAMPING * 10.0)).abs() < 1e-5);
}

// ============================================================================
// IMPULSE AND STRAFE
// ============================================================================

#[test]
fn test_jump_from_rest_moves_object_upward() {
    let (mut sim, p0, _) = two_player_setup();
    // Let the object settle on the floor first
    for _ in 0..600 {
        sim.step(1.0 / 60.0);
    }
    assert!(sim.is_resting(p0));

    sim.trigger_impulse(p0, Vec3::new(0.0, -1.0, 0.0), 10.0);
    let y_before = sim.object(p0).unwrap().position.y;
    sim.step(1.0 / 60.0);

    let obj = sim.object(p0).unwrap();
    assert!(obj.velocity.y < 0.0, "jump velocity points up (negative y)");
    assert!(obj.position.y < y_before, "object moved up");
}

#[test]
fn test_impulse_ignored_while_airborne() {
    let (mut sim, p0, _) = two_player_setup();
    assert!(!sim.is_resting(p0));

    sim.trigger_impulse(p0, Vec3::new(0.0, -1.0, 0.0), 10.0);
    assert_eq!(sim.object(p0).unwrap().velocity, Vec3::ZERO);
}

#[test]
fn test_strafe_sets_horizontal_velocity_regardless_of_state() {
    let (mut sim, p0, _) = two_player_setup();
    assert!(!sim.is_resting(p0));

    sim.trigger_strafe(p0, 5.0);
    assert_eq!(sim.object(p0).unwrap().velocity.x, 5.0);

    sim.trigger_strafe(p0, -5.0);
    assert_eq!(sim.object(p0).unwrap().velocity.x, -5.0);
}

#[test]
fn test_horizontal_velocity_decays_exponentially() {
    let mut sim = GameObjectSimulator::new(FAR_FLOOR);
    let key = sim.spawn(Vec3::ZERO, Vec3::ONE);
    sim.trigger_strafe(key, 5.0);

    let dt = 0.01;
    sim.step(dt);
    let vx = sim.object(key).unwrap().velocity.x;
    assert!((vx - (5.0 - 5.0 * dt * HORIZONTAL_DAMPING)).abs() < 1e-5);
    assert!(vx < 5.0 && vx > 0.0);
}

// ============================================================================
// COLLISION RESOLUTION POLICY
// ============================================================================

#[test]
fn test_only_horizontal_blocked_commits_vertical_and_bounces_x() {
    let mut sim = GameObjectSimulator::new(FAR_FLOOR);
    let a = sim.spawn(Vec3::ZERO, Vec3::ONE);
    let _b = sim.spawn(Vec3::new(2.5, 0.0, 0.0), Vec3::ONE);
    sim.trigger_strafe(a, 2.0);

    sim.step(0.5);

    let obj = sim.object(a).unwrap();
    assert!(obj.collided);
    // Horizontal displacement was not committed
    assert_eq!(obj.position.x, 0.0);
    // Horizontal velocity inverted and damped
    assert!((obj.velocity.x - (-BOUNCE_DAMPING * 2.0)).abs() < 1e-5);
    // Gravity still applied
    assert!((obj.velocity.y - GRAVITY * 0.5).abs() < 1e-5);
}

#[test]
fn test_diagonal_only_collision_resolves_as_vertical_blocked() {
    let mut sim = GameObjectSimulator::new(FAR_FLOOR);
    let a = sim.spawn(Vec3::ZERO, Vec3::ONE);
    // Obstacle placed so only the combined displacement overlaps it
    let _b = sim.spawn(Vec3::new(2.5, 2.5, 0.0), Vec3::ONE);
    if let Some(obj) = sim.objects.get_mut(a) {
        obj.velocity = Vec3::new(2.0, 2.0, 0.0);
    }

    sim.step(0.5);

    let obj = sim.object(a).unwrap();
    assert!(obj.collided);
    // Vertical progress committed, horizontal held back
    assert_eq!(obj.position.x, 0.0);
    assert!((obj.position.y - 1.0).abs() < 1e-5);
    // Horizontal bounce, gravity on the vertical component
    assert!((obj.velocity.x - (-BOUNCE_DAMPING * 2.0)).abs() < 1e-5);
    assert!((obj.velocity.y - (2.0 + GRAVITY * 0.5)).abs() < 1e-5);
}

#[test]
fn test_both_axes_blocked_holds_position_and_bounces_both() {
    let mut sim = GameObjectSimulator::new(2.0);
    // Floor right below, obstacle to the side
    let a = sim.spawn(Vec3::new(0.0, 0.9, 0.0), Vec3::ONE);
    let _b = sim.spawn(Vec3::new(2.2, 0.9, 0.0), Vec3::ONE);
    if let Some(obj) = sim.objects.get_mut(a) {
        obj.velocity = Vec3::new(2.0, 1.0, 0.0);
    }

    let pos_before = sim.object(a).unwrap().position;
    sim.step(0.5);

    let obj = sim.object(a).unwrap();
    assert!(obj.collided);
    assert_eq!(obj.position, pos_before);
    assert!((obj.velocity.x - (-BOUNCE_DAMPING * 2.0)).abs() < 1e-5);
    assert!((obj.velocity.y - (-BOUNCE_DAMPING * 1.0)).abs() < 1e-5);
}

// ============================================================================
// MODEL OUTPUT
// ============================================================================

#[test]
fn test_model_matrix_is_translation_of_committed_position() {
    let (sim, p0, _) = two_player_setup();
    let matrix = sim.model_matrix(p0);
    let expected = Mat4::from_translation(Vec3::new(-3.0, -7.0, -10.0));
    assert_eq!(matrix, expected);
}

/// Game object simulator
///
/// Axis-separated collision resolution: each step builds three movement
/// candidates (full, horizontal-only, vertical-only), tests them against
/// every other object's current bounds and the floor plane, and commits
/// one of them according to a fixed, ordered policy. The vertical-favoring
/// tie-break on diagonal-only collisions is intentional observed behavior
/// and must not be "corrected".

use glam::{Mat4, Vec3};
use slotmap::{new_key_type, SlotMap};

use super::game_object::{Aabb, GameObject};

#[cfg(test)]
mod simulator_tests;

/// Gravity acceleration (y-down world: positive y)
pub const GRAVITY: f32 = 10.0;
/// Velocity retained (and inverted) by a bounce
pub const BOUNCE_DAMPING: f32 = 0.3;
/// Exponential damping factor for horizontal velocity
pub const HORIZONTAL_DAMPING: f32 = 5.0;
/// Default floor plane constant
pub const DEFAULT_FLOOR_Y: f32 = 2.0;
/// Tolerance for the resting check
const REST_EPSILON: f32 = 1e-4;

new_key_type! {
    /// Stable handle to a simulated object
    pub struct ObjectKey;
}

/// Pool of simulated objects plus the shared floor plane
///
/// Objects live for the whole run: they are spawned during setup and
/// mutated once per simulated frame, never destroyed.
pub struct GameObjectSimulator {
    objects: SlotMap<ObjectKey, GameObject>,
    floor_y: f32,
}

impl GameObjectSimulator {
    pub fn new(floor_y: f32) -> Self {
        Self {
            objects: SlotMap::with_key(),
            floor_y,
        }
    }

    /// Add an object at `position` with zero velocity
    pub fn spawn(&mut self, position: Vec3, half_extents: Vec3) -> ObjectKey {
        self.objects.insert(GameObject::new(position, half_extents))
    }

    pub fn object(&self, key: ObjectKey) -> Option<&GameObject> {
        self.objects.get(key)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn floor_y(&self) -> f32 {
        self.floor_y
    }

    /// Translation transform of the object's committed position, consumed
    /// as the model matrix for its draw
    pub fn model_matrix(&self, key: ObjectKey) -> Mat4 {
        match self.objects.get(key) {
            Some(obj) => Mat4::from_translation(obj.position),
            None => Mat4::IDENTITY,
        }
    }

    /// True when the object's bounding box sits on the floor plane
    pub fn is_resting(&self, key: ObjectKey) -> bool {
        self.objects
            .get(key)
            .map(|obj| (obj.aabb().bottom() - self.floor_y).abs() < REST_EPSILON)
            .unwrap_or(false)
    }

    /// Apply an instantaneous impulse along `direction`.
    ///
    /// Only effective while the object is resting on the floor; a mid-air
    /// impulse request is ignored.
    pub fn trigger_impulse(&mut self, key: ObjectKey, direction: Vec3, magnitude: f32) {
        if !self.is_resting(key) {
            return;
        }
        if let Some(obj) = self.objects.get_mut(key) {
            obj.velocity += direction * magnitude;
        }
    }

    /// Set horizontal velocity directly, regardless of state
    pub fn trigger_strafe(&mut self, key: ObjectKey, magnitude: f32) {
        if let Some(obj) = self.objects.get_mut(key) {
            obj.velocity.x = magnitude;
        }
    }

    /// Advance every object by `delta_time` seconds.
    ///
    /// Objects update sequentially in spawn order; each one tests its
    /// candidates against the other objects' bounds as they are at that
    /// moment.
    pub fn step(&mut self, delta_time: f32) {
        let keys: Vec<ObjectKey> = self.objects.keys().collect();
        for key in keys {
            self.step_object(key, delta_time);
        }
    }

    fn step_object(&mut self, key: ObjectKey, dt: f32) {
        let obj = match self.objects.get(key) {
            Some(obj) => obj.clone(),
            None => return,
        };

        let full = obj.velocity * dt;
        let x_only = Vec3::new(obj.velocity.x * dt, 0.0, 0.0);
        let y_only = Vec3::new(0.0, obj.velocity.y * dt, 0.0);

        let x_hit = self.overlaps_any_other(key, &obj.aabb_displaced(x_only));
        let y_box = obj.aabb_displaced(y_only);
        let y_hit_object = self.overlaps_any_other(key, &y_box);
        let y_hit_floor = y_box.bottom() > self.floor_y;
        let y_hit = y_hit_object || y_hit_floor;
        let full_hit = self.overlaps_any_other(key, &obj.aabb_displaced(full));

        let Some(obj) = self.objects.get_mut(key) else {
            return;
        };

        if !x_hit && !y_hit && !full_hit {
            // Both axes clear: commit the full displacement
            obj.position += full;
            obj.velocity.y += GRAVITY * dt;
            obj.velocity.x += -obj.velocity.x * dt * HORIZONTAL_DAMPING;
            obj.collided = false;
        } else if x_hit && y_hit {
            // Both axes blocked: hold position, bounce both components
            obj.velocity.x = -BOUNCE_DAMPING * obj.velocity.x;
            obj.velocity.y = -BOUNCE_DAMPING * obj.velocity.y;
            obj.collided = true;
        } else {
            // One axis blocked, or only the combined displacement collides
            // (diagonal-only). All three cases favor vertical progress:
            // commit the vertical candidate and bounce the horizontal
            // velocity.
            if y_hit_floor {
                // The floor is solid: the vertical candidate lands on it
                // and the vertical velocity bounces.
                obj.position.y = self.floor_y - obj.half_extents.y;
                obj.velocity.y = -BOUNCE_DAMPING * obj.velocity.y;
            } else {
                obj.position.y += y_only.y;
                obj.velocity.y += GRAVITY * dt;
            }
            obj.velocity.x = -BOUNCE_DAMPING * obj.velocity.x;
            obj.collided = true;
        }
    }

    /// Test `candidate` against every other live object's current bounds
    fn overlaps_any_other(&self, key: ObjectKey, candidate: &Aabb) -> bool {
        self.objects
            .iter()
            .filter(|(other_key, _)| *other_key != key)
            .any(|(_, other)| candidate.overlaps_xy(&other.aabb()))
    }
}

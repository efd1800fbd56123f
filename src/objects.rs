// src/objects.rs
//! Movable sandbox objects and their lifecycle.
//!
//! The physics body is authoritative for kinematics; the `MovableObject`
//! mirror is refreshed once per step so render and input code never touch
//! rapier directly. Deletion is a soft mark here plus a deferred body
//! removal in the physics world.

use log::{debug, warn};
use nalgebra::{point, Vector2};
use rapier2d::prelude::{ColliderBuilder, RigidBodyHandle};

use crate::config::SandboxConfig;
use crate::physics::PhysicsWorld;
use crate::Result;

/// Stable object identity for the object's whole lifetime.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ObjectId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeKind {
    Box { half_extents: Vector2<f32> },
    Circle { radius: f32 },
    Triangle { side: f32 },
}

impl ShapeKind {
    pub fn boxed(cfg: &SandboxConfig) -> Self {
        Self::Box {
            half_extents: Vector2::new(cfg.box_half_extents[0], cfg.box_half_extents[1]),
        }
    }

    pub fn circle(cfg: &SandboxConfig) -> Self {
        Self::Circle {
            radius: cfg.circle_radius,
        }
    }

    pub fn triangle(cfg: &SandboxConfig) -> Self {
        Self::Triangle {
            side: cfg.triangle_side,
        }
    }

    /// Collider for this shape, or `None` for degenerate sizes.
    pub(crate) fn collider_builder(&self) -> Option<ColliderBuilder> {
        match *self {
            ShapeKind::Box { half_extents } => {
                if half_extents.x <= 0.0 || half_extents.y <= 0.0 {
                    return None;
                }
                Some(ColliderBuilder::cuboid(half_extents.x, half_extents.y))
            }
            ShapeKind::Circle { radius } => {
                if radius <= 0.0 {
                    return None;
                }
                Some(ColliderBuilder::ball(radius))
            }
            ShapeKind::Triangle { side } => {
                if side <= 0.0 {
                    return None;
                }
                // equilateral, centroid at the origin
                let r = side / 3.0_f32.sqrt();
                Some(ColliderBuilder::triangle(
                    point![0.0, r],
                    point![-side / 2.0, -r / 2.0],
                    point![side / 2.0, -r / 2.0],
                ))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct MovableObject {
    pub id: ObjectId,
    pub kind: ShapeKind,
    pub position: Vector2<f32>,
    pub angle: f32,
    pub linvel: Vector2<f32>,
    pub angvel: f32,
    pub body: Option<RigidBodyHandle>,
    /// True only while this frame's teleport rewrites the transform; used to
    /// suppress mid-transition rendering and interaction.
    pub teleporting: bool,
    pub marked_for_deletion: bool,
}

impl MovableObject {
    /// Deleted objects are excluded from queries, dragging and teleporting
    /// even while their body destruction is still pending.
    pub fn is_live(&self) -> bool {
        !self.marked_for_deletion && self.body.is_some()
    }
}

#[derive(Default)]
pub struct ObjectManager {
    objects: Vec<MovableObject>,
    next_id: u32,
}

impl ObjectManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the logical object and its physics body. If the engine cannot
    /// allocate the body the object is not registered at all.
    pub fn spawn(
        &mut self,
        world: &mut PhysicsWorld,
        cfg: &SandboxConfig,
        kind: ShapeKind,
        position: Vector2<f32>,
        angle: f32,
    ) -> Result<ObjectId> {
        let id = ObjectId(self.next_id);
        let body = world
            .spawn_object_body(id, &kind, position, angle, cfg)
            .map_err(|err| {
                warn!("failed to spawn {kind:?}: {err}");
                err
            })?;

        self.next_id += 1;
        self.objects.push(MovableObject {
            id,
            kind,
            position,
            angle,
            linvel: Vector2::zeros(),
            angvel: 0.0,
            body: Some(body),
            teleporting: false,
            marked_for_deletion: false,
        });
        Ok(id)
    }

    /// Soft-delete: mark the object and schedule its body for deferred
    /// destruction. The entry leaves the list on the next cleanup pass.
    pub fn delete(&mut self, world: &mut PhysicsWorld, id: ObjectId) -> bool {
        let Some(obj) = self
            .objects
            .iter_mut()
            .find(|o| o.id == id && !o.marked_for_deletion)
        else {
            return false;
        };
        obj.marked_for_deletion = true;
        if let Some(body) = obj.body {
            world.destroy_body(body);
        }
        debug!("deleted object {id:?}");
        true
    }

    pub fn cleanup(&mut self) {
        self.objects.retain(|o| !o.marked_for_deletion);
    }

    /// Pull position, angle and velocities back from the physics bodies for
    /// every live object.
    pub fn sync_from_physics(&mut self, world: &PhysicsWorld) {
        for obj in &mut self.objects {
            if obj.marked_for_deletion {
                continue;
            }
            let Some(body) = obj.body else { continue };
            if let Some((position, angle, linvel, angvel)) = world.body_kinematics(body) {
                obj.position = position;
                obj.angle = angle;
                obj.linvel = linvel;
                obj.angvel = angvel;
            } else {
                obj.body = None;
            }
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&MovableObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut MovableObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// All objects, deleted ones excluded.
    pub fn objects(&self) -> impl Iterator<Item = &MovableObject> {
        self.objects.iter().filter(|o| !o.marked_for_deletion)
    }

    pub fn count(&self) -> usize {
        self.objects().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (PhysicsWorld, ObjectManager, SandboxConfig) {
        (
            PhysicsWorld::new(Vector2::new(0.0, -9.8)),
            ObjectManager::new(),
            SandboxConfig::default(),
        )
    }

    #[test]
    fn spawn_assigns_unique_ids_and_bodies() {
        let (mut world, mut mgr, cfg) = setup();
        let a = mgr
            .spawn(&mut world, &cfg, ShapeKind::circle(&cfg), Vector2::new(5.0, 5.0), 0.0)
            .unwrap();
        let b = mgr
            .spawn(&mut world, &cfg, ShapeKind::boxed(&cfg), Vector2::new(8.0, 5.0), 0.3)
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(mgr.count(), 2);
        assert!(mgr.get(a).unwrap().is_live());
    }

    #[test]
    fn failed_spawn_leaves_no_object_behind() {
        let (mut world, mut mgr, cfg) = setup();
        let result = mgr.spawn(
            &mut world,
            &cfg,
            ShapeKind::Circle { radius: -1.0 },
            Vector2::new(5.0, 5.0),
            0.0,
        );
        assert!(result.is_err());
        assert_eq!(mgr.count(), 0);
    }

    #[test]
    fn delete_marks_then_cleanup_removes() {
        let (mut world, mut mgr, cfg) = setup();
        let id = mgr
            .spawn(&mut world, &cfg, ShapeKind::triangle(&cfg), Vector2::new(5.0, 5.0), 0.0)
            .unwrap();
        assert!(mgr.delete(&mut world, id));
        // second delete of the same object is a no-op
        assert!(!mgr.delete(&mut world, id));
        assert_eq!(mgr.count(), 0);
        assert!(!mgr.get(id).unwrap().is_live());
        assert_eq!(world.pending_removal_count(), 1);

        mgr.cleanup();
        assert!(mgr.get(id).is_none());
    }

    #[test]
    fn sync_mirrors_body_state() {
        let (mut world, mut mgr, cfg) = setup();
        let id = mgr
            .spawn(&mut world, &cfg, ShapeKind::circle(&cfg), Vector2::new(5.0, 20.0), 0.0)
            .unwrap();
        world.step(cfg.fixed_dt);
        mgr.sync_from_physics(&world);

        let obj = mgr.get(id).unwrap();
        // gravity pulled it down and gave it downward velocity
        assert!(obj.position.y < 20.0);
        assert!(obj.linvel.y < 0.0);
    }

    #[test]
    fn triangle_collider_is_well_formed() {
        let cfg = SandboxConfig::default();
        assert!(ShapeKind::triangle(&cfg).collider_builder().is_some());
        assert!(ShapeKind::Triangle { side: 0.0 }.collider_builder().is_none());
    }
}

// src/drag.rs
//! Pointer drag and throw for dynamic objects.
//!
//! The constraint is a mass-proportional spring force applied before every
//! fixed step: stiff enough that the object tracks the pointer, soft enough
//! that collision response from other bodies still reads through. At most
//! one drag exists system-wide.

use log::debug;
use nalgebra::Vector2;
use rapier2d::prelude::RigidBodyHandle;

use crate::config::SandboxConfig;
use crate::objects::{ObjectId, ObjectManager};
use crate::physics::PhysicsWorld;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
struct ActiveDrag {
    object: ObjectId,
    body: RigidBodyHandle,
    target: Vector2<f32>,
}

#[derive(Default)]
pub struct DragController {
    active: Option<ActiveDrag>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin dragging an object toward a simulation-space target. Rejected
    /// when a drag is already active or the target is not a live, dynamic,
    /// non-teleporting body.
    pub fn start(
        &mut self,
        world: &mut PhysicsWorld,
        objects: &ObjectManager,
        id: ObjectId,
        target: Vector2<f32>,
    ) -> Result<()> {
        if self.active.is_some() {
            return Err(Error::DragRejected("another drag is already active"));
        }
        let obj = objects
            .get(id)
            .ok_or(Error::DragRejected("no such object"))?;
        if obj.marked_for_deletion {
            return Err(Error::DragRejected("object is deleted"));
        }
        if obj.teleporting {
            return Err(Error::DragRejected("object is mid-teleport"));
        }
        let body = obj
            .body
            .ok_or(Error::DragRejected("object has no physics body"))?;
        if !world.is_dynamic(body) {
            return Err(Error::DragRejected("body is not dynamic"));
        }

        world.wake(body);
        self.active = Some(ActiveDrag {
            object: id,
            body,
            target,
        });
        debug!("dragging object {id:?}");
        Ok(())
    }

    /// Retarget the spring. No-op when no drag is active.
    pub fn update(&mut self, target: Vector2<f32>) {
        if let Some(drag) = &mut self.active {
            drag.target = target;
        }
    }

    /// Apply this step's spring force. Called once per fixed step, before
    /// the world integrates. Drops the drag if the body vanished.
    pub fn apply_spring(&mut self, world: &mut PhysicsWorld, cfg: &SandboxConfig) {
        let Some(drag) = self.active else { return };
        let (Some((position, _, linvel, _)), Some(mass)) = (
            world.body_kinematics(drag.body),
            world.body_mass(drag.body),
        ) else {
            debug!("dragged body vanished, releasing drag");
            self.active = None;
            return;
        };

        // stiffness and damping from the frequency / damping-ratio pair
        let omega = std::f32::consts::TAU * cfg.drag_frequency_hz;
        let stiffness = mass * omega * omega;
        let damping = 2.0 * mass * cfg.drag_damping_ratio * omega;

        let mut force = (drag.target - position) * stiffness - linvel * damping;
        let max_force = cfg.drag_max_force * mass;
        let magnitude = force.norm();
        if magnitude > max_force {
            force *= max_force / magnitude;
        }
        world.add_force(drag.body, force);
    }

    /// End the drag. State clears unconditionally; when throwing, a one-shot
    /// impulse proportional to mass and pointer velocity is applied at the
    /// center unless it falls inside the dead zone.
    pub fn stop(
        &mut self,
        world: &mut PhysicsWorld,
        cfg: &SandboxConfig,
        apply_throw: bool,
        pointer_velocity: Vector2<f32>,
    ) {
        let Some(drag) = self.active.take() else { return };
        debug!("stopped dragging object {:?}", drag.object);

        if !apply_throw {
            return;
        }
        let Some(mass) = world.body_mass(drag.body) else {
            return;
        };
        let impulse = pointer_velocity * cfg.throw_factor * mass;
        if impulse.norm() > cfg.throw_dead_zone {
            world.apply_impulse(drag.body, impulse);
        }
    }

    /// Tear down the drag if it holds the given object. Used when the object
    /// is deleted or about to be teleported.
    pub fn release_if(&mut self, id: ObjectId) -> bool {
        if self.active.map_or(false, |d| d.object == id) {
            debug!("releasing drag on {id:?}");
            self.active = None;
            true
        } else {
            false
        }
    }

    pub fn dragged_object(&self) -> Option<ObjectId> {
        self.active.map(|d| d.object)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}

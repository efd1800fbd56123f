// src/physics.rs
//! Rapier integration: body and sensor registry plus the stepping core.
//!
//! Owns the full rapier2d stack. Everything the rest of the crate knows
//! about a collider is carried in a typed tag side-table, so contact events
//! and point queries resolve straight to a logical entity without any
//! user-data casting.
//!
//! Destruction is always deferred: `destroy_body` queues the handle and the
//! queue drains at the start of the next `step`, never mid-step.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crossbeam::channel::{unbounded, Receiver};
use log::{debug, error, warn};
use nalgebra::{Point2, Vector2};
use rapier2d::prelude::*;

use crate::config::SandboxConfig;
use crate::objects::{ObjectId, ShapeKind};
use crate::portals::EndpointId;
use crate::{Error, Result};

/// Logical owner of a collider, resolved from contact events and queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColliderTag {
    Object(ObjectId),
    PortalSensor(EndpointId),
    Wall,
}

pub struct PhysicsWorld {
    gravity: Vector<Real>,
    default_gravity: Vector<Real>,
    pipeline: PhysicsPipeline,
    integration_params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,

    // Rapier's hooks bridge to crossbeam channels; contact force events are
    // collected but unused here.
    collision_rx: Receiver<CollisionEvent>,
    contact_force_rx: Receiver<ContactForceEvent>,
    event_handler: ChannelEventCollector,

    tags: HashMap<ColliderHandle, ColliderTag>,
    pending_removals: Vec<RigidBodyHandle>,
}

impl PhysicsWorld {
    pub fn new(gravity: Vector2<f32>) -> Self {
        let (collision_tx, collision_rx) = unbounded();
        let (force_tx, contact_force_rx) = unbounded();
        let event_handler = ChannelEventCollector::new(collision_tx, force_tx);

        Self {
            gravity,
            default_gravity: gravity,
            pipeline: PhysicsPipeline::new(),
            integration_params: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            collision_rx,
            contact_force_rx,
            event_handler,
            tags: HashMap::new(),
            pending_removals: Vec::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Stepping
    // -------------------------------------------------------------------------

    /// Advance the world by one fixed step. Deferred removals are applied
    /// first, accumulated forces are cleared afterward.
    ///
    /// Returns `false` when the engine panicked mid-integration; the frame is
    /// then treated as a no-op step and the collision channel is drained so
    /// partial event batches never leak into the next frame.
    pub fn step(&mut self, dt: f32) -> bool {
        self.apply_pending_removals();
        self.integration_params.dt = dt;

        let stepped = catch_unwind(AssertUnwindSafe(|| {
            self.pipeline.step(
                &self.gravity,
                &self.integration_params,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                Some(&mut self.query_pipeline),
                &(),
                &self.event_handler,
            );
        }));

        self.clear_forces();

        match stepped {
            Ok(()) => true,
            Err(_) => {
                error!("physics step panicked; skipping this step");
                self.drain_collision_events();
                false
            }
        }
    }

    /// Drains collision events from the channel. Non-blocking.
    pub fn drain_collision_events(&mut self) -> Vec<CollisionEvent> {
        while self.contact_force_rx.try_recv().is_ok() {}
        self.collision_rx.try_iter().collect()
    }

    fn clear_forces(&mut self) {
        for (_, body) in self.bodies.iter_mut() {
            if body.is_dynamic() {
                body.reset_forces(false);
            }
        }
    }

    fn apply_pending_removals(&mut self) {
        let pending = std::mem::take(&mut self.pending_removals);
        for handle in pending {
            if let Some(body) = self.bodies.get(handle) {
                for &collider in body.colliders() {
                    self.tags.remove(&collider);
                }
            }
            self.bodies.remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
        }
    }

    // -------------------------------------------------------------------------
    // Body Management
    // -------------------------------------------------------------------------

    /// Dynamic rigid body with a shape matching the object kind. Material
    /// constants come from the config and are not per-object tunable.
    pub fn spawn_object_body(
        &mut self,
        id: ObjectId,
        kind: &ShapeKind,
        position: Vector2<f32>,
        angle: f32,
        cfg: &SandboxConfig,
    ) -> Result<RigidBodyHandle> {
        let builder = kind
            .collider_builder()
            .ok_or_else(|| Error::BodyCreation(format!("degenerate shape {kind:?}")))?;
        let collider = builder
            .density(cfg.density)
            .friction(cfg.friction)
            .restitution(cfg.restitution)
            .build();

        let body = RigidBodyBuilder::dynamic()
            .translation(position)
            .rotation(angle)
            .build();

        let handle = self.bodies.insert(body);
        let collider_handle = self
            .colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        self.tags.insert(collider_handle, ColliderTag::Object(id));
        debug!("spawned body for object {id:?} at {position:?}");
        Ok(handle)
    }

    /// Static trigger body for a portal endpoint: detects overlap, produces
    /// no collision response.
    pub fn spawn_portal_sensor(
        &mut self,
        id: EndpointId,
        width: f32,
        height: f32,
        position: Vector2<f32>,
        angle: f32,
    ) -> Result<RigidBodyHandle> {
        if width <= 0.0 || height <= 0.0 {
            return Err(Error::SensorCreation(format!(
                "degenerate sensor extent {width}x{height}"
            )));
        }

        let body = RigidBodyBuilder::fixed()
            .translation(position)
            .rotation(angle)
            .build();
        let collider = ColliderBuilder::cuboid(width / 2.0, height / 2.0)
            .sensor(true)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();

        let handle = self.bodies.insert(body);
        let collider_handle = self
            .colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        self.tags
            .insert(collider_handle, ColliderTag::PortalSensor(id));
        debug!("spawned sensor for endpoint {id:?} at {position:?}");
        Ok(handle)
    }

    /// Four static walls framing the playfield. They collide but never take
    /// part in teleportation or selection.
    pub fn add_boundaries(&mut self, width_m: f32, height_m: f32, thickness: f32) {
        let walls = [
            // floor, ceiling, left, right
            (width_m / 2.0, -thickness, width_m / 2.0, thickness),
            (width_m / 2.0, height_m + thickness, width_m / 2.0, thickness),
            (-thickness, height_m / 2.0, thickness, height_m / 2.0),
            (width_m + thickness, height_m / 2.0, thickness, height_m / 2.0),
        ];
        for (x, y, hx, hy) in walls {
            let body = RigidBodyBuilder::fixed().translation(vector![x, y]).build();
            let handle = self.bodies.insert(body);
            let collider_handle = self.colliders.insert_with_parent(
                ColliderBuilder::cuboid(hx, hy).build(),
                handle,
                &mut self.bodies,
            );
            self.tags.insert(collider_handle, ColliderTag::Wall);
        }
    }

    /// Schedule a body for destruction at the start of the next step.
    pub fn destroy_body(&mut self, handle: RigidBodyHandle) {
        if !self.pending_removals.contains(&handle) {
            self.pending_removals.push(handle);
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Logical entity whose shape contains the point. First hit reported by
    /// the spatial query wins. Sensors are skipped unless requested; walls
    /// are never selectable.
    pub fn query_point_owner(
        &mut self,
        point: Vector2<f32>,
        include_sensors: bool,
    ) -> Option<ColliderTag> {
        self.query_pipeline.update(&self.bodies, &self.colliders);

        let p = Point2::from(point);
        let mut found = None;
        self.query_pipeline.intersections_with_point(
            &self.bodies,
            &self.colliders,
            &p,
            QueryFilter::default(),
            |handle| {
                if !include_sensors {
                    if let Some(collider) = self.colliders.get(handle) {
                        if collider.is_sensor() {
                            return true;
                        }
                    }
                }
                match self.tags.get(&handle) {
                    Some(ColliderTag::Wall) | None => true,
                    Some(tag) => {
                        found = Some(*tag);
                        false
                    }
                }
            },
        );
        found
    }

    pub fn tag_of(&self, handle: ColliderHandle) -> Option<ColliderTag> {
        self.tags.get(&handle).copied()
    }

    /// Position, angle, linear and angular velocity of a live body.
    pub fn body_kinematics(
        &self,
        handle: RigidBodyHandle,
    ) -> Option<(Vector2<f32>, f32, Vector2<f32>, f32)> {
        self.bodies.get(handle).map(|body| {
            (
                *body.translation(),
                body.rotation().angle(),
                *body.linvel(),
                body.angvel(),
            )
        })
    }

    pub fn body_mass(&self, handle: RigidBodyHandle) -> Option<f32> {
        self.bodies.get(handle).map(|body| body.mass())
    }

    pub fn is_dynamic(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).map_or(false, |body| body.is_dynamic())
    }

    pub fn contains_body(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).is_some()
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Instantly rewrite a body transform. Teleportation only; regular
    /// motion goes through the integrator.
    pub fn set_body_transform(&mut self, handle: RigidBodyHandle, position: Vector2<f32>, angle: f32) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_position(Isometry::new(position, angle), true);
        }
    }

    pub fn set_body_velocity(&mut self, handle: RigidBodyHandle, linvel: Vector2<f32>, angvel: f32) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(linvel, true);
            body.set_angvel(angvel, true);
        }
    }

    pub fn add_force(&mut self, handle: RigidBodyHandle, force: Vector2<f32>) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.add_force(force, true);
        }
    }

    /// One-shot impulse at the center of mass.
    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vector2<f32>) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.apply_impulse(impulse, true);
        }
    }

    pub fn wake(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.wake_up(true);
        }
    }

    // -------------------------------------------------------------------------
    // Gravity
    // -------------------------------------------------------------------------

    /// Flip gravity between the configured vector and zero, waking every
    /// dynamic body so the change is visible immediately.
    pub fn toggle_gravity(&mut self) -> bool {
        if self.gravity_enabled() {
            self.gravity = vector![0.0, 0.0];
        } else {
            self.gravity = self.default_gravity;
        }
        for (_, body) in self.bodies.iter_mut() {
            if body.is_dynamic() {
                body.wake_up(true);
            }
        }
        let on = self.gravity_enabled();
        debug!("gravity {}", if on { "on" } else { "off" });
        on
    }

    pub fn gravity_enabled(&self) -> bool {
        self.gravity.norm() > 1e-3
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn pending_removal_count(&self) -> usize {
        self.pending_removals.len()
    }
}

impl Drop for PhysicsWorld {
    fn drop(&mut self) {
        if !self.pending_removals.is_empty() {
            warn!(
                "physics world dropped with {} pending removals",
                self.pending_removals.len()
            );
        }
    }
}

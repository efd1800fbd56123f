// src/sandbox.rs
//! The sandbox facade: owns every manager and drives the fixed-step frame.
//!
//! Per fixed step, in order: deferred destruction (inside the world step),
//! drag spring force, rigid-body integration, kinematic mirror sync, entry
//! detection over the drained contact events, teleport queue drain, cooldown
//! aging, cleanup passes. Contact events only ever enqueue; body mutation
//! happens strictly after the step. All shared state lives here, on the
//! frame thread.

use glam::Vec2;
use log::debug;
use nalgebra::Vector2;

use crate::config::SandboxConfig;
use crate::coords::ScreenMapper;
use crate::drag::DragController;
use crate::objects::{MovableObject, ObjectId, ObjectManager, ShapeKind};
use crate::physics::{ColliderTag, PhysicsWorld};
use crate::portals::{PairId, PortalEndpoint, PortalManager};
use crate::stepper::{FixedStepper, StepPhase};
use crate::Result;

pub struct Sandbox {
    cfg: SandboxConfig,
    mapper: ScreenMapper,
    world: PhysicsWorld,
    objects: ObjectManager,
    portals: PortalManager,
    drag: DragController,
    stepper: FixedStepper,
    phase: StepPhase,
    /// Simulation-clock seconds; cooldown timestamps use this, not wall
    /// time, so replays and tests are deterministic.
    sim_time: f64,
}

impl Sandbox {
    pub fn new(cfg: SandboxConfig) -> Self {
        let mapper = ScreenMapper::new(cfg.pixels_per_meter, cfg.screen_height);
        let mut world = PhysicsWorld::new(Vector2::new(cfg.gravity[0], cfg.gravity[1]));
        let (width_m, height_m) = cfg.world_extent();
        world.add_boundaries(width_m, height_m, cfg.wall_thickness);
        let stepper = FixedStepper::new(cfg.fixed_dt, cfg.max_steps_per_frame);

        Self {
            cfg,
            mapper,
            world,
            objects: ObjectManager::new(),
            portals: PortalManager::new(),
            drag: DragController::new(),
            stepper,
            phase: StepPhase::Idle,
            sim_time: 0.0,
        }
    }

    // -------------------------------------------------------------------------
    // Frame driver
    // -------------------------------------------------------------------------

    /// Advance the simulation by a real frame delta. Runs zero or more fixed
    /// steps depending on accumulated time.
    pub fn update(&mut self, real_dt: f32) {
        let steps = self.stepper.advance(real_dt);
        for _ in 0..steps {
            self.fixed_step();
        }
    }

    fn fixed_step(&mut self) {
        self.phase = StepPhase::Stepping;
        self.drag.apply_spring(&mut self.world, &self.cfg);
        let stepped = self.world.step(self.cfg.fixed_dt);

        self.phase = StepPhase::PostProcessing;
        if stepped {
            self.sim_time += f64::from(self.cfg.fixed_dt);
            self.objects.sync_from_physics(&self.world);
            self.detect_portal_entries();

            // an active drag must not fight the transform rewrite
            for id in self.portals.queued_objects() {
                self.drag.release_if(id);
            }
            self.portals.process_teleport_queue(
                &mut self.world,
                &mut self.objects,
                self.sim_time,
                &self.cfg,
            );
        } else {
            // failed step: the frame's contacts are void, object state stays
            // at its last synced value
            self.portals.clear_queue(&mut self.objects);
        }

        self.portals.age_cooldowns(self.sim_time);
        self.objects.cleanup();
        self.portals.cleanup();
        self.phase = StepPhase::Idle;
    }

    /// Filter the step's contact events down to sensor/object begin-contacts
    /// and hand them to the portal manager.
    fn detect_portal_entries(&mut self) {
        for event in self.world.drain_collision_events() {
            if !event.started() {
                continue;
            }
            let tags = (
                self.world.tag_of(event.collider1()),
                self.world.tag_of(event.collider2()),
            );
            let (endpoint, object) = match tags {
                (Some(ColliderTag::PortalSensor(e)), Some(ColliderTag::Object(o)))
                | (Some(ColliderTag::Object(o)), Some(ColliderTag::PortalSensor(e))) => (e, o),
                _ => continue,
            };
            self.portals.handle_sensor_contact(
                &self.world,
                &mut self.objects,
                endpoint,
                object,
                self.sim_time,
                &self.cfg,
            );
        }
    }

    // -------------------------------------------------------------------------
    // Objects
    // -------------------------------------------------------------------------

    pub fn spawn_object(&mut self, kind: ShapeKind, screen_pos: Vec2) -> Result<ObjectId> {
        let position = self.mapper.to_sim(screen_pos);
        self.objects
            .spawn(&mut self.world, &self.cfg, kind, position, 0.0)
    }

    /// Live object under a screen point, if any.
    pub fn object_at(&mut self, screen_pos: Vec2) -> Option<ObjectId> {
        let point = self.mapper.to_sim(screen_pos);
        match self.world.query_point_owner(point, false) {
            Some(ColliderTag::Object(id)) => self
                .objects
                .get(id)
                .filter(|o| o.is_live() && !o.teleporting)
                .map(|o| o.id),
            _ => None,
        }
    }

    pub fn delete_object(&mut self, id: ObjectId) -> bool {
        self.drag.release_if(id);
        self.objects.delete(&mut self.world, id)
    }

    pub fn delete_object_at(&mut self, screen_pos: Vec2) -> bool {
        match self.object_at(screen_pos) {
            Some(id) => self.delete_object(id),
            None => false,
        }
    }

    // -------------------------------------------------------------------------
    // Portals
    // -------------------------------------------------------------------------

    /// Start the creation drag; the anchor endpoint takes `anchor_angle`.
    pub fn begin_portal_creation(&mut self, screen_pos: Vec2, anchor_angle: f32) {
        self.portals.begin_creation(screen_pos, anchor_angle);
    }

    pub fn finish_portal_creation(&mut self, screen_pos: Vec2) -> Option<PairId> {
        self.portals
            .finish_creation(&mut self.world, &self.mapper, &self.cfg, screen_pos)
    }

    pub fn cancel_portal_creation(&mut self) {
        self.portals.cancel_creation();
    }

    pub fn portal_creation_active(&self) -> bool {
        self.portals.creation_active()
    }

    /// Pending creation line in screen coordinates, for the render layer.
    pub fn portal_preview_line(&self, cursor_screen: Vec2) -> Option<(Vec2, Vec2)> {
        self.portals.preview_line(cursor_screen)
    }

    /// Portal pair whose sensor contains a screen point.
    pub fn portal_at(&mut self, screen_pos: Vec2) -> Option<PairId> {
        let point = self.mapper.to_sim(screen_pos);
        match self.world.query_point_owner(point, true) {
            Some(ColliderTag::PortalSensor(id)) => self.portals.endpoint(id).map(|e| e.pair),
            _ => None,
        }
    }

    pub fn delete_portal_pair(&mut self, id: PairId) -> bool {
        self.portals.delete_pair(&mut self.world, id)
    }

    pub fn delete_portal_at(&mut self, screen_pos: Vec2) -> bool {
        match self.portal_at(screen_pos) {
            Some(id) => self.delete_portal_pair(id),
            None => false,
        }
    }

    // -------------------------------------------------------------------------
    // Drag
    // -------------------------------------------------------------------------

    /// Pick the object under the pointer and start dragging it.
    pub fn start_drag_at(&mut self, screen_pos: Vec2) -> Result<ObjectId> {
        let id = self
            .object_at(screen_pos)
            .ok_or(crate::Error::DragRejected("nothing draggable here"))?;
        let target = self.mapper.to_sim(screen_pos);
        self.drag
            .start(&mut self.world, &self.objects, id, target)?;
        Ok(id)
    }

    pub fn update_drag(&mut self, screen_pos: Vec2) {
        self.drag.update(self.mapper.to_sim(screen_pos));
    }

    /// Stop dragging; `pointer_velocity` is in screen pixels per second.
    pub fn stop_drag(&mut self, apply_throw: bool, pointer_velocity: Vec2) {
        let velocity = self.mapper.vector_to_sim(pointer_velocity);
        self.drag
            .stop(&mut self.world, &self.cfg, apply_throw, velocity);
    }

    pub fn dragged_object(&self) -> Option<ObjectId> {
        self.drag.dragged_object()
    }

    // -------------------------------------------------------------------------
    // World toggles & snapshots
    // -------------------------------------------------------------------------

    pub fn toggle_gravity(&mut self) -> bool {
        let on = self.world.toggle_gravity();
        debug!("gravity toggled {}", if on { "on" } else { "off" });
        on
    }

    pub fn gravity_enabled(&self) -> bool {
        self.world.gravity_enabled()
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.cfg
    }

    pub fn mapper(&self) -> &ScreenMapper {
        &self.mapper
    }

    pub fn objects(&self) -> impl Iterator<Item = &MovableObject> {
        self.objects.objects()
    }

    pub fn object(&self, id: ObjectId) -> Option<&MovableObject> {
        self.objects.get(id)
    }

    pub fn portals(&self) -> impl Iterator<Item = &PortalEndpoint> {
        self.portals.endpoints()
    }

    pub fn object_count(&self) -> usize {
        self.objects.count()
    }

    pub fn portal_count(&self) -> usize {
        self.portals.endpoint_count()
    }

    pub fn teleport_queue_len(&self) -> usize {
        self.portals.queue_len()
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn phase(&self) -> StepPhase {
        self.phase
    }
}

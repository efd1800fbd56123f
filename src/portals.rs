// src/portals.rs
//! Portal pairs: creation gesture, entry detection, exit transform math,
//! per-endpoint cooldowns and the per-frame teleport queue.
//!
//! A pair's two endpoints are created and destroyed together; the partner
//! link is implied by pair membership, so it can never be one-directional or
//! dangling. Contact handling only ever enqueues; the queue is drained
//! strictly after the physics step has completed.

use std::collections::{HashMap, HashSet};

use glam::Vec2;
use log::{debug, warn};
use nalgebra::Vector2;

use crate::config::SandboxConfig;
use crate::coords::ScreenMapper;
use crate::objects::{ObjectId, ObjectManager};
use crate::physics::PhysicsWorld;
use crate::Result;
use rapier2d::prelude::RigidBodyHandle;

/// Render palette cycled per pair.
pub const PAIR_COLORS: [[u8; 3]; 5] = [
    [0xA0, 0xC3, 0xFF],
    [0xFA, 0xD2, 0xCF],
    [0xFF, 0xF8, 0xE1],
    [0xD1, 0xFA, 0xD7],
    [0xE8, 0xDF, 0xF5],
];

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct EndpointId(pub u32);

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct PairId(pub u32);

/// One oriented opening of a portal pair. Thin plane, not a point: the
/// sensor is a `width` x `height` rectangle at `position` rotated by
/// `angle`.
#[derive(Debug)]
pub struct PortalEndpoint {
    pub id: EndpointId,
    pub pair: PairId,
    pub position: Vector2<f32>,
    pub angle: f32,
    pub width: f32,
    pub height: f32,
    pub sensor: Option<RigidBodyHandle>,
    pub marked_for_deletion: bool,
    cooldown_until: HashMap<ObjectId, f64>,
}

impl PortalEndpoint {
    fn new(id: EndpointId, pair: PairId, position: Vector2<f32>, angle: f32, cfg: &SandboxConfig) -> Self {
        Self {
            id,
            pair,
            position,
            angle,
            width: cfg.portal_width,
            height: cfg.portal_height,
            sensor: None,
            marked_for_deletion: false,
            cooldown_until: HashMap::new(),
        }
    }

    pub fn is_live(&self) -> bool {
        !self.marked_for_deletion && self.sensor.is_some()
    }

    /// Unit normal the exiting side of the plane faces.
    pub fn outward_normal(&self) -> Vector2<f32> {
        Vector2::new(-self.angle.sin(), self.angle.cos())
    }

    pub fn can_teleport(&self, object: ObjectId, now: f64) -> bool {
        self.cooldown_until
            .get(&object)
            .map_or(true, |&until| now >= until)
    }

    fn start_cooldown(&mut self, object: ObjectId, now: f64, duration: f64) {
        self.cooldown_until.insert(object, now + duration);
    }

    /// Lazy pruning; expired entries are dropped, never polled.
    fn age_cooldowns(&mut self, now: f64) {
        self.cooldown_until.retain(|_, &mut until| until > now);
    }

    pub fn active_cooldowns(&self) -> usize {
        self.cooldown_until.len()
    }
}

/// Two endpoints that always live and die together.
#[derive(Debug)]
pub struct PortalPair {
    pub id: PairId,
    pub color: [u8; 3],
    a: PortalEndpoint,
    b: PortalEndpoint,
}

impl PortalPair {
    pub fn endpoints(&self) -> [&PortalEndpoint; 2] {
        [&self.a, &self.b]
    }

    pub fn endpoint(&self, id: EndpointId) -> Option<&PortalEndpoint> {
        [&self.a, &self.b].into_iter().find(|e| e.id == id)
    }

    /// The linked partner of `id` inside this pair.
    pub fn other(&self, id: EndpointId) -> Option<&PortalEndpoint> {
        if self.a.id == id {
            Some(&self.b)
        } else if self.b.id == id {
            Some(&self.a)
        } else {
            None
        }
    }

    fn endpoint_mut(&mut self, id: EndpointId) -> Option<&mut PortalEndpoint> {
        [&mut self.a, &mut self.b].into_iter().find(|e| e.id == id)
    }
}

/// Everything needed to rewrite a body at the exit side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitTransform {
    pub position: Vector2<f32>,
    pub angle: f32,
    pub linvel: Vector2<f32>,
    pub angvel: f32,
}

/// Per-frame teleport candidate; never survives the frame it was queued in.
#[derive(Debug, Clone, Copy)]
struct TeleportRequest {
    object: ObjectId,
    entry: EndpointId,
}

#[derive(Debug, Clone, Copy)]
struct PendingCreation {
    start_screen: Vec2,
    start_angle: f32,
}

#[derive(Default)]
pub struct PortalManager {
    pairs: Vec<PortalPair>,
    next_pair: u32,
    next_endpoint: u32,
    pending: Option<PendingCreation>,
    queue: Vec<TeleportRequest>,
}

impl PortalManager {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Creation gesture
    // -------------------------------------------------------------------------

    /// Record the anchor of a creation drag. The anchor endpoint will take
    /// the supplied angle; nothing exists in the world yet.
    pub fn begin_creation(&mut self, start_screen: Vec2, start_angle: f32) {
        self.pending = Some(PendingCreation {
            start_screen,
            start_angle,
        });
    }

    /// Anchor-to-cursor segment for the render layer while a drag is
    /// pending. Screen space, no physics meaning.
    pub fn preview_line(&self, cursor_screen: Vec2) -> Option<(Vec2, Vec2)> {
        self.pending.map(|p| (p.start_screen, cursor_screen))
    }

    pub fn creation_active(&self) -> bool {
        self.pending.is_some()
    }

    /// Clear pending state. Callable any time, no side effects.
    pub fn cancel_creation(&mut self) {
        self.pending = None;
    }

    /// Complete the drag. Too-short drags cancel silently; otherwise both
    /// endpoints and sensors are created, or neither is.
    pub fn finish_creation(
        &mut self,
        world: &mut PhysicsWorld,
        mapper: &ScreenMapper,
        cfg: &SandboxConfig,
        end_screen: Vec2,
    ) -> Option<PairId> {
        let pending = self.pending.take()?;

        if pending.start_screen.distance(end_screen) <= cfg.min_portal_drag_px {
            debug!("portal drag too short, creation cancelled");
            return None;
        }

        let anchor = mapper.to_sim(pending.start_screen);
        let release = mapper.to_sim(end_screen);
        match self.create_pair_at(
            world,
            cfg,
            anchor,
            pending.start_angle,
            release,
            std::f32::consts::FRAC_PI_2,
        ) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!("portal pair creation failed: {err}");
                None
            }
        }
    }

    /// Build a linked pair directly at simulation coordinates. Both sensors
    /// are created or the whole pair rolls back.
    pub fn create_pair_at(
        &mut self,
        world: &mut PhysicsWorld,
        cfg: &SandboxConfig,
        pos_a: Vector2<f32>,
        angle_a: f32,
        pos_b: Vector2<f32>,
        angle_b: f32,
    ) -> Result<PairId> {
        let pair_id = PairId(self.next_pair);
        let id_a = EndpointId(self.next_endpoint);
        let id_b = EndpointId(self.next_endpoint + 1);

        let mut a = PortalEndpoint::new(id_a, pair_id, pos_a, angle_a, cfg);
        let mut b = PortalEndpoint::new(id_b, pair_id, pos_b, angle_b, cfg);

        let sensor_a = world.spawn_portal_sensor(id_a, a.width, a.height, pos_a, angle_a)?;
        a.sensor = Some(sensor_a);
        match world.spawn_portal_sensor(id_b, b.width, b.height, pos_b, angle_b) {
            Ok(sensor_b) => b.sensor = Some(sensor_b),
            Err(err) => {
                world.destroy_body(sensor_a);
                return Err(err);
            }
        }

        self.next_pair += 1;
        self.next_endpoint += 2;
        let color = PAIR_COLORS[pair_id.0 as usize % PAIR_COLORS.len()];
        self.pairs.push(PortalPair {
            id: pair_id,
            color,
            a,
            b,
        });
        debug!("created portal pair {pair_id:?} ({id_a:?} <-> {id_b:?})");
        Ok(pair_id)
    }

    // -------------------------------------------------------------------------
    // Deletion
    // -------------------------------------------------------------------------

    /// Remove a pair: both endpoints are marked and both sensors scheduled
    /// for deferred destruction in the same call, so no observer ever sees a
    /// single dangling endpoint.
    pub fn delete_pair(&mut self, world: &mut PhysicsWorld, id: PairId) -> bool {
        let Some(index) = self.pairs.iter().position(|p| p.id == id) else {
            return false;
        };
        let mut pair = self.pairs.remove(index);
        for endpoint in [&mut pair.a, &mut pair.b] {
            endpoint.marked_for_deletion = true;
            if let Some(sensor) = endpoint.sensor.take() {
                world.destroy_body(sensor);
            }
        }
        debug!("deleted portal pair {id:?}");
        true
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    pub fn pair(&self, id: PairId) -> Option<&PortalPair> {
        self.pairs.iter().find(|p| p.id == id)
    }

    pub fn endpoint(&self, id: EndpointId) -> Option<&PortalEndpoint> {
        self.pairs.iter().find_map(|p| p.endpoint(id))
    }

    /// The endpoint linked to `id`, if both are still around.
    pub fn exit_of(&self, id: EndpointId) -> Option<&PortalEndpoint> {
        self.pairs
            .iter()
            .find(|p| p.endpoint(id).is_some())
            .and_then(|p| p.other(id))
    }

    /// Flat list of all live endpoints.
    pub fn endpoints(&self) -> impl Iterator<Item = &PortalEndpoint> {
        self.pairs
            .iter()
            .flat_map(|p| p.endpoints())
            .filter(|e| !e.marked_for_deletion)
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints().count()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    // -------------------------------------------------------------------------
    // Entry detection
    // -------------------------------------------------------------------------

    /// React to a begin-contact between a portal sensor and an object body.
    /// Accepts the request only when the endpoint is live and linked, the
    /// object is live and dynamic, and it is moving into the plane rather
    /// than grazing it. Accepted objects are flagged `teleporting` right
    /// away so renderers can suppress them before the transform lands.
    pub fn handle_sensor_contact(
        &mut self,
        world: &PhysicsWorld,
        objects: &mut ObjectManager,
        entry_id: EndpointId,
        object_id: ObjectId,
        now: f64,
        cfg: &SandboxConfig,
    ) {
        let Some(entry) = self.endpoint(entry_id) else {
            return;
        };
        if !entry.is_live() {
            return;
        }
        let entry_pos = entry.position;
        let Some(exit) = self.exit_of(entry_id) else {
            return;
        };
        if !exit.is_live() {
            return;
        }
        if !exit.can_teleport(object_id, now) {
            debug!("object {object_id:?} still cooling down on {:?}", exit.id);
            return;
        }

        let Some(obj) = objects.get(object_id) else {
            return;
        };
        if !obj.is_live() || obj.teleporting {
            return;
        }
        let Some(body) = obj.body else { return };
        if !world.is_dynamic(body) {
            return;
        }

        // entering, not exiting: velocity projected on the portal-to-object
        // offset must point back toward the plane
        let offset = obj.position - entry_pos;
        if offset.dot(&obj.linvel) >= cfg.entry_dot_tolerance {
            return;
        }

        if self.queue.iter().any(|r| r.object == object_id) {
            return;
        }

        self.queue.push(TeleportRequest {
            object: object_id,
            entry: entry_id,
        });
        if let Some(obj) = objects.get_mut(object_id) {
            obj.teleporting = true;
        }
        debug!("queued teleport of {object_id:?} through {entry_id:?}");
    }

    /// Object ids currently queued; the drag controller releases these
    /// before their transforms are rewritten.
    pub fn queued_objects(&self) -> Vec<ObjectId> {
        self.queue.iter().map(|r| r.object).collect()
    }

    // -------------------------------------------------------------------------
    // Exit transform
    // -------------------------------------------------------------------------

    /// Map an entering body's state through `entry` onto its linked exit.
    ///
    /// The +pi flip makes the exit face away from the plane the object came
    /// in through; one formula covers every relative orientation, parallel
    /// and anti-parallel included. Linear speed and angular velocity are
    /// preserved exactly.
    pub fn exit_transform(
        &self,
        entry_id: EndpointId,
        position: Vector2<f32>,
        angle: f32,
        linvel: Vector2<f32>,
        angvel: f32,
        safety_offset: f32,
    ) -> Option<ExitTransform> {
        let entry = self.endpoint(entry_id)?;
        let exit = self.exit_of(entry_id)?;

        let relative_angle = exit.angle - entry.angle + std::f32::consts::PI;
        let (sin_a, cos_a) = relative_angle.sin_cos();
        let rotate = |v: Vector2<f32>| {
            Vector2::new(v.x * cos_a - v.y * sin_a, v.x * sin_a + v.y * cos_a)
        };

        let offset = rotate(position - entry.position);
        let position = exit.position + offset + exit.outward_normal() * safety_offset;

        Some(ExitTransform {
            position,
            angle: angle + relative_angle,
            linvel: rotate(linvel),
            angvel,
        })
    }

    // -------------------------------------------------------------------------
    // Post-step queue draining
    // -------------------------------------------------------------------------

    /// Execute queued teleports. Runs strictly after the physics step; at
    /// most one teleport per object per frame; the queue is emptied no
    /// matter what.
    pub fn process_teleport_queue(
        &mut self,
        world: &mut PhysicsWorld,
        objects: &mut ObjectManager,
        now: f64,
        cfg: &SandboxConfig,
    ) {
        if self.queue.is_empty() {
            return;
        }

        let requests = std::mem::take(&mut self.queue);
        let mut processed: HashSet<ObjectId> = HashSet::new();

        for request in requests {
            let clear_flag = |objects: &mut ObjectManager| {
                if let Some(obj) = objects.get_mut(request.object) {
                    obj.teleporting = false;
                }
            };

            if processed.contains(&request.object) {
                clear_flag(objects);
                continue;
            }

            let Some((body, position, angle, linvel, angvel)) = objects
                .get(request.object)
                .filter(|o| !o.marked_for_deletion)
                .and_then(|o| o.body.map(|b| (b, o.position, o.angle, o.linvel, o.angvel)))
            else {
                clear_flag(objects);
                continue;
            };
            if !world.contains_body(body) {
                clear_flag(objects);
                continue;
            }

            let exit_id = match self.exit_of(request.entry) {
                Some(exit) if exit.is_live() => exit.id,
                _ => {
                    clear_flag(objects);
                    continue;
                }
            };
            if !self
                .endpoint(exit_id)
                .map_or(false, |e| e.can_teleport(request.object, now))
            {
                debug!("teleport of {:?} dropped: exit on cooldown", request.object);
                clear_flag(objects);
                continue;
            }

            let Some(transform) = self.exit_transform(
                request.entry,
                position,
                angle,
                linvel,
                angvel,
                cfg.exit_safety_offset,
            ) else {
                clear_flag(objects);
                continue;
            };

            world.set_body_transform(body, transform.position, transform.angle);
            world.set_body_velocity(body, transform.linvel, transform.angvel);
            world.wake(body);

            if let Some(exit) = self
                .pairs
                .iter_mut()
                .find(|p| p.endpoint(exit_id).is_some())
                .and_then(|p| p.endpoint_mut(exit_id))
            {
                exit.start_cooldown(request.object, now, cfg.portal_cooldown);
            }

            if let Some(obj) = objects.get_mut(request.object) {
                obj.position = transform.position;
                obj.angle = transform.angle;
                obj.linvel = transform.linvel;
                obj.angvel = transform.angvel;
                obj.teleporting = false;
            }
            processed.insert(request.object);
            debug!(
                "teleported {:?} from {:?} to {exit_id:?}",
                request.object, request.entry
            );
        }
    }

    /// Drop every queued request and clear the in-flight flags. Used when a
    /// step fails and its contact events are void.
    pub fn clear_queue(&mut self, objects: &mut ObjectManager) {
        for request in self.queue.drain(..) {
            if let Some(obj) = objects.get_mut(request.object) {
                obj.teleporting = false;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Bookkeeping
    // -------------------------------------------------------------------------

    /// Prune expired cooldown entries on every live endpoint.
    pub fn age_cooldowns(&mut self, now: f64) {
        for pair in &mut self.pairs {
            pair.a.age_cooldowns(now);
            pair.b.age_cooldowns(now);
        }
    }

    /// Drop pairs whose endpoints were marked outside `delete_pair`.
    pub fn cleanup(&mut self) {
        self.pairs
            .retain(|p| !p.a.marked_for_deletion && !p.b.marked_for_deletion);
    }

    #[cfg(test)]
    fn start_cooldown_for_test(&mut self, id: EndpointId, object: ObjectId, now: f64, duration: f64) {
        if let Some(endpoint) = self
            .pairs
            .iter_mut()
            .find(|p| p.endpoint(id).is_some())
            .and_then(|p| p.endpoint_mut(id))
        {
            endpoint.start_cooldown(object, now, duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::ShapeKind;
    use std::f32::consts::{FRAC_PI_2, PI};

    const EPS: f32 = 1e-4;

    fn setup() -> (PhysicsWorld, ObjectManager, PortalManager, SandboxConfig) {
        let cfg = SandboxConfig::default();
        let mut world = PhysicsWorld::new(Vector2::new(0.0, -9.8));
        world.toggle_gravity(); // deterministic: gravity off
        (world, ObjectManager::new(), PortalManager::new(), cfg)
    }

    fn make_pair(
        world: &mut PhysicsWorld,
        portals: &mut PortalManager,
        cfg: &SandboxConfig,
        pos_a: Vector2<f32>,
        angle_a: f32,
        pos_b: Vector2<f32>,
        angle_b: f32,
    ) -> (PairId, EndpointId, EndpointId) {
        let pair = portals
            .create_pair_at(world, cfg, pos_a, angle_a, pos_b, angle_b)
            .unwrap();
        let [a, b] = portals.pair(pair).unwrap().endpoints();
        (pair, a.id, b.id)
    }

    #[test]
    fn linkage_is_symmetric_until_deletion() {
        let (mut world, _, mut portals, cfg) = setup();
        let (pair, a, b) = make_pair(
            &mut world,
            &mut portals,
            &cfg,
            Vector2::new(5.0, 5.0),
            0.0,
            Vector2::new(20.0, 5.0),
            FRAC_PI_2,
        );

        assert_eq!(portals.exit_of(a).unwrap().id, b);
        assert_eq!(portals.exit_of(b).unwrap().id, a);
        assert_eq!(portals.endpoint_count(), 2);

        assert!(portals.delete_pair(&mut world, pair));
        // both endpoints gone in the same update, no dangling sibling
        assert_eq!(portals.endpoint_count(), 0);
        assert!(portals.endpoint(a).is_none());
        assert!(portals.endpoint(b).is_none());
        assert_eq!(world.pending_removal_count(), 2);
    }

    #[test]
    fn creation_gesture_respects_min_distance() {
        let (mut world, _, mut portals, cfg) = setup();
        let mapper = ScreenMapper::new(cfg.pixels_per_meter, cfg.screen_height);

        portals.begin_creation(Vec2::new(100.0, 100.0), 0.0);
        assert!(portals.creation_active());
        assert_eq!(
            portals.preview_line(Vec2::new(110.0, 100.0)),
            Some((Vec2::new(100.0, 100.0), Vec2::new(110.0, 100.0)))
        );

        // below the threshold: silently cancelled, nothing created
        assert!(portals
            .finish_creation(&mut world, &mapper, &cfg, Vec2::new(110.0, 100.0))
            .is_none());
        assert!(!portals.creation_active());
        assert_eq!(portals.endpoint_count(), 0);

        portals.begin_creation(Vec2::new(100.0, 100.0), 0.0);
        let pair = portals
            .finish_creation(&mut world, &mapper, &cfg, Vec2::new(400.0, 100.0))
            .unwrap();
        assert_eq!(portals.endpoint_count(), 2);

        let [a, b] = portals.pair(pair).unwrap().endpoints();
        assert!((a.position - mapper.to_sim(Vec2::new(100.0, 100.0))).norm() < EPS);
        assert!((b.position - mapper.to_sim(Vec2::new(400.0, 100.0))).norm() < EPS);
        assert_eq!(a.angle, 0.0);
        assert_eq!(b.angle, FRAC_PI_2);
    }

    #[test]
    fn cancel_creation_is_side_effect_free() {
        let (_, _, mut portals, _) = setup();
        portals.cancel_creation();
        portals.begin_creation(Vec2::new(10.0, 10.0), 0.0);
        portals.cancel_creation();
        assert!(!portals.creation_active());
        assert!(portals.preview_line(Vec2::ZERO).is_none());
    }

    #[test]
    fn failed_sensor_creation_leaves_no_pair() {
        let (mut world, _, mut portals, mut cfg) = setup();
        let ok = portals.create_pair_at(
            &mut world,
            &cfg,
            Vector2::new(5.0, 5.0),
            0.0,
            Vector2::new(20.0, 5.0),
            0.0,
        );
        assert!(ok.is_ok());

        cfg.portal_width = 0.0;
        let bodies_before = world.body_count();
        let err = portals.create_pair_at(
            &mut world,
            &cfg,
            Vector2::new(8.0, 5.0),
            0.0,
            Vector2::new(25.0, 5.0),
            0.0,
        );
        assert!(err.is_err());
        // no half-registered pair, no leaked sensor body
        assert_eq!(portals.endpoint_count(), 2);
        assert_eq!(world.body_count(), bodies_before);
    }

    #[test]
    fn exit_transform_parallel_portals_reverse_velocity() {
        let (mut world, _, mut portals, cfg) = setup();
        // the scenario: E at (100,100), X at (500,100), both angle 0
        let (_, e, _) = make_pair(
            &mut world,
            &mut portals,
            &cfg,
            Vector2::new(100.0, 100.0),
            0.0,
            Vector2::new(500.0, 100.0),
            0.0,
        );

        let t = portals
            .exit_transform(
                e,
                Vector2::new(100.0, 100.0),
                0.0,
                Vector2::new(0.0, -50.0),
                0.0,
                cfg.exit_safety_offset,
            )
            .unwrap();

        // relative angle pi: direction reversed, magnitude preserved
        assert!((t.linvel - Vector2::new(0.0, 50.0)).norm() < 1e-2);
        assert!((t.linvel.norm() - 50.0).abs() < 1e-2);
        // offset from X's center along its outward normal, not on the center
        let expected = Vector2::new(500.0, 100.0) + Vector2::new(0.0, cfg.exit_safety_offset);
        assert!((t.position - expected).norm() < 1e-2);
        assert_eq!(t.angvel, 0.0);
    }

    #[test]
    fn exit_transform_anti_parallel_keeps_direction() {
        let (mut world, _, mut portals, cfg) = setup();
        let (_, e, _) = make_pair(
            &mut world,
            &mut portals,
            &cfg,
            Vector2::new(0.0, 0.0),
            0.0,
            Vector2::new(30.0, 0.0),
            PI,
        );

        let v = Vector2::new(3.0, -4.0);
        let t = portals
            .exit_transform(e, Vector2::new(0.0, 0.0), 0.5, v, 2.5, 0.0)
            .unwrap();
        // relative angle 2*pi: velocity direction unchanged
        assert!((t.linvel - v).norm() < 1e-3);
        assert!((t.angvel - 2.5).abs() < EPS);
    }

    #[test]
    fn exit_transform_general_angle_preserves_magnitudes() {
        let (mut world, _, mut portals, cfg) = setup();
        let (_, e, _) = make_pair(
            &mut world,
            &mut portals,
            &cfg,
            Vector2::new(2.0, 3.0),
            0.7,
            Vector2::new(40.0, 12.0),
            -1.3,
        );

        let v = Vector2::new(-6.0, 2.0);
        let t = portals
            .exit_transform(e, Vector2::new(2.4, 3.1), 1.1, v, -0.8, 0.0)
            .unwrap();
        assert!((t.linvel.norm() - v.norm()).abs() < 1e-3);
        assert!((t.angvel - -0.8).abs() < EPS);
        assert!((t.angle - (1.1 + (-1.3 - 0.7 + PI))).abs() < 1e-3);
    }

    #[test]
    fn cooldown_blocks_exit_endpoint_only() {
        let (mut world, _, mut portals, cfg) = setup();
        let (_, e, x) = make_pair(
            &mut world,
            &mut portals,
            &cfg,
            Vector2::new(5.0, 5.0),
            0.0,
            Vector2::new(20.0, 5.0),
            0.0,
        );
        let obj = ObjectId(0);

        portals.start_cooldown_for_test(x, obj, 0.0, cfg.portal_cooldown);
        // blocked through X...
        assert!(!portals.endpoint(x).unwrap().can_teleport(obj, 1.0));
        // ...but free through the paired endpoint E
        assert!(portals.endpoint(e).unwrap().can_teleport(obj, 1.0));

        // expiry frees it; lazy pruning drops the entry
        assert!(portals.endpoint(x).unwrap().can_teleport(obj, cfg.portal_cooldown));
        portals.age_cooldowns(cfg.portal_cooldown + 0.1);
        assert_eq!(portals.endpoint(x).unwrap().active_cooldowns(), 0);
    }

    #[test]
    fn contact_entry_conditions() {
        let (mut world, mut objects, mut portals, cfg) = setup();
        let (_, e, _) = make_pair(
            &mut world,
            &mut portals,
            &cfg,
            Vector2::new(10.0, 5.0),
            0.0,
            Vector2::new(30.0, 5.0),
            0.0,
        );

        let approaching = objects
            .spawn(&mut world, &cfg, ShapeKind::circle(&cfg), Vector2::new(10.5, 5.0), 0.0)
            .unwrap();
        let grazing = objects
            .spawn(&mut world, &cfg, ShapeKind::circle(&cfg), Vector2::new(10.5, 5.0), 0.0)
            .unwrap();
        objects.get_mut(approaching).unwrap().linvel = Vector2::new(-4.0, 0.0);
        objects.get_mut(grazing).unwrap().linvel = Vector2::new(4.0, 0.0);

        portals.handle_sensor_contact(&world, &mut objects, e, approaching, 0.0, &cfg);
        portals.handle_sensor_contact(&world, &mut objects, e, grazing, 0.0, &cfg);
        assert_eq!(portals.queue_len(), 1);
        assert!(objects.get(approaching).unwrap().teleporting);
        assert!(!objects.get(grazing).unwrap().teleporting);

        // an object already queued this frame is not queued twice
        portals.handle_sensor_contact(&world, &mut objects, e, approaching, 0.0, &cfg);
        assert_eq!(portals.queue_len(), 1);
    }

    #[test]
    fn single_teleport_per_frame_per_object() {
        let (mut world, mut objects, mut portals, cfg) = setup();
        let (_, e, x) = make_pair(
            &mut world,
            &mut portals,
            &cfg,
            Vector2::new(10.0, 5.0),
            0.0,
            Vector2::new(30.0, 5.0),
            0.0,
        );

        let obj = objects
            .spawn(&mut world, &cfg, ShapeKind::circle(&cfg), Vector2::new(10.3, 5.0), 0.0)
            .unwrap();
        objects.get_mut(obj).unwrap().linvel = Vector2::new(-4.0, 0.0);

        portals.handle_sensor_contact(&world, &mut objects, e, obj, 0.0, &cfg);
        assert_eq!(portals.queue_len(), 1);

        portals.process_teleport_queue(&mut world, &mut objects, 0.0, &cfg);
        assert_eq!(portals.queue_len(), 0);

        let after = objects.get(obj).unwrap();
        assert!(!after.teleporting);
        // landed on the exit side, velocity reversed by the pi flip
        assert!(after.position.x > 25.0);
        assert!((after.linvel - Vector2::new(4.0, 0.0)).norm() < 1e-3);
        // the exit endpoint now cools this object down
        assert!(!portals.endpoint(x).unwrap().can_teleport(obj, 0.1));
        assert!(portals.endpoint(e).unwrap().can_teleport(obj, 0.1));
    }

    #[test]
    fn stale_queue_entries_are_dropped_cleanly() {
        let (mut world, mut objects, mut portals, cfg) = setup();
        let (pair, e, _) = make_pair(
            &mut world,
            &mut portals,
            &cfg,
            Vector2::new(10.0, 5.0),
            0.0,
            Vector2::new(30.0, 5.0),
            0.0,
        );

        let obj = objects
            .spawn(&mut world, &cfg, ShapeKind::circle(&cfg), Vector2::new(10.3, 5.0), 0.0)
            .unwrap();
        objects.get_mut(obj).unwrap().linvel = Vector2::new(-4.0, 0.0);
        portals.handle_sensor_contact(&world, &mut objects, e, obj, 0.0, &cfg);

        // exit disappears between enqueue and drain
        portals.delete_pair(&mut world, pair);
        let before = objects.get(obj).unwrap().position;
        portals.process_teleport_queue(&mut world, &mut objects, 0.0, &cfg);

        let after = objects.get(obj).unwrap();
        assert!(!after.teleporting);
        assert_eq!(after.position, before);
    }
}

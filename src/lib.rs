// src/lib.rs
//! portals2d: a minimalist 2D physics sandbox with linked portal
//! teleportation.
//!
//! Rigid-body simulation is supplied by rapier2d; this crate owns the logic
//! around it: spawning and dragging objects, creating linked portal pairs,
//! detecting portal entries from sensor contacts, computing exit transforms
//! across arbitrary relative portal orientations, and sequencing all of that
//! against the fixed-step frame so contact handling, teleportation and body
//! destruction never race each other.
//!
//! The [`Sandbox`] facade is the only type host code needs: feed it input
//! events and frame deltas, read back object and portal snapshots for
//! rendering.

pub mod config;
pub mod coords;
pub mod drag;
pub mod error;
pub mod objects;
pub mod physics;
pub mod portals;
pub mod sandbox;
pub mod stepper;

pub use config::SandboxConfig;
pub use coords::ScreenMapper;
pub use drag::DragController;
pub use error::{Error, Result};
pub use objects::{MovableObject, ObjectId, ObjectManager, ShapeKind};
pub use physics::{ColliderTag, PhysicsWorld};
pub use portals::{EndpointId, ExitTransform, PairId, PortalEndpoint, PortalManager};
pub use sandbox::Sandbox;
pub use stepper::{FixedStepper, StepPhase};

// src/config.rs
//! Sandbox configuration: every tunable in one serde-friendly struct.
//!
//! Defaults reproduce the shipped sandbox setup. All fields are optional in
//! JSON, so a config file only needs to name what it overrides.

use serde::Deserialize;

use crate::{Error, Result};

/// Simulation and interaction tuning. Distances are meters and seconds in
/// simulation space unless the field name says pixels.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Presentation surface size in pixels.
    pub screen_width: f32,
    pub screen_height: f32,
    /// Scale factor between presentation pixels and simulation meters.
    pub pixels_per_meter: f32,

    /// Fixed simulation timestep in seconds.
    pub fixed_dt: f32,
    /// Catch-up cap when real time runs ahead of the simulation.
    pub max_steps_per_frame: u32,
    /// World gravity, meters per second squared, Y-up.
    pub gravity: [f32; 2],

    /// Default object sizes.
    pub circle_radius: f32,
    pub box_half_extents: [f32; 2],
    pub triangle_side: f32,

    /// Fixed material constants for every spawned object.
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,

    /// Portal sensor plane size (width across the plane, height along it).
    pub portal_width: f32,
    pub portal_height: f32,
    /// Seconds an object is barred from re-entering an endpoint it just
    /// exited.
    pub portal_cooldown: f64,
    /// Entry acceptance: dot(offset from portal, velocity) must stay below
    /// this, i.e. the object moves into the plane rather than grazing it.
    pub entry_dot_tolerance: f32,
    /// Exit positions are nudged this far along the exit normal so the body
    /// does not land inside the exit sensor.
    pub exit_safety_offset: f32,
    /// Portal creation drags shorter than this many pixels are cancelled.
    pub min_portal_drag_px: f32,

    /// Drag spring: force ceiling per unit mass, oscillation frequency and
    /// damping ratio of the pointer spring.
    pub drag_max_force: f32,
    pub drag_frequency_hz: f32,
    pub drag_damping_ratio: f32,
    /// Release impulse per unit mass per unit pointer velocity.
    pub throw_factor: f32,
    /// Release impulses below this magnitude are dropped.
    pub throw_dead_zone: f32,

    /// Half thickness of the static boundary walls.
    pub wall_thickness: f32,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            screen_width: 1280.0,
            screen_height: 720.0,
            pixels_per_meter: 20.0,
            fixed_dt: 1.0 / 60.0,
            max_steps_per_frame: 5,
            gravity: [0.0, -9.8],
            circle_radius: 0.8,
            box_half_extents: [0.8, 0.8],
            triangle_side: 1.6,
            density: 1.0,
            friction: 0.3,
            restitution: 0.3,
            portal_width: 0.5,
            portal_height: 3.0,
            portal_cooldown: 5.0,
            entry_dot_tolerance: 0.1,
            exit_safety_offset: 0.05,
            min_portal_drag_px: 20.0,
            drag_max_force: 1000.0,
            drag_frequency_hz: 5.0,
            drag_damping_ratio: 0.7,
            throw_factor: 0.1,
            throw_dead_zone: 0.1,
            wall_thickness: 0.1,
        }
    }
}

impl SandboxConfig {
    /// Parse a (possibly partial) JSON override on top of the defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::from)
    }

    /// Playfield size in simulation meters.
    pub fn world_extent(&self) -> (f32, f32) {
        (
            self.screen_width / self.pixels_per_meter,
            self.screen_height / self.pixels_per_meter,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_setup() {
        let cfg = SandboxConfig::default();
        assert_eq!(cfg.pixels_per_meter, 20.0);
        assert_eq!(cfg.fixed_dt, 1.0 / 60.0);
        assert_eq!(cfg.gravity, [0.0, -9.8]);
        assert_eq!(cfg.portal_cooldown, 5.0);
        assert_eq!(cfg.world_extent(), (64.0, 36.0));
    }

    #[test]
    fn partial_json_override() {
        let cfg = SandboxConfig::from_json(r#"{ "pixels_per_meter": 40.0 }"#).unwrap();
        assert_eq!(cfg.pixels_per_meter, 40.0);
        // untouched fields keep their defaults
        assert_eq!(cfg.screen_width, 1280.0);
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(SandboxConfig::from_json("not json").is_err());
    }
}

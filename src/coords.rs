// src/coords.rs
//! Conversions between presentation space (pixels, Y-down, `glam::Vec2`)
//! and simulation space (meters, Y-up, `nalgebra::Vector2`).
//!
//! The two `to_*` families are exact inverses modulo float rounding. The
//! vertical axis flips for positions and velocities; angles are represented
//! in simulation space and never axis-flipped here.

use glam::Vec2;
use nalgebra::Vector2;

#[derive(Debug, Clone, Copy)]
pub struct ScreenMapper {
    pixels_per_meter: f32,
    screen_height: f32,
}

impl ScreenMapper {
    pub fn new(pixels_per_meter: f32, screen_height: f32) -> Self {
        Self {
            pixels_per_meter,
            screen_height,
        }
    }

    /// Screen point (pixels) to simulation point (meters).
    #[inline]
    pub fn to_sim(&self, screen: Vec2) -> Vector2<f32> {
        Vector2::new(
            screen.x / self.pixels_per_meter,
            (self.screen_height - screen.y) / self.pixels_per_meter,
        )
    }

    /// Simulation point (meters) to screen point (pixels).
    #[inline]
    pub fn to_screen(&self, sim: Vector2<f32>) -> Vec2 {
        Vec2::new(
            sim.x * self.pixels_per_meter,
            self.screen_height - sim.y * self.pixels_per_meter,
        )
    }

    /// Screen-space displacement or velocity to simulation space. No origin
    /// shift, only scale and the Y flip.
    #[inline]
    pub fn vector_to_sim(&self, screen: Vec2) -> Vector2<f32> {
        Vector2::new(
            screen.x / self.pixels_per_meter,
            -screen.y / self.pixels_per_meter,
        )
    }

    /// Simulation-space displacement or velocity to screen space.
    #[inline]
    pub fn vector_to_screen(&self, sim: Vector2<f32>) -> Vec2 {
        Vec2::new(
            sim.x * self.pixels_per_meter,
            -sim.y * self.pixels_per_meter,
        )
    }

    /// Length in pixels to meters.
    #[inline]
    pub fn scalar_to_sim(&self, pixels: f32) -> f32 {
        pixels / self.pixels_per_meter
    }

    /// Length in meters to pixels.
    #[inline]
    pub fn scalar_to_screen(&self, meters: f32) -> f32 {
        meters * self.pixels_per_meter
    }
}

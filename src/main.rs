// src/main.rs
//! Headless sandbox demo: seeds the scene, creates a portal pair, drags and
//! throws an object, then runs the simulation for a few seconds while
//! logging HUD-style state lines.

use anyhow::{Context, Result};
use glam::Vec2;
use log::info;
use rand::Rng;

use portals2d::{Sandbox, SandboxConfig, ShapeKind};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = SandboxConfig::default();
    let fixed_dt = cfg.fixed_dt;
    let (width, height) = (cfg.screen_width, cfg.screen_height);
    let mut sandbox = Sandbox::new(cfg.clone());

    // seed scene: one box, two circles, plus a scattered handful
    sandbox
        .spawn_object(ShapeKind::boxed(&cfg), Vec2::new(width * 0.5, height * 0.3))
        .context("seeding box")?;
    sandbox
        .spawn_object(ShapeKind::circle(&cfg), Vec2::new(width * 0.6, height * 0.5))
        .context("seeding circle")?;
    sandbox
        .spawn_object(ShapeKind::circle(&cfg), Vec2::new(width * 0.4, height * 0.5))
        .context("seeding circle")?;

    let mut rng = rand::thread_rng();
    for _ in 0..4 {
        let at = Vec2::new(
            rng.gen_range(width * 0.2..width * 0.8),
            rng.gen_range(height * 0.2..height * 0.6),
        );
        let kind = match rng.gen_range(0..3) {
            0 => ShapeKind::boxed(&cfg),
            1 => ShapeKind::circle(&cfg),
            _ => ShapeKind::triangle(&cfg),
        };
        let _ = sandbox.spawn_object(kind, at);
    }

    // a portal pair across the lower half of the field
    sandbox.begin_portal_creation(Vec2::new(width * 0.2, height * 0.7), 0.0);
    match sandbox.finish_portal_creation(Vec2::new(width * 0.8, height * 0.7)) {
        Some(pair) => info!("portal pair {pair:?} ready"),
        None => info!("portal creation cancelled"),
    }

    info!(
        "scene ready: {} objects, {} portals, gravity {}",
        sandbox.object_count(),
        sandbox.portal_count(),
        if sandbox.gravity_enabled() { "on" } else { "off" }
    );

    // scripted drag: grab whatever sits at the first seed point, pull it
    // sideways for a second, then throw it
    let grab_at = Vec2::new(width * 0.5, height * 0.3);
    let dragged = sandbox.start_drag_at(grab_at).ok();
    if let Some(id) = dragged {
        info!("dragging {id:?}");
    }

    let total_frames = 600;
    for frame in 0..total_frames {
        if dragged.is_some() {
            if frame < 60 {
                let t = frame as f32 / 60.0;
                let target = grab_at + Vec2::new(200.0 * t, -100.0 * t);
                sandbox.update_drag(target);
            } else if frame == 60 {
                sandbox.stop_drag(true, Vec2::new(600.0, -300.0));
                info!("thrown");
            }
        }

        sandbox.update(fixed_dt);

        if frame % 60 == 0 {
            info!(
                "t={:>5.2}s objects={} portals={} queue={}",
                sandbox.sim_time(),
                sandbox.object_count(),
                sandbox.portal_count(),
                sandbox.teleport_queue_len(),
            );
        }
    }

    info!("done after {:.2}s simulated", sandbox.sim_time());
    Ok(())
}

// src/stepper.rs
//! Fixed-timestep accumulation and the per-frame phase machine.
//!
//! Rendering runs at whatever rate the host gives us; the simulation always
//! advances in whole fixed steps. When real time runs ahead, several steps
//! run back to back up to a catch-up cap that keeps a slow frame from
//! snowballing.

/// Where the frame driver currently is. `Stepping` covers the rigid-body
/// integration, `PostProcessing` the teleport drain and bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    Idle,
    Stepping,
    PostProcessing,
}

#[derive(Debug)]
pub struct FixedStepper {
    accumulator: f32,
    fixed_dt: f32,
    max_steps: u32,
    // prevent spiral of death on long stalls (tab-out, debugger)
    max_frame_delta: f32,
}

impl FixedStepper {
    pub fn new(fixed_dt: f32, max_steps: u32) -> Self {
        Self {
            accumulator: 0.0,
            fixed_dt,
            max_steps,
            max_frame_delta: 0.25,
        }
    }

    /// Feed a real frame delta, get back how many fixed steps to run now.
    /// Time beyond the catch-up cap is dropped, not banked.
    pub fn advance(&mut self, real_dt: f32) -> u32 {
        self.accumulator += real_dt.clamp(0.0, self.max_frame_delta);
        let mut steps = 0;
        while self.accumulator >= self.fixed_dt && steps < self.max_steps {
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }
        if steps == self.max_steps && self.accumulator >= self.fixed_dt {
            self.accumulator = 0.0;
        }
        steps
    }

    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_partial_frames() {
        let mut s = FixedStepper::new(1.0 / 60.0, 5);
        assert_eq!(s.advance(1.0 / 120.0), 0);
        assert_eq!(s.advance(1.0 / 120.0), 1);
    }

    #[test]
    fn one_step_per_exact_frame() {
        let mut s = FixedStepper::new(1.0 / 60.0, 5);
        let mut total = 0;
        for _ in 0..10 {
            total += s.advance(1.0 / 60.0);
        }
        assert!((9..=10).contains(&total));
    }

    #[test]
    fn catch_up_is_capped_and_excess_dropped() {
        let mut s = FixedStepper::new(1.0 / 60.0, 5);
        // a 10s stall clamps to 0.25s, caps at 5 steps, banks nothing
        assert_eq!(s.advance(10.0), 5);
        assert_eq!(s.advance(0.0), 0);
    }
}

//! smoother.rs
//! Frame-rate independent orientation smoothing.
//!
//! `lerp_rate` is calibrated as "fraction of the gap closed per 1/60 s tick". The
//! per-tick blend is rescaled to the actual elapsed time:
//! `alpha = 1 - (1 - lerp_rate)^(dt * 60)`, so the effective half-life does not
//! depend on the consumer's tick rate.

use glam::Quat;

/// Tick rate `lerp_rate` is calibrated against.
pub const REFERENCE_HZ: f32 = 60.0;

/// Blend factor for one tick of `dt_seconds`.
#[inline]
pub fn blend_factor(lerp_rate: f32, dt_seconds: f32) -> f32 {
    let rate = lerp_rate.clamp(0.0, 1.0);
    let dt = dt_seconds.max(0.0);
    1.0 - (1.0 - rate).powf(dt * REFERENCE_HZ)
}

/// Last emitted orientation for one consumer target.
#[derive(Debug, Clone, Copy, Default)]
pub struct Smoother {
    current: Option<Quat>,
}

impl Smoother {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Quat> {
        self.current
    }

    /// Forget the emitted orientation; the next step seeds from its target.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Advances toward `target` and returns the new emitted orientation.
    pub fn step(&mut self, target: Quat, dt_seconds: f32, lerp_rate: f32) -> Quat {
        let next = match self.current {
            // First value is taken as-is; no animating in from an undefined seed.
            None => target,
            // NaN would poison every later step; treat it like an unsmoothed rate.
            Some(_) if lerp_rate >= 1.0 || lerp_rate.is_nan() => target,
            Some(current) if lerp_rate <= 0.0 => current,
            Some(current) => {
                let alpha = blend_factor(lerp_rate, dt_seconds);
                if alpha <= 0.0 {
                    current
                } else if alpha >= 1.0 {
                    target
                } else {
                    current.slerp(target, alpha)
                }
            }
        };
        self.current = Some(next);
        next
    }
}

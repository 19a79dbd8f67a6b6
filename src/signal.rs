use crate::{
    core::{Viewport, clamp01},
    error::{MotionError, MotionResult},
};

/// Scroll range during which a pinned container drives internal animation:
/// `start` offset plus a distance, both in CSS pixels. Distances are usually
/// expressed as a multiple of the viewport height (the hero pins for "300%").
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PinnedRange {
    pub start: f64,
    pub distance: f64,
}

impl PinnedRange {
    pub fn new(start: f64, distance: f64) -> MotionResult<Self> {
        if !(distance > 0.0) {
            return Err(MotionError::validation("pinned distance must be > 0"));
        }
        Ok(Self { start, distance })
    }

    pub fn of_viewport(start: f64, heights: f64, viewport: Viewport) -> MotionResult<Self> {
        Self::new(start, heights * viewport.height)
    }

    /// Progress through the range for an absolute scroll offset, clamped to
    /// [0, 1].
    pub fn progress(&self, scroll_y: f64) -> f64 {
        clamp01((scroll_y - self.start) / self.distance)
    }
}

/// Raw scroll velocity (CSS px/s) from timestamped scroll samples. Scroll
/// events stop arriving the instant the page stops moving, so the tracker
/// also watches elapsed frame time and reads as zero once no sample has
/// landed within [`VelocityTracker::SETTLE_AFTER_SECS`].
#[derive(Clone, Copy, Debug, Default)]
pub struct VelocityTracker {
    last: Option<(f64, f64)>,
    velocity: f64,
    idle_secs: f64,
}

impl VelocityTracker {
    /// Frames without a scroll sample before the velocity reads as zero.
    pub const SETTLE_AFTER_SECS: f64 = 0.1;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, at_secs: f64, scroll_y: f64) {
        if let Some((t0, y0)) = self.last {
            let dt = at_secs - t0;
            if dt > 0.0 {
                self.velocity = (scroll_y - y0) / dt;
            }
        }
        self.last = Some((at_secs, scroll_y));
        self.idle_secs = 0.0;
    }

    /// Advances frame time with no accompanying scroll sample.
    pub fn advance(&mut self, dt: f64) {
        self.idle_secs += dt.max(0.0);
        if self.idle_secs >= Self::SETTLE_AFTER_SECS {
            self.velocity = 0.0;
        }
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Scroll has stopped producing events; drop to rest immediately.
    pub fn settle(&mut self) {
        self.velocity = 0.0;
        self.idle_secs = Self::SETTLE_AFTER_SECS;
    }
}

/// Damped spring used as the scroll-velocity low-pass. Semi-implicit Euler,
/// substepped so large frame deltas stay stable.
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    pub stiffness: f64,
    pub damping: f64,
    value: f64,
    velocity: f64,
}

impl Spring {
    const MAX_STEP: f64 = 1.0 / 240.0;

    pub fn new(stiffness: f64, damping: f64) -> MotionResult<Self> {
        if !(stiffness > 0.0) || !(damping > 0.0) {
            return Err(MotionError::validation(
                "spring stiffness and damping must be > 0",
            ));
        }
        Ok(Self {
            stiffness,
            damping,
            value: 0.0,
            velocity: 0.0,
        })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn snap_to(&mut self, value: f64) {
        self.value = value;
        self.velocity = 0.0;
    }

    pub fn tick(&mut self, target: f64, dt: f64) -> f64 {
        let mut remaining = dt.max(0.0);
        while remaining > 0.0 {
            let step = remaining.min(Self::MAX_STEP);
            let accel = self.stiffness * (target - self.value) - self.damping * self.velocity;
            self.velocity += accel * step;
            self.value += self.velocity * step;
            remaining -= step;
        }
        self.value
    }
}

/// Viewport class used to damp the velocity response. Narrow/touch viewports
/// get heavier smoothing, lower sensitivity and debounced direction flips so
/// momentum scrolling does not jitter the marquees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionProfile {
    #[default]
    Desktop,
    Mobile,
}

impl MotionProfile {
    pub fn for_viewport(viewport: Viewport) -> Self {
        if viewport.width <= 768.0 {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    pub fn spring_damping(self) -> f64 {
        match self {
            Self::Desktop => 50.0,
            Self::Mobile => 80.0,
        }
    }

    pub fn spring_stiffness(self) -> f64 {
        match self {
            Self::Desktop => 400.0,
            Self::Mobile => 300.0,
        }
    }

    pub fn sensitivity(self) -> f64 {
        match self {
            Self::Desktop => 1.0,
            Self::Mobile => 0.7,
        }
    }

    pub fn flip_threshold(self) -> f64 {
        match self {
            Self::Desktop => 0.1,
            Self::Mobile => 0.05,
        }
    }

    pub fn flip_debounce_secs(self) -> f64 {
        match self {
            Self::Desktop => 0.0,
            Self::Mobile => 0.1,
        }
    }

    pub fn base_speed_scale(self) -> f64 {
        match self {
            Self::Desktop => 1.0,
            Self::Mobile => 0.7,
        }
    }

    pub fn move_smoothing(self) -> f64 {
        match self {
            Self::Desktop => 1.0,
            Self::Mobile => 0.8,
        }
    }
}

/// Smoothed, bounded velocity factor derived from scroll samples. The factor
/// is `sign * min(5, |v| / 1000 * 5 * sensitivity)`.
#[derive(Clone, Copy, Debug)]
pub struct ScrollVelocitySignal {
    tracker: VelocityTracker,
    spring: Spring,
    profile: MotionProfile,
}

pub const MAX_VELOCITY_FACTOR: f64 = 5.0;

impl ScrollVelocitySignal {
    pub fn new(profile: MotionProfile) -> Self {
        // Profile constants are positive; construction cannot fail.
        let spring = Spring::new(profile.spring_stiffness(), profile.spring_damping())
            .unwrap_or(Spring {
                stiffness: 400.0,
                damping: 50.0,
                value: 0.0,
                velocity: 0.0,
            });
        Self {
            tracker: VelocityTracker::new(),
            spring,
            profile,
        }
    }

    pub fn profile(&self) -> MotionProfile {
        self.profile
    }

    pub fn observe(&mut self, at_secs: f64, scroll_y: f64) {
        self.tracker.sample(at_secs, scroll_y);
    }

    /// Advances the smoother and returns the current velocity factor.
    pub fn tick(&mut self, dt: f64) -> f64 {
        self.tracker.advance(dt);
        let smoothed = self.spring.tick(self.tracker.velocity(), dt);
        let sign = if smoothed < 0.0 { -1.0 } else { 1.0 };
        let magnitude = (smoothed.abs() / 1000.0 * MAX_VELOCITY_FACTOR
            * self.profile.sensitivity())
        .min(MAX_VELOCITY_FACTOR);
        sign * magnitude
    }

    /// Marks the scroll position as settled (no further motion).
    pub fn settle(&mut self) {
        self.tracker.settle();
    }
}

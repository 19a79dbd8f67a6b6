use crate::error::{MotionError, MotionResult};

/// Assets warmed while the splash is covering the page.
pub const PRELOAD_URLS: [&str; 4] = [
    "/images/keychain4.jpg",
    "/images/collection.jpg",
    "/images/collection2.jpg",
    "/logo.png",
];

/// Intro splash overlay: fully opaque for a hold interval, then a linear fade
/// to transparent. Page scrolling stays locked until the fade completes.
#[derive(Clone, Copy, Debug)]
pub struct SplashTimeline {
    hold_secs: f64,
    fade_secs: f64,
    elapsed: f64,
}

impl Default for SplashTimeline {
    fn default() -> Self {
        Self {
            hold_secs: 2.5,
            fade_secs: 0.8,
            elapsed: 0.0,
        }
    }
}

impl SplashTimeline {
    pub fn new(hold_secs: f64, fade_secs: f64) -> MotionResult<Self> {
        if !(hold_secs >= 0.0) || !(fade_secs > 0.0) {
            return Err(MotionError::validation(
                "splash hold must be >= 0 and fade > 0",
            ));
        }
        Ok(Self {
            hold_secs,
            fade_secs,
            elapsed: 0.0,
        })
    }

    pub fn tick(&mut self, dt: f64) {
        self.elapsed += dt.max(0.0);
    }

    /// Overlay opacity in [0, 1].
    pub fn opacity(&self) -> f64 {
        if self.elapsed <= self.hold_secs {
            1.0
        } else {
            (1.0 - (self.elapsed - self.hold_secs) / self.fade_secs).max(0.0)
        }
    }

    pub fn is_done(&self) -> bool {
        self.elapsed >= self.hold_secs + self.fade_secs
    }

    /// The page cannot scroll while the overlay is still showing.
    pub fn scroll_locked(&self) -> bool {
        !self.is_done()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_fully_opaque_then_fades_linearly() {
        let mut s = SplashTimeline::default();
        assert_eq!(s.opacity(), 1.0);
        s.tick(2.5);
        assert_eq!(s.opacity(), 1.0);
        s.tick(0.4);
        assert!((s.opacity() - 0.5).abs() < 1e-9);
        // Summed ticks land within float error of the end of the fade.
        s.tick(0.4);
        assert!(s.opacity() < 1e-9);
        s.tick(0.01);
        assert_eq!(s.opacity(), 0.0);
        assert!(s.is_done());
    }

    #[test]
    fn scroll_unlocks_exactly_when_done() {
        let mut s = SplashTimeline::default();
        s.tick(3.2);
        assert!(s.scroll_locked());
        s.tick(0.1);
        assert!(!s.scroll_locked());
    }

    #[test]
    fn rejects_nonpositive_fade() {
        assert!(SplashTimeline::new(1.0, 0.0).is_err());
        assert!(SplashTimeline::new(0.0, 0.5).is_ok());
    }
}

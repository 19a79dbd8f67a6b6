use crate::{
    core::wrap,
    error::{MotionError, MotionResult},
    signal::{MAX_VELOCITY_FACTOR, MotionProfile, ScrollVelocitySignal},
};

/// Base travel direction of a marquee row. The scroll-velocity factor can
/// temporarily reverse it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarqueeDirection {
    #[default]
    Left,
    Right,
}

impl MarqueeDirection {
    fn sign(self) -> f64 {
        match self {
            Self::Left => 1.0,
            Self::Right => -1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct MarqueeRowConfig {
    /// Base speed in percent of one content copy's width per second.
    pub base_velocity: f64,
    pub direction: MarqueeDirection,
}

impl Default for MarqueeRowConfig {
    fn default() -> Self {
        Self {
            base_velocity: 5.0,
            direction: MarqueeDirection::Left,
        }
    }
}

/// One endlessly repeating text band. Holds a wrapped travel offset in content
/// units; the host renders `copies` repetitions translated by
/// [`MarqueeRow::translation`].
#[derive(Clone, Copy, Debug)]
pub struct MarqueeRow {
    config: MarqueeRowConfig,
    profile: MotionProfile,
    unit_width: f64,
    copies: usize,
    travel: f64,
    velocity_sign: f64,
    pending_sign: Option<(f64, f64)>,
    in_view: bool,
    page_visible: bool,
    reduced_motion: bool,
}

impl MarqueeRow {
    pub fn new(config: MarqueeRowConfig, profile: MotionProfile) -> MotionResult<Self> {
        if !(config.base_velocity > 0.0) {
            return Err(MotionError::validation("marquee base velocity must be > 0"));
        }
        Ok(Self {
            config,
            profile,
            unit_width: 0.0,
            copies: 1,
            travel: 0.0,
            velocity_sign: 1.0,
            pending_sign: None,
            in_view: true,
            page_visible: true,
            reduced_motion: false,
        })
    }

    /// Measured widths of the container and of one content copy, in CSS
    /// pixels. Enough copies are kept that the band never shows a gap while
    /// translated by up to one unit.
    pub fn set_measurements(&mut self, container_width: f64, unit_width: f64) {
        self.unit_width = unit_width.max(0.0);
        self.copies = if self.unit_width > 0.0 {
            ((container_width / self.unit_width).ceil() as usize + 2).max(3)
        } else {
            1
        };
        self.travel = wrap_travel(self.travel, self.unit_width);
    }

    pub fn set_in_view(&mut self, in_view: bool) {
        self.in_view = in_view;
    }

    pub fn set_page_visible(&mut self, visible: bool) {
        self.page_visible = visible;
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) {
        self.reduced_motion = reduced;
    }

    pub fn copies(&self) -> usize {
        self.copies
    }

    /// Wrapped travel offset in `[0, unit_width)`.
    pub fn offset(&self) -> f64 {
        self.travel
    }

    /// CSS translation to apply to the copy strip.
    pub fn translation(&self) -> f64 {
        -self.travel
    }

    /// Advances the band by one frame under the current velocity factor.
    /// Off-screen or hidden-page rows do not move at all.
    pub fn tick(&mut self, dt: f64, velocity_factor: f64) {
        if !self.in_view || !self.page_visible || self.unit_width <= 0.0 || dt <= 0.0 {
            return;
        }
        self.update_sign(velocity_factor, dt);

        let boost = if self.reduced_motion {
            1.0
        } else {
            1.0 + velocity_factor.abs().min(MAX_VELOCITY_FACTOR)
        };
        let pct_per_sec = self.config.base_velocity
            * self.profile.base_speed_scale()
            * self.profile.move_smoothing();
        let delta = self.config.direction.sign()
            * self.velocity_sign
            * pct_per_sec
            / 100.0
            * self.unit_width
            * boost
            * dt;
        self.travel = wrap_travel(self.travel + delta, self.unit_width);
    }

    /// Scroll direction flips reverse the band, after the profile's threshold
    /// and (on mobile) a debounce window so momentum jitter does not make the
    /// text stutter back and forth.
    fn update_sign(&mut self, factor: f64, dt: f64) {
        if self.reduced_motion {
            return;
        }
        let threshold = self.profile.flip_threshold();
        let desired = if factor > threshold {
            1.0
        } else if factor < -threshold {
            -1.0
        } else {
            self.pending_sign = None;
            return;
        };
        if desired == self.velocity_sign {
            self.pending_sign = None;
            return;
        }
        let debounce = self.profile.flip_debounce_secs();
        if debounce <= 0.0 {
            self.velocity_sign = desired;
            return;
        }
        match self.pending_sign {
            Some((sign, held)) if sign == desired => {
                let held = held + dt;
                if held >= debounce {
                    self.velocity_sign = desired;
                    self.pending_sign = None;
                } else {
                    self.pending_sign = Some((sign, held));
                }
            }
            _ => self.pending_sign = Some((desired, dt)),
        }
    }
}

fn wrap_travel(travel: f64, unit_width: f64) -> f64 {
    if unit_width > 0.0 {
        wrap(0.0, unit_width, travel)
    } else {
        0.0
    }
}

/// A stack of marquee rows driven by one shared scroll-velocity signal.
#[derive(Clone, Debug)]
pub struct VelocityMarquee {
    signal: ScrollVelocitySignal,
    rows: Vec<MarqueeRow>,
    factor: f64,
}

impl VelocityMarquee {
    pub fn new(profile: MotionProfile, configs: &[MarqueeRowConfig]) -> MotionResult<Self> {
        let rows = configs
            .iter()
            .map(|&c| MarqueeRow::new(c, profile))
            .collect::<MotionResult<Vec<_>>>()?;
        Ok(Self {
            signal: ScrollVelocitySignal::new(profile),
            rows,
            factor: 0.0,
        })
    }

    pub fn rows(&self) -> &[MarqueeRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [MarqueeRow] {
        &mut self.rows
    }

    /// Last computed velocity factor, for display/debugging.
    pub fn velocity_factor(&self) -> f64 {
        self.factor
    }

    pub fn observe_scroll(&mut self, at_secs: f64, scroll_y: f64) {
        self.signal.observe(at_secs, scroll_y);
    }

    /// Scroll events stopped arriving; the factor decays back toward zero.
    pub fn settle(&mut self) {
        self.signal.settle();
    }

    pub fn set_page_visible(&mut self, visible: bool) {
        for row in &mut self.rows {
            row.set_page_visible(visible);
        }
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) {
        for row in &mut self.rows {
            row.set_reduced_motion(reduced);
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn tick(&mut self, dt: f64) {
        self.factor = self.signal.tick(dt);
        for row in &mut self.rows {
            row.tick(dt, self.factor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(profile: MotionProfile) -> MarqueeRow {
        let mut r = MarqueeRow::new(MarqueeRowConfig::default(), profile).unwrap();
        r.set_measurements(1200.0, 400.0);
        r
    }

    #[test]
    fn copies_cover_container_plus_slack() {
        let mut r = row(MotionProfile::Desktop);
        assert_eq!(r.copies(), 5);
        r.set_measurements(300.0, 400.0);
        assert_eq!(r.copies(), 3);
        r.set_measurements(300.0, 0.0);
        assert_eq!(r.copies(), 1);
    }

    #[test]
    fn offset_stays_wrapped_under_long_run() {
        let mut r = row(MotionProfile::Desktop);
        for _ in 0..100_000 {
            r.tick(1.0 / 60.0, 0.0);
            assert!((0.0..400.0).contains(&r.offset()), "offset {}", r.offset());
        }
        assert_eq!(r.translation(), -r.offset());
    }

    #[test]
    fn base_speed_is_percent_of_unit_width() {
        let mut r = row(MotionProfile::Desktop);
        // 5 %/s of 400px for one second.
        for _ in 0..60 {
            r.tick(1.0 / 60.0, 0.0);
        }
        assert!((r.offset() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn velocity_factor_boosts_speed() {
        let mut slow = row(MotionProfile::Desktop);
        let mut fast = row(MotionProfile::Desktop);
        slow.tick(0.1, 0.0);
        fast.tick(0.1, 5.0);
        assert!((fast.offset() / slow.offset() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn hidden_or_offscreen_rows_do_not_move() {
        let mut r = row(MotionProfile::Desktop);
        r.set_in_view(false);
        r.tick(1.0, 0.0);
        assert_eq!(r.offset(), 0.0);

        r.set_in_view(true);
        r.set_page_visible(false);
        r.tick(1.0, 0.0);
        assert_eq!(r.offset(), 0.0);

        r.set_page_visible(true);
        r.tick(1.0, 0.0);
        assert!(r.offset() > 0.0);
    }

    #[test]
    fn desktop_flips_immediately_past_threshold() {
        let mut r = row(MotionProfile::Desktop);
        for _ in 0..10 {
            r.tick(0.1, 0.0);
        }
        let forward = r.offset();
        r.tick(0.1, -0.5);
        assert!(r.offset() < forward, "did not reverse");
    }

    #[test]
    fn sub_threshold_factor_keeps_direction() {
        let mut r = row(MotionProfile::Desktop);
        r.tick(0.1, -0.05);
        assert!(r.offset() > 0.0);
    }

    #[test]
    fn mobile_flip_is_debounced() {
        let mut r = row(MotionProfile::Mobile);
        // One 50ms frame of reverse scrolling is below the 100ms debounce.
        r.tick(0.05, -1.0);
        assert!(r.offset() > 0.0 && r.offset() < 10.0, "flipped too early");
        // Sustained reverse crosses the debounce, flips, and backward travel
        // wraps into the top of the range.
        r.tick(0.08, -1.0);
        r.tick(0.08, -1.0);
        assert!(r.offset() > 300.0, "never flipped: {}", r.offset());
    }

    #[test]
    fn reduced_motion_ignores_velocity() {
        let mut r = row(MotionProfile::Desktop);
        r.set_reduced_motion(true);
        let mut plain = row(MotionProfile::Desktop);
        r.tick(0.1, 5.0);
        plain.tick(0.1, 0.0);
        assert_eq!(r.offset(), plain.offset());
    }

    #[test]
    fn container_drives_all_rows_from_one_signal() {
        let configs = [
            MarqueeRowConfig::default(),
            MarqueeRowConfig {
                direction: MarqueeDirection::Right,
                ..MarqueeRowConfig::default()
            },
        ];
        let mut m = VelocityMarquee::new(MotionProfile::Desktop, &configs).unwrap();
        for row in m.rows_mut() {
            row.set_measurements(1200.0, 400.0);
        }
        m.observe_scroll(0.0, 0.0);
        m.observe_scroll(0.016, 50.0);
        for _ in 0..30 {
            m.tick(1.0 / 60.0);
        }
        assert!(m.velocity_factor() > 0.0);
        let a = m.rows()[0].offset();
        let b = m.rows()[1].offset();
        assert!(a > 0.0);
        // Opposite base direction wraps in from the top of the range.
        assert!(b > 200.0, "row b offset {b}");
    }
}

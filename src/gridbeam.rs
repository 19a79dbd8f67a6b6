use kurbo::{Point, Vec2};

use crate::{
    core::{Rgba8, SplitMix64, SurfaceSize},
    error::MotionResult,
    surface::{Blend, PixelSurface},
};

/// Frame deltas are clamped so a long-suspended tab cannot teleport beams.
const MAX_TICK_SECS: f64 = 0.06;

/// Minimum measured container size; layout can report zero mid-mount.
const MIN_WIDTH: u32 = 320;
const MIN_HEIGHT: u32 = 240;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Vertical,
    Horizontal,
}

/// Grid overlay styling. Lines sit on a fixed pixel pitch and are
/// alpha-feathered along their own length so they never hard-stop at the
/// surface edge; a sparser subset is redrawn brighter as accents.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct GridStyle {
    pub pitch: f64,
    pub line: Rgba8,
    pub line_width: f64,
    pub accent: Rgba8,
    pub accent_width: f64,
    pub accent_every: usize,
    /// Horizontal lines within this many pixels of the bottom edge are
    /// skipped entirely so the grid never collides with page footers.
    pub bottom_margin: f64,
    pub feather: (f64, f64),
}

impl Default for GridStyle {
    fn default() -> Self {
        Self {
            pitch: 120.0,
            line: Rgba8::new(120, 140, 180, 64),
            line_width: 1.0,
            accent: Rgba8::new(200, 220, 255, 31),
            accent_width: 1.2,
            accent_every: 3,
            bottom_margin: 150.0,
            feather: (0.15, 0.85),
        }
    }
}

/// The grid lattice for a surface size, with overscan so beams can enter from
/// off-canvas. Derived per frame, never stored.
pub fn lattice(size: SurfaceSize, pitch: f64) -> (Vec<f64>, Vec<f64>) {
    let cols = (f64::from(size.width) / pitch).ceil() as i64 + 6;
    let rows = (f64::from(size.height) / pitch).ceil() as i64 + 6;
    let xs = (-3..=cols).map(|i| i as f64 * pitch).collect();
    let ys = (0..=rows).map(|i| i as f64 * pitch).collect();
    (xs, ys)
}

/// Short-lived glowing particle traveling along a grid line. Velocity is
/// strictly axis-aligned.
#[derive(Clone, Copy, Debug)]
pub struct Beam {
    pub pos: Point,
    pub vel: Vec2,
    pub color: Rgba8,
    pub width: f64,
    pub age: f64,
}

impl Beam {
    pub fn axis(&self) -> Axis {
        if self.vel.x.abs() > 0.1 {
            Axis::Horizontal
        } else {
            Axis::Vertical
        }
    }
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct BeamSettings {
    /// Per-tick spawn probability at density 1.0.
    pub spawn_chance: f64,
    /// Spawn-rate multiplier in [0, 1]; 0 disables spawning entirely.
    pub density: f64,
    pub cap: usize,
    /// Fade-out window; alpha is `1 - age / fade_secs`.
    pub fade_secs: f64,
    /// Hard retirement age.
    pub life_secs: f64,
    /// Beams further than this outside the surface are retired.
    pub bounds_margin: f64,
    pub vertical_speed: (f64, f64),
    pub horizontal_speed: (f64, f64),
    pub width_range: (f64, f64),
}

impl Default for BeamSettings {
    fn default() -> Self {
        Self {
            spawn_chance: 0.02,
            density: 1.0,
            cap: 6,
            fade_secs: 2.6,
            life_secs: 3.0,
            bounds_margin: 150.0,
            vertical_speed: (60.0, 200.0),
            horizontal_speed: (80.0, 240.0),
            width_range: (0.6, 2.2),
        }
    }
}

/// Bounded collection of beams plus the seeded random stream that drives
/// spawning. Everything is replayable for a given seed.
#[derive(Clone, Debug)]
pub struct BeamField {
    beams: Vec<Beam>,
    rng: SplitMix64,
    settings: BeamSettings,
    color: Rgba8,
    pitch: f64,
}

impl BeamField {
    pub fn new(seed: u64, settings: BeamSettings, color: Rgba8, pitch: f64) -> Self {
        Self {
            beams: Vec::new(),
            rng: SplitMix64::new(seed),
            settings,
            color,
            pitch,
        }
    }

    pub fn beams(&self) -> &[Beam] {
        &self.beams
    }

    pub fn len(&self) -> usize {
        self.beams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beams.is_empty()
    }

    /// Rolls the per-tick spawn chance (scaled by density) and trims the
    /// collection back to the cap, dropping oldest first.
    pub fn maybe_spawn(&mut self, size: SurfaceSize) {
        let p = self.settings.spawn_chance * self.settings.density.clamp(0.0, 1.0);
        if p > 0.0 && self.rng.chance(p) {
            self.spawn(size);
        }
    }

    /// Spawns one beam on a random grid line, entering from one of its two
    /// off-canvas ends.
    pub fn spawn(&mut self, size: SurfaceSize) {
        if self.settings.density <= 0.0 {
            return;
        }
        let (xs, ys) = lattice(size, self.pitch);
        let w = f64::from(size.width);
        let h = f64::from(size.height);
        let width = self
            .rng
            .range_f64(self.settings.width_range.0, self.settings.width_range.1);

        let beam = if self.rng.chance(0.5) {
            let x = xs[self.rng.pick_index(xs.len())];
            let from_top = self.rng.chance(0.5);
            let speed = self
                .rng
                .range_f64(self.settings.vertical_speed.0, self.settings.vertical_speed.1);
            Beam {
                pos: Point::new(x, if from_top { -40.0 } else { h + 40.0 }),
                vel: Vec2::new(0.0, if from_top { speed } else { -speed }),
                color: self.color,
                width,
                age: 0.0,
            }
        } else {
            let y = ys[self.rng.pick_index(ys.len())];
            let from_left = self.rng.chance(0.5);
            let speed = self.rng.range_f64(
                self.settings.horizontal_speed.0,
                self.settings.horizontal_speed.1,
            );
            Beam {
                pos: Point::new(if from_left { -60.0 } else { w + 60.0 }, y),
                vel: Vec2::new(if from_left { speed } else { -speed }, 0.0),
                color: self.color,
                width,
                age: 0.0,
            }
        };
        self.beams.push(beam);

        if self.beams.len() > self.settings.cap {
            let excess = self.beams.len() - self.settings.cap;
            self.beams.drain(0..excess);
        }
    }

    /// Advances positions and ages by `dt` seconds and retires beams that
    /// aged out or left the bounds (plus margin).
    pub fn advance(&mut self, dt: f64, size: SurfaceSize) {
        let w = f64::from(size.width);
        let h = f64::from(size.height);
        let margin = self.settings.bounds_margin;
        let life = self.settings.life_secs;
        for b in &mut self.beams {
            b.age += dt;
            b.pos += b.vel * dt;
        }
        self.beams.retain(|b| {
            b.age < life
                && b.pos.x > -margin
                && b.pos.x < w + margin
                && b.pos.y > -margin
                && b.pos.y < h + margin
        });
    }

    pub fn fade_alpha(&self, beam: &Beam) -> f64 {
        (1.0 - beam.age / self.settings.fade_secs).max(0.0)
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GridBeamConfig {
    pub style: GridStyle,
    pub beams: BeamSettings,
    /// Accent color for beams (the site passes its theme accent here).
    pub accent_color: Rgba8,
    pub seed: u64,
}

impl Default for GridBeamConfig {
    fn default() -> Self {
        Self {
            style: GridStyle::default(),
            beams: BeamSettings::default(),
            accent_color: Rgba8::opaque(0, 229, 255),
            seed: 0,
        }
    }
}

/// Ambient background renderer: a static gradient layer, a grid overlay
/// cleared and redrawn every frame, and an additive beam layer on top. The
/// three surfaces are stacked by the host in that z-order.
#[derive(Clone, Debug)]
pub struct GridBeamRenderer {
    style: GridStyle,
    field: BeamField,
    background: PixelSurface,
    grid: PixelSurface,
    beams: PixelSurface,
    size: SurfaceSize,
    reduced_motion: bool,
}

impl GridBeamRenderer {
    pub fn new(
        width: f64,
        height: f64,
        dpr: f64,
        config: GridBeamConfig,
        reduced_motion: bool,
    ) -> MotionResult<Self> {
        let size = SurfaceSize::floored(width, height, MIN_WIDTH, MIN_HEIGHT);
        let field = BeamField::new(
            config.seed,
            config.beams,
            config.accent_color,
            config.style.pitch,
        );
        let mut r = Self {
            style: config.style,
            field,
            background: PixelSurface::new(size, dpr)?,
            grid: PixelSurface::new(size, dpr)?,
            beams: PixelSurface::new(size, dpr)?,
            size,
            reduced_motion,
        };
        r.draw_background()?;
        if !r.reduced_motion {
            // One beam immediately so the layer is not empty on first paint.
            r.field.spawn(r.size);
        }
        Ok(r)
    }

    pub fn background(&self) -> &PixelSurface {
        &self.background
    }

    pub fn grid(&self) -> &PixelSurface {
        &self.grid
    }

    pub fn beams(&self) -> &PixelSurface {
        &self.beams
    }

    pub fn beam_count(&self) -> usize {
        self.field.len()
    }

    pub fn field(&self) -> &BeamField {
        &self.field
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) {
        self.reduced_motion = reduced;
    }

    /// Resize all three backing stores and repaint the static gradient. The
    /// animated layers repaint on the next tick.
    pub fn resize(&mut self, width: f64, height: f64, dpr: f64) -> MotionResult<()> {
        self.size = SurfaceSize::floored(width, height, MIN_WIDTH, MIN_HEIGHT);
        self.background.resize(self.size, dpr)?;
        self.grid.resize(self.size, dpr)?;
        self.beams.resize(self.size, dpr)?;
        self.draw_background()
    }

    /// One animation frame: redraw the grid, then (unless reduced motion is
    /// active) spawn/advance/draw beams using the elapsed delta.
    #[tracing::instrument(skip(self))]
    pub fn tick(&mut self, dt: f64) -> MotionResult<()> {
        let dt = dt.clamp(0.0, MAX_TICK_SECS);
        self.draw_grid()?;
        if !self.reduced_motion {
            self.field.maybe_spawn(self.size);
            self.field.advance(dt, self.size);
            self.draw_beams()?;
        }
        Ok(())
    }

    /// Flattens the three layers into one surface (bottom to top), the way
    /// the stacked canvases composite in the page.
    pub fn flattened(&self) -> MotionResult<PixelSurface> {
        let mut out = self.background.clone();
        out.composite_over(&self.grid)?;
        out.composite_over(&self.beams)?;
        Ok(out)
    }

    fn draw_background(&mut self) -> MotionResult<()> {
        let w = f64::from(self.size.width);
        let h = f64::from(self.size.height);
        self.background.clear();
        self.background.fill_linear_gradient(
            Point::new(0.0, 0.0),
            Point::new(w, h),
            &[
                (0.0, Rgba8::opaque(4, 4, 10)),
                (0.45, Rgba8::opaque(7, 6, 12)),
                (1.0, Rgba8::opaque(11, 8, 17)),
            ],
            Blend::Over,
        )?;
        self.background.fill_radial_gradient(
            Point::new(w * 0.5, h * 0.35),
            w.max(h) * 0.9,
            &[
                (0.0, Rgba8::new(12, 10, 20, 115)),
                (1.0, Rgba8::new(5, 6, 10, 0)),
            ],
            Blend::Over,
        )
    }

    fn draw_grid(&mut self) -> MotionResult<()> {
        let w = f64::from(self.size.width);
        let h = f64::from(self.size.height);
        let style = self.style;
        let (xs, ys) = lattice(self.size, style.pitch);
        self.grid.clear();

        for &x in &xs {
            self.grid.stroke_vline(
                x,
                0.0,
                h,
                style.line_width,
                style.line,
                Some(style.feather),
                Blend::Over,
            );
        }
        for (i, &y) in ys.iter().enumerate() {
            if i == 0 || y >= h - style.bottom_margin {
                continue;
            }
            self.grid.stroke_hline(
                y,
                0.0,
                w,
                style.line_width,
                style.line,
                Some(style.feather),
                Blend::Over,
            );
        }

        // Accent pass: every Nth line again, brighter, lighten blend. The
        // vertical pattern is anchored one column left of the origin, so with
        // the 3-column overscan the accented slice indices are 2, 5, 8, ...
        for (i, &x) in xs.iter().enumerate() {
            if (i + 1) % style.accent_every != 0 {
                continue;
            }
            self.grid.stroke_vline(
                x,
                0.0,
                h,
                style.accent_width,
                style.accent,
                Some(style.feather),
                Blend::Screen,
            );
        }
        for (i, &y) in ys.iter().enumerate() {
            if i % style.accent_every != 0 || i == 0 || y >= h - style.bottom_margin {
                continue;
            }
            self.grid.stroke_hline(
                y,
                0.0,
                w,
                style.accent_width,
                style.accent,
                Some(style.feather),
                Blend::Screen,
            );
        }
        Ok(())
    }

    fn draw_beams(&mut self) -> MotionResult<()> {
        self.beams.clear();
        for b in self.field.beams() {
            let alpha = self.field.fade_alpha(b);
            if alpha <= 0.0 {
                continue;
            }

            // Pulsing radial glow.
            let glow = 18.0 + (b.age * 2.2).sin().abs() * 18.0;
            self.beams.fill_radial_gradient(
                b.pos,
                glow,
                &[
                    (0.0, b.color.with_alpha(alpha)),
                    (0.45, b.color.with_alpha(0.5 * alpha)),
                    (1.0, b.color.with_alpha(0.0)),
                ],
                Blend::Lighter,
            )?;

            // Colored core segment along the axis of motion.
            let (core_a, core_b, hot_a, hot_b) = match b.axis() {
                Axis::Horizontal => (
                    Point::new(b.pos.x - 20.0, b.pos.y),
                    Point::new(b.pos.x + 20.0, b.pos.y),
                    Point::new(b.pos.x - 12.0, b.pos.y),
                    Point::new(b.pos.x + 12.0, b.pos.y),
                ),
                Axis::Vertical => (
                    Point::new(b.pos.x, b.pos.y - 20.0),
                    Point::new(b.pos.x, b.pos.y + 20.0),
                    Point::new(b.pos.x, b.pos.y - 12.0),
                    Point::new(b.pos.x, b.pos.y + 12.0),
                ),
            };
            self.beams.stroke_segment(
                core_a,
                core_b,
                b.width,
                b.color.with_alpha(alpha),
                Blend::Lighter,
            );

            // Shorter white hot core.
            self.beams.stroke_segment(
                hot_a,
                hot_b,
                (b.width * 0.28).max(0.6),
                Rgba8::WHITE.with_alpha(0.8 * alpha),
                Blend::Lighter,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(seed: u64, density: f64, reduced: bool) -> GridBeamRenderer {
        let config = GridBeamConfig {
            beams: BeamSettings {
                density,
                ..BeamSettings::default()
            },
            seed,
            ..GridBeamConfig::default()
        };
        GridBeamRenderer::new(600.0, 600.0, 1.0, config, reduced).unwrap()
    }

    #[test]
    fn lattice_has_overscan() {
        let size = SurfaceSize::new(600, 600).unwrap();
        let (xs, ys) = lattice(size, 120.0);
        assert_eq!(xs[0], -360.0);
        assert!(*xs.last().unwrap() >= 600.0);
        assert_eq!(ys[0], 0.0);
        assert!(*ys.last().unwrap() >= 600.0);
    }

    #[test]
    fn measured_size_is_floored() {
        let r = renderer(1, 1.0, false);
        assert_eq!(r.size(), SurfaceSize::new(600, 600).unwrap());
        let tiny = GridBeamRenderer::new(0.0, 10.0, 1.0, GridBeamConfig::default(), false).unwrap();
        assert_eq!(tiny.size(), SurfaceSize::new(320, 240).unwrap());
    }

    #[test]
    fn spawn_snaps_to_lattice_and_is_axis_aligned() {
        let size = SurfaceSize::new(600, 600).unwrap();
        let mut field = BeamField::new(3, BeamSettings::default(), Rgba8::opaque(0, 229, 255), 120.0);
        let (xs, ys) = lattice(size, 120.0);
        for _ in 0..50 {
            field.spawn(size);
        }
        for b in field.beams() {
            match b.axis() {
                Axis::Vertical => {
                    assert_eq!(b.vel.x, 0.0);
                    assert!(xs.contains(&b.pos.x), "x {} not on lattice", b.pos.x);
                }
                Axis::Horizontal => {
                    assert_eq!(b.vel.y, 0.0);
                    assert!(ys.contains(&b.pos.y), "y {} not on lattice", b.pos.y);
                }
            }
        }
    }

    #[test]
    fn beam_count_never_exceeds_cap() {
        let size = SurfaceSize::new(600, 600).unwrap();
        let settings = BeamSettings::default();
        let cap = settings.cap;
        let mut field = BeamField::new(9, settings, Rgba8::opaque(0, 229, 255), 120.0);
        for _ in 0..100 {
            field.spawn(size);
            assert!(field.len() <= cap);
        }
        assert_eq!(field.len(), cap);
    }

    #[test]
    fn cap_drops_oldest_first() {
        // Wide bounds margin so beams spawned on overscan lattice lines are
        // not retired while aging the population.
        let settings = BeamSettings {
            bounds_margin: 1000.0,
            ..BeamSettings::default()
        };
        let size = SurfaceSize::new(600, 600).unwrap();
        let mut field = BeamField::new(11, settings, Rgba8::opaque(0, 229, 255), 120.0);
        for _ in 0..6 {
            field.spawn(size);
        }
        field.advance(0.5, size);
        assert_eq!(field.len(), 6);
        let oldest_now = field.beams().iter().map(|b| b.age).fold(0.0, f64::max);
        assert_eq!(oldest_now, 0.5);
        field.spawn(size);
        // The new beam replaced the oldest slot; one beam is brand new and
        // the count holds at the cap.
        assert!(field.beams().iter().any(|b| b.age == 0.0));
        assert_eq!(field.len(), 6);
    }

    #[test]
    fn beams_retire_on_age_and_bounds() {
        let size = SurfaceSize::new(600, 600).unwrap();
        let mut field = BeamField::new(5, BeamSettings::default(), Rgba8::opaque(0, 229, 255), 120.0);
        field.spawn(size);
        assert_eq!(field.len(), 1);

        // Age out: 3s lifetime.
        field.advance(2.9, size);
        let after_age = field.len();
        field.advance(0.2, size);
        assert!(field.len() <= after_age);
        field.advance(3.0, size);
        assert!(field.is_empty());
    }

    #[test]
    fn reduced_motion_suspends_spawning_and_movement() {
        let mut r = renderer(2, 1.0, true);
        assert_eq!(r.beam_count(), 0);
        for _ in 0..240 {
            r.tick(1.0 / 60.0).unwrap();
        }
        assert_eq!(r.beam_count(), 0);
    }

    #[test]
    fn same_seed_same_tick_schedule_is_deterministic() {
        let mut a = renderer(77, 1.0, false);
        let mut b = renderer(77, 1.0, false);
        for _ in 0..300 {
            a.tick(1.0 / 60.0).unwrap();
            b.tick(1.0 / 60.0).unwrap();
        }
        assert_eq!(a.beam_count(), b.beam_count());
        for (ba, bb) in a.field().beams().iter().zip(b.field().beams()) {
            assert_eq!(ba.pos, bb.pos);
            assert_eq!(ba.age, bb.age);
        }
    }

    #[test]
    fn fade_alpha_decreases_with_age() {
        let field = BeamField::new(1, BeamSettings::default(), Rgba8::WHITE, 120.0);
        let mk = |age: f64| Beam {
            pos: Point::new(0.0, 0.0),
            vel: Vec2::new(0.0, 100.0),
            color: Rgba8::WHITE,
            width: 1.0,
            age,
        };
        assert_eq!(field.fade_alpha(&mk(0.0)), 1.0);
        let mid = field.fade_alpha(&mk(1.3));
        assert!(mid > 0.0 && mid < 1.0);
        assert_eq!(field.fade_alpha(&mk(2.6)), 0.0);
    }
}

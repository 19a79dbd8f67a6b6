use kurbo::{Point, Vec2};

use crate::{
    core::{Rgba8, SplitMix64, SurfaceSize, wrap},
    error::MotionResult,
    surface::{Blend, PixelSurface},
};

const MAX_TICK_SECS: f64 = 0.06;

/// One drifting dot. Position wraps at the surface edges so the field density
/// stays constant.
#[derive(Clone, Copy, Debug)]
pub struct Particle {
    pub pos: Point,
    pub vel: Vec2,
    pub size: f64,
    pub opacity: f64,
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct ParticleSettings {
    pub count: usize,
    pub color: Rgba8,
    /// Particles closer than this are joined by a connection line.
    pub link_distance: f64,
    pub speed: f64,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            count: 50,
            color: Rgba8::opaque(0, 217, 255),
            link_distance: 150.0,
            speed: 30.0,
        }
    }
}

/// Slow drifting particle field with proximity connection lines, drawn to its
/// own surface each tick.
#[derive(Clone, Debug)]
pub struct ParticleField {
    particles: Vec<Particle>,
    settings: ParticleSettings,
    surface: PixelSurface,
    size: SurfaceSize,
    reduced_motion: bool,
}

impl ParticleField {
    pub fn new(
        width: f64,
        height: f64,
        dpr: f64,
        settings: ParticleSettings,
        seed: u64,
        reduced_motion: bool,
    ) -> MotionResult<Self> {
        let size = SurfaceSize::floored(width, height, 1, 1);
        let mut rng = SplitMix64::new(seed);
        let w = f64::from(size.width);
        let h = f64::from(size.height);
        let speed = settings.speed;
        let particles = (0..settings.count)
            .map(|_| Particle {
                pos: Point::new(rng.range_f64(0.0, w), rng.range_f64(0.0, h)),
                vel: Vec2::new(
                    (rng.next_f64() - 0.5) * speed,
                    (rng.next_f64() - 0.5) * speed,
                ),
                size: rng.range_f64(1.0, 3.0),
                opacity: rng.range_f64(0.2, 0.7),
            })
            .collect();
        let mut field = Self {
            particles,
            settings,
            surface: PixelSurface::new(size, dpr)?,
            size,
            reduced_motion,
        };
        field.draw();
        Ok(field)
    }

    pub fn surface(&self) -> &PixelSurface {
        &self.surface
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) {
        self.reduced_motion = reduced;
    }

    /// Particles keep their relative positions on resize; they re-wrap into
    /// the new bounds on the next tick.
    pub fn resize(&mut self, width: f64, height: f64, dpr: f64) -> MotionResult<()> {
        self.size = SurfaceSize::floored(width, height, 1, 1);
        self.surface.resize(self.size, dpr)?;
        self.draw();
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn tick(&mut self, dt: f64) {
        if self.reduced_motion {
            return;
        }
        let dt = dt.clamp(0.0, MAX_TICK_SECS);
        let w = f64::from(self.size.width);
        let h = f64::from(self.size.height);
        for p in &mut self.particles {
            p.pos += p.vel * dt;
            p.pos.x = wrap(0.0, w, p.pos.x);
            p.pos.y = wrap(0.0, h, p.pos.y);
        }
        self.draw();
    }

    fn draw(&mut self) {
        self.surface.clear();
        let color = self.settings.color;
        let link = self.settings.link_distance;

        for i in 0..self.particles.len() {
            for j in (i + 1)..self.particles.len() {
                let a = self.particles[i].pos;
                let b = self.particles[j].pos;
                let d = a.distance(b);
                if d < link {
                    let alpha = 0.1 * (1.0 - d / link);
                    self.surface.stroke_segment(
                        a,
                        b,
                        0.5,
                        color.with_alpha(alpha),
                        Blend::Over,
                    );
                }
            }
        }
        for p in &self.particles {
            self.surface
                .fill_circle(p.pos, p.size, color.with_alpha(p.opacity), Blend::Over);
        }
    }
}

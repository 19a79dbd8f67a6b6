//! Host integration layer: the embedding page forwards browser-level events
//! as [`HostEvent`]s and drives one [`Stage`] per animation frame.

use crate::{
    core::Viewport,
    error::MotionResult,
    gridbeam::GridBeamRenderer,
    marquee::VelocityMarquee,
    particles::ParticleField,
    scrubber::SequenceScrubber,
};

/// Events the host environment feeds into the stage.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    /// Viewport or container resized (CSS pixels plus device pixel ratio).
    Resize { width: f64, height: f64, dpr: f64 },
    /// Absolute scroll offset with a monotonic timestamp in seconds.
    Scroll { y: f64, at: f64 },
    /// Tab visibility changed.
    VisibilityChanged { visible: bool },
    /// Window regained input focus.
    FocusGained,
    /// The reduced-motion media preference changed.
    ReducedMotionChanged { reduced: bool },
}

/// A mounted visual effect. Effects receive every host event and one tick per
/// animation frame; they are expected to ignore events they do not care
/// about.
pub trait Effect {
    fn handle(&mut self, event: &HostEvent) -> MotionResult<()>;
    fn tick(&mut self, dt: f64) -> MotionResult<()>;
}

/// The set of mounted effects for a page, evented and ticked together in
/// mount order.
#[derive(Default)]
pub struct Stage {
    effects: Vec<Box<dyn Effect>>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self, effect: Box<dyn Effect>) {
        self.effects.push(effect);
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn dispatch(&mut self, event: &HostEvent) -> MotionResult<()> {
        for effect in &mut self.effects {
            effect.handle(event)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn tick(&mut self, dt: f64) -> MotionResult<()> {
        for effect in &mut self.effects {
            effect.tick(dt)?;
        }
        Ok(())
    }
}

impl Effect for SequenceScrubber {
    fn handle(&mut self, event: &HostEvent) -> MotionResult<()> {
        match *event {
            HostEvent::Resize { width, height, dpr } => {
                // Containers can measure zero mid-layout; floor instead of
                // erroring so dispatch keeps reaching later-mounted effects.
                self.on_resize(Viewport::new(width.max(1.0), height.max(1.0))?, dpr)
            }
            HostEvent::Scroll { y, .. } => {
                self.on_scroll(y);
                Ok(())
            }
            HostEvent::VisibilityChanged { visible: true } | HostEvent::FocusGained => {
                self.on_visibility_regained();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn tick(&mut self, _dt: f64) -> MotionResult<()> {
        SequenceScrubber::tick(self);
        Ok(())
    }
}

impl Effect for GridBeamRenderer {
    fn handle(&mut self, event: &HostEvent) -> MotionResult<()> {
        match *event {
            HostEvent::Resize { width, height, dpr } => self.resize(width, height, dpr),
            HostEvent::ReducedMotionChanged { reduced } => {
                self.set_reduced_motion(reduced);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn tick(&mut self, dt: f64) -> MotionResult<()> {
        GridBeamRenderer::tick(self, dt)
    }
}

impl Effect for ParticleField {
    fn handle(&mut self, event: &HostEvent) -> MotionResult<()> {
        match *event {
            HostEvent::Resize { width, height, dpr } => self.resize(width, height, dpr),
            HostEvent::ReducedMotionChanged { reduced } => {
                self.set_reduced_motion(reduced);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn tick(&mut self, dt: f64) -> MotionResult<()> {
        ParticleField::tick(self, dt);
        Ok(())
    }
}

impl Effect for VelocityMarquee {
    fn handle(&mut self, event: &HostEvent) -> MotionResult<()> {
        match *event {
            HostEvent::Scroll { y, at } => self.observe_scroll(at, y),
            HostEvent::VisibilityChanged { visible } => self.set_page_visible(visible),
            HostEvent::ReducedMotionChanged { reduced } => self.set_reduced_motion(reduced),
            _ => {}
        }
        Ok(())
    }

    fn tick(&mut self, dt: f64) -> MotionResult<()> {
        VelocityMarquee::tick(self, dt);
        Ok(())
    }
}

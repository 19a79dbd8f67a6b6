use crate::{
    assets::PreparedFrame,
    core::{SurfaceSize, Viewport},
    error::{MotionError, MotionResult},
    signal::PinnedRange,
    surface::{FitMode, PixelSurface},
};

/// Load state of one frame in the sequence. A failed frame never becomes
/// ready and is never retried; the scrubber keeps drawing the nearest earlier
/// ready frame instead.
#[derive(Clone, Debug)]
pub enum FrameSlot {
    Pending,
    Ready(PreparedFrame),
    Failed,
}

/// Ordered set of frames, indexed 0..N-1, each independently loaded.
#[derive(Clone, Debug)]
pub struct FrameSequence {
    slots: Vec<FrameSlot>,
}

impl FrameSequence {
    pub fn new(frame_count: usize) -> MotionResult<Self> {
        if frame_count == 0 {
            return Err(MotionError::validation("frame count must be > 0"));
        }
        Ok(Self {
            slots: vec![FrameSlot::Pending; frame_count],
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn mark_ready(&mut self, index: usize, frame: PreparedFrame) -> MotionResult<()> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or_else(|| MotionError::validation(format!("frame index {index} out of range")))?;
        *slot = FrameSlot::Ready(frame);
        Ok(())
    }

    pub fn mark_failed(&mut self, index: usize) -> MotionResult<()> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or_else(|| MotionError::validation(format!("frame index {index} out of range")))?;
        if !matches!(slot, FrameSlot::Ready(_)) {
            *slot = FrameSlot::Failed;
        }
        Ok(())
    }

    pub fn is_ready(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(FrameSlot::Ready(_)))
    }

    /// Nearest ready frame at or before `index`: the draw policy never skips
    /// forward to a not-yet-loaded frame and never goes blank once any frame
    /// at or below the target has loaded.
    pub fn nearest_ready_at_or_before(&self, index: usize) -> Option<(usize, &PreparedFrame)> {
        let start = index.min(self.slots.len().saturating_sub(1));
        for i in (0..=start).rev() {
            if let FrameSlot::Ready(frame) = &self.slots[i] {
                return Some((i, frame));
            }
        }
        None
    }
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct ScrubberConfig {
    pub frame_count: usize,
    /// Pinned distance in viewport heights (the hero uses 3.0, i.e. "300%").
    pub pin_heights: f64,
    pub fit: FitMode,
}

impl Default for ScrubberConfig {
    fn default() -> Self {
        Self {
            frame_count: 147,
            pin_heights: 3.0,
            fit: FitMode::Cover,
        }
    }
}

/// Scroll-synchronized image-sequence scrubber: maps progress through a
/// pinned scroll range to a snapped frame index and keeps the surface showing
/// the nearest ready frame.
#[derive(Clone, Debug)]
pub struct SequenceScrubber {
    sequence: FrameSequence,
    fit: FitMode,
    pin_heights: f64,
    range: PinnedRange,
    surface: PixelSurface,
    current: usize,
    drawn: Option<usize>,
    needs_redraw: bool,
}

impl SequenceScrubber {
    pub fn new(config: ScrubberConfig, viewport: Viewport, dpr: f64) -> MotionResult<Self> {
        if !(config.pin_heights > 0.0) {
            return Err(MotionError::validation("pin_heights must be > 0"));
        }
        let sequence = FrameSequence::new(config.frame_count)?;
        let range = PinnedRange::of_viewport(0.0, config.pin_heights, viewport)?;
        let size = SurfaceSize::floored(viewport.width, viewport.height, 1, 1);
        Ok(Self {
            sequence,
            fit: config.fit,
            pin_heights: config.pin_heights,
            range,
            surface: PixelSurface::new(size, dpr)?,
            current: 0,
            drawn: None,
            needs_redraw: false,
        })
    }

    pub fn surface(&self) -> &PixelSurface {
        &self.surface
    }

    pub fn sequence(&self) -> &FrameSequence {
        &self.sequence
    }

    /// Frame index the scroll position currently requests.
    pub fn current_frame(&self) -> usize {
        self.current
    }

    /// Frame index actually on the surface, if any frame has been drawn.
    pub fn drawn_frame(&self) -> Option<usize> {
        self.drawn
    }

    /// Snap-to-frame mapping: `floor(p * (N-1))`, clamped to the sequence.
    pub fn frame_index(&self, progress: f64) -> usize {
        let n = self.sequence.len();
        let idx = (progress.clamp(0.0, 1.0) * (n - 1) as f64).floor() as usize;
        idx.min(n - 1)
    }

    /// A frame finished decoding. Frame 0 triggers an immediate redraw so the
    /// initial paint is not blank; other frames become visible on the next
    /// scroll change.
    pub fn on_frame_decoded(&mut self, index: usize, frame: PreparedFrame) -> MotionResult<()> {
        self.sequence.mark_ready(index, frame)?;
        if index == 0 && self.drawn.is_none() {
            self.redraw();
        }
        Ok(())
    }

    pub fn on_frame_failed(&mut self, index: usize) -> MotionResult<()> {
        self.sequence.mark_failed(index)
    }

    pub fn on_scroll(&mut self, scroll_y: f64) {
        let idx = self.frame_index(self.range.progress(scroll_y));
        if idx != self.current {
            self.current = idx;
            self.redraw();
        }
    }

    /// Container resized: rebuild the DPR-scaled backing store and redraw the
    /// current frame immediately so no stale content flashes.
    pub fn on_resize(&mut self, viewport: Viewport, dpr: f64) -> MotionResult<()> {
        self.range = PinnedRange::of_viewport(0.0, self.pin_heights, viewport)?;
        let size = SurfaceSize::floored(viewport.width, viewport.height, 1, 1);
        self.surface.resize(size, dpr)?;
        self.drawn = None;
        self.redraw();
        Ok(())
    }

    /// Tab/window became visible or focused again: pinned-region measurements
    /// may be stale after suspension, so force a redraw on the next tick.
    pub fn on_visibility_regained(&mut self) {
        self.needs_redraw = true;
    }

    /// Per-frame housekeeping; performs any redraw queued by visibility or
    /// focus recovery.
    pub fn tick(&mut self) {
        if self.needs_redraw {
            self.needs_redraw = false;
            self.drawn = None;
            self.redraw();
        }
    }

    #[tracing::instrument(skip(self), fields(target = self.current))]
    fn redraw(&mut self) {
        match self.sequence.nearest_ready_at_or_before(self.current) {
            Some((index, frame)) => {
                let frame = frame.clone();
                self.surface.clear();
                self.surface.blit_frame(&frame, self.fit);
                self.drawn = Some(index);
            }
            None => {
                // Nothing ready yet; leave whatever is on the surface.
                tracing::debug!("no ready frame at or before target");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::Viewport;

    fn frame(color: [u8; 4]) -> PreparedFrame {
        PreparedFrame {
            width: 2,
            height: 2,
            rgba8_premul: Arc::new(color.repeat(4)),
        }
    }

    fn scrubber(frame_count: usize) -> SequenceScrubber {
        let config = ScrubberConfig {
            frame_count,
            pin_heights: 3.0,
            fit: FitMode::Cover,
        };
        SequenceScrubber::new(config, Viewport::new(100.0, 100.0).unwrap(), 1.0).unwrap()
    }

    #[test]
    fn frame_index_is_clamped_and_monotone() {
        let s = scrubber(10);
        assert_eq!(s.frame_index(-0.5), 0);
        assert_eq!(s.frame_index(0.0), 0);
        assert_eq!(s.frame_index(1.0), 9);
        assert_eq!(s.frame_index(2.0), 9);

        let mut prev = 0;
        for i in 0..=100 {
            let idx = s.frame_index(f64::from(i) / 100.0);
            assert!(idx >= prev);
            assert!(idx <= 9);
            prev = idx;
        }
    }

    #[test]
    fn nearest_ready_never_looks_forward() {
        let mut seq = FrameSequence::new(5).unwrap();
        seq.mark_ready(0, frame([10, 0, 0, 255])).unwrap();
        seq.mark_ready(2, frame([20, 0, 0, 255])).unwrap();
        seq.mark_ready(4, frame([30, 0, 0, 255])).unwrap();

        assert_eq!(seq.nearest_ready_at_or_before(3).unwrap().0, 2);
        assert_eq!(seq.nearest_ready_at_or_before(1).unwrap().0, 0);
        assert_eq!(seq.nearest_ready_at_or_before(4).unwrap().0, 4);
    }

    #[test]
    fn no_ready_frame_draws_nothing() {
        let mut s = scrubber(5);
        s.on_scroll(150.0);
        assert_eq!(s.drawn_frame(), None);
        assert_eq!(s.surface().pixel_at_css(50.0, 50.0), [0, 0, 0, 0]);
    }

    #[test]
    fn frame_zero_triggers_first_paint() {
        let mut s = scrubber(5);
        s.on_frame_decoded(0, frame([255, 255, 255, 255])).unwrap();
        assert_eq!(s.drawn_frame(), Some(0));
        assert_eq!(s.surface().pixel_at_css(50.0, 50.0)[3], 255);
    }

    #[test]
    fn scroll_falls_back_to_nearest_lower_ready_frame() {
        let mut s = scrubber(5);
        s.on_frame_decoded(0, frame([255, 0, 0, 255])).unwrap();
        s.on_frame_decoded(2, frame([0, 255, 0, 255])).unwrap();

        // 300px pin over 100px viewport => distance 300; progress 0.8 => index 3.
        s.on_scroll(240.0);
        assert_eq!(s.current_frame(), 3);
        assert_eq!(s.drawn_frame(), Some(2));
    }

    #[test]
    fn failed_frames_degrade_silently() {
        let mut s = scrubber(3);
        s.on_frame_decoded(0, frame([255, 0, 0, 255])).unwrap();
        s.on_frame_failed(1).unwrap();
        s.on_frame_failed(2).unwrap();
        s.on_scroll(300.0);
        assert_eq!(s.current_frame(), 2);
        assert_eq!(s.drawn_frame(), Some(0));
    }

    #[test]
    fn resize_redraws_current_frame() {
        let mut s = scrubber(5);
        s.on_frame_decoded(0, frame([255, 255, 255, 255])).unwrap();
        s.on_resize(Viewport::new(200.0, 50.0).unwrap(), 2.0).unwrap();
        assert_eq!(s.surface().device_size(), (400, 100));
        assert_eq!(s.drawn_frame(), Some(0));
        assert_eq!(s.surface().pixel_at_css(100.0, 25.0)[3], 255);
    }

    #[test]
    fn visibility_recovery_redraws_on_next_tick() {
        let mut s = scrubber(5);
        s.on_frame_decoded(0, frame([255, 255, 255, 255])).unwrap();
        s.on_visibility_regained();
        s.tick();
        assert_eq!(s.drawn_frame(), Some(0));
    }
}

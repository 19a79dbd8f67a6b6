use kurbo::Point;

use crate::{
    assets::PreparedFrame,
    core::{Rgba8, SurfaceSize, clamp01},
    error::{MotionError, MotionResult},
};

/// Pixel blend modes, matching the canvas composite operations the effects
/// rely on: `source-over`, `lighter` (additive) and `screen`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blend {
    Over,
    Lighter,
    Screen,
}

/// How an image is fitted into the surface. `Cover` fills the surface and
/// center-crops; `Contain` letterboxes. Pick one per component and keep it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    #[default]
    Cover,
    Contain,
}

/// A CPU canvas: premultiplied RGBA8 backing store sized at CSS pixels times
/// the device pixel ratio. All drawing coordinates are CSS pixels.
#[derive(Clone, Debug)]
pub struct PixelSurface {
    css: SurfaceSize,
    scale: f64,
    width_px: usize,
    height_px: usize,
    data: Vec<u8>,
}

impl PixelSurface {
    pub fn new(css: SurfaceSize, device_pixel_ratio: f64) -> MotionResult<Self> {
        let scale = if device_pixel_ratio.is_finite() {
            device_pixel_ratio.max(1.0)
        } else {
            1.0
        };
        let width_px = ((f64::from(css.width) * scale).floor() as usize).max(1);
        let height_px = ((f64::from(css.height) * scale).floor() as usize).max(1);
        Ok(Self {
            css,
            scale,
            width_px,
            height_px,
            data: vec![0; width_px * height_px * 4],
        })
    }

    /// Reallocates the backing store for a new size/DPR. Contents are cleared;
    /// the caller is expected to redraw immediately.
    pub fn resize(&mut self, css: SurfaceSize, device_pixel_ratio: f64) -> MotionResult<()> {
        *self = Self::new(css, device_pixel_ratio)?;
        Ok(())
    }

    pub fn css_size(&self) -> SurfaceSize {
        self.css
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn device_size(&self) -> (usize, usize) {
        (self.width_px, self.height_px)
    }

    /// Premultiplied RGBA8 pixel data, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Premultiplied pixel at a CSS coordinate (clamped to bounds).
    pub fn pixel_at_css(&self, x: f64, y: f64) -> [u8; 4] {
        let px = ((x * self.scale).floor() as isize).clamp(0, self.width_px as isize - 1) as usize;
        let py = ((y * self.scale).floor() as isize).clamp(0, self.height_px as isize - 1) as usize;
        let i = (py * self.width_px + px) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    fn write_px(&mut self, x: usize, y: usize, src: [u8; 4], blend: Blend) {
        if src == [0, 0, 0, 0] {
            return;
        }
        let i = (y * self.width_px + x) * 4;
        let dst = [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ];
        let out = blend_px(dst, src, blend);
        self.data[i..i + 4].copy_from_slice(&out);
    }

    /// Fills the whole surface with a linear gradient between two CSS points.
    pub fn fill_linear_gradient(
        &mut self,
        from: Point,
        to: Point,
        stops: &[(f64, Rgba8)],
        blend: Blend,
    ) -> MotionResult<()> {
        validate_stops(stops)?;
        let ax = to.x - from.x;
        let ay = to.y - from.y;
        let len2 = ax * ax + ay * ay;
        if len2 <= 0.0 {
            return Err(MotionError::surface("gradient endpoints must differ"));
        }
        for py in 0..self.height_px {
            let cy = (py as f64 + 0.5) / self.scale;
            for px in 0..self.width_px {
                let cx = (px as f64 + 0.5) / self.scale;
                let t = clamp01(((cx - from.x) * ax + (cy - from.y) * ay) / len2);
                let color = sample_stops(stops, t);
                self.write_px(px, py, color.to_premul(), blend);
            }
        }
        Ok(())
    }

    /// Radial gradient out to `radius` CSS pixels. Pixels past the radius take
    /// the final stop (which is transparent for every use in this crate, so
    /// only the bounding box is visited).
    pub fn fill_radial_gradient(
        &mut self,
        center: Point,
        radius: f64,
        stops: &[(f64, Rgba8)],
        blend: Blend,
    ) -> MotionResult<()> {
        validate_stops(stops)?;
        if !(radius > 0.0) {
            return Err(MotionError::surface("gradient radius must be > 0"));
        }
        let outer_transparent = stops.last().map(|(_, c)| c.a == 0).unwrap_or(false);
        let (x0, x1) = self.clamp_cols(center.x - radius, center.x + radius);
        let (y0, y1) = self.clamp_rows(center.y - radius, center.y + radius);
        let (x0, x1, y0, y1) = if outer_transparent {
            (x0, x1, y0, y1)
        } else {
            (0, self.width_px, 0, self.height_px)
        };
        for py in y0..y1 {
            let cy = (py as f64 + 0.5) / self.scale;
            for px in x0..x1 {
                let cx = (px as f64 + 0.5) / self.scale;
                let d = ((cx - center.x).powi(2) + (cy - center.y).powi(2)).sqrt();
                let t = clamp01(d / radius);
                let color = sample_stops(stops, t);
                if color.a == 0 {
                    continue;
                }
                self.write_px(px, py, color.to_premul(), blend);
            }
        }
        Ok(())
    }

    /// Antialiased filled disc.
    pub fn fill_circle(&mut self, center: Point, radius: f64, color: Rgba8, blend: Blend) {
        if !(radius > 0.0) || color.a == 0 {
            return;
        }
        let pad = radius + 1.0;
        let (x0, x1) = self.clamp_cols(center.x - pad, center.x + pad);
        let (y0, y1) = self.clamp_rows(center.y - pad, center.y + pad);
        for py in y0..y1 {
            let cy = (py as f64 + 0.5) / self.scale;
            for px in x0..x1 {
                let cx = (px as f64 + 0.5) / self.scale;
                let d = ((cx - center.x).powi(2) + (cy - center.y).powi(2)).sqrt();
                let cov = clamp01((radius - d) * self.scale + 0.5);
                if cov <= 0.0 {
                    continue;
                }
                self.write_px(px, py, color.with_alpha(cov).to_premul(), blend);
            }
        }
    }

    /// Vertical line at CSS `x` spanning `[y0, y1]`, optionally alpha-feathered
    /// along its length: transparent outside `(fade_in, fade_out)` fractions,
    /// ramping linearly to full opacity between them.
    pub fn stroke_vline(
        &mut self,
        x: f64,
        y0: f64,
        y1: f64,
        width: f64,
        color: Rgba8,
        feather: Option<(f64, f64)>,
        blend: Blend,
    ) {
        if y1 <= y0 || color.a == 0 {
            return;
        }
        let (c0, c1) = self.clamp_cols(x - width / 2.0, x + width / 2.0);
        let (r0, r1) = self.clamp_rows(y0, y1);
        let band_lo = (x - width / 2.0) * self.scale;
        let band_hi = (x + width / 2.0) * self.scale;
        for px in c0..c1 {
            let cov = span_coverage(px, band_lo, band_hi);
            if cov <= 0.0 {
                continue;
            }
            for py in r0..r1 {
                let cy = (py as f64 + 0.5) / self.scale;
                let along = (cy - y0) / (y1 - y0);
                let f = feather_alpha(along, feather);
                if f <= 0.0 {
                    continue;
                }
                self.write_px(px, py, color.with_alpha(cov * f).to_premul(), blend);
            }
        }
    }

    /// Horizontal counterpart of [`Self::stroke_vline`].
    pub fn stroke_hline(
        &mut self,
        y: f64,
        x0: f64,
        x1: f64,
        width: f64,
        color: Rgba8,
        feather: Option<(f64, f64)>,
        blend: Blend,
    ) {
        if x1 <= x0 || color.a == 0 {
            return;
        }
        let (r0, r1) = self.clamp_rows(y - width / 2.0, y + width / 2.0);
        let (c0, c1) = self.clamp_cols(x0, x1);
        let band_lo = (y - width / 2.0) * self.scale;
        let band_hi = (y + width / 2.0) * self.scale;
        for py in r0..r1 {
            let cov = span_coverage(py, band_lo, band_hi);
            if cov <= 0.0 {
                continue;
            }
            for px in c0..c1 {
                let cx = (px as f64 + 0.5) / self.scale;
                let along = (cx - x0) / (x1 - x0);
                let f = feather_alpha(along, feather);
                if f <= 0.0 {
                    continue;
                }
                self.write_px(px, py, color.with_alpha(cov * f).to_premul(), blend);
            }
        }
    }

    /// Antialiased stroked segment between two arbitrary CSS points.
    pub fn stroke_segment(&mut self, p0: Point, p1: Point, width: f64, color: Rgba8, blend: Blend) {
        if color.a == 0 {
            return;
        }
        let half = (width / 2.0).max(0.0);
        let pad = half + 1.0;
        let (c0, c1) = self.clamp_cols(p0.x.min(p1.x) - pad, p0.x.max(p1.x) + pad);
        let (r0, r1) = self.clamp_rows(p0.y.min(p1.y) - pad, p0.y.max(p1.y) + pad);
        let vx = p1.x - p0.x;
        let vy = p1.y - p0.y;
        let len2 = vx * vx + vy * vy;
        for py in r0..r1 {
            let cy = (py as f64 + 0.5) / self.scale;
            for px in c0..c1 {
                let cx = (px as f64 + 0.5) / self.scale;
                let t = if len2 > 0.0 {
                    clamp01(((cx - p0.x) * vx + (cy - p0.y) * vy) / len2)
                } else {
                    0.0
                };
                let dx = cx - (p0.x + vx * t);
                let dy = cy - (p0.y + vy * t);
                let d = (dx * dx + dy * dy).sqrt();
                let cov = clamp01((half - d) * self.scale + 0.5);
                if cov <= 0.0 {
                    continue;
                }
                self.write_px(px, py, color.with_alpha(cov).to_premul(), blend);
            }
        }
    }

    /// Draws a decoded frame fitted to the surface (bilinear sampling,
    /// centered). Does not clear first.
    pub fn blit_frame(&mut self, frame: &PreparedFrame, fit: FitMode) {
        let iw = frame.width as f64;
        let ih = frame.height as f64;
        if iw <= 0.0 || ih <= 0.0 {
            return;
        }
        let w = f64::from(self.css.width);
        let h = f64::from(self.css.height);
        let s = match fit {
            FitMode::Cover => (w / iw).max(h / ih),
            FitMode::Contain => (w / iw).min(h / ih),
        };
        let dx = (w - iw * s) / 2.0;
        let dy = (h - ih * s) / 2.0;
        for py in 0..self.height_px {
            let cy = (py as f64 + 0.5) / self.scale;
            let sy = (cy - dy) / s;
            if sy < 0.0 || sy >= ih {
                continue;
            }
            for px in 0..self.width_px {
                let cx = (px as f64 + 0.5) / self.scale;
                let sx = (cx - dx) / s;
                if sx < 0.0 || sx >= iw {
                    continue;
                }
                let src = sample_bilinear(frame, sx, sy);
                self.write_px(px, py, src, Blend::Over);
            }
        }
    }

    /// Composites `top` over this surface. Both must share device dimensions.
    pub fn composite_over(&mut self, top: &PixelSurface) -> MotionResult<()> {
        if self.device_size() != top.device_size() {
            return Err(MotionError::surface(
                "composite_over expects equal device dimensions",
            ));
        }
        for (d, s) in self
            .data
            .chunks_exact_mut(4)
            .zip(top.data.chunks_exact(4))
        {
            let out = blend_px(
                [d[0], d[1], d[2], d[3]],
                [s[0], s[1], s[2], s[3]],
                Blend::Over,
            );
            d.copy_from_slice(&out);
        }
        Ok(())
    }

    fn clamp_cols(&self, lo: f64, hi: f64) -> (usize, usize) {
        let lo = ((lo * self.scale).floor().max(0.0)) as usize;
        let hi = ((hi * self.scale).ceil().max(0.0) as usize).min(self.width_px);
        (lo.min(self.width_px), hi)
    }

    fn clamp_rows(&self, lo: f64, hi: f64) -> (usize, usize) {
        let lo = ((lo * self.scale).floor().max(0.0)) as usize;
        let hi = ((hi * self.scale).ceil().max(0.0) as usize).min(self.height_px);
        (lo.min(self.height_px), hi)
    }
}

fn validate_stops(stops: &[(f64, Rgba8)]) -> MotionResult<()> {
    if stops.is_empty() {
        return Err(MotionError::surface("gradient needs at least one stop"));
    }
    if !stops.windows(2).all(|w| w[0].0 <= w[1].0) {
        return Err(MotionError::surface("gradient stops must be sorted"));
    }
    Ok(())
}

fn sample_stops(stops: &[(f64, Rgba8)], t: f64) -> Rgba8 {
    let first = stops[0];
    if t <= first.0 {
        return first.1;
    }
    let last = stops[stops.len() - 1];
    if t >= last.0 {
        return last.1;
    }
    for w in stops.windows(2) {
        let (a_at, a) = w[0];
        let (b_at, b) = w[1];
        if t >= a_at && t <= b_at {
            let span = b_at - a_at;
            let local = if span > 0.0 { (t - a_at) / span } else { 1.0 };
            return Rgba8::lerp(a, b, local);
        }
    }
    last.1
}

/// Feather factor along a line's normalized length. `None` means full opacity
/// everywhere.
fn feather_alpha(along: f64, feather: Option<(f64, f64)>) -> f64 {
    let Some((fade_in, fade_out)) = feather else {
        return 1.0;
    };
    let along = clamp01(along);
    if along < fade_in {
        if fade_in > 0.0 { along / fade_in } else { 1.0 }
    } else if along > fade_out {
        if fade_out < 1.0 {
            (1.0 - along) / (1.0 - fade_out)
        } else {
            1.0
        }
    } else {
        1.0
    }
}

/// Fraction of device pixel `i` covered by the half-open span `[lo, hi)`.
fn span_coverage(i: usize, lo: f64, hi: f64) -> f64 {
    let p0 = i as f64;
    let p1 = p0 + 1.0;
    (hi.min(p1) - lo.max(p0)).max(0.0).min(1.0)
}

fn blend_px(dst: [u8; 4], src: [u8; 4], blend: Blend) -> [u8; 4] {
    match blend {
        Blend::Over => {
            let sa = u16::from(src[3]);
            if sa == 0 {
                return dst;
            }
            let inv = 255 - sa;
            let mut out = [0u8; 4];
            for i in 0..4 {
                out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
            }
            out
        }
        Blend::Lighter => {
            let mut out = [0u8; 4];
            for i in 0..4 {
                out[i] = dst[i].saturating_add(src[i]);
            }
            out
        }
        Blend::Screen => {
            let mut out = [0u8; 4];
            for i in 0..4 {
                let s = u16::from(src[i]);
                let d = u16::from(dst[i]);
                out[i] = (s + d - u16::from(mul_div255(s, d))).min(255) as u8;
            }
            out
        }
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn sample_bilinear(frame: &PreparedFrame, sx: f64, sy: f64) -> [u8; 4] {
    let max_x = frame.width.saturating_sub(1) as f64;
    let max_y = frame.height.saturating_sub(1) as f64;
    let fx = (sx - 0.5).clamp(0.0, max_x);
    let fy = (sy - 0.5).clamp(0.0, max_y);
    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(frame.width.saturating_sub(1));
    let y1 = (y0 + 1).min(frame.height.saturating_sub(1));
    let tx = fx - f64::from(x0);
    let ty = fy - f64::from(y0);

    let px = |x: u32, y: u32| -> [f64; 4] {
        let i = ((y as usize * frame.width as usize) + x as usize) * 4;
        let d = &frame.rgba8_premul[i..i + 4];
        [
            f64::from(d[0]),
            f64::from(d[1]),
            f64::from(d[2]),
            f64::from(d[3]),
        ]
    };

    let (a, b, c, d) = (px(x0, y0), px(x1, y0), px(x0, y1), px(x1, y1));
    let mut out = [0u8; 4];
    for i in 0..4 {
        let top = a[i] + (b[i] - a[i]) * tx;
        let bot = c[i] + (d[i] - c[i]) * tx;
        out[i] = (top + (bot - top) * ty).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::assets::PreparedFrame;

    fn solid_frame(w: u32, h: u32, color: [u8; 4]) -> PreparedFrame {
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for _ in 0..w * h {
            data.extend_from_slice(&color);
        }
        PreparedFrame {
            width: w,
            height: h,
            rgba8_premul: Arc::new(data),
        }
    }

    #[test]
    fn backing_store_scales_with_dpr() {
        let s = PixelSurface::new(SurfaceSize::new(100, 50).unwrap(), 2.0).unwrap();
        assert_eq!(s.device_size(), (200, 100));
        assert_eq!(s.css_size().width, 100);
    }

    #[test]
    fn dpr_below_one_is_clamped() {
        let s = PixelSurface::new(SurfaceSize::new(10, 10).unwrap(), 0.5).unwrap();
        assert_eq!(s.device_size(), (10, 10));
    }

    #[test]
    fn over_blend_opaque_src_replaces() {
        assert_eq!(
            blend_px([0, 0, 0, 255], [255, 0, 0, 255], Blend::Over),
            [255, 0, 0, 255]
        );
    }

    #[test]
    fn lighter_blend_saturates() {
        assert_eq!(
            blend_px([200, 10, 0, 200], [100, 10, 0, 100], Blend::Lighter),
            [255, 20, 0, 255]
        );
    }

    #[test]
    fn cover_fills_contain_letterboxes() {
        // Wide frame into a square surface.
        let frame = solid_frame(4, 2, [255, 255, 255, 255]);
        let size = SurfaceSize::new(40, 40).unwrap();

        let mut cover = PixelSurface::new(size, 1.0).unwrap();
        cover.blit_frame(&frame, FitMode::Cover);
        assert_eq!(cover.pixel_at_css(20.0, 1.0)[3], 255);
        assert_eq!(cover.pixel_at_css(20.0, 39.0)[3], 255);

        let mut contain = PixelSurface::new(size, 1.0).unwrap();
        contain.blit_frame(&frame, FitMode::Contain);
        // Letterboxed: top band empty, center filled.
        assert_eq!(contain.pixel_at_css(20.0, 2.0)[3], 0);
        assert_eq!(contain.pixel_at_css(20.0, 20.0)[3], 255);
    }

    #[test]
    fn feathered_vline_is_transparent_at_ends() {
        let mut s = PixelSurface::new(SurfaceSize::new(20, 100).unwrap(), 1.0).unwrap();
        s.stroke_vline(
            10.0,
            0.0,
            100.0,
            2.0,
            Rgba8::opaque(120, 140, 180),
            Some((0.15, 0.85)),
            Blend::Over,
        );
        let end = s.pixel_at_css(10.0, 0.0)[3];
        let mid = s.pixel_at_css(10.0, 50.0)[3];
        assert!(mid > 200, "mid alpha {mid}");
        assert!(end < 30, "end alpha {end}");
    }

    #[test]
    fn composite_over_requires_matching_dims() {
        let mut a = PixelSurface::new(SurfaceSize::new(10, 10).unwrap(), 1.0).unwrap();
        let b = PixelSurface::new(SurfaceSize::new(11, 10).unwrap(), 1.0).unwrap();
        assert!(a.composite_over(&b).is_err());
    }

    #[test]
    fn stops_sampling_interpolates_midpoint() {
        let stops = [
            (0.0, Rgba8::new(0, 0, 0, 0)),
            (1.0, Rgba8::new(0, 0, 0, 200)),
        ];
        assert_eq!(sample_stops(&stops, 0.5).a, 100);
    }
}

use crate::error::{MotionError, MotionResult};

pub use kurbo::{Point, Rect, Vec2};

/// Surface extent in CSS pixels. The physical backing store is this size
/// multiplied by the device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> MotionResult<Self> {
        if width == 0 || height == 0 {
            return Err(MotionError::validation("surface width/height must be > 0"));
        }
        Ok(Self { width, height })
    }

    /// Measured container sizes can be zero mid-layout; clamp to floors so
    /// no zero-area backing store is ever allocated.
    pub fn floored(width: f64, height: f64, min_width: u32, min_height: u32) -> Self {
        Self {
            width: (width.max(0.0) as u32).max(min_width.max(1)),
            height: (height.max(0.0) as u32).max(min_height.max(1)),
        }
    }
}

/// Host viewport in CSS pixels, used for scroll-range math.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> MotionResult<Self> {
        if !(width > 0.0) || !(height > 0.0) {
            return Err(MotionError::validation("viewport width/height must be > 0"));
        }
        Ok(Self { width, height })
    }
}

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Self = Self::opaque(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parses `#rgb` or `#rrggbb` (leading `#` optional).
    pub fn from_hex(hex: &str) -> MotionResult<Self> {
        let c = hex.strip_prefix('#').unwrap_or(hex);
        let (r, g, b) = match c.len() {
            3 => {
                let d = |i: usize| -> MotionResult<u8> {
                    let v = u8::from_str_radix(&c[i..i + 1], 16)
                        .map_err(|_| MotionError::validation(format!("bad hex color '{hex}'")))?;
                    Ok(v * 17)
                };
                (d(0)?, d(1)?, d(2)?)
            }
            6 => {
                let d = |i: usize| -> MotionResult<u8> {
                    u8::from_str_radix(&c[i..i + 2], 16)
                        .map_err(|_| MotionError::validation(format!("bad hex color '{hex}'")))
                };
                (d(0)?, d(2)?, d(4)?)
            }
            _ => return Err(MotionError::validation(format!("bad hex color '{hex}'"))),
        };
        Ok(Self::opaque(r, g, b))
    }

    /// Scales the alpha channel by `t` in [0,1].
    pub fn with_alpha(self, t: f64) -> Self {
        let a = (f64::from(self.a) * t.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    /// Premultiplied representation used by the pixel surface.
    pub fn to_premul(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            ((u16::from(c) * u16::from(a) + 127) / 255) as u8
        }
        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }

    pub fn lerp(a: Self, b: Self, t: f64) -> Self {
        fn mix(a: u8, b: u8, t: f64) -> u8 {
            (f64::from(a) + (f64::from(b) - f64::from(a)) * t)
                .round()
                .clamp(0.0, 255.0) as u8
        }
        let t = t.clamp(0.0, 1.0);
        Self {
            r: mix(a.r, b.r, t),
            g: mix(a.g, b.g, t),
            b: mix(a.b, b.b, t),
            a: mix(a.a, b.a, t),
        }
    }
}

pub fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Wraps `v` into `[min, max)`. Idempotent: `wrap(min, max, wrap(min, max, v))
/// == wrap(min, max, v)`.
pub fn wrap(min: f64, max: f64, v: f64) -> f64 {
    let range = max - min;
    (((v - min) % range) + range) % range + min
}

/// SplitMix64 stream. Deterministic for a given seed, which keeps the
/// stochastic effects replayable in tests.
#[derive(Clone, Copy, Debug)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    pub fn range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    pub fn pick_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (self.next_f64() * len as f64) as usize % len
    }
}

//! CPU-side engine for the site's scroll-driven visual effects.
//!
//! Everything here is deterministic and host-agnostic: the embedding page
//! feeds scroll, resize and visibility events in through [`stage::HostEvent`]
//! and blits the resulting premultiplied-RGBA8 surfaces. No module performs
//! IO; frame bytes are decoded via [`assets::decode_frame`] and handed in.
//!
//! The three core effects are the scroll-pinned frame scrubber
//! ([`scrubber::SequenceScrubber`]), the layered grid-and-beam background
//! ([`gridbeam::GridBeamRenderer`]) and the scroll-velocity marquee
//! ([`marquee::VelocityMarquee`]).

#![forbid(unsafe_code)]

pub mod assets;
pub mod catalog;
pub mod contact;
pub mod core;
pub mod error;
pub mod gridbeam;
pub mod marquee;
pub mod particles;
pub mod scrubber;
pub mod signal;
pub mod splash;
pub mod stage;
pub mod surface;

pub use crate::{
    assets::{PreparedFrame, decode_frame},
    core::{Rgba8, SurfaceSize, Viewport},
    error::{MotionError, MotionResult},
    gridbeam::{GridBeamConfig, GridBeamRenderer},
    marquee::{MarqueeRowConfig, VelocityMarquee},
    scrubber::{ScrubberConfig, SequenceScrubber},
    signal::MotionProfile,
    stage::{Effect, HostEvent, Stage},
    surface::{FitMode, PixelSurface},
};

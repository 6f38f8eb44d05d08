//! Sample-level processing: gain with saturating clip, mono → stereo
//! fan-out, and level metering.
//!
//! Everything here is pure and synchronous. None of it blocks or fails.

pub mod level;
pub mod transform;

pub use level::LevelMeter;
pub use transform::{clip, FrameTransform};

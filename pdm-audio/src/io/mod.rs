//! Peripheral boundary of the pipeline.
//!
//! The loop talks to hardware through exactly two traits: [`FrameSource`]
//! (capture one mono frame) and [`FrameSink`] (emit one frame). Everything
//! else in this module adapts concrete transports to them.
//!
//! ## Components
//!
//! | Type | Implements | Description |
//! |------|------------|-------------|
//! | [`DmaFrameSource`] | [`FrameSource`] | Blocking read from a DMA-backed receive queue |
//! | [`DmaFrameSink`] | [`FrameSink`] | Blocking write to a DMA-backed transmit queue |
//! | [`SerialFrameSink`] | [`FrameSink`] | Raw little-endian samples on a byte stream |
//! | [`LevelTelemetrySink`] | [`FrameSink`] | One mean-level text line per frame |
//! | [`NullSink`] | [`FrameSink`] | Discards frames (capture-only operation) |
//! | [`FrameQueue`] | | Lock-free frame ring shared with DMA interrupt handlers |
//!
//! ## Utilities
//!
//! - [`interleave`]: packing between sample frames and 32-bit I2S DMA words
//! - [`isr`]: interrupt-side helpers that move DMA buffers in and out of a [`FrameQueue`]
//!
//! ## Blocking
//!
//! `capture` and `emit` are the only calls in the loop that may block. How
//! long they wait is a [`WaitLimit`] chosen when the adapter is built:
//! [`WaitLimit::Forever`] in firmware, a bounded wait in tests.

use crate::config::PeripheralConfig;
use crate::error::{CaptureError, EmitError, PeripheralError};

pub mod dma;
pub mod interleave;
pub mod isr;
pub mod queue;
pub mod serial;

pub use dma::{DmaFrameSink, DmaFrameSource, DmaRx, DmaTx};
pub use queue::{FrameQueue, QueueRx, QueueTx};
pub use serial::{LevelTelemetrySink, NullSink, SerialFrameSink};

/// Upper bound on how long a blocking peripheral call may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitLimit {
    /// Wait until data or space is available, however long that takes.
    Forever,
    /// Give up after roughly this many microseconds.
    Micros(u32),
}

impl WaitLimit {
    /// Whether a caller that has already waited `waited_us` may wait `step_us` more.
    pub fn allows(&self, waited_us: u32, step_us: u32) -> bool {
        match *self {
            WaitLimit::Forever => true,
            WaitLimit::Micros(limit) => waited_us.saturating_add(step_us) <= limit,
        }
    }
}

/// Capture side of the loop: fills one mono frame per call.
pub trait FrameSource {
    /// Bring up the capture peripheral. Called once, before the first cycle.
    fn configure(&mut self, config: &PeripheralConfig) -> Result<(), PeripheralError>;

    /// Block until a frame is available and copy it into `dest`.
    ///
    /// Returns the number of samples filled. Anything other than
    /// `dest.len()` is an underrun/overrun the caller treats as a skipped
    /// cycle.
    fn capture(&mut self, dest: &mut [i16]) -> Result<usize, CaptureError>;
}

/// Emit side of the loop: hands one frame to its destination per call.
pub trait FrameSink {
    /// Bring up the output peripheral. Called once, before the first cycle.
    fn configure(&mut self, config: &PeripheralConfig) -> Result<(), PeripheralError>;

    /// Block until `frame` has been fully accepted.
    ///
    /// Returns the bytes written. A destination that accepts only part of
    /// the output reports [`EmitError::Short`] instead.
    fn emit(&mut self, frame: &[i16]) -> Result<usize, EmitError>;
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn configure(&mut self, config: &PeripheralConfig) -> Result<(), PeripheralError> {
        (**self).configure(config)
    }

    fn capture(&mut self, dest: &mut [i16]) -> Result<usize, CaptureError> {
        (**self).capture(dest)
    }
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn configure(&mut self, config: &PeripheralConfig) -> Result<(), PeripheralError> {
        (**self).configure(config)
    }

    fn emit(&mut self, frame: &[i16]) -> Result<usize, EmitError> {
        (**self).emit(frame)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_limit_bounds() {
        assert!(WaitLimit::Forever.allows(u32::MAX, 100));
        assert!(WaitLimit::Micros(100).allows(0, 100));
        assert!(WaitLimit::Micros(100).allows(50, 50));
        assert!(!WaitLimit::Micros(100).allows(50, 51));
        assert!(!WaitLimit::Micros(0).allows(0, 1));
    }
}

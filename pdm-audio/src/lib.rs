//! # pdm-audio
//!
//! A `no_std`, zero-allocation capture → transform → emit loop for PDM
//! microphones on small microcontrollers. One frame of mono samples is
//! captured from a DMA-backed receiver, scaled by a fixed gain with a
//! saturating clip, optionally fanned out to interleaved stereo, and handed
//! to a DMA-backed transmitter or a serial byte stream. Every cycle is
//! timestamped, and an end-to-end latency estimate is reported once per
//! reporting period.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Config | [`config`] / [`constants`] | `PipelineConfig`, defaults, validation |
//! | Errors | [`error`] | Startup failures and per-cycle faults |
//! | Time | [`time`] | `MonotonicClock`, `Instant`, DWT cycle counter (feature-gated) |
//! | DSP | [`dsp`] | Gain + saturating clip, stereo fan-out, level metering |
//! | I/O | [`io`] | `FrameSource`/`FrameSink`, DMA adapters, frame queues, serial sinks |
//! | Latency | [`latency`] | Stage timing and throttled latency reports |
//! | Loop | [`pipeline`] | [`pipeline::boot`] and the per-cycle driver |
//!
//! ## Quick start
//!
//! ```ignore
//! use pdm_audio::config::PipelineConfig;
//! use pdm_audio::io::{DmaFrameSource, FrameQueue, QueueRx, SerialFrameSink, WaitLimit};
//! use pdm_audio::pipeline::boot;
//! use pdm_audio::time::DwtClock;
//!
//! static RX: FrameQueue<256, 5> = FrameQueue::new();
//!
//! let config = PipelineConfig::new().with_gain(4.0).with_serial_baud(1_500_000);
//! let source = DmaFrameSource::new(QueueRx::new(&RX, delay, 50), WaitLimit::Forever);
//! let sink = SerialFrameSink::new(uart);
//!
//! // In the PDM DMA interrupt:
//! //     assembler.isr(completed_half, &RX);
//!
//! match boot::<_, _, _, 256>(config, source, sink, DwtClock::new(dcb, dwt, 240_000_000)) {
//!     Ok(mut pipeline) => pipeline.run(),
//!     Err(_) => loop { cortex_m::asm::wfi() },
//! }
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `cortex-m` | no | [`time::DwtClock`] backed by the Cortex-M cycle counter |
//! | `defmt` | no | `defmt::Format` for config, errors and reports |
//!
//! ## Audio parameters
//!
//! - **Frame size:** 256 samples by default ([`constants::DEFAULT_FRAME_SAMPLES`]), at most 1024
//! - **Sample rate:** 48 kHz by default ([`constants::DEFAULT_SAMPLE_RATE_HZ`])
//! - **Sample format:** `i16` (signed 16-bit)
//! - **Logging:** through the [`log`] facade; the application installs the backend

#![no_std]

pub mod config;
pub mod constants;
pub mod dsp;
pub mod error;
pub mod io;
pub mod latency;
pub mod pipeline;
pub mod time;

#[cfg(test)]
mod test_support;

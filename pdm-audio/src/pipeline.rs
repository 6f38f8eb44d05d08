//! The capture → transform → emit loop.
//!
//! [`boot`] brings both peripherals up and returns a [`Pipeline`] that owns
//! them. Each [`run_cycle`](Pipeline::run_cycle) then performs exactly one
//! strictly sequential cycle:
//!
//! ```text
//! capture (blocks) ─► transform ─► emit (blocks) ─► latency bookkeeping
//! ```
//!
//! Cycle N's emit always finishes, or is abandoned, before cycle N+1's
//! capture starts. The frame buffers live inside the `Pipeline` and are
//! reused every cycle, so the loop never allocates.
//!
//! ## Usage
//!
//! ```ignore
//! static RX: FrameQueue<256, 5> = FrameQueue::new();
//! static TX: FrameQueue<512, 5> = FrameQueue::new();
//!
//! let config = PipelineConfig::new().with_output_layout(ChannelLayout::Stereo);
//! let source = DmaFrameSource::new(QueueRx::new(&RX, delay_rx, 50), WaitLimit::Forever);
//! let sink = DmaFrameSink::new(QueueTx::new(&TX, delay_tx, 50), WaitLimit::Forever);
//!
//! match boot::<_, _, _, 256>(config, source, sink, DwtClock::new(dcb, dwt, 600_000_000)) {
//!     Ok(mut pipeline) => pipeline.run(),
//!     Err(_) => loop { cortex_m::asm::wfi() },
//! }
//! ```

use log::{error, info, warn};

use crate::config::{ChannelLayout, PipelineConfig};
use crate::dsp::FrameTransform;
use crate::error::{CaptureError, ConfigError, CycleFault, StartupFailure};
use crate::io::{FrameSink, FrameSource};
use crate::latency::{CycleTimestamps, LatencyReport, LatencyTracker};
use crate::time::MonotonicClock;

/// Result of one loop cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// The frame was captured, transformed and emitted. Carries a report
    /// when a reporting period ended with this cycle.
    Completed(Option<LatencyReport>),
    /// The cycle was abandoned. Nothing was reported for it.
    Skipped(CycleFault),
}

/// Running loop context for frames of `N` mono samples.
pub struct Pipeline<Src, Snk, C, const N: usize> {
    config: PipelineConfig,
    source: Src,
    sink: Snk,
    clock: C,
    transform: FrameTransform,
    tracker: LatencyTracker,
    mono: [i16; N],
    stereo: [[i16; 2]; N],
}

/// Validate `config`, configure both peripherals and start the loop clock.
///
/// On failure exactly one error line naming the failed stage is logged and
/// the failure is returned; what happens next (halt, retry, report) is up
/// to the caller.
pub fn boot<Src, Snk, C, const N: usize>(
    config: PipelineConfig,
    source: Src,
    sink: Snk,
    clock: C,
) -> Result<Pipeline<Src, Snk, C, N>, StartupFailure>
where
    Src: FrameSource,
    Snk: FrameSink,
    C: MonotonicClock,
{
    let result = bring_up(config, source, sink, clock);
    match &result {
        Ok(_) => {
            info!("sample rate: {} Hz", config.sample_rate_hz);
            info!(
                "frame: {} samples ({} out), {:.3} ms nominal",
                N,
                N * config.output_layout.channels(),
                config.nominal_frame_ms()
            );
        }
        Err(e) => error!("startup halted at {} stage: {}", e.stage(), e),
    }
    result
}

fn bring_up<Src, Snk, C, const N: usize>(
    config: PipelineConfig,
    mut source: Src,
    mut sink: Snk,
    mut clock: C,
) -> Result<Pipeline<Src, Snk, C, N>, StartupFailure>
where
    Src: FrameSource,
    Snk: FrameSink,
    C: MonotonicClock,
{
    config.validate()?;
    if config.frame_samples != N {
        return Err(ConfigError::FrameSizeMismatch {
            configured: config.frame_samples,
            buffer: N,
        }
        .into());
    }

    source
        .configure(&config.input_peripheral())
        .map_err(StartupFailure::Input)?;
    sink.configure(&config.output_peripheral())
        .map_err(StartupFailure::Output)?;

    let tracker = LatencyTracker::new(&config, clock.now());
    Ok(Pipeline {
        config,
        source,
        sink,
        clock,
        transform: FrameTransform::new(config.gain),
        tracker,
        mono: [0; N],
        stereo: [[0; 2]; N],
    })
}

impl<Src, Snk, C, const N: usize> Pipeline<Src, Snk, C, N>
where
    Src: FrameSource,
    Snk: FrameSink,
    C: MonotonicClock,
{
    /// Run one capture → transform → emit cycle.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let capture_start = self.clock.now();
        match self.source.capture(&mut self.mono) {
            Ok(got) if got == N => {}
            Ok(got) => return self.skip(CaptureError::Short { expected: N, got }.into()),
            Err(e) => return self.skip(e.into()),
        }
        let capture_end = self.clock.now();

        let frame: &[i16] = match self.config.output_layout {
            ChannelLayout::Mono => {
                self.transform.apply_in_place(&mut self.mono);
                &self.mono
            }
            ChannelLayout::Stereo => {
                self.transform.apply_stereo(&self.mono, &mut self.stereo);
                self.stereo.as_flattened()
            }
        };
        let transform_end = self.clock.now();

        if let Err(e) = self.sink.emit(frame) {
            return self.skip(e.into());
        }
        let emit_end = self.clock.now();

        let report = self.tracker.mark_cycle(&CycleTimestamps {
            capture_start,
            capture_end,
            transform_end,
            emit_end,
        });
        if let Some(report) = &report {
            info!("{}", report);
        }
        CycleOutcome::Completed(report)
    }

    /// Loop forever. Faults are logged by [`run_cycle`](Self::run_cycle) and absorbed.
    pub fn run(&mut self) -> ! {
        loop {
            let _ = self.run_cycle();
        }
    }

    fn skip(&mut self, fault: CycleFault) -> CycleOutcome {
        warn!("cycle skipped: {}", fault);
        self.tracker.note_skipped();
        CycleOutcome::Skipped(fault)
    }
}

impl<Src, Snk, C, const N: usize> Pipeline<Src, Snk, C, N> {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn source(&self) -> &Src {
        &self.source
    }

    pub fn sink(&self) -> &Snk {
        &self.sink
    }

    /// Tear the loop down and hand the peripherals and clock back.
    pub fn into_parts(self) -> (Src, Snk, C) {
        (self.source, self.sink, self.clock)
    }
}

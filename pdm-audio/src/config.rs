//! Process-wide pipeline configuration.
//!
//! A [`PipelineConfig`] is fixed before the loop starts and never changes
//! afterwards. Build one from [`PipelineConfig::new()`] and the `with_*`
//! methods, then let [`boot`](crate::pipeline::boot) validate it:
//!
//! ```
//! use pdm_audio::config::{ChannelLayout, PipelineConfig};
//!
//! let config = PipelineConfig::new()
//!     .with_sample_rate(44_100)
//!     .with_frame_samples(8)
//!     .with_gain(3.0)
//!     .with_output_layout(ChannelLayout::Stereo);
//! assert!(config.validate().is_ok());
//! ```

use crate::constants::{
    BITS_PER_SAMPLE, BYTES_PER_SAMPLE, DEFAULT_DMA_BUFFER_COUNT, DEFAULT_DOWNSTREAM_LATENCY_MS,
    DEFAULT_FRAME_SAMPLES, DEFAULT_REPORT_PERIOD_MS, DEFAULT_SAMPLE_RATE_HZ,
    MAX_DMA_FRAME_SAMPLES, UART_BITS_PER_BYTE,
};
use crate::error::ConfigError;

/// Channel arrangement of a frame on the output side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelLayout {
    /// One sample per frame slot.
    Mono,
    /// Interleaved `L R L R ...`, each mono sample duplicated into both slots.
    Stereo,
}

impl ChannelLayout {
    /// Samples per frame slot.
    pub const fn channels(self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }
}

/// Which figures the periodic status line shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusStyle {
    /// Capture-wait, transform and emit-wait times.
    Stages,
    /// Nominal frame duration and estimated end-to-end latency.
    Totals,
}

/// Parameters handed to the peripheral configuration boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeripheralConfig {
    pub sample_rate_hz: u32,
    pub bits_per_sample: u8,
    pub channels: u8,
    pub frame_samples: usize,
    pub dma_buffer_count: usize,
    /// Derive the sample clock from the audio PLL rather than the main clock tree.
    pub high_precision_clock: bool,
}

/// Immutable configuration of one capture/process/emit path.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipelineConfig {
    pub sample_rate_hz: u32,
    /// Mono samples per cycle. One DMA descriptor holds exactly one frame.
    pub frame_samples: usize,
    pub dma_buffer_count: usize,
    /// Multiplier applied before the saturating clip. `1.0` passes samples through.
    pub gain: f32,
    pub output_layout: ChannelLayout,
    /// Inherent processing delay of the output device, in milliseconds.
    pub fixed_downstream_latency_ms: f32,
    pub report_period_ms: u32,
    pub status_style: StatusStyle,
    pub high_precision_clock: bool,
    /// Baud rate of the host serial link, when the output is a byte stream.
    pub serial_baud: Option<u32>,
}

impl PipelineConfig {
    /// Defaults: 48 kHz, 256-sample mono frames, unity gain, 1 s reports.
    pub const fn new() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            frame_samples: DEFAULT_FRAME_SAMPLES,
            dma_buffer_count: DEFAULT_DMA_BUFFER_COUNT,
            gain: 1.0,
            output_layout: ChannelLayout::Mono,
            fixed_downstream_latency_ms: DEFAULT_DOWNSTREAM_LATENCY_MS,
            report_period_ms: DEFAULT_REPORT_PERIOD_MS,
            status_style: StatusStyle::Stages,
            high_precision_clock: true,
            serial_baud: None,
        }
    }

    pub const fn with_sample_rate(mut self, hz: u32) -> Self {
        self.sample_rate_hz = hz;
        self
    }

    pub const fn with_frame_samples(mut self, samples: usize) -> Self {
        self.frame_samples = samples;
        self
    }

    pub const fn with_dma_buffer_count(mut self, count: usize) -> Self {
        self.dma_buffer_count = count;
        self
    }

    pub const fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    pub const fn with_output_layout(mut self, layout: ChannelLayout) -> Self {
        self.output_layout = layout;
        self
    }

    pub const fn with_downstream_latency_ms(mut self, ms: f32) -> Self {
        self.fixed_downstream_latency_ms = ms;
        self
    }

    pub const fn with_report_period_ms(mut self, ms: u32) -> Self {
        self.report_period_ms = ms;
        self
    }

    pub const fn with_status_style(mut self, style: StatusStyle) -> Self {
        self.status_style = style;
        self
    }

    pub const fn with_high_precision_clock(mut self, enabled: bool) -> Self {
        self.high_precision_clock = enabled;
        self
    }

    /// Declare that frames leave over a serial link at `baud`.
    pub const fn with_serial_baud(mut self, baud: u32) -> Self {
        self.serial_baud = Some(baud);
        self
    }

    /// Time one frame represents: `frame_samples / sample_rate_hz`, in ms.
    pub fn nominal_frame_ms(&self) -> f32 {
        self.frame_samples as f32 / self.sample_rate_hz as f32 * 1000.0
    }

    /// How long the input DMA chain can absorb a stalled loop before frames are lost.
    pub fn dma_headroom_ms(&self) -> f32 {
        self.nominal_frame_ms() * self.dma_buffer_count as f32
    }

    /// Byte rate of the output stream.
    pub fn stream_bytes_per_sec(&self) -> u32 {
        self.sample_rate_hz
            .saturating_mul(self.output_layout.channels() as u32)
            .saturating_mul(BYTES_PER_SAMPLE as u32)
    }

    /// Settings for the capture peripheral. PDM capture is always mono.
    pub fn input_peripheral(&self) -> PeripheralConfig {
        self.peripheral(ChannelLayout::Mono)
    }

    /// Settings for the output peripheral.
    pub fn output_peripheral(&self) -> PeripheralConfig {
        self.peripheral(self.output_layout)
    }

    fn peripheral(&self, layout: ChannelLayout) -> PeripheralConfig {
        PeripheralConfig {
            sample_rate_hz: self.sample_rate_hz,
            bits_per_sample: BITS_PER_SAMPLE,
            channels: layout.channels() as u8,
            frame_samples: self.frame_samples,
            dma_buffer_count: self.dma_buffer_count,
            high_precision_clock: self.high_precision_clock,
        }
    }

    /// Check that the loop can run with these settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.frame_samples == 0 || self.frame_samples > MAX_DMA_FRAME_SAMPLES {
            return Err(ConfigError::FrameSize {
                samples: self.frame_samples,
                max: MAX_DMA_FRAME_SAMPLES,
            });
        }
        if self.dma_buffer_count < 2 {
            return Err(ConfigError::DmaBufferCount(self.dma_buffer_count));
        }
        if !self.gain.is_finite() {
            return Err(ConfigError::InvalidGain);
        }
        if self.report_period_ms == 0 {
            return Err(ConfigError::ZeroReportPeriod);
        }
        if !self.fixed_downstream_latency_ms.is_finite() || self.fixed_downstream_latency_ms < 0.0
        {
            return Err(ConfigError::InvalidDownstreamLatency);
        }
        if let Some(baud) = self.serial_baud {
            let required_bps = self.stream_bytes_per_sec().saturating_mul(UART_BITS_PER_BYTE);
            if required_bps > baud {
                return Err(ConfigError::SerialBandwidth { required_bps, baud });
            }
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

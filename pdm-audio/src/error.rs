//! Error types for pipeline bring-up and per-cycle faults.
//!
//! Bring-up failures ([`StartupFailure`]) are terminal: the pipeline never
//! starts. Per-cycle faults ([`CycleFault`]) are recoverable: the loop logs
//! them, abandons the rest of that cycle and carries on with the next one.

use core::fmt;

use thiserror::Error;

/// Stage of bring-up that rejected its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetupStage {
    /// Validation of [`PipelineConfig`](crate::config::PipelineConfig).
    Config,
    /// Capture peripheral (PDM receiver + DMA).
    Input,
    /// Output peripheral (DAC/I2S transmitter or serial port).
    Output,
}

impl fmt::Display for SetupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetupStage::Config => "config",
            SetupStage::Input => "input",
            SetupStage::Output => "output",
        };
        f.write_str(name)
    }
}

/// Integer status code reported by a peripheral driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("peripheral status {code:#x}")]
pub struct PeripheralError {
    pub code: i32,
}

impl PeripheralError {
    /// Generic failure.
    pub const FAIL: Self = Self::new(-1);
    /// A parameter the peripheral cannot accept.
    pub const INVALID_ARG: Self = Self::new(0x102);
    /// A buffer whose length does not match the configured frame.
    pub const INVALID_SIZE: Self = Self::new(0x104);
    /// The peripheral did not respond in time.
    pub const TIMEOUT: Self = Self::new(0x107);

    pub const fn new(code: i32) -> Self {
        Self { code }
    }
}

/// A [`PipelineConfig`](crate::config::PipelineConfig) that cannot run.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,
    #[error("frame of {samples} samples is outside 1..={max}")]
    FrameSize { samples: usize, max: usize },
    #[error("config frame size {configured} does not match buffer size {buffer}")]
    FrameSizeMismatch { configured: usize, buffer: usize },
    #[error("need at least 2 DMA buffers, got {0}")]
    DmaBufferCount(usize),
    #[error("gain must be finite")]
    InvalidGain,
    #[error("report period must be non-zero")]
    ZeroReportPeriod,
    #[error("downstream latency must be finite and non-negative")]
    InvalidDownstreamLatency,
    #[error("stream needs {required_bps} bit/s but serial runs at {baud} baud")]
    SerialBandwidth { required_bps: u32, baud: u32 },
}

/// A capture call that did not produce exactly one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureError {
    #[error("capture driver: {0}")]
    Peripheral(#[from] PeripheralError),
    /// Underrun or overrun: the driver filled `got` samples instead of `expected`.
    #[error("captured {got} of {expected} samples")]
    Short { expected: usize, got: usize },
    /// The driver reported a byte count that is not a whole number of samples.
    #[error("captured {bytes} bytes, not a whole number of samples")]
    Misaligned { bytes: usize },
}

/// An emit call that did not hand the whole frame to its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EmitError {
    #[error("emit driver: {0}")]
    Peripheral(#[from] PeripheralError),
    /// Partial write, counted in bytes.
    #[error("emitted {got} of {expected} bytes")]
    Short { expected: usize, got: usize },
}

/// Recoverable fault that abandoned one loop cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleFault {
    #[error("capture: {0}")]
    Capture(#[from] CaptureError),
    #[error("emit: {0}")]
    Emit(#[from] EmitError),
}

/// Terminal bring-up failure. No cycle runs after this.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartupFailure {
    #[error("config rejected: {0}")]
    Config(#[from] ConfigError),
    #[error("input setup failed: {0}")]
    Input(PeripheralError),
    #[error("output setup failed: {0}")]
    Output(PeripheralError),
}

impl StartupFailure {
    /// The bring-up stage that failed.
    pub fn stage(&self) -> SetupStage {
        match self {
            StartupFailure::Config(_) => SetupStage::Config,
            StartupFailure::Input(_) => SetupStage::Input,
            StartupFailure::Output(_) => SetupStage::Output,
        }
    }
}

//! DMA-backed frame source and sink.
//!
//! [`DmaRx`] and [`DmaTx`] are the driver-level contract: move samples
//! between a caller buffer and a DMA-managed queue, blocking up to a
//! [`WaitLimit`], and report how many **bytes** moved. That mirrors how I2S
//! drivers report reads and writes, and it is where short transfers become
//! visible. [`DmaFrameSource`] and [`DmaFrameSink`] lift that contract to
//! whole frames.
//!
//! ```text
//! PDM mic ─► DMA descriptors ─► DmaRx ─► DmaFrameSource ─► loop
//! loop ─► DmaFrameSink ─► DmaTx ─► DMA descriptors ─► DAC / I2S
//! ```

use super::{FrameSink, FrameSource, WaitLimit};
use crate::config::PeripheralConfig;
use crate::constants::BYTES_PER_SAMPLE;
use crate::error::{CaptureError, EmitError, PeripheralError};

/// Receive half of a DMA-backed audio peripheral.
pub trait DmaRx {
    fn configure(&mut self, config: &PeripheralConfig) -> Result<(), PeripheralError>;

    /// Copy the next completed DMA buffer into `dest`.
    ///
    /// Returns the number of bytes written into `dest`; `0` when `wait`
    /// expired before any data arrived.
    fn read(&mut self, dest: &mut [i16], wait: WaitLimit) -> Result<usize, PeripheralError>;
}

/// Transmit half of a DMA-backed audio peripheral.
pub trait DmaTx {
    fn configure(&mut self, config: &PeripheralConfig) -> Result<(), PeripheralError>;

    /// Queue `src` for transmission.
    ///
    /// Returns the number of bytes accepted; `0` when `wait` expired before
    /// space became free.
    fn write(&mut self, src: &[i16], wait: WaitLimit) -> Result<usize, PeripheralError>;
}

/// [`FrameSource`] reading whole frames from a [`DmaRx`].
pub struct DmaFrameSource<R> {
    rx: R,
    wait: WaitLimit,
}

impl<R: DmaRx> DmaFrameSource<R> {
    pub fn new(rx: R, wait: WaitLimit) -> Self {
        DmaFrameSource { rx, wait }
    }

    pub fn into_inner(self) -> R {
        self.rx
    }
}

impl<R: DmaRx> FrameSource for DmaFrameSource<R> {
    fn configure(&mut self, config: &PeripheralConfig) -> Result<(), PeripheralError> {
        self.rx.configure(config)
    }

    fn capture(&mut self, dest: &mut [i16]) -> Result<usize, CaptureError> {
        let bytes = self.rx.read(dest, self.wait)?;
        if bytes % BYTES_PER_SAMPLE != 0 {
            return Err(CaptureError::Misaligned { bytes });
        }
        Ok(bytes / BYTES_PER_SAMPLE)
    }
}

/// [`FrameSink`] writing whole frames to a [`DmaTx`].
///
/// Frames arrive already in the output layout (mono, or interleaved stereo).
pub struct DmaFrameSink<T> {
    tx: T,
    wait: WaitLimit,
}

impl<T: DmaTx> DmaFrameSink<T> {
    pub fn new(tx: T, wait: WaitLimit) -> Self {
        DmaFrameSink { tx, wait }
    }

    pub fn into_inner(self) -> T {
        self.tx
    }
}

impl<T: DmaTx> FrameSink for DmaFrameSink<T> {
    fn configure(&mut self, config: &PeripheralConfig) -> Result<(), PeripheralError> {
        self.tx.configure(config)
    }

    fn emit(&mut self, frame: &[i16]) -> Result<usize, EmitError> {
        let expected = frame.len() * BYTES_PER_SAMPLE;
        let got = self.tx.write(frame, self.wait)?;
        if got != expected {
            return Err(EmitError::Short { expected, got });
        }
        Ok(got)
    }
}

//! Byte-stream sinks for a host-facing serial link.
//!
//! [`SerialFrameSink`] sends raw little-endian `i16` samples back to back:
//! no header, no checksum. The host must know the sample rate and frame size
//! out of band. At high sample rates this stream can outrun the UART, which
//! is why [`PipelineConfig::validate`](crate::config::PipelineConfig::validate)
//! checks the serial bandwidth when a baud rate is configured.
//!
//! [`LevelTelemetrySink`] sends one text line per frame with the mean absolute
//! amplitude instead, which fits any baud rate.

use core::fmt::{self, Write as _};

use embedded_io::{ErrorKind, Write};

use super::FrameSink;
use crate::config::PeripheralConfig;
use crate::constants::BYTES_PER_SAMPLE;
use crate::dsp::LevelMeter;
use crate::error::{EmitError, PeripheralError};

/// Bytes encoded per write call.
const CHUNK_BYTES: usize = 64;

/// Encode samples as little-endian bytes into `out`.
///
/// Returns the number of bytes written, `2 * samples.len()`.
///
/// # Panics
///
/// Panics if `out` is shorter than `2 * samples.len()`.
pub fn encode_le(samples: &[i16], out: &mut [u8]) -> usize {
    let n = samples.len() * BYTES_PER_SAMPLE;
    for (dst, s) in out[..n].chunks_exact_mut(BYTES_PER_SAMPLE).zip(samples) {
        dst.copy_from_slice(&s.to_le_bytes());
    }
    n
}

fn io_error<E: embedded_io::Error>(err: E) -> PeripheralError {
    match err.kind() {
        ErrorKind::TimedOut => PeripheralError::TIMEOUT,
        ErrorKind::InvalidInput => PeripheralError::INVALID_ARG,
        _ => PeripheralError::FAIL,
    }
}

/// Write all of `bytes`, adding to `written`. A zero-length write is a short write.
fn write_counted<W: Write>(
    writer: &mut W,
    bytes: &[u8],
    written: &mut usize,
    expected: usize,
) -> Result<(), EmitError> {
    let mut rest = bytes;
    while !rest.is_empty() {
        match writer.write(rest) {
            Ok(0) => {
                return Err(EmitError::Short {
                    expected,
                    got: *written,
                })
            }
            Ok(n) => {
                *written += n;
                rest = &rest[n..];
            }
            Err(e) => return Err(io_error(e).into()),
        }
    }
    Ok(())
}

/// Raw sample stream over any [`embedded_io::Write`] (UART, USB CDC, ...).
///
/// There is no [`WaitLimit`](super::WaitLimit) here: how long `emit` may
/// block is bounded by the writer. A writer that gives up should return
/// `Ok(0)` (reported as [`EmitError::Short`]) or an
/// [`ErrorKind::TimedOut`] error (reported as [`PeripheralError::TIMEOUT`]).
pub struct SerialFrameSink<W> {
    writer: W,
}

impl<W: Write> SerialFrameSink<W> {
    pub fn new(writer: W) -> Self {
        SerialFrameSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameSink for SerialFrameSink<W> {
    fn configure(&mut self, _config: &PeripheralConfig) -> Result<(), PeripheralError> {
        Ok(())
    }

    fn emit(&mut self, frame: &[i16]) -> Result<usize, EmitError> {
        let expected = frame.len() * BYTES_PER_SAMPLE;
        let mut written = 0;
        let mut buf = [0u8; CHUNK_BYTES];

        for chunk in frame.chunks(CHUNK_BYTES / BYTES_PER_SAMPLE) {
            let n = encode_le(chunk, &mut buf);
            write_counted(&mut self.writer, &buf[..n], &mut written, expected)?;
        }
        self.writer.flush().map_err(io_error)?;
        Ok(written)
    }
}

/// Fixed-capacity text buffer for formatting without allocation.
///
/// A write that does not fit is rejected whole, so the contents are always
/// complete `&str` fragments.
pub(crate) struct LineBuf<const CAP: usize> {
    buf: [u8; CAP],
    len: usize,
}

impl<const CAP: usize> LineBuf<CAP> {
    pub(crate) const fn new() -> Self {
        LineBuf {
            buf: [0; CAP],
            len: 0,
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    #[cfg(test)]
    pub(crate) fn as_str(&self) -> &str {
        core::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }
}

impl<const CAP: usize> fmt::Write for LineBuf<CAP> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > CAP {
            return Err(fmt::Error);
        }
        self.buf[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

/// Derived-data stream: one `"<mean |amplitude|>\n"` line per frame.
pub struct LevelTelemetrySink<W> {
    writer: W,
    meter: LevelMeter,
}

impl<W: Write> LevelTelemetrySink<W> {
    pub fn new(writer: W) -> Self {
        LevelTelemetrySink {
            writer,
            meter: LevelMeter::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameSink for LevelTelemetrySink<W> {
    fn configure(&mut self, _config: &PeripheralConfig) -> Result<(), PeripheralError> {
        Ok(())
    }

    fn emit(&mut self, frame: &[i16]) -> Result<usize, EmitError> {
        self.meter.reset();
        self.meter.feed(frame);

        // A u32 and a newline always fit in 16 bytes.
        let mut line = LineBuf::<16>::new();
        let _ = writeln!(line, "{}", self.meter.mean_abs());

        let bytes = line.as_bytes();
        let mut written = 0;
        write_counted(&mut self.writer, bytes, &mut written, bytes.len())?;
        self.writer.flush().map_err(io_error)?;
        Ok(written)
    }
}

/// Sink that accepts and discards every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn configure(&mut self, _config: &PeripheralConfig) -> Result<(), PeripheralError> {
        Ok(())
    }

    fn emit(&mut self, frame: &[i16]) -> Result<usize, EmitError> {
        Ok(frame.len() * BYTES_PER_SAMPLE)
    }
}

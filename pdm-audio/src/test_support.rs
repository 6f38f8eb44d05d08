//! Test doubles shared by the unit and integration tests.

extern crate std;

use std::cell::RefCell;
use std::format;
use std::string::String;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_io::ErrorKind;
use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::config::PeripheralConfig;
use crate::error::{CaptureError, EmitError, PeripheralError};
use crate::io::{FrameSink, FrameSource};
use crate::time::{Instant, MonotonicClock};

std::thread_local! {
    static LOG_LINES: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Logger that keeps every record on the thread that emitted it, so tests
/// running in parallel only see their own lines.
struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let line = format!("{}", record.args());
        LOG_LINES.with(|lines| lines.borrow_mut().push((record.level(), line)));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Route `log` output to this thread's capture buffer and clear it.
pub fn capture_logs() {
    // Fails harmlessly once another test has installed it.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Trace);
    LOG_LINES.with(|lines| lines.borrow_mut().clear());
}

/// Lines logged at `level` on this thread since [`capture_logs`].
pub fn logged(level: Level) -> Vec<String> {
    LOG_LINES.with(|lines| {
        lines
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line.clone())
            .collect()
    })
}

/// Clock that advances by a fixed step every time it is read.
pub struct FakeClock {
    now_ns: u64,
    step_ns: u64,
}

impl FakeClock {
    pub fn stepping_us(step_us: u64) -> Self {
        FakeClock {
            now_ns: 0,
            step_ns: step_us * 1_000,
        }
    }
}

impl MonotonicClock for FakeClock {
    fn now(&mut self) -> Instant {
        let t = Instant::from_nanos(self.now_ns);
        self.now_ns += self.step_ns;
        t
    }
}

/// Delay that only records how long it was asked to wait.
#[derive(Default)]
pub struct CountingDelay {
    pub total_us: u32,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_us += ns / 1_000;
    }

    fn delay_us(&mut self, us: u32) {
        self.total_us += us;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TestIoError(pub ErrorKind);

impl embedded_io::Error for TestIoError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Fixed-capacity byte sink implementing [`embedded_io::Write`].
pub struct ByteWriter {
    buf: [u8; 512],
    len: usize,
    capacity: usize,
    max_write: usize,
    fail: Option<ErrorKind>,
    pub flushes: u32,
}

impl ByteWriter {
    pub fn new() -> Self {
        ByteWriter {
            buf: [0; 512],
            len: 0,
            capacity: 512,
            max_write: usize::MAX,
            fail: None,
            flushes: 0,
        }
    }

    /// Accept at most `n` bytes per `write` call.
    pub fn with_max_write(mut self, n: usize) -> Self {
        self.max_write = n;
        self
    }

    /// Stop accepting bytes (writes return `Ok(0)`) after `n` in total.
    pub fn with_capacity(mut self, n: usize) -> Self {
        self.capacity = n.min(self.buf.len());
        self
    }

    /// Fail every write with `kind`.
    pub fn failing(mut self, kind: ErrorKind) -> Self {
        self.fail = Some(kind);
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl embedded_io::ErrorType for ByteWriter {
    type Error = TestIoError;
}

impl embedded_io::Write for ByteWriter {
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        if let Some(kind) = self.fail {
            return Err(TestIoError(kind));
        }
        let n = data
            .len()
            .min(self.max_write)
            .min(self.capacity - self.len);
        self.buf[self.len..self.len + n].copy_from_slice(&data[..n]);
        self.len += n;
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.flushes += 1;
        Ok(())
    }
}

/// `fmt::Write` target for checking formatted output.
pub(crate) type TextBuf = crate::io::serial::LineBuf<128>;

/// Source that fills every frame from a fixed pattern.
///
/// On the call numbered `short_on` (0-based) it returns `Ok(0)` instead.
pub struct ScriptedSource {
    pub pattern: [i16; 64],
    pub short_on: Option<u32>,
    pub fail_configure: Option<PeripheralError>,
    pub calls: u32,
    pub configured: Option<PeripheralConfig>,
}

impl ScriptedSource {
    pub fn constant(value: i16) -> Self {
        ScriptedSource {
            pattern: [value; 64],
            short_on: None,
            fail_configure: None,
            calls: 0,
            configured: None,
        }
    }

    pub fn with_pattern(values: &[i16]) -> Self {
        let mut source = Self::constant(0);
        source.pattern[..values.len()].copy_from_slice(values);
        source
    }
}

impl FrameSource for ScriptedSource {
    fn configure(&mut self, config: &PeripheralConfig) -> Result<(), PeripheralError> {
        self.configured = Some(*config);
        match self.fail_configure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn capture(&mut self, dest: &mut [i16]) -> Result<usize, CaptureError> {
        let call = self.calls;
        self.calls += 1;
        if self.short_on == Some(call) {
            return Ok(0);
        }
        dest.copy_from_slice(&self.pattern[..dest.len()]);
        Ok(dest.len())
    }
}

/// Sink that keeps a copy of the last frame it was given.
pub struct RecordingSink {
    pub last: [i16; 64],
    pub last_len: usize,
    pub emits: u32,
    pub fail_with: Option<EmitError>,
    pub fail_configure: Option<PeripheralError>,
    pub configured: Option<PeripheralConfig>,
}

impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink {
            last: [0; 64],
            last_len: 0,
            emits: 0,
            fail_with: None,
            fail_configure: None,
            configured: None,
        }
    }

    pub fn last_frame(&self) -> &[i16] {
        &self.last[..self.last_len]
    }
}

impl FrameSink for RecordingSink {
    fn configure(&mut self, config: &PeripheralConfig) -> Result<(), PeripheralError> {
        self.configured = Some(*config);
        match self.fail_configure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn emit(&mut self, frame: &[i16]) -> Result<usize, EmitError> {
        self.emits += 1;
        if let Some(err) = self.fail_with {
            return Err(err);
        }
        self.last[..frame.len()].copy_from_slice(frame);
        self.last_len = frame.len();
        Ok(frame.len() * 2)
    }
}

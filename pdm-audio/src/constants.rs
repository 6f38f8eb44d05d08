/// Default PDM sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 48_000;

/// Default number of mono samples moved through the loop per cycle (≈5.33 ms at 48 kHz).
pub const DEFAULT_FRAME_SAMPLES: usize = 256;

/// Number of DMA descriptors the input peripheral cycles through.
pub const DEFAULT_DMA_BUFFER_COUNT: usize = 4;

/// Largest frame a single DMA descriptor can hold, in samples.
pub const MAX_DMA_FRAME_SAMPLES: usize = 1024;

/// Bytes per signed 16-bit sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Bits per sample on the wire.
pub const BITS_PER_SAMPLE: u8 = 16;

/// Default host serial rate for the raw sample stream.
pub const DEFAULT_SERIAL_BAUD: u32 = 1_500_000;

/// UART bits per transmitted byte with 8N1 framing (start + 8 data + stop).
pub const UART_BITS_PER_BYTE: u32 = 10;

/// Default interval between latency status lines, in milliseconds.
pub const DEFAULT_REPORT_PERIOD_MS: u32 = 1_000;

/// Default output-device processing delay folded into the latency estimate.
pub const DEFAULT_DOWNSTREAM_LATENCY_MS: f32 = 0.8;

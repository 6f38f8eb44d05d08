//! Per-frame amplitude metering.
//!
//! Tracks the peak and mean absolute sample value of a frame, the figures the
//! level telemetry stream sends instead of raw samples.

/// Peak / mean-absolute level accumulator.
///
/// # Example
/// ```
/// use pdm_audio::dsp::LevelMeter;
///
/// let mut meter = LevelMeter::new();
/// meter.feed(&[100, -300, 200]);
/// assert_eq!(meter.mean_abs(), 200);
/// assert_eq!(meter.peak(), 300);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelMeter {
    sum_abs: u64,
    count: u32,
    peak: u16,
}

impl LevelMeter {
    pub const fn new() -> Self {
        LevelMeter {
            sum_abs: 0,
            count: 0,
            peak: 0,
        }
    }

    /// Accumulate a block of samples.
    pub fn feed(&mut self, samples: &[i16]) {
        let mut sum = self.sum_abs;
        let mut peak = self.peak;
        for &s in samples {
            // -32768 has no i16 absolute value
            let a = s.unsigned_abs();
            sum += a as u64;
            if a > peak {
                peak = a;
            }
        }
        self.sum_abs = sum;
        self.peak = peak;
        self.count = self.count.saturating_add(samples.len() as u32);
    }

    /// Mean absolute amplitude of everything fed since the last reset.
    pub fn mean_abs(&self) -> u32 {
        if self.count == 0 {
            return 0;
        }
        (self.sum_abs / self.count as u64) as u32
    }

    /// Largest absolute amplitude seen, `0..=32768`.
    pub fn peak(&self) -> u16 {
        self.peak
    }

    /// Peak level normalized to `0.0..=1.0`.
    pub fn peak_normalized(&self) -> f32 {
        let p = if self.peak > 32_767 { 32_767 } else { self.peak };
        p as f32 / 32_767.0
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

//! Monotonic timestamps for latency accounting.
//!
//! The pipeline never reads wall-clock time directly; it asks a
//! [`MonotonicClock`] for an [`Instant`]. On hardware that is a free-running
//! cycle counter ([`DwtClock`] with the `cortex-m` feature); in tests it is
//! a clock the test advances by hand.

use core::ops::{Add, Sub};
use core::time::Duration;

/// A point in time, in nanoseconds since an arbitrary epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Instant {
    count_ns: u64,
}

impl Instant {
    pub const fn from_nanos(ns: u64) -> Self {
        Self { count_ns: ns }
    }

    pub const fn from_micros(us: u64) -> Self {
        Self::from_nanos(us * 1_000)
    }

    pub const fn from_millis(ms: u64) -> Self {
        Self::from_nanos(ms * 1_000_000)
    }

    /// The time, in nanoseconds.
    pub const fn as_nanos(&self) -> u64 {
        self.count_ns
    }

    /// The time, in milliseconds as an f32.
    pub fn as_millis_f32(&self) -> f32 {
        self.count_ns as f32 / 1_000_000.
    }

    /// Time elapsed since `earlier`. Zero if `earlier` is actually later.
    pub fn saturating_duration_since(&self, earlier: Instant) -> Duration {
        Duration::from_nanos(self.count_ns.saturating_sub(earlier.count_ns))
    }

    /// Milliseconds elapsed since `earlier`, as an f32. Zero if out of order.
    pub fn millis_since(&self, earlier: Instant) -> f32 {
        self.count_ns.saturating_sub(earlier.count_ns) as f32 / 1_000_000.
    }
}

impl Add<Duration> for Instant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self {
            count_ns: self.count_ns.saturating_add(rhs.as_nanos() as u64),
        }
    }
}

impl Sub<Self> for Instant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        self.saturating_duration_since(rhs)
    }
}

/// Source of monotonically non-decreasing timestamps.
pub trait MonotonicClock {
    fn now(&mut self) -> Instant;
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for &mut C {
    fn now(&mut self) -> Instant {
        (**self).now()
    }
}

/// Extend a wrapping 32-bit tick counter to 64 bits.
///
/// Must be sampled at least once per wrap period (about 17.9 s at 240 MHz).
#[derive(Debug, Clone, Copy, Default)]
pub struct TickExtender {
    last: u32,
    high: u64,
}

impl TickExtender {
    pub const fn new() -> Self {
        Self { last: 0, high: 0 }
    }

    /// Feed the latest raw counter value; returns the extended count.
    pub fn extend(&mut self, raw: u32) -> u64 {
        if raw < self.last {
            self.high += 1 << 32;
        }
        self.last = raw;
        self.high | raw as u64
    }
}

/// Convert a tick count at `hz` into nanoseconds without overflowing for
/// counts up to several centuries at MHz rates. A rate of 0 is treated as 1 Hz.
pub fn ticks_to_nanos(ticks: u64, hz: u32) -> u64 {
    let hz = hz.max(1) as u64;
    let secs = ticks / hz;
    let rem = ticks % hz;
    secs * 1_000_000_000 + rem * 1_000_000_000 / hz
}

#[cfg(feature = "cortex-m")]
pub use dwt::DwtClock;

#[cfg(feature = "cortex-m")]
mod dwt {
    use cortex_m::peripheral::{DCB, DWT};

    use super::{ticks_to_nanos, Instant, MonotonicClock, TickExtender};

    /// Cortex-M DWT cycle counter as a [`MonotonicClock`].
    ///
    /// The counter is 32 bits wide and wraps; call [`now()`](MonotonicClock::now)
    /// at least once per wrap period, which the audio loop always does.
    pub struct DwtClock {
        core_hz: u32,
        ticks: TickExtender,
    }

    impl DwtClock {
        /// Enable the cycle counter and take ownership of it.
        pub fn new(mut dcb: DCB, mut dwt: DWT, core_hz: u32) -> Self {
            debug_assert!(core_hz > 0, "core clock frequency must be non-zero");
            dcb.enable_trace();
            dwt.enable_cycle_counter();
            Self {
                core_hz: core_hz.max(1),
                ticks: TickExtender::new(),
            }
        }
    }

    impl MonotonicClock for DwtClock {
        fn now(&mut self) -> Instant {
            let ticks = self.ticks.extend(DWT::cycle_count());
            Instant::from_nanos(ticks_to_nanos(ticks, self.core_hz))
        }
    }
}

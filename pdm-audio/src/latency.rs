//! Per-cycle latency accounting.
//!
//! Every completed cycle produces four timestamps ([`CycleTimestamps`]). The
//! [`LatencyTracker`] turns them into stage durations and an end-to-end
//! estimate, but only publishes a [`LatencyReport`] once per reporting
//! period: formatting and printing a status line every cycle would itself
//! disturb the timing at high sample rates.
//!
//! ## Estimate
//!
//! ```text
//! estimated = 2 × nominal_frame + downstream + transform
//! ```
//!
//! One nominal frame is spent filling the input DMA buffer and one draining
//! the output DMA buffer. `downstream` is the output device's own delay,
//! supplied by configuration. Capture and emit waits are not added: they are
//! time the loop spends parked on those same buffers.

use core::fmt;

use crate::config::{PipelineConfig, StatusStyle};
use crate::time::Instant;

/// Checkpoints of one loop cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleTimestamps {
    pub capture_start: Instant,
    pub capture_end: Instant,
    pub transform_end: Instant,
    pub emit_end: Instant,
}

impl CycleTimestamps {
    pub fn capture_wait_ms(&self) -> f32 {
        self.capture_end.millis_since(self.capture_start)
    }

    pub fn transform_ms(&self) -> f32 {
        self.transform_end.millis_since(self.capture_end)
    }

    pub fn emit_wait_ms(&self) -> f32 {
        self.emit_end.millis_since(self.transform_end)
    }
}

/// Derived latency figures, published at most once per reporting period.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LatencyReport {
    /// Emit-end time of the cycle that triggered the report.
    pub at: Instant,
    pub capture_wait_ms: f32,
    pub transform_ms: f32,
    pub emit_wait_ms: f32,
    pub nominal_frame_ms: f32,
    pub estimated_total_ms: f32,
    /// Completed cycles since the previous report, this one included.
    pub cycles: u32,
    /// Cycles abandoned on a capture or emit fault since the previous report.
    pub skipped: u32,
    pub style: StatusStyle,
}

impl fmt::Display for LatencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.style {
            StatusStyle::Stages => write!(
                f,
                "capture {:.3} ms | transform {:.3} ms | emit {:.3} ms",
                self.capture_wait_ms, self.transform_ms, self.emit_wait_ms
            )?,
            StatusStyle::Totals => write!(
                f,
                "frame {:.3} ms | estimated latency {:.3} ms",
                self.nominal_frame_ms, self.estimated_total_ms
            )?,
        }
        write!(f, " | {} cycles, {} skipped", self.cycles, self.skipped)
    }
}

/// Throttled latency reporter.
pub struct LatencyTracker {
    nominal_frame_ms: f32,
    downstream_ms: f32,
    period_ns: u64,
    style: StatusStyle,
    last_report: Instant,
    cycles: u32,
    skipped: u32,
}

impl LatencyTracker {
    /// Start tracking. The first report is due one period after `started_at`.
    pub fn new(config: &PipelineConfig, started_at: Instant) -> Self {
        LatencyTracker {
            nominal_frame_ms: config.nominal_frame_ms(),
            downstream_ms: config.fixed_downstream_latency_ms,
            period_ns: config.report_period_ms as u64 * 1_000_000,
            style: config.status_style,
            last_report: started_at,
            cycles: 0,
            skipped: 0,
        }
    }

    /// End-to-end estimate for a cycle whose transform took `transform_ms`.
    pub fn estimate_ms(&self, transform_ms: f32) -> f32 {
        2.0 * self.nominal_frame_ms + self.downstream_ms + transform_ms
    }

    /// Record a completed cycle. Returns a report if a period has elapsed
    /// since the last one, measured at `timestamps.emit_end`.
    pub fn mark_cycle(&mut self, timestamps: &CycleTimestamps) -> Option<LatencyReport> {
        self.cycles = self.cycles.saturating_add(1);

        let now = timestamps.emit_end;
        if now.as_nanos().saturating_sub(self.last_report.as_nanos()) < self.period_ns {
            return None;
        }

        let transform_ms = timestamps.transform_ms();
        let report = LatencyReport {
            at: now,
            capture_wait_ms: timestamps.capture_wait_ms(),
            transform_ms,
            emit_wait_ms: timestamps.emit_wait_ms(),
            nominal_frame_ms: self.nominal_frame_ms,
            estimated_total_ms: self.estimate_ms(transform_ms),
            cycles: self.cycles,
            skipped: self.skipped,
            style: self.style,
        };

        self.last_report = now;
        self.cycles = 0;
        self.skipped = 0;
        Some(report)
    }

    /// Record a cycle abandoned on a fault. Never produces a report.
    pub fn note_skipped(&mut self) {
        self.skipped = self.skipped.saturating_add(1);
    }

    /// Time of the last report, or the start time if none has been made.
    pub fn last_report(&self) -> Instant {
        self.last_report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TextBuf;

    fn stamps(start_us: u64, capture_us: u64, transform_us: u64, emit_us: u64) -> CycleTimestamps {
        let capture_start = Instant::from_micros(start_us);
        let capture_end = Instant::from_micros(start_us + capture_us);
        let transform_end = Instant::from_micros(start_us + capture_us + transform_us);
        let emit_end = Instant::from_micros(start_us + capture_us + transform_us + emit_us);
        CycleTimestamps {
            capture_start,
            capture_end,
            transform_end,
            emit_end,
        }
    }

    fn config_44k1() -> PipelineConfig {
        PipelineConfig::new()
            .with_sample_rate(44_100)
            .with_frame_samples(8)
            .with_downstream_latency_ms(0.8)
            .with_report_period_ms(1_000)
    }

    #[test]
    fn stage_durations() {
        let ts = stamps(1_000, 150, 10, 40);
        assert!((ts.capture_wait_ms() - 0.150).abs() < 1e-6);
        assert!((ts.transform_ms() - 0.010).abs() < 1e-6);
        assert!((ts.emit_wait_ms() - 0.040).abs() < 1e-6);
    }

    #[test]
    fn estimate_formula() {
        let config = config_44k1();
        let tracker = LatencyTracker::new(&config, Instant::default());
        let nominal = 8.0f32 / 44_100.0 * 1000.0;
        assert_eq!(tracker.estimate_ms(0.01), 2.0 * nominal + 0.8 + 0.01);
        assert!((tracker.estimate_ms(0.01) - 1.172_81).abs() < 1e-4);
    }

    #[test]
    fn no_report_before_period() {
        let mut tracker = LatencyTracker::new(&config_44k1(), Instant::from_millis(0));
        assert_eq!(tracker.mark_cycle(&stamps(0, 100, 10, 50)), None);
        assert_eq!(tracker.mark_cycle(&stamps(998_000, 100, 10, 50)), None);
    }

    #[test]
    fn report_contents_at_period_boundary() {
        let mut tracker = LatencyTracker::new(&config_44k1(), Instant::from_millis(0));
        for i in 0..4 {
            assert!(tracker.mark_cycle(&stamps(i * 200, 150, 10, 40)).is_none());
        }
        tracker.note_skipped();

        // emit_end lands exactly on 1000 ms.
        let report = tracker
            .mark_cycle(&stamps(999_800, 150, 10, 40))
            .expect("report due");
        assert_eq!(report.at, Instant::from_millis(1_000));
        assert!((report.capture_wait_ms - 0.150).abs() < 1e-6);
        assert!((report.transform_ms - 0.010).abs() < 1e-6);
        assert!((report.emit_wait_ms - 0.040).abs() < 1e-6);
        assert!((report.nominal_frame_ms - 0.181_405).abs() < 1e-5);
        assert_eq!(
            report.estimated_total_ms,
            2.0 * report.nominal_frame_ms + 0.8 + report.transform_ms
        );
        assert_eq!(report.cycles, 5);
        assert_eq!(report.skipped, 1);
        assert_eq!(tracker.last_report(), Instant::from_millis(1_000));
    }

    #[test]
    fn one_report_per_period_regardless_of_cycle_rate() {
        let mut tracker = LatencyTracker::new(&config_44k1(), Instant::from_millis(0));
        let mut reports = 0;
        let mut last_at = Instant::default();

        // ~0.2 ms cycles for 5 s of simulated time.
        let mut t = 0u64;
        while t < 5_000_000 {
            if let Some(report) = tracker.mark_cycle(&stamps(t, 150, 10, 40)) {
                assert!(report.at >= last_at);
                assert!(report.at.as_nanos() - last_at.as_nanos() >= 1_000_000_000);
                last_at = report.at;
                reports += 1;
            }
            t += 200;
        }
        assert_eq!(reports, 5);
    }

    #[test]
    fn counters_reset_after_report() {
        let config = config_44k1().with_report_period_ms(1);
        let mut tracker = LatencyTracker::new(&config, Instant::from_millis(0));
        tracker.note_skipped();
        tracker.note_skipped();
        let first = tracker.mark_cycle(&stamps(2_000, 0, 0, 0)).expect("report due");
        assert_eq!((first.cycles, first.skipped), (1, 2));

        let second = tracker.mark_cycle(&stamps(4_000, 0, 0, 0)).expect("report due");
        assert_eq!((second.cycles, second.skipped), (1, 0));
    }

    #[test]
    fn status_line_styles() {
        let report = LatencyReport {
            at: Instant::from_millis(1_000),
            capture_wait_ms: 0.15,
            transform_ms: 0.01,
            emit_wait_ms: 0.04,
            nominal_frame_ms: 0.181,
            estimated_total_ms: 1.172,
            cycles: 5000,
            skipped: 2,
            style: StatusStyle::Stages,
        };
        let mut buf = TextBuf::new();
        fmt::write(&mut buf, format_args!("{report}")).unwrap();
        assert_eq!(
            buf.as_str(),
            "capture 0.150 ms | transform 0.010 ms | emit 0.040 ms | 5000 cycles, 2 skipped"
        );

        let report = LatencyReport {
            style: StatusStyle::Totals,
            ..report
        };
        let mut buf = TextBuf::new();
        fmt::write(&mut buf, format_args!("{report}")).unwrap();
        assert_eq!(
            buf.as_str(),
            "frame 0.181 ms | estimated latency 1.172 ms | 5000 cycles, 2 skipped"
        );
    }
}

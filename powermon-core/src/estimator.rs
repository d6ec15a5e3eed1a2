//! Cycle-Synchronized RMS and Real-Power Estimation
//!
//! ## Overview
//!
//! The [`Estimator`] is the consumer half of the pipeline. The host polls
//! [`Estimator::process`] at its own cadence; each call drains whatever
//! sample pairs accumulated in the queue since the last poll and folds
//! them into the running accumulation state. Calibrated readings are pure
//! functions of the latest completed [`Snapshot`].
//!
//! ## Per-Sample Algorithm
//!
//! For every pair popped from the queue:
//!
//! 1. Widen the raw codes into fixed point and subtract the tracked DC
//!    offset of each channel.
//! 2. Detect zero crossings of the voltage, edge-triggered on an explicit
//!    polarity state rather than re-evaluated per sample:
//!    - negative-to-positive starts a new cycle; after the configured
//!      number of cycles the window sums are snapshotted and cleared
//!    - positive-to-negative folds the per-cycle running sums into the
//!      offset trackers through a single-pole low-pass filter
//! 3. Accumulate the running sums used by the offset trackers.
//! 4. Accumulate the window sums of squares and of phase-corrected
//!    voltage-current products.
//!
//! ## Fixed-Point Scaling
//!
//! All hot-path arithmetic is integer only. The scaling is two-staged so
//! a bounded-width accumulator survives an arbitrary-length window:
//!
//! ```text
//! | stage            | operation  | working range            |
//! |------------------|------------|--------------------------|
//! | widen raw code   | << 8       | ±2^18 centered           |
//! | prescale         | >> 2       | ±2^16 before squaring    |
//! | square           | x * x      | ±2^32 per term           |
//! | postscale        | >> 6       | ±2^26 added per sample   |
//! ```
//!
//! The reading accessors undo the postscale with the matching factor of
//! 64. The offset filter shift (`>> 12`) makes offset tracking slow
//! against the line frequency while still following supply drift.
//!
//! ## Phase Correction
//!
//! The two channels share one converter and are sampled in sequence, not
//! simultaneously. The estimator compensates by interpolating the
//! effective voltage between the previous and current sample:
//!
//! ```text
//! shifted = prev + (current - prev) * coeff / 256
//! ```
//!
//! `coeff = 256` reproduces the current sample unchanged; smaller values
//! move the effective voltage waveform backward in time, larger values
//! forward.
//!
//! ## Readings
//!
//! Accessors return `None` until the first window completes; they never
//! divide by a zero sample count. They are pure reads and belong to the
//! polled context only.

use core::sync::atomic::Ordering;

use crate::config::MonitorConfig;
use crate::queue::{RawSamplePair, SampleQueue};

// Macros for optional logging
#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

/// Left shift widening raw codes into the fixed-point working format.
const RAW_WIDEN_SHIFT: u32 = 8;

/// Downscale applied to centered values before squaring.
const SQUARE_PRESCALE_SHIFT: u32 = 2;

/// Downscale applied to each squared term before accumulation.
const ACCUM_POSTSCALE_SHIFT: u32 = 6;

/// Scale factor the reading accessors undo.
const ACCUM_POSTSCALE: f32 = (1u32 << ACCUM_POSTSCALE_SHIFT) as f32;

/// Offset tracker low-pass shift. Larger values track drift more slowly
/// relative to the line frequency.
const OFFSET_FILTER_SHIFT: u32 = 12;

/// Fractional bits of the phase coefficient.
const PHASE_FRACTION_SHIFT: u32 = 8;

/// Mid-scale code of a 10-bit converter, the initial offset assumption.
const ADC_MIDSCALE_CODE: i32 = 512;

/// Half-cycle polarity of the voltage waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Voltage at or above the tracked offset
    Positive,
    /// Voltage below the tracked offset
    Negative,
}

/// Sums of the last completed accumulation window
///
/// Overwritten as a unit once per window; everything a reading needs is
/// derived from one snapshot, so readings are always internally
/// consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// Sum of squared, downscaled voltage values
    pub sum_v_sq: i64,
    /// Sum of squared, downscaled current values
    pub sum_c_sq: i64,
    /// Sum of phase-corrected voltage-current products, downscaled
    pub sum_vc: i64,
    /// Number of sample pairs in the window
    pub samples: u32,
}

/// Consumer of sample pairs, producer of calibrated readings
///
/// Owns all accumulation state exclusively; the queue is the only thing
/// it shares with the trigger context.
#[derive(Debug)]
pub struct Estimator {
    config: MonitorConfig,
    polarity: Polarity,
    /// DC offset estimates in fixed point, per channel
    offset_v: i32,
    offset_c: i32,
    /// Per-cycle running sums feeding the offset trackers
    running_sum_v: i64,
    running_sum_c: i64,
    /// Window-scoped accumulators
    sum_v_sq: i64,
    sum_c_sq: i64,
    sum_vc: i64,
    samples: u32,
    /// Completed cycles in the current window
    cycles: u16,
    /// Previous downscaled voltage sample, for phase interpolation
    prev_v: i32,
    snapshot: Option<Snapshot>,
    /// Drop count already reported, for overrun diagnostics
    seen_dropped: u32,
}

impl Estimator {
    /// Create an estimator with offsets seeded to the mid-scale
    /// assumption; the trackers take over from there.
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            // Positive seed: a stream that begins mid-cycle cannot mint a
            // spurious cycle boundary, only a no-op offset update
            polarity: Polarity::Positive,
            offset_v: ADC_MIDSCALE_CODE << RAW_WIDEN_SHIFT,
            offset_c: ADC_MIDSCALE_CODE << RAW_WIDEN_SHIFT,
            running_sum_v: 0,
            running_sum_c: 0,
            sum_v_sq: 0,
            sum_c_sq: 0,
            sum_vc: 0,
            samples: 0,
            cycles: 0,
            prev_v: 0,
            snapshot: None,
            seen_dropped: 0,
        }
    }

    /// The configuration this estimator was built with.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Drain the queue and fold every pending pair into the accumulation
    /// state.
    ///
    /// Invoke periodically from the host; each call processes however
    /// many pairs arrived since the last one. Work is proportional to the
    /// number of queued pairs and runs to completion.
    pub fn process<const N: usize>(&mut self, queue: &SampleQueue<N>) {
        while let Some(pair) = queue.pop() {
            self.ingest(pair);
        }

        let dropped = queue.stats().dropped.load(Ordering::Relaxed);
        if dropped != self.seen_dropped {
            log_warn!(
                "overrun: {} sample pairs dropped since last poll",
                dropped - self.seen_dropped
            );
            self.seen_dropped = dropped;
        }
    }

    fn ingest(&mut self, pair: RawSamplePair) {
        let v = ((pair.voltage as i32) << RAW_WIDEN_SHIFT) - self.offset_v;
        let c = ((pair.current as i32) << RAW_WIDEN_SHIFT) - self.offset_c;

        if v >= 0 && self.polarity == Polarity::Negative {
            // Positive-going crossing: a new cycle begins
            self.polarity = Polarity::Positive;
            self.cycles += 1;
            if self.cycles == self.config.cycles_per_estimate() {
                self.publish();
                self.sum_v_sq = 0;
                self.sum_c_sq = 0;
                self.sum_vc = 0;
                self.samples = 0;
                self.cycles = 0;
            }
        } else if v < 0 && self.polarity == Polarity::Positive {
            // Negative-going crossing: the running sums now span one full
            // cycle, so the waveform's own area cancels and the residue
            // is accumulated offset error
            self.polarity = Polarity::Negative;
            self.offset_v += (self.running_sum_v >> OFFSET_FILTER_SHIFT) as i32;
            self.offset_c += (self.running_sum_c >> OFFSET_FILTER_SHIFT) as i32;
            self.running_sum_v = 0;
            self.running_sum_c = 0;
        }

        self.running_sum_v += v as i64;
        self.running_sum_c += c as i64;

        let v4 = v >> SQUARE_PRESCALE_SHIFT;
        let c4 = c >> SQUARE_PRESCALE_SHIFT;
        self.sum_v_sq += ((v4 as i64) * (v4 as i64)) >> ACCUM_POSTSCALE_SHIFT;
        self.sum_c_sq += ((c4 as i64) * (c4 as i64)) >> ACCUM_POSTSCALE_SHIFT;

        // Interpolate the effective voltage toward the previous sample to
        // cancel the multiplexing skew between the two channels
        let shifted = self.prev_v
            + (((v4 - self.prev_v) * self.config.phase_coeff()) >> PHASE_FRACTION_SHIFT);
        self.sum_vc += ((shifted as i64) * (c4 as i64)) >> ACCUM_POSTSCALE_SHIFT;
        self.prev_v = v4;

        self.samples += 1;
    }

    /// Publish the current window as the new snapshot.
    ///
    /// A boundary reached before anything accumulated publishes nothing,
    /// keeping the no-data state intact.
    fn publish(&mut self) {
        if self.samples == 0 {
            return;
        }
        self.snapshot = Some(Snapshot {
            sum_v_sq: self.sum_v_sq,
            sum_c_sq: self.sum_c_sq,
            sum_vc: self.sum_vc,
            samples: self.samples,
        });
        log_debug!(
            "snapshot: {} samples over {} cycles",
            self.samples,
            self.cycles
        );
    }

    /// The last completed window, if any.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    fn ready(&self) -> Option<&Snapshot> {
        // Published snapshots always carry samples; the filter restates
        // the never-divide-by-zero contract locally
        self.snapshot.as_ref().filter(|snap| snap.samples > 0)
    }

    fn window_mean(sum: i64, samples: u32) -> f32 {
        sum as f32 / (ACCUM_POSTSCALE * samples as f32)
    }

    /// RMS voltage in physical units, `None` before the first window.
    pub fn rms_voltage(&self) -> Option<f32> {
        let snap = self.ready()?;
        Some(self.config.voltage_scale() * libm::sqrtf(Self::window_mean(snap.sum_v_sq, snap.samples)))
    }

    /// RMS current in physical units, `None` before the first window.
    pub fn rms_current(&self) -> Option<f32> {
        let snap = self.ready()?;
        Some(self.config.current_scale() * libm::sqrtf(Self::window_mean(snap.sum_c_sq, snap.samples)))
    }

    /// Real power in physical units, `None` before the first window.
    ///
    /// Can be negative for a load feeding power back into the supply.
    pub fn real_power(&self) -> Option<f32> {
        let snap = self.ready()?;
        Some(
            self.config.voltage_scale()
                * self.config.current_scale()
                * Self::window_mean(snap.sum_vc, snap.samples),
        )
    }
}

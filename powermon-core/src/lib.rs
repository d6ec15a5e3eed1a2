//! Single-phase power monitoring core
//!
//! Estimates RMS voltage, RMS current and real power from two analog
//! channels sampled at a fixed period. The crate is split along the
//! concurrency boundary of the target system:
//!
//! ```text
//! trigger tick ─→ Sampler ─→ SampleQueue ─→ Estimator ─→ readings
//!                 (interrupt              (polled
//!                  context)                context)
//! ```
//!
//! The [`Sampler`] runs in the time-critical trigger context and does
//! nothing but move raw converter codes. The [`Estimator`] drains the
//! queue at the host's pace and performs all arithmetic. The lock-free
//! [`SampleQueue`] is the only state shared between the two sides.
//!
//! Key constraints:
//! - `no_std` by default, no heap allocation anywhere
//! - no floating point and no unbounded loops in the trigger context
//! - drop-on-full backpressure, the producer never waits
//!
//! ```no_run
//! use powermon_core::{AdcDevice, Estimator, MonitorConfig, SampleQueue, Sampler};
//!
//! struct Adc;
//! impl AdcDevice for Adc {
//!     fn select_channel(&mut self, _channel: u8) {}
//!     fn start_conversion(&mut self) {}
//!     fn last_result(&self) -> u16 { 512 }
//! }
//!
//! static QUEUE: SampleQueue<64> = SampleQueue::new();
//!
//! let config = MonitorConfig::new(400, 10, 0, 1, 1.0, 1.0, 256).unwrap();
//! let mut sampler = Sampler::new(Adc, &QUEUE, &config);
//! let mut estimator = Estimator::new(config);
//!
//! sampler.start();
//! // register a trigger handler that calls sampler.on_trigger() once per period,
//! // then poll from the main loop:
//! estimator.process(&QUEUE);
//! if let Some(vrms) = estimator.rms_voltage() {
//!     let _ = vrms;
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod errors;
pub mod estimator;
pub mod queue;
pub mod sampler;

// Public API
pub use config::{MonitorConfig, MAX_SAMPLE_PERIOD_US, MIN_SAMPLE_PERIOD_US, PHASE_COEFF_UNITY};
pub use errors::{ConfigError, ConfigResult};
pub use estimator::{Estimator, Polarity, Snapshot};
pub use queue::{QueueStats, RawSamplePair, SampleQueue};
pub use sampler::{AdcDevice, Sampler};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

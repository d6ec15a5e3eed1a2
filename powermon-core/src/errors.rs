//! Error types for monitor configuration
//!
//! The running pipeline has no error returns at all: pushing to a full
//! queue is defined data loss, popping an empty queue yields `None`, and
//! reading an estimate before the first window yields `None`. The only
//! fallible operation is constructing a [`MonitorConfig`], so everything
//! a bad configuration could corrupt is rejected up front.
//!
//! Error values follow the conventions of small targets:
//!
//! 1. **Small**: all data is inline, the enum stays under 8 bytes.
//! 2. **No heap**: no `String`, display text is static.
//! 3. **Copy**: errors move freely out of constructors and match arms.
//!
//! [`MonitorConfig`]: crate::config::MonitorConfig

use thiserror_no_std::Error;

/// Result type for configuration validation
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration rejected at construction time
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Sampling period outside the supported converter timing window
    #[error("sampling period {period_us}us outside [{min_us}, {max_us}]us")]
    PeriodOutOfRange {
        /// The requested period in microseconds
        period_us: u16,
        /// Shortest supported period
        min_us: u16,
        /// Longest supported period
        max_us: u16,
    },

    /// An estimation window must span at least one full cycle
    #[error("cycles per estimate must be at least 1")]
    CycleCountZero,

    /// Voltage and current mapped to the same converter channel
    #[error("voltage and current both mapped to channel {channel}")]
    ChannelConflict {
        /// The doubly-assigned channel number
        channel: u8,
    },

    /// Scale factor is NaN, infinite, zero or negative
    #[error("scale factor {value} is not a positive finite number")]
    InvalidScale {
        /// The rejected scale factor
        value: f32,
    },

    /// Phase coefficient too large for the interpolation arithmetic
    #[error("phase coefficient {coeff} outside [-{limit}, {limit}]")]
    PhaseCoeffOutOfRange {
        /// The requested coefficient
        coeff: i32,
        /// Magnitude limit
        limit: i32,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::PeriodOutOfRange { period_us, min_us, max_us } =>
                defmt::write!(fmt, "period {}us outside [{}, {}]us", period_us, min_us, max_us),
            Self::CycleCountZero =>
                defmt::write!(fmt, "cycles per estimate must be at least 1"),
            Self::ChannelConflict { channel } =>
                defmt::write!(fmt, "voltage and current both on channel {}", channel),
            Self::InvalidScale { value } =>
                defmt::write!(fmt, "scale factor {} not positive finite", value),
            Self::PhaseCoeffOutOfRange { coeff, limit } =>
                defmt::write!(fmt, "phase coefficient {} outside [-{}, {}]", coeff, limit, limit),
        }
    }
}

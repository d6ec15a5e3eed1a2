//! Monitor configuration
//!
//! [`MonitorConfig`] bundles everything that is fixed at construction:
//! sampling period, estimation window length, channel mapping, calibration
//! scale factors and the phase-shift coefficient. All bounds are checked in
//! [`MonitorConfig::new`]; once a value exists it is valid, and the hot
//! paths never re-validate.

use crate::errors::{ConfigError, ConfigResult};

/// Shortest supported sampling period in microseconds.
///
/// Below this the converter cannot finish a conversion between triggers.
pub const MIN_SAMPLE_PERIOD_US: u16 = 105;

/// Longest supported sampling period in microseconds.
pub const MAX_SAMPLE_PERIOD_US: u16 = 8192;

/// Phase coefficient that applies no shift to the voltage waveform.
///
/// Values below shift the effective voltage waveform backward, values
/// above shift it forward, in units of 1/256 of one sampling period.
pub const PHASE_COEFF_UNITY: i32 = 256;

/// Largest accepted phase coefficient magnitude (four sampling periods).
pub const PHASE_COEFF_LIMIT: i32 = 1024;

/// Immutable configuration for one monitor instance
///
/// Construct with [`MonitorConfig::new`]; there is no runtime
/// reconfiguration, a new instance replaces the old one wholesale.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonitorConfig {
    sample_period_us: u16,
    cycles_per_estimate: u16,
    voltage_channel: u8,
    current_channel: u8,
    voltage_scale: f32,
    current_scale: f32,
    phase_coeff: i32,
}

impl MonitorConfig {
    /// Validate and build a configuration.
    ///
    /// - `sample_period_us`: trigger period, [`MIN_SAMPLE_PERIOD_US`]
    ///   to [`MAX_SAMPLE_PERIOD_US`]
    /// - `cycles_per_estimate`: full waveform cycles per estimation
    ///   window, at least 1
    /// - `voltage_channel` / `current_channel`: converter channel numbers,
    ///   must differ
    /// - `voltage_scale` / `current_scale`: positive finite factors
    ///   converting ADC code units to physical units
    /// - `phase_coeff`: [`PHASE_COEFF_UNITY`] for no shift, magnitude
    ///   bounded by [`PHASE_COEFF_LIMIT`]
    pub fn new(
        sample_period_us: u16,
        cycles_per_estimate: u16,
        voltage_channel: u8,
        current_channel: u8,
        voltage_scale: f32,
        current_scale: f32,
        phase_coeff: i32,
    ) -> ConfigResult<Self> {
        if !(MIN_SAMPLE_PERIOD_US..=MAX_SAMPLE_PERIOD_US).contains(&sample_period_us) {
            return Err(ConfigError::PeriodOutOfRange {
                period_us: sample_period_us,
                min_us: MIN_SAMPLE_PERIOD_US,
                max_us: MAX_SAMPLE_PERIOD_US,
            });
        }
        if cycles_per_estimate == 0 {
            return Err(ConfigError::CycleCountZero);
        }
        if voltage_channel == current_channel {
            return Err(ConfigError::ChannelConflict {
                channel: voltage_channel,
            });
        }
        for scale in [voltage_scale, current_scale] {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(ConfigError::InvalidScale { value: scale });
            }
        }
        if phase_coeff.unsigned_abs() > PHASE_COEFF_LIMIT as u32 {
            return Err(ConfigError::PhaseCoeffOutOfRange {
                coeff: phase_coeff,
                limit: PHASE_COEFF_LIMIT,
            });
        }

        Ok(Self {
            sample_period_us,
            cycles_per_estimate,
            voltage_channel,
            current_channel,
            voltage_scale,
            current_scale,
            phase_coeff,
        })
    }

    /// Trigger period in microseconds, for the host's timer setup.
    pub fn sample_period_us(&self) -> u16 {
        self.sample_period_us
    }

    /// Full cycles accumulated per estimation window.
    pub fn cycles_per_estimate(&self) -> u16 {
        self.cycles_per_estimate
    }

    /// Converter channel carrying the voltage signal.
    pub fn voltage_channel(&self) -> u8 {
        self.voltage_channel
    }

    /// Converter channel carrying the current signal.
    pub fn current_channel(&self) -> u8 {
        self.current_channel
    }

    /// ADC code units to volts.
    pub fn voltage_scale(&self) -> f32 {
        self.voltage_scale
    }

    /// ADC code units to amperes.
    pub fn current_scale(&self) -> f32 {
        self.current_scale
    }

    /// Voltage phase-shift coefficient in 1/256 sampling periods.
    pub fn phase_coeff(&self) -> i32 {
        self.phase_coeff
    }
}

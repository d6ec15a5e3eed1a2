//! Shared helpers for integration tests
//!
//! Synthetic waveforms expressed the way the pipeline sees them: raw
//! converter codes around mid-scale. Generation is deterministic so every
//! test run sees the same stream.

#![allow(dead_code)]

use powermon_core::{AdcDevice, RawSamplePair};

/// Mid-scale code of the simulated 10-bit converter.
pub const MIDSCALE: f64 = 512.0;

/// Raw code of a sinusoid at sample `k`, `n` samples per cycle.
pub fn sine_code(k: i64, n: u32, amplitude: f64, dc: f64) -> u16 {
    let theta = core::f64::consts::TAU * k.rem_euclid(n as i64) as f64 / n as f64;
    (dc + amplitude * theta.sin()).round() as u16
}

/// In-phase sinusoids on both channels.
pub fn sine_pair(k: u32, n: u32, v_amp: f64, c_amp: f64, dc: f64) -> RawSamplePair {
    RawSamplePair {
        voltage: sine_code(k as i64, n, v_amp, dc),
        current: sine_code(k as i64, n, c_amp, dc),
    }
}

/// Sinusoids with the current waveform lagging the voltage by a whole
/// number of samples.
pub fn lagged_pair(k: u32, n: u32, v_amp: f64, c_amp: f64, dc: f64, lag: u32) -> RawSamplePair {
    RawSamplePair {
        voltage: sine_code(k as i64, n, v_amp, dc),
        current: sine_code(k as i64 - lag as i64, n, c_amp, dc),
    }
}

/// Simulated converter producing sinusoidal codes on two channels.
///
/// Models the real device's contract: one channel at a time, the selected
/// channel's result readable at the next trigger. Both channels are
/// evaluated at the same pair index, so the generated waveforms are in
/// phase; the index advances when the mux returns to the voltage channel
/// after a completed pair.
pub struct SineAdc {
    voltage_channel: u8,
    current_channel: u8,
    samples_per_cycle: u32,
    voltage_amplitude: f64,
    current_amplitude: f64,
    dc: f64,
    selected: u8,
    sample_index: u32,
}

impl SineAdc {
    pub fn new(
        voltage_channel: u8,
        current_channel: u8,
        samples_per_cycle: u32,
        voltage_amplitude: f64,
        current_amplitude: f64,
    ) -> Self {
        Self {
            voltage_channel,
            current_channel,
            samples_per_cycle,
            voltage_amplitude,
            current_amplitude,
            dc: MIDSCALE,
            selected: voltage_channel,
            sample_index: 0,
        }
    }

    pub fn with_dc(mut self, dc: f64) -> Self {
        self.dc = dc;
        self
    }
}

impl AdcDevice for SineAdc {
    fn select_channel(&mut self, channel: u8) {
        if channel == self.voltage_channel && self.selected == self.current_channel {
            self.sample_index += 1;
        }
        self.selected = channel;
    }

    fn start_conversion(&mut self) {}

    fn last_result(&self) -> u16 {
        let amplitude = if self.selected == self.voltage_channel {
            self.voltage_amplitude
        } else {
            self.current_amplitude
        };
        sine_code(self.sample_index as i64, self.samples_per_cycle, amplitude, self.dc)
    }
}

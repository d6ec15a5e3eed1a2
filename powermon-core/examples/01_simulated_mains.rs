//! Simulated Mains Monitoring Example
//!
//! This example runs the complete pipeline against a software-simulated
//! converter: a 50 Hz mains voltage with a resistive-ish load, sampled at
//! 400 us per channel pair.
//!
//! ## What You'll Learn
//!
//! - Wiring a `Sampler` to a converter device and a shared queue
//! - Driving the trigger side and the polled side from one loop
//! - Reading calibrated RMS and power estimates
//! - Watching the queue statistics for overruns
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_simulated_mains
//! ```

use core::sync::atomic::Ordering;

use powermon_core::{
    AdcDevice, Estimator, MonitorConfig, SampleQueue, Sampler, PHASE_COEFF_UNITY,
};

/// Software stand-in for the converter: 230 V mains and a ~7 A load as
/// 10-bit codes around mid-scale.
struct SimulatedAdc {
    selected: u8,
    sample_index: u32,
}

impl SimulatedAdc {
    /// Samples per 50 Hz cycle at a 400 us period.
    const SAMPLES_PER_CYCLE: u32 = 50;
    /// Peak voltage in codes (325 V across a 0.8 V/code divider).
    const VOLTAGE_AMPLITUDE: f64 = 406.0;
    /// Peak current in codes (10 A across a 0.025 A/code shunt).
    const CURRENT_AMPLITUDE: f64 = 400.0;

    fn new() -> Self {
        Self { selected: 0, sample_index: 0 }
    }
}

impl AdcDevice for SimulatedAdc {
    fn select_channel(&mut self, channel: u8) {
        // Returning to the voltage channel means the previous pair is done
        if channel == 0 && self.selected == 1 {
            self.sample_index += 1;
        }
        self.selected = channel;
    }

    fn start_conversion(&mut self) {}

    fn last_result(&self) -> u16 {
        let k = self.sample_index % Self::SAMPLES_PER_CYCLE;
        let theta = core::f64::consts::TAU * k as f64 / Self::SAMPLES_PER_CYCLE as f64;
        let amplitude = if self.selected == 0 {
            Self::VOLTAGE_AMPLITUDE
        } else {
            Self::CURRENT_AMPLITUDE
        };
        (512.0 + amplitude * theta.sin()).round() as u16
    }
}

static QUEUE: SampleQueue<64> = SampleQueue::new();

fn main() {
    println!("Powermon Simulated Mains Example");
    println!("================================\n");

    // 400 us sampling, 10-cycle estimation windows, voltage on channel 0,
    // current on channel 1, calibration matching the simulated front end
    let config = MonitorConfig::new(400, 10, 0, 1, 0.8, 0.025, PHASE_COEFF_UNITY)
        .expect("configuration is valid");

    let mut sampler = Sampler::new(SimulatedAdc::new(), &QUEUE, &config);
    let mut estimator = Estimator::new(config);

    sampler.start();

    // One second of simulated time: 2500 sample pairs, with the host
    // polling every 20 ms (one mains cycle)
    for cycle in 0..50u32 {
        for _ in 0..SimulatedAdc::SAMPLES_PER_CYCLE {
            // Each pair takes two trigger ticks, one per channel
            sampler.on_trigger();
            sampler.on_trigger();
        }
        estimator.process(&QUEUE);

        if cycle % 10 == 9 {
            match (
                estimator.rms_voltage(),
                estimator.rms_current(),
                estimator.real_power(),
            ) {
                (Some(vrms), Some(irms), Some(power)) => {
                    println!(
                        "t={:4} ms: Vrms = {:6.1} V   Irms = {:5.2} A   P = {:7.1} W",
                        (cycle + 1) * 20,
                        vrms,
                        irms,
                        power
                    );
                }
                _ => println!("t={:4} ms: waiting for first window", (cycle + 1) * 20),
            }
        }
    }

    let stats = QUEUE.stats();
    println!("\nQueue statistics:");
    println!("  pushed:    {}", stats.pushed.load(Ordering::Relaxed));
    println!("  popped:    {}", stats.popped.load(Ordering::Relaxed));
    println!("  dropped:   {}", stats.dropped.load(Ordering::Relaxed));
    println!("  max depth: {}", stats.max_depth.load(Ordering::Relaxed));
}

//! Trigger-context sample acquisition
//!
//! The [`Sampler`] is the producer half of the pipeline. It runs once per
//! hardware trigger tick, alternating a shared analog-to-digital converter
//! between the voltage and current channels. Every second tick completes a
//! [`RawSamplePair`] and pushes it to the queue.
//!
//! The per-tick work is a fixed, short instruction sequence: one integer
//! move, a conditional push and the next conversion request. No floating
//! point, no loops, no logging. This keeps the handler well inside one
//! sampling period even on slow cores.
//!
//! The converter is injected through [`AdcDevice`] and the queue through a
//! shared reference, so the host's trigger handler captures the one
//! `Sampler` it serves instead of going through a process-wide singleton.

use crate::config::MonitorConfig;
use crate::queue::{RawSamplePair, SampleQueue};

/// Operations of the shared analog-to-digital converter
///
/// The device converts one channel at a time and is not reentrant: after
/// `select_channel` and `start_conversion`, the result of the finished
/// conversion is readable via `last_result` at the next trigger tick.
pub trait AdcDevice {
    /// Route the converter input to the given channel.
    fn select_channel(&mut self, channel: u8);

    /// Begin converting the currently selected channel.
    fn start_conversion(&mut self);

    /// Raw code of the most recently completed conversion.
    fn last_result(&self) -> u16;
}

/// Producer of sample pairs, driven by the periodic trigger
///
/// Owns the converter device and the channel sequencing state; shares
/// only the queue with the consumer side.
pub struct Sampler<'q, A: AdcDevice, const N: usize> {
    adc: A,
    queue: &'q SampleQueue<N>,
    /// Channel numbers in acquisition order: voltage, then current
    channels: [u8; 2],
    /// Index of the channel whose conversion is in flight, 0 or 1
    index: usize,
    /// Codes collected for the pair under assembly
    scratch: [u16; 2],
}

impl<'q, A: AdcDevice, const N: usize> Sampler<'q, A, N> {
    /// Wire a sampler to its converter and queue.
    pub fn new(adc: A, queue: &'q SampleQueue<N>, config: &MonitorConfig) -> Self {
        Self {
            adc,
            queue,
            channels: [config.voltage_channel(), config.current_channel()],
            index: 0,
            scratch: [0; 2],
        }
    }

    /// Kick off the first conversion.
    ///
    /// Call once before enabling the trigger: selects the voltage channel
    /// and starts converting it, so the first tick has a result to read.
    pub fn start(&mut self) {
        self.index = 0;
        self.adc.select_channel(self.channels[0]);
        self.adc.start_conversion();
    }

    /// Handle one trigger tick.
    ///
    /// Reads the completed conversion into the pair under assembly; when
    /// the pair is complete, pushes it and wraps back to the voltage
    /// channel. Always finishes by starting the next conversion.
    pub fn on_trigger(&mut self) {
        self.scratch[self.index] = self.adc.last_result();

        self.index += 1;
        if self.index == 2 {
            self.index = 0;
            // Drop-on-full: an overrun shows up in the queue stats, the
            // trigger path never waits for space
            self.queue.push(RawSamplePair {
                voltage: self.scratch[0],
                current: self.scratch[1],
            });
        }

        self.adc.select_channel(self.channels[self.index]);
        self.adc.start_conversion();
    }

    /// Access the underlying converter device.
    pub fn adc(&self) -> &A {
        &self.adc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::sync::atomic::Ordering;

    use crate::config::PHASE_COEFF_UNITY;

    /// Scripted converter: records every select/start, replays canned
    /// results in order.
    struct MockAdc {
        selected: u8,
        conversions: Vec<u8>,
        results: Vec<u16>,
        cursor: Cell<usize>,
    }

    impl MockAdc {
        fn new(results: Vec<u16>) -> Self {
            Self {
                selected: u8::MAX,
                conversions: Vec::new(),
                results,
                cursor: Cell::new(0),
            }
        }
    }

    impl AdcDevice for MockAdc {
        fn select_channel(&mut self, channel: u8) {
            self.selected = channel;
        }

        fn start_conversion(&mut self) {
            self.conversions.push(self.selected);
        }

        fn last_result(&self) -> u16 {
            let i = self.cursor.get();
            self.cursor.set(i + 1);
            self.results[i]
        }
    }

    fn config(voltage_channel: u8, current_channel: u8) -> MonitorConfig {
        MonitorConfig::new(400, 1, voltage_channel, current_channel, 1.0, 1.0, PHASE_COEFF_UNITY)
            .unwrap()
    }

    #[test]
    fn assembles_pairs_in_channel_order() {
        let queue = SampleQueue::<8>::new();
        let adc = MockAdc::new(vec![100, 200, 300, 400]);
        let mut sampler = Sampler::new(adc, &queue, &config(2, 3));

        sampler.start();
        for _ in 0..4 {
            sampler.on_trigger();
        }

        assert_eq!(queue.pop(), Some(RawSamplePair { voltage: 100, current: 200 }));
        assert_eq!(queue.pop(), Some(RawSamplePair { voltage: 300, current: 400 }));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn alternates_channels_every_tick() {
        let queue = SampleQueue::<8>::new();
        let adc = MockAdc::new(vec![0; 6]);
        let mut sampler = Sampler::new(adc, &queue, &config(2, 3));

        sampler.start();
        for _ in 0..4 {
            sampler.on_trigger();
        }

        // One conversion per tick plus the initial kick, strictly
        // alternating starting from the voltage channel
        assert_eq!(sampler.adc().conversions, vec![2, 3, 2, 3, 2]);
    }

    #[test]
    fn returns_to_voltage_channel_after_each_pair() {
        let queue = SampleQueue::<8>::new();
        let adc = MockAdc::new(vec![0; 4]);
        let mut sampler = Sampler::new(adc, &queue, &config(5, 6));

        sampler.start();
        sampler.on_trigger();
        sampler.on_trigger();

        // The conversion in flight after a completed pair is the voltage
        // channel of the next pair
        assert_eq!(sampler.adc().selected, 5);
    }

    #[test]
    fn overrun_drops_newest_pair() {
        let queue = SampleQueue::<2>::new(); // holds a single pair
        let adc = MockAdc::new(vec![1, 2, 3, 4]);
        let mut sampler = Sampler::new(adc, &queue, &config(0, 1));

        sampler.start();
        for _ in 0..4 {
            sampler.on_trigger();
        }

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.stats().dropped.load(Ordering::Relaxed), 1);
        assert_eq!(queue.pop(), Some(RawSamplePair { voltage: 1, current: 2 }));
    }
}

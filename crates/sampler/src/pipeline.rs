//! Acquisition Pipeline
//!
//! One read-filter-stamp-publish pass over the three channels, shared
//! between the periodic loop and the dispatcher's forced reads so the
//! filter state stays single-sourced.

use ads1115::{Ads1115, Channel, I2cBus};
use parking_lot::Mutex;
use recorder::Recorder;
use sample_ring::{Sample, SampleRing};
use signal_filter::FilterBank;
use std::sync::Arc;
use std::time::Instant;

pub struct Pipeline<B> {
    driver: Arc<Ads1115<B>>,
    recorder: Arc<Recorder>,
    ring: Arc<SampleRing>,
    filters: Mutex<FilterBank>,
    started: Instant,
}

impl<B: I2cBus> Pipeline<B> {
    pub fn new(driver: Arc<Ads1115<B>>, recorder: Arc<Recorder>, ring: Arc<SampleRing>) -> Self {
        Self {
            driver,
            recorder,
            ring,
            filters: Mutex::new(FilterBank::default()),
            started: Instant::now(),
        }
    }

    /// Whether the converter answered its startup probe.
    pub fn is_ready(&self) -> bool {
        self.driver.is_ready()
    }

    /// Milliseconds since the pipeline was built. Wraps after ~49 days,
    /// which downstream consumers tolerate.
    pub fn elapsed_ms(&self) -> u32 {
        self.started.elapsed().as_millis() as u32
    }

    /// Read the three channels, condition them and publish to the ring.
    ///
    /// The filter guard stays held across the ring push; that is what
    /// serialises writers the way [`SampleRing::push`] requires when the
    /// dispatcher forces a read concurrently with the loop.
    pub fn acquire_once(&self) -> Sample {
        let raw = [
            self.driver.read_channel_mv(Channel::A0),
            self.driver.read_channel_mv(Channel::A1),
            self.driver.read_channel_mv(Channel::A2),
        ];
        let mut filters = self.filters.lock();
        let [ch0_mv, ch1_mv, ch2_mv] = filters.apply(raw);
        let sample = Sample {
            timestamp_ms: self.elapsed_ms(),
            ch0_mv,
            ch1_mv,
            ch2_mv,
        };
        self.ring.push(sample);
        sample
    }

    /// One loop iteration: acquire, stage for the active recording, flush
    /// when the batch reports full.
    pub fn tick(&self) {
        let sample = self.acquire_once();
        if self.recorder.append(sample) {
            self.recorder.flush();
        }
    }
}

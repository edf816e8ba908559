//! Acquisition Thread
//!
//! Runs the periodic loop on a dedicated, named OS thread so converter
//! polling and file writes never compete with the async command surface
//! for an executor worker.

use crate::{Controls, Pipeline, OUTPUT_RATE_HZ};
use ads1115::I2cBus;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Configuration for the acquisition loop
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Output rate in Hz (default: 100.0)
    pub output_hz: f64,
}

impl SamplerConfig {
    /// Interval between ticks
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.output_hz)
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            output_hz: OUTPUT_RATE_HZ,
        }
    }
}

/// Handle to the running acquisition thread.
///
/// Dropping the handle stops the loop and joins the thread.
pub struct Sampler {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Sampler {
    /// Spawn the acquisition thread.
    ///
    /// The loop keeps a fixed deadline schedule (`next += period`) so the
    /// jitter of one tick never accumulates into rate drift; a tick slower
    /// than the period is followed by immediate catch-up ticks.
    pub fn spawn<B: I2cBus + 'static>(
        pipeline: Arc<Pipeline<B>>,
        controls: Arc<Controls>,
        config: SamplerConfig,
    ) -> io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&shutdown);
        let period = config.period();
        info!(
            "Acquisition loop starting: {} Hz, period {} ms, EMA alpha {}",
            config.output_hz,
            period.as_millis(),
            signal_filter::EMA_ALPHA
        );
        let handle = thread::Builder::new()
            .name("acquisition".into())
            .spawn(move || run_loop(pipeline, controls, stop, period))?;
        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the loop to exit and wait for the thread.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

fn run_loop<B: I2cBus>(
    pipeline: Arc<Pipeline<B>>,
    controls: Arc<Controls>,
    stop: Arc<AtomicBool>,
    period: Duration,
) {
    let mut next = Instant::now() + period;
    while !stop.load(Ordering::Acquire) {
        if controls.is_sampling() && pipeline.is_ready() {
            pipeline.tick();
        }
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        }
        next += period;
    }
    debug!("Acquisition loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use ads1115::{reg, Ads1115, DataRate, Gain, SimBus};
    use recorder::{Recorder, Volume};
    use sample_ring::SampleRing;

    fn sim_pipeline(
        probe: bool,
    ) -> (tempfile::TempDir, Arc<SampleRing>, Arc<Pipeline<SimBus>>) {
        let bus = SimBus::with_inputs_mv([500.0, 0.0, 0.0, 0.0]);
        bus.handle().set_conversion_polls(0);
        let driver = Arc::new(Ads1115::new(
            bus,
            reg::DEFAULT_ADDRESS,
            Gain::One,
            DataRate::Sps860,
        ));
        if probe {
            assert!(driver.probe());
        }
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(Recorder::new(Volume::new(dir.path())));
        let ring = Arc::new(SampleRing::with_default_capacity());
        let pipeline = Arc::new(Pipeline::new(driver, recorder, Arc::clone(&ring)));
        (dir, ring, pipeline)
    }

    #[test]
    fn test_config_period() {
        let config = SamplerConfig::default();
        assert_eq!(config.output_hz, 100.0);
        assert_eq!(config.period(), Duration::from_millis(10));
    }

    #[test]
    fn test_loop_samples_near_configured_rate() {
        let (_dir, ring, pipeline) = sim_pipeline(true);
        let controls = Arc::new(Controls::new());
        let sampler =
            Sampler::spawn(pipeline, controls, SamplerConfig::default()).unwrap();
        assert!(sampler.is_running());

        thread::sleep(Duration::from_millis(200));
        sampler.stop();

        // ~20 ticks expected; wide bounds to absorb scheduler noise
        let pushed = ring.total_pushed();
        assert!(pushed >= 8, "only {pushed} samples in 200 ms");
        assert!(pushed <= 45, "{pushed} samples in 200 ms");
    }

    #[test]
    fn test_disabled_sampling_produces_nothing() {
        let (_dir, ring, pipeline) = sim_pipeline(true);
        let controls = Arc::new(Controls::new());
        controls.set_sampling(false);
        let sampler =
            Sampler::spawn(pipeline, controls, SamplerConfig::default()).unwrap();
        thread::sleep(Duration::from_millis(50));
        sampler.stop();
        assert_eq!(ring.total_pushed(), 0);
    }

    #[test]
    fn test_unprobed_driver_produces_nothing() {
        let (_dir, ring, pipeline) = sim_pipeline(false);
        let controls = Arc::new(Controls::new());
        let sampler =
            Sampler::spawn(pipeline, controls, SamplerConfig::default()).unwrap();
        thread::sleep(Duration::from_millis(50));
        drop(sampler);
        assert_eq!(ring.total_pushed(), 0);
    }
}

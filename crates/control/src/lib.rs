//! ADC Logger Control Service
//!
//! Wires the acquisition stack to the two command transports and owns
//! the process lifecycle: probe the converter, mount storage, start the
//! acquisition loop, then serve commands until a shutdown or restart
//! request arrives.

pub mod dispatch;
pub mod framing;
pub mod netlink;
pub mod parser;
pub mod serial;
pub mod settings;
pub mod tcp;

pub use dispatch::Dispatcher;
pub use settings::Settings;

use crate::netlink::{NetLink, StaticLink};
use ads1115::{reg, Ads1115, DataRate, Gain, I2cBus, SimBus};
use recorder::{Recorder, Volume};
use sample_ring::SampleRing;
use sampler::{Controls, Pipeline, Sampler, SamplerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Delay between a restart request and teardown, long enough for the
/// response line to flush to its client.
const RESTART_GRACE: Duration = Duration::from_millis(200);

/// Initialize the logging system
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run the service against the simulated converter bus.
///
/// Hardware deployments plug a real bus in through [`run_with_bus`].
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    run_with_bus(settings, SimBus::new()).await
}

pub async fn run_with_bus<B: I2cBus + 'static>(settings: Settings, bus: B) -> anyhow::Result<()> {
    let gain = match Gain::parse(&settings.gain) {
        Some(gain) => gain,
        None => {
            warn!("Invalid gain {:?} in settings, using index 1", settings.gain);
            Gain::One
        }
    };
    let driver = Arc::new(Ads1115::new(
        bus,
        reg::DEFAULT_ADDRESS,
        gain,
        DataRate::Sps860,
    ));
    driver.probe();

    let recorder = Arc::new(Recorder::new(Volume::new(&settings.storage_root)));
    if let Err(err) = recorder.mount() {
        warn!("Storage unavailable at startup: {err}");
    }

    let ring = Arc::new(SampleRing::with_default_capacity());
    let pipeline = Arc::new(Pipeline::new(
        Arc::clone(&driver),
        Arc::clone(&recorder),
        Arc::clone(&ring),
    ));
    let controls = Arc::new(Controls::new());
    let sampler = Sampler::spawn(
        Arc::clone(&pipeline),
        Arc::clone(&controls),
        SamplerConfig {
            output_hz: settings.sample_rate_hz,
        },
    )?;

    let link: Arc<dyn NetLink> = Arc::new(StaticLink::load(
        &settings.wifi_state_path,
        settings.wifi.clone(),
        settings.address.clone(),
    ));
    let shutdown = Arc::new(Notify::new());
    let dispatcher = Arc::new(Dispatcher::new(
        driver,
        pipeline,
        ring,
        Arc::clone(&recorder),
        controls,
        link,
        Arc::clone(&shutdown),
    ));

    let listener = TcpListener::bind(("0.0.0.0", settings.port)).await?;
    let server = tokio::spawn(tcp::serve(listener, Arc::clone(&dispatcher)));
    let console = tokio::spawn(serial::serve(
        Arc::clone(&dispatcher),
        settings.console_device.clone(),
    ));

    tokio::select! {
        _ = shutdown.notified() => {
            tokio::time::sleep(RESTART_GRACE).await;
            info!("Restarting to apply new settings");
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutdown signal received");
        }
    }

    server.abort();
    console.abort();
    sampler.stop();
    if recorder.is_recording() {
        let name = recorder.stop();
        info!("Recording stopped in {name}");
    }
    Ok(())
}

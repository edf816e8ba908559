//! Command Dispatch
//!
//! Executes parsed commands against the shared acquisition state and maps
//! every outcome to the protocol's response strings. Handlers run to
//! completion on the blocking pool; both transports feed lines through
//! [`Dispatcher::dispatch`] and write back whatever single line it
//! returns.

use crate::netlink::{NetLink, WifiMode, WifiSettings};
use crate::parser::{self, Command};
use ads1115::{Ads1115, Gain, I2cBus};
use recorder::{Recorder, RecorderError};
use sample_ring::SampleRing;
use sampler::{Controls, Pipeline};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info};

const NOT_READY: &str = "ADS1115 not ready";

/// Breather between pausing the loop and swapping gain, so the tick in
/// flight finishes under the old setting.
const GAIN_SWAP_PAUSE: Duration = Duration::from_millis(2);

pub struct Dispatcher<B> {
    driver: Arc<Ads1115<B>>,
    pipeline: Arc<Pipeline<B>>,
    ring: Arc<SampleRing>,
    recorder: Arc<Recorder>,
    controls: Arc<Controls>,
    link: Arc<dyn NetLink>,
    shutdown: Arc<Notify>,
}

impl<B: I2cBus> Dispatcher<B> {
    pub fn new(
        driver: Arc<Ads1115<B>>,
        pipeline: Arc<Pipeline<B>>,
        ring: Arc<SampleRing>,
        recorder: Arc<Recorder>,
        controls: Arc<Controls>,
        link: Arc<dyn NetLink>,
        shutdown: Arc<Notify>,
    ) -> Self {
        Self {
            driver,
            pipeline,
            ring,
            recorder,
            controls,
            link,
            shutdown,
        }
    }

    /// The recorder, for the socket transport's file streaming.
    pub fn recorder(&self) -> &Arc<Recorder> {
        &self.recorder
    }

    /// Execute one request line and produce the response line.
    pub fn dispatch(&self, raw: &str) -> String {
        match parser::parse(raw) {
            Command::Adc => self.read_adc(),
            Command::Ip => self.link.ip(),
            Command::GainGet => self.gain_query(),
            Command::GainSet(value) => self.gain_set(value),
            Command::Wifi(args) => self.setup_wifi(args),
            Command::Start(name) => self.start_recording(name),
            Command::Stop => self.stop_recording(),
            Command::Delete(name) => self.delete_file(name),
            Command::Files => self.list_files(),
            Command::CheckRecording => self.check_recording(),
            Command::InitSd => self.init_storage(),
            Command::DeinitSd => self.deinit_storage(),
            Command::Unknown => "command not found".to_string(),
        }
    }

    fn read_adc(&self) -> String {
        if !self.driver.is_ready() {
            return NOT_READY.to_string();
        }
        if !self.controls.is_sampling() {
            self.controls.set_sampling(true);
        }
        // serve the cached value; only an empty cache forces a read
        let sample = match self.ring.latest() {
            Some(sample) => sample,
            None => self.pipeline.acquire_once(),
        };
        format!(
            "ADC0: {:.1} mV; ADC1: {:.1} mV; ADC2: {:.1} mV;",
            sample.ch0_mv, sample.ch1_mv, sample.ch2_mv
        )
    }

    fn gain_query(&self) -> String {
        if !self.driver.is_ready() {
            return NOT_READY.to_string();
        }
        self.driver.gain().index().to_string()
    }

    fn gain_set(&self, value: &str) -> String {
        if !self.driver.is_ready() {
            return NOT_READY.to_string();
        }
        let Some(gain) = Gain::parse(value) else {
            return format!(
                "Error: Invalid gain value '{value}'. Use index 0..5 or 2/3,1,2,4,8,16"
            );
        };
        let was_sampling = self.controls.set_sampling(false);
        thread::sleep(GAIN_SWAP_PAUSE);
        let previous = self.driver.set_gain(gain);
        self.controls.set_sampling(was_sampling);
        info!(
            "ADS1115 gain changed {} -> {} (range {})",
            previous.index(),
            gain.index(),
            gain.range_label()
        );
        gain.index().to_string()
    }

    fn setup_wifi(&self, args: &str) -> String {
        if self.recorder.is_recording() {
            return "Error: Unable setup wifi during recording!".to_string();
        }
        let Some(parsed) = parser::parse_wifi(args) else {
            return "Error: Invalid wifi command".to_string();
        };
        let settings = WifiSettings {
            mode: WifiMode::from_arg(parsed.mode),
            ssid: parsed.ssid.to_string(),
            pwd: parsed.pwd.to_string(),
        };
        if let Err(err) = self.link.apply(&settings) {
            error!("Failed to persist WiFi settings: {err}");
        }
        info!("WiFi settings saved. Restarting...");
        self.shutdown.notify_one();
        "Restarting to apply WiFi settings".to_string()
    }

    fn start_recording(&self, raw_name: &str) -> String {
        match self.recorder.start(raw_name) {
            Ok(name) => {
                self.controls.set_sampling(true);
                info!("Recording started in {name}");
                format!("Recording started in {name}")
            }
            Err(RecorderError::NotMounted) => "Error: SD card not initialized.".to_string(),
            Err(RecorderError::AlreadyRecording(current)) => {
                format!("Error: Unable to start new recording due to {current}")
            }
            Err(err) => format!("Error: {err}"),
        }
    }

    fn stop_recording(&self) -> String {
        let name = self.recorder.stop();
        if !name.is_empty() {
            info!("Recording stopped in {name}");
        }
        format!("Recording stopped in {name}")
    }

    fn delete_file(&self, name: &str) -> String {
        match self.recorder.delete(name) {
            Ok(()) => format!("File {name} deleted"),
            Err(RecorderError::NotMounted) => "Error: SD card not initialized.".to_string(),
            Err(RecorderError::EmptyName) => "Error: Empty file name".to_string(),
            Err(RecorderError::ActiveFile) => {
                "Error: Unable delete current recording file!".to_string()
            }
            Err(RecorderError::NotFound(_)) => format!("Error: File {name} not found"),
            Err(_) => format!("Error: Failed to delete {name}"),
        }
    }

    fn list_files(&self) -> String {
        match self.recorder.list() {
            Ok(entries) => {
                let mut out = String::new();
                for entry in entries {
                    match entry.size {
                        Some(size) => out.push_str(&format!("{}:{};", entry.name, size)),
                        None => out.push_str(&format!("{};", entry.name)),
                    }
                }
                out
            }
            Err(RecorderError::NotMounted) => "Error: SD card not initialized".to_string(),
            Err(_) => "Error: Failed to open directory".to_string(),
        }
    }

    fn check_recording(&self) -> String {
        match self.recorder.status() {
            Some(name) => format!("Recording to {name}"),
            None => "Not recording".to_string(),
        }
    }

    fn init_storage(&self) -> String {
        if self.recorder.is_mounted() {
            return "SD card is already initialized.".to_string();
        }
        match self.recorder.mount() {
            Ok(()) => "SD card initialized.".to_string(),
            Err(_) => "Failed to initialize SD card.".to_string(),
        }
    }

    fn deinit_storage(&self) -> String {
        if !self.recorder.is_mounted() {
            return "SD card is already deinitialized.".to_string();
        }
        if self.recorder.is_recording() {
            self.recorder.stop();
        }
        self.recorder.unmount();
        "SD card deinitialized. Safe to remove.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::StaticLink;
    use ads1115::{reg, Channel, DataRate, SimBus, SimHandle};
    use recorder::Volume;
    use std::path::PathBuf;

    struct Harness {
        _dir: tempfile::TempDir,
        dispatcher: Dispatcher<SimBus>,
        handle: SimHandle,
        ring: Arc<SampleRing>,
        recorder: Arc<Recorder>,
        controls: Arc<Controls>,
        shutdown: Arc<Notify>,
        state_path: PathBuf,
    }

    fn build(probe: bool) -> Harness {
        let bus = SimBus::with_inputs_mv([1250.0, -500.0, 3300.0, 0.0]);
        let handle = bus.handle();
        handle.set_conversion_polls(0);
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
        let recorder = Arc::new(Recorder::new(Volume::new(dir.path().join("card"))));
        recorder.mount().unwrap();
        let ring = Arc::new(SampleRing::with_default_capacity());
        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&driver),
            Arc::clone(&recorder),
            Arc::clone(&ring),
        ));
        let controls = Arc::new(Controls::new());
        let state_path = dir.path().join("wifi.json");
        let link = Arc::new(StaticLink::load(
            &state_path,
            WifiSettings::default(),
            None,
        ));
        let shutdown = Arc::new(Notify::new());

        let dispatcher = Dispatcher::new(
            driver,
            pipeline,
            Arc::clone(&ring),
            Arc::clone(&recorder),
            Arc::clone(&controls),
            link,
            Arc::clone(&shutdown),
        );
        Harness {
            _dir: dir,
            dispatcher,
            handle,
            ring,
            recorder,
            controls,
            shutdown,
            state_path,
        }
    }

    fn harness() -> Harness {
        build(true)
    }

    #[test]
    fn test_unknown_command_reports_not_found() {
        let h = harness();
        assert_eq!(h.dispatcher.dispatch("bogus"), "command not found");
        assert_eq!(h.dispatcher.dispatch(""), "command not found");
        // file streaming is a socket continuation, not a console command
        assert_eq!(h.dispatcher.dispatch("hostFile=a.txt"), "command not found");
    }

    #[test]
    fn test_converter_commands_require_ready() {
        let h = build(false);
        assert_eq!(h.dispatcher.dispatch("adc"), "ADS1115 not ready");
        assert_eq!(h.dispatcher.dispatch("adsGain"), "ADS1115 not ready");
        assert_eq!(h.dispatcher.dispatch("adsGain=2"), "ADS1115 not ready");
    }

    #[test]
    fn test_adc_forces_read_when_cache_empty() {
        let h = harness();
        h.controls.set_sampling(false);
        assert!(h.ring.latest().is_none());

        let response = h.dispatcher.dispatch("adc");
        assert_eq!(response, "ADC0: 1250.0 mV; ADC1: -500.0 mV; ADC2: 3300.0 mV;");
        // the forced read lands in the cache and re-enables sampling
        assert!(h.ring.latest().is_some());
        assert!(h.controls.is_sampling());
    }

    #[test]
    fn test_adc_serves_cached_sample() {
        let h = harness();
        h.dispatcher.dispatch("adc");
        // input changes but the cache already holds a sample
        h.handle.set_input_mv(Channel::A0, 2000.0);
        assert_eq!(
            h.dispatcher.dispatch("adc"),
            "ADC0: 1250.0 mV; ADC1: -500.0 mV; ADC2: 3300.0 mV;"
        );
    }

    #[test]
    fn test_gain_query_and_set() {
        let h = harness();
        assert_eq!(h.dispatcher.dispatch("adsGain"), "1");
        assert_eq!(h.dispatcher.dispatch("adsGain=2/3"), "0");
        assert_eq!(h.dispatcher.dispatch("adsGain"), "0");
        // a pure-digit value is an index, not an alias
        assert_eq!(h.dispatcher.dispatch("adsGain=4"), "4");
        assert_eq!(h.dispatcher.dispatch("adsGain=16x"), "5");
    }

    #[test]
    fn test_gain_set_rejects_invalid_values() {
        let h = harness();
        assert_eq!(
            h.dispatcher.dispatch("adsGain=banana"),
            "Error: Invalid gain value 'banana'. Use index 0..5 or 2/3,1,2,4,8,16"
        );
        assert_eq!(
            h.dispatcher.dispatch("adsGain=16"),
            "Error: Invalid gain value '16'. Use index 0..5 or 2/3,1,2,4,8,16"
        );
        assert_eq!(
            h.dispatcher.dispatch("adsGain="),
            "Error: Invalid gain value ''. Use index 0..5 or 2/3,1,2,4,8,16"
        );
    }

    #[test]
    fn test_gain_set_restores_sampling_state() {
        let h = harness();
        h.controls.set_sampling(false);
        h.dispatcher.dispatch("adsGain=2");
        assert!(!h.controls.is_sampling());

        h.controls.set_sampling(true);
        h.dispatcher.dispatch("adsGain=1");
        assert!(h.controls.is_sampling());
    }

    #[test]
    fn test_ip_reports_mode_fallback() {
        let h = harness();
        assert_eq!(h.dispatcher.dispatch("ip"), "192.168.4.1");
    }

    #[test]
    fn test_recording_lifecycle() {
        let h = harness();
        assert_eq!(h.dispatcher.dispatch("checkRecording"), "Not recording");
        assert_eq!(
            h.dispatcher.dispatch("start=log1"),
            "Recording started in log1"
        );
        assert_eq!(h.dispatcher.dispatch("checkRecording"), "Recording to log1");
        assert_eq!(
            h.dispatcher.dispatch("start=log2"),
            "Error: Unable to start new recording due to log1"
        );
        assert_eq!(
            h.dispatcher.dispatch("stop"),
            "Recording stopped in log1"
        );
        assert_eq!(h.dispatcher.dispatch("checkRecording"), "Not recording");
    }

    #[test]
    fn test_start_enables_sampling() {
        let h = harness();
        h.controls.set_sampling(false);
        h.dispatcher.dispatch("start=run.txt");
        assert!(h.controls.is_sampling());
    }

    #[test]
    fn test_stop_while_idle_reports_empty_name() {
        let h = harness();
        assert_eq!(h.dispatcher.dispatch("stop"), "Recording stopped in ");
    }

    #[test]
    fn test_unmounted_volume_error_strings() {
        let h = harness();
        h.dispatcher.dispatch("deinitSD");
        assert_eq!(
            h.dispatcher.dispatch("start=x"),
            "Error: SD card not initialized."
        );
        assert_eq!(
            h.dispatcher.dispatch("delete=x"),
            "Error: SD card not initialized."
        );
        // the listing error carries no trailing period
        assert_eq!(
            h.dispatcher.dispatch("files"),
            "Error: SD card not initialized"
        );
    }

    #[test]
    fn test_files_listing_format() {
        let h = harness();
        h.dispatcher.dispatch("start=a.txt");
        h.dispatcher.recorder.append(sample_ring::Sample {
            timestamp_ms: 1,
            ch0_mv: 1.0,
            ch1_mv: 2.0,
            ch2_mv: 3.0,
        });
        h.dispatcher.dispatch("stop");

        let listing = h.dispatcher.dispatch("files");
        assert!(listing.contains("a.txt:"));
        assert!(listing.ends_with(';'));
    }

    #[test]
    fn test_delete_variants() {
        let h = harness();
        assert_eq!(h.dispatcher.dispatch("delete="), "Error: Empty file name");
        assert_eq!(
            h.dispatcher.dispatch("delete=nope.txt"),
            "Error: File nope.txt not found"
        );
        h.dispatcher.dispatch("start=keep.txt");
        assert_eq!(
            h.dispatcher.dispatch("delete=keep.txt"),
            "Error: Unable delete current recording file!"
        );
        h.recorder.append(sample_ring::Sample::default());
        h.dispatcher.dispatch("stop");
        assert_eq!(
            h.dispatcher.dispatch("delete=keep.txt"),
            "File keep.txt deleted"
        );
    }

    #[test]
    fn test_storage_lifecycle_strings() {
        let h = harness();
        assert_eq!(
            h.dispatcher.dispatch("initSD"),
            "SD card is already initialized."
        );
        assert_eq!(
            h.dispatcher.dispatch("deinitSD"),
            "SD card deinitialized. Safe to remove."
        );
        assert_eq!(
            h.dispatcher.dispatch("deinitSD"),
            "SD card is already deinitialized."
        );
        assert_eq!(h.dispatcher.dispatch("initSD"), "SD card initialized.");
    }

    #[test]
    fn test_deinit_stops_active_recording() {
        let h = harness();
        h.dispatcher.dispatch("start=live.txt");
        h.recorder.append(sample_ring::Sample::default());
        assert_eq!(
            h.dispatcher.dispatch("deinitSD"),
            "SD card deinitialized. Safe to remove."
        );
        assert!(!h.recorder.is_recording());
        assert_eq!(h.dispatcher.dispatch("checkRecording"), "Not recording");
    }

    #[test]
    fn test_wifi_rejected_while_recording() {
        let h = harness();
        h.dispatcher.dispatch("start=busy.txt");
        assert_eq!(
            h.dispatcher.dispatch("wifi=own;ssid=esp;pwd=12345678"),
            "Error: Unable setup wifi during recording!"
        );
    }

    #[test]
    fn test_wifi_malformed_is_rejected() {
        let h = harness();
        assert_eq!(
            h.dispatcher.dispatch("wifi=own;ssid=esp"),
            "Error: Invalid wifi command"
        );
        assert_eq!(
            h.dispatcher.dispatch("wifi=own;pwd=x;ssid=y"),
            "Error: Invalid wifi command"
        );
    }

    #[tokio::test]
    async fn test_wifi_persists_and_requests_restart() {
        let h = harness();
        assert_eq!(
            h.dispatcher.dispatch("wifi=other;ssid=Home;pwd=secret12"),
            "Restarting to apply WiFi settings"
        );

        let saved: WifiSettings =
            serde_json::from_str(&std::fs::read_to_string(&h.state_path).unwrap()).unwrap();
        assert_eq!(saved.mode, WifiMode::Other);
        assert_eq!(saved.ssid, "Home");
        assert_eq!(saved.pwd, "secret12");

        // the restart request must already be pending
        tokio::time::timeout(Duration::from_millis(100), h.shutdown.notified())
            .await
            .unwrap();
    }
}

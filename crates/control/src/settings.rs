//! Configuration
//!
//! Layered settings: an optional `logger.toml`, overridden by `LOGGER_*`
//! environment variables. Every field has a default so the service comes
//! up with no configuration present at all.

use crate::netlink::WifiSettings;
use config::Config;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// TCP command port
    pub port: u16,
    /// Directory backing the storage volume
    pub storage_root: PathBuf,
    /// Serial console device path; process stdin/stdout when unset
    pub console_device: Option<String>,
    /// Acquisition loop rate in Hz
    pub sample_rate_hz: f64,
    /// Boot gain, as an index or alias the `adsGain=` command would accept
    pub gain: String,
    /// Advertised address for the `ip` command
    pub address: Option<String>,
    /// Link defaults used until a `wifi=` command persists its own
    pub wifi: WifiSettings,
    /// Where applied wifi settings are persisted
    pub wifi_state_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 8080,
            storage_root: PathBuf::from("data"),
            console_device: None,
            sample_rate_hz: 100.0,
            gain: "1".to_string(),
            address: None,
            wifi: WifiSettings::default(),
            wifi_state_path: PathBuf::from("wifi.json"),
        }
    }
}

impl Settings {
    /// Load settings from `<config_name>.toml` (default `logger`) plus
    /// environment overrides.
    pub fn new(config_name: Option<&str>) -> Result<Self, config::ConfigError> {
        let s = Config::builder()
            .add_source(config::File::with_name(config_name.unwrap_or("logger")).required(false))
            .add_source(config::Environment::with_prefix("LOGGER").separator("__"))
            .build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::WifiMode;

    #[test]
    fn test_defaults_without_config_file() {
        let settings = Settings::default();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.sample_rate_hz, 100.0);
        assert_eq!(settings.gain, "1");
        assert_eq!(settings.wifi.mode, WifiMode::Own);
        assert_eq!(settings.wifi.ssid, "esp");
        assert_eq!(settings.wifi.pwd, "12345678");
        assert!(settings.console_device.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logger.toml");
        std::fs::write(
            &path,
            "port = 9000\nsample_rate_hz = 50.0\n\n[wifi]\nmode = \"other\"\nssid = \"Home\"\npwd = \"secret12\"\n",
        )
        .unwrap();

        let settings = Settings::new(path.to_str()).unwrap();
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.sample_rate_hz, 50.0);
        assert_eq!(settings.wifi.mode, WifiMode::Other);
        assert_eq!(settings.wifi.ssid, "Home");
        // untouched fields keep their defaults
        assert_eq!(settings.gain, "1");
        assert_eq!(settings.storage_root, PathBuf::from("data"));
    }
}

//! Network Link Interface
//!
//! The device is reachable either as its own access point (`own`) or as a
//! station on an existing network (`other`). Actually bringing a link up
//! is outside this system; the dispatcher only needs the mode, an address
//! to report, and a place to persist settings a `wifi=` command applies
//! for the next boot.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors from persisting link settings
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("failed to encode wifi settings: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write wifi settings: {0}")]
    Persist(#[from] std::io::Error),
}

/// Which side of the link this device sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WifiMode {
    /// Self-hosted access point
    Own,
    /// Station joining an existing network
    Other,
}

impl WifiMode {
    /// Mode named by a `wifi=` command; anything but `other` hosts.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "other" {
            WifiMode::Other
        } else {
            WifiMode::Own
        }
    }

    /// Address reported when the link has none of its own.
    pub fn fallback_ip(self) -> &'static str {
        match self {
            WifiMode::Own => "192.168.4.1",
            WifiMode::Other => "0.0.0.0",
        }
    }
}

/// Persisted link credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiSettings {
    pub mode: WifiMode,
    pub ssid: String,
    pub pwd: String,
}

impl Default for WifiSettings {
    fn default() -> Self {
        Self {
            mode: WifiMode::Own,
            ssid: "esp".to_string(),
            pwd: "12345678".to_string(),
        }
    }
}

/// What the command surface needs from the network stack.
pub trait NetLink: Send + Sync {
    fn mode(&self) -> WifiMode;
    fn is_ready(&self) -> bool;
    /// Address for the active mode.
    fn ip(&self) -> String;
    /// Persist new settings for the next boot.
    fn apply(&self, settings: &WifiSettings) -> Result<(), LinkError>;
}

/// Shipped link implementation: a fixed mode and address from
/// configuration, with settings persisted to a state file.
pub struct StaticLink {
    settings: WifiSettings,
    address: Option<String>,
    state_path: PathBuf,
}

impl StaticLink {
    /// Build from the persisted state file, falling back to `defaults`
    /// when it is absent or unreadable.
    pub fn load(state_path: impl Into<PathBuf>, defaults: WifiSettings, address: Option<String>) -> Self {
        let state_path = state_path.into();
        let settings = match read_settings(&state_path) {
            Some(saved) => saved,
            None => defaults,
        };
        info!(
            "WiFi link: mode {:?}, ssid {:?}",
            settings.mode, settings.ssid
        );
        Self {
            settings,
            address,
            state_path,
        }
    }
}

fn read_settings(path: &Path) -> Option<WifiSettings> {
    if !path.exists() {
        return None;
    }
    match fs::read_to_string(path) {
        Ok(body) => match serde_json::from_str(&body) {
            Ok(settings) => Some(settings),
            Err(err) => {
                warn!("Ignoring corrupt wifi settings at {}: {err}", path.display());
                None
            }
        },
        Err(err) => {
            error!("Failed to read wifi settings at {}: {err}", path.display());
            None
        }
    }
}

impl NetLink for StaticLink {
    fn mode(&self) -> WifiMode {
        self.settings.mode
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn ip(&self) -> String {
        match &self.address {
            Some(addr) => addr.clone(),
            None => self.settings.mode.fallback_ip().to_string(),
        }
    }

    fn apply(&self, settings: &WifiSettings) -> Result<(), LinkError> {
        let body = serde_json::to_string_pretty(settings)?;
        fs::write(&self.state_path, body)?;
        info!("WiFi settings saved to {}", self.state_path.display());
        Ok(())
    }
}

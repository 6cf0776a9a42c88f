//! Persisted console configuration
//!
//! The settings file holds the last-used transport parameters and the
//! device registry. It lives next to the working directory as
//! `appsettings.config` and is only written when the operator asks for it.
//!
//! Loading never fails from the caller's point of view: a missing file and
//! an unreadable or malformed one both fall back to defaults. The two are
//! still told apart by [`LoadOutcome`] so the malformed case can be logged.

use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

use super::registry::DeviceRegistry;

pub const DEFAULT_SETTINGS_FILE: &str = "appsettings.config";

#[cfg(windows)]
const DEFAULT_SERIAL_PORT: &str = "COM1";
#[cfg(not(windows))]
const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";

const DEFAULT_BAUD_RATE: u32 = 9600;
const DEFAULT_TCP_PORT: u16 = 4900;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SerialConnectionSettings {
    pub port_name: String,
    pub baud_rate: u32,
}

impl Default for SerialConnectionSettings {
    fn default() -> Self {
        Self {
            port_name: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TcpServerConnectionSettings {
    pub port_number: u16,
    pub baud_rate: u32,
}

impl Default for TcpServerConnectionSettings {
    fn default() -> Self {
        Self {
            port_number: DEFAULT_TCP_PORT,
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Settings {
    pub serial_connection_settings: SerialConnectionSettings,
    pub tcp_server_connection_settings: TcpServerConnectionSettings,
    pub devices: DeviceRegistry,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("settings file {path:?} is malformed: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write settings to {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// What [`SettingsStore::load`] found on disk.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Settings),
    NotFound,
    /// The file exists but could not be read or parsed.
    Malformed(SettingsError),
}

impl LoadOutcome {
    /// The loaded settings, or defaults for either failure kind.
    pub fn into_settings(self) -> Settings {
        match self {
            LoadOutcome::Loaded(settings) => settings,
            LoadOutcome::NotFound | LoadOutcome::Malformed(_) => Settings::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store backed by `appsettings.config` in the current working directory.
    pub fn in_working_dir() -> io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?.join(DEFAULT_SETTINGS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> LoadOutcome {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("No saved settings found at {:?}", self.path);
                return LoadOutcome::NotFound;
            }
            Err(source) => {
                return LoadOutcome::Malformed(SettingsError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_str::<Settings>(&json) {
            Ok(settings) => {
                log::info!(
                    "Loaded {} devices from {:?}",
                    settings.devices.len(),
                    self.path
                );
                LoadOutcome::Loaded(settings)
            }
            Err(source) => LoadOutcome::Malformed(SettingsError::Parse {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Write `settings` through a temporary sibling so a failed write never
    /// truncates the previous file.
    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(settings)?;
        let tmp_path = self.path.with_extension("config.tmp");

        fs::write(&tmp_path, json).map_err(|source| SettingsError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            SettingsError::Write {
                path: self.path.clone(),
                source,
            }
        })?;

        log::debug!(
            "Saved {} devices to {:?}",
            settings.devices.len(),
            self.path
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::DeviceSetting;

    #[test]
    fn test_parses_documented_format() {
        let json = r#"{
            "SerialConnectionSettings": { "PortName": "COM3", "BaudRate": 115200 },
            "TcpServerConnectionSettings": { "PortNumber": 5000, "BaudRate": 9600 },
            "Devices": [
                { "Address": 1, "Name": "Front door", "UseCrc": true, "UseSecureChannel": false },
                { "Address": 0, "Name": "Lobby", "UseCrc": false, "UseSecureChannel": true }
            ]
        }"#;

        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.serial_connection_settings.port_name, "COM3");
        assert_eq!(settings.serial_connection_settings.baud_rate, 115200);
        assert_eq!(settings.tcp_server_connection_settings.port_number, 5000);
        let order: Vec<u8> = settings.devices.iter().map(|d| d.address).collect();
        assert_eq!(order, vec![1, 0]);
        assert!(settings
            .devices
            .iter()
            .all(|d| d.secure_channel_key.is_none()));
    }

    #[test]
    fn test_key_is_written_as_hex_and_omitted_when_absent() {
        let mut settings = Settings::default();
        let mut keyed = DeviceSetting::new(2, "keyed");
        keyed.secure_channel_key = Some(vec![0xAB; 16]);
        settings.devices.upsert(keyed, |_| true);
        settings.devices.upsert(DeviceSetting::new(3, "plain"), |_| true);

        let value = serde_json::to_value(&settings).unwrap();
        let devices = value["Devices"].as_array().unwrap();
        assert_eq!(devices[0]["SecureChannelKey"], "AB".repeat(16));
        assert!(devices[1].get("SecureChannelKey").is_none());
    }

    #[test]
    fn test_address_out_of_range_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SETTINGS_FILE);
        fs::write(
            &path,
            r#"{ "Devices": [ { "Address": 300, "Name": "x", "UseCrc": true, "UseSecureChannel": false } ] }"#,
        )
        .unwrap();

        let outcome = SettingsStore::new(&path).load();
        assert!(matches!(
            outcome,
            LoadOutcome::Malformed(SettingsError::Parse { .. })
        ));
        assert_eq!(outcome.into_settings(), Settings::default());
    }
}

//! Ambient configuration: device assignments and export defaults read from
//! `<app-home>/config.toml`. Absence of the file is not an error;
//! `Config::default()` applies.

use base::{err, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub path: PathBuf,
    pub alias: String,
    /// Optional reference to a previously saved calibration profile id; if
    /// absent, the device records uncalibrated until a calibration pass is
    /// run for it.
    #[serde(default)]
    pub profile_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_rate_hz")]
    pub default_rate_hz: u32,
}

fn default_export_rate_hz() -> u32 {
    30
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            default_rate_hz: default_export_rate_hz(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, rename = "devices")]
    pub devices: Vec<DeviceConfig>,
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Loads `<app_home>/config.toml`. A missing file yields
    /// `Config::default()`, not an error; a present-but-malformed file is
    /// `InvalidArgument`.
    pub fn load(app_home: &Path) -> Result<Self, Error> {
        let path = app_home.join("config.toml");
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(err!(Internal, "failed to read {}: {e}", path.display())),
        };
        toml::from_str(&text).map_err(|e| err!(InvalidArgument, "invalid config.toml: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.devices.is_empty());
        assert_eq!(config.export.default_rate_hz, 30);
    }

    #[test]
    fn parses_device_assignments_and_export_rate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            r#"
            [[devices]]
            path = "/dev/input/event3"
            alias = "P1"

            [export]
            default_rate_hz = 60
            "#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.devices.len(), 1);
        assert_eq!(config.devices[0].alias, "P1");
        assert_eq!(config.export.default_rate_hz, 60);
    }

    #[test]
    fn malformed_config_is_invalid_argument() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "not valid toml [[[").unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert_eq!(err.kind(), base::ErrorKind::InvalidArgument);
    }
}

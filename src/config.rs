//! Configuration management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::epd2in13bc::{DriverSettings, DEFAULT_BUSY_POLL_MS, DEFAULT_BUSY_TIMEOUT_MS, GEOMETRY};

/// Used when no `--config` is given; a missing file there means defaults.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Panel wiring
    #[serde(default)]
    pub bus: BusSection,

    /// Driver timing
    #[serde(default)]
    pub display: DisplaySection,

    /// Where the numbers come from
    #[serde(default)]
    pub source: SourceSection,

    /// Refresh intervals
    #[serde(default)]
    pub schedule: ScheduleSection,

    /// Rendering options
    #[serde(default)]
    pub render: RenderSection,
}

/// SPI device and GPIO lines (BCM numbering).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusSection {
    #[serde(default = "default_spi_device")]
    pub device: PathBuf,

    #[serde(default = "default_speed_hz")]
    pub speed_hz: u32,

    #[serde(default = "default_reset_pin")]
    pub reset_pin: u64,

    #[serde(default = "default_dc_pin")]
    pub dc_pin: u64,

    /// Unset: spidev drives its own chip select (CE0, BCM8)
    #[serde(default)]
    pub cs_pin: Option<u64>,

    #[serde(default = "default_busy_pin")]
    pub busy_pin: u64,
}

impl Default for BusSection {
    fn default() -> Self {
        Self {
            device: default_spi_device(),
            speed_hz: default_speed_hz(),
            reset_pin: default_reset_pin(),
            dc_pin: default_dc_pin(),
            cs_pin: None,
            busy_pin: default_busy_pin(),
        }
    }
}

/// Busy line handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySection {
    /// Interval between two reads of the busy line
    #[serde(default = "default_busy_poll_ms")]
    pub busy_poll_ms: u32,

    /// Give up on the controller after this long
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            busy_poll_ms: default_busy_poll_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// Stats page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSection {
    #[serde(default = "default_url")]
    pub url: String,

    /// Row of the country table shown on the right
    #[serde(default = "default_country")]
    pub country: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            country: default_country(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Refresh loop timing, all in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSection {
    /// Pause after the first refresh
    #[serde(default = "default_first_interval")]
    pub first_interval_secs: u64,

    /// Pause after every later refresh
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Pause after a failed fetch
    #[serde(default = "default_retry")]
    pub retry_secs: u64,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            first_interval_secs: default_first_interval(),
            interval_secs: default_interval(),
            retry_secs: default_retry(),
        }
    }
}

impl ScheduleSection {
    /// Pause after the refresh with the given zero based index
    pub fn pause_after(&self, cycle: u64) -> Duration {
        if cycle == 0 {
            Duration::from_secs(self.first_interval_secs)
        } else {
            Duration::from_secs(self.interval_secs)
        }
    }

    pub fn retry(&self) -> Duration {
        Duration::from_secs(self.retry_secs)
    }
}

/// Rendering configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSection {
    /// Write every rendered frame to this PNG as well
    #[serde(default)]
    pub snapshot: Option<PathBuf>,

    /// TrueType font for all text; the built-in mono fonts when unset or unreadable
    #[serde(default)]
    pub font: Option<PathBuf>,

    /// Pixel size of labels and the smaller numbers
    #[serde(default = "default_small_size")]
    pub small_size: u32,

    /// Pixel size of the case counts
    #[serde(default = "default_large_size")]
    pub large_size: u32,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            snapshot: None,
            font: None,
            small_size: default_small_size(),
            large_size: default_large_size(),
        }
    }
}

// Default value functions
fn default_spi_device() -> PathBuf {
    PathBuf::from("/dev/spidev0.0")
}

fn default_speed_hz() -> u32 {
    2_000_000
}

fn default_reset_pin() -> u64 {
    17
}

fn default_dc_pin() -> u64 {
    25
}

fn default_busy_pin() -> u64 {
    24
}

fn default_busy_poll_ms() -> u32 {
    DEFAULT_BUSY_POLL_MS
}

fn default_busy_timeout_ms() -> u32 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_url() -> String {
    "https://www.worldometers.info/coronavirus/".to_string()
}

fn default_country() -> String {
    "Czechia".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_first_interval() -> u64 {
    20
}

fn default_interval() -> u64 {
    300
}

fn default_retry() -> u64 {
    10
}

fn default_small_size() -> u32 {
    16
}

fn default_large_size() -> u32 {
    32
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Loads the given file, or the default path when there is none.
    ///
    /// Only a missing file at the default path falls back to defaults; a
    /// path given explicitly has to exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path)
                .with_context(|| format!("Failed to load {}", path.display())),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH),
            None => Ok(Self::default()),
        }
    }

    /// Driver parameters for the 2.13" (B/C) panel
    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            geometry: GEOMETRY,
            busy_poll_ms: self.display.busy_poll_ms,
            busy_timeout_ms: self.display.busy_timeout_ms,
        }
    }

    /// Wiring for [LinuxBus](crate::bus::LinuxBus)
    #[cfg(feature = "linux-dev")]
    pub fn bus_config(&self) -> crate::bus::BusConfig {
        crate::bus::BusConfig {
            device: self.bus.device.clone(),
            speed_hz: self.bus.speed_hz,
            reset_pin: self.bus.reset_pin,
            dc_pin: self.bus.dc_pin,
            cs_pin: self.bus.cs_pin,
            busy_pin: self.bus.busy_pin,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.source.country, "Czechia");
        assert_eq!(config.schedule.retry(), Duration::from_secs(10));
        assert_eq!(config.display.busy_timeout_ms, 60_000);
        assert_eq!(config.render.snapshot, None);
        assert_eq!(config.render.font, None);
        assert_eq!((config.render.small_size, config.render.large_size), (16, 32));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [bus]
            busy_pin = 5

            [source]
            country = "Slovakia"

            [schedule]
            interval_secs = 600

            [render]
            snapshot = "/tmp/panel.png"
            font = "font/m3x6.ttf"
            "#,
        )
        .unwrap();
        assert_eq!(config.bus.busy_pin, 5);
        assert_eq!(config.bus.dc_pin, 25);
        assert_eq!(config.bus.cs_pin, None);
        assert_eq!(config.source.country, "Slovakia");
        assert_eq!(config.source.url, default_url());
        assert_eq!(config.schedule.interval_secs, 600);
        assert_eq!(config.schedule.first_interval_secs, 20);
        assert_eq!(config.render.snapshot, Some(PathBuf::from("/tmp/panel.png")));
        assert_eq!(config.render.font, Some(PathBuf::from("font/m3x6.ttf")));
        assert_eq!(config.render.large_size, 32);
    }

    #[test]
    fn first_pause_is_shorter() {
        let schedule = ScheduleSection::default();
        assert_eq!(schedule.pause_after(0), Duration::from_secs(20));
        assert_eq!(schedule.pause_after(1), Duration::from_secs(300));
        assert_eq!(schedule.pause_after(7), Duration::from_secs(300));
    }

    #[test]
    fn driver_settings_follow_display_section() {
        let mut config = Config::default();
        config.display.busy_timeout_ms = 5_000;
        let settings = config.driver_settings();
        assert_eq!(settings.geometry, GEOMETRY);
        assert_eq!(settings.busy_poll_ms, 100);
        assert_eq!(settings.busy_timeout_ms, 5_000);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let path = Path::new("/nonexistent/epd-stats.toml");
        assert!(Config::load_or_default(Some(path)).is_err());
    }

    #[test]
    fn shipped_config_parses() {
        let content = include_str!("../config/default.toml");
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config, Config::default());
    }

    #[cfg(feature = "linux-dev")]
    #[test]
    fn bus_config_matches_bus_defaults() {
        assert_eq!(
            Config::default().bus_config(),
            crate::bus::BusConfig::default()
        );
    }
}

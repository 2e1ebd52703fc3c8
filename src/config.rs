use std::{fs, path::{Path, PathBuf}};
use std::time::Duration;

use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::display::Orientation;

pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 7676;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. Every field is optional so files and CLI
/// flags can be layered.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub log_level: Option<String>,   // e.g., "info" | "debug"
    /// Serial device path, e.g. /dev/ttyACM0
    pub device: Option<String>,
    pub serial: Option<SerialConfig>,
    pub display: Option<DisplayConfig>,
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub write_timeout_ms: u64,
}

impl SerialConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DisplayConfig {
    pub orientation: Option<Orientation>,
    pub reverse: Option<bool>,
    pub brightness: Option<u8>,     // percent, 0-100
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// CLI-level overrides, applied over whatever the file provided
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log_level: Option<String>,
    pub device: Option<String>,
    pub orientation: Option<Orientation>,
    pub reverse: Option<bool>,
    pub bind: Option<String>,
    pub port: Option<u16>,
}

impl Config {
    pub fn serial(&self) -> SerialConfig {
        self.serial.clone().unwrap_or_default()
    }

    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    pub fn orientation(&self) -> Orientation {
        self.display.as_ref().and_then(|d| d.orientation).unwrap_or_default()
    }

    pub fn reverse(&self) -> bool {
        self.display.as_ref().and_then(|d| d.reverse).unwrap_or(false)
    }

    pub fn brightness(&self) -> Option<u8> {
        self.display.as_ref().and_then(|d| d.brightness)
    }

    /// Device path, required for anything that talks to the panel
    pub fn device(&self) -> Result<&str, ConfigError> {
        self.device.as_deref().ok_or_else(|| {
            ConfigError::Validation("no serial device given (argument or `device:` in config)".into())
        })
    }
}

/// Public entry point: read YAML, merge overrides, validate.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = path {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_overrides(&mut cfg, overrides);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Pretty YAML of effective config (nice for debugging)
pub fn dump(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/lyscreen/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/lyscreen/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/lyscreen.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["lyscreen.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()  { dst.log_level = src.log_level; }
    if src.device.is_some()     { dst.device = src.device; }
    if src.serial.is_some()     { dst.serial = src.serial; }
    if src.server.is_some()     { dst.server = src.server; }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.orientation.is_some() { dst.orientation = src.orientation; }
    if src.reverse.is_some()     { dst.reverse = src.reverse; }
    if src.brightness.is_some()  { dst.brightness = src.brightness; }
}

fn apply_overrides(cfg: &mut Config, o: &Overrides) {
    if o.log_level.is_some() { cfg.log_level = o.log_level.clone(); }
    if o.device.is_some()    { cfg.device = o.device.clone(); }

    if o.orientation.is_some() || o.reverse.is_some() {
        let display = cfg.display.get_or_insert_with(DisplayConfig::default);
        if o.orientation.is_some() { display.orientation = o.orientation; }
        if o.reverse.is_some()     { display.reverse = o.reverse; }
    }

    if o.bind.is_some() || o.port.is_some() {
        let server = cfg.server.get_or_insert_with(ServerConfig::default);
        if let Some(bind) = &o.bind { server.bind = bind.clone(); }
        if let Some(port) = o.port  { server.port = port; }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(serial) = cfg.serial.as_ref() {
        if serial.baud_rate == 0 {
            return Err(ConfigError::Validation("serial baud_rate must be > 0".into()));
        }
        if serial.write_timeout_ms == 0 {
            return Err(ConfigError::Validation("serial write_timeout_ms must be > 0".into()));
        }
    }
    if let Some(b) = cfg.brightness() {
        if b > 100 {
            return Err(ConfigError::Validation("display brightness must be 0..=100".into()));
        }
    }
    if let Some(server) = cfg.server.as_ref() {
        if server.port == 0 {
            return Err(ConfigError::Validation("server port must be 1..=65535".into()));
        }
    }
    Ok(())
}

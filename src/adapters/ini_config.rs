//! INI-backed configuration source.
//!
//! Lookups never fail: a missing or malformed value falls back to the
//! caller's default, so config files only need to name what they change.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

/// [`ConfigPort`] over an INI file. `configparser` lowercases section and
/// key names on load, so lookups are effectively case-insensitive.
pub struct IniConfigAdapter {
    config: Ini,
}

impl IniConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    /// Parses INI text directly, without touching the filesystem.
    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for IniConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match self.config.getint(section, key) {
            Ok(Some(v)) => v,
            _ => default,
        }
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        match self.config.getfloat(section, key) {
            Ok(Some(v)) => v,
            _ => default,
        }
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        let value = self.config.get(section, key).map(|v| v.to_lowercase());
        match value.as_deref() {
            Some("true" | "yes" | "1") => true,
            Some("false" | "no" | "0") => false,
            _ => default,
        }
    }
}

/// Empty configuration, every lookup falls back to the caller's default.
/// Used when no `--config` file is given.
pub struct DefaultConfig;

impl ConfigPort for DefaultConfig {
    fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
        None
    }

    fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
        default
    }

    fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
        default
    }

    fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
        default
    }
}

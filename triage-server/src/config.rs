//! Server configuration.
//!
//! ## Loading order
//!
//! 1. `OPS_TRIAGE_CONFIG` environment variable (path to a TOML file)
//! 2. `ops_triage.toml` in the current working directory
//! 3. Built-in defaults
//!
//! Missing keys fall back to their defaults, so a file only needs the values
//! it overrides:
//!
//! ```toml
//! [server]
//! addr = "127.0.0.1:9000"
//!
//! [triage.sla]
//! P0 = 15
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use triage_core::TriageConfig;

pub const CONFIG_ENV: &str = "OPS_TRIAGE_CONFIG";
pub const LOCAL_CONFIG: &str = "ops_triage.toml";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".into(),
            db_path: PathBuf::from("ops_triage.db"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub triage: TriageConfig,
}

impl AppConfig {
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "loaded config from {CONFIG_ENV}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "failed to load config from {CONFIG_ENV}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV} points to a missing file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("loaded config from ./{LOCAL_CONFIG}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "failed to load ./{LOCAL_CONFIG}, using defaults");
                }
            }
        }

        info!("no config file found, using built-in defaults");
        Self::default()
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.triage.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::Priority;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            addr = "127.0.0.1:9000"

            [triage]
            breach_threshold_total = 8

            [triage.sla]
            P0 = 15
            "#,
        )
        .unwrap();

        assert_eq!(config.server.addr, "127.0.0.1:9000");
        assert_eq!(config.server.db_path, PathBuf::from("ops_triage.db"));
        assert_eq!(config.triage.breach_threshold_total, 8);
        assert_eq!(config.triage.aging_threshold_24h, 5);
        assert_eq!(config.triage.sla.minutes_for(Priority::P0), 15);
        assert_eq!(config.triage.sla.minutes_for(Priority::P3), 1440);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(AppConfig::from_toml_str("[triage]\nmttr_window_days = 0\n").is_err());
        assert!(AppConfig::from_toml_str("[server\n").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::load_from_file(Path::new("/tmp/ops-triage-tests/does-not-exist.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("reading"));
    }
}

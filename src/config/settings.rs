//! Service settings.
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file, then `ETIQUETA__*` environment variables
//! (`ETIQUETA__SERVER__PORT=9000`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    /// Path of the JSON label configuration file.
    pub label_config: PathBuf,
    /// Directory holding `*.lbl` / `*.json` templates.
    pub template_dir: PathBuf,
    pub timeouts: TimeoutSettings,
    /// Lifetime of a cached printer profile.
    pub cache_ttl_secs: u64,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutSettings {
    pub metadata_ms: u64,
    pub fetch_ms: u64,
    pub submit_ms: u64,
}

impl TimeoutSettings {
    pub fn metadata(&self) -> Duration {
        Duration::from_millis(self.metadata_ms)
    }

    pub fn fetch(&self) -> Duration {
        Duration::from_millis(self.fetch_ms)
    }

    pub fn submit(&self) -> Duration {
        Duration::from_millis(self.submit_ms)
    }
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            metadata_ms: 5_000,
            fetch_ms: 10_000,
            submit_ms: 30_000,
        }
    }
}

impl Settings {
    /// Load settings, optionally from a TOML file.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8013)?
            .set_default("label_config", "config.json")?
            .set_default("template_dir", "templates")?
            .set_default("timeouts.metadata_ms", 5_000)?
            .set_default("timeouts.fetch_ms", 10_000)?
            .set_default("timeouts.submit_ms", 30_000)?
            .set_default("cache_ttl_secs", 300)?
            .set_default("log_filter", "info,etiqueta=debug")?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        } else {
            builder = builder.add_source(config::File::with_name("etiqueta").required(false));
        }

        builder
            .add_source(
                config::Environment::with_prefix("ETIQUETA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.timeouts.metadata(), Duration::from_secs(5));
        assert_eq!(settings.timeouts.fetch(), Duration::from_secs(10));
        assert_eq!(settings.cache_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "template_dir = \"/srv/labels\"\n[server]\nport = 9100\n[timeouts]\nfetch_ms = 2500"
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.template_dir, PathBuf::from("/srv/labels"));
        assert_eq!(settings.timeouts.fetch(), Duration::from_millis(2500));
        assert_eq!(settings.timeouts.metadata_ms, 5_000);
    }
}

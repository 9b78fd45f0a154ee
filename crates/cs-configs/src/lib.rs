//! # cs-configs
//! crowdstage/crates/cs-configs/src/lib.rs
//!
//! Process configuration, merged in order:
//! 1. built-in defaults
//! 2. `crowdstage.toml` in the working directory (optional)
//! 3. `CROWDSTAGE__SECTION__KEY` environment variables, after `.env` is loaded
//!
//! Per-event stage settings are not configured here; they live on the event
//! document and moderators edit them at runtime. The `stage` section only
//! seeds the event the binary hosts.

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use cs_core::settings::{RawStageSettings, StageSettings};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub log: LogConfig,
    pub stage: StageConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive, e.g. `info,cs_rotation=debug`.
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StageConfig {
    pub event_id: String,
    pub event_name: String,
    pub image_capacity: u64,
    pub text_capacity: u64,
    pub image_period_secs: f64,
    pub text_period_secs: f64,
    /// Fixed seed for presentation randomness. Unset means entropy.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl StageConfig {
    /// Settings document for the hosted event.
    pub fn initial_settings(&self) -> RawStageSettings {
        RawStageSettings {
            img_timer: Some(Value::from(self.image_period_secs)),
            text_timer: Some(Value::from(self.text_period_secs)),
            img_count: Some(Value::from(self.image_capacity)),
            text_count: Some(Value::from(self.text_capacity)),
        }
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(config::Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080_i64)?
        .set_default("log.format", "pretty")?
        .set_default("log.filter", "info")?
        .set_default("stage.event_id", "main-stage")?
        .set_default("stage.event_name", "Main Stage")?
        .set_default("stage.image_capacity", 3_i64)?
        .set_default("stage.text_capacity", 5_i64)?
        .set_default("stage.image_period_secs", 5.0)?
        .set_default("stage.text_period_secs", 5.0)?)
}

impl AppConfig {
    /// Loads defaults, `crowdstage.toml` and `CROWDSTAGE__*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("no .env loaded: {e}");
        }
        let cfg = defaults()?
            .add_source(File::with_name("crowdstage").required(false))
            .add_source(
                Environment::with_prefix("CROWDSTAGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Self::finish(cfg)
    }

    /// Defaults overlaid with a TOML document. No files, no environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let cfg = defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::finish(cfg)
    }

    fn finish(cfg: config::Config) -> Result<Self, ConfigError> {
        let app: AppConfig = cfg.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let id = &self.stage.event_id;
        if id.is_empty() || id.contains('/') {
            return Err(ConfigError::Invalid(format!("stage.event_id '{id}' is not a valid id")));
        }
        // The hosted event obeys the same bounds moderators get.
        StageSettings::accept(&self.stage.initial_settings())
            .map_err(|e| ConfigError::Invalid(format!("stage: {e}")))?;
        if self.server.port == 0 {
            warn!("server.port is 0, an ephemeral port will be chosen");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

//! Handles settings for the application. Configuration is read from
//! `settings.toml` and `CARAVAN_*` environment variables, the latter taking
//! precedence (`CARAVAN_SERVER__PORT=8080` overrides `[server] port`).

use chrono::TimeDelta;
use config::{Config, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fees {
    pub platform_fee_bps: u16,
    pub operator_fee_bps: u16,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sweep {
    pub interval_secs: u64,
    /// Listings older than this are cancelled by the sweep.
    pub listing_ttl_secs: i64,
}

impl Default for Sweep {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            listing_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

impl Sweep {
    /// `None` when the configured TTL does not fit a `TimeDelta`.
    pub fn listing_ttl(&self) -> Option<TimeDelta> {
        TimeDelta::try_seconds(self.listing_ttl_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Option<Server>,
    #[serde(default)]
    pub fees: Fees,
    #[serde(default)]
    pub sweep: Sweep,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::build(
            Config::builder()
                .add_source(File::with_name("settings").required(false))
                .add_source(
                    Environment::with_prefix("CARAVAN")
                        .prefix_separator("_")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn build(builder: config::ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder
            .set_default("app.level", default_level())?
            .build()?
            .try_deserialize()
    }
}

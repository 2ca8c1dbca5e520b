use crate::error::AppError;
use config::{Config as Cfg, ConfigBuilder, File, builder::DefaultState};
use serde::Deserialize;

/// Settings shared by every service binary.
///
/// Read from an optional `configuration` file and then from `APP__*`
/// environment variables, e.g. `APP__PORT=3001`.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let builder = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        Self::from_builder(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, AppError> {
        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

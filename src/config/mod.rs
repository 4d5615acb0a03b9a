// config/mod.rs
use crate::error::AppError;
use config::Config;
use serde::Deserialize;
use std::path::PathBuf;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    #[validate(nested)]
    pub server: ServerSettings,
    pub client: ClientSettings,
    pub log: LogSettings,
    pub metrics: MetricsSettings,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ServerSettings {
    #[validate(url)]
    pub ws_url: String,
    #[validate(url)]
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    pub guild_id: Option<String>,
    pub session_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub port: u16,
}

impl Settings {
    pub fn new() -> Result<Self, AppError> {
        Self::from_builder(
            Config::builder()
                .add_source(config::File::with_name("config/config").required(false))
                .add_source(config::Environment::with_prefix("APP").separator("__")),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, AppError> {
        let settings: Settings = builder
            .set_default("server.ws_url", "ws://localhost:8282/websocket")?
            .set_default("server.api_url", "http://localhost:8282")?
            .set_default("client.session_file", "session.json")?
            .set_default("log.level", "info")?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.port", 9000)?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }
}

/// Discord ids are snowflakes: 17 to 20 decimal digits.
pub fn is_snowflake(id: &str) -> bool {
    (17..=20).contains(&id.len()) && id.bytes().all(|b| b.is_ascii_digit())
}

use std::path::PathBuf;
use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;
use validator::Validate;

pub const ENV_PREFIX: &str = "PAIRDECK";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

fn default_media_bucket() -> String {
    "response-media".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".pairdeck")
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(url)]
    pub supabase_url: String,
    #[validate(length(min = 1))]
    pub supabase_anon_key: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_media_bucket")]
    #[validate(length(min = 1))]
    pub media_bucket: String,
    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    #[validate(range(min = 1, max = 60))]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    // Identity for the diagnostic binaries; the app shell injects its own.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub couple_id: Option<String>,
    #[serde(default)]
    pub partner_id: Option<String>,
}

impl AppConfig {
    /// Reads `PAIRDECK_*` variables, picking up a `.env` file first if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file loaded ({}), using process environment", e);
        }

        let source = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        Self::from_config(source)
    }

    pub fn from_config(source: config::Config) -> Result<Self, ConfigError> {
        let app: AppConfig = source.try_deserialize()?;
        app.validate()?;

        info!(
            "Configuration loaded: store={} bucket={} timeout={}s",
            app.supabase_url, app.media_bucket, app.request_timeout_secs
        );

        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .set_override("supabase_url", "https://proj.supabase.co")
            .unwrap()
            .set_override("supabase_anon_key", "anon-key")
            .unwrap()
    }

    #[test]
    fn applies_defaults() {
        let app = AppConfig::from_config(builder().build().unwrap()).unwrap();
        assert_eq!(app.media_bucket, "response-media");
        assert_eq!(app.request_timeout_secs, 15);
        assert_eq!(app.connect_timeout_secs, 5);
        assert_eq!(app.storage_dir, PathBuf::from(".pairdeck"));
        assert!(app.access_token.is_none());
    }

    #[test]
    fn rejects_bad_url_and_timeout() {
        let source = builder()
            .set_override("supabase_url", "not-a-url")
            .unwrap()
            .build()
            .unwrap();
        assert!(matches!(AppConfig::from_config(source), Err(ConfigError::Invalid(_))));

        let source = builder()
            .set_override("request_timeout_secs", 0)
            .unwrap()
            .build()
            .unwrap();
        assert!(matches!(AppConfig::from_config(source), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_key_fails_to_load() {
        let source = config::Config::builder()
            .set_override("supabase_url", "https://proj.supabase.co")
            .unwrap()
            .build()
            .unwrap();
        assert!(matches!(AppConfig::from_config(source), Err(ConfigError::Load(_))));
    }
}

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use secrecy::Secret;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::retry::RetryPolicy;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub delivery: DeliverySettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    /// Used as the lead's `source_url` when a request carries no `Referer`.
    pub landing_page_url: String,
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// POST every lead to the configured endpoint.
    Remote,
    /// Append every lead to the local log; no backend involved.
    Local,
}

#[derive(serde::Deserialize, Clone)]
pub struct DeliverySettings {
    pub mode: DeliveryMode,
    pub remote: RemoteSettings,
    pub local: LocalSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct RemoteSettings {
    pub endpoint: String,
    pub api_key: Option<Secret<String>>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub retries: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub retry_delay_milliseconds: u64,
}

impl RemoteSettings {
    pub fn endpoint(&self) -> Result<Url, String> {
        Url::parse(&self.endpoint)
            .map_err(|e| format!("{} is not a valid endpoint URL: {}", self.endpoint, e))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            delay: Duration::from_millis(self.retry_delay_milliseconds),
        }
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct LocalSettings {
    pub log_directory: PathBuf,
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path =
        std::env::current_dir().map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;
    let configuration_directory = base_path.join("configuration");

    // Detect the running environment; default to `local` if unspecified.
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // E.g. `APP_DELIVERY__REMOTE__ENDPOINT=https://...` sets `delivery.remote.endpoint`.
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

/// The possible runtime environments for our application.
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

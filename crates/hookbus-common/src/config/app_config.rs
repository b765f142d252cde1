//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use hookbus_core::{BusConfig, DEFAULT_HIGH_WATER_MARK};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub bus: BusSettings,
    pub redis: Option<RedisConfig>,
    pub relay: RelayConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// How `broadcast` reaches sibling processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// No relay; broadcasts only reach this process
    #[default]
    Local,
    /// Redis pub/sub shared by every process of the deployment
    Redis,
    /// In-process hub shared by several buses of one process
    Memory,
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidValue("BUS_TRANSPORT", other.to_string())),
        }
    }
}

/// Event bus settings
#[derive(Debug, Clone, Deserialize)]
pub struct BusSettings {
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_high_water_mark")]
    pub high_water_mark: usize,
}

impl From<&BusSettings> for BusConfig {
    fn from(settings: &BusSettings) -> Self {
        BusConfig::default()
            .with_high_water_mark(settings.high_water_mark)
            .with_debug(settings.debug)
    }
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// Relay (receive path) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Pub/sub channel every process publishes to and listens on
    #[serde(default = "default_relay_channel")]
    pub channel: String,
    /// Buffer of the in-process fan-out of received packets
    #[serde(default = "default_relay_buffer")]
    pub buffer: usize,
    /// Delay before reconnecting a dropped listener, in milliseconds
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel: default_relay_channel(),
            buffer: default_relay_buffer(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "hookbus".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_high_water_mark() -> usize {
    DEFAULT_HIGH_WATER_MARK
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_relay_channel() -> String {
    "hookbus:broadcast".to_string()
}

fn default_relay_buffer() -> usize {
    1024
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue(name, other.to_string())),
    }
}

fn parse_number<T: FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        None => Ok(default),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid value, or if the Redis
    /// transport is selected without `REDIS_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app = AppSettings {
            name: lookup("APP_NAME").unwrap_or_else(default_app_name),
            env: lookup("APP_ENV")
                .and_then(|s| match s.to_lowercase().as_str() {
                    "production" => Some(Environment::Production),
                    "staging" => Some(Environment::Staging),
                    "development" => Some(Environment::Development),
                    _ => None,
                })
                .unwrap_or_default(),
        };

        let bus = BusSettings {
            transport: lookup("BUS_TRANSPORT")
                .map(|s| s.parse::<TransportKind>())
                .transpose()?
                .unwrap_or_default(),
            debug: lookup("BUS_DEBUG")
                .map(|s| parse_bool("BUS_DEBUG", &s))
                .transpose()?
                .unwrap_or(false),
            high_water_mark: parse_number(
                "BUS_HIGH_WATER_MARK",
                lookup("BUS_HIGH_WATER_MARK"),
                default_high_water_mark(),
            )?,
        };

        let redis = match lookup("REDIS_URL") {
            Some(url) => Some(RedisConfig {
                url,
                max_connections: parse_number(
                    "REDIS_MAX_CONNECTIONS",
                    lookup("REDIS_MAX_CONNECTIONS"),
                    default_redis_max_connections(),
                )?,
            }),
            None if bus.transport == TransportKind::Redis => {
                return Err(ConfigError::MissingVar("REDIS_URL"));
            }
            None => None,
        };

        let relay = RelayConfig {
            channel: lookup("BUS_RELAY_CHANNEL").unwrap_or_else(default_relay_channel),
            buffer: parse_number("RELAY_BUFFER", lookup("RELAY_BUFFER"), default_relay_buffer())?,
            reconnect_delay_ms: parse_number(
                "RELAY_RECONNECT_DELAY_MS",
                lookup("RELAY_RECONNECT_DELAY_MS"),
                default_reconnect_delay_ms(),
            )?,
        };

        Ok(Self {
            app,
            bus,
            redis,
            relay,
        })
    }

    /// Options for building the [`hookbus_core::EventBus`]
    #[must_use]
    pub fn bus_config(&self) -> BusConfig {
        BusConfig::from(&self.bus)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

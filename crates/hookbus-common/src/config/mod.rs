//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, BusSettings, ConfigError, Environment, RedisConfig, RelayConfig,
    TransportKind,
};

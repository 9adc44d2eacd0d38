//! Configuration for the Wakely bot.
//!
//! Everything is read once at startup from the process environment
//! (the binary loads `.env` first): `BOT_TOKEN`, `CHAT_ID`, and
//! `BROADCAST_IP` are required; the WoL port and registry filename are
//! fixed defaults matching the original deployment.

use std::net::IpAddr;
use std::path::PathBuf;

use figment::{
    Figment,
    providers::Env,
};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

/// WoL discard port. Not configurable; magic packets conventionally go
/// to port 9.
pub const WOL_PORT: u16 = 9;

const REGISTRY_FILE: &str = "devices.json";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config ──────────────────────────────────────────────────────────

/// Process configuration, resolved once at startup.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Telegram bot API token. Opaque transport credential.
    pub bot_token: SecretString,

    /// The single authorized chat. Events from any other session are
    /// rejected with an unauthorized notice.
    pub chat_id: i64,

    /// Destination address for WoL broadcast datagrams.
    pub broadcast_ip: IpAddr,

    /// WoL destination port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Registry file, relative to the working directory.
    #[serde(default = "default_registry_file")]
    pub registry_file: PathBuf,
}

fn default_port() -> u16 {
    WOL_PORT
}

fn default_registry_file() -> PathBuf {
    PathBuf::from(REGISTRY_FILE)
}

impl Config {
    /// Load from the environment. Only the recognized keys are read;
    /// a missing required key fails here rather than at first use.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(
            Figment::new().merge(Env::raw().only(&["BOT_TOKEN", "CHAT_ID", "BROADCAST_IP"])),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        if config.chat_id == 0 {
            return Err(ConfigError::Validation {
                field: "CHAT_ID".into(),
                reason: "must be a non-zero Telegram chat id".into(),
            });
        }
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn loads_required_keys_with_fixed_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("BOT_TOKEN", "123:abc");
            jail.set_env("CHAT_ID", "42424242");
            jail.set_env("BROADCAST_IP", "192.168.1.255");

            let config = Config::load().expect("config should load");
            assert_eq!(config.chat_id, 42_424_242);
            assert_eq!(config.broadcast_ip.to_string(), "192.168.1.255");
            assert_eq!(config.port, 9);
            assert_eq!(config.registry_file, PathBuf::from("devices.json"));
            Ok(())
        });
    }

    #[test]
    fn missing_token_fails() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("CHAT_ID", "42");
            jail.set_env("BROADCAST_IP", "10.0.0.255");

            assert!(Config::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn invalid_broadcast_ip_fails() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("BOT_TOKEN", "123:abc");
            jail.set_env("CHAT_ID", "42");
            jail.set_env("BROADCAST_IP", "not-an-ip");

            assert!(Config::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn zero_chat_id_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("BOT_TOKEN", "123:abc");
            jail.set_env("CHAT_ID", "0");
            jail.set_env("BROADCAST_IP", "10.0.0.255");

            assert!(matches!(
                Config::load(),
                Err(ConfigError::Validation { .. })
            ));
            Ok(())
        });
    }
}

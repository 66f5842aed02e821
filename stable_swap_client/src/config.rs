//! Client configuration

use std::{path::Path, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use crate::constants::{DEFAULT_SETTLE_DELAY_MS, SIMULATION_BOOTSTRAP_LAMPORTS, SIMULATION_USER};
use crate::error::{ClientError, Result};

/// Environment variable naming the config file read by [`ClientConfig::from_env`].
pub const CONFIG_ENV_VAR: &str = "STABLE_SWAP_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "stable-swap.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Deployed stable-swap pool program
    #[serde(with = "pubkey_string")]
    pub program_id: Pubkey,

    /// Address used as fee payer and account owner for dry runs
    #[serde(with = "pubkey_string", default = "default_simulation_user")]
    pub simulation_user: Pubkey,

    /// Wait between pool creation and the first load
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Lamports sent to the simulation user when it is provisioned
    #[serde(default = "default_bootstrap_lamports")]
    pub simulation_bootstrap_lamports: u64,
}

fn default_simulation_user() -> Pubkey {
    SIMULATION_USER
}

fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

fn default_bootstrap_lamports() -> u64 {
    SIMULATION_BOOTSTRAP_LAMPORTS
}

impl ClientConfig {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            simulation_user: SIMULATION_USER,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            simulation_bootstrap_lamports: SIMULATION_BOOTSTRAP_LAMPORTS,
        }
    }

    pub fn with_simulation_user(mut self, simulation_user: Pubkey) -> Self {
        self.simulation_user = simulation_user;
        self
    }

    pub fn with_settle_delay_ms(mut self, settle_delay_ms: u64) -> Self {
        self.settle_delay_ms = settle_delay_ms;
        self
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ClientError::Config(format!("Failed to parse config TOML: {}", e)))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ClientError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&contents)?;
        log::info!(
            "Loaded config from {} (program {})",
            path.display(),
            config.program_id
        );
        Ok(config)
    }

    /// Load from the file named by `STABLE_SWAP_CONFIG`, or `stable-swap.toml`.
    pub fn from_env() -> Result<Self> {
        let path =
            std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(path)
    }
}

// Pubkeys are written as base58 strings rather than byte arrays.
mod pubkey_string {
    use super::*;
    use serde::{de::Error, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Pubkey, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(|e| D::Error::custom(format!("invalid pubkey {}: {}", s, e)))
    }
}

//! ledger configuration
//!
//! ```toml
//! tree_height = 20
//! ledger_address = "0x0000000000000000000000000000000000000001"
//! owner = "0x0000000000000000000000000000000000000002"
//! operator = "0x0000000000000000000000000000000000000003"
//! executor = "0x0000000000000000000000000000000000000004"
//!
//! [[swap_configurations]]
//! input_asset = "native"
//! fixed_amount = 1000
//!
//! [[swap_configurations]]
//! input_asset = { token = "0x00000000000000000000000000000000000000aa" }
//! fixed_amount = 500
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use zeratul_commitment_tree::{DEFAULT_TREE_HEIGHT, MAX_TREE_HEIGHT};

use crate::types::{Address, Amount, AssetId};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// denomination registered when the ledger is constructed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedConfiguration {
    pub input_asset: AssetId,
    /// toml integers stop at i64, larger amounts go in as decimal strings
    #[serde(with = "toml_amount")]
    pub fixed_amount: Amount,
}

/// `Amount` as a toml integer when it fits, otherwise a decimal string
mod toml_amount {
    use core::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    use crate::types::Amount;

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        match i64::try_from(*amount) {
            Ok(small) => serializer.serialize_i64(small),
            Err(_) => serializer.collect_str(amount),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = Amount;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or a decimal string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
            Amount::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
            Ok(Amount::from(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
            v.parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_tree_height")]
    pub tree_height: u8,
    /// account holding escrowed assets
    pub ledger_address: Address,
    pub owner: Address,
    pub operator: Address,
    /// executor reference handed to the swap venue
    pub executor: Address,
    #[serde(default)]
    pub swap_configurations: Vec<SeedConfiguration>,
}

fn default_tree_height() -> u8 {
    DEFAULT_TREE_HEIGHT
}

impl LedgerConfig {
    /// local devnet accounts 0x..01 through 0x..04, no denominations
    pub fn devnet() -> Self {
        Self {
            tree_height: DEFAULT_TREE_HEIGHT,
            ledger_address: Address::from_low_u64(1),
            owner: Address::from_low_u64(2),
            operator: Address::from_low_u64(3),
            executor: Address::from_low_u64(4),
            swap_configurations: Vec::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tree_height == 0 || self.tree_height > MAX_TREE_HEIGHT {
            return Err(ConfigError::Invalid(format!(
                "tree_height {} out of range 1..={}",
                self.tree_height, MAX_TREE_HEIGHT
            )));
        }

        let roles = [
            ("ledger_address", self.ledger_address),
            ("owner", self.owner),
            ("operator", self.operator),
            ("executor", self.executor),
        ];
        if let Some((name, _)) = roles.iter().find(|(_, addr)| addr.is_null()) {
            return Err(ConfigError::Invalid(format!("{} must not be the null address", name)));
        }

        if let Some(seed) = self.swap_configurations.iter().find(|s| s.fixed_amount == 0) {
            return Err(ConfigError::Invalid(format!(
                "swap configuration for {} has zero fixed_amount",
                seed.input_asset
            )));
        }

        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::devnet()
    }
}

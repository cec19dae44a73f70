//! swap configuration registry
//!
//! append-only: configurations get sequential ids from 1 and are never
//! updated. deposits and swaps read the amount at call time, so adding new
//! denominations never touches commitments already in the tree.

use std::collections::BTreeMap;

use crate::error::{EscrowError, Result};
use crate::types::{Amount, AssetId, ConfigId, SwapConfiguration};

#[derive(Debug, Clone)]
pub struct SwapRegistry {
    configurations: BTreeMap<ConfigId, SwapConfiguration>,
    next_id: ConfigId,
}

impl SwapRegistry {
    pub fn new() -> Self {
        Self {
            configurations: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// register a denomination, returns its id
    pub fn add(&mut self, input_asset: AssetId, fixed_amount: Amount) -> Result<ConfigId> {
        if fixed_amount == 0 {
            return Err(EscrowError::InvalidAmount);
        }

        let id = self.next_id;
        self.next_id += 1;

        self.configurations.insert(
            id,
            SwapConfiguration {
                id,
                input_asset,
                fixed_amount,
            },
        );

        Ok(id)
    }

    pub fn get(&self, id: ConfigId) -> Option<&SwapConfiguration> {
        self.configurations.get(&id)
    }

    /// configuration usable for a swap (known and non-zero amount)
    pub fn active(&self, id: ConfigId) -> Result<SwapConfiguration> {
        self.configurations
            .get(&id)
            .filter(|c| c.fixed_amount > 0)
            .copied()
            .ok_or(EscrowError::InvalidSwapConfig(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SwapConfiguration> {
        self.configurations.values()
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }
}

impl Default for SwapRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;

    #[test]
    fn test_ids_start_at_one() {
        let mut registry = SwapRegistry::new();
        let token = AssetId::Token(Address::from_low_u64(5));

        assert_eq!(registry.add(AssetId::Native, 1000).unwrap(), 1);
        assert_eq!(registry.add(token, 50).unwrap(), 2);
        assert_eq!(registry.get(2).unwrap().input_asset, token);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let mut registry = SwapRegistry::new();
        assert_eq!(registry.add(AssetId::Native, 0), Err(EscrowError::InvalidAmount));
        // failed add does not burn an id
        assert_eq!(registry.add(AssetId::Native, 1).unwrap(), 1);
    }

    #[test]
    fn test_unknown_id_is_invalid() {
        let registry = SwapRegistry::new();
        assert!(registry.get(1).is_none());
        assert_eq!(registry.active(1), Err(EscrowError::InvalidSwapConfig(1)));
    }
}

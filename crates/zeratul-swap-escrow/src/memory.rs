//! in-memory collaborators for simulations and tests
//!
//! none of these are production components. [`DigestVerifier`] in
//! particular is a plain hash check, not a zero-knowledge proof.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::error::{BankError, VenueError};
use crate::external::{AssetBank, ProofVerifier, SwapVenue};
use crate::types::{Address, Amount, AssetId, PublicInputs, SwapDescription, SwapOutcome, WithdrawProof};

/// balances and allowances kept in hash maps
#[derive(Debug, Default)]
pub struct InMemoryBank {
    balances: Mutex<HashMap<(AssetId, Address), Amount>>,
    allowances: Mutex<HashMap<(AssetId, Address, Address), Amount>>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// credit `amount` out of thin air
    pub fn mint(&self, asset: AssetId, holder: Address, amount: Amount) {
        *self.balances.lock().entry((asset, holder)).or_default() += amount;
    }

    fn debit_credit(&self, asset: AssetId, from: Address, to: Address, amount: Amount) -> Result<(), BankError> {
        let mut balances = self.balances.lock();
        let available = balances.get(&(asset, from)).copied().unwrap_or(0);
        if available < amount {
            return Err(BankError::InsufficientBalance {
                asset,
                holder: from,
                needed: amount,
                available,
            });
        }
        balances.insert((asset, from), available - amount);
        *balances.entry((asset, to)).or_default() += amount;
        Ok(())
    }
}

impl AssetBank for InMemoryBank {
    fn balance_of(&self, asset: AssetId, holder: Address) -> Amount {
        self.balances.lock().get(&(asset, holder)).copied().unwrap_or(0)
    }

    fn transfer(&self, asset: AssetId, from: Address, to: Address, amount: Amount) -> Result<(), BankError> {
        if to.is_null() {
            return Err(BankError::Rejected("transfer to the null address".into()));
        }
        self.debit_credit(asset, from, to, amount)
    }

    fn transfer_from(
        &self,
        asset: AssetId,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), BankError> {
        if asset.is_native() {
            return Err(BankError::Rejected("native asset has no allowances".into()));
        }

        let mut allowances = self.allowances.lock();
        let key = (asset, from, spender);
        let available = allowances.get(&key).copied().unwrap_or(0);
        if available < amount {
            return Err(BankError::InsufficientAllowance {
                asset,
                owner: from,
                spender,
                needed: amount,
                available,
            });
        }

        self.debit_credit(asset, from, to, amount)?;
        allowances.insert(key, available - amount);
        Ok(())
    }

    fn approve(&self, asset: AssetId, owner: Address, spender: Address, amount: Amount) -> Result<(), BankError> {
        if asset.is_native() {
            return Err(BankError::Rejected("native asset has no allowances".into()));
        }
        self.allowances.lock().insert((asset, owner, spender), amount);
        Ok(())
    }

    fn allowance(&self, asset: AssetId, owner: Address, spender: Address) -> Amount {
        self.allowances
            .lock()
            .get(&(asset, owner, spender))
            .copied()
            .unwrap_or(0)
    }
}

/// basis-point denominator for [`FixedRateVenue`]
pub const RATE_DENOMINATOR: Amount = 10_000;

/// venue quoting every pair at one fixed rate out of its own inventory
pub struct FixedRateVenue {
    address: Address,
    bank: Arc<dyn AssetBank>,
    /// output per input, in basis points
    rate_bps: Amount,
}

impl FixedRateVenue {
    pub fn new(address: Address, bank: Arc<dyn AssetBank>, rate_bps: Amount) -> Self {
        Self {
            address,
            bank,
            rate_bps,
        }
    }

    pub fn quote(&self, amount: Amount) -> Option<Amount> {
        amount
            .checked_mul(self.rate_bps)
            .map(|scaled| scaled / RATE_DENOMINATOR)
    }
}

impl SwapVenue for FixedRateVenue {
    fn address(&self) -> Address {
        self.address
    }

    fn swap(
        &self,
        caller: Address,
        _executor: Address,
        desc: &SwapDescription,
        _venue_data: &[u8],
        value: Amount,
    ) -> Result<SwapOutcome, VenueError> {
        if desc.src_asset == desc.dst_asset {
            return Err(VenueError::Reverted("identical assets".into()));
        }
        let expected_value = if desc.src_asset.is_native() { desc.amount } else { 0 };
        if value != expected_value {
            return Err(VenueError::Reverted(format!(
                "attached value {} does not match expected {}",
                value, expected_value
            )));
        }

        let output = self
            .quote(desc.amount)
            .ok_or_else(|| VenueError::Reverted("quote overflow".into()))?;
        if output < desc.min_return {
            return Err(VenueError::SlippageExceeded {
                got: output,
                min: desc.min_return,
            });
        }
        if self.bank.balance_of(desc.dst_asset, self.address) < output {
            return Err(VenueError::NoLiquidity {
                src: desc.src_asset,
                dst: desc.dst_asset,
            });
        }

        if desc.src_asset.is_native() {
            self.bank
                .transfer(desc.src_asset, caller, self.address, value)?;
        } else {
            self.bank
                .transfer_from(desc.src_asset, self.address, caller, self.address, desc.amount)?;
        }
        self.bank
            .transfer(desc.dst_asset, self.address, desc.dst_receiver, output)?;

        Ok(SwapOutcome {
            return_amount: output,
            spent_amount: desc.amount,
        })
    }
}

/// accepts a proof whose first word is sha256 of the public input words
#[derive(Debug, Default, Clone, Copy)]
pub struct DigestVerifier;

impl DigestVerifier {
    pub fn digest(inputs: &PublicInputs) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for word in inputs.to_words() {
            hasher.update(word);
        }
        hasher.finalize().into()
    }

    /// build the proof this verifier accepts for `inputs`
    pub fn prove(inputs: &PublicInputs) -> WithdrawProof {
        let mut proof = WithdrawProof::default();
        proof.0[0] = Self::digest(inputs);
        proof
    }
}

impl ProofVerifier for DigestVerifier {
    fn verify(&self, proof: &WithdrawProof, inputs: &PublicInputs) -> bool {
        proof.0[0] == Self::digest(inputs)
    }
}

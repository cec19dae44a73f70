//! external collaborators
//!
//! the ledger never executes swaps, checks zero-knowledge proofs or moves
//! balances itself. these traits are the whole contract it relies on, so
//! tests and simulations can swap in deterministic fakes.
//!
//! collaborator calls are synchronous and may call back into the ledger
//! before returning; the ledger rejects such nested mutations.

use crate::error::{BankError, VenueError};
use crate::types::{Address, Amount, AssetId, PublicInputs, SwapDescription, SwapOutcome, WithdrawProof};

/// withdrawal proof oracle over `[merkle_root, nullifier_hash, recipient]`
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, proof: &WithdrawProof, inputs: &PublicInputs) -> bool;
}

/// external swap venue
pub trait SwapVenue: Send + Sync {
    /// account the ledger grants token allowances to
    fn address(&self) -> Address;

    /// exchange `desc.amount` of `desc.src_asset` for `desc.dst_asset`
    ///
    /// `caller` is the account the input comes from. for native input the
    /// amount arrives as `value`; token input is pulled through the
    /// allowance the caller granted to [`SwapVenue::address`]. output is paid
    /// to `desc.dst_receiver`.
    fn swap(
        &self,
        caller: Address,
        executor: Address,
        desc: &SwapDescription,
        venue_data: &[u8],
        value: Amount,
    ) -> Result<SwapOutcome, VenueError>;
}

/// host asset environment: native value plus token balances and allowances
pub trait AssetBank: Send + Sync {
    fn balance_of(&self, asset: AssetId, holder: Address) -> Amount;

    fn transfer(&self, asset: AssetId, from: Address, to: Address, amount: Amount) -> Result<(), BankError>;

    /// move tokens from `from` to `to` using `spender`'s allowance
    fn transfer_from(
        &self,
        asset: AssetId,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), BankError>;

    /// set (not add to) the allowance `owner` grants `spender`
    fn approve(&self, asset: AssetId, owner: Address, spender: Address, amount: Amount) -> Result<(), BankError>;

    fn allowance(&self, asset: AssetId, owner: Address, spender: Address) -> Amount;
}

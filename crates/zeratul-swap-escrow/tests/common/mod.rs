//! shared fixtures for ledger integration tests

#![allow(dead_code)]

use std::sync::Arc;

use zeratul_swap_escrow::memory::{DigestVerifier, FixedRateVenue, InMemoryBank};
use zeratul_swap_escrow::{
    Address, AssetBank, AssetId, CallContext, Collaborators, Commitment, EscrowLedger,
    LedgerConfig, NullifierHash, ProofVerifier, PublicInputs, SwapVenue, WithdrawProof,
};

pub const LEDGER: u64 = 1;
pub const OWNER: u64 = 2;
pub const OPERATOR: u64 = 3;
pub const EXECUTOR: u64 = 4;
pub const VENUE: u64 = 50;
pub const ALICE: u64 = 10;
pub const BOB: u64 = 11;
pub const RECIPIENT: u64 = 0xEF;

pub const NOW: u64 = 1_700_000_000;
/// venue pays 95% of the input amount
pub const VENUE_RATE_BPS: u128 = 9_500;
pub const INVENTORY: u128 = 1_000_000;

pub fn addr(n: u64) -> Address {
    Address::from_low_u64(n)
}

pub fn call(n: u64) -> CallContext {
    CallContext::new(addr(n)).at(NOW)
}

pub fn token_x() -> AssetId {
    AssetId::Token(addr(0xAA))
}

pub fn token_y() -> AssetId {
    AssetId::Token(addr(0xBB))
}

pub fn commitment(seed: u8) -> Commitment {
    let mut bytes = [0xABu8; 32];
    bytes[31] = seed;
    Commitment(bytes)
}

pub fn nullifier(seed: u8) -> NullifierHash {
    let mut bytes = [0xCDu8; 32];
    bytes[31] = seed;
    NullifierHash(bytes)
}

pub fn config(height: u8) -> LedgerConfig {
    LedgerConfig {
        tree_height: height,
        ledger_address: addr(LEDGER),
        owner: addr(OWNER),
        operator: addr(OPERATOR),
        executor: addr(EXECUTOR),
        swap_configurations: Vec::new(),
    }
}

/// bank with funded depositors and a venue holding inventory of every asset
pub fn funded_bank() -> Arc<InMemoryBank> {
    let bank = Arc::new(InMemoryBank::new());
    for user in [ALICE, BOB] {
        bank.mint(AssetId::Native, addr(user), 100_000);
        bank.mint(token_x(), addr(user), 100_000);
        bank.mint(token_y(), addr(user), 100_000);
    }
    for asset in [AssetId::Native, token_x(), token_y()] {
        bank.mint(asset, addr(VENUE), INVENTORY);
    }
    bank
}

pub struct Fixture {
    pub ledger: Arc<EscrowLedger>,
    pub bank: Arc<InMemoryBank>,
}

pub fn setup(height: u8) -> Fixture {
    let bank = funded_bank();
    let ledger = build_ledger(
        height,
        Arc::new(DigestVerifier),
        Arc::new(FixedRateVenue::new(addr(VENUE), bank.clone(), VENUE_RATE_BPS)),
        bank.clone(),
    );
    Fixture { ledger, bank }
}

pub fn build_ledger(
    height: u8,
    verifier: Arc<dyn ProofVerifier>,
    venue: Arc<dyn SwapVenue>,
    bank: Arc<dyn AssetBank>,
) -> Arc<EscrowLedger> {
    let collaborators = Collaborators {
        verifier,
        venue,
        bank,
    };
    Arc::new(EscrowLedger::new(&config(height), collaborators).unwrap())
}

/// proof the digest verifier accepts against the ledger's live root
pub fn proof_for(ledger: &EscrowLedger, nullifier_hash: NullifierHash, recipient: Address) -> WithdrawProof {
    DigestVerifier::prove(&PublicInputs {
        merkle_root: ledger.current_root(),
        nullifier_hash,
        recipient,
    })
}

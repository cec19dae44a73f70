//! collaborators that call back into the ledger mid-operation

mod common;

use std::sync::{Arc, OnceLock, Weak};

use common::*;
use parking_lot::Mutex;
use zeratul_swap_escrow::memory::{DigestVerifier, FixedRateVenue, InMemoryBank};
use zeratul_swap_escrow::{
    Address, Amount, AssetBank, AssetId, BankError, EscrowError, EscrowLedger, NullifierHash,
    ProofVerifier, PublicInputs, SwapDescription, SwapOutcome, SwapResult, SwapVenue, VenueError,
    VenueParams, WithdrawProof,
};

/// back-reference to the ledger under test, set once it exists
#[derive(Default)]
struct Callback {
    ledger: OnceLock<Weak<EscrowLedger>>,
}

impl Callback {
    fn attach(&self, ledger: &Arc<EscrowLedger>) {
        let _ = self.ledger.set(Arc::downgrade(ledger));
    }

    fn ledger(&self) -> Option<Arc<EscrowLedger>> {
        self.ledger.get().and_then(Weak::upgrade)
    }
}

/// nested call outcome plus the swap result visible at that moment
type Observation = (Result<SwapResult, EscrowError>, Option<SwapResult>);

/// bank that tries a second withdrawal while paying out the first
struct ReenteringBank {
    inner: InMemoryBank,
    callback: Callback,
    claim: Mutex<Option<(NullifierHash, WithdrawProof)>>,
    observed: Mutex<Vec<Observation>>,
}

impl AssetBank for ReenteringBank {
    fn balance_of(&self, asset: AssetId, holder: Address) -> Amount {
        self.inner.balance_of(asset, holder)
    }

    fn transfer(&self, asset: AssetId, from: Address, to: Address, amount: Amount) -> Result<(), BankError> {
        let claim = *self.claim.lock();
        if let (Some(ledger), Some((nullifier_hash, proof))) = (self.callback.ledger(), claim) {
            if from == ledger.address() && to == addr(RECIPIENT) {
                let nested = ledger.withdraw(call(BOB), nullifier_hash, to, &proof);
                let visible = ledger.swap_result(&nullifier_hash);
                self.observed.lock().push((nested, visible));
            }
        }
        self.inner.transfer(asset, from, to, amount)
    }

    fn transfer_from(
        &self,
        asset: AssetId,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), BankError> {
        self.inner.transfer_from(asset, spender, from, to, amount)
    }

    fn approve(&self, asset: AssetId, owner: Address, spender: Address, amount: Amount) -> Result<(), BankError> {
        self.inner.approve(asset, owner, spender, amount)
    }

    fn allowance(&self, asset: AssetId, owner: Address, spender: Address) -> Amount {
        self.inner.allowance(asset, owner, spender)
    }
}

/// venue that tries to record a second swap from inside the first
struct ReenteringVenue {
    inner: FixedRateVenue,
    callback: Callback,
    observed: Mutex<Vec<Result<Amount, EscrowError>>>,
}

impl SwapVenue for ReenteringVenue {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn swap(
        &self,
        caller: Address,
        executor: Address,
        desc: &SwapDescription,
        venue_data: &[u8],
        value: Amount,
    ) -> Result<SwapOutcome, VenueError> {
        if let Some(ledger) = self.callback.ledger() {
            let nested = ledger.execute_swap(call(OPERATOR), nullifier(9), 1, token_y(), VenueParams::default());
            self.observed.lock().push(nested);
        }
        self.inner.swap(caller, executor, desc, venue_data, value)
    }
}

/// verifier that tries to deposit while a withdrawal is being checked
struct ReenteringVerifier {
    callback: Callback,
    observed: Mutex<Vec<Result<u64, EscrowError>>>,
}

impl ProofVerifier for ReenteringVerifier {
    fn verify(&self, proof: &WithdrawProof, inputs: &PublicInputs) -> bool {
        if let Some(ledger) = self.callback.ledger() {
            let nested = ledger.deposit(call(ALICE).with_value(1000), commitment(42), 1);
            self.observed.lock().push(nested);
        }
        DigestVerifier.verify(proof, inputs)
    }
}

fn venue_bank() -> InMemoryBank {
    let bank = InMemoryBank::new();
    for user in [ALICE, BOB] {
        bank.mint(AssetId::Native, addr(user), 100_000);
    }
    for asset in [AssetId::Native, token_x(), token_y()] {
        bank.mint(asset, addr(VENUE), INVENTORY);
    }
    bank
}

/// one native deposit swapped into token x under `nullifier(1)`
fn deposit_and_swap(ledger: &EscrowLedger) {
    let config_id = ledger
        .add_swap_configuration(call(OWNER), AssetId::Native, 1000)
        .unwrap();
    ledger
        .deposit(call(ALICE).with_value(1000), commitment(1), config_id)
        .unwrap();
    ledger
        .execute_swap(call(OPERATOR), nullifier(1), config_id, token_x(), VenueParams::default())
        .unwrap();
}

#[test]
fn test_withdraw_reentered_from_payout() {
    let bank = Arc::new(ReenteringBank {
        inner: venue_bank(),
        callback: Callback::default(),
        claim: Mutex::new(None),
        observed: Mutex::new(Vec::new()),
    });
    let ledger = build_ledger(
        5,
        Arc::new(DigestVerifier),
        Arc::new(FixedRateVenue::new(addr(VENUE), bank.clone(), VENUE_RATE_BPS)),
        bank.clone(),
    );
    bank.callback.attach(&ledger);

    deposit_and_swap(&ledger);
    let proof = proof_for(&ledger, nullifier(1), addr(RECIPIENT));
    *bank.claim.lock() = Some((nullifier(1), proof));

    let paid = ledger
        .withdraw(call(BOB), nullifier(1), addr(RECIPIENT), &proof)
        .unwrap();
    assert_eq!(paid.amount, 950);

    let observed = bank.observed.lock();
    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0].0, Err(EscrowError::Reentrancy));
    // proceeds were already gone when the payout ran
    assert_eq!(observed[0].1, None);
    drop(observed);

    // paid exactly once
    assert_eq!(bank.balance_of(token_x(), addr(RECIPIENT)), 950);
    assert_eq!(ledger.swap_result(&nullifier(1)), None);
    assert_eq!(
        ledger.withdraw(call(BOB), nullifier(1), addr(RECIPIENT), &proof),
        Err(EscrowError::NoProceedsAvailable(nullifier(1)))
    );
}

#[test]
fn test_execute_swap_reentered_from_venue() {
    let bank = Arc::new(venue_bank());
    let venue = Arc::new(ReenteringVenue {
        inner: FixedRateVenue::new(addr(VENUE), bank.clone(), VENUE_RATE_BPS),
        callback: Callback::default(),
        observed: Mutex::new(Vec::new()),
    });
    let ledger = build_ledger(5, Arc::new(DigestVerifier), venue.clone(), bank.clone());
    venue.callback.attach(&ledger);

    deposit_and_swap(&ledger);

    let observed = venue.observed.lock();
    assert_eq!(observed.as_slice(), &[Err(EscrowError::Reentrancy)]);
    assert!(ledger.is_nullifier_used(&nullifier(1)));
    assert!(!ledger.is_nullifier_used(&nullifier(9)));
    assert_eq!(ledger.swap_result(&nullifier(9)), None);
}

#[test]
fn test_deposit_reentered_from_verifier() {
    let bank = Arc::new(venue_bank());
    let verifier = Arc::new(ReenteringVerifier {
        callback: Callback::default(),
        observed: Mutex::new(Vec::new()),
    });
    let ledger = build_ledger(
        5,
        verifier.clone(),
        Arc::new(FixedRateVenue::new(addr(VENUE), bank.clone(), VENUE_RATE_BPS)),
        bank.clone(),
    );
    verifier.callback.attach(&ledger);

    deposit_and_swap(&ledger);
    let proof = proof_for(&ledger, nullifier(1), addr(RECIPIENT));
    ledger
        .withdraw(call(BOB), nullifier(1), addr(RECIPIENT), &proof)
        .unwrap();

    assert_eq!(verifier.observed.lock().as_slice(), &[Err(EscrowError::Reentrancy)]);
    assert!(!ledger.is_deposited(&commitment(42)));
    assert_eq!(ledger.leaf_count(), 1);

    // the guard is released afterwards
    ledger
        .deposit(call(ALICE).with_value(1000), commitment(42), 1)
        .unwrap();
}

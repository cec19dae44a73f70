//! escrow ledger state machine
//!
//! deposit → swap → withdraw:
//!
//! ```text
//! depositor ──deposit(commitment, config)──► tree.insert, deposits[c] = Deposited
//! operator  ──execute_swap(nf, config, out)─► venue.swap, used[nf] = true, results[nf]
//! claimant  ──withdraw(nf, recipient, π)────► verify(π; root, nf, recipient),
//!                                             delete results[nf], transfer
//! ```
//!
//! the ledger cannot link a nullifier to a commitment; that binding lives
//! only inside the withdrawal proof. replay protection is the consumption
//! flag (one outcome per nullifier) plus deleting the swap result before
//! paying out (one withdrawal per outcome).
//!
//! proofs are checked against the live root, so a proof built before a
//! later deposit stops verifying and must be rebuilt.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use zeratul_commitment_tree::{CommitmentTree, Hash, MembershipProof, NodeHasher, Sha256Compress};

use crate::config::LedgerConfig;
use crate::error::{EscrowError, Result, Role};
use crate::events::LedgerEvent;
use crate::external::{AssetBank, ProofVerifier, SwapVenue};
use crate::guard::ReentrancyGuard;
use crate::registry::SwapRegistry;
use crate::types::{
    Address, Amount, AssetId, CallContext, Commitment, CommitmentState, ConfigId, DepositRecord,
    NullifierHash, PublicInputs, SwapConfiguration, SwapDescription, SwapOutcome, SwapPath,
    SwapResult, VenueParams, WithdrawProof,
};

/// external collaborators the ledger delegates to
#[derive(Clone)]
pub struct Collaborators {
    pub verifier: Arc<dyn ProofVerifier>,
    pub venue: Arc<dyn SwapVenue>,
    pub bank: Arc<dyn AssetBank>,
}

struct LedgerState<H: NodeHasher> {
    owner: Address,
    operator: Address,
    tree: CommitmentTree<H>,
    deposits: HashMap<Commitment, DepositRecord>,
    registry: SwapRegistry,
    swap_results: HashMap<NullifierHash, SwapResult>,
    used_nullifiers: HashSet<NullifierHash>,
    events: Vec<LedgerEvent>,
}

impl<H: NodeHasher> LedgerState<H> {
    fn ensure_role(&self, caller: Address, role: Role) -> Result<()> {
        let holder = match role {
            Role::Owner => self.owner,
            Role::Operator => self.operator,
        };
        if caller != holder {
            warn!(%caller, %role, "unauthorized call");
            return Err(EscrowError::Unauthorized {
                caller,
                required: role,
            });
        }
        Ok(())
    }

    fn ensure_nullifier_unused(&self, nullifier_hash: NullifierHash) -> Result<()> {
        if self.used_nullifiers.contains(&nullifier_hash) {
            warn!(%nullifier_hash, "nullifier already used");
            return Err(EscrowError::NullifierAlreadyUsed(nullifier_hash));
        }
        Ok(())
    }

    fn add_configuration(&mut self, input_asset: AssetId, fixed_amount: Amount) -> Result<ConfigId> {
        let config_id = self.registry.add(input_asset, fixed_amount)?;
        info!(config_id, %input_asset, fixed_amount, "swap configuration added");
        self.events.push(LedgerEvent::ConfigurationAdded {
            config_id,
            input_asset,
            fixed_amount,
        });
        Ok(config_id)
    }

    /// consume the nullifier and store its outcome
    fn record_result(&mut self, nullifier_hash: NullifierHash, result: SwapResult, timestamp: u64) {
        self.used_nullifiers.insert(nullifier_hash);
        self.swap_results.insert(nullifier_hash, result);

        info!(
            %nullifier_hash,
            output_asset = %result.output_asset,
            amount = result.amount,
            "swap result recorded"
        );
        self.events.push(LedgerEvent::SwapResultRecorded {
            nullifier_hash,
            output_asset: result.output_asset,
            amount: result.amount,
            timestamp,
        });
    }
}

/// privacy-preserving swap escrow
///
/// entry points take `&self` so the ledger can be shared as
/// `Arc<EscrowLedger>`, including with collaborators that call back in.
/// state sits behind a mutex that is never held across a collaborator call.
pub struct EscrowLedger<H: NodeHasher = Sha256Compress> {
    address: Address,
    executor: Address,
    guard: ReentrancyGuard,
    state: Mutex<LedgerState<H>>,
    verifier: Arc<dyn ProofVerifier>,
    venue: Arc<dyn SwapVenue>,
    bank: Arc<dyn AssetBank>,
}

impl<H: NodeHasher> EscrowLedger<H> {
    /// build a ledger from a validated config, seeding its denominations
    pub fn new(config: &LedgerConfig, collaborators: Collaborators) -> Result<Self> {
        if config.owner.is_null()
            || config.operator.is_null()
            || config.ledger_address.is_null()
            || config.executor.is_null()
        {
            return Err(EscrowError::InvalidAddress);
        }

        let tree = CommitmentTree::<H>::new(config.tree_height)?;
        info!(
            ledger = %config.ledger_address,
            height = config.tree_height,
            capacity = tree.capacity(),
            "escrow ledger initialized"
        );

        let mut state = LedgerState {
            owner: config.owner,
            operator: config.operator,
            tree,
            deposits: HashMap::new(),
            registry: SwapRegistry::new(),
            swap_results: HashMap::new(),
            used_nullifiers: HashSet::new(),
            events: Vec::new(),
        };

        for seed in &config.swap_configurations {
            state.add_configuration(seed.input_asset, seed.fixed_amount)?;
        }

        Ok(Self {
            address: config.ledger_address,
            executor: config.executor,
            guard: ReentrancyGuard::new(),
            state: Mutex::new(state),
            verifier: collaborators.verifier,
            venue: collaborators.venue,
            bank: collaborators.bank,
        })
    }

    // ============ deposit ============

    /// escrow exactly one denomination behind `commitment`, returns the leaf index
    pub fn deposit(&self, ctx: CallContext, commitment: Commitment, config_id: ConfigId) -> Result<u64> {
        let _entered = self.guard.enter()?;

        if commitment.is_zero() {
            return Err(EscrowError::InvalidCommitment);
        }

        let config = {
            let state = self.state.lock();
            if state.deposits.contains_key(&commitment) {
                return Err(EscrowError::DuplicateCommitment(commitment));
            }
            let config = state
                .registry
                .get(config_id)
                .copied()
                .ok_or(EscrowError::InvalidSwapConfig(config_id))?;
            if state.tree.is_full() {
                return Err(zeratul_commitment_tree::TreeError::CapacityExceeded {
                    capacity: state.tree.capacity(),
                }
                .into());
            }
            config
        };

        self.collect_deposit(&ctx, &config)?;

        // the guard keeps every other mutation out while the bank ran,
        // so the capacity check above still holds
        let mut state = self.state.lock();
        let leaf_index = state.tree.insert(commitment.0)?;
        state.deposits.insert(
            commitment,
            DepositRecord {
                state: CommitmentState::Deposited,
                leaf_index,
                config_id,
                timestamp: ctx.timestamp,
            },
        );

        info!(%commitment, leaf_index, config_id, root = %hex::encode(state.tree.root()), "deposit recorded");
        state.events.push(LedgerEvent::DepositRecorded {
            commitment,
            leaf_index,
            timestamp: ctx.timestamp,
            config_id,
        });

        Ok(leaf_index)
    }

    /// pull the configured denomination into the ledger account
    fn collect_deposit(&self, ctx: &CallContext, config: &SwapConfiguration) -> Result<()> {
        let mismatch = || EscrowError::AssetMismatch {
            expected_asset: config.input_asset,
            expected_amount: config.fixed_amount,
            attached: ctx.value,
        };

        match config.input_asset {
            AssetId::Native => {
                if ctx.value != config.fixed_amount {
                    return Err(mismatch());
                }
                self.bank
                    .transfer(AssetId::Native, ctx.caller, self.address, ctx.value)?;
            }
            asset @ AssetId::Token(_) => {
                if ctx.value != 0 {
                    return Err(mismatch());
                }
                self.bank.transfer_from(
                    asset,
                    self.address,
                    ctx.caller,
                    self.address,
                    config.fixed_amount,
                )?;
            }
        }
        Ok(())
    }

    // ============ swaps ============

    /// convert one denomination through the venue and bind the outcome to
    /// `nullifier_hash`. operator only. returns the realized output amount.
    pub fn execute_swap(
        &self,
        ctx: CallContext,
        nullifier_hash: NullifierHash,
        config_id: ConfigId,
        output_asset: AssetId,
        params: VenueParams,
    ) -> Result<Amount> {
        let _entered = self.guard.enter()?;

        let config = {
            let state = self.state.lock();
            state.ensure_role(ctx.caller, Role::Operator)?;
            state.ensure_nullifier_unused(nullifier_hash)?;
            state.registry.active(config_id)?
        };

        let path = SwapPath::select(config.input_asset, output_asset).ok_or(
            EscrowError::UnsupportedSwapPath {
                input: config.input_asset,
                output: output_asset,
            },
        )?;

        let available = self.bank.balance_of(config.input_asset, self.address);
        if available < config.fixed_amount {
            return Err(EscrowError::InsufficientLedgerBalance {
                asset: config.input_asset,
                needed: config.fixed_amount,
                available,
            });
        }

        // a zero return is unusable, so the venue must refuse it before
        // touching the escrowed input
        let desc = SwapDescription {
            src_asset: config.input_asset,
            dst_asset: output_asset,
            src_receiver: self.executor,
            dst_receiver: self.address,
            amount: config.fixed_amount,
            min_return: params.min_return.max(1),
            flags: params.flags,
        };

        debug!(%nullifier_hash, ?path, amount = desc.amount, "calling swap venue");
        let outcome = if path.attaches_value() {
            self.venue
                .swap(self.address, self.executor, &desc, &params.data, desc.amount)?
        } else {
            self.swap_with_allowance(&desc, &params.data)?
        };

        debug!(
            %nullifier_hash,
            return_amount = outcome.return_amount,
            spent_amount = outcome.spent_amount,
            "venue swap settled"
        );
        if outcome.return_amount < desc.min_return {
            warn!(%nullifier_hash, return_amount = outcome.return_amount, "venue ignored min_return");
            return Err(EscrowError::InvalidAmount);
        }

        let mut state = self.state.lock();
        // nothing read before the venue call is trusted after it
        state.ensure_nullifier_unused(nullifier_hash)?;
        state.record_result(
            nullifier_hash,
            SwapResult {
                output_asset,
                amount: outcome.return_amount,
            },
            ctx.timestamp,
        );

        Ok(outcome.return_amount)
    }

    /// token input: exact allowance right before the call, none after it
    fn swap_with_allowance(&self, desc: &SwapDescription, venue_data: &[u8]) -> Result<SwapOutcome> {
        let spender = self.venue.address();

        self.bank.approve(desc.src_asset, self.address, spender, desc.amount)?;
        let outcome = self
            .venue
            .swap(self.address, self.executor, desc, venue_data, 0);
        let reset = self.bank.approve(desc.src_asset, self.address, spender, 0);

        let outcome = outcome?;
        reset?;
        Ok(outcome)
    }

    /// bind an out-of-band swap outcome to `nullifier_hash`. operator only.
    pub fn record_swap_result(
        &self,
        ctx: CallContext,
        nullifier_hash: NullifierHash,
        output_asset: AssetId,
        amount: Amount,
    ) -> Result<()> {
        let _entered = self.guard.enter()?;

        let mut state = self.state.lock();
        state.ensure_role(ctx.caller, Role::Operator)?;
        state.ensure_nullifier_unused(nullifier_hash)?;
        if amount == 0 {
            return Err(EscrowError::InvalidAmount);
        }

        state.record_result(
            nullifier_hash,
            SwapResult {
                output_asset,
                amount,
            },
            ctx.timestamp,
        );
        Ok(())
    }

    // ============ withdrawal ============

    /// release the proceeds recorded for `nullifier_hash` to `recipient`
    ///
    /// `proof` must verify against `(current root, nullifier_hash, recipient)`.
    pub fn withdraw(
        &self,
        _ctx: CallContext,
        nullifier_hash: NullifierHash,
        recipient: Address,
        proof: &WithdrawProof,
    ) -> Result<SwapResult> {
        let _entered = self.guard.enter()?;

        if recipient.is_null() {
            return Err(EscrowError::InvalidRecipient);
        }

        let inputs = {
            let state = self.state.lock();
            state
                .swap_results
                .get(&nullifier_hash)
                .filter(|r| r.amount > 0)
                .ok_or(EscrowError::NoProceedsAvailable(nullifier_hash))?;
            if !state.used_nullifiers.contains(&nullifier_hash) {
                return Err(EscrowError::SwapNotYetExecuted(nullifier_hash));
            }
            PublicInputs {
                merkle_root: state.tree.root(),
                nullifier_hash,
                recipient,
            }
        };

        if !self.verifier.verify(proof, &inputs) {
            warn!(%nullifier_hash, %recipient, "withdrawal proof rejected");
            return Err(EscrowError::InvalidProof);
        }

        // delete before paying out: a nested claim sees nothing to withdraw
        let result = self
            .state
            .lock()
            .swap_results
            .remove(&nullifier_hash)
            .filter(|r| r.amount > 0)
            .ok_or(EscrowError::NoProceedsAvailable(nullifier_hash))?;

        if let Err(err) = self
            .bank
            .transfer(result.output_asset, self.address, recipient, result.amount)
        {
            warn!(%nullifier_hash, %err, "payout failed, restoring proceeds");
            self.state.lock().swap_results.insert(nullifier_hash, result);
            return Err(err.into());
        }

        info!(
            %nullifier_hash,
            %recipient,
            output_asset = %result.output_asset,
            amount = result.amount,
            "withdrawal recorded"
        );
        self.state.lock().events.push(LedgerEvent::WithdrawalRecorded {
            nullifier_hash,
            recipient,
            output_asset: result.output_asset,
            amount: result.amount,
        });

        Ok(result)
    }

    // ============ administration ============

    /// register a new denomination. owner only.
    pub fn add_swap_configuration(
        &self,
        ctx: CallContext,
        input_asset: AssetId,
        fixed_amount: Amount,
    ) -> Result<ConfigId> {
        let _entered = self.guard.enter()?;

        let mut state = self.state.lock();
        state.ensure_role(ctx.caller, Role::Owner)?;
        state.add_configuration(input_asset, fixed_amount)
    }

    /// hand the operator role to another account. owner only.
    pub fn set_operator(&self, ctx: CallContext, operator: Address) -> Result<()> {
        let _entered = self.guard.enter()?;

        let mut state = self.state.lock();
        state.ensure_role(ctx.caller, Role::Owner)?;
        if operator.is_null() {
            return Err(EscrowError::InvalidAddress);
        }

        let previous = std::mem::replace(&mut state.operator, operator);
        info!(%previous, %operator, "operator changed");
        state
            .events
            .push(LedgerEvent::OperatorChanged { previous, operator });
        Ok(())
    }

    /// hand ownership to another account. owner only.
    pub fn transfer_ownership(&self, ctx: CallContext, owner: Address) -> Result<()> {
        let _entered = self.guard.enter()?;

        let mut state = self.state.lock();
        state.ensure_role(ctx.caller, Role::Owner)?;
        if owner.is_null() {
            return Err(EscrowError::InvalidAddress);
        }

        let previous = std::mem::replace(&mut state.owner, owner);
        info!(%previous, %owner, "ownership transferred");
        state
            .events
            .push(LedgerEvent::OwnershipTransferred { previous, owner });
        Ok(())
    }

    // ============ read-only accessors ============

    pub fn swap_result(&self, nullifier_hash: &NullifierHash) -> Option<SwapResult> {
        self.state.lock().swap_results.get(nullifier_hash).copied()
    }

    pub fn swap_configuration(&self, config_id: ConfigId) -> Option<SwapConfiguration> {
        self.state.lock().registry.get(config_id).copied()
    }

    pub fn swap_configurations(&self) -> Vec<SwapConfiguration> {
        self.state.lock().registry.iter().copied().collect()
    }

    pub fn is_deposited(&self, commitment: &Commitment) -> bool {
        self.state
            .lock()
            .deposits
            .get(commitment)
            .is_some_and(|r| r.state == CommitmentState::Deposited)
    }

    pub fn deposit_record(&self, commitment: &Commitment) -> Option<DepositRecord> {
        self.state.lock().deposits.get(commitment).copied()
    }

    pub fn is_nullifier_used(&self, nullifier_hash: &NullifierHash) -> bool {
        self.state.lock().used_nullifiers.contains(nullifier_hash)
    }

    pub fn current_root(&self) -> Hash {
        self.state.lock().tree.root()
    }

    pub fn leaf_count(&self) -> u64 {
        self.state.lock().tree.leaf_count()
    }

    pub fn tree_height(&self) -> u8 {
        self.state.lock().tree.height()
    }

    /// sibling path for a leaf against the current root
    pub fn membership_proof(&self, leaf_index: u64) -> Result<MembershipProof> {
        Ok(self.state.lock().tree.prove_membership(leaf_index)?)
    }

    /// events emitted so far, oldest first
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.state.lock().events.clone()
    }

    pub fn owner(&self) -> Address {
        self.state.lock().owner
    }

    pub fn operator(&self) -> Address {
        self.state.lock().operator
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn executor(&self) -> Address {
        self.executor
    }
}

impl<H: NodeHasher> core::fmt::Debug for EscrowLedger<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EscrowLedger")
            .field("address", &self.address)
            .field("executor", &self.executor)
            .field("entered", &self.guard.is_entered())
            .finish_non_exhaustive()
    }
}

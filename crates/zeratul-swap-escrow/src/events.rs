//! ledger events
//!
//! append-only and ordered. the ledger never reads them back; they are for
//! indexers and clients watching for their leaf index or proceeds.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, AssetId, Commitment, ConfigId, NullifierHash, Timestamp};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEvent {
    /// commitment added to the tree
    /// depositor keeps the leaf index to build a withdrawal proof later
    DepositRecorded {
        commitment: Commitment,
        leaf_index: u64,
        timestamp: Timestamp,
        config_id: ConfigId,
    },

    SwapResultRecorded {
        nullifier_hash: NullifierHash,
        output_asset: AssetId,
        amount: Amount,
        timestamp: Timestamp,
    },

    WithdrawalRecorded {
        nullifier_hash: NullifierHash,
        recipient: Address,
        output_asset: AssetId,
        amount: Amount,
    },

    ConfigurationAdded {
        config_id: ConfigId,
        input_asset: AssetId,
        fixed_amount: Amount,
    },

    OperatorChanged {
        previous: Address,
        operator: Address,
    },

    OwnershipTransferred {
        previous: Address,
        owner: Address,
    },
}

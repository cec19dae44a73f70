//! core escrow types

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeratul_commitment_tree::Hash;

/// asset amount in base units
pub type Amount = u128;

/// configuration id, assigned sequentially from 1
pub type ConfigId = u64;

/// unix timestamp in seconds, as reported by the host
pub type Timestamp = u64;

/// error parsing a hex-encoded fixed-size value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected 0x-prefixed hex of {expected} bytes: {reason}")]
pub struct ParseHexError {
    pub expected: usize,
    pub reason: String,
}

fn parse_fixed_hex<const N: usize>(s: &str) -> Result<[u8; N], ParseHexError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let mut out = [0u8; N];
    hex::decode_to_slice(digits, &mut out).map_err(|e| ParseHexError {
        expected: N,
        reason: e.to_string(),
    })?;
    Ok(out)
}

/// fixed-size byte newtypes rendered as 0x-hex in logs, configs and events
macro_rules! hex_newtype {
    ($name:ident, $len:expr) => {
        impl $name {
            pub const ZERO: Self = Self([0u8; $len]);

            pub fn to_bytes(&self) -> [u8; $len] {
                self.0
            }

            pub fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = ParseHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_fixed_hex::<$len>(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// 20-byte account identifier; the all-zero address is the null address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

hex_newtype!(Address, 20);

impl Address {
    /// address whose low 8 bytes hold `n`, handy for fixtures and devnets
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    pub fn is_null(&self) -> bool {
        self.is_zero()
    }

    /// address as a 256-bit big-endian integer (left zero-padded)
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }
}

/// deposit commitment, hash of a secret and a nullifier preimage
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Commitment(pub Hash);

hex_newtype!(Commitment, 32);

/// revealed once when proceeds are claimed
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NullifierHash(pub Hash);

hex_newtype!(NullifierHash, 32);

/// asset kind: the host's native asset or a token contract
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetId {
    Native,
    Token(Address),
}

impl AssetId {
    pub fn is_native(&self) -> bool {
        matches!(self, AssetId::Native)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Native => write!(f, "native"),
            AssetId::Token(addr) => write!(f, "token:{}", addr),
        }
    }
}

/// host view of an incoming call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    /// native value attached to the call
    pub value: Amount,
    pub timestamp: Timestamp,
}

impl CallContext {
    /// call from `caller` with no attached value, stamped with wall-clock time
    pub fn new(caller: Address) -> Self {
        Self {
            caller,
            value: 0,
            timestamp: chrono::Utc::now().timestamp().max(0) as Timestamp,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }

    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// fixed (asset, amount) denomination deposits must match exactly
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapConfiguration {
    pub id: ConfigId,
    pub input_asset: AssetId,
    pub fixed_amount: Amount,
}

/// swap outcome recorded for a nullifier, deleted on withdrawal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResult {
    pub output_asset: AssetId,
    pub amount: Amount,
}

/// per-commitment lifecycle; swaps and withdrawals are tracked by nullifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitmentState {
    Deposited,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRecord {
    pub state: CommitmentState,
    pub leaf_index: u64,
    pub config_id: ConfigId,
    pub timestamp: Timestamp,
}

/// words in an opaque withdrawal proof
pub const PROOF_WORDS: usize = 8;

/// opaque withdrawal proof (e.g. a groth16 proof as eight field words)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WithdrawProof(pub [[u8; 32]; PROOF_WORDS]);

/// public inputs for the withdrawal verifier, in circuit order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicInputs {
    pub merkle_root: Hash,
    pub nullifier_hash: NullifierHash,
    pub recipient: Address,
}

impl PublicInputs {
    /// `[merkle_root, nullifier_hash, recipient]` as 256-bit big-endian words
    pub fn to_words(&self) -> [[u8; 32]; 3] {
        [self.merkle_root, self.nullifier_hash.0, self.recipient.to_word()]
    }
}

/// operator-supplied routing parameters passed through to the venue
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueParams {
    pub min_return: Amount,
    pub flags: u32,
    /// opaque venue routing data
    #[serde(default)]
    pub data: Vec<u8>,
}

/// swap request handed to the venue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapDescription {
    pub src_asset: AssetId,
    pub dst_asset: AssetId,
    pub src_receiver: Address,
    pub dst_receiver: Address,
    pub amount: Amount,
    pub min_return: Amount,
    pub flags: u32,
}

/// what the venue reports back
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOutcome {
    pub return_amount: Amount,
    pub spent_amount: Amount,
}

/// supported conversion directions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapPath {
    NativeToToken,
    TokenToNative,
    TokenToToken,
}

impl SwapPath {
    /// pick the path for an input/output pair; identical assets have none
    pub fn select(input: AssetId, output: AssetId) -> Option<Self> {
        match (input, output) {
            (AssetId::Native, AssetId::Token(_)) => Some(SwapPath::NativeToToken),
            (AssetId::Token(_), AssetId::Native) => Some(SwapPath::TokenToNative),
            (AssetId::Token(a), AssetId::Token(b)) if a != b => Some(SwapPath::TokenToToken),
            _ => None,
        }
    }

    /// whether the input amount travels as attached native value
    pub fn attaches_value(&self) -> bool {
        matches!(self, SwapPath::NativeToToken)
    }
}

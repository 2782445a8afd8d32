//! Transaction requests and signing
//!
//! A request is signed over the Keccak-256 digest of its canonical JSON
//! encoding. The node recovers the sender from the signature, so the
//! request itself carries no `from`.

use crate::call::Call;
use crate::error::ChainError;
use crate::gas::GasSettings;
use safehold_core::{keccak256, recover_address, AccountKey, Address, Amount};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Hash of a submitted transaction
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Same wire shape as a proposal id
        let id: safehold_core::TxId = Deserialize::deserialize(deserializer)?;
        Ok(Self(*id.as_bytes()))
    }
}

/// An unsigned transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRequest {
    pub chain_id: u64,
    pub nonce: u64,
    /// `None` only for contract creation
    pub to: Option<Address>,
    pub value: Amount,
    pub gas: GasSettings,
    pub call: Call,
}

impl TxRequest {
    /// Digest the signature commits to
    pub fn signing_digest(&self) -> Result<[u8; 32], ChainError> {
        let encoded = serde_json::to_vec(self)
            .map_err(|e| ChainError::UnexpectedResponse(format!("encode request: {}", e)))?;
        Ok(keccak256(&encoded))
    }
}

/// A request with its recoverable signature
#[derive(Debug, Clone)]
pub struct SignedTx {
    request: TxRequest,
    signature: [u8; 65],
}

impl SignedTx {
    pub fn request(&self) -> &TxRequest {
        &self.request
    }

    pub fn signature(&self) -> &[u8; 65] {
        &self.signature
    }

    /// Recover the sending address from the signature
    pub fn sender(&self) -> Result<Address, ChainError> {
        let digest = self.request.signing_digest()?;
        Ok(recover_address(&digest, &self.signature)?)
    }

    /// `keccak(digest || signature)`
    pub fn hash(&self) -> Result<TxHash, ChainError> {
        let mut preimage = Vec::with_capacity(32 + 65);
        preimage.extend_from_slice(&self.request.signing_digest()?);
        preimage.extend_from_slice(&self.signature);
        Ok(TxHash(keccak256(&preimage)))
    }
}

/// Sign a request with the unlocked account key.
pub fn sign_request(key: &AccountKey, request: TxRequest) -> Result<SignedTx, ChainError> {
    let digest = request.signing_digest()?;
    let signature = key.sign_digest(&digest);
    Ok(SignedTx { request, signature })
}

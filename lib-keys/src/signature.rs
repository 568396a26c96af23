//! Signature payloads
//!
//! The signature data carried by a transaction mirrors the structure of
//! the key it was produced by: a single key yields signature bytes plus
//! the sign mode they were produced under; a multisig key yields one
//! optional slot per constituent key, in constituent order.

use serde::{Deserialize, Serialize};

/// How the canonical signing payload was derived.
///
/// The admission pipeline never interprets a mode itself; it hands the
/// mode to the configured sign-mode resolver and rejects the transaction
/// when the resolver does not support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SignMode {
    /// Sign over the canonical binary encoding of the transaction
    Direct = 0,
    /// Sign over a human-readable rendering (reserved, not resolvable by
    /// the built-in direct handler)
    Textual = 1,
}

/// Signature material for one signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureData {
    /// Signature from a single key
    Single { mode: SignMode, signature: Vec<u8> },
    /// Signatures from a multisig key, position-aligned with the
    /// constituent keys; `None` marks a constituent that did not sign
    Multi { signatures: Vec<Option<SignatureData>> },
}

impl SignatureData {
    /// Create single-key signature data in `Direct` mode
    pub fn direct(signature: Vec<u8>) -> Self {
        SignatureData::Single {
            mode: SignMode::Direct,
            signature,
        }
    }

    /// True when no signature bytes are present anywhere in this payload.
    ///
    /// Gas estimation submits transactions before signing; the
    /// verification stage treats an empty payload as "not signed yet"
    /// in simulation mode.
    pub fn is_empty(&self) -> bool {
        match self {
            SignatureData::Single { signature, .. } => signature.is_empty(),
            SignatureData::Multi { signatures } => signatures
                .iter()
                .all(|slot| slot.as_ref().map_or(true, |data| data.is_empty())),
        }
    }
}

//! Public key types
//!
//! A `PublicKey` is either a single Ed25519 key or a threshold multisig
//! key composed of constituent `PublicKey`s, recursively. Addresses are
//! derived by hashing the canonical key encoding, so a key and its
//! address are always consistent.

use ed25519_dalek::{Signature as DalekSignature, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

use lib_types::Address;

/// Ed25519 signatures are exactly 64 bytes
pub const ED25519_SIGNATURE_LEN: usize = 64;

/// Error from key parsing or raw signature verification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("malformed ed25519 public key")]
    MalformedKey,

    #[error("malformed signature: {len} bytes, expected {expected}")]
    MalformedSignature { len: usize, expected: usize },

    #[error("signature verification failed")]
    VerificationFailed,

    #[error("multisig key cannot verify a raw signature directly")]
    CompositeKey,

    #[error("multisig threshold {threshold} exceeds {keys} constituent keys")]
    InvalidThreshold { threshold: u32, keys: usize },
}

/// Multisig nesting deeper than the configured maximum
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("multisig nesting exceeds maximum depth {max}")]
pub struct DepthExceeded {
    pub max: u32,
}

/// Threshold multisig key: at least `threshold` of the constituent keys
/// must produce a valid signature.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MultisigPublicKey {
    pub threshold: u32,
    pub public_keys: Vec<PublicKey>,
}

impl MultisigPublicKey {
    pub fn new(threshold: u32, public_keys: Vec<PublicKey>) -> Result<Self, KeyError> {
        if threshold == 0 || threshold as usize > public_keys.len() {
            return Err(KeyError::InvalidThreshold {
                threshold,
                keys: public_keys.len(),
            });
        }
        Ok(Self {
            threshold,
            public_keys,
        })
    }
}

impl fmt::Debug for MultisigPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MultisigPublicKey({}-of-{})",
            self.threshold,
            self.public_keys.len()
        )
    }
}

/// Public key of a transaction signer
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PublicKey {
    /// Single Ed25519 key (32 raw bytes)
    Ed25519([u8; 32]),
    /// Threshold multisig over constituent keys
    Multisig(MultisigPublicKey),
}

impl PublicKey {
    /// Derive the account address for this key.
    ///
    /// The address is the SHA-256 of the canonical key encoding. Variant
    /// tags and length prefixes keep the encoding injective, so distinct
    /// key structures can never share an address.
    pub fn address(&self) -> Address {
        let mut hasher = Sha256::new();
        self.absorb(&mut hasher);
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Address::new(bytes)
    }

    fn absorb(&self, hasher: &mut Sha256) {
        match self {
            PublicKey::Ed25519(bytes) => {
                hasher.update([0u8]);
                hasher.update(bytes);
            }
            PublicKey::Multisig(multi) => {
                hasher.update([1u8]);
                hasher.update(multi.threshold.to_le_bytes());
                hasher.update((multi.public_keys.len() as u32).to_le_bytes());
                for key in &multi.public_keys {
                    key.absorb(hasher);
                }
            }
        }
    }

    /// Verify `signature` over `message` for a single key.
    ///
    /// Multisig keys are composite and are verified constituent-by-
    /// constituent by the caller; asking one to verify raw bytes is an
    /// error, not a panic.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), KeyError> {
        match self {
            PublicKey::Ed25519(bytes) => {
                let key =
                    VerifyingKey::from_bytes(bytes).map_err(|_| KeyError::MalformedKey)?;
                if signature.len() != ED25519_SIGNATURE_LEN {
                    return Err(KeyError::MalformedSignature {
                        len: signature.len(),
                        expected: ED25519_SIGNATURE_LEN,
                    });
                }
                let mut sig_bytes = [0u8; ED25519_SIGNATURE_LEN];
                sig_bytes.copy_from_slice(signature);
                let sig = DalekSignature::from_bytes(&sig_bytes);
                key.verify_strict(message, &sig)
                    .map_err(|_| KeyError::VerificationFailed)
            }
            PublicKey::Multisig(_) => Err(KeyError::CompositeKey),
        }
    }

    /// Count the simple keys reachable from this key, recursing into
    /// multisig constituents.
    ///
    /// Nesting past `max_depth` is refused instead of recursed, which
    /// bounds both the count and the stack for pathological inputs.
    pub fn count_keys(&self, max_depth: u32) -> Result<usize, DepthExceeded> {
        self.count_keys_at(0, max_depth)
    }

    fn count_keys_at(&self, depth: u32, max_depth: u32) -> Result<usize, DepthExceeded> {
        if depth > max_depth {
            return Err(DepthExceeded { max: max_depth });
        }
        match self {
            PublicKey::Ed25519(_) => Ok(1),
            PublicKey::Multisig(multi) => {
                let mut total = 0usize;
                for key in &multi.public_keys {
                    total = total.saturating_add(key.count_keys_at(depth + 1, max_depth)?);
                }
                Ok(total)
            }
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicKey::Ed25519(bytes) => {
                write!(f, "PublicKey::Ed25519({})", hex::encode(&bytes[..8]))
            }
            PublicKey::Multisig(multi) => write!(f, "PublicKey::{:?}", multi),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn test_signing_key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    fn test_public_key(seed: u8) -> PublicKey {
        PublicKey::Ed25519(test_signing_key(seed).verifying_key().to_bytes())
    }

    #[test]
    fn test_address_is_deterministic() {
        let key = test_public_key(1);
        assert_eq!(key.address(), key.address());
        assert_ne!(key.address(), test_public_key(2).address());
    }

    #[test]
    fn test_multisig_address_distinct_from_constituents() {
        let constituent = test_public_key(1);
        let multi = PublicKey::Multisig(
            MultisigPublicKey::new(1, vec![constituent.clone()]).unwrap(),
        );
        assert_ne!(multi.address(), constituent.address());

        // threshold is part of the key identity
        let two_keys = vec![test_public_key(1), test_public_key(2)];
        let one_of_two =
            PublicKey::Multisig(MultisigPublicKey::new(1, two_keys.clone()).unwrap());
        let two_of_two =
            PublicKey::Multisig(MultisigPublicKey::new(2, two_keys).unwrap());
        assert_ne!(one_of_two.address(), two_of_two.address());
    }

    #[test]
    fn test_single_key_verify() {
        let signing = test_signing_key(7);
        let key = PublicKey::Ed25519(signing.verifying_key().to_bytes());
        let message = b"admission test message";
        let sig = signing.sign(message);

        assert!(key.verify(message, &sig.to_bytes()).is_ok());
        assert_eq!(
            key.verify(b"different message", &sig.to_bytes()),
            Err(KeyError::VerificationFailed)
        );
    }

    #[test]
    fn test_malformed_signature_rejected() {
        let key = test_public_key(1);
        let result = key.verify(b"msg", &[0u8; 10]);
        assert_eq!(
            result,
            Err(KeyError::MalformedSignature {
                len: 10,
                expected: ED25519_SIGNATURE_LEN
            })
        );
    }

    #[test]
    fn test_multisig_rejects_raw_verify() {
        let multi = MultisigPublicKey::new(1, vec![test_public_key(1)]).unwrap();
        let key = PublicKey::Multisig(multi);
        assert_eq!(key.verify(b"msg", &[0u8; 64]), Err(KeyError::CompositeKey));
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(matches!(
            MultisigPublicKey::new(0, vec![test_public_key(1)]),
            Err(KeyError::InvalidThreshold { .. })
        ));
        assert!(matches!(
            MultisigPublicKey::new(3, vec![test_public_key(1)]),
            Err(KeyError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn test_count_keys_flat() {
        assert_eq!(test_public_key(1).count_keys(4), Ok(1));

        let multi = MultisigPublicKey::new(
            2,
            vec![test_public_key(1), test_public_key(2), test_public_key(3)],
        )
        .unwrap();
        assert_eq!(PublicKey::Multisig(multi).count_keys(4), Ok(3));
    }

    #[test]
    fn test_count_keys_nested() {
        let inner = MultisigPublicKey::new(1, vec![test_public_key(1), test_public_key(2)])
            .unwrap();
        let outer = MultisigPublicKey::new(
            2,
            vec![PublicKey::Multisig(inner), test_public_key(3)],
        )
        .unwrap();
        assert_eq!(PublicKey::Multisig(outer).count_keys(4), Ok(3));
    }

    #[test]
    fn test_count_keys_depth_exceeded() {
        // Chain of 1-key multisigs deeper than the cap
        let mut key = test_public_key(1);
        for _ in 0..6 {
            key = PublicKey::Multisig(MultisigPublicKey::new(1, vec![key]).unwrap());
        }
        assert_eq!(key.count_keys(4), Err(DepthExceeded { max: 4 }));
    }
}

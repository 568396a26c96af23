//! Key and signature data model for transaction admission.
//!
//! # Modules
//!
//! - `keys`: recursive public key type (single Ed25519 or threshold
//!   multisig) with address derivation and raw verification
//! - `signature`: sign modes and the signature payload carried by a
//!   transaction, mirroring the key structure

pub mod keys;
pub mod signature;

pub use keys::{DepthExceeded, KeyError, MultisigPublicKey, PublicKey};
pub use signature::{SignMode, SignatureData};

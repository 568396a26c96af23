//! Transaction Capability Views
//!
//! The pipeline treats a transaction as opaque except through three
//! capability views it may or may not support. Absence of a view is
//! detected with a fallible downcast accessor; a stage that requires an
//! absent capability rejects, terminally.

use lib_keys::{PublicKey, SignatureData};
use lib_types::{Address, Amount, BlockHeight, Gas};

/// Protocol extension field attached to a transaction.
///
/// The pipeline recognizes none; any present option is grounds for
/// rejection by the extension stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionOption {
    pub type_url: String,
}

/// Signature material for one required signer: the declared key (if
/// attached), the signature payload, and the sequence it was signed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    pub pub_key: Option<PublicKey>,
    pub data: SignatureData,
    pub sequence: u64,
}

/// Base view every transaction supports
pub trait Tx: Send + Sync {
    /// Transaction's own self-consistency check
    fn validate_basic(&self) -> anyhow::Result<()>;

    /// Height after which the transaction is invalid; 0 means no expiry
    fn timeout_height(&self) -> BlockHeight;

    /// Declared protocol extension options
    fn extension_options(&self) -> &[ExtensionOption];

    fn as_memo_tx(&self) -> Option<&dyn MemoTx> {
        None
    }

    fn as_sig_tx(&self) -> Option<&dyn SigVerifiableTx> {
        None
    }

    fn as_fee_tx(&self) -> Option<&dyn FeeTx> {
        None
    }
}

/// A transaction carrying a short free-text memo
pub trait MemoTx {
    fn memo(&self) -> &str;
}

/// A transaction declaring a fee and gas limit
pub trait FeeTx {
    fn fee(&self) -> Amount;

    fn gas_limit(&self) -> Gas;

    /// Explicit fee payer; defaults to the first signer when absent
    fn fee_payer(&self) -> Option<Address> {
        None
    }

    /// Account whose fee grant should cover the fee, when it differs
    /// from the payer
    fn fee_granter(&self) -> Option<Address> {
        None
    }
}

/// A transaction that can be signature-verified
pub trait SigVerifiableTx {
    /// Required signer addresses, in signing order
    fn signers(&self) -> Vec<Address>;

    /// Declared public keys, position-aligned with `signers`; `None`
    /// for signers whose key is already registered on their account
    fn pub_keys(&self) -> Vec<Option<PublicKey>>;

    /// Signature entries, position-aligned with `signers`
    fn signatures(&self) -> Vec<SignatureEntry>;

    /// Canonical signature-free body bytes, the content a signing
    /// payload commits to
    fn body_bytes(&self) -> Vec<u8>;
}

//! Admission Errors
//!
//! Three distinct failure families, kept apart because callers react to
//! them differently:
//! - `ConfigError`: the pipeline could not be built at all; no handler
//!   is returned.
//! - `RejectReason`: a business-rule rejection from one of the stages;
//!   the transaction is not admitted but may be retried once the
//!   triggering condition changes (higher fee, refreshed sequence).
//! - `AdmissionError`: what the composed handler returns — a rejection,
//!   a gas-meter exhaustion, or an internal fault recovered by the
//!   outermost stage.

use thiserror::Error;

use lib_keys::SignMode;
use lib_types::{Address, Amount, BlockHeight};

use crate::gas::OutOfGas;

/// Result alias used throughout the pipeline
pub type AdmissionResult<T> = Result<T, AdmissionError>;

/// Error constructing the pipeline from its options.
///
/// One distinct variant per missing required collaborator, so operators
/// can tell exactly which wiring is absent.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("account keeper is required to build the admission pipeline")]
    MissingAccountKeeper,

    #[error("bank keeper is required to build the admission pipeline")]
    MissingBankKeeper,

    #[error("sign mode handler is required to build the admission pipeline")]
    MissingSignModeHandler,
}

/// Specific reason a stage rejected the transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    // =========================================================================
    // Capability Errors
    // =========================================================================

    #[error("transaction does not support required capability: {0}")]
    MissingCapability(&'static str),

    #[error("transaction has no signers")]
    NoSigners,

    // =========================================================================
    // Validity Errors
    // =========================================================================

    #[error("unknown extension option: {type_url}")]
    UnknownExtension { type_url: String },

    #[error("basic validation failed: {0}")]
    InvalidBasic(String),

    #[error("transaction expired: timeout height {timeout_height}, current height {current}")]
    Expired {
        timeout_height: BlockHeight,
        current: BlockHeight,
    },

    #[error("memo too long: {len} chars, max {max}")]
    MemoTooLong { len: usize, max: usize },

    // =========================================================================
    // Fee Errors
    // =========================================================================

    #[error("insufficient fee: got {got}, minimum {min}")]
    FeeBelowFloor { got: Amount, min: Amount },

    #[error("fee payment from {payer} failed: {reason}")]
    FeePayment { payer: Address, reason: String },

    #[error("fee grant from {granter} to {grantee} rejected: {reason}")]
    FeeGrant {
        granter: Address,
        grantee: Address,
        reason: String,
    },

    #[error("transaction declares a fee granter but fee grants are not enabled")]
    FeeGrantsDisabled,

    // =========================================================================
    // Account / Key Errors
    // =========================================================================

    #[error("account not found: {0}")]
    AccountNotFound(Address),

    #[error("signer {signer} has no resolvable public key")]
    MissingPubKey { signer: Address },

    #[error("public key for signer {signer} resolves to address {derived}")]
    PubKeyAddressMismatch { signer: Address, derived: Address },

    // =========================================================================
    // Signature Errors
    // =========================================================================

    #[error("signer count mismatch: {signers} signers, {signatures} signatures")]
    SignerCountMismatch { signers: usize, signatures: usize },

    #[error("too many signatures: {count}, max {max}")]
    TooManySignatures { count: usize, max: usize },

    #[error("multisig nesting exceeds maximum depth {max}")]
    MultisigTooDeep { max: u32 },

    #[error("wrong sequence for signer {signer}: expected {expected}, got {got}")]
    WrongSequence {
        signer: Address,
        expected: u64,
        got: u64,
    },

    #[error("sign mode {mode:?} could not be resolved: {reason}")]
    UnresolvableSignMode { mode: SignMode, reason: String },

    #[error("signature verification failed for signer {signer}: {reason}")]
    SignatureInvalid { signer: Address, reason: String },

    #[error("signature structure does not match key structure for signer {signer}")]
    SignatureShapeMismatch { signer: Address },

    #[error("multisig threshold not met for signer {signer}: {provided} valid, threshold {threshold}")]
    MultisigThresholdUnmet {
        signer: Address,
        provided: usize,
        threshold: u32,
    },
}

/// Error returned by the composed admission handler.
///
/// Any value here means "do not admit this transaction"; callers must
/// discard every context mutation made before the failing stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("transaction rejected: {0}")]
    Rejected(#[from] RejectReason),

    #[error(transparent)]
    OutOfGas(#[from] OutOfGas),

    #[error("internal fault during admission: {0}")]
    Internal(String),
}

impl AdmissionError {
    /// True for gas-meter exhaustion, which metering/refund logic treats
    /// separately from ordinary rejections.
    pub fn is_out_of_gas(&self) -> bool {
        matches!(self, AdmissionError::OutOfGas(_))
    }
}

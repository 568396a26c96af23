//! Admission Parameters
//!
//! Limits and costs applied by the mandatory stages.

use serde::{Deserialize, Serialize};

use lib_types::{Amount, Gas};

/// Configuration for the admission stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionParams {
    // =========================================================================
    // Fee Thresholds
    // =========================================================================
    /// Minimum declared fee for mempool admission (skipped in simulation)
    pub min_fee: Amount,

    // =========================================================================
    // Transaction Limits
    // =========================================================================
    /// Memo length cap per signer; the effective cap is this value
    /// multiplied by the transaction's signer count
    pub max_memo_chars_per_signer: usize,
    /// Maximum number of simple keys across all signers, counting
    /// multisig constituents recursively
    pub max_signatures: usize,
    /// Maximum multisig nesting depth
    pub max_multisig_depth: u32,

    // =========================================================================
    // Gas Costs
    // =========================================================================
    /// Gas charged per byte of serialized transaction
    pub tx_size_cost_per_byte: Gas,
    /// Gas charged to verify one Ed25519 signature
    pub sig_verify_cost_ed25519: Gas,
}

impl Default for AdmissionParams {
    fn default() -> Self {
        Self {
            min_fee: 1_000,
            max_memo_chars_per_signer: 256,
            max_signatures: 16,
            max_multisig_depth: 4,
            tx_size_cost_per_byte: 100,
            sig_verify_cost_ed25519: 1_000,
        }
    }
}

impl AdmissionParams {
    /// Create permissive params for testing
    pub fn for_testing() -> Self {
        Self {
            min_fee: 0,
            max_memo_chars_per_signer: usize::MAX,
            max_signatures: usize::MAX,
            max_multisig_depth: u32::MAX,
            tx_size_cost_per_byte: 0,
            sig_verify_cost_ed25519: 0,
        }
    }
}

//! Gas Metering and Signature Gas Pricing
//!
//! The gas meter is the sole cost-bounding mechanism of the pipeline:
//! there are no internal timeouts, only a budget that every metered
//! stage draws down. Consumption is monotonic and never wraps.
//!
//! Signature pricing is a separate, pluggable policy. It prices the
//! verification work by key type; it never checks the work itself
//! (that is the verification stage's job).

use thiserror::Error;

use lib_keys::{MultisigPublicKey, PublicKey, SignatureData};
use lib_types::Gas;

use crate::errors::{AdmissionResult, RejectReason};
use crate::params::AdmissionParams;

/// Gas meter exhaustion.
///
/// Carries the descriptor of the draw that failed so metering and
/// refund logic can attribute the exhaustion.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("out of gas in {descriptor}: wanted {wanted}, limit {limit}")]
pub struct OutOfGas {
    pub descriptor: &'static str,
    pub wanted: Gas,
    pub limit: Gas,
}

/// Tracks gas consumed against a fixed limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasMeter {
    limit: Gas,
    consumed: Gas,
}

impl GasMeter {
    /// Create a meter with the given limit
    pub fn new(limit: Gas) -> Self {
        Self { limit, consumed: 0 }
    }

    /// Create a meter that never exhausts.
    ///
    /// Used when a transaction has no fee-bearing view and therefore no
    /// declared gas limit.
    pub fn unlimited() -> Self {
        Self::new(Gas::MAX)
    }

    /// Draw `amount` gas, attributed to `descriptor`.
    ///
    /// On exhaustion the meter pins at its limit (remaining gas never
    /// goes negative) and the draw fails.
    pub fn consume(&mut self, amount: Gas, descriptor: &'static str) -> Result<(), OutOfGas> {
        let total = self.consumed.checked_add(amount).unwrap_or(Gas::MAX);
        if total > self.limit {
            self.consumed = self.limit;
            return Err(OutOfGas {
                descriptor,
                wanted: amount,
                limit: self.limit,
            });
        }
        self.consumed = total;
        Ok(())
    }

    /// Gas consumed so far
    pub fn consumed(&self) -> Gas {
        self.consumed
    }

    /// Gas still available
    pub fn remaining(&self) -> Gas {
        self.limit.saturating_sub(self.consumed)
    }

    /// The meter's limit
    pub fn limit(&self) -> Gas {
        self.limit
    }
}

impl Default for GasMeter {
    fn default() -> Self {
        Self::unlimited()
    }
}

// =============================================================================
// SIGNATURE GAS POLICY
// =============================================================================

/// Pluggable policy pricing signature verification by key type.
///
/// Implementations charge the meter and fail only on exhaustion or on a
/// structurally unpriceable key (nesting past the configured depth);
/// they must never verify cryptographic correctness.
pub trait SigGasConsumer: Send + Sync {
    fn consume(
        &self,
        meter: &mut GasMeter,
        pub_key: &PublicKey,
        data: &SignatureData,
        params: &AdmissionParams,
    ) -> AdmissionResult<()>;
}

/// Default signature gas policy.
///
/// Simple keys cost a fixed parameterized amount. Multisig keys cost
/// the sum of their constituent costs, recursively; every constituent
/// key is charged whether or not it signed, so the price of a key is a
/// function of the key alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSigGasConsumer;

impl DefaultSigGasConsumer {
    fn consume_key(
        &self,
        meter: &mut GasMeter,
        pub_key: &PublicKey,
        params: &AdmissionParams,
        depth: u32,
    ) -> AdmissionResult<()> {
        if depth > params.max_multisig_depth {
            return Err(RejectReason::MultisigTooDeep {
                max: params.max_multisig_depth,
            }
            .into());
        }
        match pub_key {
            PublicKey::Ed25519(_) => {
                meter.consume(params.sig_verify_cost_ed25519, "ed25519 signature verification")?;
                Ok(())
            }
            PublicKey::Multisig(MultisigPublicKey { public_keys, .. }) => {
                for key in public_keys {
                    self.consume_key(meter, key, params, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

impl SigGasConsumer for DefaultSigGasConsumer {
    fn consume(
        &self,
        meter: &mut GasMeter,
        pub_key: &PublicKey,
        _data: &SignatureData,
        params: &AdmissionParams,
    ) -> AdmissionResult<()> {
        self.consume_key(meter, pub_key, params, 0)
    }
}
